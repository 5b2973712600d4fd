//! Coverage tree nodes
//!
//! One flat node struct tagged by [`ElementType`] instead of a subclass per
//! element. The containment hierarchy is fixed; folding a child into a
//! parent that cannot contain it is a programming-contract violation and
//! fails fast.

use super::Counter;
use serde::Serialize;

/// Element kind of a coverage node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementType {
    /// Logical grouping of bundles
    Group,
    /// Set of packages, usually one analyzed artifact
    Bundle,
    /// Package, named with `/` separators
    Package,
    /// Class
    Class,
    /// Source file aggregating all classes it contains
    SourceFile,
    /// Method
    Method,
    /// Single source line
    Line,
}

impl ElementType {
    /// Whether a node of this type may directly contain `child`
    #[must_use]
    pub const fn can_contain(self, child: Self) -> bool {
        matches!(
            (self, child),
            (Self::Group, Self::Group | Self::Bundle)
                | (Self::Bundle, Self::Package)
                | (Self::Package, Self::Class | Self::SourceFile)
                | (Self::Class, Self::Method)
                | (Self::SourceFile | Self::Method, Self::Line)
        )
    }
}

/// Per-line pair of instruction and branch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCounter {
    /// Instructions attributed to this line
    pub instructions: Counter,
    /// Branch edges attributed to this line
    pub branches: Counter,
}

impl LineCounter {
    /// The empty line
    pub const EMPTY: Self = Self {
        instructions: Counter::ZERO,
        branches: Counter::ZERO,
    };

    /// True if no instructions are attributed to this line
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions == Counter::ZERO && self.branches == Counter::ZERO
    }
}

/// Per-line counters of a source-bearing node, stored as a dense vector
/// starting at the first known line
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceLines {
    offset: u32,
    lines: Vec<LineCounter>,
}

impl SourceLines {
    /// Create an empty line table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First line number with data, if any
    #[must_use]
    pub fn first_line(&self) -> Option<u32> {
        if self.lines.is_empty() {
            None
        } else {
            Some(self.offset)
        }
    }

    /// Last line number with data, if any
    #[must_use]
    pub fn last_line(&self) -> Option<u32> {
        if self.lines.is_empty() {
            None
        } else {
            Some(self.offset + self.lines.len() as u32 - 1)
        }
    }

    /// Counters for the given line, EMPTY when outside the known range
    #[must_use]
    pub fn line(&self, nr: u32) -> LineCounter {
        if self.lines.is_empty() || nr < self.offset {
            return LineCounter::EMPTY;
        }
        self.lines
            .get((nr - self.offset) as usize)
            .copied()
            .unwrap_or(LineCounter::EMPTY)
    }

    /// Add counters to the given line, growing the table as needed
    pub fn increment_line(&mut self, nr: u32, instructions: Counter, branches: Counter) {
        self.ensure_capacity(nr);
        let slot = &mut self.lines[(nr - self.offset) as usize];
        slot.instructions = slot.instructions.increment(instructions);
        slot.branches = slot.branches.increment(branches);
    }

    /// Merge another line table into this one, index-wise; indices present
    /// only on one side keep their counters
    pub fn merge(&mut self, other: &SourceLines) {
        for (nr, counter) in other.iter() {
            self.increment_line(nr, counter.instructions, counter.branches);
        }
    }

    /// Iterate over `(line number, counters)` pairs with data
    pub fn iter(&self) -> impl Iterator<Item = (u32, LineCounter)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, c)| (self.offset + i as u32, *c))
    }

    /// Line counter over this table: lines with no covered instructions are
    /// missed, lines with any covered instruction are covered
    #[must_use]
    pub fn line_counter(&self) -> Counter {
        self.iter()
            .map(|(_, c)| Counter::single(c.instructions.covered > 0))
            .sum()
    }

    fn ensure_capacity(&mut self, nr: u32) {
        if self.lines.is_empty() {
            self.offset = nr;
            self.lines.push(LineCounter::EMPTY);
            return;
        }
        if nr < self.offset {
            let grow = (self.offset - nr) as usize;
            let mut lines = vec![LineCounter::EMPTY; grow];
            lines.append(&mut self.lines);
            self.lines = lines;
            self.offset = nr;
        } else {
            let idx = (nr - self.offset) as usize;
            if idx >= self.lines.len() {
                self.lines.resize(idx + 1, LineCounter::EMPTY);
            }
        }
    }
}

/// One node of the aggregated coverage tree
///
/// Carries five counters at every level; source-bearing nodes additionally
/// carry per-line counters. Parents are built by folding fully-computed
/// children in, and a parent's counters always equal the sum of its direct
/// children's.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageNode {
    element: ElementType,
    name: String,
    source_file: Option<String>,
    pub(crate) instructions: Counter,
    pub(crate) branches: Counter,
    pub(crate) lines: Counter,
    pub(crate) methods: Counter,
    pub(crate) classes: Counter,
    pub(crate) source_lines: Option<SourceLines>,
    pub(crate) children: Vec<CoverageNode>,
}

impl CoverageNode {
    /// Create an empty node of the given element type
    #[must_use]
    pub fn new(element: ElementType, name: impl Into<String>) -> Self {
        Self {
            element,
            name: name.into(),
            source_file: None,
            instructions: Counter::ZERO,
            branches: Counter::ZERO,
            lines: Counter::ZERO,
            methods: Counter::ZERO,
            classes: Counter::ZERO,
            source_lines: None,
            children: Vec::new(),
        }
    }

    /// Create an empty source-bearing node with a line table
    #[must_use]
    pub fn new_source(element: ElementType, name: impl Into<String>) -> Self {
        let mut node = Self::new(element, name);
        node.source_lines = Some(SourceLines::new());
        node
    }

    /// Element type of this node
    #[must_use]
    pub fn element(&self) -> ElementType {
        self.element
    }

    /// Name of this node
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source file this class was compiled from, if known
    #[must_use]
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// Attach the source file name (class nodes only)
    pub fn set_source_file(&mut self, file: impl Into<String>) {
        self.source_file = Some(file.into());
    }

    /// Instruction counter
    #[must_use]
    pub fn instruction_counter(&self) -> Counter {
        self.instructions
    }

    /// Branch counter
    #[must_use]
    pub fn branch_counter(&self) -> Counter {
        self.branches
    }

    /// Line counter
    #[must_use]
    pub fn line_counter(&self) -> Counter {
        self.lines
    }

    /// Method counter
    #[must_use]
    pub fn method_counter(&self) -> Counter {
        self.methods
    }

    /// Class counter
    #[must_use]
    pub fn class_counter(&self) -> Counter {
        self.classes
    }

    /// Per-line counters, present on source-bearing nodes
    #[must_use]
    pub fn source_lines(&self) -> Option<&SourceLines> {
        self.source_lines.as_ref()
    }

    /// Direct children of this node
    #[must_use]
    pub fn children(&self) -> &[CoverageNode] {
        &self.children
    }

    /// Add the child's five counters into this node and merge line tables
    ///
    /// Does not attach the child; use [`CoverageNode::add_child`] to both
    /// fold and keep it in the tree.
    ///
    /// # Panics
    ///
    /// If the fixed hierarchy does not allow `child` under this node. A
    /// malformed tree is an analyzer bug, not a runtime condition.
    pub fn increment(&mut self, child: &CoverageNode) {
        assert!(
            self.element.can_contain(child.element),
            "{:?} node {:?} cannot contain {:?} node {:?}",
            self.element,
            self.name,
            child.element,
            child.name,
        );
        self.instructions = self.instructions.increment(child.instructions);
        self.branches = self.branches.increment(child.branches);
        self.lines = self.lines.increment(child.lines);
        self.methods = self.methods.increment(child.methods);
        self.classes = self.classes.increment(child.classes);
        if let (Some(own), Some(theirs)) = (self.source_lines.as_mut(), child.source_lines.as_ref())
        {
            own.merge(theirs);
        }
    }

    /// Fold a fully-computed child into this node and attach it
    pub fn add_child(&mut self, child: CoverageNode) {
        self.increment(&child);
        self.children.push(child);
    }

    /// Pre-order traversal over this node and all descendants
    pub fn walk<F: FnMut(&CoverageNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}
