//! Diff specification and the incremental-coverage tree filter

use crate::counter::{Counter, CoverageNode, ElementType, SourceLines};
use crate::error::{SondaError, SondaResult};
use serde::{Deserialize, Serialize};

/// How a file changed between the compared revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// File is new; every line of it counts as changed
    Added,
    /// File existed before; only the listed ranges count as changed
    Changed,
}

/// Inclusive range of source lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First changed line
    pub start: u32,
    /// Last changed line
    pub end: u32,
}

impl LineRange {
    /// Whether the given line falls inside this range
    #[must_use]
    pub fn contains(&self, line: u32) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

/// Change description of one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// File path as reported by the diff tool
    pub file: String,
    /// Whether the file is new or modified
    pub kind: ChangeKind,
    /// Added/changed line ranges; ignored for added files
    #[serde(default)]
    pub ranges: Vec<LineRange>,
}

/// Externally supplied change-set description
///
/// Applied as a filter over a coverage tree: counters of methods and lines
/// not flagged as changed are zeroed, while the nodes themselves stay in
/// the tree for context, producing an incremental-coverage view restricted
/// to new and modified code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSpec {
    /// Changed files
    pub files: Vec<FileDiff>,
}

impl DiffSpec {
    /// Parse a diff specification from JSON
    pub fn from_json(json: &str) -> SondaResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SondaError::format(format!("invalid diff specification: {e}")))
    }

    /// Find the diff entry matching a class's source file
    #[must_use]
    pub fn file(&self, source_file: &str) -> Option<&FileDiff> {
        self.files.iter().find(|f| {
            f.file == source_file || f.file.ends_with(&format!("/{source_file}"))
        })
    }

    /// Whether a line of the given source file is flagged as changed
    #[must_use]
    pub fn is_line_changed(&self, source_file: &str, line: u32) -> bool {
        self.file(source_file).is_some_and(|f| match f.kind {
            ChangeKind::Added => true,
            ChangeKind::Changed => f.ranges.iter().any(|r| r.contains(line)),
        })
    }

    /// Narrow a bundle tree to the changed entities
    ///
    /// Returns a tree of identical shape with counters zeroed on every
    /// method and line not flagged as changed; parent counters are
    /// recomputed bottom-up from the filtered children.
    #[must_use]
    pub fn apply(&self, bundle: &CoverageNode) -> CoverageNode {
        let mut filtered = CoverageNode::new(bundle.element(), bundle.name());
        for package in bundle.children() {
            let mut filtered_package = CoverageNode::new(package.element(), package.name());
            for class in package.children() {
                filtered_package.add_child(self.filter_class(class));
            }
            filtered.add_child(filtered_package);
        }
        filtered
    }

    fn filter_class(&self, class: &CoverageNode) -> CoverageNode {
        let Some(source_file) = class.source_file() else {
            // without a source mapping nothing can be flagged as changed
            return zeroed_copy(class);
        };
        if self.file(source_file).is_none() {
            return zeroed_copy(class);
        }

        let mut filtered = CoverageNode::new_source(ElementType::Class, class.name());
        filtered.set_source_file(source_file);
        let mut any_method_kept = false;
        for method in class.children() {
            let kept = self.filter_method(source_file, method);
            any_method_kept |= kept.method_counter().total() > 0;
            filtered.add_child(kept);
        }
        filtered.classes = if any_method_kept {
            class.class_counter()
        } else {
            Counter::ZERO
        };
        filtered
    }

    fn filter_method(&self, source_file: &str, method: &CoverageNode) -> CoverageNode {
        let mut filtered = CoverageNode::new_source(ElementType::Method, method.name());
        let Some(lines) = method.source_lines() else {
            return filtered;
        };

        let mut kept_lines = SourceLines::new();
        for (nr, counter) in lines.iter() {
            if self.is_line_changed(source_file, nr) {
                kept_lines.increment_line(nr, counter.instructions, counter.branches);
            }
        }
        for (_, counter) in kept_lines.iter() {
            filtered.instructions = filtered.instructions.increment(counter.instructions);
            filtered.branches = filtered.branches.increment(counter.branches);
        }
        filtered.lines = kept_lines.line_counter();
        if filtered.lines.total() > 0 {
            filtered.methods = method.method_counter();
        }
        filtered.source_lines = Some(kept_lines);
        filtered
    }
}

/// Structure-preserving copy with all counters zeroed
fn zeroed_copy(node: &CoverageNode) -> CoverageNode {
    let mut copy = if node.source_lines().is_some() {
        CoverageNode::new_source(node.element(), node.name())
    } else {
        CoverageNode::new(node.element(), node.name())
    };
    if let Some(file) = node.source_file() {
        copy.set_source_file(file);
    }
    for child in node.children() {
        copy.children.push(zeroed_copy(child));
    }
    copy
}
