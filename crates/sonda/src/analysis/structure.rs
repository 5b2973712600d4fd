//! Structural metadata supplied by the instrumentation collaborator
//!
//! Describes, per class, the ordered methods and basic blocks that probes
//! were attached to. The i-th probe flag corresponds 1:1, in declaration
//! order, to the i-th probe-bearing control-flow edge recorded during
//! instrumentation; probe indices are never renumbered after the fact.

/// One basic block: a straight-line run of instructions with one entry and
/// one exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Number of instructions in the block
    pub instruction_count: u32,
    /// Source line numbers the block's instructions map to
    pub lines: Vec<u32>,
    /// Indices into the class probe array for the block's probe-bearing
    /// outgoing edges; two or more indices make the block a branch point
    pub probes: Vec<usize>,
}

impl BasicBlock {
    /// Create a block covering the given lines with one probe
    #[must_use]
    pub fn new(instruction_count: u32, lines: Vec<u32>, probes: Vec<usize>) -> Self {
        Self {
            instruction_count,
            lines,
            probes,
        }
    }

    /// Whether this block is a branch point (multiple outgoing probed edges)
    #[must_use]
    pub fn is_branch_point(&self) -> bool {
        self.probes.len() >= 2
    }

    /// Whether the block was executed under the given probe recording
    #[must_use]
    pub fn is_covered(&self, probes: &[bool]) -> bool {
        self.probes.iter().any(|&i| probes.get(i).copied().unwrap_or(false))
    }
}

/// Structural metadata for one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodStructure {
    /// Method name
    pub name: String,
    /// Method descriptor, e.g. `(I)V`
    pub descriptor: String,
    /// Basic blocks in declaration order
    pub blocks: Vec<BasicBlock>,
}

impl MethodStructure {
    /// Create a method with no blocks
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            blocks: Vec::new(),
        }
    }

    /// Append a basic block
    #[must_use]
    pub fn with_block(mut self, block: BasicBlock) -> Self {
        self.blocks.push(block);
        self
    }

    /// Display name in `name(descriptor)` VM form
    #[must_use]
    pub fn vm_name(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }

    /// Identity used for cross-revision matching
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        (&self.name, &self.descriptor)
    }

    /// All probe indices of this method, in block declaration order
    #[must_use]
    pub fn probe_indices(&self) -> Vec<usize> {
        self.blocks.iter().flat_map(|b| b.probes.iter().copied()).collect()
    }
}

/// Structural metadata for one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassStructure {
    /// Class id (content hash of the instrumented payload)
    pub id: i64,
    /// Class name in VM form
    pub name: String,
    /// Source file the class was compiled from, if known
    pub source_file: Option<String>,
    /// Methods in declaration order
    pub methods: Vec<MethodStructure>,
    /// Expected total probe count, cross-checked against stored recordings
    pub probe_count: usize,
}

impl ClassStructure {
    /// Create a class with no methods
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, probe_count: usize) -> Self {
        Self {
            id,
            name: name.into(),
            source_file: None,
            methods: Vec::new(),
            probe_count,
        }
    }

    /// Set the source file name
    #[must_use]
    pub fn with_source_file(mut self, file: impl Into<String>) -> Self {
        self.source_file = Some(file.into());
        self
    }

    /// Append a method
    #[must_use]
    pub fn with_method(mut self, method: MethodStructure) -> Self {
        self.methods.push(method);
        self
    }

    /// Package part of the class name, empty for the default package
    #[must_use]
    pub fn package(&self) -> &str {
        self.name.rfind('/').map_or("", |i| &self.name[..i])
    }

    /// Find a method by name and descriptor
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodStructure> {
        self.methods.iter().find(|m| m.identity() == (name, descriptor))
    }
}
