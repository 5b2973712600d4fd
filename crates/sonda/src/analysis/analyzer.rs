//! Probe-to-coverage analysis
//!
//! Combines a probe recording with a class's structural metadata and
//! derives the method and class nodes of the coverage tree.

use super::structure::{ClassStructure, MethodStructure};
use crate::counter::{Counter, CoverageNode, ElementType};
use crate::data::ExecutionDataStore;
use crate::error::{SondaError, SondaResult};

/// Analyzer deriving coverage nodes from an execution data store
#[derive(Debug)]
pub struct Analyzer<'a> {
    store: &'a ExecutionDataStore,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer reading from the given store
    #[must_use]
    pub fn new(store: &'a ExecutionDataStore) -> Self {
        Self { store }
    }

    /// Analyze one class against its structural metadata
    ///
    /// A class absent from the store is analyzed with an all-unset probe
    /// array, so never-executed classes still appear as fully missed. A
    /// stored recording whose probe count disagrees with the metadata is a
    /// structural mismatch and excluded from analysis.
    pub fn analyze_class(&self, class: &ClassStructure) -> SondaResult<CoverageNode> {
        let synthesized;
        let probes: &[bool] = match self.store.get(class.id) {
            Some(data) => {
                if data.probes().len() != class.probe_count {
                    return Err(SondaError::StructuralMismatch {
                        id: class.id,
                        stored_name: data.name().to_string(),
                        stored_probes: data.probes().len(),
                        incoming_name: class.name.clone(),
                        incoming_probes: class.probe_count,
                    });
                }
                data.probes()
            }
            None => {
                synthesized = vec![false; class.probe_count];
                &synthesized
            }
        };

        let mut node = CoverageNode::new_source(ElementType::Class, class.name.clone());
        if let Some(file) = &class.source_file {
            node.set_source_file(file.clone());
        }
        for method in &class.methods {
            if method.blocks.is_empty() {
                continue;
            }
            node.add_child(analyze_method(method, probes));
        }
        node.classes = Counter::single(node.methods.covered > 0);
        Ok(node)
    }
}

/// Derive one method node from its blocks and the class probe recording
fn analyze_method(method: &MethodStructure, probes: &[bool]) -> CoverageNode {
    let mut node = CoverageNode::new_source(ElementType::Method, method.vm_name());
    let mut covered_any = false;

    for block in &method.blocks {
        let covered = block.is_covered(probes);
        covered_any |= covered;

        let instructions = if covered {
            Counter::new(0, u64::from(block.instruction_count))
        } else {
            Counter::new(u64::from(block.instruction_count), 0)
        };
        let branches = if block.is_branch_point() {
            let taken = block
                .probes
                .iter()
                .filter(|&&i| probes.get(i).copied().unwrap_or(false))
                .count() as u64;
            Counter::new(block.probes.len() as u64 - taken, taken)
        } else {
            Counter::ZERO
        };

        if block.lines.is_empty() {
            // no line mapping, attribute straight to the method
            node.instructions = node.instructions.increment(instructions);
            node.branches = node.branches.increment(branches);
        } else if let Some(lines) = node.source_lines.as_mut() {
            for &line in &block.lines {
                lines.increment_line(line, instructions, branches);
            }
        }
    }

    if let Some(lines) = node.source_lines.as_ref() {
        for (_, counter) in lines.iter() {
            node.instructions = node.instructions.increment(counter.instructions);
            node.branches = node.branches.increment(counter.branches);
        }
        node.lines = lines.line_counter();
    }
    node.methods = Counter::single(covered_any);
    node
}
