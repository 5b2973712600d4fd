//! Bottom-up assembly of the coverage tree

use super::analyzer::Analyzer;
use super::structure::ClassStructure;
use crate::counter::{CoverageNode, ElementType};
use crate::error::SondaError;
use std::collections::BTreeMap;

/// Collects analyzed class nodes and folds them into packages and bundles
///
/// Classes that fail analysis with a structural mismatch are kept on a
/// separate no-match list and surfaced to report tooling instead of
/// silently dropped; a whole report is never aborted because one class
/// failed to match.
#[derive(Debug, Default)]
pub struct CoverageBuilder {
    classes: Vec<CoverageNode>,
    packages: BTreeMap<String, Vec<usize>>,
    source_files: BTreeMap<(String, String), CoverageNode>,
    no_match: Vec<String>,
}

impl CoverageBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze one class and collect the result
    ///
    /// Structural mismatches are recorded on the no-match list with a
    /// warning. Other analyzer failures propagate.
    pub fn analyze(
        &mut self,
        analyzer: &Analyzer<'_>,
        class: &ClassStructure,
    ) -> Result<(), SondaError> {
        match analyzer.analyze_class(class) {
            Ok(node) => {
                self.collect_source_file(class, &node);
                let index = self.classes.len();
                self.packages
                    .entry(class.package().to_string())
                    .or_default()
                    .push(index);
                self.classes.push(node);
                Ok(())
            }
            Err(err @ SondaError::StructuralMismatch { .. }) => {
                tracing::warn!(class = %class.name, %err, "execution data does not match class, excluding");
                self.no_match.push(class.name.clone());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn collect_source_file(&mut self, class: &ClassStructure, node: &CoverageNode) {
        let Some(file) = &class.source_file else {
            return;
        };
        let key = (class.package().to_string(), file.clone());
        let entry = self
            .source_files
            .entry(key)
            .or_insert_with(|| CoverageNode::new_source(ElementType::SourceFile, file.clone()));
        entry.instructions = entry.instructions.increment(node.instructions);
        entry.branches = entry.branches.increment(node.branches);
        entry.lines = entry.lines.increment(node.lines);
        entry.methods = entry.methods.increment(node.methods);
        entry.classes = entry.classes.increment(node.classes);
        if let (Some(own), Some(theirs)) = (entry.source_lines.as_mut(), node.source_lines()) {
            own.merge(theirs);
        }
    }

    /// All analyzed class nodes, in analysis order
    #[must_use]
    pub fn classes(&self) -> &[CoverageNode] {
        &self.classes
    }

    /// Source file nodes aggregating the per-line counters of all classes
    /// compiled from the same file, in `(package, file)` order
    #[must_use]
    pub fn source_files(&self) -> Vec<&CoverageNode> {
        self.source_files.values().collect()
    }

    /// Names of classes excluded due to structural mismatches
    #[must_use]
    pub fn no_match_classes(&self) -> &[String] {
        &self.no_match
    }

    /// Fold all collected classes into a bundle tree
    ///
    /// The tree is Bundle → Package → Class → Method, each parent the exact
    /// sum of its direct children. Source file nodes stay available through
    /// [`CoverageBuilder::source_files`].
    #[must_use]
    pub fn build_bundle(&self, name: impl Into<String>) -> CoverageNode {
        let mut bundle = CoverageNode::new(ElementType::Bundle, name);
        for (package_name, class_indices) in &self.packages {
            let mut package = CoverageNode::new(ElementType::Package, package_name.clone());
            for &idx in class_indices {
                package.add_child(self.classes[idx].clone());
            }
            bundle.add_child(package);
        }
        bundle
    }
}
