//! Analyzer turning probe recordings plus structural metadata into the
//! aggregated coverage tree
//!
//! ```text
//! ExecutionDataStore ──┐
//!                      ├─► Analyzer ─► CoverageBuilder ─► Bundle tree
//! ClassStructure* ─────┘                    │
//!                                           └─► no-match list
//! ```

mod analyzer;
mod builder;
mod structure;

pub use analyzer::Analyzer;
pub use builder::CoverageBuilder;
pub use structure::{BasicBlock, ClassStructure, MethodStructure};
