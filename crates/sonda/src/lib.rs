//! Sonda: Execution-Probe Coverage Engine
//!
//! Sonda (Spanish: "probe") records which control-flow positions of
//! instrumented classes were executed, persists those recordings in a
//! compact binary format, merges them across runs and code revisions, and
//! aggregates them into a hierarchical coverage report. A live process can
//! be dumped or reset over TCP with the same record format.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      SONDA Architecture                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  exec files ──► codec ──► ExecutionDataStore ──► Analyzer ──►    │
//! │  TCP dumps ──►                   ▲                CoverageNode   │
//! │                                  │                    tree       │
//! │  RuntimeData (probe arrays) ─────┘                               │
//! │                                                                  │
//! │  cross-revision merge + diff filter sit between two loaded       │
//! │  stores and a second Analyzer pass (incremental coverage)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Bytecode instrumentation, agent bootstrap and report rendering are
//! external collaborators; this crate is the data engine between them.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Probe-to-coverage analysis combining recordings with structural
/// metadata
pub mod analysis;

/// Binary codec shared by exec files and the control wire protocol
pub mod codec;

/// Counter algebra and the aggregated coverage tree
pub mod counter;

/// Execution data entities and stores
pub mod data;

mod error;

/// Exec-file loading and saving
pub mod loader;

/// Cross-revision merge and the incremental diff filter
pub mod merge;

/// Remote-control protocol client and server
pub mod remote;

/// Live probe state of an instrumented process
pub mod runtime;

pub use analysis::{Analyzer, BasicBlock, ClassStructure, CoverageBuilder, MethodStructure};
pub use codec::{ExecDataReader, ExecDataWriter, Record};
pub use counter::{Counter, CoverageNode, CoverageStatus, ElementType};
pub use data::{class_id, ExecutionData, ExecutionDataStore, SessionInfo, SessionInfoStore};
pub use error::{SondaError, SondaResult};
pub use loader::ExecFileLoader;
pub use merge::{merge_revisions, DiffSpec};
pub use remote::{DumpClient, DumpServer};
pub use runtime::{ProbeArray, RuntimeData};
