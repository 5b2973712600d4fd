//! Combining execution data across code revisions
//!
//! Two stores loaded from different compiled revisions generally disagree
//! on class ids even for the same source, because the id is a content
//! hash. This module re-keys by method identity to blend historical probe
//! data into a current run, and narrows the resulting coverage tree to the
//! entities an external diff specification flags as changed.

mod diff;
mod revision;

pub use diff::{ChangeKind, DiffSpec, FileDiff, LineRange};
pub use revision::merge_revisions;
