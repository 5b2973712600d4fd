//! Binary codec for execution data
//!
//! One framed format serves both on-disk exec files and the live control
//! wire protocol. A stream is a sequence of records, each starting with a
//! one-byte type tag; every record is self-delimiting from its tag and
//! declared field lengths, so no transport-level framing is needed.
//!
//! ```text
//! ┌────────┬──────────────────────────────────────────────────────────┐
//! │ 0x01   │ HEADER        magic 0xC0C0, format version               │
//! │ 0x10   │ SESSIONINFO   id, start time, dump time                  │
//! │ 0x11   │ EXECUTIONDATA class id, name, packed probe bits          │
//! │ 0x40   │ DUMPCOMMAND   dump flag, reset flag                      │
//! │ 0x41   │ CMDOK         (empty acknowledgement)                    │
//! └────────┴──────────────────────────────────────────────────────────┘
//! ```

mod compact;
mod reader;
mod writer;

pub use compact::{CompactReader, CompactWriter};
pub use reader::ExecDataReader;
pub use writer::ExecDataWriter;

use crate::data::{ExecutionData, SessionInfo};

/// Magic number identifying an exec data stream
pub const MAGIC_NUMBER: u16 = 0xC0C0;

/// Format version, incremented for each incompatible change
pub const FORMAT_VERSION: u16 = 0x1007;

/// Block tag for the stream header
pub const BLOCK_HEADER: u8 = 0x01;

/// Block tag for session information
pub const BLOCK_SESSIONINFO: u8 = 0x10;

/// Block tag for execution data of a single class
pub const BLOCK_EXECUTIONDATA: u8 = 0x11;

/// Block tag for a remote dump/reset command
pub const BLOCK_CMDDUMP: u8 = 0x40;

/// Block tag for a remote command acknowledgement
pub const BLOCK_CMDOK: u8 = 0x41;

/// One decoded record
///
/// The header record is validated by the reader and never surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Session identity and time range
    SessionInfo(SessionInfo),
    /// Probe recording of one class
    ExecutionData(ExecutionData),
    /// Remote-control request
    DumpCommand {
        /// Whether a dump of the current store is requested
        dump: bool,
        /// Whether all probes should be reset
        reset: bool,
    },
    /// Remote-control acknowledgement, ends one dump response
    CmdOk,
}

#[cfg(test)]
mod tests;
