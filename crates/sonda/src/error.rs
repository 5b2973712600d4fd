//! Result and error types for Sonda.

use thiserror::Error;

/// Result type for Sonda operations
pub type SondaResult<T> = Result<T, SondaError>;

/// Errors that can occur in Sonda
#[derive(Debug, Error)]
pub enum SondaError {
    /// Malformed stream content: bad magic number, unknown record tag,
    /// or records arriving in an order the protocol forbids
    #[error("Invalid exec data format: {message}")]
    Format {
        /// Error message
        message: String,
    },

    /// Stream was written by an incompatible format version
    #[error("Incompatible exec data version 0x{version:04x}, expected 0x{expected:04x}")]
    IncompatibleVersion {
        /// Version found in the stream header
        version: u16,
        /// Version this reader understands
        expected: u16,
    },

    /// End of stream reached in the middle of a record
    ///
    /// Distinct from a clean end of stream between records, which is not
    /// an error.
    #[error("Truncated {record} record: stream ended mid-record")]
    TruncatedRecord {
        /// Record type being read when the stream ended
        record: &'static str,
    },

    /// Probe-length disagreement for the same class id
    ///
    /// Signals that the instrumented class file used at collection time
    /// differs from the one now being merged against.
    #[error(
        "Incompatible execution data for class {id:#018x}: \
         {stored_name} with {stored_probes} probes vs {incoming_name} with {incoming_probes} probes"
    )]
    StructuralMismatch {
        /// Class id both recordings claim
        id: i64,
        /// Name of the class already stored
        stored_name: String,
        /// Probe count of the class already stored
        stored_probes: usize,
        /// Name of the incoming class
        incoming_name: String,
        /// Probe count of the incoming class
        incoming_probes: usize,
    },

    /// A session with this id was already appended to the store
    #[error("Duplicate session id: {id}")]
    DuplicateSession {
        /// Offending session id
        id: String,
    },

    /// Session timestamps out of order
    #[error("Session {id} has dump time {dump} before start time {start}")]
    InvalidSession {
        /// Offending session id
        id: String,
        /// Start timestamp (epoch millis)
        start: i64,
        /// Dump timestamp (epoch millis)
        dump: i64,
    },

    /// Remote endpoint could not be reached within the retry budget
    #[error("Connection to {address} failed after {attempts} attempt(s): {message}")]
    Transport {
        /// Target address
        address: String,
        /// Number of connection attempts made
        attempts: u32,
        /// Last underlying error
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SondaError {
    /// Create a format error
    #[must_use]
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    /// Create a truncated-record error for the given record type
    #[must_use]
    pub fn truncated(record: &'static str) -> Self {
        Self::TruncatedRecord { record }
    }

    /// True for errors that abort the current read but leave other
    /// classes/streams usable (warn-and-continue at the report boundary)
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StructuralMismatch { .. })
    }
}
