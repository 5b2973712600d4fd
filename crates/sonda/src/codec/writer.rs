//! Streaming writer for the framed exec data format

use super::compact::CompactWriter;
use super::{
    BLOCK_CMDDUMP, BLOCK_CMDOK, BLOCK_EXECUTIONDATA, BLOCK_HEADER, BLOCK_SESSIONINFO,
    FORMAT_VERSION, MAGIC_NUMBER,
};
use crate::data::{ExecutionData, ExecutionDataStore, SessionInfo, SessionInfoStore};
use crate::error::SondaResult;
use std::io::Write;

/// Append-only writer for exec data records
///
/// The header is emitted lazily before the first record, so a writer can
/// sit directly on a socket and never buffers more than one record. No
/// record is rewritten once flushed.
#[derive(Debug)]
pub struct ExecDataWriter<W: Write> {
    out: CompactWriter<W>,
    header_written: bool,
}

impl<W: Write> ExecDataWriter<W> {
    /// Create a writer on the given output
    ///
    /// Output should be buffered for file use, as most data is written in
    /// single bytes.
    pub fn new(out: W) -> Self {
        Self {
            out: CompactWriter::new(out),
            header_written: false,
        }
    }

    fn write_header_if_needed(&mut self) -> SondaResult<()> {
        if self.header_written {
            return Ok(());
        }
        self.out.write_byte(BLOCK_HEADER)?;
        self.out.write_u16(MAGIC_NUMBER)?;
        self.out.write_u16(FORMAT_VERSION)?;
        self.header_written = true;
        Ok(())
    }

    /// Write a session info record
    pub fn write_session_info(&mut self, info: &SessionInfo) -> SondaResult<()> {
        self.write_header_if_needed()?;
        self.out.write_byte(BLOCK_SESSIONINFO)?;
        self.out.write_utf(info.id())?;
        self.out.write_i64(info.start_time())?;
        self.out.write_i64(info.dump_time())?;
        Ok(())
    }

    /// Write an execution data record
    pub fn write_execution_data(&mut self, data: &ExecutionData) -> SondaResult<()> {
        self.write_header_if_needed()?;
        self.out.write_byte(BLOCK_EXECUTIONDATA)?;
        self.out.write_i64(data.id())?;
        self.out.write_utf(data.name())?;
        self.out.write_bool_array(data.probes())?;
        Ok(())
    }

    /// Write every session of the given store, in order
    pub fn write_sessions(&mut self, sessions: &SessionInfoStore) -> SondaResult<()> {
        for info in sessions.infos() {
            self.write_session_info(info)?;
        }
        Ok(())
    }

    /// Write every entry of the given store, in store order
    pub fn write_store(&mut self, store: &ExecutionDataStore) -> SondaResult<()> {
        for data in store.contents() {
            self.write_execution_data(data)?;
        }
        Ok(())
    }

    /// Write a remote dump/reset command
    pub fn write_dump_command(&mut self, dump: bool, reset: bool) -> SondaResult<()> {
        self.write_header_if_needed()?;
        self.out.write_byte(BLOCK_CMDDUMP)?;
        self.out.write_byte(u8::from(dump))?;
        self.out.write_byte(u8::from(reset))?;
        Ok(())
    }

    /// Write a remote command acknowledgement
    pub fn write_cmd_ok(&mut self) -> SondaResult<()> {
        self.write_header_if_needed()?;
        self.out.write_byte(BLOCK_CMDOK)?;
        Ok(())
    }

    /// Flush the underlying output
    pub fn flush(&mut self) -> SondaResult<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Unwrap the underlying output
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}
