//! Streaming reader for the framed exec data format

use super::compact::CompactReader;
use super::{
    Record, BLOCK_CMDDUMP, BLOCK_CMDOK, BLOCK_EXECUTIONDATA, BLOCK_HEADER, BLOCK_SESSIONINFO,
    FORMAT_VERSION, MAGIC_NUMBER,
};
use crate::data::{ExecutionData, ExecutionDataStore, SessionInfo, SessionInfoStore};
use crate::error::{SondaError, SondaResult};
use std::io::{self, Read};

fn complete<T>(result: io::Result<T>, record: &'static str) -> SondaResult<T> {
    result.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            SondaError::truncated(record)
        } else if e.kind() == io::ErrorKind::InvalidData {
            SondaError::format(format!("{record}: {e}"))
        } else {
            SondaError::Io(e)
        }
    })
}

/// Decoder for exec data records
///
/// Serves file loads, socket reads and merge pipelines alike: every record
/// is surfaced as one [`Record`] value and the caller dispatches on the
/// closed enum. A clean end of stream between records yields `None`;
/// running out of bytes inside a record is a distinguishable
/// truncated-record error.
#[derive(Debug)]
pub struct ExecDataReader<R: Read> {
    input: CompactReader<R>,
    first_record: bool,
}

impl<R: Read> ExecDataReader<R> {
    /// Create a reader on the given input
    ///
    /// Input should be buffered for file use, as most data is read in
    /// single bytes.
    pub fn new(input: R) -> Self {
        Self {
            input: CompactReader::new(input),
            first_record: true,
        }
    }

    /// Read the next record, or `None` on a clean end of stream
    ///
    /// The stream must start with a header record; further headers (from
    /// concatenated streams) are validated and skipped. An unknown tag or a
    /// bad header aborts the read.
    pub fn read_next(&mut self) -> SondaResult<Option<Record>> {
        loop {
            let Some(tag) = self.input.read_byte_or_eof()? else {
                return Ok(None);
            };
            if self.first_record {
                if tag != BLOCK_HEADER {
                    return Err(SondaError::format("missing stream header"));
                }
                self.first_record = false;
            }
            match tag {
                BLOCK_HEADER => self.read_header()?,
                BLOCK_SESSIONINFO => return Ok(Some(self.read_session_info()?)),
                BLOCK_EXECUTIONDATA => return Ok(Some(self.read_execution_data()?)),
                BLOCK_CMDDUMP => {
                    let dump = complete(self.input.read_byte(), "dump command")? != 0;
                    let reset = complete(self.input.read_byte(), "dump command")? != 0;
                    return Ok(Some(Record::DumpCommand { dump, reset }));
                }
                BLOCK_CMDOK => return Ok(Some(Record::CmdOk)),
                unknown => {
                    return Err(SondaError::format(format!(
                        "unknown block type 0x{unknown:02x}"
                    )))
                }
            }
        }
    }

    fn read_header(&mut self) -> SondaResult<()> {
        let magic = complete(self.input.read_u16(), "header")?;
        if magic != MAGIC_NUMBER {
            return Err(SondaError::format(format!(
                "invalid magic number 0x{magic:04x}"
            )));
        }
        let version = complete(self.input.read_u16(), "header")?;
        if version != FORMAT_VERSION {
            return Err(SondaError::IncompatibleVersion {
                version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }

    fn read_session_info(&mut self) -> SondaResult<Record> {
        let id = complete(self.input.read_utf(), "session info")?;
        let start = complete(self.input.read_i64(), "session info")?;
        let dump = complete(self.input.read_i64(), "session info")?;
        Ok(Record::SessionInfo(SessionInfo::new(id, start, dump)?))
    }

    fn read_execution_data(&mut self) -> SondaResult<Record> {
        let id = complete(self.input.read_i64(), "execution data")?;
        let name = complete(self.input.read_utf(), "execution data")?;
        let probes = complete(self.input.read_bool_array(), "execution data")?;
        Ok(Record::ExecutionData(ExecutionData::new(id, name, probes)))
    }

    /// Drain the stream into the given stores
    ///
    /// Stops at a clean end of stream or at a command acknowledgement.
    /// Returns whether an acknowledgement was seen, i.e. whether more data
    /// may follow a further command on the same connection. Command
    /// requests are not valid in a data stream.
    pub fn read_into(
        &mut self,
        store: &mut ExecutionDataStore,
        sessions: &mut SessionInfoStore,
    ) -> SondaResult<bool> {
        while let Some(record) = self.read_next()? {
            match record {
                Record::SessionInfo(info) => sessions.push(info)?,
                Record::ExecutionData(data) => store.put(data)?,
                Record::CmdOk => return Ok(true),
                Record::DumpCommand { .. } => {
                    return Err(SondaError::format("unexpected command in data stream"))
                }
            }
        }
        Ok(false)
    }

    /// Drain one dump response into the given stores
    ///
    /// Like [`ExecDataReader::read_into`], but additionally enforces the
    /// response ordering: all session info records precede all execution
    /// data records, which precede the acknowledgement. Out-of-order
    /// records are a protocol violation and abort the read.
    pub fn read_dump_response(
        &mut self,
        store: &mut ExecutionDataStore,
        sessions: &mut SessionInfoStore,
    ) -> SondaResult<bool> {
        let mut saw_execution_data = false;
        while let Some(record) = self.read_next()? {
            match record {
                Record::SessionInfo(info) => {
                    if saw_execution_data {
                        return Err(SondaError::format(
                            "session info after execution data in dump response",
                        ));
                    }
                    sessions.push(info)?;
                }
                Record::ExecutionData(data) => {
                    saw_execution_data = true;
                    store.put(data)?;
                }
                Record::CmdOk => return Ok(true),
                Record::DumpCommand { .. } => {
                    return Err(SondaError::format("unexpected command in dump response"))
                }
            }
        }
        Ok(false)
    }
}
