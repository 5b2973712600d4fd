//! Client for remote execution data dumps

use crate::codec::{ExecDataReader, ExecDataWriter};
use crate::error::{SondaError, SondaResult};
use crate::loader::ExecFileLoader;
use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

/// Client requesting a dump and/or reset from a live process
///
/// Connect failures are retried a bounded number of times with a fixed
/// delay, then reported to the caller.
#[derive(Debug, Clone)]
pub struct DumpClient {
    dump: bool,
    reset: bool,
    retry_count: u32,
    retry_delay: Duration,
}

impl DumpClient {
    /// Client with the defaults: dump without reset, no retries, one
    /// second between attempts
    #[must_use]
    pub fn new() -> Self {
        Self {
            dump: true,
            reset: false,
            retry_count: 0,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Whether a dump should be requested
    #[must_use]
    pub fn with_dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    /// Whether execution data should be reset
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Number of connect retries after the first failed attempt
    #[must_use]
    pub fn with_retry_count(mut self, retries: u32) -> Self {
        self.retry_count = retries;
        self
    }

    /// Delay between connection attempts
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Request a dump from the given `host:port` end-point
    ///
    /// Returns the loaded stores. The connection is closed afterwards; a
    /// socket that closes before the command acknowledgement arrives is a
    /// transport failure, not a clean end of data.
    pub fn execute(&self, address: &str) -> SondaResult<ExecFileLoader> {
        let stream = self.try_connect(address)?;
        let mut writer = ExecDataWriter::new(BufWriter::new(stream.try_clone()?));
        writer.write_dump_command(self.dump, self.reset)?;
        writer.flush()?;

        let mut loader = ExecFileLoader::new();
        let mut reader = ExecDataReader::new(BufReader::new(stream));
        let (store, sessions) = loader.stores_mut();
        if !reader.read_dump_response(store, sessions)? {
            return Err(SondaError::Transport {
                address: address.to_string(),
                attempts: 1,
                message: "socket closed before command acknowledgement".to_string(),
            });
        }
        Ok(loader)
    }

    fn try_connect(&self, address: &str) -> SondaResult<TcpStream> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match TcpStream::connect(address) {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    if attempts > self.retry_count {
                        return Err(SondaError::Transport {
                            address: address.to_string(),
                            attempts,
                            message: err.to_string(),
                        });
                    }
                    tracing::debug!(%address, %err, attempt = attempts, "connect failed, retrying");
                    thread::sleep(self.retry_delay);
                }
            }
        }
    }
}

impl Default for DumpClient {
    fn default() -> Self {
        Self::new()
    }
}
