//! Dump server embedded in the instrumented process

use crate::codec::{ExecDataReader, ExecDataWriter, Record};
use crate::error::{SondaError, SondaResult};
use crate::runtime::RuntimeData;
use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread;

/// TCP server answering dump/reset commands with the live probe state
///
/// Bounded to one active connection: a new accept closes the previous
/// connection first. Failures are isolated to the failing connection; the
/// accept loop itself keeps running.
#[derive(Debug)]
pub struct DumpServer {
    listener: TcpListener,
    runtime: Arc<RuntimeData>,
    active: Arc<Mutex<Option<TcpStream>>>,
}

impl DumpServer {
    /// Bind the server socket
    pub fn bind(addr: impl ToSocketAddrs, runtime: Arc<RuntimeData>) -> SondaResult<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
            runtime,
            active: Arc::new(Mutex::new(None)),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SondaResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the process ends
    ///
    /// Each accepted connection is served on its own thread; an accept
    /// closes whatever connection was active before, which unblocks that
    /// connection's pending read with a closed-stream condition.
    pub fn serve(&self) -> SondaResult<()> {
        loop {
            let (stream, peer) = self.listener.accept()?;
            tracing::debug!(%peer, "control connection accepted");

            let previous = {
                let mut active = self.active.lock().unwrap();
                active.replace(stream.try_clone()?)
            };
            if let Some(previous) = previous {
                let _ = previous.shutdown(Shutdown::Both);
            }

            let runtime = Arc::clone(&self.runtime);
            thread::spawn(move || {
                if let Err(err) = serve_connection(&runtime, stream) {
                    tracing::warn!(%peer, %err, "control connection failed");
                }
            });
        }
    }
}

/// Serve command records on one connection until it closes
fn serve_connection(runtime: &RuntimeData, stream: TcpStream) -> SondaResult<()> {
    let mut reader = ExecDataReader::new(BufReader::new(stream.try_clone()?));
    let mut writer = ExecDataWriter::new(BufWriter::new(stream));
    loop {
        match reader.read_next()? {
            // peer closed the connection
            None => return Ok(()),
            Some(Record::DumpCommand { dump, reset }) => {
                if dump {
                    runtime.collect(&mut writer, reset)?;
                } else if reset {
                    runtime.reset();
                }
                writer.write_cmd_ok()?;
                writer.flush()?;
            }
            Some(record) => {
                return Err(SondaError::format(format!(
                    "unexpected record from control client: {record:?}"
                )))
            }
        }
    }
}
