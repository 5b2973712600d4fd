//! Remote-control protocol over TCP
//!
//! A thin transport shim around the binary codec: the client sends one
//! dump/reset command record, the server answers with session info and
//! execution data records terminated by an acknowledgement.
//!
//! ```text
//! client                                server (in the live process)
//!   │  DUMPCOMMAND(dump, reset)  ──►      │
//!   │                            ◄──  SESSIONINFO*
//!   │                            ◄──  EXECUTIONDATA*
//!   │                            ◄──  CMDOK
//! ```
//!
//! Within one response all session info records precede all execution
//! data records, so readers can flush session metadata before indexing
//! execution data.

mod client;
mod server;

pub use client::DumpClient;
pub use server::DumpServer;
