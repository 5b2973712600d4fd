//! In-process probe state for instrumented code
//!
//! Instrumented classes flip individual probe flags from many concurrent
//! threads while a control thread may dump or reset at any time. Probe
//! flags are atomic booleans with relaxed ordering; a dump observes a
//! best-effort snapshot. Dump-then-reset is one critical section, so a
//! reset always happens after the dump that requested it and never
//! interleaves with a second command.

use crate::codec::ExecDataWriter;
use crate::data::SessionInfo;
use crate::error::{SondaError, SondaResult};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared probe flags of one instrumented class
#[derive(Debug)]
pub struct ProbeArray {
    bits: Vec<AtomicBool>,
}

impl ProbeArray {
    /// Create an array of unset probes
    #[must_use]
    pub fn new(len: usize) -> Self {
        let mut bits = Vec::with_capacity(len);
        bits.resize_with(len, AtomicBool::default);
        Self { bits }
    }

    /// Number of probes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True if the class has no probes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Mark the probe at `index` as executed
    ///
    /// Called from instrumented code on every probe-bearing edge; relaxed
    /// ordering keeps the hot path to a single atomic store.
    #[inline]
    pub fn hit(&self, index: usize) {
        self.bits[index].store(true, Ordering::Relaxed);
    }

    /// Whether the probe at `index` was executed
    #[must_use]
    pub fn is_hit(&self, index: usize) -> bool {
        self.bits[index].load(Ordering::Relaxed)
    }

    /// Copy the current probe flags
    #[must_use]
    pub fn snapshot(&self) -> Vec<bool> {
        self.bits.iter().map(|b| b.load(Ordering::Relaxed)).collect()
    }

    /// Unset all probes
    pub fn clear(&self) {
        for bit in &self.bits {
            bit.store(false, Ordering::Relaxed);
        }
    }
}

#[derive(Debug)]
struct RuntimeEntry {
    name: String,
    probes: Arc<ProbeArray>,
}

#[derive(Debug)]
struct RuntimeState {
    entries: BTreeMap<i64, RuntimeEntry>,
    session_id: String,
    start_time: i64,
}

/// Live execution data of one instrumented process
///
/// Hands out shared probe arrays to instrumented classes and serves the
/// dump/reset side of the remote-control protocol.
#[derive(Debug)]
pub struct RuntimeData {
    state: Mutex<RuntimeState>,
}

impl RuntimeData {
    /// Create runtime data with a generated session id
    #[must_use]
    pub fn new() -> Self {
        Self::with_session_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create runtime data with the given session id
    #[must_use]
    pub fn with_session_id(id: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(RuntimeState {
                entries: BTreeMap::new(),
                session_id: id.into(),
                start_time: now_millis(),
            }),
        }
    }

    /// Current session id
    #[must_use]
    pub fn session_id(&self) -> String {
        self.state.lock().unwrap().session_id.clone()
    }

    /// Replace the session id for subsequent dumps
    pub fn set_session_id(&self, id: impl Into<String>) {
        self.state.lock().unwrap().session_id = id.into();
    }

    /// Probe array for the given class, created unset on first use
    ///
    /// The same array is returned for repeated calls with the same id; a
    /// differing probe count for a known id is a structural mismatch.
    pub fn probes(&self, id: i64, name: &str, probe_count: usize) -> SondaResult<Arc<ProbeArray>> {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.entries.get(&id) {
            if entry.probes.len() != probe_count {
                return Err(SondaError::StructuralMismatch {
                    id,
                    stored_name: entry.name.clone(),
                    stored_probes: entry.probes.len(),
                    incoming_name: name.to_string(),
                    incoming_probes: probe_count,
                });
            }
            return Ok(Arc::clone(&entry.probes));
        }
        let probes = Arc::new(ProbeArray::new(probe_count));
        state.entries.insert(
            id,
            RuntimeEntry {
                name: name.to_string(),
                probes: Arc::clone(&probes),
            },
        );
        Ok(probes)
    }

    /// Write the current session info and all probe snapshots
    ///
    /// One critical section covers snapshot and (optional) reset, so no
    /// probe hit is lost between the two and a concurrent second command
    /// cannot interleave. With `reset`, all probes are cleared and a fresh
    /// session starts; pre-reset session info is no longer reported.
    pub fn collect<W: Write>(
        &self,
        writer: &mut ExecDataWriter<W>,
        reset: bool,
    ) -> SondaResult<()> {
        let mut state = self.state.lock().unwrap();
        let dump_time = now_millis();
        let info = SessionInfo::new(state.session_id.clone(), state.start_time, dump_time)?;
        writer.write_session_info(&info)?;
        for (id, entry) in &state.entries {
            let data =
                crate::data::ExecutionData::new(*id, entry.name.clone(), entry.probes.snapshot());
            writer.write_execution_data(&data)?;
        }
        if reset {
            reset_locked(&mut state);
        }
        Ok(())
    }

    /// Clear all probes and start a fresh session
    pub fn reset(&self) {
        reset_locked(&mut self.state.lock().unwrap());
    }
}

impl Default for RuntimeData {
    fn default() -> Self {
        Self::new()
    }
}

fn reset_locked(state: &mut RuntimeState) {
    for entry in state.entries.values() {
        entry.probes.clear();
    }
    state.start_time = now_millis();
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests;
