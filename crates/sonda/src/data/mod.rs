//! Execution data entities and stores
//!
//! [`ExecutionData`] is one class's probe recording, keyed by a content
//! hash of the instrumented class payload. Stores merge recordings of the
//! same class by OR-ing probe bits, so a probe counts as hit if any run hit
//! it. Recordings with the same id but different probe counts come from
//! mismatched class files and are rejected, never blended.

use crate::error::{SondaError, SondaResult};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// Compute the class id for an instrumented class payload
///
/// The id is a content hash, so any change to the payload yields a new id
/// and stale structural metadata is detected instead of silently applied.
#[must_use]
pub fn class_id(payload: &[u8]) -> i64 {
    let digest = Sha256::digest(payload);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

/// Execution data for a single class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionData {
    id: i64,
    name: String,
    probes: Vec<bool>,
}

impl ExecutionData {
    /// Create execution data with the given probe recording
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>, probes: Vec<bool>) -> Self {
        Self {
            id,
            name: name.into(),
            probes,
        }
    }

    /// Create execution data with all probes unset
    #[must_use]
    pub fn empty(id: i64, name: impl Into<String>, probe_count: usize) -> Self {
        Self::new(id, name, vec![false; probe_count])
    }

    /// Class id (content hash of the instrumented payload)
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Class name in VM form, e.g. `com/example/Foo`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Probe recording, one flag per probe in declaration order
    #[must_use]
    pub fn probes(&self) -> &[bool] {
        &self.probes
    }

    /// True if at least one probe was hit
    #[must_use]
    pub fn has_hits(&self) -> bool {
        self.probes.iter().any(|p| *p)
    }

    /// Mark all probes as not executed
    pub fn reset(&mut self) {
        self.probes.fill(false);
    }

    /// Verify that `other` describes the same instrumented class
    ///
    /// Compatible means equal id and equal probe count. Anything else for
    /// the same id signals a stale or mismatched class file.
    pub fn check_compatibility(&self, other: &ExecutionData) -> SondaResult<()> {
        if self.id == other.id && self.probes.len() == other.probes.len() {
            Ok(())
        } else {
            Err(SondaError::StructuralMismatch {
                id: self.id,
                stored_name: self.name.clone(),
                stored_probes: self.probes.len(),
                incoming_name: other.name.clone(),
                incoming_probes: other.probes.len(),
            })
        }
    }

    /// OR the other recording's probe bits into this one
    ///
    /// This is the rule for combining independent runs of the same class: a
    /// probe is hit if either recording hit it.
    pub fn merge(&mut self, other: &ExecutionData) -> SondaResult<()> {
        self.check_compatibility(other)?;
        for (own, theirs) in self.probes.iter_mut().zip(&other.probes) {
            *own |= *theirs;
        }
        Ok(())
    }

    /// Unset every probe that is set in the other recording
    pub fn subtract(&mut self, other: &ExecutionData) -> SondaResult<()> {
        self.check_compatibility(other)?;
        for (own, theirs) in self.probes.iter_mut().zip(&other.probes) {
            *own &= !*theirs;
        }
        Ok(())
    }
}

/// Identity and time range of one collection period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    id: String,
    start_time: i64,
    dump_time: i64,
}

impl SessionInfo {
    /// Create a session record
    ///
    /// `start_time` and `dump_time` are epoch milliseconds with
    /// `start_time <= dump_time`.
    pub fn new(id: impl Into<String>, start_time: i64, dump_time: i64) -> SondaResult<Self> {
        let id = id.into();
        if dump_time < start_time {
            return Err(SondaError::InvalidSession {
                id,
                start: start_time,
                dump: dump_time,
            });
        }
        Ok(Self {
            id,
            start_time,
            dump_time,
        })
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Collection start, epoch milliseconds
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Dump timestamp, epoch milliseconds
    #[must_use]
    pub fn dump_time(&self) -> i64 {
        self.dump_time
    }
}

/// In-memory store of execution data, one entry per class id
///
/// Entries inserted for an id already present are merged probe-wise.
/// Iteration order is by class id, stable within a process run, so reports
/// diff deterministically.
#[derive(Debug, Clone, Default)]
pub struct ExecutionDataStore {
    entries: BTreeMap<i64, ExecutionData>,
    names: HashSet<String>,
}

impl ExecutionDataStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge the given execution data
    pub fn put(&mut self, data: ExecutionData) -> SondaResult<()> {
        match self.entries.get_mut(&data.id) {
            None => {
                self.names.insert(data.name.clone());
                self.entries.insert(data.id, data);
            }
            Some(entry) => entry.merge(&data)?,
        }
        Ok(())
    }

    /// Look up execution data by class id
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&ExecutionData> {
        self.entries.get(&id)
    }

    /// Execution data for the given class, created all-unset if absent
    pub fn get_or_create(
        &mut self,
        id: i64,
        name: &str,
        probe_count: usize,
    ) -> SondaResult<&mut ExecutionData> {
        if let Some(entry) = self.entries.get(&id) {
            entry.check_compatibility(&ExecutionData::empty(id, name, probe_count))?;
        } else {
            self.names.insert(name.to_string());
            self.entries
                .insert(id, ExecutionData::empty(id, name, probe_count));
        }
        Ok(self.entries.get_mut(&id).unwrap())
    }

    /// Whether any class with the given name is contained
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Unset all probes that are set in the given recording
    ///
    /// No effect when the store has no entry for the recording's id.
    pub fn subtract(&mut self, data: &ExecutionData) -> SondaResult<()> {
        if let Some(entry) = self.entries.get_mut(&data.id) {
            entry.subtract(data)?;
        }
        Ok(())
    }

    /// Subtract every recording of the given store from this one
    pub fn subtract_store(&mut self, other: &ExecutionDataStore) -> SondaResult<()> {
        for data in other.contents() {
            self.subtract(data)?;
        }
        Ok(())
    }

    /// Mark all probes of all entries as not executed, keeping the entries
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.reset();
        }
    }

    /// Iterate over all entries in id order
    pub fn contents(&self) -> impl Iterator<Item = &ExecutionData> {
        self.entries.values()
    }

    /// Number of classes in the store
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only, ordered list of session records
#[derive(Debug, Clone, Default)]
pub struct SessionInfoStore {
    infos: Vec<SessionInfo>,
    ids: HashSet<String>,
}

impl SessionInfoStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a session record, rejecting duplicate ids
    pub fn push(&mut self, info: SessionInfo) -> SondaResult<()> {
        if !self.ids.insert(info.id.clone()) {
            return Err(SondaError::DuplicateSession { id: info.id });
        }
        self.infos.push(info);
        Ok(())
    }

    /// All sessions in insertion order
    #[must_use]
    pub fn infos(&self) -> &[SessionInfo] {
        &self.infos
    }

    /// Number of sessions recorded
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// True if no sessions were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}
