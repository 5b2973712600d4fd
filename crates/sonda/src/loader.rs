//! Convenience container for loading and saving exec files

use crate::codec::{ExecDataReader, ExecDataWriter};
use crate::data::{ExecutionDataStore, SessionInfoStore};
use crate::error::SondaResult;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Execution data and session infos loaded from exec files or dumps
///
/// Multiple files may be loaded in sequence into the same loader; entries
/// for the same class merge probe-wise.
#[derive(Debug, Default)]
pub struct ExecFileLoader {
    store: ExecutionDataStore,
    sessions: SessionInfoStore,
}

impl ExecFileLoader {
    /// Create an empty loader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read all records of the given exec file into this loader
    pub fn load(&mut self, path: impl AsRef<Path>) -> SondaResult<()> {
        let file = File::open(path)?;
        let mut reader = ExecDataReader::new(BufReader::new(file));
        reader.read_into(&mut self.store, &mut self.sessions)?;
        Ok(())
    }

    /// Write the loaded content to the given file
    ///
    /// With `append`, records are added after the existing content; the
    /// reader tolerates the repeated stream header this produces.
    pub fn save(&self, path: impl AsRef<Path>, append: bool) -> SondaResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        let mut writer = ExecDataWriter::new(BufWriter::new(file));
        writer.write_sessions(&self.sessions)?;
        writer.write_store(&self.store)?;
        writer.flush()?;
        Ok(())
    }

    /// Loaded execution data
    #[must_use]
    pub fn execution_data(&self) -> &ExecutionDataStore {
        &self.store
    }

    /// Loaded session infos
    #[must_use]
    pub fn session_infos(&self) -> &SessionInfoStore {
        &self.sessions
    }

    /// Mutable access to both stores, for readers that fill the loader
    pub fn stores_mut(&mut self) -> (&mut ExecutionDataStore, &mut SessionInfoStore) {
        (&mut self.store, &mut self.sessions)
    }

    /// Take ownership of both stores
    #[must_use]
    pub fn into_stores(self) -> (ExecutionDataStore, SessionInfoStore) {
        (self.store, self.sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ExecutionData, SessionInfo};

    fn loader_with_data() -> ExecFileLoader {
        let mut loader = ExecFileLoader::new();
        let (store, sessions) = loader.stores_mut();
        store
            .put(ExecutionData::new(0x1, "Foo", vec![true, false]))
            .unwrap();
        sessions
            .push(SessionInfo::new("s1", 100, 200).unwrap())
            .unwrap();
        loader
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.exec");
        loader_with_data().save(&path, false).unwrap();

        let mut loaded = ExecFileLoader::new();
        loaded.load(&path).unwrap();
        assert_eq!(
            loaded.execution_data().get(0x1).unwrap().probes(),
            &[true, false]
        );
        assert_eq!(loaded.session_infos().infos()[0].id(), "s1");
    }

    #[test]
    fn test_loading_two_files_merges_on_insert() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.exec");
        let second = dir.path().join("b.exec");
        loader_with_data().save(&first, false).unwrap();

        let mut other = ExecFileLoader::new();
        other
            .stores_mut()
            .0
            .put(ExecutionData::new(0x1, "Foo", vec![false, true]))
            .unwrap();
        other.save(&second, false).unwrap();

        let mut loaded = ExecFileLoader::new();
        loaded.load(&first).unwrap();
        loaded.load(&second).unwrap();
        assert_eq!(
            loaded.execution_data().get(0x1).unwrap().probes(),
            &[true, true]
        );
    }

    #[test]
    fn test_append_writes_a_readable_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coverage.exec");
        loader_with_data().save(&path, false).unwrap();

        let mut more = ExecFileLoader::new();
        more.stores_mut()
            .0
            .put(ExecutionData::new(0x2, "Bar", vec![true]))
            .unwrap();
        more.save(&path, true).unwrap();

        let mut loaded = ExecFileLoader::new();
        loaded.load(&path).unwrap();
        assert!(loaded.execution_data().get(0x1).is_some());
        assert!(loaded.execution_data().get(0x2).is_some());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/coverage.exec");
        loader_with_data().save(&path, false).unwrap();
        assert!(path.exists());
    }
}
