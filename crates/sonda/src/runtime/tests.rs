//! Tests for live probe state

use super::*;
use crate::codec::{ExecDataReader, Record};
use crate::data::{ExecutionDataStore, SessionInfoStore};
use std::io::Cursor;

mod probe_array_tests {
    use super::*;

    #[test]
    fn test_probes_start_unset() {
        let probes = ProbeArray::new(16);
        assert_eq!(probes.len(), 16);
        assert!(probes.snapshot().iter().all(|p| !p));
    }

    #[test]
    fn test_hit_and_snapshot() {
        let probes = ProbeArray::new(4);
        probes.hit(1);
        probes.hit(3);
        assert!(probes.is_hit(1));
        assert!(!probes.is_hit(0));
        assert_eq!(probes.snapshot(), [false, true, false, true]);
    }

    #[test]
    fn test_clear_unsets_everything() {
        let probes = ProbeArray::new(3);
        probes.hit(0);
        probes.hit(2);
        probes.clear();
        assert_eq!(probes.snapshot(), [false, false, false]);
    }

    #[test]
    fn test_concurrent_hits_are_all_observed() {
        let probes = Arc::new(ProbeArray::new(64));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let probes = Arc::clone(&probes);
                std::thread::spawn(move || {
                    for i in 0..64 {
                        if i % 8 == t {
                            probes.hit(i);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(probes.snapshot().iter().all(|p| *p));
    }
}

mod runtime_data_tests {
    use super::*;

    fn collect_to_records(runtime: &RuntimeData, reset: bool) -> Vec<Record> {
        let mut buf = Vec::new();
        let mut writer = ExecDataWriter::new(&mut buf);
        runtime.collect(&mut writer, reset).unwrap();
        writer.flush().unwrap();
        let mut reader = ExecDataReader::new(Cursor::new(buf));
        let mut records = Vec::new();
        while let Some(record) = reader.read_next().unwrap() {
            records.push(record);
        }
        records
    }

    #[test]
    fn test_probes_are_shared_per_class() {
        let runtime = RuntimeData::with_session_id("test");
        let a = runtime.probes(0x1, "Foo", 4).unwrap();
        let b = runtime.probes(0x1, "Foo", 4).unwrap();
        a.hit(2);
        assert!(b.is_hit(2));
    }

    #[test]
    fn test_probe_count_mismatch_is_structural() {
        let runtime = RuntimeData::with_session_id("test");
        runtime.probes(0x1, "Foo", 4).unwrap();
        let err = runtime.probes(0x1, "Foo", 5).unwrap_err();
        assert!(matches!(err, SondaError::StructuralMismatch { .. }));
    }

    #[test]
    fn test_collect_writes_session_then_data() {
        let runtime = RuntimeData::with_session_id("session-1");
        runtime.probes(0x1, "Foo", 2).unwrap().hit(0);
        let records = collect_to_records(&runtime, false);
        assert_eq!(records.len(), 2);
        match &records[0] {
            Record::SessionInfo(info) => {
                assert_eq!(info.id(), "session-1");
                assert!(info.start_time() <= info.dump_time());
            }
            other => panic!("expected session info first, got {other:?}"),
        }
        match &records[1] {
            Record::ExecutionData(data) => {
                assert_eq!(data.name(), "Foo");
                assert_eq!(data.probes(), &[true, false]);
            }
            other => panic!("expected execution data, got {other:?}"),
        }
    }

    #[test]
    fn test_collect_with_reset_clears_probes() {
        let runtime = RuntimeData::with_session_id("session-1");
        let probes = runtime.probes(0x1, "Foo", 2).unwrap();
        probes.hit(0);
        probes.hit(1);
        collect_to_records(&runtime, true);
        assert_eq!(probes.snapshot(), [false, false]);

        // a later dump reports the cleared state
        let records = collect_to_records(&runtime, false);
        match &records[1] {
            Record::ExecutionData(data) => assert_eq!(data.probes(), &[false, false]),
            other => panic!("expected execution data, got {other:?}"),
        }
    }

    #[test]
    fn test_collected_stream_loads_into_stores() {
        let runtime = RuntimeData::with_session_id("session-1");
        runtime.probes(0x12345678, "Foo", 1).unwrap().hit(0);

        let mut buf = Vec::new();
        let mut writer = ExecDataWriter::new(&mut buf);
        runtime.collect(&mut writer, false).unwrap();
        writer.flush().unwrap();

        let mut store = ExecutionDataStore::new();
        let mut sessions = SessionInfoStore::new();
        ExecDataReader::new(Cursor::new(buf))
            .read_into(&mut store, &mut sessions)
            .unwrap();
        assert_eq!(store.get(0x12345678).unwrap().name(), "Foo");
        assert_eq!(sessions.infos()[0].id(), "session-1");
    }
}
