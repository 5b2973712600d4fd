//! Tests for the binary codec

use super::*;
use crate::data::{ExecutionData, ExecutionDataStore, SessionInfo, SessionInfoStore};
use crate::error::SondaError;
use proptest::prelude::*;
use std::io::Cursor;

fn encode<F: FnOnce(&mut ExecDataWriter<Vec<u8>>)>(f: F) -> Vec<u8> {
    let mut writer = ExecDataWriter::new(Vec::new());
    f(&mut writer);
    writer.flush().unwrap();
    writer.into_inner()
}

mod compact_tests {
    use super::*;

    #[test]
    fn test_var_int_known_encodings() {
        let cases: &[(u32, &[u8])] = &[
            (0, &[0x00]),
            (0x7F, &[0x7F]),
            (0x80, &[0x80, 0x01]),
            (0x1234, &[0xB4, 0x24]),
            (u32::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];
        for (value, expected) in cases {
            let mut buf = Vec::new();
            CompactWriter::new(&mut buf).write_var_int(*value).unwrap();
            assert_eq!(&buf, expected, "encoding of {value}");
            let decoded = CompactReader::new(Cursor::new(&buf)).read_var_int().unwrap();
            assert_eq!(decoded, *value, "round-trip of {value}");
        }
    }

    #[test]
    fn test_var_int_rejects_overflow() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        let err = CompactReader::new(Cursor::new(&bytes))
            .read_var_int()
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_bool_array_packs_lsb_first() {
        let mut buf = Vec::new();
        CompactWriter::new(&mut buf)
            .write_bool_array(&[true, false, false, true, false, false, false, false, true])
            .unwrap();
        // count 9, then 0b0000_1001, then 0b0000_0001
        assert_eq!(buf, [0x09, 0x09, 0x01]);
    }

    #[test]
    fn test_bool_array_round_trip() {
        let values = vec![true, false, true, true, false, false, true, false, true, true];
        let mut buf = Vec::new();
        CompactWriter::new(&mut buf).write_bool_array(&values).unwrap();
        let decoded = CompactReader::new(Cursor::new(&buf))
            .read_bool_array()
            .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_utf_round_trip() {
        let mut buf = Vec::new();
        CompactWriter::new(&mut buf)
            .write_utf("com/example/Übung")
            .unwrap();
        let decoded = CompactReader::new(Cursor::new(&buf)).read_utf().unwrap();
        assert_eq!(decoded, "com/example/Übung");
    }

    proptest! {
        #[test]
        fn prop_var_int_round_trips(value in any::<u32>()) {
            let mut buf = Vec::new();
            CompactWriter::new(&mut buf).write_var_int(value).unwrap();
            let decoded = CompactReader::new(Cursor::new(&buf)).read_var_int().unwrap();
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn prop_bool_array_round_trips(
            values in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let mut buf = Vec::new();
            CompactWriter::new(&mut buf).write_bool_array(&values).unwrap();
            let decoded = CompactReader::new(Cursor::new(&buf))
                .read_bool_array()
                .unwrap();
            prop_assert_eq!(decoded, values);
        }
    }
}

mod framing_tests {
    use super::*;

    #[test]
    fn test_header_is_written_lazily_once() {
        let bytes = encode(|w| {
            w.write_session_info(&SessionInfo::new("s", 1, 2).unwrap())
                .unwrap();
            w.write_session_info(&SessionInfo::new("t", 3, 4).unwrap())
                .unwrap();
        });
        // one header: tag, magic, version
        assert_eq!(&bytes[..5], &[0x01, 0xC0, 0xC0, 0x10, 0x07]);
        assert_eq!(bytes[5], BLOCK_SESSIONINFO);
        let headers = bytes
            .windows(3)
            .filter(|w| *w == [BLOCK_HEADER, 0xC0, 0xC0])
            .count();
        assert_eq!(headers, 1, "header must not repeat");
    }

    #[test]
    fn test_round_trip_is_bit_for_bit() {
        let session = SessionInfo::new("machine-1", 1_000, 2_000).unwrap();
        let data = ExecutionData::new(
            0x1234_5678,
            "com/example/Foo",
            vec![true, false, true, false, false, true, true, false, true],
        );
        let bytes = encode(|w| {
            w.write_session_info(&session).unwrap();
            w.write_execution_data(&data).unwrap();
        });

        let mut reader = ExecDataReader::new(Cursor::new(&bytes));
        assert_eq!(
            reader.read_next().unwrap(),
            Some(Record::SessionInfo(session.clone()))
        );
        assert_eq!(
            reader.read_next().unwrap(),
            Some(Record::ExecutionData(data.clone()))
        );
        assert_eq!(reader.read_next().unwrap(), None);

        // re-encoding the decoded records reproduces the same bytes
        let reencoded = encode(|w| {
            w.write_session_info(&session).unwrap();
            w.write_execution_data(&data).unwrap();
        });
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn test_command_records_round_trip() {
        let bytes = encode(|w| {
            w.write_dump_command(true, false).unwrap();
            w.write_cmd_ok().unwrap();
        });
        let mut reader = ExecDataReader::new(Cursor::new(&bytes));
        assert_eq!(
            reader.read_next().unwrap(),
            Some(Record::DumpCommand {
                dump: true,
                reset: false
            })
        );
        assert_eq!(reader.read_next().unwrap(), Some(Record::CmdOk));
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let bytes = [BLOCK_SESSIONINFO, 0, 1];
        let err = ExecDataReader::new(Cursor::new(&bytes))
            .read_next()
            .unwrap_err();
        assert!(matches!(err, SondaError::Format { .. }));
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let bytes = [BLOCK_HEADER, 0xCA, 0xFE, 0x10, 0x07];
        let err = ExecDataReader::new(Cursor::new(&bytes))
            .read_next()
            .unwrap_err();
        assert!(matches!(err, SondaError::Format { .. }));
    }

    #[test]
    fn test_wrong_version_is_distinguishable() {
        let bytes = [BLOCK_HEADER, 0xC0, 0xC0, 0x10, 0x08];
        let err = ExecDataReader::new(Cursor::new(&bytes))
            .read_next()
            .unwrap_err();
        assert!(matches!(
            err,
            SondaError::IncompatibleVersion {
                version: 0x1008,
                expected: FORMAT_VERSION
            }
        ));
    }

    #[test]
    fn test_unknown_tag_is_fatal() {
        let mut bytes = encode(|w| {
            w.write_cmd_ok().unwrap();
        });
        bytes.push(0x7F);
        let mut reader = ExecDataReader::new(Cursor::new(&bytes));
        assert_eq!(reader.read_next().unwrap(), Some(Record::CmdOk));
        let err = reader.read_next().unwrap_err();
        assert!(err.to_string().contains("0x7f"));
    }

    #[test]
    fn test_truncation_mid_record_is_distinct_from_clean_eof() {
        let full = encode(|w| {
            w.write_execution_data(&ExecutionData::new(0x1, "Foo", vec![true, true, false]))
                .unwrap();
        });

        // clean end of stream between records
        let mut reader = ExecDataReader::new(Cursor::new(&full));
        assert!(reader.read_next().unwrap().is_some());
        assert_eq!(reader.read_next().unwrap(), None);

        // stream cut inside the record
        let mut reader = ExecDataReader::new(Cursor::new(&full[..full.len() - 1]));
        let err = reader.read_next().unwrap_err();
        assert!(matches!(
            err,
            SondaError::TruncatedRecord {
                record: "execution data"
            }
        ));
    }

    #[test]
    fn test_concatenated_streams_load_into_one_store() {
        let first = encode(|w| {
            w.write_execution_data(&ExecutionData::new(0x1, "Foo", vec![true, false]))
                .unwrap();
        });
        let second = encode(|w| {
            w.write_execution_data(&ExecutionData::new(0x1, "Foo", vec![false, true]))
                .unwrap();
        });
        let mut bytes = first;
        bytes.extend_from_slice(&second);

        let mut store = ExecutionDataStore::new();
        let mut sessions = SessionInfoStore::new();
        let saw_ok = ExecDataReader::new(Cursor::new(&bytes))
            .read_into(&mut store, &mut sessions)
            .unwrap();
        assert!(!saw_ok);
        assert_eq!(store.get(0x1).unwrap().probes(), &[true, true]);
    }

    #[test]
    fn test_dump_response_rejects_interleaved_session_info() {
        let bytes = encode(|w| {
            w.write_execution_data(&ExecutionData::new(0x1, "Foo", vec![true]))
                .unwrap();
            w.write_session_info(&SessionInfo::new("late", 1, 2).unwrap())
                .unwrap();
            w.write_cmd_ok().unwrap();
        });
        let mut store = ExecutionDataStore::new();
        let mut sessions = SessionInfoStore::new();
        let err = ExecDataReader::new(Cursor::new(&bytes))
            .read_dump_response(&mut store, &mut sessions)
            .unwrap_err();
        assert!(matches!(err, SondaError::Format { .. }));
    }

    #[test]
    fn test_dump_response_accepts_ordered_records() {
        let bytes = encode(|w| {
            w.write_session_info(&SessionInfo::new("s", 1, 2).unwrap())
                .unwrap();
            w.write_execution_data(&ExecutionData::new(0x1, "Foo", vec![true]))
                .unwrap();
            w.write_cmd_ok().unwrap();
        });
        let mut store = ExecutionDataStore::new();
        let mut sessions = SessionInfoStore::new();
        let saw_ok = ExecDataReader::new(Cursor::new(&bytes))
            .read_dump_response(&mut store, &mut sessions)
            .unwrap();
        assert!(saw_ok);
        assert_eq!(sessions.len(), 1);
        assert_eq!(store.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_record_sequences_round_trip(
            probe_sets in proptest::collection::vec(
                proptest::collection::vec(any::<bool>(), 0..40),
                1..8,
            ),
        ) {
            let records: Vec<ExecutionData> = probe_sets
                .into_iter()
                .enumerate()
                .map(|(i, probes)| ExecutionData::new(i as i64, format!("C{i}"), probes))
                .collect();
            let bytes = encode(|w| {
                for data in &records {
                    w.write_execution_data(data).unwrap();
                }
            });
            let mut reader = ExecDataReader::new(Cursor::new(&bytes));
            for expected in &records {
                let record = reader.read_next().unwrap();
                prop_assert_eq!(record, Some(Record::ExecutionData(expected.clone())));
            }
            prop_assert_eq!(reader.read_next().unwrap(), None);
        }
    }
}
