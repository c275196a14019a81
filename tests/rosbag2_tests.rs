// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! rosbag2 directory tests: metadata, multi-file directories and storage
//! selection.

mod common;

use std::fs;

use common::*;
use rosbag_tools::io::formats::rosbag2::{read_metadata, write_metadata, Rosbag2Reader, Rosbag2Writer};
use rosbag_tools::io::writer::{StorageKind, WriterBuilder};
use rosbag_tools::io::{classify, Classification, ConnectionMetadata, SegmentedMetadata};
use rosbag_tools::{open_reader, FormatReader, FormatWriter, Generation, SegmentOptions, Segmenter, ToolError};

const QOS: &str = "- history: 3\n  depth: 0\n  reliability: 1\n  durability: 2\n";

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn test_writer_produces_metadata() {
    let dir = TempDir::new("r2_metadata");
    let bag = write_rosbag2(&dir.join("run"), StorageKind::Sqlite3);

    let info = read_metadata(&bag).unwrap().expect("metadata.yaml");

    assert_eq!(info.version, 5);
    assert_eq!(info.storage_identifier, "sqlite3");
    assert_eq!(info.message_count, RECORD_COUNT + 1);
    assert_eq!(info.starting_time.nanoseconds_since_epoch, START_NS);
    assert_eq!(info.duration.nanoseconds, stamp(RECORD_COUNT - 1) - START_NS);
    assert_eq!(info.relative_file_paths, vec!["run_0.db3".to_string()]);
    let a = info
        .topics_with_message_count
        .iter()
        .find(|t| t.topic_metadata.name == "/a")
        .unwrap();
    assert_eq!(a.message_count, 4);
    assert_eq!(a.topic_metadata.message_type, "std_msgs/msg/String");
}

#[test]
fn test_reader_without_metadata_file() {
    let dir = TempDir::new("r2_no_metadata");
    let bag = write_rosbag2(&dir.join("run"), StorageKind::Mcap);
    fs::remove_file(bag.join("metadata.yaml")).unwrap();

    let reader = open_reader(&bag).unwrap();

    assert_eq!(reader.generation(), Generation::Segmented);
    assert_eq!(reader.message_count(), RECORD_COUNT + 1);
    assert_eq!(reader.start_time(), START_NS);
    assert_eq!(reader.end_time(), stamp(RECORD_COUNT - 1));
}

#[test]
fn test_compressed_bag_is_unsupported() {
    let dir = TempDir::new("r2_compressed");
    let bag = write_rosbag2(&dir.join("run"), StorageKind::Sqlite3);
    let mut info = read_metadata(&bag).unwrap().unwrap();
    info.compression_format = "zstd".to_string();
    info.compression_mode = "file".to_string();
    write_metadata(&bag, &info).unwrap();

    let err = open_reader(&bag).err().expect("compressed bag must be rejected");

    assert!(matches!(err, ToolError::Unsupported { .. }));
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_directory_without_storage_files() {
    let dir = TempDir::new("r2_empty");
    let empty = dir.join("empty");
    fs::create_dir_all(&empty).unwrap();
    fs::write(empty.join("notes.txt"), b"").unwrap();

    assert_eq!(classify(&empty), Classification::NotAContainer);
    let err = open_reader(&empty).err().expect("not a container");
    assert!(matches!(err, ToolError::NotAContainer { .. }));
}

#[test]
fn test_mixed_storage_plugins_are_unsupported() {
    let dir = TempDir::new("r2_mixed");
    let db3 = write_rosbag2(&dir.join("a"), StorageKind::Sqlite3);
    let mcap = write_rosbag2(&dir.join("b"), StorageKind::Mcap);
    fs::copy(mcap.join("b_0.mcap"), db3.join("a_1.mcap")).unwrap();
    fs::remove_file(db3.join("metadata.yaml")).unwrap();

    let err = open_reader(&db3).err().expect("mixed plugins");

    assert!(matches!(err, ToolError::Unsupported { .. }));
}

// ============================================================================
// Multi-file directories
// ============================================================================

#[test]
fn test_multi_file_directory_merges_in_time_order() {
    let dir = TempDir::new("r2_multi");
    let first = write_rosbag2(&dir.join("a"), StorageKind::Sqlite3);
    let second = write_rosbag2(&dir.join("b"), StorageKind::Sqlite3);
    fs::copy(second.join("b_0.db3"), first.join("a_1.db3")).unwrap();
    fs::remove_file(first.join("metadata.yaml")).unwrap();

    let reader = Rosbag2Reader::open(&first).unwrap();

    assert_eq!(reader.storage_paths().len(), 2);
    assert_eq!(reader.connections().len(), TOPICS.len() + 1);
    assert_eq!(reader.message_count(), 2 * (RECORD_COUNT + 1));

    let stamps: Vec<u64> = read_entries(&first).iter().map(|e| e.timestamp).collect();
    assert_eq!(stamps.len() as u64, 2 * (RECORD_COUNT + 1));
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_clip_of_multi_file_directory_writes_one_file() {
    let dir = TempDir::new("r2_multi_clip");
    let first = write_rosbag2(&dir.join("a"), StorageKind::Sqlite3);
    let second = write_rosbag2(&dir.join("b"), StorageKind::Sqlite3);
    fs::copy(second.join("b_0.db3"), first.join("a_1.db3")).unwrap();
    fs::remove_file(first.join("metadata.yaml")).unwrap();
    let output = dir.join("out");

    let report = Segmenter::default()
        .clip(&first, &output, Some(0.0), Some(1.0))
        .unwrap();

    assert_eq!(report.total_written(), 4);
    let info = read_metadata(&output).unwrap().unwrap();
    assert_eq!(info.relative_file_paths, vec!["out_0.db3".to_string()]);
}

// ============================================================================
// Storage selection
// ============================================================================

#[test]
fn test_output_storage_can_be_overridden() {
    let dir = TempDir::new("r2_override");
    let input = write_rosbag2(&dir.join("in"), StorageKind::Sqlite3);
    let output = dir.join("out");
    let options =
        SegmentOptions::default().writer(WriterBuilder::new().storage(StorageKind::Mcap).build());

    Segmenter::new(options)
        .clip(&input, &output, None, None)
        .unwrap();

    assert!(output.join("out_0.mcap").is_file());
    assert!(!output.join("out_0.db3").exists());
    assert_eq!(
        Rosbag2Reader::open(&output).unwrap().storage_kind(),
        StorageKind::Mcap
    );
    assert_eq!(sorted(read_entries(&output)), expected_entries(0, RECORD_COUNT - 1));
}

#[test]
fn test_qos_profiles_survive_clip() {
    for storage in [StorageKind::Sqlite3, StorageKind::Mcap] {
        let dir = TempDir::new("r2_qos");
        let input = dir.join("in");
        let metadata = ConnectionMetadata::Segmented(SegmentedMetadata {
            serialization_format: "cdr".to_string(),
            offered_qos_profiles: QOS.to_string(),
        });
        let mut writer = Rosbag2Writer::create(&input, storage).unwrap();
        let id = writer
            .add_connection("/tf", "tf2_msgs/msg/TFMessage", &metadata)
            .unwrap();
        writer.write(id, START_NS, b"tf").unwrap();
        writer.finish().unwrap();
        drop(writer);

        let output = dir.join("out");
        Segmenter::default().clip(&input, &output, None, None).unwrap();

        let reader = open_reader(&output).unwrap();
        let conn = &reader.connections()[0];
        assert_eq!(conn.topic, "/tf");
        assert_eq!(conn.message_type, "tf2_msgs/msg/TFMessage");
        assert_eq!(conn.metadata, metadata, "storage {storage}");
    }
}

// ============================================================================
// Record order
// ============================================================================

#[test]
fn test_mcap_out_of_order_writes_are_read_and_clipped_in_time_order() {
    let dir = TempDir::new("r2_mcap_order");
    let input = dir.join("in");
    let metadata = ConnectionMetadata::Segmented(SegmentedMetadata {
        serialization_format: "cdr".to_string(),
        offered_qos_profiles: String::new(),
    });
    let mut writer = Rosbag2Writer::create(&input, StorageKind::Mcap).unwrap();
    let id = writer
        .add_connection("/a", "std_msgs/msg/String", &metadata)
        .unwrap();
    for offset in [300, 100, 200] {
        writer.write(id, START_NS + offset, b"x").unwrap();
    }
    writer.finish().unwrap();
    drop(writer);

    let in_order = |path: &std::path::Path| -> Vec<u64> {
        read_entries(path).iter().map(|e| e.timestamp).collect()
    };
    let expected = vec![START_NS + 100, START_NS + 200, START_NS + 300];
    assert_eq!(in_order(&input), expected);

    let output = dir.join("out");
    Segmenter::default().clip(&input, &output, None, None).unwrap();
    assert_eq!(in_order(&output), expected);
}

#[test]
fn test_multi_file_mcap_directory_merges_in_time_order() {
    let dir = TempDir::new("r2_mcap_multi");
    let first = write_rosbag2(&dir.join("a"), StorageKind::Mcap);
    let second = write_rosbag2(&dir.join("b"), StorageKind::Mcap);
    fs::copy(second.join("b_0.mcap"), first.join("a_1.mcap")).unwrap();
    fs::remove_file(first.join("metadata.yaml")).unwrap();

    let stamps: Vec<u64> = read_entries(&first).iter().map(|e| e.timestamp).collect();

    assert_eq!(stamps.len() as u64, 2 * (RECORD_COUNT + 1));
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}
