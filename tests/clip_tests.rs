// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Clip integration tests over generated ROS1 bags and rosbag2 directories.

mod common;

use common::*;
use rosbag_tools::io::metadata::SPLIT_EVENT_TOPIC;
use rosbag_tools::io::writer::StorageKind;
use rosbag_tools::io::ConnectionMetadata;
use rosbag_tools::{clip, open_reader, SegmentOptions, Segmenter, ToolError};

// ============================================================================
// ROS1 bags
// ============================================================================

#[test]
fn test_clip_without_bounds_copies_everything() {
    let dir = TempDir::new("clip_full");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    let written = clip(&input, &output, None, None, false).unwrap();

    assert_eq!(written, output);
    assert_eq!(read_entries(&output), expected_entries(0, RECORD_COUNT - 1));
}

#[test]
fn test_clip_window_is_inclusive() {
    let dir = TempDir::new("clip_window");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    let report = Segmenter::default()
        .clip(&input, &output, Some(2.0), Some(5.0))
        .unwrap();

    assert_eq!(read_entries(&output), expected_entries(2, 5));
    assert_eq!(report.total_written(), 4);
    assert_eq!(report.outputs[0].path, output);
}

#[test]
fn test_clip_bounds_between_records() {
    let dir = TempDir::new("clip_between");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    clip(&input, &output, Some(2.5), Some(4.5), false).unwrap();

    assert_eq!(timestamps(&output), vec![stamp(3), stamp(4)]);
}

#[test]
fn test_clip_open_end_defaults_to_bag_end() {
    let dir = TempDir::new("clip_open_end");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    clip(&input, &output, Some(7.0), None, false).unwrap();

    assert_eq!(read_entries(&output), expected_entries(7, RECORD_COUNT - 1));
}

#[test]
fn test_clip_keeps_connection_headers() {
    let dir = TempDir::new("clip_headers");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    clip(&input, &output, Some(0.0), Some(1.0), false).unwrap();

    let reader = open_reader(&output).unwrap();
    let topics: Vec<&str> = reader
        .connections()
        .iter()
        .map(|c| c.topic.as_str())
        .collect();
    assert_eq!(topics, TOPICS.to_vec());
    for conn in reader.connections() {
        assert_eq!(conn.message_type, "std_msgs/String");
        match &conn.metadata {
            ConnectionMetadata::Flat(meta) => {
                assert_eq!(meta.md5sum, STRING_MD5);
                assert_eq!(meta.message_definition, "string data\n");
                assert_eq!(meta.callerid.as_deref(), Some("/recorder"));
            }
            other => panic!("unexpected metadata: {other:?}"),
        }
    }
}

#[test]
fn test_clip_single_record_bag() {
    let dir = TempDir::new("clip_single");
    let input = write_single_record_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    clip(&input, &output, Some(0.0), Some(0.0), false).unwrap();

    assert_eq!(timestamps(&output), vec![START_NS]);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_clip_start_past_end_of_bag() {
    let dir = TempDir::new("clip_late_start");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    let err = clip(&input, &output, Some(100.0), None, false).unwrap_err();

    match err {
        ToolError::InvalidTimestamp { value, min, max, .. } => {
            assert_eq!(value, 100.0);
            assert_eq!(min, 0.0);
            assert_eq!(max, 9.0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_clip_negative_start() {
    let dir = TempDir::new("clip_negative");
    let input = write_flat_bag(&dir.join("in.bag"));

    let err = clip(&input, dir.join("out.bag"), Some(-1.0), None, false).unwrap_err();
    assert!(matches!(err, ToolError::InvalidTimestamp { .. }));
}

#[test]
fn test_clip_end_before_start() {
    let dir = TempDir::new("clip_reversed");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");

    let err = clip(&input, &output, Some(5.0), Some(2.0), false).unwrap_err();

    assert!(matches!(err, ToolError::InvalidTimestamp { .. }));
    assert!(!output.exists());
}

#[test]
fn test_clip_onto_itself_fails_even_with_force() {
    let dir = TempDir::new("clip_same");
    let input = write_flat_bag(&dir.join("in.bag"));

    let err = clip(&input, &input, None, None, true).unwrap_err();

    assert!(matches!(err, ToolError::SameFile { .. }));
    assert_eq!(read_entries(&input).len() as u64, RECORD_COUNT);
}

#[test]
fn test_clip_across_generations_fails() {
    let dir = TempDir::new("clip_cross");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out_dir");

    let err = clip(&input, &output, None, None, false).unwrap_err();

    match err {
        ToolError::UnsupportedConversion {
            input_generation,
            output_generation,
            ..
        } => {
            assert_eq!(input_generation, "ROS1 bag");
            assert_eq!(output_generation, "rosbag2");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_clip_bag_recognized_by_magic_keeps_its_naming() {
    let dir = TempDir::new("clip_magic_only");
    let input = write_flat_bag(&dir.join("rec.raw"));
    let output = dir.join("rec_clip.raw");

    clip(&input, &output, Some(1.0), Some(3.0), false).unwrap();

    assert!(output.is_file());
    assert_eq!(read_entries(&output), expected_entries(1, 3));
}

#[test]
fn test_clip_missing_input() {
    let dir = TempDir::new("clip_missing");
    let err = clip(dir.join("nope.bag"), dir.join("out.bag"), None, None, false).unwrap_err();
    assert!(matches!(err, ToolError::NotAContainer { .. }));
}

// ============================================================================
// rosbag2 directories
// ============================================================================

#[test]
fn test_clip_rosbag2_sqlite_drops_control_topic() {
    let dir = TempDir::new("clip_db3");
    let input = write_rosbag2(&dir.join("in"), StorageKind::Sqlite3);
    let output = dir.join("out");

    clip(&input, &output, None, None, false).unwrap();

    let entries = read_entries(&output);
    assert!(entries.iter().all(|e| e.topic != SPLIT_EVENT_TOPIC));
    assert_eq!(sorted(entries), expected_entries(0, RECORD_COUNT - 1));

    let reader = open_reader(&output).unwrap();
    assert!(!reader.topics().contains(SPLIT_EVENT_TOPIC));
    assert!(output.join("metadata.yaml").is_file());
    assert!(output.join("out_0.db3").is_file());
}

#[test]
fn test_clip_rosbag2_mcap_window() {
    let dir = TempDir::new("clip_mcap");
    let input = write_rosbag2(&dir.join("in"), StorageKind::Mcap);
    let output = dir.join("out");

    let report = Segmenter::new(SegmentOptions::default())
        .clip(&input, &output, Some(1.0), Some(3.0))
        .unwrap();

    assert_eq!(sorted(read_entries(&output)), expected_entries(1, 3));
    assert_eq!(report.total_written(), 3);
    assert!(output.join("out_0.mcap").is_file());
}

#[test]
fn test_clip_rosbag2_into_bag_fails() {
    let dir = TempDir::new("clip_db3_cross");
    let input = write_rosbag2(&dir.join("in"), StorageKind::Sqlite3);

    let err = clip(&input, dir.join("out.bag"), None, None, false).unwrap_err();

    assert!(matches!(err, ToolError::UnsupportedConversion { .. }));
}
