// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag writer tests.
//!
//! Output is checked against the independent `rosbag` crate as well as
//! this crate's own reader.

mod common;

use std::collections::BTreeMap;

use common::*;
use rosbag::{ChunkRecord, IndexRecord, MessageRecord, RosBag};
use rosbag_tools::io::formats::bag::{BagReader, BagWriter};
use rosbag_tools::io::writer::{BagCompression, WriterBuilder};
use rosbag_tools::io::{ConnectionMetadata, SegmentedMetadata};
use rosbag_tools::{clip, FormatWriter, SegmentOptions, Segmenter, ToolError, WriterConfig};

// ============================================================================
// Cross-check with the rosbag crate
// ============================================================================

#[test]
fn test_rosbag_crate_reads_connections() {
    let dir = TempDir::new("bag_index");
    let path = write_flat_bag(&dir.join("in.bag"));

    let bag = RosBag::new(&path).unwrap();
    let mut connections = BTreeMap::new();
    for record in bag.index_records() {
        if let IndexRecord::Connection(conn) = record.unwrap() {
            connections.insert(
                conn.id,
                (
                    conn.topic.to_string(),
                    conn.tp.to_string(),
                    conn.caller_id.to_string(),
                ),
            );
        }
    }

    assert_eq!(connections.len(), TOPICS.len());
    for (i, topic) in TOPICS.iter().enumerate() {
        let (name, tp, caller) = &connections[&(i as u32)];
        assert_eq!(name, topic);
        assert_eq!(tp, "std_msgs/String");
        assert_eq!(caller, "/recorder");
    }
}

#[test]
fn test_rosbag_crate_reads_messages() {
    let dir = TempDir::new("bag_messages");
    let path = write_flat_bag(&dir.join("in.bag"));

    let bag = RosBag::new(&path).unwrap();
    let mut topics = BTreeMap::new();
    let mut seen = Vec::new();
    for record in bag.chunk_records() {
        if let ChunkRecord::Chunk(chunk) = record.unwrap() {
            for msg in chunk.messages() {
                let msg = msg.unwrap();
                if let MessageRecord::Connection(conn) = &msg {
                    topics.insert(conn.id, conn.topic.to_string());
                }
                if let MessageRecord::MessageData(data) = &msg {
                    seen.push(Entry {
                        topic: topics[&data.conn_id].clone(),
                        timestamp: data.time,
                        data: data.data.to_vec(),
                    });
                }
            }
        }
    }

    assert_eq!(seen, expected_entries(0, RECORD_COUNT - 1));
}

#[test]
fn test_small_chunk_threshold_produces_many_chunks() {
    let dir = TempDir::new("bag_chunks");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");
    let options =
        SegmentOptions::default().writer(WriterBuilder::new().chunk_threshold(64).build());

    Segmenter::new(options)
        .clip(&input, &output, None, None)
        .unwrap();

    let reader = BagReader::open(&output).unwrap();
    assert!(reader.parser().chunks().len() > 1);
    assert_eq!(read_entries(&output), expected_entries(0, RECORD_COUNT - 1));

    let bag = RosBag::new(&output).unwrap();
    let chunks = bag
        .chunk_records()
        .filter(|r| matches!(r, Ok(ChunkRecord::Chunk(_))))
        .count();
    assert_eq!(chunks, reader.parser().chunks().len());
}

// ============================================================================
// Compression
// ============================================================================

#[test]
fn test_bz2_chunks_round_trip() {
    let dir = TempDir::new("bag_bz2");
    let input = write_flat_bag(&dir.join("in.bag"));
    let output = dir.join("out.bag");
    let options = SegmentOptions::default()
        .writer(WriterBuilder::new().compression(BagCompression::Bz2).build());

    Segmenter::new(options)
        .clip(&input, &output, Some(1.0), Some(8.0))
        .unwrap();

    assert_eq!(read_entries(&output), expected_entries(1, 8));
}

#[test]
fn test_compressed_input_clips_to_plain_output() {
    let dir = TempDir::new("bag_bz2_in");
    let input = write_flat_bag(&dir.join("in.bag"));
    let compressed = dir.join("bz2.bag");
    let options = SegmentOptions::default()
        .writer(WriterBuilder::new().compression(BagCompression::Bz2).build());
    Segmenter::new(options)
        .clip(&input, &compressed, None, None)
        .unwrap();
    let output = dir.join("out.bag");

    clip(&compressed, &output, Some(0.0), Some(3.0), false).unwrap();

    assert_eq!(read_entries(&output), expected_entries(0, 3));
}

// ============================================================================
// Writer contract
// ============================================================================

#[test]
fn test_unknown_connection_is_rejected() {
    let dir = TempDir::new("bag_unknown_conn");
    let mut writer = BagWriter::create(dir.join("out.bag"), &WriterConfig::default()).unwrap();

    let err = writer.write(3, START_NS, b"x").unwrap_err();

    assert!(matches!(err, ToolError::Parse { .. }));
}

#[test]
fn test_rosbag2_metadata_is_rejected() {
    let dir = TempDir::new("bag_wrong_meta");
    let mut writer = BagWriter::create(dir.join("out.bag"), &WriterConfig::default()).unwrap();

    let err = writer
        .add_connection(
            "/a",
            "std_msgs/msg/String",
            &ConnectionMetadata::Segmented(SegmentedMetadata::default()),
        )
        .unwrap_err();

    assert!(matches!(err, ToolError::UnsupportedConversion { .. }));
}

#[test]
fn test_drop_finalizes_bag() {
    let dir = TempDir::new("bag_drop");
    let path = dir.join("dropped.bag");
    {
        let mut writer = BagWriter::create(&path, &WriterConfig::default()).unwrap();
        let meta = ConnectionMetadata::Flat(rosbag_tools::io::FlatMetadata {
            message_definition: "string data\n".to_string(),
            md5sum: STRING_MD5.to_string(),
            callerid: None,
            latching: true,
        });
        let id = writer.add_connection("/latched", "std_msgs/String", &meta).unwrap();
        writer.write(id, START_NS, b"hello").unwrap();
    }

    let entries = read_entries(&path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].topic, "/latched");
    assert_eq!(entries[0].data, b"hello");

    let reader = BagReader::open(&path).unwrap();
    let conn = &reader.parser().connections()[&0];
    assert!(conn.latching);
    assert_eq!(conn.callerid, None);
}

#[test]
fn test_empty_bag_has_zero_bounds() {
    let dir = TempDir::new("bag_empty");
    let path = dir.join("empty.bag");
    BagWriter::create(&path, &WriterConfig::default())
        .unwrap()
        .finish()
        .unwrap();

    let reader = rosbag_tools::open_reader(&path).unwrap();

    assert_eq!(reader.message_count(), 0);
    assert_eq!(reader.bounds(), rosbag_tools::TimeBounds::default());
}
