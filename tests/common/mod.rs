// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.
//!
//! Fixtures are generated on the fly with the crate's own writers: ten
//! records one second apart, cycling over `/a`, `/b` and `/c`. rosbag2
//! fixtures additionally carry one split-event control record.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rosbag_tools::io::formats::bag::BagWriter;
use rosbag_tools::io::formats::rosbag2::Rosbag2Writer;
use rosbag_tools::io::metadata::SPLIT_EVENT_TOPIC;
use rosbag_tools::io::writer::StorageKind;
use rosbag_tools::io::{ConnectionMetadata, FlatMetadata, SegmentedMetadata};
use rosbag_tools::{open_reader, FormatWriter, WriterConfig};

// ============================================================================
// Fixture layout
// ============================================================================

/// Topics every fixture carries, in registration order.
pub const TOPICS: [&str; 3] = ["/a", "/b", "/c"];

/// Absolute time of the first record (2023-11-14 22:13:20 UTC).
pub const START_NS: u64 = 1_700_000_000_000_000_000;

/// Spacing between records.
pub const STEP_NS: u64 = 1_000_000_000;

/// Data records per fixture, excluding the control record.
pub const RECORD_COUNT: u64 = 10;

/// MD5 of `string data`.
pub const STRING_MD5: &str = "992ce8a1687cec8c8bd883ec73ca41d1";

/// Absolute timestamp of data record `i`.
pub fn stamp(i: u64) -> u64 {
    START_NS + i * STEP_NS
}

/// Topic of data record `i`.
pub fn topic_of(i: u64) -> &'static str {
    TOPICS[(i % TOPICS.len() as u64) as usize]
}

fn payload(i: u64) -> Vec<u8> {
    format!("msg{i}").into_bytes()
}

// ============================================================================
// Temporary directories
// ============================================================================

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Temporary directory removed when dropped.
#[derive(Debug)]
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "rosbag_tools_{}_{}_{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("create temp dir");
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

// ============================================================================
// Fixture builders
// ============================================================================

fn flat_metadata() -> ConnectionMetadata {
    ConnectionMetadata::Flat(FlatMetadata {
        message_definition: "string data\n".to_string(),
        md5sum: STRING_MD5.to_string(),
        callerid: Some("/recorder".to_string()),
        latching: false,
    })
}

fn segmented_metadata() -> ConnectionMetadata {
    ConnectionMetadata::Segmented(SegmentedMetadata::default())
}

fn fill(writer: &mut dyn FormatWriter, metadata: &ConnectionMetadata, control: bool) {
    let message_type = match metadata {
        ConnectionMetadata::Flat(_) => "std_msgs/String",
        ConnectionMetadata::Segmented(_) => "std_msgs/msg/String",
    };
    let ids: Vec<u32> = TOPICS
        .iter()
        .map(|t| writer.add_connection(t, message_type, metadata).unwrap())
        .collect();
    let control_id = control.then(|| {
        writer
            .add_connection(SPLIT_EVENT_TOPIC, "rosbag2_interfaces/msg/WriteSplitEvent", metadata)
            .unwrap()
    });

    for i in 0..RECORD_COUNT {
        let conn = ids[(i % TOPICS.len() as u64) as usize];
        writer.write(conn, stamp(i), &payload(i)).unwrap();
        if i == RECORD_COUNT / 2 {
            if let Some(id) = control_id {
                writer.write(id, stamp(i), b"split").unwrap();
            }
        }
    }
    writer.finish().unwrap();
}

/// Write the standard fixture as a ROS1 bag at `path`.
pub fn write_flat_bag(path: &Path) -> PathBuf {
    let mut writer = BagWriter::create(path, &WriterConfig::default()).unwrap();
    fill(&mut writer, &flat_metadata(), false);
    path.to_path_buf()
}

/// Write the standard fixture as a rosbag2 directory at `path`.
pub fn write_rosbag2(path: &Path, storage: StorageKind) -> PathBuf {
    let mut writer = Rosbag2Writer::create(path, storage).unwrap();
    fill(&mut writer, &segmented_metadata(), true);
    path.to_path_buf()
}

/// Write a ROS1 bag holding a single record on `/a`.
pub fn write_single_record_bag(path: &Path) -> PathBuf {
    let mut writer = BagWriter::create(path, &WriterConfig::default()).unwrap();
    let id = writer.add_connection("/a", "std_msgs/String", &flat_metadata()).unwrap();
    writer.write(id, START_NS, b"only").unwrap();
    writer.finish().unwrap();
    path.to_path_buf()
}

// ============================================================================
// Reading back
// ============================================================================

/// A record resolved to its topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub topic: String,
    pub timestamp: u64,
    pub data: Vec<u8>,
}

/// Every record of the container at `path`, in read order.
pub fn read_entries(path: &Path) -> Vec<Entry> {
    let reader = open_reader(path).unwrap();
    reader
        .records()
        .unwrap()
        .map(|r| {
            let r = r.unwrap();
            Entry {
                topic: reader.connection(r.conn_id).unwrap().topic.clone(),
                timestamp: r.timestamp,
                data: r.data,
            }
        })
        .collect()
}

/// Record timestamps, sorted.
pub fn timestamps(path: &Path) -> Vec<u64> {
    let mut stamps: Vec<u64> = read_entries(path).iter().map(|e| e.timestamp).collect();
    stamps.sort_unstable();
    stamps
}

/// Data records of the standard fixture within `[first, last]`.
pub fn expected_entries(first: u64, last: u64) -> Vec<Entry> {
    (first..=last)
        .map(|i| Entry {
            topic: topic_of(i).to_string(),
            timestamp: stamp(i),
            data: payload(i),
        })
        .collect()
}

/// Entries sorted by timestamp then topic, for order-insensitive checks.
pub fn sorted(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by(|a, b| (a.timestamp, &a.topic).cmp(&(b.timestamp, &b.topic)));
    entries
}
