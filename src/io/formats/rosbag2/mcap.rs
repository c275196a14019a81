// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! MCAP storage files (`.mcap`) following rosbag2 conventions.
//!
//! Each topic is one channel whose schema is named after the message type
//! with `ros2msg` encoding. QoS profiles travel in the channel metadata.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::storage::{StorageMessage, StorageTopic};
use crate::core::{Result, TimeBounds, ToolError};

/// Channel metadata key holding QoS profiles.
pub const QOS_METADATA_KEY: &str = "offered_qos_profiles";

/// Schema encoding rosbag2 uses for message definitions.
pub const SCHEMA_ENCODING: &str = "ros2msg";

/// An `.mcap` file opened for reading.
pub struct McapStorage {
    path: PathBuf,
    mmap: memmap2::Mmap,
    /// Chunk indexes from the summary section, empty when unindexed
    chunk_indexes: Vec<mcap::records::ChunkIndex>,
    summary: Option<mcap::Summary>,
    topics: Vec<StorageTopic>,
    bounds: Option<TimeBounds>,
    message_count: u64,
}

impl McapStorage {
    /// Open a storage file, using its summary section when present.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(ToolError::io_at(path))?;
        // SAFETY: the mapping is read-only and the file is not modified while open
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(ToolError::io_at(path))?;

        let summary = match mcap::Summary::read(&mmap) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    context = "McapStorage",
                    path = %path.display(),
                    error = %e,
                    "Failed to read summary, scanning messages"
                );
                None
            }
        };

        let (topics, bounds, message_count) = match &summary {
            Some(summary) if summary.stats.is_some() => {
                let mut channels: Vec<_> = summary.channels.values().collect();
                channels.sort_by_key(|c| c.id);
                let topics = channels.iter().map(|c| topic_from_channel(c)).collect();
                let (bounds, count) = match &summary.stats {
                    Some(stats) if stats.message_count > 0 => (
                        Some(TimeBounds::new(
                            stats.message_start_time,
                            stats.message_end_time,
                        )),
                        stats.message_count,
                    ),
                    _ => (None, 0),
                };
                (topics, bounds, count)
            }
            _ => Self::scan(&mmap)?,
        };

        let mut chunk_indexes = summary
            .as_ref()
            .map(|s| s.chunk_indexes.clone())
            .unwrap_or_default();
        chunk_indexes.sort_by_key(|c| (c.message_start_time, c.chunk_start_offset));

        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            chunk_indexes,
            summary,
            topics,
            bounds,
            message_count,
        })
    }

    /// Build topics and bounds by streaming every message.
    fn scan(mmap: &memmap2::Mmap) -> Result<(Vec<StorageTopic>, Option<TimeBounds>, u64)> {
        let mut topics: BTreeMap<u16, StorageTopic> = BTreeMap::new();
        let mut range: Option<(u64, u64)> = None;
        let mut count = 0u64;

        for message in mcap::MessageStream::new(mmap)? {
            let message = message?;
            topics
                .entry(message.channel.id)
                .or_insert_with(|| topic_from_channel(&message.channel));
            range = Some(match range {
                Some((start, end)) => (start.min(message.log_time), end.max(message.log_time)),
                None => (message.log_time, message.log_time),
            });
            count += 1;
        }

        let bounds = range.map(|(start, end)| TimeBounds::new(start, end));
        Ok((topics.into_values().collect(), bounds, count))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn topics(&self) -> &[StorageTopic] {
        &self.topics
    }

    pub fn bounds(&self) -> Option<TimeBounds> {
        self.bounds
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Stream records in log-time order.
    ///
    /// Indexed files are merged chunk by chunk, loading a chunk only once
    /// its start time is due. Files without chunk indexes are read whole
    /// and sorted.
    pub fn messages(&self) -> Result<McapMessageIter<'_>> {
        let mut iter = McapMessageIter {
            storage: self,
            next_chunk: 0,
            heap: BinaryHeap::new(),
            seq: 0,
        };
        if self.summary.is_none() || self.chunk_indexes.is_empty() {
            for message in mcap::MessageStream::new(&self.mmap)? {
                iter.push(message?);
            }
        }
        Ok(iter)
    }
}

fn topic_from_channel(channel: &mcap::Channel<'_>) -> StorageTopic {
    StorageTopic {
        key: i64::from(channel.id),
        name: channel.topic.clone(),
        message_type: channel
            .schema
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default(),
        serialization_format: channel.message_encoding.clone(),
        offered_qos_profiles: channel
            .metadata
            .get(QOS_METADATA_KEY)
            .cloned()
            .unwrap_or_default(),
    }
}

/// A decoded message waiting in the merge heap.
struct Pending {
    seq: u64,
    message: StorageMessage,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.message.timestamp, self.seq).cmp(&(other.message.timestamp, other.seq))
    }
}

/// Log-time ordered iterator over an MCAP file's messages.
pub struct McapMessageIter<'a> {
    storage: &'a McapStorage,
    next_chunk: usize,
    heap: BinaryHeap<Reverse<Pending>>,
    seq: u64,
}

impl McapMessageIter<'_> {
    fn push(&mut self, message: mcap::Message<'_>) {
        self.heap.push(Reverse(Pending {
            seq: self.seq,
            message: StorageMessage {
                topic_key: i64::from(message.channel.id),
                timestamp: message.log_time,
                data: message.data.into_owned(),
            },
        }));
        self.seq += 1;
    }

    /// Whether the next unloaded chunk may hold the next message.
    fn needs_chunk(&self) -> bool {
        let Some(index) = self.storage.chunk_indexes.get(self.next_chunk) else {
            return false;
        };
        match self.heap.peek() {
            Some(Reverse(head)) => index.message_start_time <= head.message.timestamp,
            None => true,
        }
    }

    fn load_chunk(&mut self) -> Result<()> {
        let storage = self.storage;
        let index = &storage.chunk_indexes[self.next_chunk];
        self.next_chunk += 1;

        let Some(summary) = storage.summary.as_ref() else {
            return Ok(());
        };
        for message in summary.stream_chunk(&storage.mmap, index)? {
            self.push(message?);
        }
        Ok(())
    }
}

impl Iterator for McapMessageIter<'_> {
    type Item = Result<StorageMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.needs_chunk() {
            if let Err(e) = self.load_chunk() {
                self.next_chunk = self.storage.chunk_indexes.len();
                self.heap.clear();
                return Some(Err(e));
            }
        }
        self.heap.pop().map(|Reverse(p)| Ok(p.message))
    }
}

/// An `.mcap` file being written.
pub struct McapSink {
    path: PathBuf,
    writer: Option<mcap::Writer<BufWriter<File>>>,
    /// Schema id per message type
    schemas: HashMap<String, u16>,
    /// Next sequence number per channel
    sequences: HashMap<u16, u32>,
}

impl McapSink {
    /// Create a new storage file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(ToolError::io_at(path))?;
        let writer = mcap::Writer::new(BufWriter::new(file))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            schemas: HashMap::new(),
            sequences: HashMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a channel and return its id.
    pub fn add_topic(&mut self, topic: &StorageTopic) -> Result<i64> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ToolError::storage("mcap", "storage file already closed"))?;

        let schema_id = match self.schemas.get(&topic.message_type) {
            Some(id) => *id,
            None => {
                let id = writer.add_schema(&topic.message_type, SCHEMA_ENCODING, &[])?;
                self.schemas.insert(topic.message_type.clone(), id);
                id
            }
        };

        let mut metadata = BTreeMap::new();
        metadata.insert(
            QOS_METADATA_KEY.to_string(),
            topic.offered_qos_profiles.clone(),
        );
        let channel_id = writer.add_channel(
            schema_id,
            &topic.name,
            &topic.serialization_format,
            &metadata,
        )?;
        Ok(i64::from(channel_id))
    }

    /// Append a message to a registered channel.
    pub fn write(&mut self, topic_key: i64, timestamp: u64, data: &[u8]) -> Result<()> {
        let channel_id = u16::try_from(topic_key)
            .map_err(|_| ToolError::storage("mcap", format!("invalid channel id {topic_key}")))?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ToolError::storage("mcap", "storage file already closed"))?;

        let sequence = self.sequences.entry(channel_id).or_insert(0);
        writer.write_to_known_channel(
            &mcap::records::MessageHeader {
                channel_id,
                sequence: *sequence,
                log_time: timestamp,
                publish_time: timestamp,
            },
            data,
        )?;
        *sequence = sequence.wrapping_add(1);
        Ok(())
    }

    /// Write the summary section and close the file.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.finish()?;
        }
        Ok(())
    }
}
