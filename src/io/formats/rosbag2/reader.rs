// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! rosbag2 directory reader.
//!
//! Topics from every storage file are merged into one dense connection
//! table keyed by `(name, type)`. Records from several files are merged by
//! timestamp, ties going to the earlier file.

use std::any::Any;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::metadata::{read_metadata, BagInfo};
use super::storage::{common_kind, StorageFile, StorageMessageIter};
use crate::core::{Result, TimeBounds, ToolError};
use crate::io::detection::storage_files;
use crate::io::metadata::{Connection, ConnectionMetadata, Generation, Record, SegmentedMetadata};
use crate::io::traits::{FormatReader, RecordStream};
use crate::io::writer::StorageKind;

/// Reader over a rosbag2 directory.
pub struct Rosbag2Reader {
    path: PathBuf,
    info: Option<BagInfo>,
    storage_kind: StorageKind,
    files: Vec<StorageFile>,
    connections: Vec<Connection>,
    /// Per storage file: file-local topic key to connection id
    key_maps: Vec<HashMap<i64, u32>>,
    bounds: TimeBounds,
    message_count: u64,
}

impl Rosbag2Reader {
    /// Open a rosbag2 directory.
    ///
    /// Fails with `Unsupported` for compressed bags.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let info = read_metadata(&path)?;

        if let Some(info) = &info {
            if info.is_compressed() {
                return Err(ToolError::unsupported(format!(
                    "compressed rosbag2 ({} {})",
                    info.compression_format, info.compression_mode
                )));
            }
        }

        let file_paths = resolve_files(&path, info.as_ref());
        let storage_kind = common_kind(&path, &file_paths)?;
        debug!(
            context = "Rosbag2Reader",
            path = %path.display(),
            storage = %storage_kind,
            files = file_paths.len(),
            "Opening rosbag2 directory"
        );

        let files = file_paths
            .iter()
            .map(|p| StorageFile::open(p, storage_kind))
            .collect::<Result<Vec<_>>>()?;

        let mut connections: Vec<Connection> = Vec::new();
        let mut by_name_type: HashMap<(String, String), u32> = HashMap::new();
        let mut key_maps = Vec::with_capacity(files.len());

        for file in &files {
            let mut key_map = HashMap::new();
            for topic in file.topics() {
                let lookup = (topic.name.clone(), topic.message_type.clone());
                let id = *by_name_type.entry(lookup).or_insert_with(|| {
                    let id = connections.len() as u32;
                    let mut qos = topic.offered_qos_profiles.clone();
                    if qos.is_empty() {
                        if let Some(meta) = info.as_ref().and_then(|i| i.topic(&topic.name)) {
                            qos = meta.offered_qos_profiles.clone();
                        }
                    }
                    connections.push(Connection {
                        id,
                        topic: topic.name.clone(),
                        message_type: topic.message_type.clone(),
                        metadata: ConnectionMetadata::Segmented(SegmentedMetadata {
                            serialization_format: topic.serialization_format.clone(),
                            offered_qos_profiles: qos,
                        }),
                    });
                    id
                });
                key_map.insert(topic.key, id);
            }
            key_maps.push(key_map);
        }

        let bounds = files
            .iter()
            .filter_map(StorageFile::bounds)
            .reduce(|a, b| TimeBounds::new(a.start.min(b.start), a.end.max(b.end)))
            .unwrap_or_default();
        let message_count = files.iter().map(StorageFile::message_count).sum();

        Ok(Self {
            path,
            info,
            storage_kind,
            files,
            connections,
            key_maps,
            bounds,
            message_count,
        })
    }

    /// Storage plugin of the directory's files.
    pub fn storage_kind(&self) -> StorageKind {
        self.storage_kind
    }

    /// Parsed `metadata.yaml`, if the directory had one.
    pub fn info(&self) -> Option<&BagInfo> {
        self.info.as_ref()
    }

    /// Paths of the storage files, in read order.
    pub fn storage_paths(&self) -> Vec<&Path> {
        self.files.iter().map(StorageFile::path).collect()
    }
}

/// Storage files named by the metadata, falling back to a directory scan.
fn resolve_files(dir: &Path, info: Option<&BagInfo>) -> Vec<PathBuf> {
    let listed: Vec<PathBuf> = info
        .map(|i| i.relative_file_paths.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(|rel| {
            let direct = dir.join(rel);
            if direct.is_file() {
                return Some(direct);
            }
            // Older recorders prefix the directory name
            let by_name = dir.join(Path::new(rel).file_name()?);
            by_name.is_file().then_some(by_name)
        })
        .collect();

    if listed.is_empty() {
        storage_files(dir)
    } else {
        listed
    }
}

impl FormatReader for Rosbag2Reader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn generation(&self) -> Generation {
        Generation::Segmented
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn bounds(&self) -> TimeBounds {
        self.bounds
    }

    fn message_count(&self) -> u64 {
        self.message_count
    }

    fn records(&self) -> Result<RecordStream<'_>> {
        let streams = self
            .files
            .iter()
            .map(StorageFile::messages)
            .collect::<Result<Vec<_>>>()?;
        let heads = vec![None; streams.len()];
        Ok(Box::new(Rosbag2RecordIter {
            reader: self,
            streams,
            heads,
            primed: false,
            failed: false,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Merge of the per-file message streams.
struct Rosbag2RecordIter<'a> {
    reader: &'a Rosbag2Reader,
    streams: Vec<StorageMessageIter<'a>>,
    /// Next pending record of each stream
    heads: Vec<Option<Record>>,
    primed: bool,
    failed: bool,
}

impl Rosbag2RecordIter<'_> {
    /// Pull the next mappable record of stream `idx` into its head slot.
    fn refill(&mut self, idx: usize) -> Result<()> {
        let reader = self.reader;
        let key_map = &reader.key_maps[idx];
        for message in self.streams[idx].by_ref() {
            let message = message?;
            match key_map.get(&message.topic_key) {
                Some(&conn_id) => {
                    self.heads[idx] = Some(Record {
                        conn_id,
                        timestamp: message.timestamp,
                        data: message.data,
                    });
                    return Ok(());
                }
                None => warn!(
                    context = "Rosbag2Reader",
                    topic_key = message.topic_key,
                    "Skipping message with unknown topic"
                ),
            }
        }
        self.heads[idx] = None;
        Ok(())
    }
}

impl Iterator for Rosbag2RecordIter<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if !self.primed {
            self.primed = true;
            for idx in 0..self.streams.len() {
                if let Err(e) = self.refill(idx) {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }

        let idx = self
            .heads
            .iter()
            .enumerate()
            .filter_map(|(i, head)| head.as_ref().map(|r| (r.timestamp, i)))
            .min()?
            .1;
        let record = self.heads[idx].take()?;
        if let Err(e) = self.refill(idx) {
            self.failed = true;
            return Some(Err(e));
        }
        Some(Ok(record))
    }
}
