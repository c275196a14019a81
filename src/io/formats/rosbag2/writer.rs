// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! rosbag2 directory writer.
//!
//! Produces `<dir>/<dirname>_0.<ext>` plus `metadata.yaml`. The metadata
//! is written by [`FormatWriter::finish`], or on drop if the caller never
//! finished the writer.

use std::any::Any;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::metadata::{
    write_metadata, BagInfo, Duration, FileInfo, StartingTime, TopicMetadata, TopicWithCount,
    METADATA_VERSION,
};
use super::storage::{StorageSink, StorageTopic};
use crate::core::{Result, TimeBounds, ToolError};
use crate::io::metadata::{ConnectionMetadata, Generation};
use crate::io::traits::FormatWriter;
use crate::io::writer::StorageKind;

struct WriterTopic {
    topic: StorageTopic,
    message_count: u64,
}

/// Writer producing a rosbag2 directory with a single storage file.
pub struct Rosbag2Writer {
    path: PathBuf,
    sink: StorageSink,
    topics: Vec<WriterTopic>,
    bounds: Option<TimeBounds>,
    message_count: u64,
    finished: bool,
}

impl Rosbag2Writer {
    /// Create the output directory and its storage file.
    pub fn create<P: AsRef<Path>>(path: P, storage: StorageKind) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.is_file() {
            return Err(ToolError::DestinationExists { path });
        }
        fs::create_dir_all(&path).map_err(ToolError::io_at(&path))?;

        let stem = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ToolError::parse("rosbag2 path", "path has no directory name"))?;
        let file = path.join(format!("{stem}_0.{}", storage.extension()));
        let sink = StorageSink::create(&file, storage)?;

        Ok(Self {
            path,
            sink,
            topics: Vec::new(),
            bounds: None,
            message_count: 0,
            finished: false,
        })
    }

    /// Storage plugin in use.
    pub fn storage_kind(&self) -> StorageKind {
        self.sink.kind()
    }

    fn bag_info(&self) -> BagInfo {
        let bounds = self.bounds.unwrap_or_default();
        let file_name = self
            .sink
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        BagInfo {
            version: METADATA_VERSION,
            storage_identifier: self.sink.kind().identifier().to_string(),
            duration: Duration {
                nanoseconds: bounds.duration(),
            },
            starting_time: StartingTime {
                nanoseconds_since_epoch: bounds.start,
            },
            message_count: self.message_count,
            topics_with_message_count: self
                .topics
                .iter()
                .map(|t| TopicWithCount {
                    topic_metadata: TopicMetadata {
                        name: t.topic.name.clone(),
                        message_type: t.topic.message_type.clone(),
                        serialization_format: t.topic.serialization_format.clone(),
                        offered_qos_profiles: t.topic.offered_qos_profiles.clone(),
                    },
                    message_count: t.message_count,
                })
                .collect(),
            compression_format: String::new(),
            compression_mode: String::new(),
            relative_file_paths: vec![file_name.clone()],
            files: vec![FileInfo {
                path: file_name,
                starting_time: StartingTime {
                    nanoseconds_since_epoch: bounds.start,
                },
                duration: Duration {
                    nanoseconds: bounds.duration(),
                },
                message_count: self.message_count,
            }],
        }
    }
}

impl FormatWriter for Rosbag2Writer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn generation(&self) -> Generation {
        Generation::Segmented
    }

    fn add_connection(
        &mut self,
        topic: &str,
        message_type: &str,
        metadata: &ConnectionMetadata,
    ) -> Result<u32> {
        let ConnectionMetadata::Segmented(meta) = metadata else {
            return Err(ToolError::UnsupportedConversion {
                input_generation: metadata.generation().to_string(),
                output_generation: Generation::Segmented.to_string(),
                path: self.path.clone(),
            });
        };

        let mut storage_topic = StorageTopic {
            key: 0,
            name: topic.to_string(),
            message_type: message_type.to_string(),
            serialization_format: meta.serialization_format.clone(),
            offered_qos_profiles: meta.offered_qos_profiles.clone(),
        };
        storage_topic.key = self.sink.add_topic(&storage_topic)?;

        let id = self.topics.len() as u32;
        self.topics.push(WriterTopic {
            topic: storage_topic,
            message_count: 0,
        });
        Ok(id)
    }

    fn write(&mut self, conn_id: u32, timestamp: u64, data: &[u8]) -> Result<()> {
        if self.finished {
            return Err(ToolError::storage("rosbag2", "writer already finished"));
        }
        let topic = self.topics.get_mut(conn_id as usize).ok_or_else(|| {
            ToolError::parse("Rosbag2Writer", format!("unknown connection id {conn_id}"))
        })?;

        self.sink.write(topic.topic.key, timestamp, data)?;
        topic.message_count += 1;
        self.message_count += 1;
        self.bounds = Some(match self.bounds {
            Some(b) => TimeBounds::new(b.start.min(timestamp), b.end.max(timestamp)),
            None => TimeBounds::new(timestamp, timestamp),
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.sink.close()?;
        write_metadata(&self.path, &self.bag_info())
    }

    fn message_count(&self) -> u64 {
        self.message_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Rosbag2Writer {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.finish() {
                warn!(
                    context = "Rosbag2Writer",
                    path = %self.path.display(),
                    error = %e,
                    "Failed to finalize rosbag2 on drop"
                );
            }
        }
    }
}
