// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! `metadata.yaml` document of a rosbag2 directory.
//!
//! Unknown keys written by newer recorders are ignored on read. Fields
//! missing from older recorders fall back to their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Result, ToolError};

/// File name of the metadata document inside a rosbag2 directory.
pub const METADATA_FILE: &str = "metadata.yaml";

/// Metadata version this crate writes.
pub const METADATA_VERSION: u32 = 5;

/// Top-level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub rosbag2_bagfile_information: BagInfo,
}

/// Bag-wide information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagInfo {
    pub version: u32,
    pub storage_identifier: String,
    #[serde(default)]
    pub duration: Duration,
    #[serde(default)]
    pub starting_time: StartingTime,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub topics_with_message_count: Vec<TopicWithCount>,
    #[serde(default)]
    pub compression_format: String,
    #[serde(default)]
    pub compression_mode: String,
    #[serde(default)]
    pub relative_file_paths: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Duration {
    pub nanoseconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartingTime {
    pub nanoseconds_since_epoch: u64,
}

/// A topic and how many messages it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicWithCount {
    pub topic_metadata: TopicMetadata,
    #[serde(default)]
    pub message_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default = "default_serialization_format")]
    pub serialization_format: String,
    #[serde(default)]
    pub offered_qos_profiles: String,
}

/// Per storage file summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    #[serde(default)]
    pub starting_time: StartingTime,
    #[serde(default)]
    pub duration: Duration,
    #[serde(default)]
    pub message_count: u64,
}

fn default_serialization_format() -> String {
    "cdr".to_string()
}

impl BagInfo {
    /// Whether the recorder compressed files or messages.
    pub fn is_compressed(&self) -> bool {
        !self.compression_format.is_empty()
    }

    /// Look up a topic entry by name.
    pub fn topic(&self, name: &str) -> Option<&TopicMetadata> {
        self.topics_with_message_count
            .iter()
            .map(|t| &t.topic_metadata)
            .find(|t| t.name == name)
    }
}

/// Read `metadata.yaml` from `dir`, if present.
pub fn read_metadata(dir: &Path) -> Result<Option<BagInfo>> {
    let path = dir.join(METADATA_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path).map_err(ToolError::io_at(&path))?;
    let doc: MetadataDocument = serde_yaml::from_str(&text)?;
    Ok(Some(doc.rosbag2_bagfile_information))
}

/// Write `info` as `metadata.yaml` into `dir`.
pub fn write_metadata(dir: &Path, info: &BagInfo) -> Result<()> {
    let path = dir.join(METADATA_FILE);
    let doc = MetadataDocument {
        rosbag2_bagfile_information: info.clone(),
    };
    let text = serde_yaml::to_string(&doc)?;
    fs::write(&path, text).map_err(ToolError::io_at(&path))
}
