// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Builder pattern for writer configuration.

use std::fmt;
use std::str::FromStr;

/// Default ROS1 chunk threshold (768KB)
pub const DEFAULT_CHUNK_THRESHOLD: usize = 768 * 1024;

/// Chunk compression for ROS1 bags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BagCompression {
    #[default]
    None,
    Bz2,
}

impl BagCompression {
    /// Value of the chunk `compression` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            BagCompression::None => "none",
            BagCompression::Bz2 => "bz2",
        }
    }
}

impl FromStr for BagCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(BagCompression::None),
            "bz2" => Ok(BagCompression::Bz2),
            other => Err(format!("unknown compression '{other}', expected none or bz2")),
        }
    }
}

/// Storage plugin for rosbag2 files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// `.db3` files
    Sqlite3,
    /// `.mcap` files
    Mcap,
}

impl StorageKind {
    /// `storage_identifier` as written to `metadata.yaml`.
    pub fn identifier(&self) -> &'static str {
        match self {
            StorageKind::Sqlite3 => "sqlite3",
            StorageKind::Mcap => "mcap",
        }
    }

    /// Storage file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            StorageKind::Sqlite3 => crate::io::detection::SQLITE_EXTENSION,
            StorageKind::Mcap => crate::io::detection::MCAP_EXTENSION,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite3" | "db3" => Ok(StorageKind::Sqlite3),
            "mcap" => Ok(StorageKind::Mcap),
            other => Err(format!("unknown storage '{other}', expected sqlite3 or mcap")),
        }
    }
}

/// Configuration passed to writer constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    /// ROS1 chunk compression
    pub compression: BagCompression,
    /// ROS1 uncompressed chunk size before a chunk is flushed
    pub chunk_threshold: usize,
    /// rosbag2 storage plugin; `None` follows the source bag
    pub storage: Option<StorageKind>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: BagCompression::None,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            storage: None,
        }
    }
}

/// Builder for [`WriterConfig`].
#[derive(Debug, Clone, Default)]
pub struct WriterBuilder {
    config: WriterConfig,
}

impl WriterBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ROS1 chunk compression.
    pub fn compression(mut self, compression: BagCompression) -> Self {
        self.config.compression = compression;
        self
    }

    /// Set the ROS1 chunk threshold in bytes.
    pub fn chunk_threshold(mut self, bytes: usize) -> Self {
        self.config.chunk_threshold = bytes.max(1);
        self
    }

    /// Force a rosbag2 storage plugin.
    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.config.storage = Some(storage);
        self
    }

    /// Finish building.
    pub fn build(self) -> WriterConfig {
        self.config
    }
}
