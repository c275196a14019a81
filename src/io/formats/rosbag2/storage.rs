// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Storage plugin dispatch.
//!
//! A rosbag2 directory holds one or more storage files of a single plugin.
//! [`StorageFile`] and [`StorageSink`] give the reader and writer one
//! interface over both plugins.

use std::path::Path;

use super::mcap::{McapMessageIter, McapSink, McapStorage};
use super::sqlite::{SqliteMessageIter, SqliteSink, SqliteStorage};
use crate::core::{Result, TimeBounds, ToolError};
use crate::io::detection::has_extension;
use crate::io::writer::StorageKind;

/// A topic as registered inside one storage file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTopic {
    /// File-local key: sqlite row id or MCAP channel id
    pub key: i64,
    pub name: String,
    pub message_type: String,
    pub serialization_format: String,
    pub offered_qos_profiles: String,
}

/// A message as stored, keyed by its file-local topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageMessage {
    pub topic_key: i64,
    pub timestamp: u64,
    pub data: Vec<u8>,
}

/// Storage plugin of a file, judged by its extension.
pub fn storage_kind_of(path: &Path) -> Option<StorageKind> {
    if has_extension(path, StorageKind::Sqlite3.extension()) {
        Some(StorageKind::Sqlite3)
    } else if has_extension(path, StorageKind::Mcap.extension()) {
        Some(StorageKind::Mcap)
    } else {
        None
    }
}

/// An opened storage file.
pub enum StorageFile {
    Sqlite(SqliteStorage),
    Mcap(McapStorage),
}

impl StorageFile {
    /// Open a storage file of the given plugin.
    pub fn open(path: &Path, kind: StorageKind) -> Result<Self> {
        Ok(match kind {
            StorageKind::Sqlite3 => StorageFile::Sqlite(SqliteStorage::open(path)?),
            StorageKind::Mcap => StorageFile::Mcap(McapStorage::open(path)?),
        })
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            StorageFile::Sqlite(_) => StorageKind::Sqlite3,
            StorageFile::Mcap(_) => StorageKind::Mcap,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StorageFile::Sqlite(s) => s.path(),
            StorageFile::Mcap(s) => s.path(),
        }
    }

    pub fn topics(&self) -> &[StorageTopic] {
        match self {
            StorageFile::Sqlite(s) => s.topics(),
            StorageFile::Mcap(s) => s.topics(),
        }
    }

    pub fn bounds(&self) -> Option<TimeBounds> {
        match self {
            StorageFile::Sqlite(s) => s.bounds(),
            StorageFile::Mcap(s) => s.bounds(),
        }
    }

    pub fn message_count(&self) -> u64 {
        match self {
            StorageFile::Sqlite(s) => s.message_count(),
            StorageFile::Mcap(s) => s.message_count(),
        }
    }

    /// Messages in non-decreasing timestamp order.
    pub fn messages(&self) -> Result<StorageMessageIter<'_>> {
        Ok(match self {
            StorageFile::Sqlite(s) => StorageMessageIter::Sqlite(s.messages()),
            StorageFile::Mcap(s) => StorageMessageIter::Mcap(s.messages()?),
        })
    }
}

/// Message iterator of either plugin.
pub enum StorageMessageIter<'a> {
    Sqlite(SqliteMessageIter<'a>),
    Mcap(McapMessageIter<'a>),
}

impl Iterator for StorageMessageIter<'_> {
    type Item = Result<StorageMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            StorageMessageIter::Sqlite(it) => it.next(),
            StorageMessageIter::Mcap(it) => it.next(),
        }
    }
}

/// A storage file being written.
pub enum StorageSink {
    Sqlite(SqliteSink),
    Mcap(McapSink),
}

impl StorageSink {
    pub fn create(path: &Path, kind: StorageKind) -> Result<Self> {
        Ok(match kind {
            StorageKind::Sqlite3 => StorageSink::Sqlite(SqliteSink::create(path)?),
            StorageKind::Mcap => StorageSink::Mcap(McapSink::create(path)?),
        })
    }

    pub fn kind(&self) -> StorageKind {
        match self {
            StorageSink::Sqlite(_) => StorageKind::Sqlite3,
            StorageSink::Mcap(_) => StorageKind::Mcap,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StorageSink::Sqlite(s) => s.path(),
            StorageSink::Mcap(s) => s.path(),
        }
    }

    pub fn add_topic(&mut self, topic: &StorageTopic) -> Result<i64> {
        match self {
            StorageSink::Sqlite(s) => s.add_topic(topic),
            StorageSink::Mcap(s) => s.add_topic(topic),
        }
    }

    pub fn write(&mut self, topic_key: i64, timestamp: u64, data: &[u8]) -> Result<()> {
        match self {
            StorageSink::Sqlite(s) => s.write(topic_key, timestamp, data),
            StorageSink::Mcap(s) => s.write(topic_key, timestamp, data),
        }
    }

    pub fn close(&mut self) -> Result<()> {
        match self {
            StorageSink::Sqlite(s) => s.close(),
            StorageSink::Mcap(s) => s.close(),
        }
    }
}

/// Plugin shared by every file in `files`.
pub(crate) fn common_kind(dir: &Path, files: &[std::path::PathBuf]) -> Result<StorageKind> {
    let mut kinds = files.iter().filter_map(|f| storage_kind_of(f));
    let first = kinds
        .next()
        .ok_or_else(|| ToolError::not_a_container(dir))?;
    if kinds.any(|k| k != first) {
        return Err(ToolError::unsupported(format!(
            "mixed storage plugins in {}",
            dir.display()
        )));
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_storage_kind_of() {
        assert_eq!(storage_kind_of(Path::new("a/b_0.db3")), Some(StorageKind::Sqlite3));
        assert_eq!(storage_kind_of(Path::new("b_0.MCAP")), Some(StorageKind::Mcap));
        assert_eq!(storage_kind_of(Path::new("metadata.yaml")), None);
    }

    #[test]
    fn test_common_kind_rejects_mixed() {
        let dir = Path::new("bag");
        let files = vec![PathBuf::from("bag/a.db3"), PathBuf::from("bag/b.mcap")];
        assert!(matches!(
            common_kind(dir, &files),
            Err(ToolError::Unsupported { .. })
        ));
        let files = vec![PathBuf::from("bag/a.mcap")];
        assert_eq!(common_kind(dir, &files).unwrap(), StorageKind::Mcap);
    }
}
