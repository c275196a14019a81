// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! sqlite3 storage files (`.db3`).
//!
//! Records are read in `(timestamp, id)` order, one page at a time, so a
//! large file is never loaded whole.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection as SqlConnection, OpenFlags};

use super::storage::{StorageMessage, StorageTopic};
use crate::core::{Result, TimeBounds, ToolError};

/// Rows fetched per query while streaming.
const PAGE_SIZE: i64 = 1024;

/// Schema version written into new files.
const SCHEMA_VERSION: i64 = 3;

const CREATE_SCHEMA: &str = "
    CREATE TABLE schema (schema_version INTEGER PRIMARY KEY, ros_distro TEXT NOT NULL);
    CREATE TABLE topics (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        serialization_format TEXT NOT NULL,
        offered_qos_profiles TEXT NOT NULL
    );
    CREATE TABLE messages (
        id INTEGER PRIMARY KEY,
        topic_id INTEGER NOT NULL,
        timestamp INTEGER NOT NULL,
        data BLOB NOT NULL
    );
    CREATE INDEX timestamp_idx ON messages (timestamp ASC);
";

/// A `.db3` file opened read-only.
pub struct SqliteStorage {
    path: PathBuf,
    db: SqlConnection,
    topics: Vec<StorageTopic>,
    bounds: Option<TimeBounds>,
    message_count: u64,
}

impl SqliteStorage {
    /// Open a storage file and load its topic table and time bounds.
    pub fn open(path: &Path) -> Result<Self> {
        let db = SqlConnection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let has_qos = {
            let mut stmt = db.prepare("PRAGMA table_info(topics)")?;
            let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
            let mut found = false;
            for column in columns {
                if column? == "offered_qos_profiles" {
                    found = true;
                }
            }
            found
        };

        let topics = {
            let sql = if has_qos {
                "SELECT id, name, type, serialization_format, offered_qos_profiles FROM topics ORDER BY id"
            } else {
                "SELECT id, name, type, serialization_format, '' FROM topics ORDER BY id"
            };
            let mut stmt = db.prepare(sql)?;
            let rows = stmt.query_map([], |row| {
                Ok(StorageTopic {
                    key: row.get(0)?,
                    name: row.get(1)?,
                    message_type: row.get(2)?,
                    serialization_format: row.get(3)?,
                    offered_qos_profiles: row.get(4)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let (min, max, count): (Option<i64>, Option<i64>, i64) = db.query_row(
            "SELECT MIN(timestamp), MAX(timestamp), COUNT(*) FROM messages",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let bounds = match (min, max) {
            (Some(start), Some(end)) => Some(TimeBounds::new(clamp_ts(start), clamp_ts(end))),
            _ => None,
        };

        Ok(Self {
            path: path.to_path_buf(),
            db,
            topics,
            bounds,
            message_count: count.max(0) as u64,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn topics(&self) -> &[StorageTopic] {
        &self.topics
    }

    /// Bounds of the stored records, `None` when the file holds none.
    pub fn bounds(&self) -> Option<TimeBounds> {
        self.bounds
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Stream all records in timestamp order.
    pub fn messages(&self) -> SqliteMessageIter<'_> {
        SqliteMessageIter {
            storage: self,
            cursor: (i64::MIN, i64::MIN),
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_page(&self, cursor: (i64, i64)) -> Result<Vec<(i64, i64, i64, Vec<u8>)>> {
        let mut stmt = self.db.prepare_cached(
            "SELECT id, topic_id, timestamp, data FROM messages
             WHERE timestamp > ?1 OR (timestamp = ?1 AND id > ?2)
             ORDER BY timestamp, id
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![cursor.0, cursor.1, PAGE_SIZE], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn clamp_ts(ts: i64) -> u64 {
    ts.max(0) as u64
}

/// Paged iterator over a storage file's records.
pub struct SqliteMessageIter<'a> {
    storage: &'a SqliteStorage,
    /// `(timestamp, id)` of the last row handed out
    cursor: (i64, i64),
    buffer: VecDeque<StorageMessage>,
    exhausted: bool,
}

impl Iterator for SqliteMessageIter<'_> {
    type Item = Result<StorageMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            let page = match self.storage.fetch_page(self.cursor) {
                Ok(page) => page,
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            };
            if (page.len() as i64) < PAGE_SIZE {
                self.exhausted = true;
            }
            for (id, topic_id, timestamp, data) in page {
                self.cursor = (timestamp, id);
                self.buffer.push_back(StorageMessage {
                    topic_key: topic_id,
                    timestamp: clamp_ts(timestamp),
                    data,
                });
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

/// A `.db3` file being written.
///
/// All inserts share one transaction that is committed by [`SqliteSink::close`].
pub struct SqliteSink {
    path: PathBuf,
    db: Option<SqlConnection>,
}

impl SqliteSink {
    /// Create a new storage file with an empty rosbag2 schema.
    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(ToolError::DestinationExists {
                path: path.to_path_buf(),
            });
        }
        let db = SqlConnection::open(path)?;
        db.execute_batch(CREATE_SCHEMA)?;
        db.execute(
            "INSERT INTO schema (schema_version, ros_distro) VALUES (?1, ?2)",
            params![SCHEMA_VERSION, "humble"],
        )?;
        db.execute_batch("BEGIN")?;
        Ok(Self {
            path: path.to_path_buf(),
            db: Some(db),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a topic row and return its id.
    pub fn add_topic(&mut self, topic: &StorageTopic) -> Result<i64> {
        let db = self.db()?;
        db.execute(
            "INSERT INTO topics (name, type, serialization_format, offered_qos_profiles)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                topic.name,
                topic.message_type,
                topic.serialization_format,
                topic.offered_qos_profiles
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Insert a message row.
    pub fn write(&mut self, topic_key: i64, timestamp: u64, data: &[u8]) -> Result<()> {
        let timestamp = i64::try_from(timestamp).map_err(|_| {
            ToolError::storage("sqlite3", format!("timestamp {timestamp} exceeds i64"))
        })?;
        let db = self.db()?;
        let mut stmt = db.prepare_cached(
            "INSERT INTO messages (topic_id, timestamp, data) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute(params![topic_key, timestamp, data])?;
        Ok(())
    }

    /// Commit pending rows and close the database.
    pub fn close(&mut self) -> Result<()> {
        if let Some(db) = self.db.take() {
            db.execute_batch("COMMIT")?;
            db.close().map_err(|(_, e)| ToolError::from(e))?;
        }
        Ok(())
    }

    fn db(&self) -> Result<&SqlConnection> {
        self.db
            .as_ref()
            .ok_or_else(|| ToolError::storage("sqlite3", "storage file already closed"))
    }
}
