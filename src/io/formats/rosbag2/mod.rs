// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! rosbag2 format implementation.
//!
//! A rosbag2 bag is a directory holding `metadata.yaml` and one or more
//! storage files, either sqlite3 (`.db3`) or MCAP (`.mcap`).

pub mod mcap;
pub mod metadata;
pub mod reader;
pub mod sqlite;
pub mod storage;
pub mod writer;

pub use self::metadata::{read_metadata, write_metadata, BagInfo, METADATA_FILE};
pub use self::reader::Rosbag2Reader;
pub use self::storage::{StorageFile, StorageSink};
pub use self::writer::Rosbag2Writer;
