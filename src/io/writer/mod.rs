// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Generation-matched writer construction.
//!
//! # Example
//!
//! ```rust,no_run
//! use rosbag_tools::io::metadata::Generation;
//! use rosbag_tools::io::writer::{open_writer, StorageKind, WriterBuilder};
//!
//! let config = WriterBuilder::new().storage(StorageKind::Mcap).build();
//! let mut writer = open_writer("out_bag", Generation::Segmented, &config)?;
//! writer.finish()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;

pub use builder::{BagCompression, StorageKind, WriterBuilder, WriterConfig};

use std::path::Path;

use crate::core::Result;
use crate::io::formats::bag::BagWriter;
use crate::io::formats::rosbag2::Rosbag2Writer;
use crate::io::metadata::Generation;
use crate::io::traits::FormatWriter;

/// Create a writer of the given generation at `path`.
///
/// ROS1 bags become a single file; rosbag2 bags become a directory with
/// one storage file, sqlite3 unless `config.storage` says otherwise.
pub fn open_writer<P: AsRef<Path>>(
    path: P,
    generation: Generation,
    config: &WriterConfig,
) -> Result<Box<dyn FormatWriter>> {
    Ok(match generation {
        Generation::Flat => Box::new(BagWriter::create(path, config)?),
        Generation::Segmented => Box::new(Rosbag2Writer::create(
            path,
            config.storage.unwrap_or(StorageKind::Sqlite3),
        )?),
    })
}
