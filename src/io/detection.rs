// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Container classification.
//!
//! A path is a ROS1 bag if it is a regular file ending in `.bag` or
//! starting with the `#ROSBAG` magic. It is a rosbag2 bag if it is a
//! directory holding at least one `.db3` or `.mcap` storage file.
//!
//! # Example
//!
//! ```rust,no_run
//! use rosbag_tools::io::detection::{classify, Classification};
//!
//! match classify("recording.bag") {
//!     Classification::Container(generation) => println!("{generation}"),
//!     Classification::NotAContainer => println!("not a bag"),
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::metadata::Generation;

/// Extension of ROS1 bag files.
pub const FLAT_EXTENSION: &str = "bag";
/// Extension of rosbag2 sqlite3 storage files.
pub const SQLITE_EXTENSION: &str = "db3";
/// Extension of rosbag2 MCAP storage files.
pub const MCAP_EXTENSION: &str = "mcap";

const ROSBAG_MAGIC: &[u8] = b"#ROSBAG";

/// Outcome of classifying a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Container(Generation),
    NotAContainer,
}

impl Classification {
    /// The generation, if the path is a container.
    pub fn generation(self) -> Option<Generation> {
        match self {
            Classification::Container(g) => Some(g),
            Classification::NotAContainer => None,
        }
    }
}

/// Classify what sits at `path`.
pub fn classify<P: AsRef<Path>>(path: P) -> Classification {
    let path = path.as_ref();

    if path.is_file() {
        if has_extension(path, FLAT_EXTENSION) || has_rosbag_magic(path) {
            return Classification::Container(Generation::Flat);
        }
    } else if path.is_dir() && !storage_files(path).is_empty() {
        return Classification::Container(Generation::Segmented);
    }

    Classification::NotAContainer
}

/// Generation a new container at `path` would be written as when copied
/// from a `source` container.
///
/// `.bag` paths are ROS1 bags. A ROS1 source also keeps any other file
/// extension that is not a rosbag2 storage one, so a bag recognized by
/// its magic alone can be written under its own naming. Anything else
/// names a rosbag2 directory.
pub fn output_generation<P: AsRef<Path>>(path: P, source: Generation) -> Generation {
    let path = path.as_ref();
    if has_extension(path, FLAT_EXTENSION) {
        return Generation::Flat;
    }
    let foreign_extension = path.extension().is_some()
        && !has_extension(path, SQLITE_EXTENSION)
        && !has_extension(path, MCAP_EXTENSION);
    if source == Generation::Flat && foreign_extension {
        Generation::Flat
    } else {
        Generation::Segmented
    }
}

/// Storage files directly inside a rosbag2 directory, sorted by name.
pub fn storage_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file() && (has_extension(p, SQLITE_EXTENSION) || has_extension(p, MCAP_EXTENSION))
        })
        .collect();
    files.sort();
    files
}

pub(crate) fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn has_rosbag_magic(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut header = [0u8; 7];
    matches!(file.read_exact(&mut header), Ok(())) && header == ROSBAG_MAGIC
}
