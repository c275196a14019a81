// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Reader construction with automatic generation detection.
//!
//! # Example
//!
//! ```rust,no_run
//! use rosbag_tools::io::reader::open_reader;
//!
//! let reader = open_reader("recording.bag")?;
//! for topic in reader.topics() {
//!     println!("{topic}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::Path;

use crate::core::{Result, ToolError};
use crate::io::detection::classify;
use crate::io::formats::bag::BagReader;
use crate::io::formats::rosbag2::Rosbag2Reader;
use crate::io::metadata::Generation;
use crate::io::traits::FormatReader;

/// Open the container at `path`, whichever generation it is.
pub fn open_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn FormatReader>> {
    let path = path.as_ref();
    match classify(path).generation() {
        Some(Generation::Flat) => Ok(Box::new(BagReader::open(path)?)),
        Some(Generation::Segmented) => Ok(Box::new(Rosbag2Reader::open(path)?)),
        None => Err(ToolError::not_a_container(path)),
    }
}
