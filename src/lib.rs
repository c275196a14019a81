// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # rosbag-tools
//!
//! Clip, split and topic removal for ROS1 bags and rosbag2 directories.
//!
//! The library is organized in three layers:
//! - `core/` - Errors and time arithmetic (elapsed seconds, windows, split plans)
//! - `io/` - Container detection and the format readers and writers:
//!   - `io/formats/bag/` - ROS1 bag files
//!   - `io/formats/rosbag2/` - rosbag2 directories (sqlite3 and MCAP storage)
//! - `segment/` - Overwrite guard, connection remapping and the streaming copy
//!
//! Payloads are copied as opaque bytes; nothing is deserialized.
//!
//! ## Example: Clipping a bag
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rosbag_tools::segment::clip;
//!
//! // Keep 10 s to 25 s after the start of the recording
//! let out = clip("drive.bag", "drive_clip.bag", Some(10.0), Some(25.0), false)?;
//! println!("wrote {}", out.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Removing topics
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rosbag_tools::segment::{SegmentOptions, Segmenter};
//!
//! let mut segmenter = Segmenter::new(SegmentOptions::default());
//! let report = segmenter.remove_topics("drive_rosbag2", "drive_filt", &["/camera/*"])?;
//! println!("removed {:?}", report.removed_topics);
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use core::{Result, SplitPlan, TimeBounds, TimeWindow, ToolError};

// I/O types (metadata, traits, detection, formats)
pub mod io;

// Re-export key I/O types
pub use io::metadata::{Connection, ConnectionMetadata, Generation, Record};
pub use io::traits::{FormatReader, FormatWriter};
pub use io::{open_reader, open_writer, WriterConfig};

// Segmentation engine
pub mod segment;

pub use segment::{clip, remove_topics, split, SegmentOptions, SegmentReport, Segmenter};
