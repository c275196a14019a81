// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for rosbag containers.
//!
//! This module provides the generation-agnostic types and traits the
//! segmentation engine works against, and the format implementations
//! behind them.

pub mod detection;
pub mod formats;
pub mod metadata;

// Re-exports
pub use detection::{classify, output_generation, Classification};
pub use metadata::{
    Connection, ConnectionMetadata, FlatMetadata, Generation, Record, SegmentedMetadata,
};

// Traits for format readers and writers
pub mod traits;
pub use traits::{FormatReader, FormatWriter, RecordStream};

// Topic selection by shell-style patterns
pub mod filter;
pub use filter::{filter_out, TopicFilter};

// Reader/writer construction with generation detection
pub mod reader;
pub mod writer;
pub use reader::open_reader;
pub use writer::{open_writer, BagCompression, StorageKind, WriterBuilder, WriterConfig};
