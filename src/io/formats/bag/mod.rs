// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag format implementation.
//!
//! - Memory-mapped record parser with index and unindexed-scan modes
//! - Time-ordered reader merging overlapping chunks
//! - Chunked writer with optional bz2 compression

// Parser utilities
pub mod parser;

// Reader implementation
pub mod reader;

// Writer implementation
pub mod writer;

// Re-exports
pub use parser::{BagChunkInfo, BagConnection, BagHeader, BagParser};
pub use reader::{BagReader, BagRecordIter};
pub use writer::BagWriter;
