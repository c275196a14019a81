// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core traits for generation-agnostic bag access.
//!
//! Every format-specific reader and writer implements these traits, so
//! the segmentation engine never names a concrete format.

use std::any::Any;
use std::collections::BTreeSet;
use std::path::Path;

use crate::core::{Result, TimeBounds};

use super::metadata::{Connection, ConnectionMetadata, Generation, Record};

/// Ordered stream of records borrowed from a reader.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// Read-only access to an existing container.
///
/// # Example
///
/// ```no_run
/// use rosbag_tools::io::traits::FormatReader;
///
/// fn describe(reader: &dyn FormatReader) {
///     println!("{} connections", reader.connections().len());
///     println!("{} records", reader.message_count());
/// }
/// ```
pub trait FormatReader {
    /// Path the reader was opened on.
    fn path(&self) -> &Path;

    /// Container generation.
    fn generation(&self) -> Generation;

    /// All connections, indexed by their dense id.
    fn connections(&self) -> &[Connection];

    /// Recorded time span.
    ///
    /// Empty containers report `start == end == 0`.
    fn bounds(&self) -> TimeBounds;

    /// Timestamp of the earliest record.
    fn start_time(&self) -> u64 {
        self.bounds().start
    }

    /// Timestamp of the latest record.
    fn end_time(&self) -> u64 {
        self.bounds().end
    }

    /// Span between first and last record in nanoseconds.
    fn duration(&self) -> u64 {
        self.bounds().duration()
    }

    /// Total number of records.
    fn message_count(&self) -> u64;

    /// Records, in non-decreasing timestamp order when
    /// [`FormatReader::is_time_ordered`] holds.
    fn records(&self) -> Result<RecordStream<'_>>;

    /// Whether [`FormatReader::records`] is guaranteed to be timestamp
    /// ordered. Every built-in reader is; the copy loop only stops early
    /// when this holds.
    fn is_time_ordered(&self) -> bool {
        true
    }

    /// Look up a connection by id.
    fn connection(&self, id: u32) -> Option<&Connection> {
        self.connections().get(id as usize)
    }

    /// Distinct topic names.
    fn topics(&self) -> BTreeSet<String> {
        self.connections()
            .iter()
            .map(|c| c.topic.clone())
            .collect()
    }

    /// Downcast to `Any` for format-specific functionality.
    fn as_any(&self) -> &dyn Any;
}

/// Write-only access to a freshly created container.
///
/// Writers finalize on drop, but callers should call [`FormatWriter::finish`]
/// to observe errors.
pub trait FormatWriter {
    /// Output path.
    fn path(&self) -> &Path;

    /// Container generation.
    fn generation(&self) -> Generation;

    /// Register a connection and return its new id.
    ///
    /// Fails if `metadata` belongs to the other generation.
    fn add_connection(
        &mut self,
        topic: &str,
        message_type: &str,
        metadata: &ConnectionMetadata,
    ) -> Result<u32>;

    /// Append one record to a registered connection.
    fn write(&mut self, conn_id: u32, timestamp: u64, data: &[u8]) -> Result<()>;

    /// Flush everything and write index structures.
    ///
    /// Calling it more than once is a no-op.
    fn finish(&mut self) -> Result<()>;

    /// Number of records written so far.
    fn message_count(&self) -> u64;

    /// Downcast to `Any` for format-specific functionality.
    fn as_any(&self) -> &dyn Any;
}
