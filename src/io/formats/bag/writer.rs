// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag file writer implementation.
//!
//! # ROS1 Bag Format Overview
//!
//! A ROS1 bag file has the following structure:
//! 1. Version line: `#ROSBAG V2.0\n`
//! 2. File header record (4096 bytes, padded)
//! 3. For every chunk:
//!    - Chunk record holding connection records (first use in the chunk)
//!      and message data records, optionally bz2-compressed
//!    - Index data records (one per connection in the chunk)
//! 4. Connection records (summary at end)
//! 5. Chunk info records (summary at end)
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use rosbag_tools::io::formats::bag::BagWriter;
//! use rosbag_tools::io::metadata::{ConnectionMetadata, FlatMetadata};
//! use rosbag_tools::io::traits::FormatWriter;
//! use rosbag_tools::io::writer::WriterConfig;
//!
//! let mut writer = BagWriter::create("output.bag", &WriterConfig::default())?;
//! let meta = ConnectionMetadata::Flat(FlatMetadata {
//!     message_definition: "string data".to_string(),
//!     md5sum: "992ce8a1687cec8c8bd883ec73ca41d1".to_string(),
//!     callerid: Some("/talker".to_string()),
//!     latching: false,
//! });
//! let conn = writer.add_connection("/chatter", "std_msgs/String", &meta)?;
//! writer.write(conn, 1_234_567_890, &[3, 0, 0, 0, b'h', b'e', b'y'])?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::parser::{
    OP_BAG_HEADER, OP_CHUNK, OP_CHUNK_INFO, OP_CONNECTION, OP_INDEX_DATA, OP_MSG_DATA,
};
use crate::core::{Result, ToolError};
use crate::io::metadata::{ConnectionMetadata, FlatMetadata, Generation};
use crate::io::traits::FormatWriter;
use crate::io::writer::{BagCompression, WriterConfig};

/// ROS bag version string
const VERSION: &str = "2.0";

/// Index data version
const INDEX_VERSION: u32 = 1;

/// Chunk info version
const CHUNK_INFO_VERSION: u32 = 1;

/// Size the version line plus bag header record is padded to.
const FILE_HEADER_LEN: usize = 4096;

/// Connection info for a topic
#[derive(Debug, Clone)]
struct ConnectionInfo {
    id: u32,
    topic: String,
    datatype: String,
    meta: FlatMetadata,
}

/// Index entry for message lookup
#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    /// Timestamp (sec, nsec)
    time: (u32, u32),
    /// Offset within the uncompressed chunk data
    offset: u32,
}

/// Chunk info for the bag summary
#[derive(Debug, Clone)]
struct ChunkInfo {
    /// Position of the chunk record in the file
    pos: u64,
    /// Start time (sec, nsec)
    start_time: (u32, u32),
    /// End time (sec, nsec)
    end_time: (u32, u32),
    /// Message count per connection ID
    connection_counts: BTreeMap<u32, u32>,
}

/// ROS1 bag file writer.
///
/// The writer is finalized when dropped if [`finish`](FormatWriter::finish)
/// was not called; errors at that point can only be logged.
pub struct BagWriter {
    /// File writer
    writer: BufWriter<File>,
    /// File path
    path: PathBuf,
    /// Is the file open
    is_open: bool,

    /// All connections, indexed by ID
    connections: Vec<ConnectionInfo>,
    /// All chunk infos
    chunk_infos: Vec<ChunkInfo>,

    /// Uncompressed records of the current chunk
    chunk_data: Vec<u8>,
    /// Current chunk info
    current_chunk_info: Option<ChunkInfo>,
    /// Current chunk indexes per connection
    current_chunk_indexes: BTreeMap<u32, Vec<IndexEntry>>,
    /// Connections written to current chunk
    connections_written_to_chunk: BTreeSet<u32>,

    /// Chunk size threshold
    chunk_threshold: usize,
    /// Chunk compression
    compression: BagCompression,
    /// Total bytes written to file
    file_pos: u64,
    /// Messages written
    message_count: u64,
}

impl BagWriter {
    /// Create a new bag file for writing.
    ///
    /// Missing parent directories are created.
    pub fn create<P: AsRef<Path>>(path: P, config: &WriterConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ToolError::io_at(parent))?;
        }
        let file = File::create(&path).map_err(ToolError::io_at(&path))?;

        let mut writer = BufWriter::new(file);

        let mut start_buffer = Vec::new();
        Self::write_file_header_record(&mut start_buffer, 0, 0, 0);
        writer
            .write_all(&start_buffer)
            .map_err(ToolError::io_at(&path))?;

        Ok(Self {
            writer,
            path,
            is_open: true,
            connections: Vec::new(),
            chunk_infos: Vec::new(),
            chunk_data: Vec::new(),
            current_chunk_info: None,
            current_chunk_indexes: BTreeMap::new(),
            connections_written_to_chunk: BTreeSet::new(),
            chunk_threshold: config.chunk_threshold,
            compression: config.compression,
            file_pos: start_buffer.len() as u64,
            message_count: 0,
        })
    }

    fn closed_error(&self) -> ToolError {
        ToolError::io(
            &self.path,
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "bag already closed"),
        )
    }

    /// Start a new chunk.
    fn start_chunk(&mut self, time: (u32, u32)) {
        self.current_chunk_info = Some(ChunkInfo {
            pos: 0,
            start_time: time,
            end_time: time,
            connection_counts: BTreeMap::new(),
        });
        self.chunk_data.clear();
        self.connections_written_to_chunk.clear();
    }

    /// Finish the current chunk and write it to file.
    fn finish_chunk(&mut self) -> Result<()> {
        let Some(mut chunk_info) = self.current_chunk_info.take() else {
            return Ok(());
        };
        chunk_info.pos = self.file_pos;

        let uncompressed_size = self.chunk_data.len() as u32;
        let payload = match self.compression {
            BagCompression::None => std::mem::take(&mut self.chunk_data),
            BagCompression::Bz2 => {
                let mut encoder = bzip2::write::BzEncoder::new(
                    Vec::with_capacity(self.chunk_data.len() / 2),
                    bzip2::Compression::default(),
                );
                encoder
                    .write_all(&self.chunk_data)
                    .and_then(|_| encoder.finish())
                    .map_err(ToolError::io_at(&self.path))?
            }
        };

        let mut buffer = Vec::with_capacity(payload.len() + 256);
        Self::write_chunk_header(
            &mut buffer,
            self.compression.as_str(),
            uncompressed_size,
            payload.len() as u32,
        );
        buffer.extend_from_slice(&payload);
        Self::write_index_records(&mut buffer, &self.current_chunk_indexes);

        self.writer
            .write_all(&buffer)
            .map_err(ToolError::io_at(&self.path))?;
        self.file_pos += buffer.len() as u64;

        self.chunk_infos.push(chunk_info);
        self.chunk_data.clear();
        self.current_chunk_indexes.clear();

        Ok(())
    }

    /// Internal finalize logic shared by `finish` and `Drop`.
    fn finish_internal(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        // Never retry a half-written tail
        self.is_open = false;

        self.finish_chunk()?;

        let index_data_position = self.file_pos;

        let mut stop_buffer = Vec::new();
        for conn in &self.connections {
            Self::write_connection_record(&mut stop_buffer, conn);
        }
        Self::write_chunk_info_records(&mut stop_buffer, &self.chunk_infos);

        self.writer
            .write_all(&stop_buffer)
            .map_err(ToolError::io_at(&self.path))?;

        let mut file_header_buffer = Vec::new();
        Self::write_file_header_record(
            &mut file_header_buffer,
            self.connections.len() as u32,
            self.chunk_infos.len() as u32,
            index_data_position,
        );

        self.writer
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.writer.write_all(&file_header_buffer))
            .and_then(|_| self.writer.flush())
            .map_err(ToolError::io_at(&self.path))?;

        Ok(())
    }

    // =========================================================================
    // Helper functions for writing records
    // =========================================================================

    /// Write a header as key=value pairs.
    fn write_header(buffer: &mut Vec<u8>, fields: &BTreeMap<&str, Vec<u8>>) -> u32 {
        let mut header_data = Vec::new();

        for (key, value) in fields {
            // field_len (4 bytes) + key + '=' + value
            let field_len = key.len() + 1 + value.len();
            write_u32(&mut header_data, field_len as u32);
            header_data.extend_from_slice(key.as_bytes());
            header_data.push(b'=');
            header_data.extend_from_slice(value);
        }

        let header_len = header_data.len() as u32;
        write_u32(buffer, header_len);
        buffer.extend(header_data);

        header_len
    }

    /// Write the version line and file header record, padded to 4096 bytes.
    fn write_file_header_record(
        buffer: &mut Vec<u8>,
        connection_count: u32,
        chunk_count: u32,
        index_data_position: u64,
    ) {
        buffer.extend_from_slice(format!("#ROSBAG V{VERSION}\n").as_bytes());
        let version_len = buffer.len();

        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_BAG_HEADER]);
        fields.insert("index_pos", index_data_position.to_le_bytes().to_vec());
        fields.insert("conn_count", connection_count.to_le_bytes().to_vec());
        fields.insert("chunk_count", chunk_count.to_le_bytes().to_vec());

        let header_len = Self::write_header(buffer, &fields);

        // version + header_len field + header + data_len field + padding
        let used = version_len + 4 + header_len as usize;
        let data_len = FILE_HEADER_LEN - used - 4;

        write_u32(buffer, data_len as u32);
        buffer.resize(buffer.len() + data_len, b' ');
    }

    /// Write a chunk header followed by the data length.
    fn write_chunk_header(
        buffer: &mut Vec<u8>,
        compression: &str,
        uncompressed_size: u32,
        data_len: u32,
    ) {
        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_CHUNK]);
        fields.insert("compression", compression.as_bytes().to_vec());
        fields.insert("size", uncompressed_size.to_le_bytes().to_vec());

        Self::write_header(buffer, &fields);
        write_u32(buffer, data_len);
    }

    /// Write one connection record.
    ///
    /// Fields are copied exactly as registered; no callerid is written when
    /// the source had none.
    fn write_connection_record(buffer: &mut Vec<u8>, conn: &ConnectionInfo) {
        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_CONNECTION]);
        fields.insert("conn", conn.id.to_le_bytes().to_vec());
        fields.insert("topic", conn.topic.as_bytes().to_vec());
        Self::write_header(buffer, &fields);

        let mut data_fields = BTreeMap::new();
        data_fields.insert("topic", conn.topic.as_bytes().to_vec());
        data_fields.insert("type", conn.datatype.as_bytes().to_vec());
        data_fields.insert("md5sum", conn.meta.md5sum.as_bytes().to_vec());
        data_fields.insert(
            "message_definition",
            conn.meta.message_definition.as_bytes().to_vec(),
        );
        if let Some(callerid) = &conn.meta.callerid {
            data_fields.insert("callerid", callerid.as_bytes().to_vec());
        }
        data_fields.insert(
            "latching",
            if conn.meta.latching { b"1" } else { b"0" }.to_vec(),
        );

        // The data section is itself a field list with its own length prefix
        Self::write_header(buffer, &data_fields);
    }

    /// Write message data record header.
    fn write_message_record_header(buffer: &mut Vec<u8>, conn_id: u32, time: (u32, u32)) {
        let mut fields = BTreeMap::new();
        fields.insert("op", vec![OP_MSG_DATA]);
        fields.insert("conn", conn_id.to_le_bytes().to_vec());
        fields.insert("time", time_to_bytes(time));

        Self::write_header(buffer, &fields);
    }

    /// Write index records for a chunk.
    fn write_index_records(buffer: &mut Vec<u8>, indexes: &BTreeMap<u32, Vec<IndexEntry>>) {
        for (conn_id, entries) in indexes {
            let mut fields = BTreeMap::new();
            fields.insert("op", vec![OP_INDEX_DATA]);
            fields.insert("conn", conn_id.to_le_bytes().to_vec());
            fields.insert("ver", INDEX_VERSION.to_le_bytes().to_vec());
            fields.insert("count", (entries.len() as u32).to_le_bytes().to_vec());

            Self::write_header(buffer, &fields);

            // 8 bytes time + 4 bytes offset per entry
            write_u32(buffer, (entries.len() * 12) as u32);

            for entry in entries {
                write_u32(buffer, entry.time.0);
                write_u32(buffer, entry.time.1);
                write_u32(buffer, entry.offset);
            }
        }
    }

    /// Write chunk info records.
    fn write_chunk_info_records(buffer: &mut Vec<u8>, chunk_infos: &[ChunkInfo]) {
        for chunk_info in chunk_infos {
            let mut fields = BTreeMap::new();
            fields.insert("op", vec![OP_CHUNK_INFO]);
            fields.insert("ver", CHUNK_INFO_VERSION.to_le_bytes().to_vec());
            fields.insert("chunk_pos", chunk_info.pos.to_le_bytes().to_vec());
            fields.insert("start_time", time_to_bytes(chunk_info.start_time));
            fields.insert("end_time", time_to_bytes(chunk_info.end_time));
            fields.insert(
                "count",
                (chunk_info.connection_counts.len() as u32)
                    .to_le_bytes()
                    .to_vec(),
            );

            Self::write_header(buffer, &fields);

            write_u32(buffer, (chunk_info.connection_counts.len() * 8) as u32);
            for (conn_id, count) in &chunk_info.connection_counts {
                write_u32(buffer, *conn_id);
                write_u32(buffer, *count);
            }
        }
    }
}

impl FormatWriter for BagWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn generation(&self) -> Generation {
        Generation::Flat
    }

    fn add_connection(
        &mut self,
        topic: &str,
        message_type: &str,
        metadata: &ConnectionMetadata,
    ) -> Result<u32> {
        if !self.is_open {
            return Err(self.closed_error());
        }
        let ConnectionMetadata::Flat(meta) = metadata else {
            return Err(ToolError::UnsupportedConversion {
                input_generation: metadata.generation().to_string(),
                output_generation: Generation::Flat.to_string(),
                path: self.path.clone(),
            });
        };

        let id = self.connections.len() as u32;
        self.connections.push(ConnectionInfo {
            id,
            topic: topic.to_string(),
            datatype: message_type.to_string(),
            meta: meta.clone(),
        });
        Ok(id)
    }

    fn write(&mut self, conn_id: u32, timestamp: u64, data: &[u8]) -> Result<()> {
        if !self.is_open {
            return Err(self.closed_error());
        }
        if conn_id as usize >= self.connections.len() {
            return Err(ToolError::parse(
                "BagWriter::write",
                format!(
                    "No connection {conn_id} (only {} connections added)",
                    self.connections.len()
                ),
            ));
        }

        let time = ns_to_time(timestamp);

        if self.current_chunk_info.is_none() {
            self.start_chunk(time);
        }

        if self.connections_written_to_chunk.insert(conn_id) {
            let conn = &self.connections[conn_id as usize];
            Self::write_connection_record(&mut self.chunk_data, conn);
        }

        let offset = self.chunk_data.len() as u32;
        Self::write_message_record_header(&mut self.chunk_data, conn_id, time);
        write_u32(&mut self.chunk_data, data.len() as u32);
        self.chunk_data.extend_from_slice(data);

        self.current_chunk_indexes
            .entry(conn_id)
            .or_default()
            .push(IndexEntry { time, offset });

        if let Some(chunk_info) = self.current_chunk_info.as_mut() {
            chunk_info.start_time = chunk_info.start_time.min(time);
            chunk_info.end_time = chunk_info.end_time.max(time);
            *chunk_info.connection_counts.entry(conn_id).or_default() += 1;
        }
        self.message_count += 1;

        if self.chunk_data.len() >= self.chunk_threshold {
            self.finish_chunk()?;
        }

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finish_internal()
    }

    fn message_count(&self) -> u64 {
        self.message_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for BagWriter {
    fn drop(&mut self) {
        if self.is_open {
            if let Err(e) = self.finish_internal() {
                warn!(
                    context = "BagWriter::drop",
                    path = %self.path.display(),
                    error = %e,
                    "Failed to finalize bag on drop"
                );
            }
        }
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Write u32 in little-endian format.
fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

/// Convert (sec, nsec) time to little-endian bytes.
fn time_to_bytes(time: (u32, u32)) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8);
    bytes.extend_from_slice(&time.0.to_le_bytes());
    bytes.extend_from_slice(&time.1.to_le_bytes());
    bytes
}

/// Convert nanoseconds to (sec, nsec) tuple.
fn ns_to_time(ns: u64) -> (u32, u32) {
    let sec = (ns / 1_000_000_000) as u32;
    let nsec = (ns % 1_000_000_000) as u32;
    (sec, nsec)
}
