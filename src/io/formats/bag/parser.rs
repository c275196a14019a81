// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag record parser.
//!
//! The parser memory-maps the file, reads the bag header to locate the
//! index section and collects connection and chunk info records from it.
//! Bags without an index (e.g. from an interrupted recorder) are scanned
//! chunk by chunk instead.
//!
//! # BAG Format Structure (Version 2.0)
//!
//! ## File Header
//! - Magic: "#ROSBAG V2.0\n" (13 bytes)
//! - Followed by bag header record in standard record format
//!
//! ## Record Format
//! All records follow: `<header_len: u32><header><data_len: u32><data>`
//! where header contains `<field_len: u32><field_name>=<field_value>` pairs
//!
//! ## Op Codes
//! - 0x02: Message data
//! - 0x03: Bag header
//! - 0x04: Index data
//! - 0x05: Chunk
//! - 0x06: Chunk info
//! - 0x07: Connection

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::core::{Result, ToolError};

pub(crate) const OP_MSG_DATA: u8 = 0x02;
pub(crate) const OP_BAG_HEADER: u8 = 0x03;
pub(crate) const OP_INDEX_DATA: u8 = 0x04;
pub(crate) const OP_CHUNK: u8 = 0x05;
pub(crate) const OP_CHUNK_INFO: u8 = 0x06;
pub(crate) const OP_CONNECTION: u8 = 0x07;

/// Length of `#ROSBAG V2.0\n`.
const MAGIC_LEN: u64 = 13;

/// BAG file header information.
#[derive(Debug, Clone)]
pub struct BagHeader {
    /// Version string (e.g., "2.0")
    pub version: String,
    /// Position of index section in file
    pub index_pos: u64,
    /// Number of connections in the file
    pub conn_count: u32,
    /// Number of chunks in the file
    pub chunk_count: u32,
}

/// BAG chunk information for random access.
#[derive(Debug, Clone)]
pub struct BagChunkInfo {
    /// Chunk sequence number in file order
    pub sequence: u64,
    /// Offset of chunk record in file (position of header_len)
    pub chunk_pos: u64,
    /// Start time of messages in this chunk
    pub start_time: u64,
    /// End time of messages in this chunk
    pub end_time: u64,
    /// Number of messages per file connection id
    pub connection_counts: BTreeMap<u32, u32>,
}

impl BagChunkInfo {
    /// Total messages in the chunk.
    pub fn message_count(&self) -> u64 {
        self.connection_counts.values().map(|&c| c as u64).sum()
    }
}

/// BAG connection information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagConnection {
    /// Connection ID as stored in the file
    pub conn_id: u32,
    /// Topic name
    pub topic: String,
    /// Message type
    pub message_type: String,
    /// MD5 sum of message definition
    pub md5sum: String,
    /// Message definition text
    pub message_definition: String,
    /// Caller ID (publishing node)
    pub callerid: Option<String>,
    /// Latched publisher
    pub latching: bool,
}

/// Message data record extracted from a chunk.
#[derive(Debug)]
pub struct ChunkMessage {
    /// Connection id as stored in the file
    pub conn_id: u32,
    /// Receive time in nanoseconds
    pub time: u64,
    /// Serialized payload
    pub data: Vec<u8>,
}

/// Memory-mapped ROS1 bag parser.
pub struct BagParser {
    /// Path to the bag file
    path: PathBuf,
    /// File header information
    header: BagHeader,
    /// Chunk information for random access
    chunks: Vec<BagChunkInfo>,
    /// Connection information keyed by file connection id
    connections: BTreeMap<u32, BagConnection>,
    /// Memory-mapped file
    mmap: memmap2::Mmap,
}

/// Parsed fields from a BAG record header
#[derive(Debug, Default)]
pub(crate) struct RecordHeader {
    op: Option<u8>,
    conn: Option<u32>,
    time: Option<u64>,
    topic: Option<String>,
    md5sum: Option<String>,
    message_type: Option<String>,
    message_definition: Option<String>,
    callerid: Option<String>,
    latching: Option<String>,
    index_pos: Option<u64>,
    conn_count: Option<u32>,
    chunk_count: Option<u32>,
    chunk_pos: Option<u64>,
    start_time: Option<u64>,
    end_time: Option<u64>,
    compression: Option<String>,
    size: Option<u32>,
    count: Option<u32>,
}

impl BagParser {
    /// BAG magic string
    const MAGIC: &[u8] = b"#ROSBAG V";

    /// Open a BAG file and parse its metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = File::open(&path).map_err(ToolError::io_at(&path))?;

        // SAFETY: the map is read-only and the file is not modified while
        // the parser is alive.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(ToolError::io_at(&path))?;

        let mut cursor = Cursor::new(&mmap[..]);
        let version = Self::parse_magic(&mut cursor)?;
        if version != "2.0" {
            return Err(ToolError::unsupported(format!(
                "ROS bag format version {version} in {}",
                path.display()
            )));
        }

        let header = Self::parse_bag_header_record(&mut cursor, version)?;

        let indexed = header.index_pos >= MAGIC_LEN && header.index_pos < mmap.len() as u64;
        let (chunks, connections) = if indexed {
            Self::parse_index_section(&mmap, &header)?
        } else {
            Self::scan_file_for_metadata(&mmap)?
        };

        Ok(Self {
            path,
            header,
            chunks,
            connections,
            mmap,
        })
    }

    /// Parse the BAG magic string and return version.
    fn parse_magic<R: Read>(reader: &mut R) -> Result<String> {
        let mut magic = [0u8; 9];
        reader.read_exact(&mut magic).map_err(|e| {
            ToolError::parse(
                "BagParser::parse_magic",
                format!("Failed to read magic: {e}"),
            )
        })?;

        if magic != Self::MAGIC {
            return Err(ToolError::parse(
                "BagParser::parse_magic",
                format!("Invalid BAG magic: {:?}", String::from_utf8_lossy(&magic)),
            ));
        }

        // Version and newline, e.g. "2.0\n"
        let mut version_buf = [0u8; 4];
        reader.read_exact(&mut version_buf).map_err(|e| {
            ToolError::parse(
                "BagParser::parse_magic",
                format!("Failed to read version: {e}"),
            )
        })?;

        Ok(String::from_utf8_lossy(&version_buf).trim().to_string())
    }

    /// Parse the bag header record (first record after magic).
    fn parse_bag_header_record<R: Read>(reader: &mut R, version: String) -> Result<BagHeader> {
        let (fields, _data) = Self::read_record(reader)?;

        if fields.op != Some(OP_BAG_HEADER) {
            return Err(ToolError::parse(
                "BagParser::parse_bag_header",
                format!(
                    "Expected bag header record (op=0x03), got op={:?}",
                    fields.op
                ),
            ));
        }

        Ok(BagHeader {
            version,
            index_pos: fields.index_pos.unwrap_or(0),
            conn_count: fields.conn_count.unwrap_or(0),
            chunk_count: fields.chunk_count.unwrap_or(0),
        })
    }

    /// Read a single BAG record: `<header_len: u32><header><data_len: u32><data>`
    pub(crate) fn read_record<R: Read>(reader: &mut R) -> Result<(RecordHeader, Vec<u8>)> {
        let header_len = reader.read_u32::<LittleEndian>().map_err(|e| {
            ToolError::parse(
                "BagParser::read_record",
                format!("Failed to read header_len: {e}"),
            )
        })?;

        let mut header_bytes = vec![0u8; header_len as usize];
        reader.read_exact(&mut header_bytes).map_err(|e| {
            ToolError::parse(
                "BagParser::read_record",
                format!("Failed to read header: {e}"),
            )
        })?;

        let fields = Self::parse_record_header(&header_bytes);

        let data_len = reader.read_u32::<LittleEndian>().map_err(|e| {
            ToolError::parse(
                "BagParser::read_record",
                format!("Failed to read data_len: {e}"),
            )
        })?;

        let mut data = vec![0u8; data_len as usize];
        reader.read_exact(&mut data).map_err(|e| {
            ToolError::parse(
                "BagParser::read_record",
                format!("Failed to read data: {e}"),
            )
        })?;

        Ok((fields, data))
    }

    /// Parse header bytes into named fields.
    /// Format: sequence of `<field_len: u32><field_name>=<field_value>`
    pub(crate) fn parse_record_header(header_bytes: &[u8]) -> RecordHeader {
        let mut cursor = Cursor::new(header_bytes);
        let mut fields = RecordHeader::default();

        while (cursor.position() as usize) < header_bytes.len() {
            let field_len = match cursor.read_u32::<LittleEndian>() {
                Ok(len) => len as usize,
                Err(_) => break,
            };

            if field_len == 0 {
                continue;
            }

            let mut field_bytes = vec![0u8; field_len];
            if cursor.read_exact(&mut field_bytes).is_err() {
                break;
            }

            if let Some(eq_pos) = field_bytes.iter().position(|&b| b == b'=') {
                let name = &field_bytes[..eq_pos];
                let value = &field_bytes[eq_pos + 1..];
                Self::parse_field(&mut fields, name, value);
            }
        }

        fields
    }

    /// Parse a single field from name and value bytes.
    fn parse_field(fields: &mut RecordHeader, name: &[u8], value: &[u8]) {
        let text = || String::from_utf8_lossy(value).to_string();
        match name {
            b"op" if value.len() == 1 => fields.op = Some(value[0]),
            b"conn" => fields.conn = le_u32(value),
            b"time" => fields.time = le_time(value),
            b"topic" => fields.topic = Some(text()),
            b"md5sum" => fields.md5sum = Some(text()),
            b"type" => fields.message_type = Some(text()),
            b"message_definition" => fields.message_definition = Some(text()),
            b"callerid" => fields.callerid = Some(text()),
            b"latching" => fields.latching = Some(text()),
            b"index_pos" => fields.index_pos = le_u64(value),
            b"conn_count" => fields.conn_count = le_u32(value),
            b"chunk_count" => fields.chunk_count = le_u32(value),
            b"chunk_pos" => fields.chunk_pos = le_u64(value),
            b"start_time" => fields.start_time = le_time(value),
            b"end_time" => fields.end_time = le_time(value),
            b"compression" => fields.compression = Some(text()),
            b"size" => fields.size = le_u32(value),
            b"count" => fields.count = le_u32(value),
            // ver and unknown fields
            _ => {}
        }
    }

    /// Parse the index section to get chunk info and connections.
    fn parse_index_section(
        mmap: &[u8],
        header: &BagHeader,
    ) -> Result<(Vec<BagChunkInfo>, BTreeMap<u32, BagConnection>)> {
        let mut cursor = Cursor::new(mmap);
        cursor.set_position(header.index_pos);

        let mut chunks = Vec::new();
        let mut connections = BTreeMap::new();

        while (cursor.position() as usize) < mmap.len() {
            let (fields, data) = match Self::read_record(&mut cursor) {
                Ok(r) => r,
                Err(_) => break,
            };

            match fields.op {
                Some(OP_CONNECTION) => {
                    if let Some(conn) = Self::connection_from_record(&fields, &data) {
                        connections.entry(conn.conn_id).or_insert(conn);
                    }
                }
                Some(OP_CHUNK_INFO) => {
                    let sequence = chunks.len() as u64;
                    if let Some(info) = Self::chunk_info_from_fields(&fields, &data, sequence) {
                        chunks.push(info);
                    }
                }
                _ => {}
            }
        }

        Ok((chunks, connections))
    }

    /// Build a connection from a connection record.
    ///
    /// `type`, `md5sum`, `message_definition`, `callerid` and `latching`
    /// live in the data section, which is itself a field list.
    fn connection_from_record(header: &RecordHeader, data: &[u8]) -> Option<BagConnection> {
        let data_fields = Self::parse_record_header(data);
        Some(BagConnection {
            conn_id: header.conn?,
            topic: header.topic.clone().or_else(|| data_fields.topic.clone())?,
            message_type: data_fields.message_type?,
            md5sum: data_fields.md5sum.unwrap_or_default(),
            message_definition: data_fields.message_definition.unwrap_or_default(),
            callerid: data_fields.callerid,
            latching: data_fields.latching.as_deref() == Some("1"),
        })
    }

    /// Create a chunk info from its header fields and data.
    ///
    /// The data section holds `count` pairs of `(conn: u32, count: u32)`.
    fn chunk_info_from_fields(
        fields: &RecordHeader,
        data: &[u8],
        sequence: u64,
    ) -> Option<BagChunkInfo> {
        let pairs = fields.count.unwrap_or((data.len() / 8) as u32);
        let mut cursor = Cursor::new(data);
        let mut connection_counts = BTreeMap::new();

        for _ in 0..pairs {
            let (Ok(conn), Ok(count)) = (
                cursor.read_u32::<LittleEndian>(),
                cursor.read_u32::<LittleEndian>(),
            ) else {
                break;
            };
            *connection_counts.entry(conn).or_insert(0) += count;
        }

        Some(BagChunkInfo {
            sequence,
            chunk_pos: fields.chunk_pos?,
            start_time: fields.start_time.unwrap_or(0),
            end_time: fields.end_time.unwrap_or(0),
            connection_counts,
        })
    }

    /// Scan the whole file when no index section is available.
    ///
    /// Every chunk is decompressed once to recover its connections, message
    /// counts and time range.
    fn scan_file_for_metadata(
        mmap: &[u8],
    ) -> Result<(Vec<BagChunkInfo>, BTreeMap<u32, BagConnection>)> {
        let mut cursor = Cursor::new(mmap);
        cursor.set_position(MAGIC_LEN);
        Self::read_record(&mut cursor)?;

        let mut chunks = Vec::new();
        let mut connections = BTreeMap::new();

        while (cursor.position() as usize) < mmap.len() {
            let record_start = cursor.position();

            let (fields, data) = match Self::read_record(&mut cursor) {
                Ok(r) => r,
                Err(_) => break,
            };

            match fields.op {
                Some(OP_CONNECTION) => {
                    if let Some(conn) = Self::connection_from_record(&fields, &data) {
                        connections.entry(conn.conn_id).or_insert(conn);
                    }
                }
                Some(OP_CHUNK) => {
                    let Ok(raw) = Self::decompress(&fields, data) else {
                        // Truncated tail chunk from an interrupted recording
                        break;
                    };
                    let mut info = BagChunkInfo {
                        sequence: chunks.len() as u64,
                        chunk_pos: record_start,
                        start_time: u64::MAX,
                        end_time: 0,
                        connection_counts: BTreeMap::new(),
                    };
                    Self::walk_chunk(&raw, |fields, data| match fields.op {
                        Some(OP_CONNECTION) => {
                            if let Some(conn) = Self::connection_from_record(fields, data) {
                                connections.entry(conn.conn_id).or_insert(conn);
                            }
                        }
                        Some(OP_MSG_DATA) => {
                            if let (Some(conn), Some(time)) = (fields.conn, fields.time) {
                                info.start_time = info.start_time.min(time);
                                info.end_time = info.end_time.max(time);
                                *info.connection_counts.entry(conn).or_insert(0) += 1;
                            }
                        }
                        _ => {}
                    });
                    if !info.connection_counts.is_empty() {
                        chunks.push(info);
                    }
                }
                _ => {}
            }
        }

        Ok((chunks, connections))
    }

    /// Visit every record inside decompressed chunk data.
    fn walk_chunk(raw: &[u8], mut visit: impl FnMut(&RecordHeader, &[u8])) {
        let mut cursor = Cursor::new(raw);
        while (cursor.position() as usize) < raw.len() {
            match Self::read_record(&mut cursor) {
                Ok((fields, data)) => visit(&fields, &data),
                Err(_) => break,
            }
        }
    }

    /// Get chunk information.
    pub fn chunks(&self) -> &[BagChunkInfo] {
        &self.chunks
    }

    /// Get connections keyed by file connection id.
    pub fn connections(&self) -> &BTreeMap<u32, BagConnection> {
        &self.connections
    }

    /// Get the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get header info.
    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    /// Read and decompress a single chunk.
    pub fn read_chunk(&self, chunk_info: &BagChunkInfo) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(&self.mmap[..]);
        cursor.set_position(chunk_info.chunk_pos);

        let (fields, data) = Self::read_record(&mut cursor)?;

        if fields.op != Some(OP_CHUNK) {
            return Err(ToolError::parse(
                "BagParser::read_chunk",
                format!("Expected chunk record (op=0x05), got op={:?}", fields.op),
            ));
        }

        Self::decompress(&fields, data)
    }

    /// Decompress chunk data according to its `compression` field.
    fn decompress(fields: &RecordHeader, data: Vec<u8>) -> Result<Vec<u8>> {
        let compression = fields.compression.as_deref().unwrap_or("none");
        let mut decompressed = Vec::with_capacity(fields.size.unwrap_or(0) as usize);

        match compression {
            "none" => return Ok(data),
            "bz2" => {
                bzip2::read::BzDecoder::new(&data[..])
                    .read_to_end(&mut decompressed)
                    .map_err(|e| {
                        ToolError::parse(
                            "BagParser::read_chunk",
                            format!("BZ2 decompression failed: {e}"),
                        )
                    })?;
            }
            "lz4" => {
                lz4_flex::frame::FrameDecoder::new(&data[..])
                    .read_to_end(&mut decompressed)
                    .map_err(|e| {
                        ToolError::parse(
                            "BagParser::read_chunk",
                            format!("LZ4 decompression failed: {e}"),
                        )
                    })?;
            }
            other => {
                return Err(ToolError::unsupported(format!(
                    "chunk compression '{other}'"
                )))
            }
        }

        Ok(decompressed)
    }

    /// Extract message data records from decompressed chunk data.
    ///
    /// Messages on connections absent from `known` are skipped.
    pub fn parse_chunk_messages(
        decompressed_data: &[u8],
        known: &HashMap<u32, u32>,
    ) -> Vec<ChunkMessage> {
        let mut messages = Vec::new();
        Self::walk_chunk(decompressed_data, |fields, data| {
            if fields.op != Some(OP_MSG_DATA) {
                return;
            }
            let Some(conn_id) = fields.conn else {
                return;
            };
            if known.contains_key(&conn_id) {
                messages.push(ChunkMessage {
                    conn_id,
                    time: fields.time.unwrap_or(0),
                    data: data.to_vec(),
                });
            }
        });
        messages
    }
}

fn le_u32(value: &[u8]) -> Option<u32> {
    value.get(..4)?.try_into().ok().map(u32::from_le_bytes)
}

fn le_u64(value: &[u8]) -> Option<u64> {
    value.get(..8)?.try_into().ok().map(u64::from_le_bytes)
}

/// ROS time: sec (4 bytes) + nsec (4 bytes)
fn le_time(value: &[u8]) -> Option<u64> {
    let sec = le_u32(value)? as u64;
    let nsec = le_u32(value.get(4..)?)? as u64;
    Some(sec * 1_000_000_000 + nsec)
}
