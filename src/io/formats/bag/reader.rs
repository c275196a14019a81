// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Time-ordered ROS1 bag reader.
//!
//! Chunks in a bag may overlap in time, so records are merged: chunks are
//! loaded lazily in start-time order and their messages kept in a min-heap
//! until no unloaded chunk can hold an earlier one.

use std::any::Any;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::path::Path;

use super::parser::{BagChunkInfo, BagParser};
use crate::core::{Result, TimeBounds};
use crate::io::metadata::{Connection, ConnectionMetadata, FlatMetadata, Generation, Record};
use crate::io::traits::{FormatReader, RecordStream};

/// ROS1 bag reader.
///
/// Connection ids in the file are renumbered densely in ascending file-id
/// order, so `connections()[id].id == id`.
pub struct BagReader {
    parser: BagParser,
    connections: Vec<Connection>,
    /// File connection id to dense id
    conn_id_map: HashMap<u32, u32>,
    bounds: TimeBounds,
    message_count: u64,
}

impl BagReader {
    /// Open a bag file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let parser = BagParser::open(path)?;

        let mut connections = Vec::with_capacity(parser.connections().len());
        let mut conn_id_map = HashMap::with_capacity(parser.connections().len());
        for (file_id, conn) in parser.connections() {
            let id = connections.len() as u32;
            conn_id_map.insert(*file_id, id);
            connections.push(Connection {
                id,
                topic: conn.topic.clone(),
                message_type: conn.message_type.clone(),
                metadata: ConnectionMetadata::Flat(FlatMetadata {
                    message_definition: conn.message_definition.clone(),
                    md5sum: conn.md5sum.clone(),
                    callerid: conn.callerid.clone(),
                    latching: conn.latching,
                }),
            });
        }

        let populated = parser
            .chunks()
            .iter()
            .filter(|c| c.message_count() > 0);
        let bounds = populated
            .clone()
            .map(|c| (c.start_time, c.end_time))
            .reduce(|(s1, e1), (s2, e2)| (s1.min(s2), e1.max(e2)))
            .map_or_else(TimeBounds::default, |(s, e)| TimeBounds::new(s, e));
        let message_count = populated.map(BagChunkInfo::message_count).sum();

        Ok(Self {
            parser,
            connections,
            conn_id_map,
            bounds,
            message_count,
        })
    }

    /// Underlying parser, for chunk-level inspection.
    pub fn parser(&self) -> &BagParser {
        &self.parser
    }
}

impl FormatReader for BagReader {
    fn path(&self) -> &Path {
        self.parser.path()
    }

    fn generation(&self) -> Generation {
        Generation::Flat
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn bounds(&self) -> TimeBounds {
        self.bounds
    }

    fn message_count(&self) -> u64 {
        self.message_count
    }

    fn records(&self) -> Result<RecordStream<'_>> {
        Ok(Box::new(BagRecordIter::new(self)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Heap entry ordered by timestamp, then by load order.
struct Pending {
    timestamp: u64,
    seq: u64,
    record: Record,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, self.seq).cmp(&(other.timestamp, other.seq))
    }
}

/// Merging iterator over a bag's records.
pub struct BagRecordIter<'a> {
    reader: &'a BagReader,
    /// Populated chunks sorted by start time
    chunks: Vec<&'a BagChunkInfo>,
    next_chunk: usize,
    heap: BinaryHeap<Reverse<Pending>>,
    seq: u64,
}

impl<'a> BagRecordIter<'a> {
    fn new(reader: &'a BagReader) -> Self {
        let mut chunks: Vec<_> = reader
            .parser
            .chunks()
            .iter()
            .filter(|c| c.message_count() > 0)
            .collect();
        chunks.sort_by_key(|c| (c.start_time, c.sequence));

        Self {
            reader,
            chunks,
            next_chunk: 0,
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }

    /// Whether the next unloaded chunk may hold the next record.
    fn needs_chunk(&self) -> bool {
        let Some(chunk) = self.chunks.get(self.next_chunk) else {
            return false;
        };
        match self.heap.peek() {
            Some(Reverse(head)) => chunk.start_time <= head.timestamp,
            None => true,
        }
    }

    fn load_chunk(&mut self) -> Result<()> {
        let chunk = self.chunks[self.next_chunk];
        self.next_chunk += 1;

        let raw = self.reader.parser.read_chunk(chunk)?;
        for msg in BagParser::parse_chunk_messages(&raw, &self.reader.conn_id_map) {
            let conn_id = self.reader.conn_id_map[&msg.conn_id];
            self.heap.push(Reverse(Pending {
                timestamp: msg.time,
                seq: self.seq,
                record: Record {
                    conn_id,
                    timestamp: msg.time,
                    data: msg.data,
                },
            }));
            self.seq += 1;
        }
        Ok(())
    }
}

impl Iterator for BagRecordIter<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.needs_chunk() {
            if let Err(e) = self.load_chunk() {
                // Stop after reporting; later chunks cannot be ordered safely
                self.next_chunk = self.chunks.len();
                self.heap.clear();
                return Some(Err(e));
            }
        }
        self.heap.pop().map(|Reverse(p)| Ok(p.record))
    }
}
