// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Single-pass streaming copy shared by clip, split and topic removal.
//!
//! The source is read exactly once. Each record is offered to every open
//! destination whose window contains it and whose connection map knows
//! its connection. With a time-ordered source, a destination is finished
//! as soon as a record lands past its window, and the pass ends early once
//! every destination is finished.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::progress::Progress;
use super::remap::ConnectionMap;
use crate::core::{Result, TimeWindow};
use crate::io::traits::{FormatReader, FormatWriter};

/// One destination of a streaming pass.
pub struct Sink {
    writer: Box<dyn FormatWriter>,
    map: ConnectionMap,
    /// `None` admits every timestamp
    window: Option<TimeWindow>,
    written: u64,
    finished: bool,
}

impl Sink {
    pub fn new(
        writer: Box<dyn FormatWriter>,
        map: ConnectionMap,
        window: Option<TimeWindow>,
    ) -> Self {
        Self {
            writer,
            map,
            window,
            written: 0,
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    /// Records written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn finish(&mut self) -> Result<()> {
        if !self.finished {
            self.finished = true;
            self.writer.finish()?;
            debug!(
                context = "segment",
                path = %self.writer.path().display(),
                records = self.written,
                "Destination finished"
            );
        }
        Ok(())
    }
}

/// Outcome of a streaming pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    /// Source records consumed
    pub consumed: u64,
    /// Destination paths with their record counts, in sink order
    pub written: Vec<(PathBuf, u64)>,
}

/// Stream `reader` into `sinks` and finish every sink.
///
/// On error the remaining sinks are still finalized by their writers'
/// drop handlers, leaving partial output on disk.
pub fn stream(
    reader: &dyn FormatReader,
    mut sinks: Vec<Sink>,
    progress: &mut dyn Progress,
) -> Result<StreamSummary> {
    let ordered = reader.is_time_ordered();
    progress.start(reader.message_count());

    let result = copy_records(reader, &mut sinks, ordered, progress);
    progress.finish();
    let consumed = result?;

    for sink in &mut sinks {
        sink.finish()?;
    }

    Ok(StreamSummary {
        consumed,
        written: sinks
            .iter()
            .map(|s| (s.path().to_path_buf(), s.written))
            .collect(),
    })
}

fn copy_records(
    reader: &dyn FormatReader,
    sinks: &mut [Sink],
    ordered: bool,
    progress: &mut dyn Progress,
) -> Result<u64> {
    let mut consumed = 0u64;

    for record in reader.records()? {
        let record = record?;
        consumed += 1;
        progress.advance(1);

        for sink in sinks.iter_mut().filter(|s| !s.finished) {
            if let Some(window) = sink.window {
                if ordered && window.is_past(record.timestamp) {
                    sink.finish()?;
                    continue;
                }
                if !window.contains(record.timestamp) {
                    continue;
                }
            }
            if let Some(dest_id) = sink.map.get(record.conn_id) {
                sink.writer.write(dest_id, record.timestamp, &record.data)?;
                sink.written += 1;
            }
        }

        if ordered && sinks.iter().all(|s| s.finished) {
            debug!(
                context = "segment",
                consumed,
                "All destinations finished, stopping early"
            );
            break;
        }
    }

    Ok(consumed)
}
