// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Clip, split and topic removal entry points.
//!
//! Every operation follows the same order: open and classify the source,
//! validate every argument, check and clear destinations, open writers and
//! register connections, then stream the source once. Nothing is written or
//! deleted until all validation has passed.
//!
//! # Example
//!
//! ```no_run
//! use rosbag_tools::segment::{SegmentOptions, Segmenter};
//!
//! let mut segmenter = Segmenter::new(SegmentOptions::default().force_overwrite(true));
//! let report = segmenter.clip("run.bag", "run_clip.bag", Some(5.0), Some(20.0))?;
//! println!("wrote {} records", report.total_written());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use super::engine::{self, Sink};
use super::guard::{check_destinations, check_generations};
use super::progress::{NoProgress, Progress};
use super::remap::build_map;
use crate::core::time::validate_window;
use crate::core::{Result, SplitPlan, TimeWindow};
use crate::io::detection::output_generation;
use crate::io::filter::TopicFilter;
use crate::io::formats::rosbag2::Rosbag2Reader;
use crate::io::metadata::Connection;
use crate::io::reader::open_reader;
use crate::io::traits::FormatReader;
use crate::io::writer::{open_writer, WriterConfig};

/// Options shared by every segmentation operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentOptions {
    /// Replace existing destinations instead of failing
    pub force_overwrite: bool,
    /// Writer settings for every destination
    pub writer: WriterConfig,
}

impl SegmentOptions {
    /// Allow or forbid replacing existing destinations.
    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.force_overwrite = force;
        self
    }

    /// Use the given writer configuration.
    pub fn writer(mut self, writer: WriterConfig) -> Self {
        self.writer = writer;
        self
    }
}

/// One written destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutput {
    pub path: PathBuf,
    /// Records written to this destination
    pub message_count: u64,
}

/// Result of a segmentation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentReport {
    /// Source container
    pub input: PathBuf,
    /// Destinations in creation order
    pub outputs: Vec<SegmentOutput>,
    /// Source records consumed
    pub messages_read: u64,
    /// Topics excluded by topic removal
    pub removed_topics: Vec<String>,
}

impl SegmentReport {
    /// Destination paths in creation order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().map(|o| o.path.clone()).collect()
    }

    /// Records written across all destinations.
    pub fn total_written(&self) -> u64 {
        self.outputs.iter().map(|o| o.message_count).sum()
    }
}

/// Paths of split segments: `<stem>_NN<suffix>`, numbered from 1.
pub fn split_output_paths(base: &Path, count: usize) -> Vec<PathBuf> {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "split".to_string());
    let suffix = base
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..=count)
        .map(|i| base.with_file_name(format!("{stem}_{i:02}{suffix}")))
        .collect()
}

struct Destination {
    path: PathBuf,
    window: Option<TimeWindow>,
}

/// Runs segmentation operations with shared options and progress sink.
pub struct Segmenter {
    options: SegmentOptions,
    progress: Box<dyn Progress>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmentOptions::default())
    }
}

impl Segmenter {
    /// Create a segmenter that reports no progress.
    pub fn new(options: SegmentOptions) -> Self {
        Self {
            options,
            progress: Box::new(NoProgress),
        }
    }

    /// Report progress to `progress`.
    pub fn with_progress<P: Progress + 'static>(mut self, progress: P) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn options(&self) -> &SegmentOptions {
        &self.options
    }

    /// Copy the records between `start` and `end` elapsed seconds, both
    /// included, into `output`. Missing bounds default to the source's
    /// own start and end.
    pub fn clip<P1, P2>(
        &mut self,
        input: P1,
        output: P2,
        start: Option<f64>,
        end: Option<f64>,
    ) -> Result<SegmentReport>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let output = output.as_ref();
        let reader = open_reader(input)?;
        let source = reader.generation();
        check_generations(source, output_generation(output, source), output)?;
        let window = validate_window(&reader.bounds(), start, end)?;

        let destinations = vec![Destination {
            path: output.to_path_buf(),
            window: Some(window),
        }];
        self.run(reader.as_ref(), destinations, |_| true)
    }

    /// Split at `boundaries` elapsed seconds into `<base>_01`, `<base>_02`
    /// and so on. A record exactly on a boundary goes to both segments.
    pub fn split<P1, P2>(
        &mut self,
        input: P1,
        output_base: P2,
        boundaries: &[f64],
    ) -> Result<SegmentReport>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
    {
        let output_base = output_base.as_ref();
        let reader = open_reader(input)?;
        let source = reader.generation();
        check_generations(source, output_generation(output_base, source), output_base)?;
        let plan = SplitPlan::new(&reader.bounds(), boundaries)?;

        let destinations = split_output_paths(output_base, plan.segment_count())
            .into_iter()
            .zip(plan.windows())
            .map(|(path, window)| Destination {
                path,
                window: Some(window),
            })
            .collect();
        self.run(reader.as_ref(), destinations, |_| true)
    }

    /// Copy every record except those on topics matching any of
    /// `patterns`. Patterns are exact names or shell-style globs.
    pub fn remove_topics<P1, P2, S>(
        &mut self,
        input: P1,
        output: P2,
        patterns: &[S],
    ) -> Result<SegmentReport>
    where
        P1: AsRef<Path>,
        P2: AsRef<Path>,
        S: AsRef<str>,
    {
        let output = output.as_ref();
        let reader = open_reader(input)?;
        let source = reader.generation();
        check_generations(source, output_generation(output, source), output)?;
        let filter = TopicFilter::new(patterns)?;

        let topics = reader.topics();
        let retained = filter.retain(&topics);
        let removed: Vec<String> = topics.difference(&retained).cloned().collect();
        if !removed.is_empty() {
            info!(
                context = "segment",
                removed = ?removed,
                "Removing topics"
            );
        }

        let destinations = vec![Destination {
            path: output.to_path_buf(),
            window: None,
        }];
        let mut report = self.run(reader.as_ref(), destinations, |c| {
            retained.contains(&c.topic)
        })?;
        report.removed_topics = removed;
        Ok(report)
    }

    /// Writer settings for `reader`, following its storage plugin unless
    /// one was configured.
    fn writer_config(&self, reader: &dyn FormatReader) -> WriterConfig {
        let mut config = self.options.writer.clone();
        if config.storage.is_none() {
            config.storage = reader
                .as_any()
                .downcast_ref::<Rosbag2Reader>()
                .map(Rosbag2Reader::storage_kind);
        }
        config
    }

    fn run<F>(
        &mut self,
        reader: &dyn FormatReader,
        destinations: Vec<Destination>,
        keep: F,
    ) -> Result<SegmentReport>
    where
        F: Fn(&Connection) -> bool,
    {
        let paths: Vec<&Path> = destinations.iter().map(|d| d.path.as_path()).collect();
        check_destinations(&paths, reader.path(), self.options.force_overwrite)?;

        let config = self.writer_config(reader);
        let mut sinks = Vec::with_capacity(destinations.len());
        for dest in destinations {
            let generation = output_generation(&dest.path, reader.generation());
            let mut writer = open_writer(&dest.path, generation, &config)?;
            let map = build_map(
                writer.as_mut(),
                reader.connections().iter().filter(|c| keep(*c)),
            )?;
            sinks.push(Sink::new(writer, map, dest.window));
        }

        let summary = engine::stream(reader, sinks, self.progress.as_mut())?;

        let outputs: Vec<SegmentOutput> = summary
            .written
            .into_iter()
            .map(|(path, message_count)| SegmentOutput {
                path,
                message_count,
            })
            .collect();
        for output in &outputs {
            info!(
                context = "segment",
                path = %output.path.display(),
                records = output.message_count,
                "Wrote destination"
            );
        }

        Ok(SegmentReport {
            input: reader.path().to_path_buf(),
            outputs,
            messages_read: summary.consumed,
            removed_topics: Vec::new(),
        })
    }
}

/// Clip `input` to `[start, end]` elapsed seconds and return the
/// destination path.
pub fn clip<P1, P2>(
    input: P1,
    output: P2,
    start: Option<f64>,
    end: Option<f64>,
    force_overwrite: bool,
) -> Result<PathBuf>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let mut segmenter = Segmenter::new(SegmentOptions::default().force_overwrite(force_overwrite));
    let report = segmenter.clip(input, output, start, end)?;
    Ok(report.paths().into_iter().next().unwrap_or_default())
}

/// Split `input` at `boundaries` elapsed seconds and return the segment
/// paths in order.
pub fn split<P1, P2>(
    input: P1,
    output_base: P2,
    boundaries: &[f64],
    force_overwrite: bool,
) -> Result<Vec<PathBuf>>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let mut segmenter = Segmenter::new(SegmentOptions::default().force_overwrite(force_overwrite));
    Ok(segmenter.split(input, output_base, boundaries)?.paths())
}

/// Copy `input` without the topics matching `patterns` and return the
/// destination path.
pub fn remove_topics<P1, P2, S>(
    input: P1,
    output: P2,
    patterns: &[S],
    force_overwrite: bool,
) -> Result<PathBuf>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    S: AsRef<str>,
{
    let mut segmenter = Segmenter::new(SegmentOptions::default().force_overwrite(force_overwrite));
    let report = segmenter.remove_topics(input, output, patterns)?;
    Ok(report.paths().into_iter().next().unwrap_or_default())
}

/// Topics a removal with `patterns` would keep.
pub fn retained_topics<S: AsRef<str>>(
    topics: &BTreeSet<String>,
    patterns: &[S],
) -> Result<BTreeSet<String>> {
    crate::io::filter::filter_out(topics, patterns)
}
