// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::fs;
use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};

use clap::Args;
use rosbag_tools::io::writer::{BagCompression, StorageKind, WriterBuilder, WriterConfig};
use rosbag_tools::segment::{Progress, SegmentOptions, SegmentReport};

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Directory next to the input that collects default clip outputs.
pub const CLIPS_DIR: &str = "rosbags-clips";

/// Format a duration in nanoseconds to human-readable string.
pub fn format_duration(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let millis = (nanos % 1_000_000_000) / 1_000_000;

    if secs >= 3600 {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    } else if secs >= 60 {
        let minutes = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}m {}s", minutes, remaining_secs)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

/// Format a timestamp in nanoseconds to human-readable string.
pub fn format_timestamp(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let datetime = chrono::DateTime::<chrono::Utc>::from_timestamp(secs as i64, 0);

    match datetime {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{} ns", nanos),
    }
}

/// Stem and suffix of a bag path, `run.bag` giving `("run", ".bag")`.
fn stem_and_suffix(input: &Path) -> (String, String) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rosbag".to_string());
    let suffix = input
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (stem, suffix)
}

fn parent_dir(input: &Path) -> PathBuf {
    match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Sibling of `input` with `tag` appended to the stem.
///
/// `/data/run.bag` with `_filt` gives `/data/run_filt.bag`, and the
/// rosbag2 directory `/data/run` gives `/data/run_filt`.
pub fn sibling_output(input: &Path, tag: &str) -> PathBuf {
    let (stem, suffix) = stem_and_suffix(input);
    parent_dir(input).join(format!("{stem}{tag}{suffix}"))
}

/// Next free clip path under `<parent>/rosbags-clips/`.
///
/// Clips are numbered by how many entries in that directory already start
/// with the input's stem. The directory is created if missing.
pub fn default_clip_output(input: &Path) -> Result<PathBuf> {
    let (stem, suffix) = stem_and_suffix(input);
    let dir = parent_dir(input).join(CLIPS_DIR);
    fs::create_dir_all(&dir)?;

    let mut existing = 0usize;
    for entry in fs::read_dir(&dir)? {
        if entry?.file_name().to_string_lossy().starts_with(&stem) {
            existing += 1;
        }
    }
    Ok(dir.join(format!("{stem}_clip_{existing:02}{suffix}")))
}

/// Writer and overwrite flags shared by the segmenting commands.
#[derive(Args, Clone, Debug)]
pub struct OutputArgs {
    /// Force output overwriting
    #[arg(short, long = "force-overwriting")]
    pub force: bool,

    /// Chunk compression for ROS1 bag outputs (none, bz2)
    #[arg(long, default_value = "none")]
    pub compression: BagCompression,

    /// Storage for rosbag2 outputs (sqlite3, mcap); defaults to the input's
    #[arg(long)]
    pub storage: Option<StorageKind>,
}

impl OutputArgs {
    pub fn writer_config(&self) -> WriterConfig {
        let builder = WriterBuilder::new().compression(self.compression);
        match self.storage {
            Some(storage) => builder.storage(storage).build(),
            None => builder.build(),
        }
    }

    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions::default()
            .force_overwrite(self.force)
            .writer(self.writer_config())
    }
}

/// Print the destinations of a finished run.
pub fn print_report(report: &SegmentReport) {
    for output in &report.outputs {
        println!(
            "  {} ({} messages)",
            output.path.display(),
            output.message_count
        );
    }
    println!(
        "Read {} messages from {}",
        report.messages_read,
        report.input.display()
    );
}

/// Progress bar wrapper for consistent progress reporting.
///
/// Draws only when stderr is a terminal.
pub struct ProgressBar {
    prefix: String,
    inner: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a new progress bar.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: None,
        }
    }
}

impl Progress for ProgressBar {
    fn start(&mut self, total: u64) {
        if !std::io::stderr().is_terminal() {
            return;
        }
        let pb = indicatif::ProgressBar::new(total);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_prefix(self.prefix.clone());
        self.inner = Some(pb);
    }

    fn advance(&mut self, records: u64) {
        if let Some(pb) = &self.inner {
            pb.inc(records);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.inner.take() {
            pb.finish_and_clear();
        }
    }
}
