// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Split command - cut a bag into consecutive segments.

use std::path::PathBuf;

use clap::Args;
use rosbag_tools::segment::{parse_boundaries_json, read_boundaries_file, Segmenter};

use crate::common::{print_report, sibling_output, OutputArgs, ProgressBar, Result};

/// Split INBAG (ROS1 bag or rosbag2 directory) into several bags.
#[derive(Args, Clone, Debug)]
pub struct SplitCmd {
    /// Input bag
    #[arg(value_name = "INBAG")]
    input: PathBuf,

    /// Base name of the split bags, suffixed _01, _02, ... (default: <stem>_split)
    #[arg(short, long, visible_alias = "outbag")]
    output: Option<PathBuf>,

    /// Split times as a JSON list, e.g. '[12.5, 30]', in elapsed seconds
    #[arg(short, long, conflicts_with = "timestamps_file")]
    timestamps: Option<String>,

    /// File with one split time per line, in elapsed seconds
    #[arg(long, value_name = "FILE")]
    timestamps_file: Option<PathBuf>,

    #[command(flatten)]
    out: OutputArgs,
}

impl SplitCmd {
    pub fn run(self) -> Result<()> {
        let boundaries = match (&self.timestamps, &self.timestamps_file) {
            (_, Some(file)) => read_boundaries_file(file)?,
            (Some(json), None) => parse_boundaries_json(json)?,
            (None, None) => Vec::new(),
        };
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| sibling_output(&self.input, "_split"));

        println!("Splitting {} at {:?}", self.input.display(), boundaries);
        let mut segmenter =
            Segmenter::new(self.out.segment_options()).with_progress(ProgressBar::new("Splitting"));
        let report = segmenter.split(&self.input, &output, &boundaries)?;

        println!("{} segments written:", report.outputs.len());
        print_report(&report);
        Ok(())
    }
}
