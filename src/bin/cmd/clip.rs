// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Clip command - cut a time window out of a bag.

use std::path::PathBuf;

use clap::Args;
use rosbag_tools::segment::Segmenter;

use crate::common::{default_clip_output, print_report, OutputArgs, ProgressBar, Result};

/// Clip out a portion of INBAG (ROS1 bag or rosbag2 directory).
#[derive(Args, Clone, Debug)]
pub struct ClipCmd {
    /// Input bag
    #[arg(value_name = "INBAG")]
    input: PathBuf,

    /// Clipped bag (default: <parent>/rosbags-clips/<stem>_clip_NN)
    #[arg(short, long, visible_alias = "outbag")]
    output: Option<PathBuf>,

    /// Start of the clip, in elapsed seconds since the start of the bag
    #[arg(short, long, allow_negative_numbers = true)]
    start: Option<f64>,

    /// End of the clip, in elapsed seconds since the start of the bag
    #[arg(short, long, allow_negative_numbers = true)]
    end: Option<f64>,

    #[command(flatten)]
    out: OutputArgs,
}

impl ClipCmd {
    pub fn run(self) -> Result<()> {
        let output = match self.output {
            Some(path) => path,
            None => default_clip_output(&self.input)?,
        };

        println!("Clipping {}", self.input.display());
        let mut segmenter =
            Segmenter::new(self.out.segment_options()).with_progress(ProgressBar::new("Clipping"));
        let report = segmenter.clip(&self.input, &output, self.start, self.end)?;

        println!("Clip written:");
        print_report(&report);
        Ok(())
    }
}
