// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Topic-remove command - drop topics from a bag.

use std::path::PathBuf;

use clap::Args;
use rosbag_tools::segment::Segmenter;

use crate::common::{print_report, sibling_output, OutputArgs, ProgressBar, Result};

/// Remove topics from INBAG (ROS1 bag or rosbag2 directory).
#[derive(Args, Clone, Debug)]
pub struct TopicRemoveCmd {
    /// Input bag
    #[arg(value_name = "INBAG")]
    input: PathBuf,

    /// Filtered bag (default: <stem>_filt)
    #[arg(short, long, visible_alias = "outbag")]
    output: Option<PathBuf>,

    /// Topic name or shell-style pattern to remove (repeatable)
    #[arg(short = 't', long = "topics", value_name = "PATTERN")]
    topics: Vec<String>,

    #[command(flatten)]
    out: OutputArgs,
}

impl TopicRemoveCmd {
    pub fn run(self) -> Result<()> {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| sibling_output(&self.input, "_filt"));

        let mut segmenter = Segmenter::new(self.out.segment_options())
            .with_progress(ProgressBar::new("Filtering"));
        let report = segmenter.remove_topics(&self.input, &output, self.topics.as_slice())?;

        if report.removed_topics.is_empty() {
            println!("No topic removed");
        } else {
            println!("Removed topics:");
            for topic in &report.removed_topics {
                println!("  {topic}");
            }
        }
        println!("Filtered bag written:");
        print_report(&report);
        Ok(())
    }
}
