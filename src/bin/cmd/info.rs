// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Info command - summarize a bag.

use std::path::PathBuf;

use clap::Args;
use rosbag_tools::io::formats::bag::BagReader;
use rosbag_tools::io::formats::rosbag2::Rosbag2Reader;
use rosbag_tools::io::open_reader;

use crate::common::{format_duration, format_timestamp, Result};

/// Show generation, time span and topics of INBAG.
#[derive(Args, Clone, Debug)]
pub struct InfoCmd {
    /// Input bag
    #[arg(value_name = "INBAG")]
    input: PathBuf,
}

impl InfoCmd {
    pub fn run(self) -> Result<()> {
        let reader = open_reader(&self.input)?;

        println!("Path:       {}", self.input.display());
        println!("Generation: {}", reader.generation());
        if let Some(bag) = reader.as_any().downcast_ref::<BagReader>() {
            let header = bag.parser().header();
            println!("Version:    {}", header.version);
            println!("Chunks:     {}", header.chunk_count);
        }
        if let Some(r2) = reader.as_any().downcast_ref::<Rosbag2Reader>() {
            println!("Storage:    {}", r2.storage_kind());
            println!("Files:      {}", r2.storage_paths().len());
            match r2.info() {
                Some(info) => println!("Metadata:   version {}", info.version),
                None => println!("Metadata:   none, summarized from storage"),
            }
        }
        println!(
            "Start:      {} ({} ns)",
            format_timestamp(reader.start_time()),
            reader.start_time()
        );
        println!(
            "End:        {} ({} ns)",
            format_timestamp(reader.end_time()),
            reader.end_time()
        );
        println!(
            "Duration:   {} ({:.3} s)",
            format_duration(reader.duration()),
            reader.bounds().duration_secs()
        );
        println!("Messages:   {}", reader.message_count());

        let connections = reader.connections();
        println!("Topics ({}):", reader.topics().len());
        let width = connections.iter().map(|c| c.topic.len()).max().unwrap_or(0);
        for conn in connections {
            println!("  {:width$}  {}", conn.topic, conn.message_type);
        }
        Ok(())
    }
}
