// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # rosbag-tools CLI
//!
//! Clip, split and filter ROS1 bags and rosbag2 directories.
//!
//! ## Usage
//!
//! ```sh
//! # Keep 10 s to 25 s after the start
//! rosbag-tools clip drive.bag -s 10 -e 25 -o drive_clip.bag
//!
//! # Split at 30 s and 60 s into drive_split_01.bag .. drive_split_03.bag
//! rosbag-tools split drive.bag -t '[30, 60]'
//!
//! # Drop every camera topic from a rosbag2 directory
//! rosbag-tools topic-remove drive_ros2 -t '/camera/*'
//!
//! # Show time span and topics
//! rosbag-tools info drive.bag
//! ```

mod cmd;
mod common;

use std::process;

use clap::{ArgAction, Parser, Subcommand};
use cmd::{ClipCmd, InfoCmd, SplitCmd, TopicRemoveCmd};
use common::Result;
use rosbag_tools::ToolError;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// rosbag-tools - clip, split and filter rosbags
///
/// Works on ROS1 `.bag` files and rosbag2 directories (sqlite3 or MCAP
/// storage). Outputs always use the generation of the input.
#[derive(Parser, Clone)]
#[command(name = "rosbag-tools")]
#[command(about = "Clip, split and filter ROS1 bags and rosbag2 directories", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Clip out a time window of a bag
    Clip(ClipCmd),

    /// Split a bag into consecutive segments
    Split(SplitCmd),

    /// Remove topics from a bag
    TopicRemove(TopicRemoveCmd),

    /// Show a bag's time span and topics
    Info(InfoCmd),
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Clip(cmd) => cmd.run(),
        Commands::Split(cmd) => cmd.run(),
        Commands::TopicRemove(cmd) => cmd.run(),
        Commands::Info(cmd) => cmd.run(),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<ToolError>() {
            for (field, value) in err.log_fields() {
                debug!(context = "main", field, value = %value, "Error detail");
            }
        }
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
