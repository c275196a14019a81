// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Segmentation and filtering of bags.
//!
//! - [`facade`] - Clip, split and topic removal entry points
//! - [`engine`] - Single-pass streaming copy
//! - [`remap`] - Connection id mapping between source and destination
//! - [`guard`] - Destination overwrite protection
//! - [`boundaries`] - Split boundary parsing
//! - [`progress`] - Progress reporting hook

pub mod boundaries;
pub mod engine;
pub mod facade;
pub mod guard;
pub mod progress;
pub mod remap;

pub use boundaries::{parse_boundaries_json, read_boundaries_file};
pub use facade::{
    clip, remove_topics, retained_topics, split, split_output_paths, SegmentOptions,
    SegmentOutput, SegmentReport, Segmenter,
};
pub use guard::{check_destination, check_destinations};
pub use progress::{NoProgress, Progress};
pub use remap::{build_map, ConnectionMap};
