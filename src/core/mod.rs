// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout rosbag-tools.
//!
//! - [`ToolError`] - Error taxonomy with offending values attached
//! - [`time`] - Elapsed/absolute time translation and split planning

pub mod error;
pub mod time;

pub use error::{Result, ToolError};
pub use time::{SplitPlan, TimeBounds, TimeWindow};
