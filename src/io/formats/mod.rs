// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Container format implementations.
//!
//! - [`bag`]: ROS1 bag files
//! - [`rosbag2`]: rosbag2 directories with sqlite3 or MCAP storage

pub mod bag;
pub mod rosbag2;
