// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod clip;
mod info;
mod split;
mod topic_remove;

pub use clip::ClipCmd;
pub use info::InfoCmd;
pub use split::SplitCmd;
pub use topic_remove::TopicRemoveCmd;
