// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Shared metadata types for both bag generations.
//!
//! Generation-specific connection fields live behind
//! [`ConnectionMetadata`], which is matched once when a connection is
//! registered and never per record.

use std::fmt;

/// Reserved topic rosbag2 recorders use to announce a storage file split.
pub const SPLIT_EVENT_TOPIC: &str = "/events/write_split";

/// On-disk container generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Generation {
    /// Single-file ROS1 bag (`.bag`)
    Flat,
    /// rosbag2 directory of `.db3` or `.mcap` storage files
    Segmented,
}

impl Generation {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Generation::Flat => "ROS1 bag",
            Generation::Segmented => "rosbag2",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection fields carried by ROS1 bags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatMetadata {
    /// Full message definition text
    pub message_definition: String,
    /// MD5 digest of the message definition
    pub md5sum: String,
    /// Publishing node, if recorded
    pub callerid: Option<String>,
    /// Whether the publisher was latched
    pub latching: bool,
}

/// Topic fields carried by rosbag2 directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedMetadata {
    /// Serialization format, normally `cdr`
    pub serialization_format: String,
    /// QoS profiles as the recorder's YAML text, copied verbatim
    pub offered_qos_profiles: String,
}

impl Default for SegmentedMetadata {
    fn default() -> Self {
        Self {
            serialization_format: "cdr".to_string(),
            offered_qos_profiles: String::new(),
        }
    }
}

/// Generation-specific connection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMetadata {
    Flat(FlatMetadata),
    Segmented(SegmentedMetadata),
}

impl ConnectionMetadata {
    /// Generation this metadata belongs to.
    pub fn generation(&self) -> Generation {
        match self {
            ConnectionMetadata::Flat(_) => Generation::Flat,
            ConnectionMetadata::Segmented(_) => Generation::Segmented,
        }
    }
}

/// A topic registration local to one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Dense container-local id, `0..connections.len()`
    pub id: u32,
    /// Topic name (e.g., "/imu/data")
    pub topic: String,
    /// Message type (e.g., "sensor_msgs/Imu" or "sensor_msgs/msg/Imu")
    pub message_type: String,
    /// Generation-specific fields
    pub metadata: ConnectionMetadata,
}

impl Connection {
    /// Whether this connection carries the rosbag2 split-event control topic.
    pub fn is_control(&self) -> bool {
        self.topic == SPLIT_EVENT_TOPIC
    }
}

/// One timestamped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Id of the owning [`Connection`] in the reading container
    pub conn_id: u32,
    /// Receive time in nanoseconds since the Unix epoch
    pub timestamp: u64,
    /// Serialized message, never decoded
    pub data: Vec<u8>,
}
