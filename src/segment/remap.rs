// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Source to destination connection id mapping.

use tracing::debug;

use crate::core::{Result, ToolError};
use crate::io::metadata::Connection;
use crate::io::traits::FormatWriter;

/// Dense lookup from source connection id to destination connection id.
///
/// Connections that were not registered (control topic, removed topics)
/// map to `None`, and their records are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionMap {
    ids: Vec<Option<u32>>,
}

impl ConnectionMap {
    /// Destination id for a source connection.
    #[inline]
    pub fn get(&self, source_id: u32) -> Option<u32> {
        self.ids.get(source_id as usize).copied().flatten()
    }

    /// Number of mapped connections.
    pub fn len(&self) -> usize {
        self.ids.iter().filter(|id| id.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, source_id: u32, dest_id: u32) {
        let idx = source_id as usize;
        if self.ids.len() <= idx {
            self.ids.resize(idx + 1, None);
        }
        self.ids[idx] = Some(dest_id);
    }
}

/// Register `connections` on `writer` and return the id mapping.
///
/// The control topic is never registered. Fails before registering
/// anything if a connection belongs to the other generation.
pub fn build_map<'a, I>(writer: &mut dyn FormatWriter, connections: I) -> Result<ConnectionMap>
where
    I: IntoIterator<Item = &'a Connection>,
{
    let connections: Vec<&Connection> = connections.into_iter().collect();

    if let Some(conn) = connections
        .iter()
        .find(|c| c.metadata.generation() != writer.generation())
    {
        return Err(ToolError::UnsupportedConversion {
            input_generation: conn.metadata.generation().to_string(),
            output_generation: writer.generation().to_string(),
            path: writer.path().to_path_buf(),
        });
    }

    let mut map = ConnectionMap::default();
    for conn in connections {
        if conn.is_control() {
            debug!(
                context = "remap",
                topic = %conn.topic,
                "Skipping control topic"
            );
            continue;
        }
        let dest_id = writer.add_connection(&conn.topic, &conn.message_type, &conn.metadata)?;
        map.insert(conn.id, dest_id);
    }
    Ok(map)
}
