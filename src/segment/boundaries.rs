// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Split boundary sources: a text file with one value per line, or a
//! JSON list given on the command line.

use std::fs;
use std::path::Path;

use crate::core::{Result, ToolError};

/// Read elapsed-second boundaries from a file, one per line.
///
/// Blank lines are ignored. A file without any value is an error.
pub fn read_boundaries_file(path: &Path) -> Result<Vec<f64>> {
    let text = fs::read_to_string(path).map_err(ToolError::io_at(path))?;

    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = line.parse::<f64>().map_err(|e| {
            ToolError::parse(
                format!("{}:{}", path.display(), lineno + 1),
                format!("'{line}' is not a number of seconds ({e})"),
            )
        })?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(ToolError::EmptyContent {
            what: "split timestamps".to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(values)
}

/// Parse boundaries given as JSON, either a list (`[1.5, 3]`) or a
/// single number.
pub fn parse_boundaries_json(text: &str) -> Result<Vec<f64>> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| ToolError::parse("split timestamps", e.to_string()))?;

    let as_secs = |v: &serde_json::Value| {
        v.as_f64().ok_or_else(|| {
            ToolError::parse("split timestamps", format!("{v} is not a number of seconds"))
        })
    };

    match &value {
        serde_json::Value::Array(items) => items.iter().map(as_secs).collect(),
        other => Ok(vec![as_secs(other)?]),
    }
}
