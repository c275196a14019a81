// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for rosbag-tools.
//!
//! Every variant carries the offending path or value, and where a range
//! applies, the valid range, so a caller can correct the invocation
//! without reading logs:
//! - Time bounds and split boundaries
//! - Overwrite protection
//! - Container classification and generation mismatches
//! - Storage backend failures

use std::path::{Path, PathBuf};

/// Errors that can occur while inspecting or rewriting a container.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A time bound or split boundary is out of range or misordered
    #[error("Invalid timestamp {value}s: {reason} (valid range: [{min}, {max}] s)")]
    InvalidTimestamp {
        /// Offending value in elapsed seconds
        value: f64,
        /// Why the value was rejected
        reason: String,
        /// Lowest accepted value in elapsed seconds
        min: f64,
        /// Highest accepted value in elapsed seconds
        max: f64,
    },

    /// Destination equals the source
    #[error("Cannot use same path as input and output: {}", path.display())]
    SameFile {
        /// The shared path
        path: PathBuf,
    },

    /// Destination exists and overwriting was not authorized
    #[error("Destination {} already exists; enable force overwrite to replace it", path.display())]
    DestinationExists {
        /// Existing destination
        path: PathBuf,
    },

    /// Reading one generation and writing the other
    #[error(
        "Conversion from {input_generation} to {output_generation} is not supported (destination: {})",
        path.display()
    )]
    UnsupportedConversion {
        /// Generation of the source container
        input_generation: String,
        /// Generation requested for the destination
        output_generation: String,
        /// Destination path
        path: PathBuf,
    },

    /// Path does not classify as a container
    #[error("{} is not a rosbag (expected a .bag file or a directory with .db3/.mcap files)", path.display())]
    NotAContainer {
        /// Offending path
        path: PathBuf,
    },

    /// A content source that must provide data was empty
    #[error("{what} in {} is empty", path.display())]
    EmptyContent {
        /// What was expected
        what: String,
        /// Source of the content
        path: PathBuf,
    },

    /// A topic pattern could not be compiled
    #[error("Invalid topic pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Offending pattern
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// Feature that the reader or writer does not handle
    #[error("Unsupported feature: '{feature}'")]
    Unsupported {
        /// What is not supported
        feature: String,
    },

    /// Malformed container or input contents
    #[error("Parse error in {context}: {message}")]
    Parse {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// Failure reported by a storage backend (sqlite3, mcap, yaml)
    #[error("{backend} error: {message}")]
    Storage {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// I/O failure on a specific path
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl ToolError {
    /// Create an invalid timestamp error.
    pub fn invalid_timestamp(value: f64, reason: impl Into<String>, min: f64, max: f64) -> Self {
        ToolError::InvalidTimestamp {
            value,
            reason: reason.into(),
            min,
            max,
        }
    }

    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a storage backend error.
    pub fn storage(backend: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::Storage {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        ToolError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Create a "not a container" error.
    pub fn not_a_container(path: impl Into<PathBuf>) -> Self {
        ToolError::NotAContainer { path: path.into() }
    }

    /// Create an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }

    /// Adapter for `map_err` on I/O results touching `path`.
    pub fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> ToolError {
        let path = path.to_path_buf();
        move |source| ToolError::Io { path, source }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            ToolError::InvalidTimestamp {
                value,
                reason,
                min,
                max,
            } => vec![
                ("value", value.to_string()),
                ("reason", reason.clone()),
                ("min", min.to_string()),
                ("max", max.to_string()),
            ],
            ToolError::SameFile { path }
            | ToolError::DestinationExists { path }
            | ToolError::NotAContainer { path } => vec![("path", path.display().to_string())],
            ToolError::UnsupportedConversion {
                input_generation,
                output_generation,
                path,
            } => vec![
                ("input", input_generation.clone()),
                ("output", output_generation.clone()),
                ("path", path.display().to_string()),
            ],
            ToolError::EmptyContent { what, path } => {
                vec![("what", what.clone()), ("path", path.display().to_string())]
            }
            ToolError::InvalidPattern { pattern, message } => {
                vec![("pattern", pattern.clone()), ("message", message.clone())]
            }
            ToolError::Unsupported { feature } => vec![("feature", feature.clone())],
            ToolError::Parse { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            ToolError::Storage { backend, message } => {
                vec![("backend", backend.clone()), ("message", message.clone())]
            }
            ToolError::Io { path, source } => vec![
                ("path", path.display().to_string()),
                ("error", source.to_string()),
            ],
        }
    }
}

impl From<rusqlite::Error> for ToolError {
    fn from(err: rusqlite::Error) -> Self {
        ToolError::storage("sqlite3", err.to_string())
    }
}

impl From<mcap::McapError> for ToolError {
    fn from(err: mcap::McapError) -> Self {
        ToolError::storage("mcap", err.to_string())
    }
}

impl From<serde_yaml::Error> for ToolError {
    fn from(err: serde_yaml::Error) -> Self {
        ToolError::storage("yaml", err.to_string())
    }
}

/// Result type for rosbag-tools operations.
pub type Result<T> = std::result::Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_timestamp_reports_range() {
        let err = ToolError::invalid_timestamp(12.5, "after end of bag", 0.0, 10.0);
        assert!(matches!(err, ToolError::InvalidTimestamp { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid timestamp 12.5s: after end of bag (valid range: [0, 10] s)"
        );
    }

    #[test]
    fn test_same_file_names_path() {
        let err = ToolError::SameFile {
            path: PathBuf::from("/data/run.bag"),
        };
        assert!(err.to_string().contains("/data/run.bag"));
    }

    #[test]
    fn test_unsupported_conversion_message() {
        let err = ToolError::UnsupportedConversion {
            input_generation: "ROS1 bag".to_string(),
            output_generation: "rosbag2".to_string(),
            path: PathBuf::from("out"),
        };
        assert_eq!(
            err.to_string(),
            "Conversion from ROS1 bag to rosbag2 is not supported (destination: out)"
        );
    }

    #[test]
    fn test_io_at_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = ToolError::io_at(Path::new("/tmp/x.bag"))(io_err);
        match &err {
            ToolError::Io { path, .. } => assert_eq!(path, Path::new("/tmp/x.bag")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_log_fields_invalid_timestamp() {
        let err = ToolError::invalid_timestamp(-1.0, "negative", 0.0, 3.0);
        let fields = err.log_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], ("value", "-1".to_string()));
        assert_eq!(fields[1], ("reason", "negative".to_string()));
        assert_eq!(fields[3], ("max", "3".to_string()));
    }

    #[test]
    fn test_log_fields_storage() {
        let err = ToolError::storage("sqlite3", "no such table: topics");
        let fields = err.log_fields();
        assert_eq!(fields[0], ("backend", "sqlite3".to_string()));
        assert_eq!(fields[1], ("message", "no such table: topics".to_string()));
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();
        let err: ToolError = yaml_err.into();
        assert!(matches!(err, ToolError::Storage { ref backend, .. } if backend == "yaml"));
    }
}
