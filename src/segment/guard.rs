// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Destination overwrite protection.
//!
//! Validation and clearing are separate steps so that a run with several
//! destinations rejects a bad one before anything is deleted.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::core::{Result, ToolError};
use crate::io::detection::{classify, Classification};
use crate::io::metadata::Generation;

/// Whether `a` and `b` name the same filesystem entry.
///
/// Paths that do not exist yet are compared after resolving their parent.
pub fn same_path(a: &Path, b: &Path) -> bool {
    resolve(a) == resolve(b)
}

fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Reject `path` as a destination without touching the filesystem.
pub fn validate_destination(path: &Path, input: &Path, force_overwrite: bool) -> Result<()> {
    if same_path(path, input) {
        return Err(ToolError::SameFile {
            path: path.to_path_buf(),
        });
    }
    if exists(path) && !force_overwrite {
        return Err(ToolError::DestinationExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Delete whatever sits at `path`.
pub fn clear_destination(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return Ok(()),
    };

    let kind = match classify(path) {
        Classification::Container(generation) => generation.as_str(),
        Classification::NotAContainer if meta.is_dir() => "directory",
        Classification::NotAContainer => "file",
    };
    warn!(
        context = "guard",
        path = %path.display(),
        kind,
        "Overwriting existing destination"
    );

    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        // Flat bags, plain files and symlinks
        fs::remove_file(path)
    };
    removed.map_err(ToolError::io_at(path))
}

/// Validate one destination and clear it if overwriting is allowed.
pub fn check_destination(path: &Path, input: &Path, force_overwrite: bool) -> Result<()> {
    check_destinations(&[path], input, force_overwrite)
}

/// Validate every destination, then clear the ones that exist.
pub fn check_destinations<P: AsRef<Path>>(
    paths: &[P],
    input: &Path,
    force_overwrite: bool,
) -> Result<()> {
    for path in paths {
        validate_destination(path.as_ref(), input, force_overwrite)?;
    }
    for path in paths {
        clear_destination(path.as_ref())?;
    }
    Ok(())
}

/// Reject writing `output` in a different generation than `input`.
pub fn check_generations(input: Generation, output: Generation, path: &Path) -> Result<()> {
    if input != output {
        return Err(ToolError::UnsupportedConversion {
            input_generation: input.to_string(),
            output_generation: output.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}
