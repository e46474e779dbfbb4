//! File-line loading and sorted-output writing.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SortbenchError};

/// Load every line of `path` as an owned string (terminators stripped).
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .map_err(|e| SortbenchError::input_read(path.display().to_string(), e))?;
    let reader = BufReader::new(file);
    reader
        .lines()
        .map(|line| line.map_err(|e| SortbenchError::input_read(path.display().to_string(), e)))
        .collect()
}

/// Write sorted lines to `path` unless it already exists.
///
/// Returns whether the file was written; an existing output is skipped so
/// repeated runs over the same directories don't clobber earlier results.
pub fn save_sorted(path: &Path, lines: &[&str]) -> Result<bool> {
    if path.exists() {
        debug!(path = %path.display(), "output exists; skipping file creation");
        return Ok(false);
    }
    let file = File::create(path)
        .map_err(|e| SortbenchError::output_write(path.display().to_string(), e))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}")
            .map_err(|e| SortbenchError::output_write(path.display().to_string(), e))?;
    }
    writer
        .flush()
        .map_err(|e| SortbenchError::output_write(path.display().to_string(), e))?;
    Ok(true)
}

/// Names of the regular files in `dir`, in directory-listing order.
///
/// Symlinks and subdirectories are skipped, matching what the producer
/// advertises in `number_of_files`.
pub fn regular_files(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| SortbenchError::input_read(dir.display().to_string(), e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| SortbenchError::input_read(dir.display().to_string(), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| SortbenchError::input_read(dir.display().to_string(), e))?;
        if file_type.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
