//! JSONL storage: one line per record.
//!
//! Collection files are rewritten whole; the new content is written to a
//! temporary sibling and renamed over the old file once it is synced.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Read rows from a JSONL reader.
pub fn read_rows<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>, JsonlError> {
    let mut rows = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| JsonlError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row: T = serde_json::from_str(trimmed)
            .map_err(|e| JsonlError::Parse(line_no + 1, e.to_string()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Write rows to a JSONL writer.
pub fn write_rows<T: Serialize>(writer: &mut impl Write, rows: &[T]) -> Result<(), JsonlError> {
    for row in rows {
        let line = serde_json::to_string(row).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| JsonlError::Io(0, e.to_string()))?;
    }
    Ok(())
}

/// Read rows from a JSONL file path.
pub fn read_rows_from_path<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<Vec<T>, JsonlError> {
    let bytes = read_substrate(path.as_ref())?;
    read_rows(BufReader::new(bytes.as_slice()))
}

/// Write rows to a JSONL file path, replacing it atomically.
pub fn write_rows_to_path<T: Serialize>(
    path: impl AsRef<Path>,
    rows: &[T],
) -> Result<(), JsonlError> {
    replace_file(path.as_ref(), |writer| write_rows(writer, rows))
}

/// Read a whole file after checking it is clean UTF-8 text.
pub(crate) fn read_substrate(path: &Path) -> Result<Vec<u8>, JsonlError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    validate_substrate_bytes(path, &bytes)?;
    Ok(bytes)
}

/// Replace `path` with whatever `fill` writes, via a synced temporary file.
pub(crate) fn replace_file<F>(path: &Path, fill: F) -> Result<(), JsonlError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), JsonlError>,
{
    let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let tmp_path = tmp_write_path(path);
    if let Err(error) = fill_synced(&tmp_path, fill) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(JsonlError::Io(
            0,
            format!("{} -> {}: {e}", tmp_path.display(), path.display()),
        ));
    }

    if let Some(parent) = parent {
        File::open(parent)
            .and_then(|dir| dir.sync_all())
            .map_err(io_error(parent))?;
    }
    Ok(())
}

fn fill_synced<F>(tmp_path: &Path, fill: F) -> Result<(), JsonlError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), JsonlError>,
{
    let mut writer = BufWriter::new(File::create(tmp_path).map_err(io_error(tmp_path))?);
    fill(&mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|e| JsonlError::Io(0, format!("{}: {}", tmp_path.display(), e.error())))?;
    file.sync_all().map_err(io_error(tmp_path))
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> JsonlError + '_ {
    move |e| JsonlError::Io(0, format!("{}: {e}", path.display()))
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{unique}", std::process::id()));
    PathBuf::from(tmp)
}

fn validate_substrate_bytes(path: &Path, bytes: &[u8]) -> Result<(), JsonlError> {
    if bytes.contains(&0) {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(JsonlError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}

/// Errors from JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("corrupted substrate: {0}")]
    Corrupt(String),
}
