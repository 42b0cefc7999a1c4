//! Reserved small-integer identifiers for captures.
//!
//! The pool is the set of gaps left in the OTT 1.0 id sequence. It is
//! consumed head-first and the remainder is persisted after every draw.

use crate::jsonl::{JsonlError, read_substrate, replace_file};
use std::io::Write;
use std::path::PathBuf;

/// Full initial pool, in draw order.
pub const INITIAL_UNUSED_IDS: &[u64] = &[
    7, 9, 11, 13, 15, 17, 18, 19, 21, 23, 26, 27, 28, 29, 30, 31, 32, 33, 34, 36, 37, 39, 40, 43,
    45, 46, 51, 52, 55, 57, 61, 62, 64, 66, 68, 70, 72, 74, 75, 76, 77, 78, 79, 80, 81, 83, 84, 97,
    99, 101, 106, 108, 111, 113, 115, 116, 117, 120, 144, 145, 147, 151, 153, 154, 156, 157, 158,
    160, 161, 162, 163, 165, 166, 168, 170, 172, 174, 202, 203, 204, 205, 228, 229, 232, 233, 238,
    240, 241, 242, 243, 244, 245, 247, 249, 253, 255, 256, 257, 259, 261,
];

/// Errors from the reserved-id free list.
#[derive(Debug, thiserror::Error)]
pub enum ReservedIdError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("reserved id pool exhausted: {0}")]
    Exhausted(String),
}

/// Disk-persisted free list of reserved ids.
#[derive(Debug, Clone)]
pub struct ReservedIds {
    path: PathBuf,
}

impl ReservedIds {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ids not yet handed out. A missing file means the pool is untouched.
    pub fn remaining(&self) -> Result<Vec<u64>, ReservedIdError> {
        if !self.path.exists() {
            return Ok(INITIAL_UNUSED_IDS.to_vec());
        }
        let bytes = read_substrate(&self.path)?;
        let ids: Vec<u64> = serde_json::from_slice(&bytes)
            .map_err(|e| JsonlError::Parse(e.line(), e.to_string()))?;
        Ok(ids)
    }

    /// Pop the head of the pool and persist the remainder.
    pub fn draw(&self) -> Result<u64, ReservedIdError> {
        let mut ids = self.remaining()?;
        if ids.is_empty() {
            return Err(ReservedIdError::Exhausted(self.path.display().to_string()));
        }
        let id = ids.remove(0);
        self.store(&ids)?;
        Ok(id)
    }

    /// Restore the full initial pool.
    pub fn reset(&self) -> Result<(), ReservedIdError> {
        self.store(INITIAL_UNUSED_IDS)
    }

    fn store(&self, ids: &[u64]) -> Result<(), ReservedIdError> {
        let text =
            serde_json::to_string_pretty(ids).map_err(|e| JsonlError::Serialize(e.to_string()))?;
        replace_file(&self.path, |writer| {
            writeln!(writer, "{text}").map_err(|e| JsonlError::Io(0, e.to_string()))
        })?;
        Ok(())
    }
}
