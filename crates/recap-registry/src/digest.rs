//! Content digests over registry state.
//!
//! Two registries with the same snapshot ref hold the same rows and the same
//! remaining id pool. Re-running the pipeline over unchanged input must not
//! move the ref.

use sha2::{Digest, Sha256};
use std::fmt;

pub const SNAPSHOT_REF_PREFIX: &str = "registry.snapshot:sha256:";

/// A hex sha256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotRef(pub String);

impl SnapshotRef {
    pub fn builder() -> SnapshotRefBuilder {
        SnapshotRefBuilder {
            hasher: Sha256::new(),
        }
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SNAPSHOT_REF_PREFIX}{}", self.0)
    }
}

/// Feeds labelled lines in a stable order.
pub struct SnapshotRefBuilder {
    hasher: Sha256,
}

impl SnapshotRefBuilder {
    pub fn line(mut self, section: &str, value: &str) -> Self {
        self.hasher.update(section.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b"\n");
        self
    }

    pub fn finish(self) -> SnapshotRef {
        let hash = self.hasher.finalize();
        SnapshotRef(format!("{hash:x}"))
    }
}
