//! The registry: resources and captures as write-once-per-field ledgers.
//!
//! - `resources.jsonl` and `captures.jsonl` hold one record per line, sorted by date
//! - `unused_ids.json` holds the reserved-id free list
//! - every accepted insert rewrites the affected collection file
//!
//! A single writer is assumed; there is no locking.

use crate::collection::{Collection, ConflictKind, Existing, FieldConflict};
use crate::digest::SnapshotRef;
use crate::ids::{ReservedIdError, ReservedIds};
use crate::jsonl::JsonlError;
use crate::record::{Capture, Record, RecordKind, Resource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_REGISTRY_DIR: &str = "the_registry";
pub const RESOURCES_FILE: &str = "resources.jsonl";
pub const CAPTURES_FILE: &str = "captures.jsonl";
pub const UNUSED_IDS_FILE: &str = "unused_ids.json";

pub const REJECTION_FIELD_CHANGED: &str = "registry.field.changed";
pub const REJECTION_FIELD_ADDED: &str = "registry.field.added";
pub const REJECTION_RESOURCE_UNKNOWN: &str = "registry.resource.unknown";
pub const REJECTION_FIELD_RESERVED: &str = "registry.field.reserved";

/// Fatal registry failures. Domain rejections are [`Registration::Rejected`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error(transparent)]
    ReservedIds(#[from] ReservedIdError),

    #[error("registry directory {path}: {message}")]
    Directory { path: String, message: String },
}

/// Why one registration was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub kind: RecordKind,
    pub name: String,
    pub class: String,
    pub message: String,
}

/// Outcome of one registration command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// New record, persisted.
    Inserted,
    /// Already registered with matching fields; nothing written.
    Confirmed,
    /// Skipped; the stored state is untouched.
    Rejected(Rejection),
}

impl Registration {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Registration::Rejected(_))
    }
}

/// Explicit store object over one registry directory.
#[derive(Debug)]
pub struct Registry {
    dir: PathBuf,
    resources: Collection<Resource>,
    captures: Collection<Capture>,
    ids: ReservedIds,
}

impl Registry {
    /// Open (creating when missing) the registry under `dir` and load both
    /// collections.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| RegistryError::Directory {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
        }
        if !dir.is_dir() {
            return Err(RegistryError::Directory {
                path: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let resources = Collection::load(dir.join(RESOURCES_FILE))?;
        let captures = Collection::load(dir.join(CAPTURES_FILE))?;
        let ids = ReservedIds::new(dir.join(UNUSED_IDS_FILE));
        debug!(
            dir = %dir.display(),
            resources = resources.len(),
            captures = captures.len(),
            "registry loaded"
        );
        Ok(Self {
            dir,
            resources,
            captures,
            ids,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Register one record of either kind.
    ///
    /// A record whose passthrough keys shadow a named field is rejected
    /// before anything is compared or written.
    pub fn register(&mut self, record: Record) -> Result<Registration, RegistryError> {
        if let Some(key) = record.shadowed_key() {
            warn!(
                class = REJECTION_FIELD_RESERVED,
                kind = %record.kind(),
                name = record.name(),
                key,
                "registration rejected"
            );
            return Ok(Registration::Rejected(Rejection {
                kind: record.kind(),
                name: record.name().to_string(),
                class: REJECTION_FIELD_RESERVED.to_string(),
                message: format!("passthrough key {key} shadows a named field"),
            }));
        }
        match record {
            Record::Resource(resource) => self.register_resource(resource),
            Record::Capture(capture) => self.register_capture(capture),
        }
    }

    pub fn register_resource(&mut self, resource: Resource) -> Result<Registration, RegistryError> {
        match self.resources.compare(&resource)? {
            Existing::Absent => {
                debug!(resource = %resource.name, "registering resource");
                self.resources.insert(resource);
                self.resources.flush()?;
                Ok(Registration::Inserted)
            }
            Existing::Matches => {
                debug!(resource = %resource.name, "resource already registered");
                Ok(Registration::Confirmed)
            }
            Existing::Conflicts(conflict) => Ok(reject_conflict(
                RecordKind::Resource,
                &resource.name,
                conflict,
            )),
        }
    }

    /// Register a capture. Its resource must already be registered; new
    /// captures without an id draw one from the reserved pool.
    pub fn register_capture(&mut self, mut capture: Capture) -> Result<Registration, RegistryError> {
        if self.resources.get(&capture.capture_of).is_none() {
            let rejection = Rejection {
                kind: RecordKind::Capture,
                name: capture.name.clone(),
                class: REJECTION_RESOURCE_UNKNOWN.to_string(),
                message: format!("capture_of names unregistered resource {}", capture.capture_of),
            };
            warn!(
                class = REJECTION_RESOURCE_UNKNOWN,
                capture = %capture.name,
                resource = %capture.capture_of,
                "capture rejected"
            );
            return Ok(Registration::Rejected(rejection));
        }

        match self.captures.compare(&capture)? {
            Existing::Absent => {
                if capture.id.is_none() {
                    capture.id = Some(self.ids.draw()?);
                }
                debug!(capture = %capture.name, id = ?capture.id, "registering capture");
                self.captures.insert(capture);
                self.captures.flush()?;
                Ok(Registration::Inserted)
            }
            Existing::Matches => {
                debug!(capture = %capture.name, "capture already registered");
                Ok(Registration::Confirmed)
            }
            Existing::Conflicts(conflict) => Ok(reject_conflict(
                RecordKind::Capture,
                &capture.name,
                conflict,
            )),
        }
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn capture(&self, name: &str) -> Option<&Capture> {
        self.captures.get(name)
    }

    /// All resources, ascending by date.
    pub fn all_resources(&self) -> Vec<&Resource> {
        self.resources.sorted()
    }

    /// All captures (optionally of one resource), ascending by date.
    pub fn all_captures(&self, capture_of: Option<&str>) -> Vec<&Capture> {
        self.captures
            .sorted()
            .into_iter()
            .filter(|capture| capture_of.is_none_or(|name| capture.capture_of == name))
            .collect()
    }

    /// Ids still available for assignment.
    pub fn remaining_ids(&self) -> Result<Vec<u64>, RegistryError> {
        Ok(self.ids.remaining()?)
    }

    /// Delete both collections and reset the reserved-id pool.
    pub fn wipe(&mut self) -> Result<(), RegistryError> {
        self.resources.wipe()?;
        self.captures.wipe()?;
        self.ids.reset()?;
        debug!(dir = %self.dir.display(), "registry wiped");
        Ok(())
    }

    /// Relative archive path of a capture's file: `capture_of/name/filename`.
    pub fn capture_path(capture: &Capture) -> PathBuf {
        PathBuf::from(&capture.capture_of)
            .join(&capture.name)
            .join(&capture.filename)
    }

    /// Digest over both collections and the remaining id pool.
    pub fn snapshot_ref(&self) -> Result<SnapshotRef, RegistryError> {
        let mut builder = SnapshotRef::builder();
        for resource in self.resources.rows() {
            builder = builder.line("resource", &canonical_row(resource)?);
        }
        for capture in self.captures.rows() {
            builder = builder.line("capture", &canonical_row(capture)?);
        }
        let ids = self
            .remaining_ids()?
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Ok(builder.line("unused_ids", &ids).finish())
    }
}

fn canonical_row<T: Serialize>(row: &T) -> Result<String, RegistryError> {
    let line = serde_json::to_string(row).map_err(|e| JsonlError::Serialize(e.to_string()))?;
    Ok(line)
}

fn reject_conflict(kind: RecordKind, name: &str, conflict: FieldConflict) -> Registration {
    let (class, message) = match conflict.kind {
        ConflictKind::Changed => (
            REJECTION_FIELD_CHANGED,
            format!("cannot change registered field {}", conflict.field),
        ),
        ConflictKind::Added => (
            REJECTION_FIELD_ADDED,
            format!("cannot add field {} to registration", conflict.field),
        ),
    };
    warn!(class, %kind, name, field = %conflict.field, "registration rejected");
    Registration::Rejected(Rejection {
        kind,
        name: name.to_string(),
        class: class.to_string(),
        message,
    })
}
