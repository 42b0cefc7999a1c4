//! # recap-registry
//!
//! Registry layer for resource and capture records.
//!
//! This crate provides:
//! - `Resource`, `Capture` and the tagged `Record` (registration commands)
//! - JSONL read/write with whole-file atomic replacement
//! - `Registry`, the write-once-per-field store with its reserved-id pool
//! - the `recap.command.v1` command log and its replay
//!
//! It does not normalize seed metadata or order a corpus; that is
//! `recap-seed`.
//!
//! ## Data model
//!
//! ```text
//! the_registry/
//!     resources.jsonl   one resource per line, by date
//!     captures.jsonl    one capture per line, by date
//!     unused_ids.json   reserved-id free list
//! ```

pub mod collection;
pub mod commands;
pub mod digest;
pub mod ids;
pub mod jsonl;
pub mod record;
pub mod registry;

pub use collection::{Collection, ConflictKind, Entry, Existing, FieldConflict};
pub use commands::{
    COMMAND_SCHEMA, CommandLogError, RegistryCommand, ReplayReport, command_id_for, commands_for,
    read_commands, read_commands_from_path, replay_commands, write_commands,
    write_commands_to_path,
};
pub use digest::{SNAPSHOT_REF_PREFIX, SnapshotRef};
pub use ids::{INITIAL_UNUSED_IDS, ReservedIdError, ReservedIds};
pub use jsonl::JsonlError;
pub use record::{
    BUILD_RESOURCE, Capture, Legal, NamingTemplates, RECORD_TAG, Record, RecordKind, Resource,
};
pub use registry::{
    CAPTURES_FILE, DEFAULT_REGISTRY_DIR, REJECTION_FIELD_ADDED, REJECTION_FIELD_CHANGED,
    REJECTION_FIELD_RESERVED, REJECTION_RESOURCE_UNKNOWN, RESOURCES_FILE, Registration, Registry,
    RegistryError, Rejection, UNUSED_IDS_FILE,
};
