//! Write-once-per-field keyed collections backed by one JSONL file each.

use crate::jsonl::{JsonlError, read_rows_from_path, write_rows_to_path};
use crate::record::{Capture, RecordKind, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// A row type that can live in a [`Collection`].
pub trait Entry: Serialize + DeserializeOwned + Clone {
    const KIND: RecordKind;

    fn name(&self) -> &str;

    fn date(&self) -> Option<&str>;
}

impl Entry for Resource {
    const KIND: RecordKind = RecordKind::Resource;

    fn name(&self) -> &str {
        &self.name
    }

    fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl Entry for Capture {
    const KIND: RecordKind = RecordKind::Capture;

    fn name(&self) -> &str {
        &self.name
    }

    fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

/// How an incoming row disagrees with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The field is stored with a different value.
    Changed,
    /// The field is not stored at all.
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConflict {
    pub field: String,
    pub kind: ConflictKind,
}

/// Result of comparing an incoming row against the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Existing {
    Absent,
    Matches,
    Conflicts(FieldConflict),
}

/// In-memory index of one collection plus the file it flushes to.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    path: PathBuf,
    rows: BTreeMap<String, T>,
}

impl<T: Entry> Collection<T> {
    /// Load a collection; a missing file is an empty collection.
    ///
    /// The file is our own output, so a repeated name means it was edited
    /// or damaged and is reported as corruption.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, JsonlError> {
        let path = path.into();
        let mut rows = BTreeMap::new();
        if path.exists() {
            for row in read_rows_from_path::<T>(&path)? {
                let name = row.name().to_string();
                if rows.insert(name.clone(), row).is_some() {
                    return Err(JsonlError::Corrupt(format!(
                        "{}: duplicate {} {name}",
                        path.display(),
                        T::KIND
                    )));
                }
            }
        }
        Ok(Self { path, rows })
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.rows.get(name)
    }

    /// Compare `incoming` with the stored row of the same name.
    ///
    /// Every field of `incoming` must be stored with an identical value.
    /// Fields only present in the stored row (such as an assigned id) are
    /// fine.
    pub fn compare(&self, incoming: &T) -> Result<Existing, JsonlError> {
        let Some(stored) = self.rows.get(incoming.name()) else {
            return Ok(Existing::Absent);
        };
        let stored = to_object(stored)?;
        let incoming = to_object(incoming)?;
        for (field, value) in &incoming {
            match stored.get(field) {
                Some(existing) if existing == value => {}
                Some(_) => {
                    return Ok(Existing::Conflicts(FieldConflict {
                        field: field.clone(),
                        kind: ConflictKind::Changed,
                    }));
                }
                None => {
                    return Ok(Existing::Conflicts(FieldConflict {
                        field: field.clone(),
                        kind: ConflictKind::Added,
                    }));
                }
            }
        }
        Ok(Existing::Matches)
    }

    /// Insert a row that [`Collection::compare`] reported as absent.
    pub fn insert(&mut self, row: T) {
        self.rows.insert(row.name().to_string(), row);
    }

    /// Rows sorted ascending by date; undated rows first, ties by name.
    pub fn sorted(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self.rows.values().collect();
        rows.sort_by(|left, right| left.date().cmp(&right.date()));
        rows
    }

    /// Iterate rows in name order.
    pub fn rows(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    /// Persist the whole collection, sorted by date.
    pub fn flush(&self) -> Result<(), JsonlError> {
        let rows: Vec<T> = self.sorted().into_iter().cloned().collect();
        write_rows_to_path(&self.path, &rows)
    }

    /// Drop all rows and delete the backing file.
    pub fn wipe(&mut self) -> Result<(), JsonlError> {
        self.rows.clear();
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| JsonlError::Io(0, format!("{}: {e}", self.path.display())))?;
        }
        Ok(())
    }
}

fn to_object<T: Serialize>(row: &T) -> Result<serde_json::Map<String, Value>, JsonlError> {
    match serde_json::to_value(row).map_err(|e| JsonlError::Serialize(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(JsonlError::Serialize(format!(
            "expected a JSON object row, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Legal;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "recap-collection-{prefix}-{}-{unique}.jsonl",
            std::process::id()
        ))
    }

    fn capture(name: &str, date: &str) -> Capture {
        let mut capture = Capture::new(name, "gbif", format!("{name}.zip"));
        capture.date = Some(date.to_string());
        capture.set_legal(Some(Legal::PublicDomain));
        capture
    }

    #[test]
    fn compare_distinguishes_changed_and_added_fields() {
        let mut collection: Collection<Capture> = Collection::load(temp_path("compare"))
            .expect("missing file should load as empty");
        let stored = capture("gbif-2019", "2019-08-01");
        assert_eq!(
            collection.compare(&stored).expect("compare should succeed"),
            Existing::Absent
        );
        collection.insert(stored.clone());

        assert_eq!(
            collection.compare(&stored).expect("compare should succeed"),
            Existing::Matches
        );

        let mut changed = stored.clone();
        changed.date = Some("2019-09-01".to_string());
        assert!(matches!(
            collection.compare(&changed).expect("compare should succeed"),
            Existing::Conflicts(FieldConflict { field, kind: ConflictKind::Changed }) if field == "date"
        ));

        let mut added = stored;
        added.doi = Some("10.15468/39omei".to_string());
        assert!(matches!(
            collection.compare(&added).expect("compare should succeed"),
            Existing::Conflicts(FieldConflict { field, kind: ConflictKind::Added }) if field == "doi"
        ));
    }

    #[test]
    fn stored_only_fields_do_not_conflict() {
        let mut collection: Collection<Capture> =
            Collection::load(temp_path("stored-only")).expect("collection should load");
        let mut stored = capture("gbif-2019", "2019-08-01");
        stored.id = Some(51);
        collection.insert(stored);

        let incoming = capture("gbif-2019", "2019-08-01");
        assert_eq!(
            collection.compare(&incoming).expect("compare should succeed"),
            Existing::Matches
        );
    }

    #[test]
    fn flush_writes_rows_sorted_by_date() {
        let path = temp_path("flush");
        let mut collection: Collection<Capture> =
            Collection::load(&path).expect("collection should load");
        collection.insert(capture("gbif-b", "2020-01-01"));
        collection.insert(capture("gbif-a", "2021-01-01"));
        collection.flush().expect("flush should succeed");

        let text = fs::read_to_string(&path).expect("collection file should exist");
        let first = text.find("gbif-b").expect("gbif-b should be written");
        let second = text.find("gbif-a").expect("gbif-a should be written");
        assert!(first < second);

        let reloaded: Collection<Capture> =
            Collection::load(&path).expect("collection should reload");
        assert_eq!(reloaded.len(), 2);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_rejects_duplicate_names() {
        let path = temp_path("duplicate");
        fs::write(&path, "{\"name\":\"gbif\"}\n{\"name\":\"gbif\"}\n")
            .expect("fixture should write");

        let err = Collection::<Resource>::load(&path).expect_err("duplicates must fail");
        assert!(matches!(err, JsonlError::Corrupt(message) if message.contains("duplicate resource gbif")));

        let _ = fs::remove_file(path);
    }
}
