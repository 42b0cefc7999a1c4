//! The raw seed document: resources, their issues, and each issue's
//! candidate captures.
//!
//! Keys the normalizer interprets are named fields. Everything else lands in
//! the per-level `rest` map and is either a known passthrough key or an
//! unrecognized one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_SEED_PATH: &str = "seed.json";

/// Keys accepted in `rest` without a warning, per level.
pub const RESOURCE_PASSTHROUGH_KEYS: &[&str] = &["retrieved_from"];
pub const ISSUE_PASSTHROUGH_KEYS: &[&str] = &["retrieved_from"];
pub const CAPTURE_PASSTHROUGH_KEYS: &[&str] =
    &["from", "commit", "retrieved_from", "retrievable_from"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub resources: Vec<ResourceBlob>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

impl SeedDocument {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SeedError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&text).map_err(|e| match e {
            SeedError::Parse(message) => SeedError::Parse(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, SeedError> {
        serde_json::from_str(text).map_err(|e| SeedError::Parse(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceBlob {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub legal: Option<String>,
    #[serde(default)]
    pub ott_idspace: Option<String>,
    #[serde(default)]
    pub original_suffix: Option<String>,
    #[serde(default)]
    pub derived_suffix: Option<String>,
    #[serde(default, rename = "===")]
    pub commentary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub capture_description: Option<String>,
    #[serde(default)]
    pub issue_prefix: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub issues: Vec<IssueBlob>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueBlob {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub legal: Option<String>,
    #[serde(default)]
    pub ott_idspace: Option<String>,
    #[serde(default)]
    pub original_suffix: Option<String>,
    #[serde(default)]
    pub derived_suffix: Option<String>,
    #[serde(default, rename = "===")]
    pub commentary: Option<String>,
    #[serde(default)]
    pub derived_from: Option<String>,
    #[serde(default)]
    pub original: Option<CaptureBlob>,
    #[serde(default)]
    pub derived: Option<CaptureBlob>,
    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureBlob {
    /// Ignored: a capture is always named after its issue.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub legal: Option<String>,
    #[serde(default)]
    pub ott_idspace: Option<String>,
    /// Accepted for symmetry with the other levels; suffixes are resolved
    /// from the issue and resource only.
    #[serde(default)]
    pub original_suffix: Option<String>,
    #[serde(default)]
    pub derived_suffix: Option<String>,
    #[serde(default, rename = "===")]
    pub commentary: Option<String>,
    #[serde(default)]
    pub locations: Option<Vec<String>>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub references: Option<BTreeMap<String, String>>,

    // ── Date candidates, in priority order ──
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub generated_on: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,

    #[serde(flatten)]
    pub rest: BTreeMap<String, Value>,
}

impl CaptureBlob {
    /// A sub-blob is only a capture candidate if it names at least one
    /// location or says how many bytes there are. Same rule as
    /// [`recap_registry::Capture::is_retrievable`].
    pub fn is_retrievable(&self) -> bool {
        self.locations
            .as_ref()
            .is_some_and(|locations| !locations.is_empty())
            || self.bytes.is_some()
    }

    /// `(key, value)` for every date candidate present, in priority order.
    pub fn date_candidates(&self) -> Vec<(&'static str, &str)> {
        [
            ("date", &self.date),
            ("generated_on", &self.generated_on),
            ("last_modified", &self.last_modified),
            ("publication_date", &self.publication_date),
            ("start_date", &self.start_date),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key, value)))
        .collect()
    }
}

/// Errors loading a seed document.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_collect_in_rest() {
        let document = SeedDocument::from_json(
            r#"{
                "resources": [{
                    "name": "gbif",
                    "colour": "green",
                    "retrieved_from": "http://www.gbif.org/",
                    "issues": [{
                        "name": "gbif-2019",
                        "original": {"bytes": 10, "commit": "abc", "generated_on": "2019-08-01"}
                    }]
                }]
            }"#,
        )
        .expect("seed should parse");

        let resource = &document.resources[0];
        assert!(resource.rest.contains_key("colour"));
        assert!(resource.rest.contains_key("retrieved_from"));

        let original = resource.issues[0]
            .original
            .as_ref()
            .expect("original should parse");
        assert!(original.rest.contains_key("commit"));
        assert_eq!(original.date_candidates(), vec![("generated_on", "2019-08-01")]);
    }

    #[test]
    fn empty_locations_do_not_make_a_candidate() {
        let blob =
            |raw: &str| -> CaptureBlob { serde_json::from_str(raw).expect("blob should parse") };
        assert!(!blob(r#"{"locations": []}"#).is_retrievable());
        assert!(blob(r#"{"locations": ["ftp://x"]}"#).is_retrievable());
        assert!(blob(r#"{"locations": [], "bytes": 0}"#).is_retrievable());
        assert!(!blob(r#"{"date": "2014"}"#).is_retrievable());
    }

    #[test]
    fn from_json_reports_malformed_documents() {
        let err = SeedDocument::from_json("{\"resources\": 3}").expect_err("must fail");
        assert!(matches!(err, SeedError::Parse(_)));
    }
}
