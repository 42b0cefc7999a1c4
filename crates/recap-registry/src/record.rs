//! Record types: the registration commands consumed by the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the distinguished resource whose captures are synthetic taxonomy
/// builds assembled from other resources' captures.
pub const BUILD_RESOURCE: &str = "ott";

/// Key carrying the record kind on the wire.
pub const RECORD_TAG: &str = "type";

/// Which collection a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Resource,
    Capture,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Resource => "resource",
            RecordKind::Capture => "capture",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Licensing classification of a capture.
///
/// `pd`, `cc0` and `public` permit redistribution. Anything else (`handoff`,
/// `cc-by-v3.0`, `$`, ...) is kept verbatim and marks the capture as
/// non-archivable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Legal {
    PublicDomain,
    Cc0,
    Public,
    Other(String),
}

impl Legal {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pd" => Legal::PublicDomain,
            "cc0" => Legal::Cc0,
            "public" => Legal::Public,
            other => Legal::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Legal::PublicDomain => "pd",
            Legal::Cc0 => "cc0",
            Legal::Public => "public",
            Legal::Other(raw) => raw,
        }
    }

    /// Whether the license allows the capture to be redistributed from the archive.
    pub fn is_archivable(&self) -> bool {
        !matches!(self, Legal::Other(_))
    }
}

impl From<String> for Legal {
    fn from(raw: String) -> Self {
        Legal::parse(&raw)
    }
}

impl From<Legal> for String {
    fn from(legal: Legal) -> Self {
        match legal {
            Legal::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Legal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, versioned data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    // ── Identity ──
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    // ── Descriptive ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_description: Option<String>,
    #[serde(default, alias = "===", skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ott_idspace: Option<String>,

    // ── Naming ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_template: Option<String>,

    // ── Passthrough ──
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Resource {
    /// Wire keys owned by named fields or the record tag; never valid in `extra`.
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        RECORD_TAG,
        "name",
        "date",
        "description",
        "capture_description",
        "commentary",
        "===",
        "doi",
        "ott_idspace",
        "issue_prefix",
        "name_template",
        "filename_template",
        "path_template",
    ];

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: None,
            description: None,
            capture_description: None,
            commentary: None,
            doi: None,
            ott_idspace: None,
            issue_prefix: None,
            name_template: None,
            filename_template: None,
            path_template: None,
            extra: BTreeMap::new(),
        }
    }

    /// Naming templates for prospective captures, when all three are known.
    pub fn naming(&self) -> Option<NamingTemplates> {
        Some(NamingTemplates {
            name: self.name_template.clone()?,
            filename: self.filename_template.clone()?,
            path: self.path_template.clone()?,
        })
    }

    pub fn set_naming(&mut self, naming: NamingTemplates) {
        self.name_template = Some(naming.name);
        self.filename_template = Some(naming.filename);
        self.path_template = Some(naming.path);
    }
}

/// `{cap}`-parameterized naming conventions derived from a resource's most
/// recent issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingTemplates {
    pub name: String,
    pub filename: String,
    pub path: String,
}

impl NamingTemplates {
    pub const PLACEHOLDER: &'static str = "{cap}";

    pub fn derive(resource: &str, prefix: &str, suffix: &str) -> Self {
        let cap = Self::PLACEHOLDER;
        Self {
            name: format!("{prefix}{cap}"),
            filename: format!("{prefix}{cap}{suffix}"),
            path: format!("{resource}/{prefix}{cap}/{prefix}{cap}{suffix}"),
        }
    }

    pub fn render_name(&self, label: &str) -> String {
        self.name.replace(Self::PLACEHOLDER, label)
    }

    pub fn render_filename(&self, label: &str) -> String {
        self.filename.replace(Self::PLACEHOLDER, label)
    }
}

/// One archived, retrievable artifact of a resource at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    // ── Identity ──
    pub name: String,
    pub capture_of: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    // ── Licensing ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal: Option<Legal>,
    #[serde(default)]
    pub archivable: bool,

    // ── Storage ──
    #[serde(default)]
    pub label: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,

    // ── Identity and lineage ──
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, String>,
    /// idspace → capture name, stamped on build captures only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<BTreeMap<String, String>>,

    #[serde(default, alias = "===", skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,

    /// Resource-inherited idspace; only meaningful between normalization
    /// and assembly.
    #[serde(
        default,
        rename = "_ott_idspace",
        skip_serializing_if = "Option::is_none"
    )]
    pub ott_idspace: Option<String>,

    // ── Passthrough ──
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Capture {
    /// Wire keys owned by named fields or the record tag; never valid in `extra`.
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        RECORD_TAG,
        "name",
        "capture_of",
        "id",
        "date",
        "legal",
        "archivable",
        "label",
        "filename",
        "locations",
        "bytes",
        "doi",
        "derived_from",
        "references",
        "sources",
        "commentary",
        "===",
        "_ott_idspace",
    ];

    pub fn new(
        name: impl Into<String>,
        capture_of: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            capture_of: capture_of.into(),
            id: None,
            date: None,
            legal: None,
            archivable: false,
            label: String::new(),
            filename: filename.into(),
            locations: Vec::new(),
            bytes: None,
            doi: None,
            derived_from: None,
            references: BTreeMap::new(),
            sources: None,
            commentary: None,
            ott_idspace: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the legal status and the archivable flag that follows from it.
    pub fn set_legal(&mut self, legal: Option<Legal>) {
        self.archivable = legal.as_ref().is_some_and(Legal::is_archivable);
        self.legal = legal;
    }

    /// Whether the capture can be fetched from somewhere.
    pub fn is_retrievable(&self) -> bool {
        !self.locations.is_empty() || self.bytes.is_some()
    }

    /// Whether this capture is a build of the distinguished taxonomy resource.
    pub fn is_build(&self) -> bool {
        self.capture_of == BUILD_RESOURCE
    }
}

/// A flat registration command: one resource or one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Resource(Resource),
    Capture(Capture),
}

impl Record {
    pub fn name(&self) -> &str {
        match self {
            Record::Resource(resource) => &resource.name,
            Record::Capture(capture) => &capture.name,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Resource(_) => RecordKind::Resource,
            Record::Capture(_) => RecordKind::Capture,
        }
    }

    pub fn date(&self) -> Option<&str> {
        match self {
            Record::Resource(resource) => resource.date.as_deref(),
            Record::Capture(capture) => capture.date.as_deref(),
        }
    }

    pub fn doi(&self) -> Option<&str> {
        match self {
            Record::Resource(resource) => resource.doi.as_deref(),
            Record::Capture(capture) => capture.doi.as_deref(),
        }
    }

    /// Tie-break rank for records sharing a date: resources first, then
    /// ordinary captures, then builds that consume them.
    pub fn lateness(&self) -> u8 {
        match self {
            Record::Resource(_) => 0,
            Record::Capture(capture) if capture.is_build() => 2,
            Record::Capture(_) => 1,
        }
    }

    /// First passthrough key that would collide with a named field when
    /// serialized.
    pub fn shadowed_key(&self) -> Option<&str> {
        let (extra, reserved) = match self {
            Record::Resource(resource) => (&resource.extra, Resource::RESERVED_KEYS),
            Record::Capture(capture) => (&capture.extra, Capture::RESERVED_KEYS),
        };
        extra
            .keys()
            .map(String::as_str)
            .find(|key| reserved.contains(key))
    }

    pub fn as_capture(&self) -> Option<&Capture> {
        match self {
            Record::Capture(capture) => Some(capture),
            Record::Resource(_) => None,
        }
    }

    pub fn as_capture_mut(&mut self) -> Option<&mut Capture> {
        match self {
            Record::Capture(capture) => Some(capture),
            Record::Resource(_) => None,
        }
    }
}

impl From<Resource> for Record {
    fn from(resource: Resource) -> Self {
        Record::Resource(resource)
    }
}

impl From<Capture> for Record {
    fn from(capture: Capture) -> Self {
        Record::Capture(capture)
    }
}
