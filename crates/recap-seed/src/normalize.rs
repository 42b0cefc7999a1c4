//! Seed normalization: resources → issues → one canonical capture each,
//! flattened into resource and capture records.
//!
//! Fields cascade downward (capture, then issue, then resource) and every
//! irregularity becomes a finding. A bad issue is dropped; the batch goes on.

use recap_registry::{Capture, Legal, NamingTemplates, Record, Resource};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::date;
use crate::findings::{
    Findings, WARNING_CLASS_CAPTURE_DATE_MALFORMED, WARNING_CLASS_CAPTURE_DATE_MISSING,
    WARNING_CLASS_ISSUE_BOTH_CAPTURES, WARNING_CLASS_ISSUE_LABEL_EMPTY,
    WARNING_CLASS_ISSUE_NO_CAPTURE, WARNING_CLASS_ISSUE_PREFIX_MISMATCH,
    WARNING_CLASS_ISSUE_UNNAMED, WARNING_CLASS_KEY_RESERVED, WARNING_CLASS_KEY_UNRECOGNIZED,
    WARNING_CLASS_RESOURCE_DATE_MISSING, WARNING_CLASS_RESOURCE_UNNAMED,
};
use crate::seed::{
    CAPTURE_PASSTHROUGH_KEYS, CaptureBlob, ISSUE_PASSTHROUGH_KEYS, IssueBlob,
    RESOURCE_PASSTHROUGH_KEYS, ResourceBlob, SeedDocument,
};

/// Normalizer output: per resource, the resource record then its captures in
/// issue order.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<Record>,
    pub findings: Findings,
}

pub fn normalize(document: &SeedDocument) -> Normalized {
    let mut normalized = Normalized::default();
    for (index, blob) in document.resources.iter().enumerate() {
        let Some(name) = blob.name.as_deref().filter(|name| !name.is_empty()) else {
            normalized.findings.warn(
                WARNING_CLASS_RESOURCE_UNNAMED,
                format!("resources[{index}]"),
                "resource has no name; skipped",
            );
            continue;
        };
        let records = normalize_resource(name, blob, &mut normalized.findings);
        normalized.records.extend(records);
    }
    normalized
}

fn normalize_resource(name: &str, blob: &ResourceBlob, findings: &mut Findings) -> Vec<Record> {
    warn_unrecognized(
        name,
        "resource",
        &blob.rest,
        RESOURCE_PASSTHROUGH_KEYS,
        Resource::RESERVED_KEYS,
        findings,
    );

    let mut resource = Resource::new(name);
    resource.description = blob.description.clone();
    resource.capture_description = blob.capture_description.clone();
    resource.commentary = blob.commentary.clone();
    resource.doi = blob.doi.clone();
    resource.ott_idspace = blob.ott_idspace.clone();
    resource.issue_prefix = blob.issue_prefix.clone();
    resource.extra = carried_extra(&blob.rest, Resource::RESERVED_KEYS);

    let mut captures = Vec::new();
    let mut naming = None;
    for (index, issue) in blob.issues.iter().enumerate() {
        let Some(stem) = issue.name.as_deref().filter(|stem| !stem.is_empty()) else {
            findings.warn(
                WARNING_CLASS_ISSUE_UNNAMED,
                format!("{name}.issues[{index}]"),
                "issue has no name; dropped",
            );
            continue;
        };
        if let Some((capture, templates)) = normalize_issue(stem, issue, blob, name, findings) {
            resource.date = date::earliest(resource.date.take(), capture.date.as_deref());
            naming = Some(templates);
            captures.push(Record::from(capture));
        }
    }

    if resource.date.is_none() {
        findings.warn(
            WARNING_CLASS_RESOURCE_DATE_MISSING,
            name,
            "resource has no dated capture",
        );
    }
    if let Some(naming) = naming {
        resource.set_naming(naming);
    }

    let mut records = Vec::with_capacity(captures.len() + 1);
    records.push(Record::from(resource));
    records.extend(captures);
    records
}

/// Which sub-blob of an issue a capture came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureFlavor {
    Original,
    Derived,
}

impl CaptureFlavor {
    fn key(self) -> &'static str {
        match self {
            CaptureFlavor::Original => "original",
            CaptureFlavor::Derived => "derived",
        }
    }

    fn suffix(self, issue: &IssueBlob, resource: &ResourceBlob) -> String {
        let (issue_override, resource_override, default) = match self {
            CaptureFlavor::Original => (
                &issue.original_suffix,
                &resource.original_suffix,
                ".original",
            ),
            CaptureFlavor::Derived => (&issue.derived_suffix, &resource.derived_suffix, ".derived"),
        };
        issue_override
            .as_deref()
            .or(resource_override.as_deref())
            .unwrap_or(default)
            .to_string()
    }

    fn legal(self, blob: &CaptureBlob, issue: &IssueBlob, resource: &ResourceBlob) -> Option<Legal> {
        match self {
            CaptureFlavor::Original => blob
                .legal
                .as_deref()
                .or(issue.legal.as_deref())
                .or(resource.legal.as_deref())
                .map(Legal::parse),
            CaptureFlavor::Derived => Some(Legal::Cc0),
        }
    }
}

/// Pick the issue's canonical capture blob. Only blobs with a location or
/// `bytes` are candidates; with two candidates the derived one wins.
fn select_capture<'a>(
    stem: &str,
    issue: &'a IssueBlob,
    findings: &mut Findings,
) -> Option<(CaptureFlavor, &'a CaptureBlob)> {
    let mut candidate = |flavor: CaptureFlavor, blob: Option<&'a CaptureBlob>| {
        let blob = blob?;
        let subject = format!("{stem}.{}", flavor.key());
        warn_unrecognized(
            &subject,
            "capture",
            &blob.rest,
            CAPTURE_PASSTHROUGH_KEYS,
            Capture::RESERVED_KEYS,
            findings,
        );
        blob.is_retrievable().then_some((flavor, blob))
    };
    let original = candidate(CaptureFlavor::Original, issue.original.as_ref());
    let derived = candidate(CaptureFlavor::Derived, issue.derived.as_ref());

    match (original, derived) {
        (Some(_), Some(derived)) => {
            findings.warn(
                WARNING_CLASS_ISSUE_BOTH_CAPTURES,
                stem,
                "issue has both original and derived captures; using derived",
            );
            Some(derived)
        }
        (Some(only), None) | (None, Some(only)) => Some(only),
        (None, None) => {
            findings.warn(
                WARNING_CLASS_ISSUE_NO_CAPTURE,
                stem,
                "issue has no capture with locations or bytes; dropped",
            );
            None
        }
    }
}

/// A stem split at its resource prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StemSplit<'a> {
    /// The matched prefix, including one absorbed `-` or `.` separator.
    pub prefix: &'a str,
    /// Label unique within the resource.
    pub label: &'a str,
}

/// Split `stem` after `prefix`, absorbing a directly following `-` or `.`.
/// `None` when the stem does not start with the prefix.
pub fn split_stem<'a>(stem: &'a str, prefix: &str) -> Option<StemSplit<'a>> {
    let rest = stem.strip_prefix(prefix)?;
    let label = rest.strip_prefix(['-', '.']).unwrap_or(rest);
    Some(StemSplit {
        prefix: &stem[..stem.len() - label.len()],
        label,
    })
}

fn normalize_issue(
    stem: &str,
    issue: &IssueBlob,
    resource: &ResourceBlob,
    resource_name: &str,
    findings: &mut Findings,
) -> Option<(Capture, NamingTemplates)> {
    // Issue-level leftovers are not carried into any record.
    warn_unrecognized(stem, "issue", &issue.rest, ISSUE_PASSTHROUGH_KEYS, &[], findings);

    let (flavor, blob) = select_capture(stem, issue, findings)?;

    let prefix = resource.issue_prefix.as_deref().unwrap_or(resource_name);
    let Some(split) = split_stem(stem, prefix) else {
        findings.warn(
            WARNING_CLASS_ISSUE_PREFIX_MISMATCH,
            stem,
            format!("issue name does not start with prefix {prefix:?}; dropped"),
        );
        return None;
    };
    if split.label.is_empty() {
        findings.warn(
            WARNING_CLASS_ISSUE_LABEL_EMPTY,
            stem,
            "issue name leaves no label after the prefix; dropped",
        );
        return None;
    }

    let suffix = flavor.suffix(issue, resource);
    let naming = NamingTemplates::derive(resource_name, split.prefix, &suffix);
    let mut capture = Capture::new(
        naming.render_name(split.label),
        resource_name,
        naming.render_filename(split.label),
    );
    capture.label = split.label.to_string();
    capture.set_legal(flavor.legal(blob, issue, resource));
    capture.locations = blob.locations.clone().unwrap_or_default();
    capture.bytes = blob.bytes;
    capture.doi = blob.doi.clone();
    capture.references = blob.references.clone().unwrap_or_default();
    capture.derived_from = issue.derived_from.clone();
    capture.ott_idspace = blob
        .ott_idspace
        .clone()
        .or_else(|| issue.ott_idspace.clone())
        .or_else(|| resource.ott_idspace.clone());
    capture.commentary = match (&blob.commentary, &issue.commentary) {
        (Some(own), Some(inherited)) => Some(format!("{own} - {inherited}")),
        (own, inherited) => own.clone().or_else(|| inherited.clone()),
    };
    capture.extra = capture_extra(blob);
    capture.date = capture_date(stem, blob, findings);
    Some((capture, naming))
}

fn capture_date(stem: &str, blob: &CaptureBlob, findings: &mut Findings) -> Option<String> {
    let Some(&(key, raw)) = blob.date_candidates().first() else {
        findings.warn(
            WARNING_CLASS_CAPTURE_DATE_MISSING,
            stem,
            "capture has no date, generated_on, last_modified, publication_date or start_date",
        );
        return None;
    };
    if !date::is_well_formed(raw) {
        findings.warn(
            WARNING_CLASS_CAPTURE_DATE_MALFORMED,
            stem,
            format!("{key} {raw:?} is not a calendar date"),
        );
    }
    Some(raw.to_string())
}

/// Leftover keys minus any that would shadow a named record field.
fn carried_extra(rest: &BTreeMap<String, Value>, reserved: &[&str]) -> BTreeMap<String, Value> {
    rest.iter()
        .filter(|(key, _)| !reserved.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Passthrough keys plus the secondary date keys, kept verbatim.
fn capture_extra(blob: &CaptureBlob) -> BTreeMap<String, Value> {
    let mut extra = carried_extra(&blob.rest, Capture::RESERVED_KEYS);
    for (key, raw) in blob.date_candidates() {
        if key != "date" {
            extra.insert(key.to_string(), Value::String(raw.to_string()));
        }
    }
    extra
}

/// Reserved keys are dropped from the record; other unknown keys pass
/// through with a warning.
fn warn_unrecognized(
    subject: &str,
    level: &str,
    rest: &BTreeMap<String, Value>,
    passthrough: &[&str],
    reserved: &[&str],
    findings: &mut Findings,
) {
    for key in rest.keys().map(String::as_str) {
        if reserved.contains(&key) {
            findings.warn(
                WARNING_CLASS_KEY_RESERVED,
                subject,
                format!("{level} key {key:?} names a record field; dropped"),
            );
        } else if !passthrough.contains(&key) {
            findings.warn(
                WARNING_CLASS_KEY_UNRECOGNIZED,
                subject,
                format!("unrecognized {level} key {key:?}"),
            );
        }
    }
}
