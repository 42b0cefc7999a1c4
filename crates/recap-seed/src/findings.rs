//! Structured diagnostics for normalization and assembly.
//!
//! Nothing here halts a run: a finding is recorded, logged through
//! `tracing`, and the batch continues.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const CORPUS_CHECK_KIND: &str = "recap.seed.corpus.v1";

// Normalizer warnings.
pub const WARNING_CLASS_KEY_UNRECOGNIZED: &str = "seed.key.unrecognized";
pub const WARNING_CLASS_KEY_RESERVED: &str = "seed.key.reserved";
pub const WARNING_CLASS_RESOURCE_UNNAMED: &str = "seed.resource.unnamed";
pub const WARNING_CLASS_RESOURCE_DATE_MISSING: &str = "seed.resource.date_missing";
pub const WARNING_CLASS_ISSUE_UNNAMED: &str = "seed.issue.unnamed";
pub const WARNING_CLASS_ISSUE_BOTH_CAPTURES: &str = "seed.issue.both_captures";
pub const WARNING_CLASS_ISSUE_NO_CAPTURE: &str = "seed.issue.no_capture";
pub const WARNING_CLASS_ISSUE_PREFIX_MISMATCH: &str = "seed.issue.prefix_mismatch";
pub const WARNING_CLASS_ISSUE_LABEL_EMPTY: &str = "seed.issue.label_empty";
pub const WARNING_CLASS_CAPTURE_DATE_MISSING: &str = "seed.capture.date_missing";
pub const WARNING_CLASS_CAPTURE_DATE_MALFORMED: &str = "seed.capture.date_malformed";

// Assembler errors and warnings.
pub const FAILURE_CLASS_NAME_DUPLICATE: &str = "corpus.name.duplicate";
pub const FAILURE_CLASS_DATE_MISSING: &str = "corpus.date.missing";
pub const FAILURE_CLASS_REFERENCE_FORWARD: &str = "corpus.reference.forward";
pub const FAILURE_CLASS_REFERENCE_DANGLING: &str = "corpus.reference.dangling";
pub const WARNING_CLASS_DOI_MERGED: &str = "corpus.doi.merged";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Resource, issue or capture name the finding is about.
    pub subject: String,
    pub class: String,
    pub message: String,
}

/// Errors and warnings accumulated over one pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Findings {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl Findings {
    pub fn warn(&mut self, class: &str, subject: impl Into<String>, message: impl Into<String>) {
        let finding = Finding {
            subject: subject.into(),
            class: class.to_string(),
            message: message.into(),
        };
        tracing::warn!(class, subject = %finding.subject, "{}", finding.message);
        self.warnings.push(finding);
    }

    pub fn error(&mut self, class: &str, subject: impl Into<String>, message: impl Into<String>) {
        let finding = Finding {
            subject: subject.into(),
            class: class.to_string(),
            message: message.into(),
        };
        tracing::error!(class, subject = %finding.subject, "{}", finding.message);
        self.errors.push(finding);
    }

    pub fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Whether any error or warning carries `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|finding| finding.class == class)
    }

    /// Findings of one class, errors first.
    pub fn of_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .filter(move |finding| finding.class == class)
    }

    pub fn report(&self, check_kind: &str, record_count: usize) -> FindingsReport {
        FindingsReport {
            check_kind: check_kind.to_string(),
            result: if self.errors.is_empty() {
                "accepted".to_string()
            } else {
                "rejected".to_string()
            },
            failure_classes: collect_classes(&self.errors),
            warning_classes: collect_classes(&self.warnings),
            errors: self.errors.clone(),
            warnings: self.warnings.clone(),
            summary: FindingsSummary {
                record_count,
                error_count: self.errors.len(),
                warning_count: self.warnings.len(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FindingsSummary {
    pub record_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FindingsReport {
    pub check_kind: String,
    pub result: String,
    pub failure_classes: Vec<String>,
    pub warning_classes: Vec<String>,
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub summary: FindingsSummary,
}

impl FindingsReport {
    pub fn accepted(&self) -> bool {
        self.result == "accepted"
    }
}

fn collect_classes(findings: &[Finding]) -> Vec<String> {
    findings
        .iter()
        .map(|finding| finding.class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
