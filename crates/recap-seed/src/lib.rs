//! # recap-seed
//!
//! Turns the nested seed document into the ordered, checked record stream
//! the registry consumes.
//!
//! ```text
//! seed.json ──normalize──▶ flat records ──assemble──▶ ordered corpus
//! ```
//!
//! Both stages report problems as [`Findings`] instead of failing; only an
//! unreadable or malformed seed document is an error.

pub mod assemble;
pub mod date;
pub mod findings;
pub mod normalize;
pub mod seed;

pub use assemble::{Assembly, assemble};
pub use findings::{CORPUS_CHECK_KIND, Finding, Findings, FindingsReport, FindingsSummary};
pub use normalize::{Normalized, StemSplit, normalize, split_stem};
pub use seed::{CaptureBlob, DEFAULT_SEED_PATH, IssueBlob, ResourceBlob, SeedDocument, SeedError};

use recap_registry::Record;

/// The assembled corpus with the findings of both stages.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub records: Vec<Record>,
    pub findings: Findings,
}

impl Corpus {
    pub fn report(&self) -> FindingsReport {
        self.findings.report(CORPUS_CHECK_KIND, self.records.len())
    }
}

/// Normalize then assemble.
pub fn build_corpus(document: &SeedDocument) -> Corpus {
    let Normalized {
        records,
        mut findings,
    } = normalize(document);
    let assembly = assemble(records);
    findings.extend(assembly.findings);
    Corpus {
        records: assembly.records,
        findings,
    }
}

pub fn load_corpus(path: impl AsRef<std::path::Path>) -> Result<Corpus, SeedError> {
    let document = SeedDocument::from_path(path)?;
    Ok(build_corpus(&document))
}
