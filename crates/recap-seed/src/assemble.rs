//! Corpus assembly: order the flat record stream and check it as a whole.
//!
//! Passes, in order:
//! 1. index by name, reporting duplicates (first occurrence wins)
//! 2. drop records that cannot be ordered (no date)
//! 3. stable sort by `(date, lateness)`
//! 4. collapse same-kind records sharing a DOI, snapping pointers
//! 5. check `capture_of`, `derived_from`, `references` and `sources` targets
//! 6. stamp build captures with the idspace → capture map seen so far
//! 7. strip the normalizer's idspace cache

use recap_registry::{Record, RecordKind};
use std::collections::{BTreeMap, BTreeSet};

use crate::findings::{
    FAILURE_CLASS_DATE_MISSING, FAILURE_CLASS_NAME_DUPLICATE, FAILURE_CLASS_REFERENCE_DANGLING,
    FAILURE_CLASS_REFERENCE_FORWARD, Findings, WARNING_CLASS_DOI_MERGED,
};

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub records: Vec<Record>,
    pub findings: Findings,
}

pub fn assemble(records: Vec<Record>) -> Assembly {
    let mut findings = Findings::default();

    let records = dedupe_names(records, &mut findings);
    let mut records = drop_undated(records, &mut findings);
    records.sort_by(|a, b| (a.date(), a.lateness()).cmp(&(b.date(), b.lateness())));
    let mut records = merge_by_doi(records, &mut findings);
    check_references(&records, &mut findings);
    stamp_sources(&mut records);

    for capture in records.iter_mut().filter_map(Record::as_capture_mut) {
        capture.ott_idspace = None;
    }

    Assembly { records, findings }
}

fn dedupe_names(records: Vec<Record>, findings: &mut Findings) -> Vec<Record> {
    let mut names = BTreeSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        if !names.insert(record.name().to_string()) {
            findings.error(
                FAILURE_CLASS_NAME_DUPLICATE,
                record.name(),
                format!("duplicate {} name; first occurrence kept", record.kind()),
            );
            continue;
        }
        unique.push(record);
    }
    unique
}

fn drop_undated(records: Vec<Record>, findings: &mut Findings) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| {
            if record.date().is_some() {
                return true;
            }
            findings.error(
                FAILURE_CLASS_DATE_MISSING,
                record.name(),
                format!("{} has no date and cannot be ordered; excluded", record.kind()),
            );
            false
        })
        .collect()
}

/// Later records sharing a kind and DOI with an earlier one are removed.
/// `capture_of` follows resource merges; `derived_from` and `references`
/// follow capture merges.
fn merge_by_doi(records: Vec<Record>, findings: &mut Findings) -> Vec<Record> {
    let mut survivors: BTreeMap<(RecordKind, String), String> = BTreeMap::new();
    let mut merged: BTreeMap<RecordKind, BTreeMap<String, String>> = BTreeMap::new();

    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        let Some(doi) = record.doi().map(str::to_string) else {
            kept.push(record);
            continue;
        };
        let key = (record.kind(), doi.clone());
        match survivors.get(&key) {
            Some(survivor) => {
                findings.warn(
                    WARNING_CLASS_DOI_MERGED,
                    record.name(),
                    format!("shares doi {doi} with {survivor}; merged into it"),
                );
                merged
                    .entry(record.kind())
                    .or_default()
                    .insert(record.name().to_string(), survivor.clone());
            }
            None => {
                survivors.insert(key, record.name().to_string());
                kept.push(record);
            }
        }
    }

    let no_merges = BTreeMap::new();
    let resources = merged.get(&RecordKind::Resource).unwrap_or(&no_merges);
    let captures = merged.get(&RecordKind::Capture).unwrap_or(&no_merges);
    for capture in kept.iter_mut().filter_map(Record::as_capture_mut) {
        snap(&mut capture.capture_of, resources);
        if let Some(derived_from) = capture.derived_from.as_mut() {
            snap(derived_from, captures);
        }
        for target in capture.references.values_mut() {
            snap(target, captures);
        }
    }
    kept
}

fn snap(target: &mut String, merges: &BTreeMap<String, String>) {
    if let Some(survivor) = merges.get(target.as_str()) {
        *target = survivor.clone();
    }
}

/// Every pointer must name a record that sorts no later than its holder.
fn check_references(records: &[Record], findings: &mut Findings) {
    let index: BTreeSet<&str> = records.iter().map(Record::name).collect();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for record in records {
        if let Some(capture) = record.as_capture() {
            let targets = std::iter::once(("capture_of", capture.capture_of.as_str()))
                .chain(capture.derived_from.as_deref().map(|t| ("derived_from", t)))
                .chain(capture.references.values().map(|t| ("references", t.as_str())))
                .chain(
                    capture
                        .sources
                        .iter()
                        .flat_map(|sources| sources.values())
                        .map(|t| ("sources", t.as_str())),
                );
            for (field, target) in targets {
                if seen.contains(target) {
                    continue;
                }
                if index.contains(target) {
                    findings.error(
                        FAILURE_CLASS_REFERENCE_FORWARD,
                        &capture.name,
                        format!("{field} {target} sorts after the capture"),
                    );
                } else {
                    findings.error(
                        FAILURE_CLASS_REFERENCE_DANGLING,
                        &capture.name,
                        format!("{field} {target} names no record"),
                    );
                }
            }
        }
        seen.insert(record.name());
    }
}

/// Give each build capture the latest retrievable capture per idspace that
/// precedes it.
fn stamp_sources(records: &mut [Record]) {
    let mut latest: BTreeMap<String, String> = BTreeMap::new();
    for capture in records.iter_mut().filter_map(Record::as_capture_mut) {
        if capture.is_build() {
            capture.sources = Some(latest.clone());
        }
        if !capture.is_retrievable() {
            continue;
        }
        if let Some(idspace) = &capture.ott_idspace {
            latest.insert(idspace.clone(), capture.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_registry::{BUILD_RESOURCE, Capture, Resource};

    fn resource(name: &str, date: &str) -> Record {
        let mut resource = Resource::new(name);
        resource.date = Some(date.to_string());
        resource.into()
    }

    fn capture(name: &str, of: &str, date: &str, idspace: Option<&str>) -> Capture {
        let mut capture = Capture::new(name, of, format!("{name}.original"));
        capture.date = Some(date.to_string());
        capture.bytes = Some(1);
        capture.ott_idspace = idspace.map(str::to_string);
        capture
    }

    fn names(assembly: &Assembly) -> Vec<&str> {
        assembly.records.iter().map(Record::name).collect()
    }

    fn find<'a>(assembly: &'a Assembly, name: &str) -> &'a Capture {
        assembly
            .records
            .iter()
            .filter_map(Record::as_capture)
            .find(|capture| capture.name == name)
            .expect("capture should survive assembly")
    }

    #[test]
    fn orders_by_date_then_lateness() {
        let assembly = assemble(vec![
            capture("ott1", BUILD_RESOURCE, "2015-06-01", None).into(),
            capture("a-1", "a", "2015-06-01", Some("a")).into(),
            resource(BUILD_RESOURCE, "2015-06-01"),
            resource("a", "2015-06-01"),
        ]);
        assert_eq!(names(&assembly), vec!["ott", "a", "a-1", "ott1"]);
        assert!(assembly.findings.is_empty(), "{:?}", assembly.findings);
    }

    #[test]
    fn duplicate_names_keep_first_occurrence() {
        let mut second = capture("a-1", "a", "2015-02-01", None);
        second.bytes = Some(99);
        let assembly = assemble(vec![
            resource("a", "2015-01-01"),
            capture("a-1", "a", "2015-01-01", None).into(),
            second.into(),
        ]);
        assert!(assembly.findings.has_class(FAILURE_CLASS_NAME_DUPLICATE));
        assert_eq!(find(&assembly, "a-1").bytes, Some(1));
        assert_eq!(assembly.records.len(), 2);
    }

    #[test]
    fn undated_records_are_excluded() {
        let mut undated = capture("a-2", "a", "2015-01-01", None);
        undated.date = None;
        let assembly = assemble(vec![resource("a", "2015-01-01"), undated.into()]);
        assert!(assembly.findings.has_class(FAILURE_CLASS_DATE_MISSING));
        assert_eq!(names(&assembly), vec!["a"]);
    }

    #[test]
    fn doi_merge_keeps_earliest_and_snaps_pointers() {
        let mut first = capture("ott2.8", BUILD_RESOURCE, "2014-06-01", None);
        first.doi = Some("10.5281/zenodo.1".to_string());
        let mut repeat = capture("ott2.8draft", BUILD_RESOURCE, "2014-07-01", None);
        repeat.doi = Some("10.5281/zenodo.1".to_string());
        let mut next = capture("ott2.9", BUILD_RESOURCE, "2015-01-01", None);
        next.derived_from = Some("ott2.8draft".to_string());
        next.references
            .insert("previous".to_string(), "ott2.8draft".to_string());

        let mut gbif = resource("gbif", "2013-01-01");
        if let Record::Resource(resource) = &mut gbif {
            resource.doi = Some("10.15468/39omei".to_string());
        }
        let mut backbone = resource("gbif-backbone", "2013-06-01");
        if let Record::Resource(resource) = &mut backbone {
            resource.doi = Some("10.15468/39omei".to_string());
        }
        // A capture with the resource's DOI is a different kind and survives.
        let mut backbone_capture = capture("gbif-2013", "gbif-backbone", "2013-07-01", None);
        backbone_capture.doi = Some("10.15468/39omei".to_string());

        let assembly = assemble(vec![
            resource(BUILD_RESOURCE, "2014-01-01"),
            gbif,
            backbone,
            backbone_capture.into(),
            first.into(),
            repeat.into(),
            next.into(),
        ]);

        let merged: Vec<_> = assembly
            .findings
            .of_class(WARNING_CLASS_DOI_MERGED)
            .map(|finding| finding.subject.as_str())
            .collect();
        assert_eq!(merged, vec!["gbif-backbone", "ott2.8draft"]);
        assert!(!names(&assembly).contains(&"ott2.8draft"));

        let next = find(&assembly, "ott2.9");
        assert_eq!(next.derived_from.as_deref(), Some("ott2.8"));
        assert_eq!(
            next.references.get("previous").map(String::as_str),
            Some("ott2.8")
        );
        assert_eq!(find(&assembly, "gbif-2013").capture_of, "gbif");
        assert!(assembly.findings.errors.is_empty(), "{:?}", assembly.findings);
    }

    #[test]
    fn forward_and_dangling_references_are_reported() {
        let mut early = capture("a-1", "a", "2015-01-01", None);
        early.derived_from = Some("a-2".to_string());
        let mut orphan = capture("b-1", "b", "2015-03-01", None);
        orphan
            .references
            .insert("x".to_string(), "nowhere".to_string());

        let assembly = assemble(vec![
            resource("a", "2015-01-01"),
            early.into(),
            capture("a-2", "a", "2015-02-01", None).into(),
            orphan.into(),
        ]);

        let forward: Vec<_> = assembly
            .findings
            .of_class(FAILURE_CLASS_REFERENCE_FORWARD)
            .map(|finding| finding.subject.as_str())
            .collect();
        assert_eq!(forward, vec!["a-1"]);

        let dangling: Vec<_> = assembly
            .findings
            .of_class(FAILURE_CLASS_REFERENCE_DANGLING)
            .map(|finding| finding.message.as_str())
            .collect();
        assert_eq!(
            dangling,
            vec!["capture_of b names no record", "references nowhere names no record"]
        );
        // Findings never remove records.
        assert_eq!(assembly.records.len(), 4);
    }

    #[test]
    fn build_captures_see_sources_in_chronological_order() {
        let assembly = assemble(vec![
            resource("a", "2015-01-01"),
            resource("b", "2015-01-01"),
            resource(BUILD_RESOURCE, "2015-01-01"),
            capture("a-1", "a", "2015-01-01", Some("a")).into(),
            capture("ott1", BUILD_RESOURCE, "2015-06-01", None).into(),
            capture("b-1", "b", "2015-07-01", Some("b")).into(),
            capture("a-2", "a", "2016-01-01", Some("a")).into(),
            capture("ott2", BUILD_RESOURCE, "2016-06-01", None).into(),
            capture("a-3", "a", "2017-01-01", Some("a")).into(),
            capture("ott3", BUILD_RESOURCE, "2017-01-01", None).into(),
        ]);

        let sources = |name: &str| find(&assembly, name).sources.clone().unwrap_or_default();
        assert_eq!(
            sources("ott1"),
            BTreeMap::from([("a".to_string(), "a-1".to_string())])
        );
        assert_eq!(
            sources("ott2"),
            BTreeMap::from([
                ("a".to_string(), "a-2".to_string()),
                ("b".to_string(), "b-1".to_string()),
            ])
        );
        insta::assert_json_snapshot!(sources("ott3"), @r#"
        {
          "a": "a-3",
          "b": "b-1"
        }
        "#);

        assert!(find(&assembly, "a-1").sources.is_none());
        assert!(
            assembly
                .records
                .iter()
                .filter_map(Record::as_capture)
                .all(|capture| capture.ott_idspace.is_none())
        );
        assert!(assembly.findings.is_empty(), "{:?}", assembly.findings);
    }

    #[test]
    fn unretrievable_captures_do_not_become_sources() {
        let mut listed = capture("a-1", "a", "2015-01-01", Some("a"));
        listed.bytes = None;
        let assembly = assemble(vec![
            resource("a", "2015-01-01"),
            resource(BUILD_RESOURCE, "2015-01-01"),
            listed.into(),
            capture("ott1", BUILD_RESOURCE, "2015-06-01", None).into(),
        ]);
        assert_eq!(find(&assembly, "ott1").sources, Some(BTreeMap::new()));
    }
}
