use crate::support::{load_corpus_or_exit, print_findings_summary};
use serde_json::json;
use std::path::PathBuf;

pub fn run(seed: PathBuf, json_output: bool) {
    let corpus = load_corpus_or_exit(&seed);
    let report = corpus.report();

    let payload = if json_output {
        json!({
            "seed": seed.display().to_string(),
            "records": corpus.records,
            "report": report,
        })
    } else {
        json!(corpus.records)
    };
    let rendered = serde_json::to_string_pretty(&payload).unwrap_or_else(|e| {
        eprintln!("error: failed to render records: {e}");
        std::process::exit(1);
    });
    println!("{rendered}");

    if !json_output {
        print_findings_summary(&report);
    }
}
