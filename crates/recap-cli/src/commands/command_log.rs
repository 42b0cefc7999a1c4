use crate::support::{load_corpus_or_exit, print_findings_summary};
use recap_registry::{commands_for, write_commands_to_path};
use std::path::PathBuf;

pub fn run(seed: PathBuf, out: String) {
    let corpus = load_corpus_or_exit(&seed);
    let report = corpus.report();
    let commands = commands_for(corpus.records);

    write_commands_to_path(&out, &commands).unwrap_or_else(|e| {
        eprintln!("error: failed to write command log {out}: {e}");
        std::process::exit(1);
    });

    println!("recap commands {}", seed.display());
    println!("  out: {out}");
    println!("  commands: {}", commands.len());
    print_findings_summary(&report);
}
