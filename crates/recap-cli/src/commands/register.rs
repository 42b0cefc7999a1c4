use crate::support::{load_corpus_or_exit, open_registry_or_exit, print_findings_summary};
use recap_registry::{Registry, ReplayReport, commands_for, replay_commands};
use serde_json::json;
use std::path::PathBuf;

pub struct Args {
    pub seed: PathBuf,
    pub registry_dir: PathBuf,
    pub wipe: bool,
    pub json: bool,
}

pub fn run(args: Args) {
    let corpus = load_corpus_or_exit(&args.seed);
    let corpus_report = corpus.report();
    let mut registry = open_registry_or_exit(&args.registry_dir);

    if args.wipe {
        registry.wipe().unwrap_or_else(|e| {
            eprintln!("error: failed to wipe {}: {e}", args.registry_dir.display());
            std::process::exit(1);
        });
    }

    let before = snapshot_or_exit(&registry);
    let commands = commands_for(corpus.records);
    let report = replay_commands(&mut registry, &commands).unwrap_or_else(|e| {
        eprintln!("error: registration failed: {e}");
        std::process::exit(1);
    });
    let after = snapshot_or_exit(&registry);

    if args.json {
        let payload = json!({
            "seed": args.seed.display().to_string(),
            "registryDir": registry.dir().display().to_string(),
            "wiped": args.wipe,
            "corpus": corpus_report,
            "registration": report,
            "snapshotBefore": before,
            "snapshotAfter": after,
            "changed": before != after,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|e| {
                eprintln!("error: failed to render report: {e}");
                std::process::exit(1);
            })
        );
        return;
    }

    print_findings_summary(&corpus_report);
    println!("recap register {}", args.seed.display());
    println!();
    println!("  registry: {}", registry.dir().display());
    print_replay_report(&report);
    println!("  snapshot before: {before}");
    println!("  snapshot after: {after}");
}

pub fn snapshot_or_exit(registry: &Registry) -> String {
    registry
        .snapshot_ref()
        .map(|snapshot| snapshot.to_string())
        .unwrap_or_else(|e| {
            eprintln!("error: failed to digest registry: {e}");
            std::process::exit(1);
        })
}

pub fn print_replay_report(report: &ReplayReport) {
    println!("  inserted: {}", report.inserted);
    println!("  confirmed: {}", report.confirmed);
    println!("  rejected: {}", report.rejections.len());
    for rejection in &report.rejections {
        println!(
            "  - {} {} {} ({})",
            rejection.kind, rejection.name, rejection.class, rejection.message
        );
    }
}
