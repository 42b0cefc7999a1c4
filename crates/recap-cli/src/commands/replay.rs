use crate::commands::register::{print_replay_report, snapshot_or_exit};
use crate::support::open_registry_or_exit;
use recap_registry::{read_commands_from_path, replay_commands};
use serde_json::json;
use std::path::PathBuf;

pub fn run(log: String, registry_dir: PathBuf, json_output: bool) {
    let commands = read_commands_from_path(&log).unwrap_or_else(|e| {
        eprintln!("error: failed to read command log {log}: {e}");
        std::process::exit(1);
    });
    let mut registry = open_registry_or_exit(&registry_dir);
    let report = replay_commands(&mut registry, &commands).unwrap_or_else(|e| {
        eprintln!("error: replay of {log} failed: {e}");
        std::process::exit(1);
    });
    let snapshot = snapshot_or_exit(&registry);

    if json_output {
        let payload = json!({
            "log": log,
            "registryDir": registry.dir().display().to_string(),
            "commandCount": commands.len(),
            "registration": report,
            "snapshotAfter": snapshot,
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

    println!("recap replay {log}");
    println!();
    println!("  registry: {}", registry.dir().display());
    println!("  commands: {}", commands.len());
    print_replay_report(&report);
    println!("  snapshot after: {snapshot}");
}
