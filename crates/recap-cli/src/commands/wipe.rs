use crate::support::open_registry_or_exit;
use std::path::PathBuf;

pub fn run(registry_dir: PathBuf) {
    let mut registry = open_registry_or_exit(&registry_dir);
    registry.wipe().unwrap_or_else(|e| {
        eprintln!("error: failed to wipe {}: {e}", registry_dir.display());
        std::process::exit(1);
    });
    println!("recap wipe {}", registry_dir.display());
}
