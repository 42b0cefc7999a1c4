use crate::cli::ListCollection;
use crate::support::open_registry_or_exit;
use recap_registry::Registry;
use serde_json::json;
use std::path::PathBuf;

pub fn run(
    collection: ListCollection,
    capture_of: Option<String>,
    registry_dir: PathBuf,
    json_output: bool,
) {
    let registry = open_registry_or_exit(&registry_dir);

    match collection {
        ListCollection::Resources => {
            let resources = registry.all_resources();
            if json_output {
                println!("{}", render(&json!(resources)));
                return;
            }
            for resource in resources {
                println!(
                    "{}\t{}",
                    resource.date.as_deref().unwrap_or("-"),
                    resource.name
                );
            }
        }
        ListCollection::Captures => {
            let captures = registry.all_captures(capture_of.as_deref());
            if json_output {
                println!("{}", render(&json!(captures)));
                return;
            }
            for capture in captures {
                println!(
                    "{}\t{}\t{}\t{}",
                    capture.date.as_deref().unwrap_or("-"),
                    capture.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                    capture.name,
                    Registry::capture_path(capture).display()
                );
            }
        }
    }
}

fn render(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render listing: {e}");
        std::process::exit(1);
    })
}
