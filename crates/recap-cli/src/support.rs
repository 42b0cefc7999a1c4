use recap_registry::{DEFAULT_REGISTRY_DIR, Registry};
use recap_seed::{Corpus, DEFAULT_SEED_PATH, FindingsReport, load_corpus};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "recap.toml";

/// Optional `recap.toml` settings; command-line flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub registry_dir: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
}

impl Config {
    pub fn parse(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn registry_dir(&self, flag: Option<String>) -> PathBuf {
        PathBuf::from(
            flag.or_else(|| self.registry_dir.clone())
                .unwrap_or_else(|| DEFAULT_REGISTRY_DIR.to_string()),
        )
    }

    pub fn seed_path(&self, flag: Option<String>) -> PathBuf {
        PathBuf::from(
            flag.or_else(|| self.seed.clone())
                .unwrap_or_else(|| DEFAULT_SEED_PATH.to_string()),
        )
    }
}

/// A missing default config is an empty one; a missing explicit one is an error.
pub fn load_config_or_exit(path: &str) -> Config {
    let config_path = Path::new(path);
    if !config_path.exists() && path == DEFAULT_CONFIG_PATH {
        return Config::default();
    }
    let text = fs::read_to_string(config_path).unwrap_or_else(|e| {
        eprintln!("error: failed to read config {path}: {e}");
        std::process::exit(1);
    });
    Config::parse(&text).unwrap_or_else(|e| {
        eprintln!("error: invalid config {path}: {e}");
        std::process::exit(1);
    })
}

pub fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging unavailable: {e}");
    }
}

pub fn load_corpus_or_exit(path: &Path) -> Corpus {
    load_corpus(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load seed {}: {e}", path.display());
        std::process::exit(1);
    })
}

pub fn open_registry_or_exit(dir: &Path) -> Registry {
    Registry::open(dir).unwrap_or_else(|e| {
        eprintln!("error: failed to open registry {}: {e}", dir.display());
        std::process::exit(1);
    })
}

/// One summary line; individual findings were already logged as they arose.
pub fn print_findings_summary(report: &FindingsReport) {
    eprintln!(
        "[corpus] {} (records={}, errors={}, warnings={})",
        if report.accepted() { "OK" } else { "FAIL" },
        report.summary.record_count,
        report.summary.error_count,
        report.summary.warning_count
    );
    if !report.failure_classes.is_empty() {
        eprintln!("  failure classes: {}", report.failure_classes.join(", "));
    }
}
