use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "recap-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Runs inside `cwd` so a stray `recap.toml` in the build tree is never read.
fn run_recap<I, S>(cwd: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_recap");
    Command::new(bin)
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("recap command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn write_sample_seed(path: &Path) {
    let seed = serde_json::json!({
        "resources": [
            {
                "name": "ott",
                "description": "Open Tree Taxonomy",
                "issues": [
                    {"name": "ott2.9", "derived_from": "ott2.8",
                     "derived": {"bytes": 300, "date": "2015-10-01"}},
                    {"name": "ott2.8",
                     "derived": {"bytes": 200, "date": "2014-06-01"}}
                ]
            },
            {
                "name": "ncbi",
                "legal": "pd",
                "ott_idspace": "ncbi",
                "original_suffix": ".tgz",
                "issues": [
                    {"name": "ncbi-20140101",
                     "original": {"locations": ["ftp://ftp.ncbi.nih.gov/taxdump.tgz"], "date": "2014-01-01"}},
                    {"name": "ncbi-20150101",
                     "original": {"bytes": 50, "date": "2015-01-01"}}
                ]
            }
        ]
    });
    fs::write(
        path,
        serde_json::to_string_pretty(&seed).expect("seed should serialize"),
    )
    .expect("seed should be written");
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn normalize_prints_ordered_records() {
    let tmp = TempDirGuard::new("normalize");
    let seed = tmp.path().join("seed.json");
    write_sample_seed(&seed);

    let output = run_recap(tmp.path(), ["normalize", &path_arg(&seed)]);
    assert_success(&output);

    let records = parse_json_stdout(&output);
    let names: Vec<&str> = records
        .as_array()
        .expect("normalize should print an array")
        .iter()
        .map(|record| record["name"].as_str().expect("record should have a name"))
        .collect();
    assert_eq!(
        names,
        vec!["ncbi", "ncbi-20140101", "ott", "ott2.8", "ncbi-20150101", "ott2.9"]
    );

    let build = &records[5];
    assert_eq!(build["type"], "capture");
    assert_eq!(build["sources"]["ncbi"], "ncbi-20150101");
    assert_eq!(build["legal"], "cc0");
    assert!(build.get("_ott_idspace").is_none());
}

#[test]
fn normalize_json_includes_findings_report() {
    let tmp = TempDirGuard::new("normalize-json");
    let seed = tmp.path().join("seed.json");
    fs::write(
        &seed,
        r#"{"resources": [{"name": "gbif", "issues": [
            {"name": "backbone", "original": {"bytes": 1, "date": "2013"}},
            {"name": "gbif-2016", "original": {"bytes": 1, "date": "2016"}}
        ]}]}"#,
    )
    .expect("seed should be written");

    let output = run_recap(tmp.path(), ["normalize", &path_arg(&seed), "--json"]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["report"]["checkKind"], "recap.seed.corpus.v1");
    assert_eq!(payload["report"]["result"], "accepted");
    assert_eq!(
        payload["report"]["warningClasses"],
        serde_json::json!(["seed.issue.prefix_mismatch"])
    );
    assert_eq!(payload["records"].as_array().map(Vec::len), Some(2));
}

#[test]
fn register_is_idempotent() {
    let tmp = TempDirGuard::new("register");
    let seed = tmp.path().join("seed.json");
    let registry = tmp.path().join("registry");
    write_sample_seed(&seed);

    let args = [
        "register".to_string(),
        path_arg(&seed),
        "--registry".to_string(),
        path_arg(&registry),
        "--json".to_string(),
    ];

    let first = run_recap(tmp.path(), &args);
    assert_success(&first);
    let first = parse_json_stdout(&first);
    assert_eq!(first["registration"]["inserted"], 6);
    assert_eq!(first["changed"], true);
    assert_eq!(first["registryDir"], path_arg(&registry));
    assert!(registry.join("resources.jsonl").exists());
    assert!(registry.join("captures.jsonl").exists());
    assert!(registry.join("unused_ids.json").exists());

    let second = run_recap(tmp.path(), &args);
    assert_success(&second);
    let second = parse_json_stdout(&second);
    assert_eq!(second["registration"]["inserted"], 0);
    assert_eq!(second["registration"]["confirmed"], 6);
    assert_eq!(second["changed"], false);
    assert_eq!(second["snapshotBefore"], first["snapshotAfter"]);

    let listed = run_recap(
        tmp.path(),
        [
            "list",
            "captures",
            "--capture-of",
            "ncbi",
            "--registry",
            &path_arg(&registry),
            "--json",
        ],
    );
    assert_success(&listed);
    let captures = parse_json_stdout(&listed);
    let captures = captures.as_array().expect("list should print an array");
    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0]["name"], "ncbi-20140101");
    assert_eq!(captures[0]["filename"], "ncbi-20140101.tgz");
    assert!(captures.iter().all(|capture| capture["id"].is_u64()));
}

#[test]
fn drifted_seed_is_rejected_without_changing_the_registry() {
    let tmp = TempDirGuard::new("drift");
    let seed = tmp.path().join("seed.json");
    let registry = tmp.path().join("registry");
    write_sample_seed(&seed);

    let register = |seed: &Path| {
        run_recap(
            tmp.path(),
            [
                "register",
                &path_arg(seed),
                "--registry",
                &path_arg(&registry),
                "--json",
            ],
        )
    };
    assert_success(&register(&seed));

    let text = fs::read_to_string(&seed).expect("seed should read");
    fs::write(&seed, text.replace("\"bytes\": 50", "\"bytes\": 51")).expect("seed should write");

    let output = register(&seed);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let rejections = payload["registration"]["rejections"]
        .as_array()
        .expect("rejections should be an array");
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0]["name"], "ncbi-20150101");
    assert_eq!(rejections[0]["class"], "registry.field.changed");
    assert_eq!(payload["changed"], false);
}

#[test]
fn command_log_replay_matches_direct_registration() {
    let tmp = TempDirGuard::new("replay");
    let seed = tmp.path().join("seed.json");
    let log = tmp.path().join("commands.jsonl");
    let direct = tmp.path().join("direct");
    let replayed = tmp.path().join("replayed");
    write_sample_seed(&seed);

    let output = run_recap(
        tmp.path(),
        ["commands", &path_arg(&seed), "--out", &path_arg(&log)],
    );
    assert_success(&output);
    let log_text = fs::read_to_string(&log).expect("command log should exist");
    assert_eq!(log_text.lines().count(), 6);
    assert!(log_text.contains("\"schema\":\"recap.command.v1\""));

    let output = run_recap(
        tmp.path(),
        [
            "register",
            &path_arg(&seed),
            "--registry",
            &path_arg(&direct),
            "--json",
        ],
    );
    assert_success(&output);
    let direct_snapshot = parse_json_stdout(&output)["snapshotAfter"].clone();

    let output = run_recap(
        tmp.path(),
        [
            "replay",
            &path_arg(&log),
            "--registry",
            &path_arg(&replayed),
            "--json",
        ],
    );
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["commandCount"], 6);
    assert_eq!(payload["snapshotAfter"], direct_snapshot);
}

#[test]
fn config_file_supplies_registry_and_seed() {
    let tmp = TempDirGuard::new("config");
    write_sample_seed(&tmp.path().join("catalog.json"));
    fs::write(
        tmp.path().join("recap.toml"),
        "registry_dir = \"store\"\nseed = \"catalog.json\"\n",
    )
    .expect("config should be written");

    assert_success(&run_recap(tmp.path(), ["register"]));
    assert!(tmp.path().join("store").join("resources.jsonl").exists());

    let listed = run_recap(tmp.path(), ["list", "resources"]);
    assert_success(&listed);
    let text = String::from_utf8_lossy(&listed.stdout).into_owned();
    assert_eq!(
        text.lines().collect::<Vec<_>>(),
        vec!["2014-01-01\tncbi", "2014-06-01\tott"]
    );

    let output = run_recap(tmp.path(), ["--config", "missing.toml", "list", "resources"]);
    assert_failure(&output);
}

#[test]
fn wipe_empties_the_registry() {
    let tmp = TempDirGuard::new("wipe");
    let seed = tmp.path().join("seed.json");
    let registry = tmp.path().join("registry");
    write_sample_seed(&seed);

    assert_success(&run_recap(
        tmp.path(),
        ["register", &path_arg(&seed), "--registry", &path_arg(&registry)],
    ));
    assert_success(&run_recap(
        tmp.path(),
        ["wipe", "--registry", &path_arg(&registry)],
    ));

    let listed = run_recap(
        tmp.path(),
        ["list", "captures", "--registry", &path_arg(&registry), "--json"],
    );
    assert_success(&listed);
    assert_eq!(parse_json_stdout(&listed), serde_json::json!([]));
    assert!(!registry.join("resources.jsonl").exists());

    let ids: Vec<u64> = serde_json::from_str(
        &fs::read_to_string(registry.join("unused_ids.json")).expect("id list should exist"),
    )
    .expect("id list should parse");
    assert_eq!(ids.first(), Some(&7));
}

#[test]
fn missing_seed_fails() {
    let tmp = TempDirGuard::new("missing");
    let output = run_recap(tmp.path(), ["normalize", "nowhere.json"]);
    assert_failure(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load seed"));
}
