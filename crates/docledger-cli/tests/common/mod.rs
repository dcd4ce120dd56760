#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

pub const COLLECTION: &str = "study";

/// Run the CLI with an isolated HOME, without store or operator flags.
pub fn run_cli_bare(args: &[&str], home: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_docledger"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Run the CLI against the store under `home`, as a test operator.
pub fn run_cli(args: &[&str], home: &Path) -> Output {
    let store = store_dir(home);
    let mut argv = vec![
        "--store",
        store.to_str().unwrap(),
        "--name",
        "Test Curator",
        "--method",
        "cli test",
    ];
    argv.extend_from_slice(args);
    run_cli_bare(&argv, home)
}

/// Run the CLI and expect success.
pub fn run_cli_success(args: &[&str], home: &Path) -> String {
    let output = run_cli(args, home);
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
    }
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Run the CLI with `--json` and parse its output.
pub fn run_cli_json(args: &[&str], home: &Path) -> Value {
    let mut argv = args.to_vec();
    argv.push("--json");
    let stdout = run_cli_success(&argv, home);
    serde_json::from_str(&stdout).expect("CLI output is not JSON")
}

pub fn store_dir(home: &Path) -> PathBuf {
    home.join("store")
}

/// Write an input file under `home` and return its path as text.
pub fn write_input(home: &Path, name: &str, content: &str) -> String {
    let path = home.join("input").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

/// Documents of a collection, read straight from the store directory.
pub fn stored_documents(home: &Path, collection: &str) -> Vec<Value> {
    let dir = store_dir(home).join("collections").join(collection);
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
        .iter()
        .map(|f| serde_json::from_str(&fs::read_to_string(f).unwrap()).unwrap())
        .collect()
}

/// Insert `documents` (a JSON array) into COLLECTION.
pub fn seed(home: &Path, documents: &str) {
    let file = write_input(home, "seed.json", documents);
    run_cli_success(&["insert", COLLECTION, &file], home);
}
