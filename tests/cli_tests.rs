//! CLI Integration Tests for Dossier
//!
//! Runs the built binary for the commands that need no model server:
//! help, version, init and config.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the dossier binary with arguments
fn run_dossier(args: &[&str], working_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dossier"));
    cmd.args(args).arg("--no-color").env_remove("RUST_LOG");

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    cmd.output().expect("Failed to execute dossier binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_dossier(&["--help"], None);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Dossier"));
    assert!(text.contains("Usage"));
    for command in ["serve", "queries", "report", "init", "config"] {
        assert!(text.contains(command), "help lacks {}", command);
    }
}

#[test]
fn test_version_command() {
    let output = run_dossier(&["--version"], None);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_report_help_lists_options() {
    let output = run_dossier(&["report", "--help"], None);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--outline"));
    assert!(text.contains("--no-web"));
    assert!(text.contains("--reflections"));
}

// =============================================================================
// Init Command Tests
// =============================================================================

#[test]
fn test_init_creates_project_files() {
    let dir = TempDir::new().unwrap();
    let output = run_dossier(&["init", "--port", "4100"], Some(dir.path()));

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join(".env.example").exists());
    assert!(dir.path().join(".gitignore").exists());

    let config = fs::read_to_string(dir.path().join("dossier.toml")).unwrap();
    assert!(config.contains("port = 4100"));
    assert!(config.contains("[research]"));
    assert!(config.contains("[[collections]]"));
}

#[test]
fn test_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dossier.toml"), "# keep me\n").unwrap();

    let output = run_dossier(&["init"], Some(dir.path()));

    assert_eq!(output.status.code(), Some(2));
    let config = fs::read_to_string(dir.path().join("dossier.toml")).unwrap();
    assert_eq!(config, "# keep me\n");
}

#[test]
fn test_init_force_overwrites() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dossier.toml"), "# old\n").unwrap();

    let output = run_dossier(&["init", "--force", "--provider", "openai"], Some(dir.path()));

    assert!(output.status.success());
    let config = fs::read_to_string(dir.path().join("dossier.toml")).unwrap();
    assert!(config.contains("[providers.openai]"));
}

#[test]
fn test_init_into_new_directory() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("nested/project");

    let output = run_dossier(&["init", target.to_str().unwrap()], None);

    assert!(output.status.success());
    assert!(target.join("dossier.toml").exists());
}

// =============================================================================
// Config Command Tests
// =============================================================================

#[test]
fn test_config_validate_generated_file() {
    let dir = TempDir::new().unwrap();
    assert!(run_dossier(&["init"], Some(dir.path())).status.success());

    let output = run_dossier(&["config", "--validate"], Some(dir.path()));

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("reasoning model"));
    assert!(text.contains("Models"));
}

#[test]
fn test_config_full_prints_toml() {
    let dir = TempDir::new().unwrap();
    assert!(run_dossier(&["init"], Some(dir.path())).status.success());

    let output = run_dossier(&["config", "--full"], Some(dir.path()));

    assert!(output.status.success());
    assert!(stdout(&output).contains("[knowledge_base]"));
}

#[test]
fn test_config_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    let output = run_dossier(&["--config", "absent.toml", "config"], Some(dir.path()));

    assert!(!output.status.success());
}

#[test]
fn test_config_rejects_unknown_model_reference() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("dossier.toml"),
        r#"
[providers.local]
type = "ollama"

[models.reasoning]
provider = "local"
model = "qwen3:8b"

[research]
reasoning_model = "reasoning"
writer_model = "missing-writer"
"#,
    )
    .unwrap();

    let output = run_dossier(&["config", "--validate"], Some(dir.path()));

    assert!(!output.status.success());
}
