//! End-to-end tests for the `mailvault` binary
//!
//! Each test points `MAILVAULT_HOME` at a fresh directory and replaces the
//! external tools with small shell scripts.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn mailvault(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mailvault"))
        .args(args)
        .env("MAILVAULT_HOME", home)
        .env_remove("MAILVAULT_DIRECTORY_PROGRAM")
        .env_remove("MAILVAULT_BACKUP_PROGRAM")
        .env_remove("MAILVAULT_INTER_ENTITY_DELAY_SECS")
        .env_remove("MAILVAULT_RETRY_MAX_ATTEMPTS")
        .env_remove("MAILVAULT_RETRY_BACKOFF_SECS")
        .output()
        .unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn read_only_file(dir: &Path) -> String {
    let names = files_in(dir);
    assert_eq!(names.len(), 1, "expected one file in {}: {:?}", dir.display(), names);
    fs::read_to_string(dir.join(&names[0])).unwrap()
}

#[test]
fn test_help_lists_run_flags() {
    let home = TempDir::new().unwrap();
    let output = mailvault(home.path(), &["--help"]);

    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for flag in ["--dry-run", "--user", "--ou"] {
        assert!(help.contains(flag), "missing {flag} in help");
    }
}

#[test]
fn test_invalid_group_path_fails_before_any_work() {
    let home = TempDir::new().unwrap();
    let output = mailvault(home.path(), &["--ou", "Sales; rm -rf /"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!home.path().join("logs").exists());
    assert!(!home.path().join("archives").exists());
}

#[test]
fn test_missing_directory_tool_is_logged() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("config.yaml"),
        "directory:\n  program: mailvault-missing-directory-tool\n",
    )
    .unwrap();

    let output = mailvault(home.path(), &["--ou", "/Sales", "--dry-run"]);

    assert_eq!(output.status.code(), Some(1));
    let log = read_only_file(&home.path().join("logs"));
    assert!(log.contains("ERROR"));
    assert!(log.contains("mailvault-missing-directory-tool"));
    assert!(files_in(&home.path().join("reports")).is_empty());
}

#[cfg(unix)]
#[test]
fn test_dry_run_over_group_writes_report_only() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("config.yaml"),
        r#"directory:
  program: sh
  args:
    - -c
    - "echo primaryEmail,name.fullName; echo a@x.com,Ann; echo b@x.com,Bob"
    - sh
    - "{group}"
pipeline:
  inter-entity-delay-secs: 3600
"#,
    )
    .unwrap();

    let output = mailvault(home.path(), &["--ou", "/Sales", "--dry-run"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("a@x.com"));
    assert!(stdout.contains("b@x.com"));

    let report = read_only_file(&home.path().join("reports"));
    assert!(report.contains("Group:          /Sales"));
    assert!(report.contains("Mode:           dry run"));
    assert!(report.contains("Succeeded:    2"));
    assert!(files_in(&home.path().join("archives")).is_empty());
}

#[cfg(unix)]
#[test]
fn test_single_account_run_creates_archive() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("config.yaml"),
        r#"backup:
  program: sh
  args:
    - -c
    - 'echo "GYB needs to backup 1 messages"; echo "Subject: hi" > "$1/1.eml"'
    - sh
    - "{output_dir}"
    - "{account}"
"#,
    )
    .unwrap();

    let output = mailvault(home.path(), &["--user", "a@x.com", "--yes"]);

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let archives = files_in(&home.path().join("archives"));
    assert_eq!(archives.len(), 1);
    assert!(archives[0].starts_with("a@x.com_"));
    assert!(archives[0].ends_with(".tar.gz"));

    let report = read_only_file(&home.path().join("reports"));
    assert!(report.contains("Succeeded:    1"));
    assert!(report.contains(&archives[0]));

    // a rerun finds the archive and does not call the tool again
    let output = mailvault(home.path(), &["--user", "a@x.com", "--yes"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(files_in(&home.path().join("archives")).len(), 1);
}

#[cfg(unix)]
#[test]
fn test_interrupt_during_discovery_writes_interrupted_report() {
    let home = TempDir::new().unwrap();
    // the directory tool sends SIGINT to mailvault, as a terminal Ctrl-C would
    fs::write(
        home.path().join("config.yaml"),
        r#"directory:
  program: sh
  args:
    - -c
    - "sleep 0.3; kill -INT $PPID; sleep 5"
    - sh
    - "{group}"
"#,
    )
    .unwrap();

    let output = mailvault(home.path(), &["--ou", "/Sales", "--dry-run"]);

    assert_eq!(output.status.code(), Some(130), "{}", String::from_utf8_lossy(&output.stderr));
    let report = read_only_file(&home.path().join("reports"));
    assert!(report.contains("Status:         interrupted"));

    let logs = files_in(&home.path().join("logs"));
    let run_log = fs::read_to_string(home.path().join("logs").join(&logs[0])).unwrap();
    assert!(run_log.contains("Interrupt received"));
}
