//! Runner and packager driving a real child process

#![cfg(unix)]

use std::sync::Arc;

use mailvault_backup::{
    read_manifest, ArchiveIndex, ArchivePackager, BackupError, BackupJobRunner, CommandBackupTool,
    JobOutcome,
};
use mailvault_core::types::RetryPolicy;
use mailvault_core::{EntityRecord, MailvaultConfig, RunLayout, RunTimestamp};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const FAKE_BACKUP: &str = r#"
account="$1"; out="$2"
echo "GYB needs to backup 2 messages"
mkdir -p "$out/2024"
printf 'Subject: one' > "$out/2024/1.eml"
printf '1 of 2\r'
printf 'Subject: two' > "$out/2024/2.eml"
printf '2 of 2\n'
echo "done $account"
"#;

fn setup(script: &str) -> (TempDir, RunLayout, BackupJobRunner) {
    let base = TempDir::new().unwrap();
    let layout = RunLayout::new(base.path(), RunTimestamp::parse("20250301T120000").unwrap());
    layout.ensure_dirs().unwrap();

    let mut config = MailvaultConfig::default();
    config.monitor.poll_interval_ms = 10;
    config.monitor.appear_timeout_ms = 500;

    let tool = CommandBackupTool::new(
        "sh",
        vec![
            "-c".to_string(),
            script.to_string(),
            "fake-backup".to_string(),
            "{account}".to_string(),
            "{output_dir}".to_string(),
        ],
    );
    let runner = BackupJobRunner::new(Arc::new(tool), layout.clone(), &config)
        .unwrap()
        .with_retry_policy(RetryPolicy::fixed(2, 5));

    (base, layout, runner)
}

#[tokio::test]
async fn test_backup_and_package() {
    let (_base, layout, runner) = setup(FAKE_BACKUP);
    let entity = EntityRecord::new("b@x.com", "Bee");

    let outcome = runner.run(&entity, &CancellationToken::new()).await.unwrap();
    assert_eq!(outcome, JobOutcome::Succeeded { file_count: 2, attempts: 1 });

    let log = std::fs::read_to_string(layout.entity_log_path("b@x.com")).unwrap();
    assert!(log.contains("done b@x.com"));

    let work_dir = runner.work_dir(&entity);
    let record = ArchivePackager::new(layout.clone(), runner.tool_name())
        .package(&entity, &work_dir)
        .unwrap();

    assert!(!work_dir.exists());
    assert_eq!(record.file_count, 2);
    assert_eq!(read_manifest(&record.path).unwrap().tool, "sh");

    let index = ArchiveIndex::new(layout.archive_dir());
    assert_eq!(index.find_existing("b@x.com"), Some(record.path.clone()));
    assert_eq!(index.created_in_run(layout.run_timestamp()).len(), 1);
}

#[tokio::test]
async fn test_rate_limited_tool_exhausts() {
    let (_base, _layout, runner) = setup("echo 'HttpError 429 Too Many Requests'; exit 1");

    let err = runner
        .run(&EntityRecord::new("r@x.com", ""), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BackupError::RateLimitExhausted { attempts: 2, .. }));
}

#[tokio::test]
async fn test_interrupt_kills_running_tool() {
    let (_base, _layout, runner) = setup("echo started; sleep 30");
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = runner
        .run(&EntityRecord::new("s@x.com", ""), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, BackupError::Interrupted));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}
