//! Mock collaborators

use async_trait::async_trait;
use mailvault_backup::{BackupError, BackupTool, ToolExit};
use mailvault_batch::Prompter;
use mailvault_core::EntityRecord;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One scripted invocation of the backup tool
#[derive(Debug, Clone)]
pub enum FakeRun {
    /// Write `log` to the log, create `files` files, exit with `exit`
    Finish { log: String, files: usize, exit: ToolExit },
    /// Run until cancelled
    Hang,
    /// Receive the terminal's SIGINT alongside the run: cancel, then exit 130
    Sigint,
}

impl FakeRun {
    pub fn success(files: usize) -> Self {
        FakeRun::Finish {
            log: format!("GYB needs to backup {files} messages\n{files} of {files}\n"),
            files,
            exit: ToolExit::success(),
        }
    }

    pub fn ineligible() -> Self {
        FakeRun::Finish {
            log: "ERROR: Mail service not enabled for this user\n".to_string(),
            files: 0,
            exit: ToolExit::failure(1),
        }
    }

    pub fn rate_limited() -> Self {
        FakeRun::Finish {
            log: "HttpError 403: userRateLimitExceeded\n".to_string(),
            files: 0,
            exit: ToolExit::failure(1),
        }
    }

    pub fn crash(code: i32) -> Self {
        FakeRun::Finish {
            log: "Traceback (most recent call last):\nConnectionResetError\n".to_string(),
            files: 0,
            exit: ToolExit::failure(code),
        }
    }
}

/// Backup tool that replays scripted runs per account
///
/// Accounts without a script succeed with one file.
#[derive(Default)]
pub struct FakeBackupTool {
    scripts: Mutex<HashMap<String, VecDeque<FakeRun>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeBackupTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, identifier: &str, runs: Vec<FakeRun>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(identifier.to_string(), runs.into());
        self
    }

    /// Identifiers in invocation order, one entry per attempt
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, identifier: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == identifier).count()
    }
}

#[async_trait]
impl BackupTool for FakeBackupTool {
    fn name(&self) -> &str {
        "fake-gyb"
    }

    async fn run(
        &self,
        entity: &EntityRecord,
        output_dir: &Path,
        log_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ToolExit, BackupError> {
        self.calls.lock().unwrap().push(entity.identifier.clone());
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&entity.identifier)
            .and_then(|runs| runs.pop_front())
            .unwrap_or_else(|| FakeRun::success(1));

        match next {
            FakeRun::Finish { log, files, exit } => {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_path)?;
                file.write_all(log.as_bytes())?;
                for i in 0..files {
                    std::fs::write(output_dir.join(format!("{}.eml", i + 1)), "Subject: hi")?;
                }
                Ok(exit)
            }
            FakeRun::Hang => {
                cancel.cancelled().await;
                Err(BackupError::Interrupted)
            }
            FakeRun::Sigint => {
                std::fs::write(log_path, "Traceback (most recent call last):\nKeyboardInterrupt\n")?;
                cancel.cancel();
                Ok(ToolExit::failure(130))
            }
        }
    }
}

/// Prompter answering from a script and recording what it was shown
pub struct ScriptedPrompter {
    typed: String,
    yes: bool,
    pub shown: RefCell<Vec<String>>,
    pub prompts: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn typing(typed: &str) -> Self {
        Self {
            typed: typed.to_string(),
            yes: false,
            shown: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn answering(yes: bool) -> Self {
        Self {
            yes,
            ..Self::typing("")
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn show_entities(&self, _group_path: &str, entities: &[EntityRecord]) {
        self.shown
            .borrow_mut()
            .extend(entities.iter().map(|e| e.identifier.clone()));
    }

    fn input(&self, prompt: &str) -> io::Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(format!("{}\n", self.typed))
    }

    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.yes)
    }
}
