//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::Parser;

/// Mailvault - back up every mailbox in a directory group
#[derive(Parser, Debug)]
#[command(name = "mailvault")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors to the terminal
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to a config.yaml overriding the default one
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Show what would be backed up without running the backup tool
    #[arg(long)]
    pub dry_run: bool,

    /// Back up a single account instead of a group
    #[arg(long, value_name = "IDENTIFIER", conflicts_with = "ou")]
    pub user: Option<String>,

    /// Group path to back up, prompted for when omitted (e.g. /FormerEmployees)
    #[arg(long, value_name = "GROUP_PATH")]
    pub ou: Option<String>,

    /// Skip the yes/no question for a single account
    #[arg(short, long, requires = "user")]
    pub yes: bool,
}

/// What to back up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Group(String),
    Single(String),
    /// Neither flag given, ask the operator
    Prompt,
}

impl Cli {
    pub fn target(&self) -> Target {
        match (&self.user, &self.ou) {
            (Some(user), _) => Target::Single(user.trim().to_string()),
            (None, Some(ou)) => Target::Group(ou.trim().to_string()),
            (None, None) => Target::Prompt,
        }
    }
}
