//! Interactive prompts backed by dialoguer

use dialoguer::{Confirm, Input};
use mailvault_batch::Prompter;
use mailvault_core::EntityRecord;
use std::io;
use tabled::{settings::Style, Table, Tabled};

use crate::output;

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "#")]
    index: usize,
    account: String,
    name: String,
}

/// Prompter reading from the controlling terminal
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn show_entities(&self, group_path: &str, entities: &[EntityRecord]) {
        output::header(&format!("Accounts in {} ({})", group_path, entities.len()));
        let rows: Vec<AccountRow> = entities
            .iter()
            .enumerate()
            .map(|(i, e)| AccountRow {
                index: i + 1,
                account: e.identifier.clone(),
                name: e.display_name.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }

    fn input(&self, prompt: &str) -> io::Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(io::Error::other)
    }
}

/// Ask for a group path when none was given on the command line
pub fn ask_group_path() -> io::Result<String> {
    let typed: String = Input::new()
        .with_prompt("Group path to back up (e.g. /FormerEmployees)")
        .interact_text()
        .map_err(io::Error::other)?;
    Ok(typed.trim().to_string())
}
