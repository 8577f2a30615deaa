//! User confirmation handling.

use dialoguer::Confirm;

use crate::error::{Error, Result};

/// Asks the user yes/no questions.
pub trait Prompter {
    /// Returns `true` without asking when `skip` is set.
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool>;
}

/// Terminal prompter backed by dialoguer.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for DialoguerPrompter {
    fn confirm(&self, skip: bool, prompt: String) -> Result<bool> {
        if skip {
            return Ok(true);
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(|e| Error::ConfigError(format!("prompt failed: {}", e)))
    }
}

/// Prompter that always gives the same answer, for non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter(pub bool);

impl Prompter for FixedPrompter {
    fn confirm(&self, skip: bool, _prompt: String) -> Result<bool> {
        Ok(skip || self.0)
    }
}
