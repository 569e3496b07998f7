//! Confirmation prompts
//!
//! The viewer asks yes/no/cancel questions ("save before switching?",
//! "delete contents?") through `ConfirmationPolicy` and never renders a
//! dialog itself.

use super::error::{Result, UiError};
use std::fmt;
use std::io;

/// Answer to a confirmation question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// The user backed out of the whole operation
    Cancel,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Cancel => "cancel",
        };
        f.write_str(label)
    }
}

/// Source of answers to confirmation questions
///
/// # Examples
///
/// ```
/// use treeviewer::ui::{AlwaysConfirm, Answer, ConfirmationPolicy};
///
/// let policy = AlwaysConfirm::new(Answer::Yes);
/// assert_eq!(policy.confirm("Delete 2 objects?").unwrap(), Answer::Yes);
/// ```
pub trait ConfirmationPolicy: Send + Sync {
    /// Ask `question`
    ///
    /// # Errors
    ///
    /// Returns an error if no answer could be obtained.
    fn confirm(&self, question: &str) -> Result<Answer>;
}

/// Interactive terminal prompt using dialoguer
///
/// Escape or `q` answers `Cancel`.
pub struct DialoguerConfirm {
    theme: dialoguer::theme::ColorfulTheme,
}

impl DialoguerConfirm {
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: dialoguer::theme::ColorfulTheme::default(),
        }
    }
}

impl Default for DialoguerConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationPolicy for DialoguerConfirm {
    fn confirm(&self, question: &str) -> Result<Answer> {
        use dialoguer::Confirm;

        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(false)
            .interact_opt()
            .map_err(|e| UiError::IoError(io::Error::other(e)))?;

        Ok(match answer {
            Some(true) => Answer::Yes,
            Some(false) => Answer::No,
            None => Answer::Cancel,
        })
    }
}

/// Gives the same answer to every question (`--yes` in the shell)
#[derive(Debug, Clone, Copy)]
pub struct AlwaysConfirm(Answer);

impl AlwaysConfirm {
    #[must_use]
    pub const fn new(answer: Answer) -> Self {
        Self(answer)
    }
}

impl ConfirmationPolicy for AlwaysConfirm {
    fn confirm(&self, _question: &str) -> Result<Answer> {
        Ok(self.0)
    }
}
