//! Word record model.
//!
//! # Responsibility
//! - Define the record persisted in `word_table`.
//! - Own the text validation rule shared by store and repository.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused, even after delete-all.
//! - `text` is never empty or whitespace-only.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned identifier of a word.
///
/// Backed by SQLite `AUTOINCREMENT`, so values only ever grow.
pub type WordId = i64;

/// Validation error for word input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordValidationError {
    /// Text is empty or contains only whitespace.
    EmptyText,
}

impl Display for WordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "word text must not be empty"),
        }
    }
}

impl Error for WordValidationError {}

/// One persisted word entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    /// Serialized as `word` to match the persisted column name.
    #[serde(rename = "word")]
    pub text: String,
}

impl Word {
    /// Builds a word after checking the text rule.
    pub fn new(id: WordId, text: impl Into<String>) -> Result<Self, WordValidationError> {
        let word = Self {
            id,
            text: text.into(),
        };
        word.validate()?;
        Ok(word)
    }

    /// Checks the record invariants.
    pub fn validate(&self) -> Result<(), WordValidationError> {
        validate_word_text(&self.text)
    }
}

/// Rejects text that would not be a usable list entry.
///
/// Text is stored exactly as given; trimming is only used for the check.
pub fn validate_word_text(text: &str) -> Result<(), WordValidationError> {
    if text.trim().is_empty() {
        return Err(WordValidationError::EmptyText);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_word_text, Word, WordValidationError};

    #[test]
    fn whitespace_only_text_is_rejected() {
        assert_eq!(
            validate_word_text(" \t\n"),
            Err(WordValidationError::EmptyText)
        );
    }

    #[test]
    fn text_is_kept_verbatim() {
        let word = Word::new(7, "  padded ").unwrap();
        assert_eq!(word.text, "  padded ");
    }
}
