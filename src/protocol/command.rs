//! Command struct with typed accessors.
//!
//! A command is one protocol line: a command word, the action id that
//! correlates it with its request, ordered string fields and the completion
//! flag. Commands are immutable once built.
//!
//! # Example
//!
//! ```
//! use epi_client::protocol::{words, Command};
//!
//! let cmd = Command::builder(words::SET_OPTION)
//!     .action_id(3)
//!     .field("FLDSEP")
//!     .field("!")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cmd.word(), "SET");
//! assert_eq!(cmd.field(1), "!");
//! assert_eq!(cmd.field(9), "");
//! ```

use std::fmt;

use super::wire_format::{validate_word, words};
use crate::error::Result;

/// A complete protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    word: String,
    action_id: u32,
    fields: Vec<String>,
    completed: bool,
}

impl Command {
    /// Start building a command with the given word.
    pub fn builder(word: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(word)
    }

    /// The session termination command (`END`).
    pub fn end() -> Self {
        Self::from_parts(words::END.to_string(), 0, Vec::new(), true)
    }

    /// Assemble a command from already validated parts.
    pub(crate) fn from_parts(
        word: String,
        action_id: u32,
        fields: Vec<String>,
        completed: bool,
    ) -> Self {
        Self {
            word,
            action_id,
            fields,
            completed,
        }
    }

    /// Get the command word.
    #[inline]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Get the action id.
    #[inline]
    pub fn action_id(&self) -> u32 {
        self.action_id
    }

    /// Get all field values.
    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Get a field value, or the empty string if the index is out of range.
    #[inline]
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Check if the line ended with a separator.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Check if this is an `END` command (no action id on the wire).
    #[inline]
    pub fn is_end(&self) -> bool {
        self.word == words::END
    }

    /// Check the command word.
    #[inline]
    pub fn is(&self, word: &str) -> bool {
        self.word == word
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.word)?;
        if !self.is_end() {
            write!(f, "|{}", self.action_id)?;
        }
        for field in &self.fields {
            write!(f, "|{field}")?;
        }
        if self.completed {
            f.write_str("|")?;
        }
        f.write_str("}")
    }
}

/// Builder for [`Command`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    word: String,
    action_id: u32,
    fields: Vec<String>,
    completed: bool,
}

impl CommandBuilder {
    /// Create a builder for a completed command without fields.
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            action_id: 0,
            fields: Vec::new(),
            completed: true,
        }
    }

    /// Set the action id.
    pub fn action_id(mut self, action_id: u32) -> Self {
        self.action_id = action_id;
        self
    }

    /// Append one field.
    pub fn field(mut self, value: impl Into<String>) -> Self {
        self.fields.push(value.into());
        self
    }

    /// Append several fields.
    pub fn fields<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(values.into_iter().map(Into::into));
        self
    }

    /// Set the completion flag (default: completed).
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Build the command.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an empty word or one longer than three
    /// characters.
    pub fn build(self) -> Result<Command> {
        validate_word(&self.word)?;
        Ok(Command::from_parts(
            self.word,
            self.action_id,
            self.fields,
            self.completed,
        ))
    }
}
