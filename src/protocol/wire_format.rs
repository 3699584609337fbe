//! Wire format encoding and decoding.
//!
//! Every EPI frame is one text line:
//! ```text
//! WORD | ACTIONID | FIELD | FIELD | ... [|] \n
//! ```
//!
//! The separator (`|` by default) is negotiable, the terminator is a single
//! byte (newline by default). A trailing separator marks the line as
//! completed; without it, the next frame continues the same logical line.
//! `END` frames carry no action id.

use super::Command;
use crate::error::{EpiError, Result};

/// Default field separator.
pub const DEFAULT_FIELD_SEPARATOR: char = '|';

/// Separators the server accepts for the `FLDSEP` option.
pub const SUPPORTED_FIELD_SEPARATORS: [char; 6] = ['|', '!', '$', '#', ':', ';'];

/// Default frame terminator (line feed).
pub const DEFAULT_TERMINATOR: u8 = b'\n';

/// Maximum length of a command word.
pub const MAX_COMMAND_WORD_LEN: usize = 3;

/// Command words of the protocol.
pub mod words {
    // Session
    /// Switch the mandant.
    pub const CHANGE_MANDANT: &str = "CHM";
    /// Log on.
    pub const LOGON: &str = "LGN";
    /// End the session (request and response).
    pub const END: &str = "END";
    /// Set a session option.
    pub const SET_OPTION: &str = "SET";
    /// Show a session option.
    pub const SHOW_OPTIONS: &str = "SHO";

    // Selecting
    /// Execute a query.
    pub const EXECUTE_QUERY: &str = "EXQ";
    /// Fetch the next page of a query.
    pub const GET_NEXT_RECORD: &str = "GNR";
    /// Cancel a running query.
    pub const BREAK_QUERY_EXECUTION: &str = "BRQ";

    // Responses
    /// Acknowledge.
    pub const ACKNOWLEDGE: &str = "ACK";
    /// Negative acknowledge.
    pub const NEGATIVE_ACKNOWLEDGE: &str = "NAK";
    /// Begin of data.
    pub const BEGIN_OF_DATA: &str = "BOD";
    /// End of data.
    pub const END_OF_DATA: &str = "EOD";
    /// Data row.
    pub const DATA: &str = "D";
    /// Continuation of the previous data row.
    pub const DATA_CONTINUATION: &str = "DC";
    /// Field metadata.
    pub const META_DATA: &str = "DM";
    /// Error message.
    pub const ERROR: &str = "E";
    /// Status message.
    pub const STATUS_MESSAGE: &str = "S";
    /// Progress message.
    pub const PROGRESS_MESSAGE: &str = "P";
    /// Change notification.
    pub const CHANGE_NOTIFICATION: &str = "CN";
    /// Dialog info.
    pub const DIALOG_INFO: &str = "DLG";
}

/// Field positions inside response frames.
pub mod fields {
    /// `E` frame: message text.
    pub const ERROR_MESSAGE_TEXT: usize = 0;
    /// `S` frame: message text.
    pub const STATUS_MESSAGE_TEXT: usize = 0;
    /// `BOD` frame: estimated number of records.
    pub const BOD_NUM_RECORDS_TOTAL: usize = 0;
    /// `DM` frame: metadata kind.
    pub const DM_META_DATA_TYPE: usize = 0;
    /// `EOD` frame: success flag.
    pub const EOD_OK_FLAG: usize = 0;
    /// `EOD` frame: number of records sent.
    pub const EOD_NUM_RECORDS: usize = 1;
    /// `EOD` frame: end-of-fetch flag.
    pub const EOD_EOF_FLAG: usize = 2;
    /// `END` frame: message text.
    pub const END_MESSAGE_TEXT: usize = 0;
    /// `END` frame: exit status.
    pub const END_EXIT_STATUS: usize = 1;
}

/// Option names negotiated by the session.
pub mod options {
    /// Text encoding of the connection.
    pub const CHARSET: &str = "CHARSET";
    /// Field separator character.
    pub const FIELD_SEPARATOR: &str = "FLDSEP";
}

/// Check that a character may be used as field separator.
pub fn validate_separator(separator: char) -> Result<()> {
    if SUPPORTED_FIELD_SEPARATORS.contains(&separator) {
        Ok(())
    } else {
        Err(EpiError::Usage(format!(
            "the character {separator:?} is not supported as field separator"
        )))
    }
}

/// Check a command word against the protocol limits.
pub fn validate_word(word: &str) -> Result<()> {
    if word.is_empty() {
        return Err(EpiError::Usage("epi command word is empty".to_string()));
    }
    if word.chars().count() > MAX_COMMAND_WORD_LEN {
        return Err(EpiError::Usage(format!(
            "epi command word {word:?} is longer than {MAX_COMMAND_WORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Parse a protocol flag (`""`/`0` false, `1` true).
pub fn parse_flag(value: &str) -> Result<bool> {
    match value.trim() {
        "" | "0" => Ok(false),
        "1" => Ok(true),
        other => Err(EpiError::Protocol(format!(
            "value {other:?} couldn't be parsed to a boolean"
        ))),
    }
}

/// Line codec bound to one field separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCodec {
    separator: char,
}

impl LineCodec {
    /// Create a codec for the given separator.
    pub fn new(separator: char) -> Result<Self> {
        validate_separator(separator)?;
        Ok(Self { separator })
    }

    /// The field separator.
    #[inline]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Encode a command to a line (without terminator).
    ///
    /// # Example
    ///
    /// ```
    /// use epi_client::protocol::{Command, LineCodec};
    ///
    /// let codec = LineCodec::default();
    /// let cmd = Command::builder("CHM").action_id(1).field("erp").build().unwrap();
    /// assert_eq!(codec.encode(&cmd), "CHM|1|erp|");
    /// ```
    pub fn encode(&self, cmd: &Command) -> String {
        let sep = self.separator;
        let mut line = String::with_capacity(
            cmd.word().len() + 12 + cmd.fields().iter().map(|f| f.len() + 1).sum::<usize>(),
        );
        line.push_str(cmd.word());

        if !cmd.is_end() {
            line.push(sep);
            line.push_str(&cmd.action_id().to_string());
        }

        for field in cmd.fields() {
            line.push(sep);
            line.push_str(field);
        }

        if cmd.is_completed() {
            line.push(sep);
        }

        line
    }

    /// Decode a line (without terminator) to a command.
    ///
    /// # Errors
    ///
    /// Returns a protocol error for an empty or overlong command word and for
    /// a missing or non-numeric action id.
    pub fn decode(&self, line: &str) -> Result<Command> {
        let sep = self.separator;
        let completed = line.ends_with(sep);
        let body = if completed {
            &line[..line.len() - sep.len_utf8()]
        } else {
            line
        };

        let mut tokens = body.split(sep);
        let word = tokens.next().unwrap_or_default();

        if word.is_empty() {
            return Err(EpiError::Protocol(format!(
                "response {line:?} has no command word"
            )));
        }
        if word.chars().count() > MAX_COMMAND_WORD_LEN {
            return Err(EpiError::Protocol(format!(
                "command word {word:?} of response {line:?} is too long"
            )));
        }

        // END carries message and exit code, no action id
        if word == words::END {
            let fields = tokens.take(2).map(str::to_string).collect();
            return Ok(Command::from_parts(word.to_string(), 0, fields, true));
        }

        let action_id = match tokens.next() {
            Some(token) => token.parse::<u32>().map_err(|_| {
                EpiError::Protocol(format!(
                    "action id ({token}) is invalid from response {line:?}"
                ))
            })?,
            None => {
                return Err(EpiError::Protocol(format!(
                    "response {line:?} has no action id"
                )))
            }
        };

        let fields = tokens.map(str::to_string).collect();
        Ok(Command::from_parts(
            word.to_string(),
            action_id,
            fields,
            completed,
        ))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_FIELD_SEPARATOR,
        }
    }
}
