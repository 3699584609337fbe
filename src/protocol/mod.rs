//! Protocol module - wire format, line framing, and command types.
//!
//! This module implements the text protocol:
//! - Line codec (command word, action id, fields, completion flag)
//! - Line buffer for accumulating partial reads
//! - Command struct with typed accessors
//! - Response classification

mod command;
mod frame_buffer;
mod response;
mod wire_format;

pub use command::{Command, CommandBuilder};
pub use frame_buffer::{LineBuffer, DEFAULT_MAX_LINE_LENGTH, DEFAULT_READ_BUFFER_SIZE};
pub use response::{FrameClass, ResponseKind};
pub use wire_format::{
    fields, options, parse_flag, validate_separator, validate_word, words, LineCodec,
    DEFAULT_FIELD_SEPARATOR, DEFAULT_TERMINATOR, MAX_COMMAND_WORD_LEN,
    SUPPORTED_FIELD_SEPARATORS,
};
