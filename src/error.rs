//! Error types for epi-client.

use thiserror::Error;

use crate::protocol::Command;

/// Main error type for all EPI operations.
#[derive(Debug, Error)]
pub enum EpiError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration or exporting records.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server could not be reached.
    #[error("Connection refused: {0}")]
    Connection(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol error (malformed frame, out-of-phase metadata, etc.).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A data frame arrived for an action id without a registered channel.
    #[error("Protocol error: response for unknown action id {action_id}, CMD: {command}")]
    UnknownActionId {
        /// Action id carried by the frame.
        action_id: u32,
        /// The offending frame.
        command: Command,
    },

    /// The exchange ended without an end-of-data frame.
    #[error("Server has not sent an end-of-data frame, the query was probably cancelled")]
    MissingTerminal,

    /// The server sent an explicit error frame.
    #[error("Server error: {message}, CMD: {command}")]
    Server {
        /// Message text sent by the server.
        message: String,
        /// The error frame.
        command: Command,
    },

    /// The server refused a request (negative acknowledge or wrong response kind).
    #[error("{context}{}", .response.as_ref().map(|c| format!(", CMD: {c}")).unwrap_or_default())]
    Rejected {
        /// What was attempted.
        context: String,
        /// Last control frame received, if any.
        response: Option<Command>,
    },

    /// Caller bug: the operation is not valid in the current state.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Record lookup by an unknown field name.
    #[error("Field {0} is unknown")]
    UnknownField(String),

    /// A field value could not be converted to the requested type.
    #[error("Value {value:?} of field {field} could not be converted: {message}")]
    Conversion {
        /// Field name.
        field: String,
        /// Raw string value.
        value: String,
        /// Converter error message.
        message: String,
    },

    /// Text could not be converted with the configured encoding.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type alias using EpiError.
pub type Result<T> = std::result::Result<T, EpiError>;
