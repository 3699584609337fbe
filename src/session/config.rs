//! Session configuration.

use std::fmt;

use serde::Deserialize;

use crate::codec::TextEncoding;
use crate::error::{EpiError, Result};
use crate::protocol::{
    validate_separator, DEFAULT_FIELD_SEPARATOR, DEFAULT_MAX_LINE_LENGTH, DEFAULT_READ_BUFFER_SIZE,
    DEFAULT_TERMINATOR,
};
use crate::transport::TransportSettings;

/// Default server port.
pub const DEFAULT_PORT: u16 = 6550;

/// Protocol version sent at logon.
pub const DEFAULT_PROTOCOL_VERSION: &str = "3.51";

/// Connection and logon settings of a [`Session`](super::Session).
///
/// Every key is optional when loading from JSON:
///
/// ```
/// use epi_client::SessionConfig;
///
/// let config = SessionConfig::from_json(r#"{"host": "erp01", "mandant": "58"}"#).unwrap();
/// assert_eq!(config.host, "erp01");
/// assert_eq!(config.port, 6550);
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Tenant selected at logon.
    pub mandant: String,
    /// Logon password.
    pub password: String,
    /// Character set of the wire.
    pub encoding: TextEncoding,
    /// Field separator of the wire.
    pub field_separator: char,
    /// Line terminator byte.
    pub terminator: u8,
    /// Bytes requested per socket read.
    pub read_buffer_size: usize,
    /// Longest accepted response line.
    pub max_line_length: usize,
    /// Version announced at logon.
    pub protocol_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            mandant: String::new(),
            password: String::new(),
            encoding: TextEncoding::default(),
            field_separator: DEFAULT_FIELD_SEPARATOR,
            terminator: DEFAULT_TERMINATOR,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Load a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings for values the transport cannot work with.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an unsupported separator, a zero buffer
    /// size or line length, or a terminator that is not ASCII.
    pub fn validate(&self) -> Result<()> {
        validate_separator(self.field_separator)?;
        if self.read_buffer_size == 0 {
            return Err(EpiError::Usage(
                "read buffer size must be greater than zero".to_string(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(EpiError::Usage(
                "max line length must be greater than zero".to_string(),
            ));
        }
        if !self.terminator.is_ascii() {
            return Err(EpiError::Usage(format!(
                "terminator 0x{:02x} is not an ASCII byte",
                self.terminator
            )));
        }
        Ok(())
    }

    /// Transport settings used right after connecting.
    ///
    /// The handshake always runs with the default separator and encoding;
    /// configured values are negotiated after logon.
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            field_separator: DEFAULT_FIELD_SEPARATOR,
            encoding: TextEncoding::default(),
            terminator: self.terminator,
            read_buffer_size: self.read_buffer_size,
            max_line_length: self.max_line_length,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mandant", &self.mandant)
            .field("password", &"***")
            .field("encoding", &self.encoding)
            .field("field_separator", &self.field_separator)
            .field("terminator", &self.terminator)
            .field("read_buffer_size", &self.read_buffer_size)
            .field("max_line_length", &self.max_line_length)
            .field("protocol_version", &self.protocol_version)
            .finish()
    }
}
