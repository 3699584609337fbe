//! Line buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for buffer management. Incoming chunks are
//! appended; complete terminator-delimited lines are split off the front,
//! the partial tail stays for the next push. The scan position is
//! remembered so a long line arriving in many chunks is scanned once.
//!
//! # Example
//!
//! ```
//! use epi_client::protocol::LineBuffer;
//!
//! let mut buffer = LineBuffer::new();
//! buffer.extend(b"ACK|1|\nD|2|a");
//!
//! assert_eq!(&buffer.next_line().unwrap().unwrap()[..], b"ACK|1|");
//! assert!(buffer.next_line().unwrap().is_none());
//!
//! buffer.extend(b"|\n");
//! assert_eq!(&buffer.next_line().unwrap().unwrap()[..], b"D|2|a|");
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::DEFAULT_TERMINATOR;
use crate::error::{EpiError, Result};

/// Default read chunk size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Default maximum line length (1 MiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete lines.
#[derive(Debug)]
pub struct LineBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// No terminator in the first `scanned` bytes of the buffer.
    scanned: usize,
    /// Line terminator byte.
    terminator: u8,
    /// Maximum allowed line length (terminator excluded).
    max_line_length: usize,
}

impl LineBuffer {
    /// Create a new line buffer with default settings.
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TERMINATOR, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a new line buffer with a custom terminator and max line length.
    pub fn with_settings(terminator: u8, max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_READ_BUFFER_SIZE),
            scanned: 0,
            terminator,
            max_line_length,
        }
    }

    /// Push data into the buffer and extract all complete lines.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if a line exceeds the maximum length.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Bytes>> {
        self.extend(data);

        let mut lines = Vec::new();
        while let Some(line) = self.next_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    /// Append data to the buffer without extracting lines.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract the next complete line (terminator stripped).
    ///
    /// Returns:
    /// - `Ok(Some(line))` if a complete line was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the line is longer than allowed
    pub fn next_line(&mut self) -> Result<Option<Bytes>> {
        let from = self.scanned;

        match self.buffer[from..]
            .iter()
            .position(|&b| b == self.terminator)
        {
            Some(offset) => {
                let end = from + offset;
                if end > self.max_line_length {
                    return Err(self.too_long(end));
                }

                let line = self.buffer.split_to(end).freeze();
                // drop the terminator
                let _ = self.buffer.split_to(1);
                self.scanned = 0;
                Ok(Some(line))
            }
            None => {
                let len = self.buffer.len();
                if len > self.max_line_length {
                    return Err(self.too_long(len));
                }
                self.scanned = len;
                Ok(None)
            }
        }
    }

    fn too_long(&self, len: usize) -> EpiError {
        EpiError::Protocol(format!(
            "line length {} exceeds maximum {}",
            len, self.max_line_length
        ))
    }

    /// Get the line terminator.
    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
