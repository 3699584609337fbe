//! Line transport over an async byte stream.
//!
//! Reads chunks into a [`LineBuffer`], decodes complete lines with the
//! configured text encoding and [`LineCodec`], and writes encoded commands
//! followed by exactly one terminator byte.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::TextEncoding;
use crate::error::{EpiError, Result};
use crate::protocol::{
    Command, LineBuffer, LineCodec, DEFAULT_FIELD_SEPARATOR, DEFAULT_MAX_LINE_LENGTH,
    DEFAULT_READ_BUFFER_SIZE, DEFAULT_TERMINATOR,
};

/// Settings for a [`Transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSettings {
    /// Field separator used by the codec.
    pub field_separator: char,
    /// Text encoding of the wire.
    pub encoding: TextEncoding,
    /// Line terminator byte.
    pub terminator: u8,
    /// Size of one socket read.
    pub read_buffer_size: usize,
    /// Longest accepted line.
    pub max_line_length: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            field_separator: DEFAULT_FIELD_SEPARATOR,
            encoding: TextEncoding::default(),
            terminator: DEFAULT_TERMINATOR,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Reads and writes protocol lines on one stream.
#[derive(Debug)]
pub struct Transport<S> {
    stream: S,
    buffer: LineBuffer,
    chunk: Vec<u8>,
    codec: LineCodec,
    encoding: TextEncoding,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an unsupported field separator or a zero
    /// read buffer size.
    pub fn new(stream: S, settings: TransportSettings) -> Result<Self> {
        if settings.read_buffer_size == 0 {
            return Err(EpiError::Usage(
                "read buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            stream,
            buffer: LineBuffer::with_settings(settings.terminator, settings.max_line_length),
            chunk: vec![0u8; settings.read_buffer_size],
            codec: LineCodec::new(settings.field_separator)?,
            encoding: settings.encoding,
        })
    }

    /// Read the next line as text, terminator stripped.
    ///
    /// Lines already buffered from an earlier read are returned first.
    ///
    /// # Errors
    ///
    /// Returns [`EpiError::ConnectionClosed`] when the stream ends before a
    /// complete line arrived.
    pub async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(line) = self.buffer.next_line()? {
                let text = self.encoding.decode(&line)?;
                tracing::trace!(response = %text, "line received");
                return Ok(text);
            }

            let n = self.stream.read(&mut self.chunk).await?;
            if n == 0 {
                if !self.buffer.is_empty() {
                    tracing::debug!(
                        "Connection closed with {} unterminated bytes",
                        self.buffer.len()
                    );
                }
                return Err(EpiError::ConnectionClosed);
            }
            self.buffer.extend(&self.chunk[..n]);
        }
    }

    /// Read and decode the next frame. Blank lines are skipped.
    pub async fn read_frame(&mut self) -> Result<Command> {
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                tracing::trace!("skipping blank line");
                continue;
            }
            let cmd = self.codec.decode(&line)?;
            tracing::debug!(response = %line, "frame received");
            return Ok(cmd);
        }
    }

    /// Encode and write one command plus terminator, then flush.
    pub async fn write(&mut self, cmd: &Command) -> Result<()> {
        let line = self.codec.encode(cmd);
        tracing::debug!(request = %line, "sending frame");

        let mut bytes = self.encoding.encode(&line)?;
        bytes.push(self.buffer.terminator());

        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Shut the stream down.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.buffer.clear();
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Switch the field separator for all following frames.
    pub fn set_field_separator(&mut self, separator: char) -> Result<()> {
        self.codec = LineCodec::new(separator)?;
        Ok(())
    }

    /// Switch the text encoding for all following frames.
    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    /// Current field separator.
    pub fn field_separator(&self) -> char {
        self.codec.separator()
    }

    /// Current text encoding.
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn settings_with_chunk(read_buffer_size: usize) -> TransportSettings {
        TransportSettings {
            read_buffer_size,
            ..TransportSettings::default()
        }
    }

    async fn frames_from_chunks(chunks: &[&[u8]]) -> Vec<Command> {
        let (client, mut server) = duplex(1024);
        let mut transport = Transport::new(client, TransportSettings::default()).unwrap();

        for chunk in chunks {
            server.write_all(chunk).await.unwrap();
        }
        drop(server);

        let mut frames = Vec::new();
        loop {
            match transport.read_frame().await {
                Ok(cmd) => frames.push(cmd),
                Err(EpiError::ConnectionClosed) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        frames
    }

    #[tokio::test]
    async fn test_fragmentation_yields_same_frames() {
        let one_per_chunk = frames_from_chunks(&[b"ACK|1|\n", b"D|2|a|b|\n"]).await;
        let split_mid_frame = frames_from_chunks(&[b"ACK|1", b"|\nD|2|a", b"|b|\n"]).await;
        let batched = frames_from_chunks(&[b"ACK|1|\nD|2|a|b|\n"]).await;

        assert_eq!(one_per_chunk.len(), 2);
        assert_eq!(one_per_chunk, split_mid_frame);
        assert_eq!(one_per_chunk, batched);
    }

    #[tokio::test]
    async fn test_small_read_buffer() {
        let (client, mut server) = duplex(64);
        let mut transport = Transport::new(client, settings_with_chunk(3)).unwrap();

        server.write_all(b"EOD|7|1|0|1|\n").await.unwrap();
        let cmd = transport.read_frame().await.unwrap();
        assert_eq!(cmd.word(), "EOD");
        assert_eq!(cmd.action_id(), 7);
        assert_eq!(cmd.fields(), &["1", "0", "1"]);
    }

    #[tokio::test]
    async fn test_write_appends_one_terminator() {
        let (client, mut server) = duplex(64);
        let mut transport = Transport::new(client, TransportSettings::default()).unwrap();

        let cmd = Command::builder("GNR").action_id(4).build().unwrap();
        transport.write(&cmd).await.unwrap();
        transport.shutdown().await.unwrap();

        let mut written = Vec::new();
        server.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, b"GNR|4|\n");
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client, server) = duplex(64);
        drop(server);
        let mut transport = Transport::new(client, TransportSettings::default()).unwrap();
        assert!(matches!(
            transport.read_line().await,
            Err(EpiError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_latin1_on_the_wire() {
        let (client, mut server) = duplex(64);
        let mut transport = Transport::new(client, TransportSettings::default()).unwrap();

        server.write_all(b"D|2|M\xfcller|\n").await.unwrap();
        let cmd = transport.read_frame().await.unwrap();
        assert_eq!(cmd.field(0), "Müller");
    }

    #[tokio::test]
    async fn test_separator_switch() {
        let (client, mut server) = duplex(64);
        let mut transport = Transport::new(client, TransportSettings::default()).unwrap();
        transport.set_field_separator('!').unwrap();
        assert!(transport.set_field_separator(',').is_err());

        server.write_all(b"D!2!a|b!\n").await.unwrap();
        let cmd = transport.read_frame().await.unwrap();
        assert_eq!(cmd.field(0), "a|b");
        assert_eq!(transport.field_separator(), '!');
    }

    #[test]
    fn test_zero_read_buffer_rejected() {
        let (client, _server) = duplex(64);
        assert!(matches!(
            Transport::new(client, settings_with_chunk(0)),
            Err(EpiError::Usage(_))
        ));
    }
}
