//! Channel demultiplexer.
//!
//! Keeps one [`Channel`] per action id and runs the read loop that routes
//! incoming frames until a frame concluding the exchange arrives.

use std::collections::HashMap;
use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};

use super::Channel;
use crate::error::{EpiError, Result};
use crate::protocol::{fields, Command, FrameClass, ResponseKind};
use crate::transport::Transport;

/// Callback receiving status (`S`) and progress (`P`) frames.
pub type StatusSink = Box<dyn FnMut(&Command) + Send>;

/// Routes frames to per-action-id channels.
#[derive(Default)]
pub struct Demultiplexer {
    /// Channels by action id.
    channels: HashMap<u32, Channel>,
    /// Control frame that ended the last exchange.
    last_result: Option<Command>,
    /// Optional receiver of status messages.
    status_sink: Option<StatusSink>,
}

impl Demultiplexer {
    /// Create a demultiplexer without channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel. Existing channels are kept as they are.
    pub fn add_channel(&mut self, action_id: u32) {
        self.channels
            .entry(action_id)
            .or_insert_with(|| Channel::new(action_id));
    }

    /// Remove a channel and its queued frames.
    pub fn remove_channel(&mut self, action_id: u32) -> Option<Channel> {
        self.channels.remove(&action_id)
    }

    /// Remove every channel.
    pub fn remove_all_channels(&mut self) {
        self.channels.clear();
    }

    /// Check if a channel is registered.
    pub fn has_channel(&self, action_id: u32) -> bool {
        self.channels.contains_key(&action_id)
    }

    /// Get a registered channel.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if no channel is registered for the id.
    pub fn channel(&mut self, action_id: u32) -> Result<&mut Channel> {
        self.channels.get_mut(&action_id).ok_or_else(|| {
            EpiError::Protocol(format!(
                "for the action id {action_id} is no channel registered"
            ))
        })
    }

    /// Take every queued frame of a channel.
    pub fn drain(&mut self, action_id: u32) -> Result<Vec<Command>> {
        Ok(self.channel(action_id)?.drain())
    }

    /// Clear (creating if needed) the channel a request is about to be sent on.
    pub fn prepare_write(&mut self, action_id: u32) {
        self.channels
            .entry(action_id)
            .or_insert_with(|| Channel::new(action_id))
            .clear();
    }

    /// Control frame that ended the last exchange, if any.
    pub fn last_result(&self) -> Option<&Command> {
        self.last_result.as_ref()
    }

    /// Install or remove the status sink.
    pub fn set_status_sink(&mut self, sink: Option<StatusSink>) {
        self.status_sink = sink;
    }

    /// Read frames until one concludes the exchange.
    ///
    /// Data-bearing frames are queued on the channel of their action id,
    /// status frames go to the status sink. An error frame aborts the loop.
    /// Only the end-of-data frame of `action_id` ends it with data; one for
    /// another id is queued like any other data frame.
    ///
    /// # Errors
    ///
    /// - [`EpiError::Server`] for an `E` frame
    /// - [`EpiError::UnknownActionId`] for data without a registered channel
    /// - [`EpiError::Protocol`] for an unsupported command word
    pub async fn read_until_terminal<S>(
        &mut self,
        transport: &mut Transport<S>,
        action_id: u32,
    ) -> Result<ResponseKind>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.last_result = None;

        loop {
            let cmd = transport.read_frame().await?;
            if let Some(kind) = self.dispatch(cmd, action_id)? {
                return Ok(kind);
            }
        }
    }

    /// Route one frame, returning the response kind if it ends the exchange.
    pub(crate) fn dispatch(&mut self, cmd: Command, action_id: u32) -> Result<Option<ResponseKind>> {
        match FrameClass::of(&cmd) {
            FrameClass::Control(kind) => {
                tracing::trace!("Exchange ended with {}", kind);
                self.last_result = Some(cmd);
                Ok(Some(kind))
            }
            FrameClass::Data { terminal } => {
                let ends = terminal && cmd.action_id() == action_id;
                if terminal && !ends {
                    tracing::debug!(action_id = cmd.action_id(), "Late end of data queued");
                }
                self.enqueue(cmd)?;
                Ok(ends.then_some(ResponseKind::Data))
            }
            FrameClass::Status => {
                tracing::info!(
                    kind = cmd.word(),
                    "Status: {}",
                    cmd.field(fields::STATUS_MESSAGE_TEXT)
                );
                if let Some(sink) = self.status_sink.as_mut() {
                    sink(&cmd);
                }
                Ok(None)
            }
            FrameClass::Error => {
                let message = cmd.field(fields::ERROR_MESSAGE_TEXT).to_string();
                tracing::warn!("Server responded with an error: {}", message);
                Err(EpiError::Server {
                    message,
                    command: cmd,
                })
            }
            FrameClass::Unsupported => Err(EpiError::Protocol(format!(
                "command word {} is not supported, CMD: {cmd}",
                cmd.word()
            ))),
        }
    }

    fn enqueue(&mut self, cmd: Command) -> Result<()> {
        match self.channels.get_mut(&cmd.action_id()) {
            Some(channel) => {
                channel.push(cmd);
                Ok(())
            }
            None => Err(EpiError::UnknownActionId {
                action_id: cmd.action_id(),
                command: cmd,
            }),
        }
    }
}

impl fmt::Debug for Demultiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Demultiplexer")
            .field("channels", &self.channels)
            .field("last_result", &self.last_result)
            .field("status_sink", &self.status_sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportSettings;
    use std::sync::{Arc, Mutex};
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    async fn transport_with(script: &[u8]) -> (Transport<DuplexStream>, DuplexStream) {
        let (client, mut server) = duplex(4096);
        server.write_all(script).await.unwrap();
        let transport = Transport::new(client, TransportSettings::default()).unwrap();
        (transport, server)
    }

    #[tokio::test]
    async fn test_acknowledge_ends_loop() {
        let mut demux = Demultiplexer::new();
        let (mut transport, _server) =
            transport_with(b"S|0|welcome|\nACK|1|\n").await;

        let kind = demux.read_until_terminal(&mut transport, 1).await.unwrap();
        assert_eq!(kind, ResponseKind::Acknowledge);
        assert_eq!(demux.last_result().unwrap().word(), "ACK");
    }

    #[tokio::test]
    async fn test_data_routed_by_action_id() {
        let mut demux = Demultiplexer::new();
        demux.add_channel(2);
        demux.add_channel(3);
        let (mut transport, _server) =
            transport_with(b"BOD|2|1|\nD|3|other|\nD|2|mine|\nEOD|2|1|1|1|\nACK|1|\n").await;

        let kind = demux.read_until_terminal(&mut transport, 2).await.unwrap();
        assert_eq!(kind, ResponseKind::Data);
        assert!(demux.last_result().is_none());

        let words: Vec<_> = demux
            .drain(2)
            .unwrap()
            .iter()
            .map(|c| c.word().to_string())
            .collect();
        assert_eq!(words, ["BOD", "D", "EOD"]);
        assert_eq!(demux.channel(3).unwrap().len(), 1);

        // the ACK stays buffered for the next exchange
        let kind = demux.read_until_terminal(&mut transport, 1).await.unwrap();
        assert_eq!(kind, ResponseKind::Acknowledge);
    }

    #[tokio::test]
    async fn test_unknown_action_id() {
        let mut demux = Demultiplexer::new();
        demux.add_channel(1);
        let (mut transport, _server) =
            transport_with(b"D|9|x|\n").await;

        let err = demux.read_until_terminal(&mut transport, 1).await.unwrap_err();
        match err {
            EpiError::UnknownActionId { action_id, command } => {
                assert_eq!(action_id, 9);
                assert_eq!(command.field(0), "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_error_frame() {
        let mut demux = Demultiplexer::new();
        let (mut transport, _server) =
            transport_with(b"E|1|no such table|\n").await;

        let err = demux.read_until_terminal(&mut transport, 1).await.unwrap_err();
        assert!(matches!(err, EpiError::Server { ref message, .. } if message == "no such table"));
    }

    #[tokio::test]
    async fn test_unsupported_word() {
        let mut demux = Demultiplexer::new();
        let (mut transport, _server) =
            transport_with(b"XYZ|1|\n").await;

        let err = demux.read_until_terminal(&mut transport, 1).await.unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[tokio::test]
    async fn test_status_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();

        let mut demux = Demultiplexer::new();
        demux.set_status_sink(Some(Box::new(move |cmd: &Command| {
            sink_seen.lock().unwrap().push(cmd.field(0).to_string());
        })));
        let (mut transport, _server) =
            transport_with(b"S|1|working|\nP|1|50|\nNAK|1|\n").await;

        let kind = demux.read_until_terminal(&mut transport, 1).await.unwrap();
        assert_eq!(kind, ResponseKind::NegativeAcknowledge);
        assert_eq!(*seen.lock().unwrap(), ["working", "50"]);
    }

    #[test]
    fn test_prepare_write_clears_and_creates() {
        let mut demux = Demultiplexer::new();
        demux.prepare_write(5);
        assert!(demux.has_channel(5));

        demux
            .dispatch(Command::builder("D").action_id(5).build().unwrap(), 5)
            .unwrap();
        assert_eq!(demux.channel(5).unwrap().len(), 1);

        demux.prepare_write(5);
        assert!(demux.channel(5).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_late_end_of_data_is_queued() {
        let mut demux = Demultiplexer::new();
        demux.add_channel(1);
        demux.add_channel(2);
        let (mut transport, _server) =
            transport_with(b"EOD|2|1|0|1|\nD|1|TIMEOUT|30|\nEOD|1|1|1|1|\n").await;

        let kind = demux.read_until_terminal(&mut transport, 1).await.unwrap();
        assert_eq!(kind, ResponseKind::Data);
        assert_eq!(demux.drain(1).unwrap().len(), 2);
        assert_eq!(demux.drain(2).unwrap()[0].word(), "EOD");
    }

    #[test]
    fn test_channel_lifecycle() {
        let mut demux = Demultiplexer::new();
        demux.add_channel(1);
        demux.add_channel(2);
        assert!(demux.remove_channel(2).is_some());
        assert!(matches!(demux.channel(2), Err(EpiError::Protocol(_))));

        demux.remove_all_channels();
        assert!(!demux.has_channel(1));
    }
}
