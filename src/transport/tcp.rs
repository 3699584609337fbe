//! Stream connectors.

use std::collections::VecDeque;
use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{EpiError, Result};

/// Produces the byte stream a session talks over.
///
/// Called once per [`open`](crate::Session::open).
pub trait Connector {
    /// Connected stream type.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Establish a new connection.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Connects to an EPI server over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    /// Create a connector for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Target port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self) -> impl Future<Output = Result<TcpStream>> + Send {
        let host = self.host.clone();
        let port = self.port;
        async move {
            tracing::debug!("Connecting to {}:{}", host, port);
            let stream = TcpStream::connect((host.as_str(), port))
                .await
                .map_err(|e| {
                    EpiError::Connection(format!("connection to {host}:{port} has been refused: {e}"))
                })?;
            stream.set_nodelay(true)?;
            Ok(stream)
        }
    }
}

/// Hands out pre-connected streams, one per `connect` call.
///
/// Useful for in-memory servers built on [`tokio::io::duplex`].
#[derive(Debug)]
pub struct StreamConnector<S> {
    streams: VecDeque<S>,
}

impl<S> StreamConnector<S> {
    /// Connector yielding a single stream.
    pub fn new(stream: S) -> Self {
        Self::from_streams([stream])
    }

    /// Connector yielding the given streams in order.
    pub fn from_streams(streams: impl IntoIterator<Item = S>) -> Self {
        Self {
            streams: streams.into_iter().collect(),
        }
    }

    /// Number of streams not yet handed out.
    pub fn remaining(&self) -> usize {
        self.streams.len()
    }
}

impl<S> Connector for StreamConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    type Stream = S;

    fn connect(&mut self) -> impl Future<Output = Result<S>> + Send {
        let next = self.streams.pop_front();
        async move {
            next.ok_or_else(|| EpiError::Connection("no stream left to connect".to_string()))
        }
    }
}
