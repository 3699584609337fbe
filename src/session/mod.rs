//! Session - one logical connection to an EPI server.
//!
//! The session owns the transport, the demultiplexer and the action-id
//! counter. It runs the logon handshake, option calls and the query
//! requests a [`Query`] issues while paging.
//!
//! # Example
//!
//! ```ignore
//! use epi_client::{Session, Selection};
//!
//! #[tokio::main]
//! async fn main() -> epi_client::Result<()> {
//!     let mut session = Session::builder()
//!         .host("erp01")
//!         .mandant("58")
//!         .password("secret")
//!         .build()?;
//!
//!     let mut query = session.create_query(Selection::new(0, [1]).with_paging(50)).await?;
//!     let records = query.records(&mut session).collect_all().await?;
//!     println!("{} records", records.len());
//!
//!     session.close().await
//! }
//! ```

mod config;
mod requests;

use std::fmt;

pub use config::{SessionConfig, DEFAULT_PORT, DEFAULT_PROTOCOL_VERSION};
pub use requests::QueryRequest;

use crate::channel::{Demultiplexer, StatusSink};
use crate::codec::TextEncoding;
use crate::error::{EpiError, Result};
use crate::protocol::{
    options, validate_separator, words, Command, ResponseKind, DEFAULT_FIELD_SEPARATOR,
};
use crate::query::Query;
use crate::selection::Selection;
use crate::transport::{Connector, TcpConnector, Transport};

/// A connection to an EPI server.
///
/// Opened lazily by the first request and closed exactly once, either by
/// [`close`](Self::close) or by dropping the session.
pub struct Session<C: Connector = TcpConnector> {
    config: SessionConfig,
    connector: C,
    transport: Option<Transport<C::Stream>>,
    demux: Demultiplexer,
    session_action_id: u32,
    action_id_counter: u32,
    connected: bool,
}

impl Session<TcpConnector> {
    /// Create a session connecting over TCP to the configured host.
    pub fn new(config: SessionConfig) -> Self {
        let connector = TcpConnector::new(config.host.clone(), config.port);
        Self::with_connector(config, connector)
    }

    /// Create a session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }
}

impl<C: Connector> Session<C> {
    /// Create a session using a custom connector.
    pub fn with_connector(config: SessionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            transport: None,
            demux: Demultiplexer::new(),
            session_action_id: 1,
            action_id_counter: 1,
            connected: false,
        }
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the logon handshake completed and the session is not closed.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Action id used for session-level requests.
    pub fn session_action_id(&self) -> u32 {
        self.session_action_id
    }

    /// Connect and log on.
    ///
    /// An open session is closed first. Configured separator and encoding
    /// are negotiated after logon.
    ///
    /// # Errors
    ///
    /// - [`EpiError::Connection`] if the server cannot be reached
    /// - [`EpiError::Rejected`] if the mandant change or logon is refused
    pub async fn open(&mut self) -> Result<()> {
        if self.connected {
            if let Err(e) = self.close().await {
                tracing::warn!("Closing the previous connection failed: {}", e);
            }
        }

        self.session_action_id = 1;
        self.action_id_counter = 1;
        self.demux.remove_all_channels();
        self.demux.add_channel(self.session_action_id);

        let stream = self.connector.connect().await?;
        let mut transport = Transport::new(stream, self.config.transport_settings())?;

        if let Err(e) = self.handshake(&mut transport).await {
            if let Err(shutdown) = transport.shutdown().await {
                tracing::debug!("Shutdown after failed logon: {}", shutdown);
            }
            return Err(e);
        }

        self.transport = Some(transport);
        self.connected = true;
        tracing::debug!(mandant = %self.config.mandant, "Logged on");

        if let Err(e) = self.negotiate().await {
            self.release().await;
            return Err(e);
        }
        Ok(())
    }

    async fn handshake(&mut self, transport: &mut Transport<C::Stream>) -> Result<()> {
        let greeting = transport.read_line().await?;
        tracing::debug!(greeting = %greeting, "Server greeting");

        let id = self.session_action_id;
        let chm = requests::change_mandant(id, &self.config.mandant);
        if Self::exchange(transport, &mut self.demux, &chm).await? != ResponseKind::Acknowledge {
            return Err(self.rejected("change mandant failed"));
        }

        let lgn = requests::logon(
            id,
            &self.config.password,
            &self.config.mandant,
            &self.config.protocol_version,
        );
        if Self::exchange(transport, &mut self.demux, &lgn).await? != ResponseKind::Acknowledge {
            return Err(self.rejected("logon failed"));
        }
        Ok(())
    }

    async fn negotiate(&mut self) -> Result<()> {
        let separator = self.config.field_separator;
        if separator != DEFAULT_FIELD_SEPARATOR {
            self.set_field_separator(separator).await?;
        }
        let encoding = self.config.encoding;
        if encoding != TextEncoding::default() {
            self.set_encoding(encoding).await?;
        }
        Ok(())
    }

    /// Send `END` and release the connection.
    ///
    /// The transport is shut down even if the server does not confirm.
    ///
    /// # Errors
    ///
    /// Returns [`EpiError::Rejected`] if the server answers `END` with
    /// anything but `END`.
    pub async fn close(&mut self) -> Result<()> {
        let mut result = Ok(());

        if self.connected {
            self.connected = false;
            if let Some(transport) = self.transport.as_mut() {
                result = match Self::exchange(transport, &mut self.demux, &Command::end()).await {
                    Ok(ResponseKind::End) => {
                        if let Some(end) = self.demux.last_result() {
                            tracing::debug!("Session ended: {}", end);
                        }
                        Ok(())
                    }
                    Ok(_) => Err(self.rejected("server doesn't accept end command")),
                    Err(e) => Err(e),
                };
            }
        }

        self.release().await;
        result
    }

    async fn release(&mut self) {
        self.connected = false;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown().await {
                tracing::debug!("Shutdown failed: {}", e);
            }
        }
    }

    /// Open the session unless it is connected.
    pub async fn ensure_open(&mut self) -> Result<()> {
        if !self.connected {
            self.open().await?;
        }
        Ok(())
    }

    /// Allocate a fresh action id.
    pub fn register_new_action_id(&mut self) -> u32 {
        self.action_id_counter += 1;
        self.action_id_counter
    }

    /// Create a query with its own action id.
    ///
    /// The session is opened first, since opening starts the action-id
    /// counter over.
    ///
    /// # Errors
    ///
    /// Any error of [`open`](Self::open).
    pub async fn create_query(&mut self, selection: Selection) -> Result<Query> {
        self.ensure_open().await?;
        let action_id = self.register_new_action_id();
        Ok(Query::new(selection, action_id))
    }

    /// Forward status (`S`) and progress (`P`) frames to a callback.
    pub fn set_status_sink<F>(&mut self, sink: F)
    where
        F: FnMut(&Command) + Send + 'static,
    {
        self.demux.set_status_sink(Some(Box::new(sink) as StatusSink));
    }

    /// Stop forwarding status frames.
    pub fn clear_status_sink(&mut self) {
        self.demux.set_status_sink(None);
    }

    /// Set a server option.
    ///
    /// # Errors
    ///
    /// Returns [`EpiError::Rejected`] if the server does not acknowledge.
    pub async fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        if !self.try_set_option(name, value).await? {
            return Err(self.rejected(&format!("option {name} couldn't be set")));
        }
        Ok(())
    }

    /// Set a server option, returning whether the server acknowledged.
    pub async fn try_set_option(&mut self, name: &str, value: &str) -> Result<bool> {
        check_option_name(name)?;
        self.ensure_open().await?;
        self.send_option(name, value).await
    }

    // Must not open the session: `open` negotiates through here.
    async fn send_option(&mut self, name: &str, value: &str) -> Result<bool> {
        let cmd = requests::set_option(self.session_action_id, name, value);
        let kind = self.request(&cmd).await?;
        Ok(kind == ResponseKind::Acknowledge)
    }

    /// Read the current value of a server option.
    ///
    /// # Errors
    ///
    /// - [`EpiError::Rejected`] if the server does not answer with data
    /// - [`EpiError::Protocol`] if the answer carries no or several values
    /// - [`EpiError::MissingTerminal`] if the answer has no end-of-data frame
    pub async fn get_option_value(&mut self, name: &str) -> Result<String> {
        check_option_name(name)?;
        self.ensure_open().await?;

        let id = self.session_action_id;
        let cmd = requests::show_option(id, name);
        if self.request(&cmd).await? != ResponseKind::Data {
            return Err(self.rejected(&format!("option {name} couldn't be read")));
        }

        let mut value: Option<String> = None;
        for frame in self.demux.drain(id)? {
            match frame.word() {
                words::DATA => {
                    if value.is_some() {
                        return Err(EpiError::Protocol(format!(
                            "option {name} returned more than one value"
                        )));
                    }
                    value = Some(frame.field(1).to_string());
                }
                words::END_OF_DATA => {
                    return value.ok_or_else(|| {
                        EpiError::Protocol(format!("option {name} returned no value"))
                    });
                }
                _ => tracing::trace!("Ignoring {} in option response", frame),
            }
        }
        Err(EpiError::MissingTerminal)
    }

    /// Change the field separator of the connection.
    ///
    /// The new separator is used for every frame after the server
    /// acknowledged the change.
    ///
    /// # Errors
    ///
    /// Returns a usage error when not connected or for an unsupported
    /// separator.
    pub async fn set_field_separator(&mut self, separator: char) -> Result<()> {
        self.require_connected("field separator")?;
        validate_separator(separator)?;

        let value = separator.to_string();
        if !self.send_option(options::FIELD_SEPARATOR, &value).await? {
            return Err(self.rejected("field separator couldn't be changed"));
        }
        self.io()?.0.set_field_separator(separator)?;
        self.config.field_separator = separator;
        Ok(())
    }

    /// Change the character set of the connection.
    ///
    /// # Errors
    ///
    /// Returns a usage error when not connected.
    pub async fn set_encoding(&mut self, encoding: TextEncoding) -> Result<()> {
        self.require_connected("encoding")?;

        if !self.send_option(options::CHARSET, encoding.name()).await? {
            return Err(self.rejected("encoding couldn't be changed"));
        }
        self.io()?.0.set_encoding(encoding);
        self.config.encoding = encoding;
        Ok(())
    }

    /// Start a query and return the frames of its first page.
    ///
    /// # Errors
    ///
    /// Returns [`EpiError::Rejected`] unless the server answers with data.
    pub async fn execute_query(
        &mut self,
        action_id: u32,
        query: &QueryRequest<'_>,
    ) -> Result<Vec<Command>> {
        self.ensure_open().await?;

        let cmd = requests::execute_query(action_id, query);
        if self.request(&cmd).await? != ResponseKind::Data {
            return Err(self.rejected("query execution failed"));
        }
        self.demux.drain(action_id)
    }

    /// Fetch the next page of a running query.
    ///
    /// # Errors
    ///
    /// Returns [`EpiError::Rejected`] unless the server answers with data.
    pub async fn get_next_record(&mut self, action_id: u32) -> Result<Vec<Command>> {
        self.ensure_open().await?;

        let cmd = requests::get_next_record(action_id);
        if self.request(&cmd).await? != ResponseKind::Data {
            return Err(self.rejected("get next record failed"));
        }
        self.demux.drain(action_id)
    }

    /// Cancel a running query. No response is awaited.
    pub async fn break_query_execution(&mut self, action_id: u32) -> Result<()> {
        let cmd = requests::break_query_execution(action_id);
        let (transport, demux) = self.io()?;
        demux.prepare_write(action_id);
        transport.write(&cmd).await
    }

    /// Release the channel of a finished query.
    pub fn remove_channel(&mut self, action_id: u32) {
        if action_id != self.session_action_id {
            self.demux.remove_channel(action_id);
        }
    }

    /// Whether frames for the action id are still routed to a channel.
    pub fn has_channel(&self, action_id: u32) -> bool {
        self.demux.has_channel(action_id)
    }

    async fn request(&mut self, cmd: &Command) -> Result<ResponseKind> {
        let (transport, demux) = self.io()?;
        Self::exchange(transport, demux, cmd).await
    }

    async fn exchange(
        transport: &mut Transport<C::Stream>,
        demux: &mut Demultiplexer,
        cmd: &Command,
    ) -> Result<ResponseKind> {
        if !cmd.is_end() {
            demux.prepare_write(cmd.action_id());
        }
        transport.write(cmd).await?;
        demux.read_until_terminal(transport, cmd.action_id()).await
    }

    fn io(&mut self) -> Result<(&mut Transport<C::Stream>, &mut Demultiplexer)> {
        match self.transport.as_mut() {
            Some(transport) => Ok((transport, &mut self.demux)),
            None => Err(EpiError::Usage("session is not open".to_string())),
        }
    }

    fn require_connected(&self, setting: &str) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(EpiError::Usage(format!(
                "the {setting} can only be changed on an open session"
            )))
        }
    }

    fn rejected(&self, context: &str) -> EpiError {
        EpiError::Rejected {
            context: context.to_string(),
            response: self.demux.last_result().cloned(),
        }
    }
}

fn check_option_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EpiError::Usage("option name is empty".to_string()));
    }
    Ok(())
}

impl<C> fmt::Debug for Session<C>
where
    C: Connector + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("connector", &self.connector)
            .field("demux", &self.demux)
            .field("session_action_id", &self.session_action_id)
            .field("action_id_counter", &self.action_id_counter)
            .field("connected", &self.connected)
            .finish()
    }
}

/// Builder for a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Server port.
    ///
    /// Default: 6550
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Mandant selected at logon.
    pub fn mandant(mut self, mandant: impl Into<String>) -> Self {
        self.config.mandant = mandant.into();
        self
    }

    /// Logon password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Character set negotiated after logon.
    ///
    /// Default: ISO-8859-1
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    /// Field separator negotiated after logon.
    ///
    /// Default: `|`
    pub fn field_separator(mut self, separator: char) -> Self {
        self.config.field_separator = separator;
        self
    }

    /// Line terminator byte.
    pub fn terminator(mut self, terminator: u8) -> Self {
        self.config.terminator = terminator;
        self
    }

    /// Bytes requested per socket read.
    ///
    /// Default: 4096
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Longest accepted response line.
    pub fn max_line_length(mut self, length: usize) -> Self {
        self.config.max_line_length = length;
        self
    }

    /// Version announced at logon.
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.config.protocol_version = version.into();
        self
    }

    /// Build a TCP session. Nothing is connected yet.
    pub fn build(self) -> Result<Session<TcpConnector>> {
        self.config.validate()?;
        Ok(Session::new(self.config))
    }

    /// Build a session over a custom connector.
    pub fn build_with<C: Connector>(self, connector: C) -> Result<Session<C>> {
        self.config.validate()?;
        Ok(Session::with_connector(self.config, connector))
    }
}
