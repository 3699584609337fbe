//! Transport module - connection setup and line I/O.
//!
//! Provides:
//! - [`Connector`] - produces the byte stream (TCP or in-memory)
//! - [`Transport`] - reads and writes protocol lines on that stream

mod line;
mod tcp;

pub use line::{Transport, TransportSettings};
pub use tcp::{Connector, StreamConnector, TcpConnector};
