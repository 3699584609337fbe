//! # epi-client
//!
//! Async client for the line-framed EPI query protocol.
//!
//! An EPI server speaks a text protocol: every frame is one line of
//! separator-delimited fields (`WORD|actionId|field|...|`). Requests carry an
//! action id so that the frames of several queries can share one connection.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): commands, the line codec and the frame buffer
//! - **Transport** ([`transport`]): reads and writes frames on a tokio stream
//! - **Channels** ([`channel`]): routes data frames to per-action-id queues
//! - **Session** ([`session`]): logon handshake, options and query requests
//! - **Query** ([`query`]): paging state machine and record reassembly
//! - **Selection** ([`selection`]): renders criteria into selection text
//!
//! ## Example
//!
//! ```ignore
//! use epi_client::{Filter, Session};
//!
//! #[tokio::main]
//! async fn main() -> epi_client::Result<()> {
//!     let mut session = Session::builder()
//!         .host("erp01")
//!         .mandant("58")
//!         .password("secret")
//!         .build()?;
//!
//!     let selection = Filter::field("swd").eq("VAAG").to_selection(0, [1]).with_paging(100);
//!     let mut query = session.create_query(selection).await?;
//!
//!     let mut records = query.records(&mut session);
//!     while let Some(record) = records.next().await? {
//!         println!("{}", record.get("swd")?);
//!     }
//!
//!     session.close().await
//! }
//! ```

pub mod channel;
pub mod codec;
pub mod error;
pub mod model;
pub mod protocol;
pub mod query;
pub mod selection;
pub mod session;
pub mod transport;

pub use codec::TextEncoding;
pub use error::{EpiError, Result};
pub use model::{Field, FieldList, Record};
pub use query::{Page, Query, QueryState, RecordCursor};
pub use selection::{Condition, Filter, Selection};
pub use session::{Session, SessionBuilder, SessionConfig};
pub use transport::{Connector, StreamConnector, TcpConnector};
