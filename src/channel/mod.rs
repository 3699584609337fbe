//! Channel module - routing of response frames by action id.
//!
//! - [`Channel`] - ordered queue of data-bearing frames for one action id
//! - [`Demultiplexer`] - channel registry plus the read loop

mod demux;
mod queue;

pub use demux::{Demultiplexer, StatusSink};
pub use queue::Channel;
