//! Per-action-id frame queue.

use std::collections::VecDeque;
use std::fmt;

use crate::protocol::Command;

/// Ordered queue of data-bearing frames for one action id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    action_id: u32,
    frames: VecDeque<Command>,
}

impl Channel {
    /// Create an empty channel.
    pub fn new(action_id: u32) -> Self {
        Self {
            action_id,
            frames: VecDeque::new(),
        }
    }

    /// Action id this channel belongs to.
    pub fn action_id(&self) -> u32 {
        self.action_id
    }

    /// Append a frame.
    pub fn push(&mut self, cmd: Command) {
        self.frames.push_back(cmd);
    }

    /// Take the oldest frame.
    pub fn pop(&mut self) -> Option<Command> {
        self.frames.pop_front()
    }

    /// Take all frames in arrival order.
    pub fn drain(&mut self) -> Vec<Command> {
        self.frames.drain(..).collect()
    }

    /// Iterate over queued frames without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.frames.iter()
    }

    /// Discard all queued frames.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the channel is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ActionId: {}", self.action_id)?;
        for cmd in &self.frames {
            write!(f, ", {cmd}")?;
        }
        f.write_str(" }")
    }
}
