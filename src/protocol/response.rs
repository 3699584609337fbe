//! Response classification.

use std::fmt;

use super::wire_format::words;
use super::Command;

/// Final outcome of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// `ACK`
    Acknowledge,
    /// `NAK`
    NegativeAcknowledge,
    /// `EOD` ended a data response.
    Data,
    /// `DLG`
    Dialog,
    /// `END`
    End,
}

/// How the demultiplexer treats a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameClass {
    /// Control frame that ends the read loop.
    Control(ResponseKind),
    /// Data-bearing frame for the channel of its action id.
    Data {
        /// The frame ends the read loop with [`ResponseKind::Data`].
        terminal: bool,
    },
    /// Status or progress message.
    Status,
    /// Server error message.
    Error,
    /// Unknown command word.
    Unsupported,
}

impl FrameClass {
    /// Classify a frame by its command word.
    pub fn of(cmd: &Command) -> Self {
        match cmd.word() {
            words::ACKNOWLEDGE => Self::Control(ResponseKind::Acknowledge),
            words::NEGATIVE_ACKNOWLEDGE => Self::Control(ResponseKind::NegativeAcknowledge),
            words::END => Self::Control(ResponseKind::End),
            words::DIALOG_INFO => Self::Control(ResponseKind::Dialog),
            words::END_OF_DATA => Self::Data { terminal: true },
            words::BEGIN_OF_DATA
            | words::META_DATA
            | words::DATA
            | words::DATA_CONTINUATION
            | words::CHANGE_NOTIFICATION => Self::Data { terminal: false },
            words::STATUS_MESSAGE | words::PROGRESS_MESSAGE => Self::Status,
            words::ERROR => Self::Error,
            _ => Self::Unsupported,
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Acknowledge => "acknowledge",
            Self::NegativeAcknowledge => "negative acknowledge",
            Self::Data => "data",
            Self::Dialog => "dialog info",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(word: &str) -> FrameClass {
        FrameClass::of(&Command::builder(word).action_id(1).build().unwrap())
    }

    #[test]
    fn test_control_frames() {
        assert_eq!(class("ACK"), FrameClass::Control(ResponseKind::Acknowledge));
        assert_eq!(
            class("NAK"),
            FrameClass::Control(ResponseKind::NegativeAcknowledge)
        );
        assert_eq!(class("DLG"), FrameClass::Control(ResponseKind::Dialog));
        assert_eq!(
            FrameClass::of(&Command::end()),
            FrameClass::Control(ResponseKind::End)
        );
    }

    #[test]
    fn test_data_frames() {
        assert_eq!(class("EOD"), FrameClass::Data { terminal: true });
        for word in ["BOD", "DM", "D", "DC", "CN"] {
            assert_eq!(class(word), FrameClass::Data { terminal: false }, "{word}");
        }
    }

    #[test]
    fn test_other_frames() {
        assert_eq!(class("S"), FrameClass::Status);
        assert_eq!(class("P"), FrameClass::Status);
        assert_eq!(class("E"), FrameClass::Error);
        assert_eq!(class("XYZ"), FrameClass::Unsupported);
    }
}
