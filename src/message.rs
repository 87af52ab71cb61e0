use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::framer::{format_tag, Frame};

/// Message category: a receiver log or a command response.
///
/// Derived from the response flag on the underlying frame. `Unknown` is
/// reserved for descriptors carrying no type information at all; frames
/// produced by a [Framer](crate::Framer) always classify as `Log` or
/// `Response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MessageType {
    Log,
    Response,
    Unknown,
}

impl Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Log => write!(f, "LOG"),
            MessageType::Response => write!(f, "RESPONSE"),
            MessageType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Wire framing format of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MessageFormat {
    Binary,
    ShortHeaderBinary,
    Ascii,
    AbbreviatedAscii,
    Unknown,
}

impl MessageFormat {
    /// Classify an engine format tag.
    ///
    /// Total over all tag values: an unrecognized tag yields `Unknown`,
    /// never an error. An unknown-but-decodable frame must not abort the
    /// stream.
    #[must_use]
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            format_tag::BINARY => MessageFormat::Binary,
            format_tag::SHORT_BINARY => MessageFormat::ShortHeaderBinary,
            format_tag::ASCII => MessageFormat::Ascii,
            format_tag::ABBREVIATED_ASCII => MessageFormat::AbbreviatedAscii,
            _ => MessageFormat::Unknown,
        }
    }
}

impl Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFormat::Binary => write!(f, "BINARY"),
            MessageFormat::ShortHeaderBinary => write!(f, "SHORT_BINARY"),
            MessageFormat::Ascii => write!(f, "ASCII"),
            MessageFormat::AbbreviatedAscii => write!(f, "ABB_ASCII"),
            MessageFormat::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// One fully framed receiver message and its classification.
///
/// Created exactly once per successfully framed message and immutable after
/// construction. The message bytes are owned exclusively; no two messages
/// alias the same buffer and the framer retains no reference to it.
#[derive(Debug, Clone)]
pub struct RawMessage {
    message_type: MessageType,
    format: MessageFormat,
    message_id: u32,
    data: Vec<u8>,
}

impl From<Frame> for RawMessage {
    fn from(frame: Frame) -> Self {
        let message_type = if frame.response {
            MessageType::Response
        } else {
            MessageType::Log
        };
        RawMessage {
            message_type,
            format: MessageFormat::from_tag(frame.format_tag),
            message_id: frame.message_id,
            data: frame.data,
        }
    }
}

impl RawMessage {
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    #[must_use]
    pub fn format(&self) -> MessageFormat {
        self.format
    }

    /// Numeric message id, opaque to this layer. Zero when the framing
    /// format does not carry one (ASCII framings identify messages by name).
    #[must_use]
    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    /// Complete framed message bytes, header and checksum included.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RawMessage{{type: {}, format: {}, id: {}, len: {}}}",
            self.message_type,
            self.format,
            self.message_id,
            self.data.len()
        )
    }
}
