//! Frame extraction from OEM7 receiver byte streams.

mod crc32;
mod oem7;

pub use crc32::crc32;
pub use oem7::{Oem7Framer, Oem7FramerBuilder};

/// Frame format tags as reported in a [Frame] descriptor.
///
/// Values above [`ABBREVIATED_ASCII`](format_tag::ABBREVIATED_ASCII) are
/// unassigned; classification maps them to
/// [`MessageFormat::Unknown`](crate::MessageFormat::Unknown).
pub mod format_tag {
    pub const BINARY: u8 = 0;
    pub const SHORT_BINARY: u8 = 1;
    pub const ASCII: u8 = 2;
    pub const ABBREVIATED_ASCII: u8 = 3;
}

/// Flattened descriptor for one complete, checksum-validated frame.
///
/// `data` holds the entire framed message, sync bytes through checksum, in
/// a buffer owned exclusively by this descriptor. Ownership passes to the
/// [RawMessage](crate::RawMessage) built from it; the producing engine must
/// not retain any reference.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Response flag: set for receiver command responses, clear for logs.
    pub response: bool,
    /// Raw format tag, see [format_tag].
    pub format_tag: u8,
    /// Numeric message id, 0 where the framing carries none.
    pub message_id: u32,
    /// Complete framed message bytes.
    pub data: Vec<u8>,
}

/// Outcome of one framing attempt.
#[derive(Debug)]
pub struct FramerRead {
    pub frame: Option<Frame>,
    /// True once the underlying byte source is permanently exhausted.
    pub eos: bool,
}

impl FramerRead {
    /// A complete frame was extracted.
    #[must_use]
    pub fn frame(frame: Frame) -> Self {
        FramerRead {
            frame: Some(frame),
            eos: false,
        }
    }

    /// No frame this attempt, stream still open. Covers both "waiting for
    /// bytes" and "garbage or a bad frame was discarded"; callers retry.
    #[must_use]
    pub fn pending() -> Self {
        FramerRead {
            frame: None,
            eos: false,
        }
    }

    /// The byte source is exhausted; no frame will ever be produced again.
    #[must_use]
    pub fn end() -> Self {
        FramerRead {
            frame: None,
            eos: true,
        }
    }
}

/// A framing engine: locates, validates, and extracts complete frames from
/// a byte stream.
///
/// Implementations must tolerate non-protocol bytes between frames rather
/// than fail, and must report end-of-stream distinctly from "no frame yet".
/// A single call performs at most one framing attempt: it returns when a
/// frame is complete, when bytes were discarded (checksum failure, garbage),
/// when the source is momentarily dry, or at end-of-stream.
pub trait Framer {
    fn read_frame(&mut self) -> FramerRead;
}
