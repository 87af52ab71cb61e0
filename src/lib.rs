//! NovAtel OEM7 GNSS receiver stream decoding.
//!
//! OEM7 receivers emit a continuous stream of binary and ASCII framed
//! messages over serial, TCP, or captured to file. This crate locates and
//! validates complete frames in such a stream and hands each one to the
//! caller as an immutable [RawMessage] carrying its classification
//! (type, format, numeric id) and the raw framed bytes.
//!
//! The layering is deliberately thin:
//!
//! * [ByteSource] is the pull capability the caller supplies; any
//!   `std::io::Read` can be used via [ReadSource].
//! * [Framer] is the engine seam performing synchronization, checksum
//!   validation, and frame extraction. [Oem7Framer] is the bundled engine
//!   for the OEM7 wire protocol.
//! * [Decoder] drives a framer and wraps each frame as a [RawMessage],
//!   reporting stream liveness alongside every read.
//!
//! Payload field interpretation (the per-log record layouts) is out of
//! scope; consumers decode [`RawMessage::data`] themselves.
//!
//! # Example
//! ```
//! use oem7::{Decoder, MessageFormat, MessageType, Oem7Framer, ReadSource};
//!
//! // A receiver command response in abbreviated ASCII framing
//! let stream: &[u8] = b"<OK\r\n";
//! let mut decoder = Decoder::new(Oem7Framer::new(ReadSource::new(stream)));
//!
//! let got = decoder.read_message();
//! let msg = got.message.unwrap();
//! assert_eq!(msg.message_type(), MessageType::Response);
//! assert_eq!(msg.format(), MessageFormat::AbbreviatedAscii);
//! ```
//!
//! Decoding a capture file:
//! ```no_run
//! let mut decoder = oem7::Decoder::from_path("oem7.gps").unwrap();
//! for msg in decoder.messages() {
//!     println!("{msg}");
//! }
//! ```

mod decoder;
mod error;
mod framer;
mod message;
mod source;

pub use decoder::{framer_version, Decoder, FileDecoder, MessageRead, Messages, Version};
pub use error::{Error, Result};
pub use framer::{crc32, format_tag, Frame, Framer, FramerRead, Oem7Framer, Oem7FramerBuilder};
pub use message::{MessageFormat, MessageType, RawMessage};
pub use source::{ByteSource, ReadSource, SourceRead};
