use std::fmt::{self, Display};
use std::fs::File;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::framer::{Framer, Oem7Framer};
use crate::message::RawMessage;
use crate::source::{ByteSource, ReadSource};

/// Semantic version of the bundled framing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Revision of the bundled [Oem7Framer] engine, for diagnostics and logging.
#[must_use]
pub fn framer_version() -> Version {
    Version {
        major: 10,
        minor: 2,
        patch: 0,
    }
}

/// Outcome of a single [`Decoder::read_message`] call.
#[derive(Debug)]
pub struct MessageRead {
    /// The message produced by this attempt, if any.
    pub message: Option<RawMessage>,
    /// False once the stream is permanently exhausted. A call may yield no
    /// message while this stays true; retry in that case.
    pub stream_alive: bool,
}

/// Decodes a receiver byte stream into [RawMessage]s.
///
/// A decoder is bound to exactly one framing engine, and through it one byte
/// source, for its whole lifetime; decode a new source by constructing a new
/// decoder. Each [`read_message`](Decoder::read_message) call performs one
/// synchronous framing attempt on the caller's thread. There is no internal
/// queue and no thread-safety guarantee across concurrent calls; drive one
/// decoder from one logical reader.
///
/// No error type crosses this API: every abnormal condition reduces to
/// either "no message this call" or "stream ended". Discarded garbage and
/// checksum failures are reported via `tracing` by the engine, and sources
/// such as [ReadSource] retain their terminating error for inspection
/// through [`framer`](Decoder::framer).
pub struct Decoder<F: Framer> {
    framer: F,
    eos: bool,
}

/// Decoder over a capture file using the bundled engine.
pub type FileDecoder = Decoder<Oem7Framer<ReadSource<File>>>;

impl FileDecoder {
    /// Creates a decoder over a file containing a captured receiver stream.
    ///
    /// # Errors
    /// [`Error::Io`](crate::Error::Io) when the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<FileDecoder> {
        let file = File::open(path)?;
        Ok(Decoder::new(Oem7Framer::new(ReadSource::new(file))))
    }
}

impl<S: ByteSource> Decoder<Oem7Framer<S>> {
    /// Creates a decoder over `source` using the bundled OEM7 engine.
    pub fn from_source(source: S) -> Self {
        Decoder::new(Oem7Framer::new(source))
    }
}

impl<F: Framer> Decoder<F> {
    pub fn new(framer: F) -> Self {
        Decoder { framer, eos: false }
    }

    /// The owned framing engine, e.g. for source diagnostics.
    pub fn framer(&self) -> &F {
        &self.framer
    }

    /// Attempt to read one message.
    ///
    /// Returns the message, if a complete frame was extracted, along with
    /// the stream-liveness flag. `stream_alive == false` is terminal: every
    /// subsequent call returns it again without touching the engine, and no
    /// further message will ever be produced. A `None` message with
    /// `stream_alive == true` is the transient no-data case (garbage or a
    /// bad frame was discarded, or the source is momentarily dry) and the
    /// caller should retry.
    pub fn read_message(&mut self) -> MessageRead {
        if self.eos {
            return MessageRead {
                message: None,
                stream_alive: false,
            };
        }
        let got = self.framer.read_frame();
        if got.eos {
            self.eos = true;
        }
        MessageRead {
            message: got.frame.map(RawMessage::from),
            stream_alive: !self.eos,
        }
    }

    /// Iterator over the remaining messages in the stream.
    ///
    /// Retries transient no-data internally and ends at end-of-stream, so it
    /// spins on a source that stalls without ever closing; intended for
    /// finite or terminating sources.
    pub fn messages(&mut self) -> Messages<'_, F> {
        Messages { decoder: self }
    }
}

/// Created by [`Decoder::messages`].
pub struct Messages<'a, F: Framer> {
    decoder: &'a mut Decoder<F>,
}

impl<F: Framer> Iterator for Messages<'_, F> {
    type Item = RawMessage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let got = self.decoder.read_message();
            if let Some(msg) = got.message {
                return Some(msg);
            }
            if !got.stream_alive {
                return None;
            }
        }
    }
}
