use std::io::{self, ErrorKind, Read};

use tracing::warn;

/// Result of one pull from a [ByteSource].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRead {
    /// Number of bytes placed at the front of the caller's buffer.
    pub len: usize,
    /// True once the source is permanently closed. No bytes will ever be
    /// available again after this is reported.
    pub eos: bool,
}

impl SourceRead {
    /// `len` bytes were produced and the stream remains open.
    #[must_use]
    pub fn bytes(len: usize) -> Self {
        SourceRead { len, eos: false }
    }

    /// The stream is permanently closed.
    #[must_use]
    pub fn end() -> Self {
        SourceRead { len: 0, eos: true }
    }
}

/// A pull-style byte stream feeding a framing engine.
///
/// This is the single capability a caller must provide to decode a receiver
/// stream. The contract is deliberately narrow:
///
/// * `fill` copies up to `buf.len()` bytes into the front of `buf` and
///   reports how many were actually obtained, `0 <= len <= buf.len()`.
/// * A zero-length read with `eos == false` means the source is momentarily
///   dry, not closed; the engine will ask again.
/// * Closure or failure is reported as `eos == true`, never raised. Any
///   retry or reconnect policy belongs to the source itself.
/// * Blocking behavior and timeouts are the source's own; this layer
///   imposes none.
pub trait ByteSource {
    fn fill(&mut self, buf: &mut [u8]) -> SourceRead;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn fill(&mut self, buf: &mut [u8]) -> SourceRead {
        (**self).fill(buf)
    }
}

/// [ByteSource] adapter over any `std::io::Read`, e.g. a file, TCP stream,
/// or serial port handle.
///
/// A clean EOF and a read error both map to end-of-stream, matching the
/// [ByteSource] contract that failure is a return value. The terminating
/// error, if there was one, is retained and available from
/// [`last_error`](ReadSource::last_error) for diagnostics.
pub struct ReadSource<R: Read> {
    reader: R,
    error: Option<io::Error>,
    closed: bool,
}

impl<R: Read> ReadSource<R> {
    pub fn new(reader: R) -> Self {
        ReadSource {
            reader,
            error: None,
            closed: false,
        }
    }

    /// The error that closed the stream, if closure was not a clean EOF.
    #[must_use]
    pub fn last_error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn fill(&mut self, buf: &mut [u8]) -> SourceRead {
        if self.closed {
            return SourceRead::end();
        }
        if buf.is_empty() {
            return SourceRead::bytes(0);
        }
        loop {
            match self.reader.read(buf) {
                Ok(0) => {
                    self.closed = true;
                    return SourceRead::end();
                }
                Ok(n) => return SourceRead::bytes(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => {
                    warn!(%err, "byte source failed, treating as end of stream");
                    self.error = Some(err);
                    self.closed = true;
                    return SourceRead::end();
                }
            }
        }
    }
}
