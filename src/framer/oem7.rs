use tracing::{debug, trace};

use super::{crc32, format_tag, Frame, Framer, FramerRead};
use crate::error::{Error, Result};
use crate::source::ByteSource;

const SYNC1: u8 = 0xaa;
const SYNC2: u8 = 0x44;
const SYNC3_LONG: u8 = 0x12;
const SYNC3_SHORT: u8 = 0x13;
const ASCII_SYNC: u8 = b'#';
const ABBREV_SYNC: u8 = b'<';

const CRC_LEN: usize = 4;
/// Fixed short binary header: sync(3), length, id, week, milliseconds.
const SHORT_HEADER_LEN: usize = 12;
/// Bytes of long binary header needed before the total frame length is known.
const LONG_HEADER_MIN: usize = 10;
/// Length of the hex checksum spelled after '*' in an ASCII frame.
const ASCII_CRC_LEN: usize = 8;

fn is_sync(b: u8) -> bool {
    b == SYNC1 || b == ASCII_SYNC || b == ABBREV_SYNC
}

fn is_ascii_body(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// One step of the scan state machine.
enum Scan {
    Frame(Frame),
    /// A synced candidate frame failed validation; drop `drop` bytes and
    /// report the attempt so the caller can observe the discard.
    Bad { drop: usize, reason: &'static str },
    /// More bytes are required to make a decision.
    Incomplete,
}

/// Framing engine for the OEM7 wire protocol.
///
/// Recognizes the four OEM7 framings:
///
/// * long binary: sync `AA 44 12`, variable-length header carrying the
///   message id, message-type byte, and payload length, CRC-32 trailer;
/// * short binary: sync `AA 44 13`, fixed 12-byte header, CRC-32 trailer;
/// * ASCII: `#` through `*XXXXXXXX<CR><LF>` with the CRC-32 of the body
///   spelled in hex;
/// * abbreviated ASCII: `<` through `<CR><LF>`, no checksum. Bodies
///   beginning `OK` or `ERROR` are receiver command responses.
///
/// Non-protocol bytes between frames are skipped silently. A complete
/// candidate failing its checksum or structurally invalid is discarded and
/// the scan resumes just past its sync byte; the engine never fails on
/// garbage input.
pub struct Oem7Framer<S: ByteSource> {
    source: S,
    /// Unconsumed stream bytes.
    buf: Vec<u8>,
    eos: bool,
    read_chunk: usize,
    max_frame_len: usize,
}

impl<S: ByteSource> Oem7Framer<S> {
    pub const DEFAULT_READ_CHUNK: usize = 1024;
    pub const DEFAULT_MAX_FRAME_LEN: usize = 128 * 1024;

    /// Creates a framer over `source` with default limits.
    pub fn new(source: S) -> Self {
        Oem7Framer {
            source,
            buf: Vec::new(),
            eos: false,
            read_chunk: Self::DEFAULT_READ_CHUNK,
            max_frame_len: Self::DEFAULT_MAX_FRAME_LEN,
        }
    }

    pub fn builder(source: S) -> Oem7FramerBuilder<S> {
        Oem7FramerBuilder {
            source,
            read_chunk: Self::DEFAULT_READ_CHUNK,
            max_frame_len: Self::DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// The wrapped byte source, e.g. to query a
    /// [`ReadSource::last_error`](crate::ReadSource::last_error).
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Pull one chunk from the source into the scan buffer, returning the
    /// number of bytes obtained.
    fn pull(&mut self) -> usize {
        let mut chunk = vec![0u8; self.read_chunk];
        let got = self.source.fill(&mut chunk);
        if got.eos {
            self.eos = true;
        }
        let len = got.len.min(chunk.len());
        self.buf.extend_from_slice(&chunk[..len]);
        len
    }

    /// Advance the scan as far as the buffered bytes allow.
    fn scan(&mut self) -> Scan {
        loop {
            // Bytes that cannot start a frame are not protocol data
            let skip = self
                .buf
                .iter()
                .position(|&b| is_sync(b))
                .unwrap_or(self.buf.len());
            if skip > 0 {
                trace!(count = skip, "skipping non-protocol bytes");
                self.buf.drain(..skip);
            }

            let Some(&lead) = self.buf.first() else {
                return Scan::Incomplete;
            };
            let zult = match lead {
                SYNC1 => self.scan_binary(),
                ASCII_SYNC => self.scan_ascii(),
                _ => self.scan_abbrev(),
            };
            match zult {
                Some(scan) => return scan,
                // A stray sync byte inside garbage; drop it and rescan
                None => {
                    self.buf.drain(..1);
                }
            }
        }
    }

    fn scan_binary(&mut self) -> Option<Scan> {
        if self.buf.len() < 3 {
            return Some(Scan::Incomplete);
        }
        if self.buf[1] != SYNC2 || (self.buf[2] != SYNC3_LONG && self.buf[2] != SYNC3_SHORT) {
            return None;
        }

        let short = self.buf[2] == SYNC3_SHORT;
        let (header_len, payload_len) = if short {
            if self.buf.len() < SHORT_HEADER_LEN {
                return Some(Scan::Incomplete);
            }
            (SHORT_HEADER_LEN, self.buf[3] as usize)
        } else {
            if self.buf.len() < LONG_HEADER_MIN {
                return Some(Scan::Incomplete);
            }
            let header_len = self.buf[3] as usize;
            if header_len < LONG_HEADER_MIN {
                return Some(Scan::Bad {
                    drop: 3,
                    reason: "header length too small",
                });
            }
            let payload_len = u16::from_le_bytes([self.buf[8], self.buf[9]]) as usize;
            (header_len, payload_len)
        };

        let total = header_len + payload_len + CRC_LEN;
        if total > self.max_frame_len {
            return Some(Scan::Bad {
                drop: 3,
                reason: "frame exceeds max length",
            });
        }
        if self.buf.len() < total {
            return Some(Scan::Incomplete);
        }

        let want = u32::from_le_bytes([
            self.buf[total - 4],
            self.buf[total - 3],
            self.buf[total - 2],
            self.buf[total - 1],
        ]);
        if crc32(&self.buf[..total - CRC_LEN]) != want {
            return Some(Scan::Bad {
                drop: 3,
                reason: "checksum mismatch",
            });
        }

        let message_id = u32::from(u16::from_le_bytes([self.buf[4], self.buf[5]]));
        // Bit 7 of the message-type byte marks a command response
        let response = !short && self.buf[6] & 0x80 != 0;
        let data: Vec<u8> = self.buf.drain(..total).collect();
        Some(Scan::Frame(Frame {
            response,
            format_tag: if short {
                format_tag::SHORT_BINARY
            } else {
                format_tag::BINARY
            },
            message_id,
            data,
        }))
    }

    fn scan_ascii(&mut self) -> Option<Scan> {
        // Body runs from after '#' to the '*' introducing the checksum
        let mut star = None;
        for (i, &b) in self.buf.iter().enumerate().skip(1) {
            if b == b'*' {
                star = Some(i);
                break;
            }
            if !is_ascii_body(b) {
                return None;
            }
            if i > self.max_frame_len {
                return Some(Scan::Bad {
                    drop: 1,
                    reason: "unterminated ascii frame",
                });
            }
        }
        let Some(star) = star else {
            if self.buf.len() > self.max_frame_len {
                return Some(Scan::Bad {
                    drop: 1,
                    reason: "unterminated ascii frame",
                });
            }
            return Some(Scan::Incomplete);
        };

        let total = star + 1 + ASCII_CRC_LEN + 2;
        if self.buf.len() < total {
            return Some(Scan::Incomplete);
        }
        if &self.buf[total - 2..total] != b"\r\n" {
            return Some(Scan::Bad {
                drop: 1,
                reason: "missing ascii terminator",
            });
        }
        let want = match std::str::from_utf8(&self.buf[star + 1..star + 1 + ASCII_CRC_LEN])
            .ok()
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        {
            Some(want) => want,
            None => {
                return Some(Scan::Bad {
                    drop: 1,
                    reason: "bad checksum digits",
                })
            }
        };
        if crc32(&self.buf[1..star]) != want {
            return Some(Scan::Bad {
                drop: 1,
                reason: "checksum mismatch",
            });
        }

        let data: Vec<u8> = self.buf.drain(..total).collect();
        Some(Scan::Frame(Frame {
            response: false,
            format_tag: format_tag::ASCII,
            // ASCII logs identify messages by name, not id
            message_id: 0,
            data,
        }))
    }

    fn scan_abbrev(&mut self) -> Option<Scan> {
        for (i, &b) in self.buf.iter().enumerate().skip(1) {
            if b == b'\n' {
                if self.buf[i - 1] != b'\r' {
                    return None;
                }
                let body = &self.buf[1..i - 1];
                let response = body.starts_with(b"OK") || body.starts_with(b"ERROR");
                let data: Vec<u8> = self.buf.drain(..=i).collect();
                return Some(Scan::Frame(Frame {
                    response,
                    format_tag: format_tag::ABBREVIATED_ASCII,
                    message_id: 0,
                    data,
                }));
            }
            if b != b'\r' && !is_ascii_body(b) {
                return None;
            }
            if i > self.max_frame_len {
                return Some(Scan::Bad {
                    drop: 1,
                    reason: "unterminated abbreviated ascii frame",
                });
            }
        }
        if self.buf.len() > self.max_frame_len {
            return Some(Scan::Bad {
                drop: 1,
                reason: "unterminated abbreviated ascii frame",
            });
        }
        Some(Scan::Incomplete)
    }
}

impl<S: ByteSource> Framer for Oem7Framer<S> {
    fn read_frame(&mut self) -> FramerRead {
        loop {
            match self.scan() {
                Scan::Frame(frame) => return FramerRead::frame(frame),
                Scan::Bad { drop, reason } => {
                    debug!(reason, dropped = drop, "discarding bad frame");
                    self.buf.drain(..drop);
                    return FramerRead::pending();
                }
                Scan::Incomplete => {
                    if self.eos {
                        if self.buf.is_empty() {
                            return FramerRead::end();
                        }
                        // No more bytes are coming, so this candidate can
                        // never complete. Drop its lead byte and rescan the
                        // remainder for complete frames behind it.
                        self.buf.drain(..1);
                    } else if self.pull() == 0 && !self.eos {
                        // Source momentarily dry; report rather than spin
                        return FramerRead::pending();
                    }
                }
            }
        }
    }
}

/// Configures an [Oem7Framer].
pub struct Oem7FramerBuilder<S: ByteSource> {
    source: S,
    read_chunk: usize,
    max_frame_len: usize,
}

impl<S: ByteSource> Oem7FramerBuilder<S> {
    /// Bytes requested from the source per pull.
    pub fn read_chunk(mut self, len: usize) -> Self {
        self.read_chunk = len;
        self
    }

    /// Longest frame accepted before the candidate is discarded as garbage.
    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// # Errors
    /// [`Error::Config`] when a limit is out of range.
    pub fn build(self) -> Result<Oem7Framer<S>> {
        if self.read_chunk == 0 {
            return Err(Error::Config("read_chunk must be non-zero".into()));
        }
        if self.max_frame_len < 256 {
            return Err(Error::Config("max_frame_len must be at least 256".into()));
        }
        Ok(Oem7Framer {
            source: self.source,
            buf: Vec::new(),
            eos: false,
            read_chunk: self.read_chunk,
            max_frame_len: self.max_frame_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crate::source::SourceRead;

    use super::*;

    /// Serves scripted chunks, then end-of-stream. An empty chunk models a
    /// momentarily dry source.
    struct ChunkSource {
        chunks: VecDeque<Vec<u8>>,
    }

    impl ChunkSource {
        fn new<I: IntoIterator<Item = Vec<u8>>>(chunks: I) -> Self {
            ChunkSource {
                chunks: chunks.into_iter().collect(),
            }
        }

        fn whole(dat: Vec<u8>) -> Self {
            Self::new([dat])
        }
    }

    impl ByteSource for ChunkSource {
        fn fill(&mut self, buf: &mut [u8]) -> SourceRead {
            let Some(mut chunk) = self.chunks.pop_front() else {
                return SourceRead::end();
            };
            let n = chunk.len().min(buf.len());
            buf[..n].copy_from_slice(&chunk[..n]);
            if n < chunk.len() {
                self.chunks.push_front(chunk.split_off(n));
            }
            SourceRead::bytes(n)
        }
    }

    fn long_binary(id: u16, response: bool, payload: &[u8]) -> Vec<u8> {
        let mut dat = vec![SYNC1, SYNC2, SYNC3_LONG, 28];
        dat.extend_from_slice(&id.to_le_bytes());
        dat.push(if response { 0x80 } else { 0x00 });
        dat.push(0x20); // port
        dat.extend_from_slice(&u16::try_from(payload.len()).unwrap().to_le_bytes());
        dat.resize(28, 0);
        dat.extend_from_slice(payload);
        let crc = crc32(&dat);
        dat.extend_from_slice(&crc.to_le_bytes());
        dat
    }

    fn short_binary(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut dat = vec![SYNC1, SYNC2, SYNC3_SHORT, u8::try_from(payload.len()).unwrap()];
        dat.extend_from_slice(&id.to_le_bytes());
        dat.resize(SHORT_HEADER_LEN, 0);
        dat.extend_from_slice(payload);
        let crc = crc32(&dat);
        dat.extend_from_slice(&crc.to_le_bytes());
        dat
    }

    fn ascii_frame(body: &str) -> Vec<u8> {
        format!("#{body}*{:08x}\r\n", crc32(body.as_bytes())).into_bytes()
    }

    fn read_all<S: ByteSource>(framer: &mut Oem7Framer<S>) -> Vec<Frame> {
        let mut frames = Vec::new();
        loop {
            let got = framer.read_frame();
            if let Some(frame) = got.frame {
                frames.push(frame);
            }
            if got.eos {
                return frames;
            }
        }
    }

    #[test]
    fn long_binary_frame() {
        let dat = long_binary(42, false, &[1, 2, 3, 4]);
        let expected_len = dat.len();
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let got = framer.read_frame();
        let frame = got.frame.expect("expected a frame");
        assert!(!got.eos);
        assert_eq!(frame.message_id, 42);
        assert!(!frame.response);
        assert_eq!(frame.format_tag, format_tag::BINARY);
        assert_eq!(frame.data.len(), expected_len);

        assert!(framer.read_frame().eos);
    }

    #[test]
    fn long_binary_response_flag() {
        let dat = long_binary(1, true, b"OK");
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let frame = framer.read_frame().frame.expect("expected a frame");
        assert!(frame.response);
    }

    #[test]
    fn short_binary_frame() {
        let dat = short_binary(620, &[9; 8]);
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let frame = framer.read_frame().frame.expect("expected a frame");
        assert_eq!(frame.message_id, 620);
        assert_eq!(frame.format_tag, format_tag::SHORT_BINARY);
        assert_eq!(frame.data.len(), SHORT_HEADER_LEN + 8 + CRC_LEN);
    }

    #[test]
    fn ascii_frame_with_valid_crc() {
        let dat = ascii_frame("BESTPOSA,COM1,0,83.5;SOL_COMPUTED,SINGLE");
        let expected = dat.clone();
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let frame = framer.read_frame().frame.expect("expected a frame");
        assert_eq!(frame.format_tag, format_tag::ASCII);
        assert_eq!(frame.message_id, 0);
        assert!(!frame.response);
        assert_eq!(frame.data, expected);
    }

    #[test]
    fn abbreviated_ascii_log_and_response() {
        let mut dat = b"<BESTPOS COM1 0 83.5 FINESTEERING\r\n".to_vec();
        dat.extend_from_slice(b"<OK\r\n");
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let log = framer.read_frame().frame.expect("expected log frame");
        assert_eq!(log.format_tag, format_tag::ABBREVIATED_ASCII);
        assert!(!log.response);

        let rsp = framer.read_frame().frame.expect("expected response frame");
        assert!(rsp.response);
        assert_eq!(rsp.data, b"<OK\r\n");
    }

    #[test]
    fn garbage_before_frame_is_skipped_in_one_attempt() {
        let mut dat = b"\x00\x01\x02 not a frame \x7f\x10".to_vec();
        dat.extend_from_slice(&long_binary(7, false, &[0xab; 16]));
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let frame = framer.read_frame().frame.expect("expected a frame");
        assert_eq!(frame.message_id, 7);
    }

    #[test]
    fn corrupt_checksum_is_discarded_then_scan_resumes() {
        let mut bad = long_binary(10, false, &[1; 4]);
        let last = bad.len() - 1;
        bad[last] ^= 0xff;
        let good = long_binary(11, false, &[2; 4]);

        let mut dat = bad;
        dat.extend_from_slice(&good);
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        // First attempt reports the discard with no frame
        let got = framer.read_frame();
        assert!(got.frame.is_none());
        assert!(!got.eos);

        // The good frame still comes out
        let frames = read_all(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 11);
    }

    #[test]
    fn frame_split_across_many_pulls() {
        let dat = long_binary(301, false, &[5; 64]);
        let expected_len = dat.len();
        let chunks: Vec<Vec<u8>> = dat.chunks(7).map(<[u8]>::to_vec).collect();
        let mut framer = Oem7Framer::builder(ChunkSource::new(chunks))
            .read_chunk(7)
            .build()
            .unwrap();

        let frame = framer.read_frame().frame.expect("expected a frame");
        assert_eq!(frame.message_id, 301);
        assert_eq!(frame.data.len(), expected_len);
    }

    #[test]
    fn dry_source_reports_pending_not_end() {
        let mut framer = Oem7Framer::new(ChunkSource::new([
            Vec::new(),
            Vec::new(),
            long_binary(2, false, &[3; 4]),
        ]));

        let got = framer.read_frame();
        assert!(got.frame.is_none());
        assert!(!got.eos, "a dry source must not end the stream");

        let got = framer.read_frame();
        assert!(got.frame.is_none());
        assert!(!got.eos);

        let frame = framer.read_frame().frame.expect("expected a frame");
        assert_eq!(frame.message_id, 2);
    }

    #[test]
    fn partial_frame_at_end_of_stream_is_dropped() {
        let dat = long_binary(5, false, &[1; 32]);
        let truncated = dat[..dat.len() - 10].to_vec();
        let mut framer = Oem7Framer::new(ChunkSource::whole(truncated));

        let got = framer.read_frame();
        assert!(got.frame.is_none());
        assert!(got.eos);
    }

    #[test]
    fn stray_sync_bytes_do_not_stall_the_scan() {
        // 0xaa, '#', and '<' sprinkled through garbage, then a real frame
        let mut dat = vec![SYNC1, 0x00, ASCII_SYNC, 0x07, ABBREV_SYNC, 0x01, SYNC1, SYNC2];
        dat.extend_from_slice(&short_binary(33, &[6; 4]));
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let frames = read_all(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 33);
    }

    #[test]
    fn truncated_candidate_does_not_swallow_trailing_frames() {
        // A false sync claiming a 64 KiB payload, then a real frame, then EOF
        let mut dat = vec![SYNC1, SYNC2, SYNC3_LONG, 28, 0, 0, 0, 0, 0xff, 0xff];
        dat.extend_from_slice(&short_binary(44, &[3; 4]));
        let mut framer = Oem7Framer::new(ChunkSource::whole(dat));

        let frames = read_all(&mut framer);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_id, 44);
    }

    #[test]
    fn read_after_end_stays_ended() {
        let mut framer = Oem7Framer::new(ChunkSource::new([]));

        assert!(framer.read_frame().eos);
        assert!(framer.read_frame().eos);
    }

    #[test]
    fn oversize_frame_is_discarded() {
        // Claims a 4 KiB payload against a 256 byte limit
        let dat = long_binary(99, false, &[0; 4096]);
        let mut framer = Oem7Framer::builder(ChunkSource::whole(dat))
            .max_frame_len(256)
            .build()
            .unwrap();

        let got = framer.read_frame();
        assert!(got.frame.is_none());
        let frames = read_all(&mut framer);
        assert!(frames.is_empty());
    }

    #[test]
    fn builder_rejects_bad_limits() {
        let zult = Oem7Framer::builder(ChunkSource::new([])).read_chunk(0).build();
        assert!(matches!(zult, Err(Error::Config(_))));

        let zult = Oem7Framer::builder(ChunkSource::new([]))
            .max_frame_len(16)
            .build();
        assert!(matches!(zult, Err(Error::Config(_))));
    }
}
