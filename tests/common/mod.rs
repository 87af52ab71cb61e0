//! Builders for OEM7 frames used across the integration tests.

use oem7::crc32;

/// Long binary frame with the standard 28-byte header.
pub fn long_binary(id: u16, response: bool, payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xaa, 0x44, 0x12, 28];
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

/// Short binary frame with the fixed 12-byte header.
pub fn short_binary(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut dat = vec![0xaa, 0x44, 0x13, u8::try_from(payload.len()).unwrap()];
    dat.extend_from_slice(&id.to_le_bytes());
    dat.resize(12, 0);
    dat.extend_from_slice(payload);
    let crc = crc32(&dat);
    dat.extend_from_slice(&crc.to_le_bytes());
    dat
}

/// ASCII frame `#<body>*<crc><CR><LF>`.
pub fn ascii_frame(body: &str) -> Vec<u8> {
    let crc = crc32(body.as_bytes());
    let mut dat = format!("#{body}*").into_bytes();
    dat.extend_from_slice(hex::encode(crc.to_be_bytes()).as_bytes());
    dat.extend_from_slice(b"\r\n");
    dat
}

/// Abbreviated ASCII frame `<<body><CR><LF>`.
pub fn abbrev_frame(body: &str) -> Vec<u8> {
    format!("<{body}\r\n").into_bytes()
}

/// Garbage bytes guaranteed not to contain a frame sync character, so a
/// scan consumes them without ever attempting a candidate frame.
pub fn quiet_garbage(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 0x20) as u8).collect()
}
