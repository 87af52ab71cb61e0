use crc::{Algorithm, Crc};

/// CRC-32 variant used by OEM7 receivers: reflected polynomial 0xEDB88320
/// with zero initial value and zero final xor.
const OEM7_CRC: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x04c1_1db7,
    init: 0,
    refin: true,
    refout: true,
    xorout: 0,
    check: 0x2dfd_2d88,
    residue: 0,
};

const CRC: Crc<u32> = Crc::<u32>::new(&OEM7_CRC);

/// Checksum over a candidate frame, as appended to binary frames and spelled
/// in hex at the tail of ASCII frames.
#[must_use]
pub fn crc32(dat: &[u8]) -> u32 {
    CRC.checksum(dat)
}
