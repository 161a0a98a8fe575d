
//! The optional frame checksum trailer.

use crate::samples::Samples;
use std::hash::Hasher;
use twox_hash::XxHash32;


/// Seed value used for initializing the checksum computation, arbitrarily chosen.
pub(crate) const CHECKSUM_SEED: u32 = 419764627;

/// Size of the optional trailing checksum in bytes.
pub const CHECKSUM_SIZE: u32 = 4;


/// Computes the 32-bit checksum of a sample stream.
///
/// Each sample is fed to the hash in big-endian byte order, making the value
/// independent of the host endianness. When `checksum_enabled` is set, this
/// value over the original input forms the last four bytes of the frame; a
/// decoder recomputes it from the reconstructed samples for verification.
pub fn checksum(samples: Samples<'_>) -> u32 {
    let mut hasher = XxHash32::with_seed(CHECKSUM_SEED);

    for i in 0 .. samples.sample_count() {
        hasher.write(&(samples.get(i) as u16).to_be_bytes());
    }

    hasher.finish() as u32
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deterministic_and_input_sensitive() {
        let base = checksum(Samples::U16(&[1, 2, 3]));

        assert_eq!(base, checksum(Samples::U16(&[1, 2, 3])));
        assert_ne!(base, checksum(Samples::U16(&[1, 2, 4])));
        assert_ne!(base, checksum(Samples::U16(&[1, 2])));
    }

    #[test]
    fn flavors_hash_identically() {
        let from_u16 = checksum(Samples::U16(&[0x00FF, 0xFF00, 0xABCD]));
        let from_i16 = checksum(Samples::I16(&[0x00FF, 0xFF00_u16 as i16, 0xABCD_u16 as i16]));
        let from_i32 = checksum(Samples::I16InI32(&[0x00FF, 0x7FFF_FF00, 0x5555_ABCD]));

        assert_eq!(from_u16, from_i16);
        assert_eq!(from_u16, from_i32);
    }
}
