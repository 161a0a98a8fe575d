
//! The entropy encoders.
//!
//! Residuals are mapped to unsigned values by zig-zag interleaving, then
//! written either raw, or as a truncated Golomb code with one of two escape
//! conventions for values whose codeword would grow too long: GOLOMB_ZERO
//! reserves the zero codeword as escape marker followed by a raw sample,
//! GOLOMB_MULTI reserves several escape symbols, each announcing a different
//! raw-suffix width.

use super::EncoderKind;
use crate::bitstream::BitstreamWriter;
use crate::error::{Error, Result};


/// Number of bits of an uncompressed sample.
const BITS_PER_SAMPLE: u32 = 16;

/// No Golomb codeword may exceed this many bits.
const MAX_CODEWORD_BITS: u32 = 32;

/// Worst case bits per encoded sample: a maximum-length codeword followed by
/// a raw sample.
const MAX_BITS_PER_SAMPLE: u32 = MAX_CODEWORD_BITS + BITS_PER_SAMPLE;

/// Smallest valid Golomb parameter.
pub(crate) const MIN_GOLOMB_PAR: u32 = 1;

/// Largest valid Golomb parameter.
pub(crate) const MAX_GOLOMB_PAR: u32 = u16::MAX as u32;


/// Worst case payload size in bytes for `src_size` bytes of samples, with
/// every sample encoded as a maximum escape.
pub(crate) fn max_compressed_size(src_size: u32) -> u64 {
    let sample_count = (u64::from(src_size) * 8).div_ceil(u64::from(BITS_PER_SAMPLE));
    (sample_count * u64::from(MAX_BITS_PER_SAMPLE)).div_ceil(8)
}


/// The per-pass entropy encoder state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Encoder {
    kind: EncoderKind,
    g_par: u32,
    /// Precomputed `⌊log2(g_par)⌋`.
    g_par_log2: u32,
    /// Mapped values from this threshold onwards take the escape path.
    outlier: u32,
}

impl Encoder {
    /// Prepares an encoder, deriving and clamping the outlier threshold.
    pub fn new(kind: EncoderKind, encoder_param: u32, outlier: u32) -> Result<Encoder> {
        let mut encoder = Encoder { kind, g_par: 0, g_par_log2: 0, outlier: 0 };

        match kind {
            EncoderKind::Uncompressed => {}

            EncoderKind::GolombZero | EncoderKind::GolombMulti => {
                if !(MIN_GOLOMB_PAR ..= MAX_GOLOMB_PAR).contains(&encoder_param) {
                    return Err(Error::ParamsInvalid);
                }
                encoder.g_par = encoder_param;
                encoder.g_par_log2 = encoder_param.ilog2();

                encoder.outlier = match kind {
                    EncoderKind::GolombZero => optimal_outlier_zero(encoder_param),
                    _ => outlier,
                };

                // never Golomb-encode a value whose codeword would overflow
                encoder.outlier = encoder.outlier.min(golomb_upper_bound(encoder_param, kind));
                if encoder.outlier == 0 {
                    return Err(Error::ParamsInvalid);
                }
            }
        }

        Ok(encoder)
    }

    /// Validates encoder parameters without keeping the state.
    pub fn params_check(kind: EncoderKind, encoder_param: u32, outlier: u32) -> Result<()> {
        Encoder::new(kind, encoder_param, outlier).map(|_| ())
    }

    /// The outlier threshold actually in effect, recorded in the frame header.
    pub fn outlier(&self) -> u32 {
        self.outlier
    }

    /// Encodes one signed 16-bit residual into the bitstream.
    pub fn encode(&self, value: i16, stream: &mut BitstreamWriter<'_>) -> Result<()> {
        match self.kind {
            EncoderKind::Uncompressed => {
                stream.add_bits32(u32::from(value as u16), BITS_PER_SAMPLE)
            }

            EncoderKind::GolombZero => {
                let mapped = map_to_unsigned(value);

                if mapped < self.outlier {
                    // shifted by one to keep the zero codeword free as escape symbol
                    self.golomb_encode(mapped + 1, stream)
                }
                else {
                    // an encoded zero announces that the raw mapped sample follows
                    self.golomb_encode(0, stream)?;
                    stream.add_bits32(mapped, BITS_PER_SAMPLE)
                }
            }

            EncoderKind::GolombMulti => {
                let mapped = map_to_unsigned(value);

                if mapped < self.outlier {
                    self.golomb_encode(mapped, stream)
                }
                else {
                    // the escape level selects how many raw bit pairs carry the excess
                    let excess = mapped - self.outlier;
                    let level = if excess < 4 { 0 } else { excess.ilog2() / 2 };

                    self.golomb_encode(self.outlier + level, stream)?;
                    stream.add_bits32(excess, (level + 1) * 2)
                }
            }
        }
    }

    /// Forms a codeword according to the truncated Golomb code.
    /// `value` must stay below `golomb_upper_bound`.
    fn golomb_encode(&self, value: u32, stream: &mut BitstreamWriter<'_>) -> Result<()> {
        let cutoff = (2 << self.g_par_log2) - self.g_par; // members in group 0

        if value < cutoff {
            return stream.add_bits32(value, self.g_par_log2 + 1);
        }

        let group_num = (value - cutoff) / self.g_par;
        let remainder = (value - cutoff) - group_num * self.g_par;
        let suffix_len = self.g_par_log2 + 1;

        let unary_code = (1_u64 << group_num) - 1;
        let codeword = (unary_code << (suffix_len + 1)) + u64::from(cutoff * 2 + remainder);
        let length = suffix_len + 1 + group_num;

        stream.add_bits64(codeword, length)
    }
}


/// Maps a signed 16-bit value to an unsigned one, interleaving negatives
/// with positives: 0 → 0, −1 → 1, 1 → 2, −2 → 3, …
///
/// Golomb codes only work on unsigned values; this keeps small magnitudes
/// small regardless of sign.
fn map_to_unsigned(value: i16) -> u32 {
    let wide = i32::from(value);
    ((wide << 1) ^ (wide >> 15)) as u32 & 0xFFFF
}

/// The first value whose Golomb codeword would exceed the maximum codeword
/// length, reduced by the reserved escape symbols for the MULTI variant.
/// Returns 0 when no value is encodable.
fn golomb_upper_bound(g_par: u32, kind: EncoderKind) -> u32 {
    if !(MIN_GOLOMB_PAR ..= MAX_GOLOMB_PAR).contains(&g_par) {
        return 0;
    }

    let cutoff = (2 << g_par.ilog2()) - g_par;

    // A group-g codeword is g + 1 unary bits plus ilog2(g_par) + 1 suffix
    // bits; the first group that no longer fits the codeword limit is:
    let first_invalid_group = MAX_CODEWORD_BITS + 1 - (g_par.ilog2() + 2);
    let first_invalid_value = cutoff + first_invalid_group * g_par;

    if kind == EncoderKind::GolombMulti {
        let escape_symbols = (BITS_PER_SAMPLE + 1) / 2;
        if first_invalid_value <= escape_symbols {
            return 0;
        }
        return first_invalid_value - escape_symbols;
    }

    first_invalid_value
}

/// The lowest mapped value from which the zero-escape encoding is shorter
/// than its Golomb codeword: the last member of group `BITS_PER_SAMPLE − 1`,
/// `cutoff + BITS_PER_SAMPLE · g_par − 1`.
fn optimal_outlier_zero(g_par: u32) -> u32 {
    let cutoff = u64::from((2_u32 << g_par.ilog2()) - g_par);
    let outlier = cutoff + u64::from(BITS_PER_SAMPLE) * u64::from(g_par) - 1;

    outlier.min(u64::from(u32::MAX)) as u32
}


#[cfg(test)]
mod test {
    use super::*;

    fn encode_all(encoder: &Encoder, values: &[i16]) -> Vec<u8> {
        let mut storage = vec![0_u64; 8];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut storage);

        let mut stream = BitstreamWriter::new(&mut bytes[..]).unwrap();
        for &value in values {
            encoder.encode(value, &mut stream).unwrap();
        }
        let written = stream.flush().unwrap() as usize;

        bytes[.. written].to_vec()
    }

    #[test]
    fn zigzag_interleaves_signs() {
        assert_eq!(map_to_unsigned(0), 0);
        assert_eq!(map_to_unsigned(-1), 1);
        assert_eq!(map_to_unsigned(1), 2);
        assert_eq!(map_to_unsigned(-2), 3);
        assert_eq!(map_to_unsigned(i16::MAX), 0xFFFE);
        assert_eq!(map_to_unsigned(i16::MIN), 0xFFFF);
    }

    #[test]
    fn golomb_zero_encodes_small_values() {
        let encoder = Encoder::new(EncoderKind::GolombZero, 1, 0).unwrap();
        assert_eq!(encode_all(&encoder, &[-1, 1]), [0xDC]);
    }

    #[test]
    fn golomb_zero_escapes_outliers() {
        let encoder = Encoder::new(EncoderKind::GolombZero, 1, 0).unwrap();
        assert_eq!(encode_all(&encoder, &[-9]), [0x00, 0x08, 0x80]);
    }

    #[test]
    fn golomb_parameter_selects_the_group_size() {
        let encoder = Encoder::new(EncoderKind::GolombZero, 10, 0).unwrap();
        assert_eq!(encode_all(&encoder, &[0, -10]), [0x1C, 0x00]);
    }

    #[test]
    fn golomb_multi_escape_levels() {
        let encoder = Encoder::new(EncoderKind::GolombMulti, 1, 5).unwrap();
        assert_eq!(encoder.outlier(), 5);
        // 0 → codeword "0"; 2 → mapped 4 → "11110"
        assert_eq!(encode_all(&encoder, &[0, 2]), [0x78]);
    }

    #[test]
    fn zero_escape_outlier_is_derived_from_the_parameter() {
        assert_eq!(Encoder::new(EncoderKind::GolombZero, 1, 0).unwrap().outlier(), 16);
        assert_eq!(Encoder::new(EncoderKind::GolombZero, 10, 0).unwrap().outlier(), 165);
    }

    #[test]
    fn multi_escape_outlier_is_clamped_to_the_codeword_bound() {
        // m = 1: bound 32, minus 8 reserved escape symbols
        let encoder = Encoder::new(EncoderKind::GolombMulti, 1, u32::MAX).unwrap();
        assert_eq!(encoder.outlier(), 24);
    }

    /// Codeword length of `value` under parameter `g_par`.
    fn codeword_length(g_par: u32, value: u32) -> u32 {
        let log2 = g_par.ilog2();
        let cutoff = (2 << log2) - g_par;

        if value < cutoff { log2 + 1 }
        else { (value - cutoff) / g_par + log2 + 2 }
    }

    #[test]
    fn codeword_length_never_exceeds_the_bound() {
        for g_par in [1_u32, 2, 3, 7, 100, 255, 4096, 65535] {
            // the largest value the zero-escape variant Golomb-encodes is the
            // outlier itself (a non-outlier mapped value shifted by one)
            let zero = Encoder::new(EncoderKind::GolombZero, g_par, 0).unwrap();
            assert!(codeword_length(g_par, zero.outlier()) <= MAX_CODEWORD_BITS);

            // the multi-escape variant encodes up to outlier + 7 escape symbols
            let multi = Encoder::new(EncoderKind::GolombMulti, g_par, u32::MAX).unwrap();
            assert!(codeword_length(g_par, multi.outlier() + 7) <= MAX_CODEWORD_BITS);
        }
    }

    #[test]
    fn invalid_golomb_parameters_are_rejected() {
        assert!(Encoder::new(EncoderKind::GolombZero, 0, 0).is_err());
        assert!(Encoder::new(EncoderKind::GolombZero, MAX_GOLOMB_PAR + 1, 0).is_err());
        assert!(Encoder::new(EncoderKind::GolombMulti, 1, 0).is_err()); // outlier clamps to zero
        assert!(Encoder::new(EncoderKind::Uncompressed, MAX_GOLOMB_PAR + 1, 0).is_ok());
    }

    #[test]
    fn uncompressed_writes_the_raw_bit_pattern() {
        let encoder = Encoder::new(EncoderKind::Uncompressed, 0, 0).unwrap();
        assert_eq!(encode_all(&encoder, &[1, -5]), [0x00, 0x01, 0xFF, 0xFB]);
    }
}
