
//! The frame header codec.
//!
//! Every frame starts with a 16-byte base header. Whenever the method word
//! records a preprocessing stage or an entropy encoder, five extended bytes
//! follow carrying the parameters a decoder needs. All fields are packed
//! MSB-first into the big-endian byte stream:
//!
//! ```text
//! offset  bits  field
//!      0     1  version_flag (1 = in-development version numbering)
//!      0    15  version_id
//!      2    24  compressed_size (total frame bytes incl. header and checksum)
//!      5    24  original_size (packed input bytes)
//!      8    48  identifier
//!     14     8  sequence_number
//!     15     4  method.preprocessing
//!     15     1  method.checksum_enabled
//!     15     3  method.encoder_type
//!     16     8  model_rate        (extended)
//!     17    16  encoder_param     (extended)
//!     19    24  encoder_outlier   (extended, post-clamp)
//! ```

use crate::bitstream::BitstreamWriter;
use crate::compress::{EncoderKind, Preprocessing};
use crate::error::{Error, Result};
use bit_field::BitField;
use lebe::prelude::*;


/// Size of the base compression header in bytes.
pub const HDR_SIZE: u32 = 16;

/// Size of the extended compression header in bytes.
pub const EXT_HDR_SIZE: u32 = 5;

/// Size of the base plus the extended compression header in bytes.
pub const HDR_MAX_SIZE: u32 = HDR_SIZE + EXT_HDR_SIZE;

/// Maximum value of the 24-bit compressed-size field.
pub const MAX_COMPRESSED_SIZE: u32 = (1 << 24) - 1;

/// Maximum value of the 24-bit original-size field.
pub const MAX_ORIGINAL_SIZE: u32 = (1 << 24) - 1;

/// Maximum value of the 48-bit identifier field.
pub(crate) const MAX_IDENTIFIER: u64 = (1 << 48) - 1;

const MAX_VERSION_ID: u16 = (1 << 15) - 1;


/// Decoded form of a frame header.
///
/// This is not the on-disk format; [`Header::deserialize`] converts from the
/// packed representation described in the module documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Set when the emitting library used in-development version numbering.
    pub version_flag: bool,
    /// Version number of the emitting library.
    pub version_id: u16,
    /// Total frame size in bytes, including headers and checksum trailer.
    pub compressed_size: u32,
    /// Packed size of the compressed input in bytes.
    pub original_size: u32,
    /// 48-bit stamp identifying the model lineage since the last reset.
    pub identifier: u64,
    /// Index of this pass since the last reset.
    pub sequence_number: u8,

    /// Preprocessing stage of this pass.
    pub preprocessing: Preprocessing,
    /// Whether the frame ends with a checksum trailer.
    pub checksum_enabled: bool,
    /// Entropy encoder of this pass.
    pub encoder_type: EncoderKind,

    /// Model adaptation rate; zero unless the pass used MODEL preprocessing.
    pub model_rate: u32,
    /// Encoder parameter; zero unless the pass used a Golomb encoder.
    pub encoder_param: u32,
    /// Effective outlier threshold; zero unless the pass used a Golomb encoder.
    pub encoder_outlier: u32,
}

impl Header {
    /// Whether the five extended-header bytes are present.
    pub fn has_extension(&self) -> bool {
        self.preprocessing != Preprocessing::None
            || self.encoder_type != EncoderKind::Uncompressed
    }

    /// Serialized size of this header in bytes.
    pub fn size(&self) -> u32 {
        if self.has_extension() { HDR_MAX_SIZE } else { HDR_SIZE }
    }

    /// Byte offset of the payload bitstream within the frame.
    pub fn payload_offset(&self) -> u32 {
        self.size()
    }

    /// Writes the packed header into the bitstream.
    /// Returns the serialized size in bytes.
    pub(crate) fn serialize(&self, stream: &mut BitstreamWriter<'_>) -> Result<u32> {
        if self.compressed_size > MAX_COMPRESSED_SIZE {
            return Err(Error::HdrCmpSizeTooLarge);
        }
        if self.original_size > MAX_ORIGINAL_SIZE {
            return Err(Error::HdrOriginalTooLarge);
        }
        if self.identifier > MAX_IDENTIFIER || self.version_id > MAX_VERSION_ID {
            return Err(Error::IntHdr);
        }

        let mut version = 0_u16;
        version.set_bit(15, self.version_flag);
        version.set_bits(0 .. 15, self.version_id);

        let mut method = 0_u8;
        method.set_bits(4 .. 8, self.preprocessing as u8);
        method.set_bit(3, self.checksum_enabled);
        method.set_bits(0 .. 3, self.encoder_type as u8);

        stream.add_bits32(u32::from(version), 16)?;
        stream.add_bits32(self.compressed_size, 24)?;
        stream.add_bits32(self.original_size, 24)?;
        stream.add_bits64(self.identifier, 48)?;
        stream.add_bits32(u32::from(self.sequence_number), 8)?;
        stream.add_bits32(u32::from(method), 8)?;

        if self.has_extension() {
            if self.model_rate > 0xFF
                || self.encoder_param > 0xFFFF
                || self.encoder_outlier > 0xFF_FFFF {
                return Err(Error::IntHdr);
            }

            stream.add_bits32(self.model_rate, 8)?;
            stream.add_bits32(self.encoder_param, 16)?;
            stream.add_bits32(self.encoder_outlier, 24)?;
        }

        Ok(self.size())
    }

    /// Parses a packed header from the start of `src`.
    pub fn deserialize(src: &[u8]) -> Result<Header> {
        if src.len() < HDR_SIZE as usize {
            return Err(Error::IntHdr);
        }

        let mut read = src;
        let version = u16::read_from_big_endian(&mut read).map_err(|_| Error::IntHdr)?;
        let compressed_size = read_u24(&mut read)?;
        let original_size = read_u24(&mut read)?;
        let identifier = read_u48(&mut read)?;
        let sequence_number = read_u8(&mut read)?;
        let method = read_u8(&mut read)?;

        let preprocessing = Preprocessing::from_code(method.get_bits(4 .. 8))
            .ok_or(Error::IntHdr)?;
        let encoder_type = EncoderKind::from_code(method.get_bits(0 .. 3))
            .ok_or(Error::IntHdr)?;

        let mut header = Header {
            version_flag: version.get_bit(15),
            version_id: version.get_bits(0 .. 15),
            compressed_size,
            original_size,
            identifier,
            sequence_number,
            preprocessing,
            checksum_enabled: method.get_bit(3),
            encoder_type,
            model_rate: 0,
            encoder_param: 0,
            encoder_outlier: 0,
        };

        if header.has_extension() {
            if src.len() < HDR_MAX_SIZE as usize {
                return Err(Error::IntHdr);
            }

            header.model_rate = u32::from(read_u8(&mut read)?);
            header.encoder_param =
                u32::from(u16::read_from_big_endian(&mut read).map_err(|_| Error::IntHdr)?);
            header.encoder_outlier = read_u24(&mut read)?;
        }

        Ok(header)
    }
}


fn read_u8(read: &mut impl std::io::Read) -> Result<u8> {
    u8::read_from_big_endian(read).map_err(|_| Error::IntHdr)
}

fn read_u24(read: &mut impl std::io::Read) -> Result<u32> {
    let mut value = 0_u32;
    for _ in 0 .. 3 {
        value = value << 8 | u32::from(read_u8(read)?);
    }
    Ok(value)
}

fn read_u48(read: &mut impl std::io::Read) -> Result<u64> {
    let mut value = 0_u64;
    for _ in 0 .. 6 {
        value = value << 8 | u64::from(read_u8(read)?);
    }
    Ok(value)
}
