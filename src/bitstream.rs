
//! Big-endian MSB-first bitstream writer.
//!
//! Bits are collected in a 64-bit cache whose high-order end holds the
//! unflushed data; whenever a write fills the cache, eight bytes are stored
//! big-endian to the output and the new value seeds the cache. Errors are
//! sticky: after the first failure every further write is a no-op that
//! reports the same error, until the writer is re-created.

use crate::error::{Error, Result};
use lebe::prelude::*;


/// Destination buffers must be aligned to this many bytes.
pub const DST_ALIGNMENT: usize = std::mem::size_of::<u64>();


/// A bit sink over a caller-supplied byte buffer.
#[derive(Debug)]
pub struct BitstreamWriter<'a> {
    /// Local bit cache; unflushed bits live at the high-order end.
    cache: u64,
    /// Bit capacity left in the cache, always in `1..=64`.
    bit_capacity: u32,
    bytes: &'a mut [u8],
    /// Number of fully stored bytes.
    position: usize,
    /// Sticky error state.
    status: Result<()>,
}

impl<'a> BitstreamWriter<'a> {
    /// Starts a new bitstream at the beginning of `dst`,
    /// which has to be 8-byte aligned.
    pub fn new(dst: &'a mut [u8]) -> Result<Self> {
        if dst.as_ptr().align_offset(DST_ALIGNMENT) != 0 {
            return Err(Error::DstUnaligned);
        }

        Ok(BitstreamWriter {
            cache: 0,
            bit_capacity: 64,
            bytes: dst,
            position: 0,
            status: Ok(()),
        })
    }

    /// The first error that occurred on this writer, if any.
    pub fn status(&self) -> Result<()> {
        self.status
    }

    /// Appends the low `count` bits of `value`, most significant bit first.
    /// `count` must not exceed 32 and all bits of `value` above `count` must
    /// be zero.
    pub fn add_bits32(&mut self, value: u32, count: u32) -> Result<()> {
        self.status?;

        if count > 32 || (count < 32 && value >> count != 0) {
            return self.poison(Error::IntBitstream);
        }

        // fast path: the bits fit into the current cache
        if count < self.bit_capacity {
            self.cache = (self.cache << count) | u64::from(value);
            self.bit_capacity -= count;
            return Ok(());
        }

        // slow path: the cache fills up and is stored as eight bytes
        if self.bytes.len() - self.position < 8 {
            return self.poison(Error::DstTooSmall);
        }

        let filled = (self.cache << self.bit_capacity)
            | (u64::from(value) >> (count - self.bit_capacity));

        let mut target = &mut self.bytes[self.position .. self.position + 8];
        if target.write_as_big_endian(&filled).is_err() {
            return self.poison(Error::IntBitstream);
        }

        self.position += 8;
        self.cache = u64::from(value);
        self.bit_capacity += 64 - count;
        Ok(())
    }

    /// Same as [`BitstreamWriter::add_bits32`] but for up to 64 bits.
    pub fn add_bits64(&mut self, value: u64, count: u32) -> Result<()> {
        if count <= 32 {
            self.add_bits32(value as u32, count)
        }
        else {
            self.add_bits32((value >> 32) as u32, count - 32)?;
            self.add_bits32(value as u32, 32)
        }
    }

    /// Total bytes the stream occupies so far, including cached bits that
    /// have not been stored yet.
    pub fn size(&self) -> Result<u32> {
        self.status?;
        Ok(self.position as u32 + (64 - self.bit_capacity + 7) / 8)
    }

    /// Stores the remaining cached bits, padding the final byte with zero
    /// bits on the least significant side. Returns the total number of bytes
    /// written since the start of the buffer.
    pub fn flush(&mut self) -> Result<u32> {
        self.status?;

        let mut cursor = self.position;
        let remaining_bytes = (64 - self.bit_capacity + 7) / 8;

        if remaining_bytes != 0 {
            let mut shifted = self.cache << self.bit_capacity;

            for _ in 0 .. remaining_bytes {
                if cursor >= self.bytes.len() {
                    self.status = Err(Error::DstTooSmall);
                    return Err(Error::DstTooSmall);
                }

                self.bytes[cursor] = (shifted >> 56) as u8;
                shifted <<= 8;
                cursor += 1;
            }
        }

        Ok(cursor as u32)
    }

    fn poison(&mut self, error: Error) -> Result<()> {
        self.status = Err(error);
        self.status
    }
}
