
//! Incremental sample compression.
//!
//! A [`Context`] compresses successive equally-sized sample buffers into
//! self-contained frames. The first pass after a reset is a *primary* pass
//! using the primary parameter set; up to `secondary_iterations` consecutive
//! passes after it are *secondary* passes using the secondary set, then the
//! cycle restarts with a fresh identifier. The secondary stage may
//! difference against an adaptive model kept in the caller-supplied work
//! buffer, which a primary pass seeds with its raw samples.
//!
//! Each pass runs preprocessor → entropy encoder → bitstream, emits the
//! frame header with the final size patched in, and optionally appends a
//! checksum trailer. With the uncompressed fallback enabled, a pass whose
//! encoding does not beat the raw representation is re-emitted uncompressed.

mod encoder;
mod preprocess;

pub use preprocess::MAX_MODEL_RATE;

use crate::bitstream::{BitstreamWriter, DST_ALIGNMENT};
use crate::checksum::{checksum, CHECKSUM_SIZE};
use crate::error::{Error, Result};
use crate::header::{Header, HDR_MAX_SIZE, HDR_SIZE, MAX_COMPRESSED_SIZE, MAX_ORIGINAL_SIZE};
use crate::samples::Samples;
use crate::timestamp;

use encoder::Encoder;
use preprocess::Preprocessor;


/// Highest number of secondary passes per cycle; bounded by the 8-bit
/// sequence-number field of the frame header.
const MAX_SECONDARY_ITERATIONS: u32 = u8::MAX as u32;

/// Guards against use of a deinitialised context.
const CONTEXT_MAGIC: u32 = 0x4149_5253;


/// Preprocessing applied before entropy encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preprocessing {
    /// Samples pass through unchanged.
    #[default]
    None = 0,

    /// First-order difference to the previous sample,
    /// wrapping in 16-bit arithmetic.
    Diff = 1,

    /// Multi-level integer wavelet transform over the whole buffer.
    Iwt = 2,

    /// Difference against the adaptive model carried across passes.
    /// Only valid for the secondary stage.
    Model = 3,
}

impl Preprocessing {
    pub(crate) fn from_code(code: u8) -> Option<Preprocessing> {
        match code {
            0 => Some(Preprocessing::None),
            1 => Some(Preprocessing::Diff),
            2 => Some(Preprocessing::Iwt),
            3 => Some(Preprocessing::Model),
            _ => None,
        }
    }

    fn needs_work_buf(self) -> bool {
        matches!(self, Preprocessing::Iwt | Preprocessing::Model)
    }
}


/// The entropy encoder for the residuals of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderKind {
    /// Residuals are written as raw 16-bit values.
    #[default]
    Uncompressed = 0,

    /// Golomb code; the zero codeword escapes into a raw sample.
    GolombZero = 1,

    /// Golomb code with multiple escape symbols of graded raw-suffix widths.
    GolombMulti = 2,
}

impl EncoderKind {
    pub(crate) fn from_code(code: u8) -> Option<EncoderKind> {
        match code {
            0 => Some(EncoderKind::Uncompressed),
            1 => Some(EncoderKind::GolombZero),
            2 => Some(EncoderKind::GolombMulti),
            _ => None,
        }
    }
}


/// The complete compression configuration.
///
/// The all-zero default means: no preprocessing, no entropy coding, no
/// secondary stage, no checksum, no fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Params {
    /// Preprocessing of primary passes. MODEL is not allowed here.
    pub primary_preprocessing: Preprocessing,
    /// Entropy encoder of primary passes.
    pub primary_encoder_type: EncoderKind,
    /// Golomb divisor of primary passes, in `1..=65535` for Golomb encoders.
    pub primary_encoder_param: u32,
    /// Outlier threshold of primary passes; only the multi-escape encoder
    /// reads it.
    pub primary_encoder_outlier: u32,

    /// How many consecutive passes after a primary pass use the secondary
    /// parameters, at most 255. Zero disables the secondary stage entirely.
    pub secondary_iterations: u32,
    /// Preprocessing of secondary passes.
    pub secondary_preprocessing: Preprocessing,
    /// Entropy encoder of secondary passes.
    pub secondary_encoder_type: EncoderKind,
    /// Golomb divisor of secondary passes.
    pub secondary_encoder_param: u32,
    /// Outlier threshold of secondary passes.
    pub secondary_encoder_outlier: u32,

    /// Exponential blend between the previous model and the new sample,
    /// in `0..=16`: 0 replaces the model, 16 freezes it.
    pub model_rate: u32,

    /// Appends a 4-byte checksum of the input samples to every frame.
    pub checksum_enabled: bool,

    /// Re-emits a pass uncompressed whenever its encoding is not smaller
    /// than the raw representation.
    pub uncompressed_fallback_enabled: bool,
}

impl Params {
    /// Minimum size in bytes of the compression work buffer for `src_size`
    /// bytes of samples, over all configured stages. Zero when none of the
    /// stages needs a work buffer.
    pub fn work_buf_size(&self, src_size: u32) -> Result<u32> {
        self.validate()?;

        let primary = preprocess::work_buf_size(self.primary_preprocessing, src_size);
        let secondary = if self.secondary_iterations > 0 {
            preprocess::work_buf_size(self.secondary_preprocessing, src_size)
        }
        else { 0 };

        Ok(primary.max(secondary))
    }

    fn validate(&self) -> Result<()> {
        if self.primary_preprocessing == Preprocessing::Model {
            return Err(Error::ParamsInvalid); // the first pass has no model yet
        }
        if self.secondary_iterations > MAX_SECONDARY_ITERATIONS {
            return Err(Error::ParamsInvalid);
        }

        Encoder::params_check(
            self.primary_encoder_type,
            self.primary_encoder_param,
            self.primary_encoder_outlier,
        )?;

        // secondary values are ignored while the secondary stage is disabled
        if self.secondary_iterations > 0 {
            Encoder::params_check(
                self.secondary_encoder_type,
                self.secondary_encoder_param,
                self.secondary_encoder_outlier,
            )?;

            if self.secondary_preprocessing == Preprocessing::Model
                && self.model_rate > MAX_MODEL_RATE {
                return Err(Error::ParamsInvalid);
            }
        }

        Ok(())
    }

    fn requires_work_buf(&self) -> bool {
        self.primary_preprocessing.needs_work_buf()
            || (self.secondary_iterations > 0 && self.secondary_preprocessing.needs_work_buf())
    }

    fn model_active(&self) -> bool {
        self.secondary_iterations > 0
            && self.secondary_preprocessing == Preprocessing::Model
    }
}


/// Upper bound on the frame size for any valid parameters over `src_size`
/// bytes of samples: worst-case header, every sample as a maximum escape,
/// and the checksum trailer. Useful for sizing destination buffers.
pub fn compress_bound(src_size: u32) -> Result<u32> {
    if src_size > MAX_ORIGINAL_SIZE {
        return Err(Error::HdrOriginalTooLarge);
    }

    let bound = u64::from(HDR_MAX_SIZE)
        + encoder::max_compressed_size(src_size)
        + u64::from(CHECKSUM_SIZE);

    if bound > u64::from(MAX_COMPRESSED_SIZE) {
        return Err(Error::HdrCmpSizeTooLarge);
    }

    Ok(bound as u32)
}

/// Frame size of the uncompressed representation of `src_size` bytes of
/// samples. With the uncompressed fallback enabled, no emitted frame is
/// larger than this.
pub fn uncompressed_bound(src_size: u32) -> Result<u32> {
    if src_size > MAX_ORIGINAL_SIZE {
        return Err(Error::HdrOriginalTooLarge);
    }

    let bound = u64::from(HDR_MAX_SIZE) + u64::from(src_size) + u64::from(CHECKSUM_SIZE);

    if bound > u64::from(MAX_COMPRESSED_SIZE) {
        return Err(Error::HdrCmpSizeTooLarge);
    }

    Ok(bound as u32)
}


/// The parameter set one pass actually runs with.
#[derive(Debug, Clone, Copy)]
struct PassMethod {
    preprocessing: Preprocessing,
    encoder_type: EncoderKind,
    encoder_param: u32,
    encoder_outlier: u32,
}

impl PassMethod {
    /// The method of the uncompressed fallback frame.
    const RAW: PassMethod = PassMethod {
        preprocessing: Preprocessing::None,
        encoder_type: EncoderKind::Uncompressed,
        encoder_param: 0,
        encoder_outlier: 0,
    };
}


/// Maintains the state of an ongoing compression process.
///
/// The context borrows the work buffer for its whole lifetime, so the buffer
/// cannot be touched between passes. All other buffers are supplied per
/// call.
///
/// # Examples
///
/// ```
/// use airspace::prelude::*;
///
/// let params = Params::default(); // uncompressed passthrough
/// let mut frame = [0_u64; 8]; // destinations must be 8-byte aligned
/// let frame_bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut frame);
///
/// let mut context = Context::initialise(&params, None)?;
/// let frame_size = context.compress_u16(frame_bytes, &[7, 7, 7, 8])?;
/// assert_eq!(frame_size, 16 + 8);
/// # Ok::<(), Error>(())
/// ```
#[derive(Debug)]
pub struct Context<'buf> {
    magic: u32,
    params: Params,
    work_buf: Option<&'buf mut [u8]>,
    /// Input size of the first pass since the last reset, in bytes.
    model_size: u32,
    identifier: u64,
    sequence_number: u8,
}

impl<'buf> Context<'buf> {
    /// Validates the parameters and prepares a fresh context.
    ///
    /// `work_buf` is required whenever a configured stage needs one (see
    /// [`Params::work_buf_size`]); it must be 8-byte aligned and live as
    /// long as the context.
    pub fn initialise(params: &Params, work_buf: Option<&'buf mut [u8]>) -> Result<Context<'buf>> {
        params.validate()?;

        if params.requires_work_buf() {
            let buffer = work_buf.as_deref().ok_or(Error::WorkBufNull)?;

            if buffer.as_ptr().align_offset(DST_ALIGNMENT) != 0 {
                return Err(Error::WorkBufUnaligned);
            }
            if buffer.is_empty() {
                return Err(Error::WorkBufTooSmall);
            }
        }

        Ok(Context {
            magic: CONTEXT_MAGIC,
            params: *params,
            work_buf,
            model_size: 0,
            identifier: timestamp::next_identifier()?,
            sequence_number: 0,
        })
    }

    /// Compresses a buffer of unsigned 16-bit samples.
    /// See [`Context::compress`].
    pub fn compress_u16(&mut self, dst: &mut [u8], src: &[u16]) -> Result<u32> {
        self.compress(dst, Samples::U16(src))
    }

    /// Compresses a buffer of signed 16-bit samples.
    /// See [`Context::compress`].
    pub fn compress_i16(&mut self, dst: &mut [u8], src: &[i16]) -> Result<u32> {
        self.compress(dst, Samples::I16(src))
    }

    /// Compresses a buffer of 16-bit samples carried in the low half of each
    /// `i32`. The header's `original_size` records the packed size, two
    /// bytes per sample. See [`Context::compress`].
    pub fn compress_i16_in_i32(&mut self, dst: &mut [u8], src: &[i32]) -> Result<u32> {
        self.compress(dst, Samples::I16InI32(src))
    }

    /// Performs one compression pass over `samples` and returns the size of
    /// the emitted frame in bytes.
    ///
    /// `dst` must be 8-byte aligned; [`compress_bound`] is always a
    /// sufficient capacity. While the secondary stage differences against
    /// the model, every pass must supply as many samples as the first pass
    /// after the last reset.
    pub fn compress(&mut self, dst: &mut [u8], samples: Samples<'_>) -> Result<u32> {
        if self.magic != CONTEXT_MAGIC {
            return Err(Error::ContextInvalid);
        }

        let src_size = samples.packed_size()?;

        let is_primary = self.sequence_number == 0
            || u32::from(self.sequence_number) > self.params.secondary_iterations;

        if is_primary {
            self.reset()?;
            self.model_size = src_size;
        }
        else if self.params.secondary_preprocessing == Preprocessing::Model
            && src_size != self.model_size {
            return Err(Error::SrcSizeMismatch);
        }

        let mut method = if is_primary {
            PassMethod {
                preprocessing: self.params.primary_preprocessing,
                encoder_type: self.params.primary_encoder_type,
                encoder_param: self.params.primary_encoder_param,
                encoder_outlier: self.params.primary_encoder_outlier,
            }
        }
        else {
            PassMethod {
                preprocessing: self.params.secondary_preprocessing,
                encoder_type: self.params.secondary_encoder_type,
                encoder_param: self.params.secondary_encoder_param,
                encoder_outlier: self.params.secondary_encoder_outlier,
            }
        };

        // the work buffer must hold this pass and the model lineage
        let mut needed = preprocess::work_buf_size(method.preprocessing, src_size);
        if self.params.model_active() {
            needed = needed.max(preprocess::work_buf_size(Preprocessing::Model, src_size));
        }
        if needed > 0 {
            let buffer = self.work_buf.as_deref().ok_or(Error::WorkBufNull)?;
            if buffer.len() < needed as usize {
                return Err(Error::WorkBufTooSmall);
            }
        }

        let mut encoded = self.encode_pass(&mut *dst, samples, src_size, method);

        if self.params.uncompressed_fallback_enabled {
            let raw_frame_size = HDR_SIZE + src_size;
            let bloated = match encoded {
                Ok(size) => size >= raw_frame_size,
                Err(Error::DstTooSmall) => true,
                Err(_) => false,
            };

            if bloated {
                method = PassMethod::RAW;
                encoded = self.encode_pass(&mut *dst, samples, src_size, method);
            }
        }

        let payload_end = encoded?;
        let compressed_size = payload_end
            + if self.params.checksum_enabled { CHECKSUM_SIZE } else { 0 };

        if compressed_size > MAX_COMPRESSED_SIZE {
            return Err(Error::HdrCmpSizeTooLarge);
        }

        if self.params.checksum_enabled {
            let trailer = payload_end as usize .. compressed_size as usize;
            if dst.len() < trailer.end {
                return Err(Error::DstTooSmall);
            }
            dst[trailer].copy_from_slice(&checksum(samples).to_be_bytes());
        }

        // the header went out with a zeroed size field; overwrite the header
        // region now that the final frame size is known
        self.patch_header(dst, src_size, method, compressed_size)?;

        if is_primary && self.params.model_active() {
            preprocess::seed_model(self.work_buf.as_deref_mut(), samples, src_size)?;
        }

        self.sequence_number = self.sequence_number.wrapping_add(1);
        Ok(compressed_size)
    }

    /// Restarts the pass cycle: the next pass is a primary pass of a new
    /// model lineage with a fresh identifier.
    pub fn reset(&mut self) -> Result<()> {
        if self.magic != CONTEXT_MAGIC {
            return Err(Error::ContextInvalid);
        }

        self.identifier = timestamp::next_identifier()?;
        self.sequence_number = 0;
        self.model_size = 0;
        Ok(())
    }

    /// Invalidates the context; all later operations fail with
    /// [`Error::ContextInvalid`]. Optional, dropping the context is
    /// equivalent.
    pub fn deinitialise(&mut self) {
        self.magic = 0;
        self.model_size = 0;
        self.identifier = 0;
        self.sequence_number = 0;
    }

    /// Emits one frame with a zeroed compressed-size field.
    /// Returns the bytes written: header plus byte-padded payload.
    fn encode_pass(
        &mut self,
        dst: &mut [u8],
        samples: Samples<'_>,
        src_size: u32,
        method: PassMethod,
    ) -> Result<u32> {
        let mut stream = BitstreamWriter::new(dst)?;
        let encoder = Encoder::new(method.encoder_type, method.encoder_param, method.encoder_outlier)?;

        self.frame_header(method, encoder.outlier(), src_size, 0)
            .serialize(&mut stream)?;

        let mut preprocessor = Preprocessor::init(
            method.preprocessing,
            samples,
            self.work_buf.as_deref_mut(),
            self.params.model_rate,
            src_size,
        )?;

        for i in 0 .. samples.sample_count() {
            let residual = preprocessor.process(i, samples);
            encoder.encode(residual, &mut stream)?;
        }

        stream.flush()
    }

    fn patch_header(
        &self,
        dst: &mut [u8],
        src_size: u32,
        method: PassMethod,
        compressed_size: u32,
    ) -> Result<()> {
        let encoder = Encoder::new(method.encoder_type, method.encoder_param, method.encoder_outlier)?;
        let header = self.frame_header(method, encoder.outlier(), src_size, compressed_size);

        let mut stream = BitstreamWriter::new(dst)?;
        header.serialize(&mut stream)?;
        stream.flush()?;
        Ok(())
    }

    fn frame_header(
        &self,
        method: PassMethod,
        effective_outlier: u32,
        src_size: u32,
        compressed_size: u32,
    ) -> Header {
        let golomb = method.encoder_type != EncoderKind::Uncompressed;

        Header {
            version_flag: true,
            version_id: crate::VERSION_NUMBER as u16,
            compressed_size,
            original_size: src_size,
            identifier: self.identifier,
            sequence_number: self.sequence_number,
            preprocessing: method.preprocessing,
            checksum_enabled: self.params.checksum_enabled,
            encoder_type: method.encoder_type,
            model_rate: if method.preprocessing == Preprocessing::Model {
                self.params.model_rate
            } else { 0 },
            encoder_param: if golomb { method.encoder_param } else { 0 },
            encoder_outlier: if golomb { effective_outlier } else { 0 },
        }
    }
}
