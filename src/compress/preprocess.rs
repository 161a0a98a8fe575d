
//! Data preprocessing stages.
//!
//! Each transform turns the sample stream into a sequence of signed 16-bit
//! residuals for the entropy encoder. The IWT variant computes all
//! coefficients up front into the work buffer during `init`; the MODEL
//! variant keeps an adaptive predictor there, carried across passes.

use super::Preprocessing;
use crate::error::{Error, Result};
use crate::samples::Samples;


/// Maximum allowed model adaptation rate parameter.
pub const MAX_MODEL_RATE: u32 = 16;


/// Rounds a byte count up to the next multiple of two.
pub(crate) fn round_up_to_even(size: u32) -> u32 {
    (size + 1) & !1
}

/// Minimum work buffer size in bytes for one preprocessing stage over
/// `src_size` bytes of samples.
pub(crate) fn work_buf_size(preprocessing: Preprocessing, src_size: u32) -> u32 {
    match preprocessing {
        Preprocessing::None | Preprocessing::Diff => 0,
        Preprocessing::Iwt | Preprocessing::Model => round_up_to_even(src_size),
    }
}


/// The residual generator of one pass.
#[derive(Debug)]
pub(crate) enum Preprocessor<'a> {
    None,
    Diff,
    Iwt { coefficients: &'a mut [i16] },
    Model { model: &'a mut [u16], rate: u32 },
}

impl<'a> Preprocessor<'a> {
    /// Prepares the selected transform. IWT decomposes the whole input into
    /// the work buffer here; the other variants only validate their inputs.
    pub fn init(
        preprocessing: Preprocessing,
        samples: Samples<'_>,
        work_buf: Option<&'a mut [u8]>,
        model_rate: u32,
        src_size: u32,
    ) -> Result<Self> {
        match preprocessing {
            Preprocessing::None => Ok(Preprocessor::None),
            Preprocessing::Diff => Ok(Preprocessor::Diff),

            Preprocessing::Iwt => {
                let coefficients = work_buf_view(work_buf, src_size)?;
                iwt_decompose(samples, coefficients);
                Ok(Preprocessor::Iwt { coefficients })
            }

            Preprocessing::Model => {
                if model_rate > MAX_MODEL_RATE {
                    return Err(Error::ParamsInvalid);
                }
                let model = work_buf_view(work_buf, src_size)?;
                Ok(Preprocessor::Model { model, rate: model_rate })
            }
        }
    }

    /// The residual for sample `i`. For MODEL this also advances the
    /// predictor by blending the new sample into it.
    pub fn process(&mut self, i: usize, samples: Samples<'_>) -> i16 {
        match self {
            Preprocessor::None => samples.get(i),

            Preprocessor::Diff => {
                if i == 0 { samples.get(0) }
                else { samples.get(i).wrapping_sub(samples.get(i - 1)) }
            }

            Preprocessor::Iwt { coefficients } => coefficients[i],

            Preprocessor::Model { model, rate } => {
                let data = samples.get(i) as u16;
                let residual = data.wrapping_sub(model[i]) as i16;
                model[i] = update_model(data, model[i], *rate);
                residual
            }
        }
    }
}


/// Seeds the model with the raw samples of a primary pass, so the secondary
/// passes that follow always difference against a populated predictor.
pub(crate) fn seed_model(
    work_buf: Option<&mut [u8]>,
    samples: Samples<'_>,
    src_size: u32,
) -> Result<()> {
    let model: &mut [u16] = work_buf_view(work_buf, src_size)?;

    for i in 0 .. samples.sample_count() {
        model[i] = samples.get(i) as u16;
    }

    Ok(())
}

/// The leading sample-sized portion of the work buffer, as 16-bit values.
fn work_buf_view<T: bytemuck::Pod>(
    work_buf: Option<&mut [u8]>,
    src_size: u32,
) -> Result<&mut [T]> {
    let buffer = work_buf.ok_or(Error::WorkBufNull)?;
    let needed = round_up_to_even(src_size) as usize;

    if buffer.len() < needed {
        return Err(Error::WorkBufTooSmall);
    }

    bytemuck::try_cast_slice_mut(&mut buffer[.. needed])
        .map_err(|_| Error::WorkBufUnaligned)
}


/// Blends a new sample into the model:
/// `(model · rate + data · (MAX_MODEL_RATE − rate)) / MAX_MODEL_RATE`.
fn update_model(data: u16, model: u16, rate: u32) -> u16 {
    let weighted_data = u32::from(data) * (MAX_MODEL_RATE - rate);
    let weighted_model = u32::from(model) * rate;

    // truncation is intended
    ((weighted_model + weighted_data) / MAX_MODEL_RATE) as u16
}


/* ====== Integer Wavelet Transform ====== */

// The lifting kernel works on promoted 32-bit sums; floor division of
// negative values is an arithmetic shift.

fn floor_division_by_2(dividend: i32) -> i16 {
    (dividend >> 1) as i16
}

fn floor_division_by_4(dividend: i32) -> i16 {
    (dividend >> 2) as i16
}

fn odd_coefficient(centre: i16, left: i16, right: i16) -> i16 {
    centre.wrapping_sub(floor_division_by_2(i32::from(left) + i32::from(right)))
}

fn last_odd_coefficient(centre: i16, left: i16) -> i16 {
    centre.wrapping_sub(left)
}

fn even_coefficient(centre: i16, odd_left: i16, odd_right: i16) -> i16 {
    centre.wrapping_add(floor_division_by_4(i32::from(odd_left) + i32::from(odd_right)))
}

fn edge_even_coefficient(centre: i16, odd_neighbour: i16) -> i16 {
    centre.wrapping_add(floor_division_by_2(i32::from(odd_neighbour)))
}


/// Multi-level integer wavelet decomposition of the sample stream into
/// `coefficients`, with the stride doubling per level until it covers the
/// buffer. Detail coefficients land on the odd multiples of the stride,
/// approximation coefficients on the even ones.
fn iwt_decompose(samples: Samples<'_>, coefficients: &mut [i16]) {
    let count = samples.sample_count();
    for i in 0 .. count {
        coefficients[i] = samples.get(i);
    }

    let mut stride = 1;
    while stride < count {
        iwt_single_level(&mut coefficients[.. count], stride);
        stride <<= 1;
    }
}

/// One in-place lifting level at stride `s`.
fn iwt_single_level(data: &mut [i16], s: usize) {
    let n = data.len();

    // one or two elements at this stride, handle as a special case
    if 2 * s >= n {
        if s < n {
            data[s] = last_odd_coefficient(data[s], data[0]);
            data[0] = edge_even_coefficient(data[0], data[s]);
        }
        return;
    }

    data[s] = odd_coefficient(data[s], data[0], data[2 * s]);
    data[0] = edge_even_coefficient(data[0], data[s]);

    let mut i = 2 * s;
    while i < n - 2 * s {
        data[i + s] = odd_coefficient(data[i + s], data[i], data[i + 2 * s]);
        data[i] = even_coefficient(data[i], data[i - s], data[i + s]);
        i += 2 * s;
    }

    if i == n - 2 * s { // two elements left over
        data[i + s] = last_odd_coefficient(data[i + s], data[i]);
        data[i] = even_coefficient(data[i], data[i - s], data[i + s]);
    }
    else {
        data[i] = edge_even_coefficient(data[i], data[i - s]);
    }
}
