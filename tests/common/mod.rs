
//! Shared helpers for the frame-level tests.

#![allow(dead_code)] // not every test binary uses every helper

use airspace::prelude::*;


/// Backing storage whose start is 8-byte aligned, as `compress` requires
/// for destination and work buffers.
pub struct AlignedBuffer {
    words: Vec<u64>,
    len: usize,
}

impl AlignedBuffer {
    pub fn zeroed(len: usize) -> AlignedBuffer {
        AlignedBuffer { words: vec![0; (len + 7) / 8], len }
    }

    pub fn bytes(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[.. self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }
}


/// Compresses one buffer of `u16` samples into a fresh frame.
pub fn compress_once(params: &Params, src: &[u16]) -> (Vec<u8>, Header) {
    let mut work = AlignedBuffer::zeroed(
        params.work_buf_size(src.len() as u32 * 2).expect("invalid parameters") as usize,
    );
    let work_buf = if work.len() == 0 { None } else { Some(work.bytes()) };

    let mut dst = AlignedBuffer::zeroed(
        compress_bound(src.len() as u32 * 2).expect("source too large") as usize,
    );

    let mut context = Context::initialise(params, work_buf).expect("initialisation failed");
    let size = context.compress_u16(dst.bytes(), src).expect("compression failed") as usize;

    let frame = dst.bytes()[.. size].to_vec();
    let header = Header::deserialize(&frame).expect("unparsable frame header");
    (frame, header)
}
