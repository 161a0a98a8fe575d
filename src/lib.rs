
//! Deterministic lossless and near-lossless compression of 16-bit sample
//! streams, designed for space-qualified on-board use.
//!
//! The compression pipeline is preprocessor → entropy encoder → big-endian
//! bitstream → framed header. A [`compress::Context`] processes successive
//! equally-sized sample buffers: the first pass after a reset uses the
//! primary parameter set, up to `secondary_iterations` following passes use
//! the secondary set, then the cycle restarts. The secondary stage may
//! difference against an adaptive model that is carried across passes in a
//! caller-supplied work buffer.
//!
//! The core never allocates; destination, source and work buffers all belong
//! to the caller. Output is bit-exact for a given configuration and input.

#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,
)]

#![deny(
    unused_must_use,
    trivial_numeric_casts,
)]

#![forbid(unsafe_code)]


pub mod error;
pub mod bitstream;
pub mod checksum;
pub mod samples;
pub mod header;
pub mod timestamp;
pub mod compress;


/// Major part of the version id.
pub const VERSION_MAJOR: u32 = 0;

/// Minor part of the version id.
pub const VERSION_MINOR: u32 = 2;

/// Release part of the version id.
pub const VERSION_RELEASE: u32 = 0;

/// Complete version number, recorded in the `version_id` field of every
/// emitted frame header.
pub const VERSION_NUMBER: u32 = VERSION_MAJOR * 100 * 100 + VERSION_MINOR * 100 + VERSION_RELEASE;

/// Complete version string.
pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");


/// Re-exports of the types commonly required for compressing sample buffers.
pub mod prelude {
    pub use crate::compress::{
        compress_bound, uncompressed_bound,
        Context, EncoderKind, Params, Preprocessing,
    };
    pub use crate::checksum::checksum;
    pub use crate::error::{Error, Result};
    pub use crate::header::Header;
    pub use crate::samples::Samples;
    pub use crate::timestamp::set_timestamp_func;
}
