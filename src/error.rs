
//! The closed set of failure kinds of the compression library.

use std::fmt;


/// Result of a compression operation.
pub type Result<T> = std::result::Result<T, Error>;


/// Every failure condition of the library maps to exactly one of these
/// kinds. The numeric values are stable across releases and are exposed via
/// [`Error::code`] so that collaborators logging or telemetering error codes
/// see the same numbers on every platform.
///
/// `DstNull` and `SrcNull` cannot occur through the slice-based API; they
/// keep their taxonomy slots for code-stability of the external contract.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// Unspecified failure.
    Generic = 1,
    /// A compression parameter is outside its valid range.
    ParamsInvalid = 2,
    /// The destination buffer cannot hold the complete frame.
    DstTooSmall = 3,
    /// No destination buffer was supplied.
    DstNull = 4,
    /// The destination buffer is not 8-byte aligned.
    DstUnaligned = 5,
    /// The source size is zero or not a whole number of samples.
    SrcSizeWrong = 6,
    /// No source data was supplied.
    SrcNull = 7,
    /// The source size differs from the model size established by the first
    /// pass, while the secondary stage differences against the model.
    SrcSizeMismatch = 8,
    /// The work buffer is smaller than the configured stages require.
    WorkBufTooSmall = 9,
    /// A configured stage needs a work buffer but none was supplied.
    WorkBufNull = 10,
    /// The work buffer is not 8-byte aligned.
    WorkBufUnaligned = 11,
    /// The frame would exceed the 24-bit compressed-size field.
    HdrCmpSizeTooLarge = 12,
    /// The input exceeds the 24-bit original-size field.
    HdrOriginalTooLarge = 13,
    /// The context was never initialised or was deinitialised.
    ContextInvalid = 14,
    /// Internal header construction or parsing error.
    IntHdr = 15,
    /// Internal encoder error.
    IntEncoder = 16,
    /// Internal bitstream writer error.
    IntBitstream = 17,
    /// The timestamp provider returned a value above 2^48 − 1.
    TimestampInvalid = 18,
}

impl Error {
    /// Stable numeric code of this error kind.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Stable human-readable description of this error kind.
    pub fn message(self) -> &'static str {
        match self {
            Error::Generic => "Error (generic)",
            Error::ParamsInvalid => "Compression parameters are invalid",
            Error::DstTooSmall => "Destination buffer is too small to hold the compressed data",
            Error::DstNull => "Destination buffer is missing",
            Error::DstUnaligned => "Destination buffer is not 8-byte aligned",
            Error::SrcSizeWrong => "The source size is invalid",
            Error::SrcNull => "Source data is missing, nothing to process",
            Error::SrcSizeMismatch => "Source size does not match the size the model was built with",
            Error::WorkBufTooSmall => "Working buffer is too small",
            Error::WorkBufNull => "Working buffer is needed but missing",
            Error::WorkBufUnaligned => "Working buffer is not 8-byte aligned",
            Error::HdrCmpSizeTooLarge => "Compressed size exceeds the header size field",
            Error::HdrOriginalTooLarge => "Original size exceeds the header size field",
            Error::ContextInvalid => "Compression context is invalid",
            Error::IntHdr => "Internal header construction error occurred",
            Error::IntEncoder => "Internal encoder error occurred",
            Error::IntBitstream => "Internal bitstream error occurred",
            Error::TimestampInvalid => "Timestamp provider returned a value outside the 48-bit range",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.message())
    }
}

impl std::error::Error for Error {}
