//! Error types for the paths spec.md §7 calls out as distinct from
//! precondition-violation panics: malformed frozen-view buffers and
//! out-of-order bulk inserts. Portable (de)serialization keeps using
//! `std::io::Error`/`std::io::Result`, matching the teacher exactly.

use std::error::Error;
use std::fmt;

/// Returned by [`crate::FrozenBitmap::from_bytes`] when the input buffer
/// cannot possibly be a valid frozen image (spec.md §6.3, §9 "the viewer
/// must validate the header before trusting any offset").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrozenViewError {
    /// The buffer's address is not aligned to the format's 32-byte boundary.
    Misaligned,
    /// The buffer is too short to contain even a header.
    TooShort,
    /// The trailing cookie word does not match the expected frozen-format
    /// magic value.
    BadCookie,
    /// The buffer's length does not match the size implied by its header.
    LengthMismatch,
    /// A container typecode in the header is not one of bitset/array/run.
    UnknownTypeCode,
}

impl fmt::Display for FrozenViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FrozenViewError::Misaligned => "buffer is not 32-byte aligned",
            FrozenViewError::TooShort => "buffer is too short to contain a frozen header",
            FrozenViewError::BadCookie => "buffer does not start with the frozen cookie",
            FrozenViewError::LengthMismatch => "buffer length does not match the frozen header",
            FrozenViewError::UnknownTypeCode => "unrecognized container typecode in frozen header",
        };
        f.write_str(msg)
    }
}

impl Error for FrozenViewError {}

/// Returned by [`crate::RoaringBitmap::append`] when the input was not
/// strictly increasing; mirrors the teacher's `NonSortedIntegers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonSortedIntegers {
    valid_until: u64,
}

impl NonSortedIntegers {
    pub(crate) fn new(valid_until: u64) -> NonSortedIntegers {
        NonSortedIntegers { valid_until }
    }

    /// Number of leading elements that were successfully inserted before the
    /// ordering violation was found.
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }
}

impl fmt::Display for NonSortedIntegers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "non-sorted integers after index {}", self.valid_until)
    }
}

impl Error for NonSortedIntegers {}
