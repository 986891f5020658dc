use thiserror::Error;

use crate::fourcc::FourCC;

/// Errors produced while parsing a DXIL container.
///
/// All variants describe malformed or hostile *input*; none of them indicate
/// a bug in the parser. Parsing never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// The buffer is smaller than the fixed container header.
    #[error("buffer too small for container header (need {need} bytes, got {got})")]
    HeaderTooSmall {
        /// Minimum number of bytes required.
        need: usize,
        /// Number of bytes actually available.
        got: usize,
    },
    /// The header magic is not `DXBC`.
    #[error("bad container magic '{found}' (expected 'DXBC')")]
    BadMagic {
        /// The four bytes found where the magic was expected.
        found: FourCC,
    },
    /// The container major version is not the supported one.
    #[error("unsupported container version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version found in the header.
        major: u16,
        /// Minor version found in the header.
        minor: u16,
    },
    /// The declared part count exceeds the hard cap.
    #[error("part count {count} exceeds maximum {max}")]
    PartCountTooLarge {
        /// Declared part count.
        count: u32,
        /// Maximum accepted part count.
        max: u32,
    },
    /// The declared total size does not fit the buffer (or the header).
    #[error("declared total size {total_size} out of bounds (buffer is {len} bytes)")]
    TotalSizeOutOfBounds {
        /// Declared total size.
        total_size: u32,
        /// Actual buffer length.
        len: usize,
    },
    /// A part offset points outside the container (no room for a part header).
    #[error("part {index} offset {offset} out of bounds")]
    PartOffsetOutOfBounds {
        /// Index of the offending part in the offset table.
        index: u32,
        /// The offending offset.
        offset: u32,
    },
    /// A part's declared payload extends past the end of the container.
    #[error("part {index} ({fourcc}) payload out of bounds")]
    PartPayloadOutOfBounds {
        /// Index of the offending part in the offset table.
        index: u32,
        /// The part's four-character code.
        fourcc: FourCC,
    },
}
