use core::fmt;

use crate::error::ContainerError;
use crate::fourcc::FourCC;

/// Magic at the start of every DXIL container.
pub const CONTAINER_MAGIC: FourCC = FourCC(*b"DXBC");
/// Four-character code of the part holding the compiled program payload.
pub const PART_DXIL: FourCC = FourCC(*b"DXIL");
/// The container major version this crate understands.
pub const CONTAINER_VERSION_MAJOR: u16 = 1;

// magic + hash + version (major, minor) + total_size + part_count
const CONTAINER_HEADER_LEN: usize = 4 + 16 + 2 + 2 + 4 + 4;
// Hard cap on the part count to avoid pathological offset tables on hostile
// input. Real containers hold a small handful of parts (single digits).
const MAX_PART_COUNT: u32 = 4096;

/// The fixed header of a DXIL container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Must be [`CONTAINER_MAGIC`].
    pub magic: FourCC,
    /// The digest stored in the container header.
    pub hash: [u8; 16],
    /// Container format major version.
    pub version_major: u16,
    /// Container format minor version.
    pub version_minor: u16,
    /// Declared total size, in bytes, of the container.
    pub total_size: u32,
    /// Number of part offsets following the header.
    pub part_count: u32,
}

/// A single part within a DXIL container.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ContainerPart<'a> {
    /// The part identifier (e.g. `DXIL`, `RDAT`, `PSV0`).
    pub fourcc: FourCC,
    /// Raw part payload bytes.
    pub data: &'a [u8],
}

impl fmt::Debug for ContainerPart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerPart")
            .field("fourcc", &self.fourcc)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// A parsed DXIL container.
///
/// Parsing is strict about bounds: every offset and size is validated to
/// ensure it stays within the container's declared `total_size`. The input is
/// treated as **untrusted** and parsing never panics.
#[derive(Debug, Clone)]
pub struct ContainerFile<'a> {
    bytes: &'a [u8],
    header: ContainerHeader,
    part_offsets: &'a [u8],
}

impl<'a> ContainerFile<'a> {
    /// Parses a DXIL container from `bytes`.
    pub fn parse(bytes: &'a [u8]) -> Result<ContainerFile<'a>, ContainerError> {
        let header = read_header(bytes)?;
        if header.version_major != CONTAINER_VERSION_MAJOR {
            return Err(ContainerError::UnsupportedVersion {
                major: header.version_major,
                minor: header.version_minor,
            });
        }
        if header.part_count > MAX_PART_COUNT {
            return Err(ContainerError::PartCountTooLarge {
                count: header.part_count,
                max: MAX_PART_COUNT,
            });
        }

        let total_size = header.total_size as usize;
        if total_size < CONTAINER_HEADER_LEN || total_size > bytes.len() {
            return Err(ContainerError::TotalSizeOutOfBounds {
                total_size: header.total_size,
                len: bytes.len(),
            });
        }
        let bytes = &bytes[..total_size];

        let part_count = header.part_count as usize;
        // part_count <= MAX_PART_COUNT, so the table size cannot overflow.
        let offset_table_end = CONTAINER_HEADER_LEN + part_count * 4;
        if offset_table_end > bytes.len() {
            return Err(ContainerError::TotalSizeOutOfBounds {
                total_size: header.total_size,
                len: bytes.len(),
            });
        }
        let part_offsets = &bytes[CONTAINER_HEADER_LEN..offset_table_end];

        for index in 0..part_count {
            let offset = read_u32_le(part_offsets, index * 4).unwrap_or(u32::MAX);
            let part_start = offset as usize;
            // A part that overlaps the header or the offset table is
            // malformed, matching what the sniffer rejects.
            let header_end = match part_start.checked_add(8) {
                Some(end) if end <= bytes.len() && part_start >= offset_table_end => end,
                _ => {
                    return Err(ContainerError::PartOffsetOutOfBounds {
                        index: index as u32,
                        offset,
                    })
                }
            };

            let fourcc = FourCC::read(bytes, part_start).ok_or(
                ContainerError::PartOffsetOutOfBounds {
                    index: index as u32,
                    offset,
                },
            )?;
            let size = read_u32_le(bytes, part_start + 4).ok_or(
                ContainerError::PartOffsetOutOfBounds {
                    index: index as u32,
                    offset,
                },
            )? as usize;

            let payload_in_bounds = size
                .checked_add(header_end)
                .is_some_and(|end| end <= bytes.len());
            if !payload_in_bounds {
                return Err(ContainerError::PartPayloadOutOfBounds {
                    index: index as u32,
                    fourcc,
                });
            }
        }

        Ok(ContainerFile {
            bytes,
            header,
            part_offsets,
        })
    }

    /// Returns the parsed container header.
    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Returns the raw bytes covered by the container's declared `total_size`.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Iterates over all parts in offset-table order.
    pub fn parts(&self) -> impl Iterator<Item = ContainerPart<'a>> + '_ {
        PartsIter {
            bytes: self.bytes,
            part_offsets: self.part_offsets,
            index: 0,
        }
    }

    /// Returns the first part matching `fourcc`, if any.
    pub fn get_part(&self, fourcc: FourCC) -> Option<ContainerPart<'a>> {
        self.parts().find(|part| part.fourcc == fourcc)
    }

    /// Returns the program payload part (`DXIL`), if present.
    pub fn program_part(&self) -> Option<ContainerPart<'a>> {
        self.get_part(PART_DXIL)
    }
}

/// Returns `true` if `bytes` looks like a DXIL container holding a program
/// payload part.
///
/// This is a *sniffer*, not a validator: any structural problem (short
/// buffer, wrong magic, unsupported major version, part header out of
/// bounds, or no `DXIL` part) means "not this format" so callers can try an
/// alternate bytecode path. A version mismatch is additionally logged since
/// it usually means a toolchain upgrade rather than a different format.
///
/// Never mutates and runs in O(part count).
pub fn is_dxil_container(bytes: &[u8]) -> bool {
    let Ok(header) = read_header(bytes) else {
        return false;
    };
    if header.version_major != CONTAINER_VERSION_MAJOR {
        tracing::warn!(
            found_major = header.version_major,
            found_minor = header.version_minor,
            supported_major = CONTAINER_VERSION_MAJOR,
            "container major version mismatch; treating input as unrecognized"
        );
        return false;
    }

    let part_count = header.part_count as usize;
    let offset_table_end = match part_count
        .checked_mul(4)
        .and_then(|len| len.checked_add(CONTAINER_HEADER_LEN))
    {
        Some(end) if end <= bytes.len() => end,
        _ => return false,
    };

    for index in 0..part_count {
        let Some(offset) = read_u32_le(bytes, CONTAINER_HEADER_LEN + index * 4) else {
            return false;
        };
        let part_start = offset as usize;
        // The part header must fit inside the buffer; a malformed offset
        // table rejects the whole container.
        if part_start < offset_table_end
            || part_start
                .checked_add(8)
                .map_or(true, |end| end > bytes.len())
        {
            return false;
        }
        if FourCC::read(bytes, part_start) == Some(PART_DXIL) {
            return true;
        }
    }
    false
}

fn read_header(bytes: &[u8]) -> Result<ContainerHeader, ContainerError> {
    if bytes.len() < CONTAINER_HEADER_LEN {
        return Err(ContainerError::HeaderTooSmall {
            need: CONTAINER_HEADER_LEN,
            got: bytes.len(),
        });
    }

    // Bounds are established above; the helpers below cannot fail.
    let magic = FourCC([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != CONTAINER_MAGIC {
        return Err(ContainerError::BadMagic { found: magic });
    }

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[4..20]);

    let version_major = u16::from_le_bytes([bytes[20], bytes[21]]);
    let version_minor = u16::from_le_bytes([bytes[22], bytes[23]]);
    let total_size = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
    let part_count = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);

    Ok(ContainerHeader {
        magic,
        hash,
        version_major,
        version_minor,
        total_size,
        part_count,
    })
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let slice = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

struct PartsIter<'a> {
    bytes: &'a [u8],
    part_offsets: &'a [u8],
    index: usize,
}

impl<'a> Iterator for PartsIter<'a> {
    type Item = ContainerPart<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.index.checked_mul(4)?;
        let offset = read_u32_le(self.part_offsets, start)? as usize;

        let fourcc = FourCC::read(self.bytes, offset)?;
        let size = read_u32_le(self.bytes, offset + 4)? as usize;
        let data_start = offset.checked_add(8)?;
        let data_end = data_start.checked_add(size)?;
        let data = self.bytes.get(data_start..data_end)?;

        self.index += 1;
        Some(ContainerPart { fourcc, data })
    }
}
