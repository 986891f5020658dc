use crate::container::CONTAINER_VERSION_MAJOR;
use crate::FourCC;

/// Builds a minimal DXIL container holding the provided parts.
///
/// The resulting blob has:
/// - a valid header (magic + hash + version + `total_size` + part count),
/// - a correct part offset table,
/// - and a correct `total_size`.
///
/// The hash field is **not** computed; it is set to all zeros. This is
/// intentional: parsing does not require hash correctness, and most tests
/// only need a structurally-valid container.
pub fn build_container(parts: &[(FourCC, &[u8])]) -> Vec<u8> {
    build_container_with_version(parts, CONTAINER_VERSION_MAJOR, 0)
}

/// Like [`build_container`] but with an explicit format version, for tests
/// exercising version rejection.
pub fn build_container_with_version(
    parts: &[(FourCC, &[u8])],
    version_major: u16,
    version_minor: u16,
) -> Vec<u8> {
    // Header layout:
    // - magic:         4 bytes ("DXBC")
    // - hash:         16 bytes (unused here)
    // - version:       2 + 2 bytes (major, minor)
    // - total_size:    4 bytes
    // - part_count:    4 bytes
    // - part_offsets:  part_count * 4 bytes
    // - parts:
    //     - fourcc: 4 bytes
    //     - size:   4 bytes
    //     - data:   size bytes
    let header_size = 4 + 16 + 2 + 2 + 4 + 4 + 4 * parts.len();
    let part_bytes = parts.iter().map(|(_, data)| 8 + data.len()).sum::<usize>();

    let mut out = Vec::with_capacity(header_size + part_bytes);

    out.extend_from_slice(b"DXBC");
    out.extend_from_slice(&[0u8; 16]); // hash
    out.extend_from_slice(&version_major.to_le_bytes());
    out.extend_from_slice(&version_minor.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // total_size placeholder

    let part_count = u32::try_from(parts.len()).expect("part count does not fit in u32");
    out.extend_from_slice(&part_count.to_le_bytes());

    // Reserve space for the offset table and fill it in once offsets are known.
    let offsets_pos = out.len();
    out.resize(out.len() + 4 * parts.len(), 0);

    let mut offsets = Vec::with_capacity(parts.len());
    for (fourcc, data) in parts {
        let offset = u32::try_from(out.len()).expect("part offset does not fit in u32");
        offsets.push(offset);

        let size = u32::try_from(data.len()).expect("part size does not fit in u32");
        out.extend_from_slice(&fourcc.0);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(data);
    }

    for (i, offset) in offsets.iter().enumerate() {
        let pos = offsets_pos + i * 4;
        out[pos..pos + 4].copy_from_slice(&offset.to_le_bytes());
    }

    let total_size = u32::try_from(out.len()).expect("total_size does not fit in u32");
    out[24..28].copy_from_slice(&total_size.to_le_bytes());
    out
}
