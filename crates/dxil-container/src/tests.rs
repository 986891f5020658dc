use pretty_assertions::assert_eq;

use crate::test_utils::{build_container, build_container_with_version};
use crate::{
    is_dxil_container, ContainerError, ContainerFile, FourCC, CONTAINER_VERSION_MAJOR, PART_DXIL,
};

const PART_RDAT: FourCC = FourCC(*b"RDAT");

#[test]
fn parse_round_trips_parts() {
    let blob = build_container(&[(PART_RDAT, b"reflection"), (PART_DXIL, b"program")]);
    let file = ContainerFile::parse(&blob).unwrap();

    assert_eq!(file.header().part_count, 2);
    assert_eq!(file.header().total_size as usize, blob.len());

    let parts: Vec<_> = file.parts().collect();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].fourcc, PART_RDAT);
    assert_eq!(parts[0].data, b"reflection");
    assert_eq!(parts[1].fourcc, PART_DXIL);
    assert_eq!(parts[1].data, b"program");

    assert_eq!(file.program_part().unwrap().data, b"program");
}

#[test]
fn parse_rejects_short_buffer() {
    let err = ContainerFile::parse(b"DXBC").unwrap_err();
    assert!(matches!(err, ContainerError::HeaderTooSmall { .. }));
}

#[test]
fn parse_rejects_bad_magic() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    blob[0..4].copy_from_slice(b"GLSL");
    let err = ContainerFile::parse(&blob).unwrap_err();
    assert!(matches!(err, ContainerError::BadMagic { .. }));
}

#[test]
fn parse_rejects_version_mismatch() {
    let blob = build_container_with_version(&[(PART_DXIL, b"program")], 2, 0);
    let err = ContainerFile::parse(&blob).unwrap_err();
    assert_eq!(err, ContainerError::UnsupportedVersion { major: 2, minor: 0 });
}

#[test]
fn parse_rejects_part_offset_outside_buffer() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    // First offset table entry lives right after the 32-byte header.
    blob[32..36].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = ContainerFile::parse(&blob).unwrap_err();
    assert!(matches!(err, ContainerError::PartOffsetOutOfBounds { index: 0, .. }));
}

#[test]
fn parse_rejects_part_payload_overrun() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    // Part header is at offset 36 (header + one table entry); its size field
    // is 4 bytes past the fourcc.
    blob[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = ContainerFile::parse(&blob).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::PartPayloadOutOfBounds {
            index: 0,
            fourcc: PART_DXIL
        }
    ));
}

#[test]
fn parse_rejects_part_offset_into_offset_table() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    // Points into the header's hash field; the sniffer and the parser must
    // agree that such a container is malformed.
    blob[32..36].copy_from_slice(&8u32.to_le_bytes());
    let err = ContainerFile::parse(&blob).unwrap_err();
    assert!(matches!(err, ContainerError::PartOffsetOutOfBounds { index: 0, .. }));
    assert!(!is_dxil_container(&blob));
}

#[test]
fn parse_rejects_hostile_part_count() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    blob[28..32].copy_from_slice(&u32::MAX.to_le_bytes());
    let err = ContainerFile::parse(&blob).unwrap_err();
    assert!(matches!(err, ContainerError::PartCountTooLarge { .. }));
}

#[test]
fn sniffer_accepts_container_with_program_part() {
    let blob = build_container(&[(PART_RDAT, b"reflection"), (PART_DXIL, b"program")]);
    assert!(is_dxil_container(&blob));
}

#[test]
fn sniffer_rejects_container_without_program_part() {
    let blob = build_container(&[(PART_RDAT, b"reflection")]);
    assert!(!is_dxil_container(&blob));
}

#[test]
fn sniffer_rejects_short_buffer_and_bad_magic() {
    assert!(!is_dxil_container(b""));
    assert!(!is_dxil_container(b"DXBC"));

    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    blob[0..4].copy_from_slice(b"SPRV");
    assert!(!is_dxil_container(&blob));
}

#[test]
fn sniffer_rejects_future_major_version() {
    let blob =
        build_container_with_version(&[(PART_DXIL, b"program")], CONTAINER_VERSION_MAJOR + 1, 3);
    assert!(!is_dxil_container(&blob));
}

#[test]
fn sniffer_rejects_truncated_part_header() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    // Point the part offset at the last two bytes of the buffer: no room for
    // a part header.
    let offset = (blob.len() - 2) as u32;
    blob[32..36].copy_from_slice(&offset.to_le_bytes());
    assert!(!is_dxil_container(&blob));
}

#[test]
fn sniffer_rejects_offset_into_offset_table() {
    let mut blob = build_container(&[(PART_DXIL, b"program")]);
    blob[32..36].copy_from_slice(&8u32.to_le_bytes());
    assert!(!is_dxil_container(&blob));
}

#[test]
fn sniffer_does_not_read_past_declared_parts() {
    // Two parts declared, second offset truncated away: the sniffer must
    // reject rather than scan speculatively.
    let mut blob = build_container(&[(PART_RDAT, b"r"), (PART_DXIL, b"p")]);
    blob[28..32].copy_from_slice(&3u32.to_le_bytes());
    assert!(!is_dxil_container(&blob));
}
