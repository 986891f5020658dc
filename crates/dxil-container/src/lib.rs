//! A safe, zero-copy parser and format sniffer for DXIL shader bytecode
//! containers.
//!
//! A DXIL container is the binary package produced by the DirectX shader
//! compiler: a fixed header, a part offset table, and a sequence of parts
//! identified by four-character codes, one of which (`DXIL`) carries the
//! compiled program payload.
//!
//! This crate is intended for handling **untrusted** shader blobs without
//! panicking or reading out of bounds. It provides:
//!
//! - [`is_dxil_container`], a cheap sniffer that decides whether a blob is a
//!   DXIL container holding a program part (callers use this to pick a
//!   bytecode handling path);
//! - [`ContainerFile`], a strict bounds-checked parser over the header, the
//!   part offset table, and the parts themselves.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod container;
mod error;
mod fourcc;

/// Helpers for building synthetic DXIL containers in tests.
///
/// This module is only available when compiling this crate's own tests, or
/// when the `test-utils` feature is enabled. It is **not** considered part of
/// the stable parsing API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

#[cfg(test)]
mod tests;

pub use crate::container::{
    is_dxil_container, ContainerFile, ContainerHeader, ContainerPart, CONTAINER_MAGIC,
    CONTAINER_VERSION_MAJOR, PART_DXIL,
};
pub use crate::error::ContainerError;
pub use crate::fourcc::FourCC;
