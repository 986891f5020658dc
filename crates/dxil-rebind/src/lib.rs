//! Post-compilation resource-binding remapper for DXIL programs.
//!
//! Takes an already-compiled shader program and rewrites, in place, the
//! resource slot assignments (which texture/buffer/sampler/constant-buffer
//! occupies which bind point and register space) baked into it, without
//! re-invoking the front-end compiler:
//!
//! 1. the container is sniffed ([`dxil_container::is_dxil_container`]);
//! 2. reflection records each resource's pre-patch location;
//! 3. the program is disassembled through the external toolchain;
//! 4. the [declaration patcher](patch_declarations) rewrites every
//!    declaration record's space/bind-point fields;
//! 5. the [handle-site patcher](patch_handle_sites) rewrites every
//!    handle-acquisition index, constant or dynamically computed, so it
//!    still resolves to the correct (now moved) resource at run time;
//! 6. the text is reassembled and, where the target demands it,
//!    validated/signed.
//!
//! The whole pipeline is exposed as [`remap_resource_bindings`]. Program
//! semantics are preserved exactly; any structural surprise fails the call
//! rather than guessing.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod binding;
mod decl;
mod error;
mod handle;
pub mod record;
mod remap;
mod scan;
pub mod toolchain;

/// Mock toolchain, text-scanning reflector, and program-text builders.
///
/// Only available to this crate's own tests or under the `test-utils`
/// feature; not part of the stable API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use crate::binding::{BindingEntry, BindingMap, ResourceClass};
pub use crate::decl::patch_declarations;
pub use crate::error::{PatchError, RemapError, RemapStage, ToolchainError};
pub use crate::handle::patch_handle_sites;
pub use crate::record::{PatchPhase, RecordInfo, RecordTable, UNSET};
pub use crate::remap::remap_resource_bindings;
pub use crate::toolchain::{
    max_shader_model, CompileInput, CompiledShader, CompilerTarget, LazyToolchain, Reflection,
    ResourceBindingDesc, ShaderModel, ShaderStage, Toolchain, ToolchainVersion,
};
