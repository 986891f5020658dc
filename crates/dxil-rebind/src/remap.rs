//! Remap orchestrator: drives sniff → reflect → disassemble → patch →
//! assemble → validate for one compiled program.

use dxil_container::is_dxil_container;

use crate::binding::BindingMap;
use crate::decl::patch_declarations;
use crate::error::{RemapError, RemapStage};
use crate::handle::patch_handle_sites;
use crate::record::RecordTable;
use crate::toolchain::{CompilerTarget, Reflection, Toolchain};

/// Rewrites the resource bindings baked into `bytecode` to the layout in
/// `map`, without re-invoking the front-end compiler.
///
/// The call is synchronous and CPU-bound apart from the external toolchain
/// calls. `bytecode` and `map` are read-only and may be shared across
/// concurrent calls; all mutable state (program text, record table) is owned
/// by this call.
///
/// On failure no partially-patched bytecode is ever returned; the caller's
/// fallback is to recompile from source with the desired bindings baked in.
pub fn remap_resource_bindings<T, R>(
    toolchain: &T,
    reflection: &R,
    target: CompilerTarget,
    bytecode: &[u8],
    map: &BindingMap,
) -> Result<Vec<u8>, RemapError>
where
    T: Toolchain,
    R: Reflection,
{
    if !is_dxil_container(bytecode) {
        return Err(RemapError::FormatNotRecognized);
    }

    // Seed each entry's pre-patch location from reflection. Entries
    // reflection does not report were compiled out and stay unset.
    let reflected = reflection
        .reflect(bytecode)
        .map_err(RemapError::toolchain(RemapStage::Reflect))?;

    let mut table = RecordTable::new(map);
    for desc in &reflected {
        let Some(entry) = map.get(&desc.name) else {
            continue;
        };
        if entry.class != desc.class {
            return Err(RemapError::BindingMismatch {
                name: desc.name.clone(),
                detail: format!(
                    "map declares {:?}, reflection reports {:?}",
                    entry.class, desc.class
                ),
            });
        }
        // bind_count == 0 means an unbounded range; any map array size works.
        if desc.bind_count != 0 && entry.array_size < desc.bind_count {
            return Err(RemapError::BindingMismatch {
                name: desc.name.clone(),
                detail: format!(
                    "map array size {} does not cover reflected bind count {}",
                    entry.array_size, desc.bind_count
                ),
            });
        }
        table.seed(entry.uid, desc.space, desc.bind_point);
    }

    let mut program = toolchain
        .disassemble(bytecode)
        .map_err(RemapError::toolchain(RemapStage::Disassemble))?;

    patch_declarations(map, &mut table, &mut program)?;
    patch_handle_sites(map, &mut table, &mut program)?;

    let assembled = toolchain
        .assemble(&program)
        .map_err(RemapError::toolchain(RemapStage::Assemble))?;

    if target.requires_validation() {
        toolchain
            .validate(&assembled)
            .map_err(RemapError::toolchain(RemapStage::Validate))
    } else {
        Ok(assembled)
    }
}
