//! Declaration patcher: rewrites the space and bind point baked into each
//! resource declaration record of the disassembled program.
//!
//! Two complementary strategies cover the two shapes the compiler emits:
//!
//! - **Named**: unoptimized, debug, and ray-tracing programs keep resource
//!   names in their metadata records; each binding map entry is located by
//!   its name literal.
//! - **Positional**: optimized programs strip names to `!""`; declarations
//!   are recognized by their type signature and matched to the binding map
//!   entry whose *pre-patch* (space, bind point) the record carries. This
//!   only works because pre-patch locations were recorded (from reflection)
//!   before this pass runs; the [`RecordTable`] phase enforces that.
//!
//! Metadata resource records have the layout (see the DXIL specification,
//! "Metadata resource records"):
//!
//! ```text
//! !158 = !{i32 0,          ; record id, referenced by handle creation
//!          <type>* <sym>,  ; pointer to the resource's global symbol
//!          !"name",        ; resource name, "" when stripped
//!          i32 -1,         ; bind space
//!          i32 -1,         ; bind point lower bound
//!          i32 1,          ; range size
//!          ...}
//! ```

use crate::binding::{BindingMap, ResourceClass};
use crate::error::PatchError;
use crate::record::{PatchPhase, RecordTable, UNSET};
use crate::scan;

const RECORD_START: &str = "= !{";
const EMPTY_NAME_FIELD: &str = ", !\"\",";
const TEXTURE_TYPE_PREFIX: &str = "%\"class.Texture";
const SAMPLER_TYPE: &str = "%struct.SamplerState* undef";

/// Rewrites every declaration record covered by `map`, recording each
/// resource's declaration record id into `table` for the handle-site pass.
///
/// A named resource absent from the program text is skipped: it was unused
/// and compiled out. Structural surprises are hard errors; nothing is
/// guessed.
pub fn patch_declarations(
    map: &BindingMap,
    table: &mut RecordTable,
    text: &mut String,
) -> Result<(), PatchError> {
    table.advance(PatchPhase::Seeded, PatchPhase::NamedDeclarations)?;
    patch_named(map, table, text)?;
    table.advance(PatchPhase::NamedDeclarations, PatchPhase::AnonymousDeclarations)?;
    patch_anonymous(map, table, text)
}

fn patch_named(
    map: &BindingMap,
    table: &mut RecordTable,
    text: &mut String,
) -> Result<(), PatchError> {
    for (name, entry) in map.iter() {
        let name_token = format!("!\"{name}\"");
        let Some(name_pos) = text.find(&name_token) else {
            // Unused resources are stripped from the metadata entirely.
            tracing::debug!(resource = name, "declaration not found; resource compiled out");
            continue;
        };

        let rec_start = scan::rfind_before(text, name_pos, RECORD_START)
            .ok_or_else(|| shape(name, "declaration record start not found before name"))?;
        let id_start = rec_start + RECORD_START.len();
        if !scan::starts_with_at(text, id_start, scan::I32) {
            return Err(shape(name, "record id field is not i32"));
        }
        let (record_id, _) = scan::parse_int(text, id_start + scan::I32.len())
            .ok_or_else(|| shape(name, "record id literal missing"))?;
        store_record_id(table, entry.uid, record_id as u32, name)?;

        let info = *table.info(entry.uid);
        let after_space = replace_field_guarded(
            text,
            name_pos + name_token.len(),
            entry.space,
            info.original_space,
            name,
            "space",
        )?;
        replace_field_guarded(
            text,
            after_space,
            entry.bind_point,
            info.original_bind_point,
            name,
            "binding",
        )?;
    }
    Ok(())
}

fn patch_anonymous(
    map: &BindingMap,
    table: &mut RecordTable,
    text: &mut String,
) -> Result<(), PatchError> {
    let mut pos = 0;
    while let Some(marker) = scan::find_from(text, pos, EMPTY_NAME_FIELD) {
        // `<type>* undef, !"", i32 -1, i32 -1, ...`
        //               ^marker    ^binding_start
        let binding_start = marker + EMPTY_NAME_FIELD.len() - 1;
        // A candidate that turns out not to be a resource declaration resumes
        // scanning just past the anonymous marker, never at the match point.
        let resume = binding_start;

        let rec_start = scan::rfind_before(text, marker, RECORD_START).ok_or_else(|| {
            shape(
                &anon_label(marker),
                "record start not found before anonymous name field",
            )
        })?;
        let id_start = rec_start + RECORD_START.len();
        if !scan::starts_with_at(text, id_start, scan::I32) {
            // Some other metadata record contains an empty string; skip it.
            pos = resume;
            continue;
        }
        let Some((record_id, id_end)) = scan::parse_int(text, id_start + scan::I32.len()) else {
            return Err(shape(&anon_label(marker), "record id literal missing"));
        };
        if !scan::starts_with_at(text, id_end, ", ") {
            return Err(shape(&anon_label(marker), "record id field not terminated"));
        }

        let Some(class) = classify_anonymous_type(text, id_end + 2, map) else {
            pos = resume;
            continue;
        };

        // Current (still unpatched) space and bind point.
        let Some((space, space_span)) = scan::read_i32_field(text, binding_start) else {
            pos = resume;
            continue;
        };
        let Some((bind_point, _)) = scan::read_i32_field(text, space_span.end) else {
            pos = resume;
            continue;
        };
        let (space, bind_point) = (space as u32, bind_point as u32);

        // Match against pre-patch locations recorded before this pass.
        let matched = map.iter().find(|(_, entry)| {
            let info = table.info(entry.uid);
            entry.class == class
                && info.original_space == space
                && info.original_bind_point == bind_point
        });
        let Some((name, entry)) = matched else {
            return Err(PatchError::ResourceNotResolved(format!(
                "anonymous {class:?} declaration at space {}, bind point {}",
                space as i32, bind_point as i32
            )));
        };
        let (name, entry) = (name.to_owned(), *entry);

        store_record_id(table, entry.uid, record_id as u32, &name)?;

        let info = *table.info(entry.uid);
        let after_space = replace_field_guarded(
            text,
            binding_start,
            entry.space,
            info.original_space,
            &name,
            "space",
        )?;
        pos = replace_field_guarded(
            text,
            after_space,
            entry.bind_point,
            info.original_bind_point,
            &name,
            "binding",
        )?;
    }
    Ok(())
}

/// Classifies a stripped declaration by its type signature: texture-typed
/// pointers are SRVs, sampler-typed pointers are samplers, and constant
/// buffers use a type named after the buffer itself, so each candidate
/// cbuffer entry contributes a generated type name to match against.
///
/// `None` means "not a resource declaration this patcher understands".
fn classify_anonymous_type(text: &str, pos: usize, map: &BindingMap) -> Option<ResourceClass> {
    if scan::starts_with_at(text, pos, TEXTURE_TYPE_PREFIX) {
        return Some(ResourceClass::Srv);
    }
    if scan::starts_with_at(text, pos, SAMPLER_TYPE) {
        return Some(ResourceClass::Sampler);
    }
    for (name, entry) in map.iter() {
        if entry.class != ResourceClass::Cbuffer {
            continue;
        }
        let cbuffer_type = format!("%{name}* undef");
        if scan::starts_with_at(text, pos, &cbuffer_type) {
            return Some(ResourceClass::Cbuffer);
        }
    }
    None
}

/// Replaces the `, i32 <N>` field at `pos` with `desired`, after checking
/// that `N` equals the value expected to currently occupy the field.
///
/// `expected == UNSET` encodes the `-1` "unassigned" literal. Returns the
/// position just past the new literal.
fn replace_field_guarded(
    text: &mut String,
    pos: usize,
    desired: u32,
    expected: u32,
    resource: &str,
    field: &'static str,
) -> Result<usize, PatchError> {
    let (found, span) = scan::read_i32_field(text, pos)
        .ok_or_else(|| shape(resource, &format!("{field} field missing or malformed")))?;
    if found as u32 != expected {
        return Err(PatchError::PreviousValueMismatch {
            resource: resource.to_owned(),
            field,
            expected: expected as i32 as i64,
            found,
        });
    }
    let new_value = desired.to_string();
    let end = span.start + new_value.len();
    text.replace_range(span, &new_value);
    Ok(end)
}

fn store_record_id(
    table: &mut RecordTable,
    uid: u32,
    record_id: u32,
    resource: &str,
) -> Result<(), PatchError> {
    let info = table.info_mut(uid);
    if info.record_id != UNSET && info.record_id != record_id {
        return Err(shape(
            resource,
            &format!(
                "declaration record id {record_id} conflicts with previously recorded {}",
                info.record_id
            ),
        ));
    }
    info.record_id = record_id;
    Ok(())
}

fn shape(resource: &str, detail: &str) -> PatchError {
    PatchError::UnexpectedRecordShape {
        resource: resource.to_owned(),
        detail: detail.to_owned(),
    }
}

fn anon_label(pos: usize) -> String {
    format!("<anonymous declaration at byte {pos}>")
}
