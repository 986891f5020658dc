//! Handle-site patcher: rewrites the range index of every instruction that
//! materializes a live resource handle.
//!
//! Handle creation has the shape:
//!
//! ```text
//! %h = call %dx.types.Handle @dx.op.createHandle(
//!        i32 57,       ; opcode
//!        i8 2,         ; resource class: SRV=0, UAV=1, CBV=2, Sampler=3
//!        i32 0,        ; declaration record id (constant)
//!        i32 0,        ; index into the declaration's range
//!        i1 false)     ; non-uniform index
//! ```
//!
//! The index operand is either an integer literal (static indexing) or a
//! temporary produced by `add i32` of a variable and a constant (dynamic
//! indexing, e.g. a loop variable offset by the array's base bind point).
//! Only the constant moves; the variable operand and the instruction shape
//! are left untouched so runtime semantics stay "base + variable".

use crate::binding::{BindingEntry, BindingMap, ResourceClass};
use crate::error::PatchError;
use crate::record::{PatchPhase, RecordTable, UNSET};
use crate::scan;

const CALL_HANDLE: &str = " = call %dx.types.Handle @dx.op.createHandle(";

/// Rewrites every handle-acquisition site in `text`, in textual order.
///
/// Requires the declaration passes to have run: sites are resolved through
/// the record ids and pre-patch locations accumulated in `table`.
pub fn patch_handle_sites(
    map: &BindingMap,
    table: &mut RecordTable,
    text: &mut String,
) -> Result<(), PatchError> {
    table.advance(PatchPhase::AnonymousDeclarations, PatchPhase::HandleSites)?;

    let mut pos = 0;
    while let Some(site) = scan::find_from(text, pos, CALL_HANDLE) {
        pos = patch_site(map, table, text, site)?;
    }
    Ok(())
}

/// Patches the site whose `createHandle(` pattern starts at `site`, and
/// returns the position scanning should resume from.
fn patch_site(
    map: &BindingMap,
    table: &RecordTable,
    text: &mut String,
    site: usize,
) -> Result<usize, PatchError> {
    let malformed = |detail: &'static str| PatchError::HandleSiteMalformed {
        offset: site,
        detail,
    };

    // Opcode: skipped, but its shape is still checked.
    let mut p = site + CALL_HANDLE.len();
    if !scan::starts_with_at(text, p, scan::I32) {
        return Err(malformed("opcode operand is not i32"));
    }
    p = scan::next_arg(text, p + scan::I32.len()).ok_or(malformed("operand list ends at opcode"))?;

    // Resource class.
    if !scan::starts_with_at(text, p, ", ") {
        return Err(malformed("resource class operand missing"));
    }
    p += 2;
    if !scan::starts_with_at(text, p, scan::I8) {
        return Err(malformed("resource class operand is not i8"));
    }
    let (class_code, class_end) = scan::parse_int(text, p + scan::I8.len())
        .ok_or(malformed("resource class literal missing"))?;
    p = scan::next_arg(text, class_end)
        .ok_or(malformed("operand list ends at resource class"))?;

    // Declaration record id.
    if !scan::starts_with_at(text, p, ", ") {
        return Err(malformed("record id operand missing"));
    }
    p += 2;
    if !scan::starts_with_at(text, p, scan::I32) {
        return Err(malformed("record id operand is not i32"));
    }
    let (record_id, id_end) =
        scan::parse_int(text, p + scan::I32.len()).ok_or(malformed("record id literal missing"))?;

    // Index into the range: literal or temporary.
    let mut p = scan::next_arg(text, id_end).ok_or(malformed("operand list ends at record id"))?;
    if !scan::starts_with_at(text, p, ", ") {
        return Err(malformed("index operand missing"));
    }
    p += 2;
    if !scan::starts_with_at(text, p, scan::I32) {
        return Err(malformed("index operand is not i32"));
    }
    let index_start = p + scan::I32.len();
    let index_end =
        scan::next_arg(text, index_start).ok_or(malformed("operand list ends at index"))?;
    if index_end == index_start {
        return Err(malformed("index operand is empty"));
    }

    if scan::byte_at(text, index_start) == Some(b'%') {
        patch_dynamic_index(
            map,
            table,
            text,
            site,
            class_code as u32,
            record_id as u32,
            index_start..index_end,
        )
    } else {
        let index_end_new = replace_index(
            map,
            table,
            text,
            site,
            class_code as u32,
            record_id as u32,
            index_start..scan::number_end(text, index_start),
        )?;
        Ok(index_end_new)
    }
}

/// Rewrites the constant operand of the `add i32` feeding a dynamic index.
fn patch_dynamic_index(
    map: &BindingMap,
    table: &RecordTable,
    text: &mut String,
    site: usize,
    class_code: u32,
    record_id: u32,
    index_span: core::ops::Range<usize>,
) -> Result<usize, PatchError> {
    let malformed = |detail: &'static str| PatchError::HandleSiteMalformed {
        offset: site,
        detail,
    };

    let temp = text[index_span.clone()].to_owned();
    // `%22 = add i32 %17, 7` or `%22 = add i32 7, %17`
    let definition = format!("{temp} = add i32 ");
    let def_pos = scan::rfind_before(text, index_span.end, &definition)
        .ok_or(malformed("dynamic index definition not found"))?;

    let mut p = def_pos + definition.len();
    let constant_start = if scan::byte_at(text, p) == Some(b'%') {
        // Variable first: the constant is the second operand.
        p = scan::next_arg(text, p).ok_or(malformed("index addition has a single operand"))?;
        if !scan::starts_with_at(text, p, ", ") {
            return Err(malformed("index addition operands not separated"));
        }
        p += 2;
        if !scan::byte_at(text, p).is_some_and(|b| b.is_ascii_digit()) {
            return Err(malformed(
                "second operand of index addition is not an integer constant",
            ));
        }
        p
    } else {
        // Constant first.
        if !scan::byte_at(text, p).is_some_and(|b| b.is_ascii_digit()) {
            return Err(malformed(
                "first operand of index addition is neither variable nor constant",
            ));
        }
        p
    };
    let constant_span = constant_start..scan::number_end(text, constant_start);
    let old_len = constant_span.len();

    let new_end = replace_index(map, table, text, site, class_code, record_id, constant_span)?;
    let delta = (new_end - constant_start) as isize - old_len as isize;

    // A temporary holding a resource index is expected to occur exactly
    // twice: its definition and this use. Further uses would be silently
    // miscompiled by a base move, so flag them in diagnostic builds.
    #[cfg(debug_assertions)]
    count_temp_usages(text, &temp);

    // The rewritten constant sits before the handle site, so positions at and
    // after the site shifted by the literal's length delta.
    Ok((index_span.end as isize + delta) as usize)
}

#[cfg(debug_assertions)]
fn count_temp_usages(text: &str, temp: &str) {
    let usages = text
        .match_indices(temp)
        .filter(|(at, _)| {
            matches!(
                text.as_bytes().get(at + temp.len()),
                Some(b' ') | Some(b',')
            )
        })
        .count();
    if usages != 2 {
        tracing::warn!(
            temp,
            usages,
            "expected exactly two uses of a resource index temporary \
             (definition + handle site); extra uses are not rewritten"
        );
    }
}

/// Resolves the resource behind (`class_code`, `record_id`, index literal at
/// `span`) and rewrites the literal to the remapped bind point. Returns the
/// end position of the new literal.
fn replace_index(
    map: &BindingMap,
    table: &RecordTable,
    text: &mut String,
    site: usize,
    class_code: u32,
    record_id: u32,
    span: core::ops::Range<usize>,
) -> Result<usize, PatchError> {
    let malformed = |detail: &'static str| PatchError::HandleSiteMalformed {
        offset: site,
        detail,
    };

    let class = ResourceClass::from_handle_code(class_code)
        .ok_or(malformed("unknown resource class code"))?;
    let index: u32 = text[span.clone()]
        .parse()
        .map_err(|_| malformed("index constant is not an unsigned integer"))?;

    let (_, entry) = resolve(map, table, class, record_id, index).ok_or_else(|| {
        PatchError::ResourceNotResolved(format!(
            "handle site for {class:?} record id {record_id}, index {index}"
        ))
    })?;

    // In range by construction of `resolve`; the base cannot exceed the index.
    let offset = index - table.info(entry.uid).original_bind_point;
    let new_value = (entry.bind_point + offset).to_string();
    let end = span.start + new_value.len();
    text.replace_range(span, &new_value);
    Ok(end)
}

/// Finds the binding map entry whose declaration record and original bind
/// range account for the index a handle site actually uses.
fn resolve<'m>(
    map: &'m BindingMap,
    table: &RecordTable,
    class: ResourceClass,
    record_id: u32,
    index: u32,
) -> Option<(&'m str, &'m BindingEntry)> {
    map.iter().find(|(_, entry)| {
        let info = table.info(entry.uid);
        info.record_id == record_id
            && entry.class == class
            && info.original_bind_point != UNSET
            && u64::from(index) >= u64::from(info.original_bind_point)
            && u64::from(index) < u64::from(info.original_bind_point) + u64::from(entry.array_size)
    })
}
