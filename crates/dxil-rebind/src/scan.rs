//! Low-level helpers for scanning and splicing disassembled program text.
//!
//! The program text is patched by narrow substring replacement: every patch
//! rewrites exactly one integer literal and leaves all surrounding structure
//! untouched, so scanning positions before a replacement stay valid and
//! positions after it shift by the literal's length delta only.

/// Type prefix of an `i32` operand or metadata field.
pub(crate) const I32: &str = "i32 ";
/// Type prefix of an `i8` operand.
pub(crate) const I8: &str = "i8 ";

/// `text.find(pat)` starting at byte `pos`, returning an absolute position.
pub(crate) fn find_from(text: &str, pos: usize, pat: &str) -> Option<usize> {
    text.get(pos..)?.find(pat).map(|i| i + pos)
}

/// `text.rfind(pat)` restricted to bytes before `end`.
pub(crate) fn rfind_before(text: &str, end: usize, pat: &str) -> Option<usize> {
    text.get(..end)?.rfind(pat)
}

/// Returns `true` if `pat` occurs at byte `pos`.
pub(crate) fn starts_with_at(text: &str, pos: usize, pat: &str) -> bool {
    text.get(pos..).is_some_and(|rest| rest.starts_with(pat))
}

/// The byte at `pos`, if in bounds.
pub(crate) fn byte_at(text: &str, pos: usize) -> Option<u8> {
    text.as_bytes().get(pos).copied()
}

/// End of the run of integer-literal characters (sign or digit) at `pos`.
pub(crate) fn number_end(text: &str, pos: usize) -> usize {
    let bytes = text.as_bytes();
    let mut end = pos;
    while end < bytes.len() && matches!(bytes[end], b'+' | b'-' | b'0'..=b'9') {
        end += 1;
    }
    end
}

/// Parses the integer literal at `pos`, returning its value and end position.
pub(crate) fn parse_int(text: &str, pos: usize) -> Option<(i64, usize)> {
    let end = number_end(text, pos);
    if end == pos {
        return None;
    }
    text[pos..end].parse::<i64>().ok().map(|value| (value, end))
}

/// Reads a `, i32 <N>` field starting at `pos` (at the comma).
///
/// Returns the parsed value and the literal's span.
pub(crate) fn read_i32_field(text: &str, pos: usize) -> Option<(i64, core::ops::Range<usize>)> {
    if !starts_with_at(text, pos, ", ") {
        return None;
    }
    let field = pos + 2;
    if !starts_with_at(text, field, I32) {
        return None;
    }
    let num_start = field + I32.len();
    let (value, num_end) = parse_int(text, num_start)?;
    Some((value, num_start..num_end))
}

/// Scans forward from `pos` to the `,` ending the current operand.
///
/// Returns `None` when the operand list ends first (`)` or end of line),
/// i.e. there is no further operand.
pub(crate) fn next_arg(text: &str, mut pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    while pos < bytes.len() {
        match bytes[pos] {
            b',' => return Some(pos),
            b')' | b'\n' => return None,
            _ => pos += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_field_round_trip() {
        let text = "!\"x\", i32 -1, i32 7,";
        let (value, span) = read_i32_field(text, 4).unwrap();
        assert_eq!(value, -1);
        assert_eq!(&text[span.clone()], "-1");

        let (value, span) = read_i32_field(text, span.end).unwrap();
        assert_eq!(value, 7);
        assert_eq!(&text[span], "7");
    }

    #[test]
    fn i32_field_rejects_other_shapes() {
        assert!(read_i32_field("i32 5", 0).is_none()); // no comma
        assert!(read_i32_field(", i8 5", 0).is_none()); // wrong type
        assert!(read_i32_field(", i32 x", 0).is_none()); // no literal
    }

    #[test]
    fn next_arg_stops_at_list_end() {
        let text = "i32 57, i8 2)";
        assert_eq!(next_arg(text, 0), Some(6));
        assert_eq!(next_arg(text, 7), None);
        assert_eq!(next_arg("i32 7\n", 0), None);
    }
}
