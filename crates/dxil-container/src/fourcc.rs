use core::fmt;

/// A four-character code identifying a container part (e.g. `DXIL`, `RDAT`).
///
/// Stored as the raw little-endian bytes as they appear in the container.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Reads a `FourCC` from `bytes` at `offset`, if in bounds.
    pub(crate) fn read(bytes: &[u8], offset: usize) -> Option<FourCC> {
        let end = offset.checked_add(4)?;
        let slice = bytes.get(offset..end)?;
        Some(FourCC([slice[0], slice[1], slice[2], slice[3]]))
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            // Non-printable bytes are rendered as '.' so hostile input cannot
            // corrupt log output.
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCC({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::FourCC;

    #[test]
    fn display_printable() {
        assert_eq!(FourCC(*b"DXIL").to_string(), "DXIL");
    }

    #[test]
    fn display_masks_non_printable() {
        assert_eq!(FourCC([b'D', 0x01, 0xFF, b'L']).to_string(), "D..L");
    }
}
