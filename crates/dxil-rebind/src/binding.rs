//! The binding map: the caller's desired resource-to-slot assignments.
//!
//! A [`BindingMap`] is produced elsewhere (from a pipeline's resource
//! signature) and is read-only to the remapper. Entries are keyed by resource
//! name and carry a dense `uid` assigned at insertion time; the uid indexes
//! the per-remap [`RecordTable`](crate::record::RecordTable).

use std::collections::BTreeMap;

/// Category of GPU-bound resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Shader resource view (read-only texture or buffer).
    Srv,
    /// Unordered access view (read-write texture or buffer).
    Uav,
    /// Constant (uniform) buffer.
    Cbuffer,
    /// Sampler state.
    Sampler,
}

impl ResourceClass {
    /// Decodes the resource-class operand of a handle-acquisition
    /// instruction (`SRV = 0`, `UAV = 1`, `CBV = 2`, `Sampler = 3`).
    pub fn from_handle_code(code: u32) -> Option<ResourceClass> {
        match code {
            0 => Some(ResourceClass::Srv),
            1 => Some(ResourceClass::Uav),
            2 => Some(ResourceClass::Cbuffer),
            3 => Some(ResourceClass::Sampler),
            _ => None,
        }
    }

    /// Encodes this class as the handle-acquisition operand value.
    pub fn handle_code(self) -> u32 {
        match self {
            ResourceClass::Srv => 0,
            ResourceClass::Uav => 1,
            ResourceClass::Cbuffer => 2,
            ResourceClass::Sampler => 3,
        }
    }
}

/// Desired binding for a single named resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingEntry {
    /// Resource category; must agree with the compiled program's declaration.
    pub class: ResourceClass,
    /// Desired register space.
    pub space: u32,
    /// Desired base bind point. An array resource occupies `array_size`
    /// consecutive bind points starting here.
    pub bind_point: u32,
    /// Number of consecutive bind points the resource occupies (>= 1).
    pub array_size: u32,
    /// Dense identifier, one-to-one with the resource name, assigned at map
    /// construction time.
    pub uid: u32,
}

/// Desired resource-to-slot assignments, keyed by resource name.
///
/// Iteration order is deterministic (name order), which keeps patching and
/// error reporting stable across runs.
#[derive(Debug, Clone, Default)]
pub struct BindingMap {
    entries: BTreeMap<String, BindingEntry>,
}

impl BindingMap {
    /// Creates an empty map.
    pub fn new() -> BindingMap {
        BindingMap::default()
    }

    /// Inserts a binding for `name`, assigning the next dense uid.
    ///
    /// Re-inserting an existing name overwrites the binding but keeps the
    /// original uid, preserving uid density and uniqueness.
    ///
    /// `array_size` must be at least 1; a single (non-array) resource has
    /// `array_size == 1`.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        class: ResourceClass,
        space: u32,
        bind_point: u32,
        array_size: u32,
    ) -> u32 {
        debug_assert!(array_size >= 1, "array_size must be at least 1");
        let name = name.into();
        let uid = match self.entries.get(&name) {
            Some(existing) => existing.uid,
            None => self.entries.len() as u32,
        };
        self.entries.insert(
            name,
            BindingEntry {
                class,
                space,
                bind_point,
                array_size,
                uid,
            },
        );
        uid
    }

    /// Returns the binding for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&BindingEntry> {
        self.entries.get(name)
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, entry)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}

#[cfg(test)]
mod tests {
    use super::{BindingMap, ResourceClass};

    #[test]
    fn uids_are_dense_and_stable() {
        let mut map = BindingMap::new();
        let a = map.insert("g_Tex", ResourceClass::Srv, 0, 0, 1);
        let b = map.insert("g_Sampler", ResourceClass::Sampler, 0, 0, 1);
        assert_eq!((a, b), (0, 1));

        // Overwriting keeps the uid.
        let a2 = map.insert("g_Tex", ResourceClass::Srv, 1, 5, 1);
        assert_eq!(a2, 0);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("g_Tex").unwrap().bind_point, 5);
    }

    #[test]
    fn handle_codes_decode() {
        assert_eq!(ResourceClass::from_handle_code(0), Some(ResourceClass::Srv));
        assert_eq!(ResourceClass::from_handle_code(1), Some(ResourceClass::Uav));
        assert_eq!(ResourceClass::from_handle_code(2), Some(ResourceClass::Cbuffer));
        assert_eq!(ResourceClass::from_handle_code(3), Some(ResourceClass::Sampler));
        assert_eq!(ResourceClass::from_handle_code(4), None);

        for class in [
            ResourceClass::Srv,
            ResourceClass::Uav,
            ResourceClass::Cbuffer,
            ResourceClass::Sampler,
        ] {
            assert_eq!(ResourceClass::from_handle_code(class.handle_code()), Some(class));
        }
    }
}
