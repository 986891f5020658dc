//! The per-remap record table shared between patch passes.
//!
//! One [`RecordInfo`] per binding map uid, created fresh for each remap call
//! and discarded afterwards. The named declaration pass and the reflection
//! seeding step populate it; the positional declaration pass and the
//! handle-site pass consume it. The passes have a strict ordering dependency,
//! enforced here with an explicit phase rather than by call-site discipline.

use crate::binding::BindingMap;
use crate::error::PatchError;

/// Sentinel for "not yet recorded".
///
/// This is also the two's-complement image of the `-1` literal the compiler
/// emits for unassigned binding fields, so an unpatched field read from the
/// program text compares equal to an unseeded table entry.
pub const UNSET: u32 = u32::MAX;

/// Per-resource bookkeeping accumulated while patching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    /// Register space the compiled program originally bound the resource to.
    pub original_space: u32,
    /// Bind point the compiled program originally bound the resource to.
    pub original_bind_point: u32,
    /// Intrinsic identifier of the resource's declaration record; links the
    /// declaration to every handle-acquisition site referencing it.
    pub record_id: u32,
}

impl Default for RecordInfo {
    fn default() -> RecordInfo {
        RecordInfo {
            original_space: UNSET,
            original_bind_point: UNSET,
            record_id: UNSET,
        }
    }
}

/// Patch pass ordering. Passes advance the table phase strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatchPhase {
    /// Table created and (optionally) seeded from reflection.
    Seeded,
    /// Named declaration pass has run; pre-patch locations are recorded.
    NamedDeclarations,
    /// Positional (anonymous) declaration pass has run.
    AnonymousDeclarations,
    /// Handle-site pass has run; the table is spent.
    HandleSites,
}

/// The record table threaded through the patch passes of one remap call.
#[derive(Debug)]
pub struct RecordTable {
    infos: Vec<RecordInfo>,
    phase: PatchPhase,
}

impl RecordTable {
    /// Creates a table with one unset entry per binding map uid.
    pub fn new(map: &BindingMap) -> RecordTable {
        RecordTable {
            infos: vec![RecordInfo::default(); map.len()],
            phase: PatchPhase::Seeded,
        }
    }

    /// Records a resource's pre-patch location, as reported by reflection.
    ///
    /// Only valid before any pass has run.
    pub fn seed(&mut self, uid: u32, space: u32, bind_point: u32) {
        debug_assert_eq!(self.phase, PatchPhase::Seeded);
        let info = &mut self.infos[uid as usize];
        info.original_space = space;
        info.original_bind_point = bind_point;
    }

    /// Returns the entry for `uid`.
    pub fn info(&self, uid: u32) -> &RecordInfo {
        &self.infos[uid as usize]
    }

    /// Returns the entry for `uid`, mutably.
    pub fn info_mut(&mut self, uid: u32) -> &mut RecordInfo {
        &mut self.infos[uid as usize]
    }

    /// Current phase of the table.
    pub fn phase(&self) -> PatchPhase {
        self.phase
    }

    /// Moves the table from `from` to `to`, failing loudly if a pass runs
    /// out of order.
    pub(crate) fn advance(&mut self, from: PatchPhase, to: PatchPhase) -> Result<(), PatchError> {
        if self.phase != from {
            return Err(PatchError::PhaseOrdering {
                expected: from,
                actual: self.phase,
            });
        }
        self.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PatchPhase, RecordTable, UNSET};
    use crate::binding::{BindingMap, ResourceClass};
    use crate::error::PatchError;

    fn two_entry_map() -> BindingMap {
        let mut map = BindingMap::new();
        map.insert("a", ResourceClass::Srv, 0, 0, 1);
        map.insert("b", ResourceClass::Sampler, 0, 1, 1);
        map
    }

    #[test]
    fn starts_unset_and_seeded() {
        let table = RecordTable::new(&two_entry_map());
        assert_eq!(table.phase(), PatchPhase::Seeded);
        assert_eq!(table.info(0).original_space, UNSET);
        assert_eq!(table.info(1).record_id, UNSET);
    }

    #[test]
    fn advance_enforces_ordering() {
        let mut table = RecordTable::new(&two_entry_map());
        // Skipping the named pass is a loud failure.
        let err = table
            .advance(PatchPhase::NamedDeclarations, PatchPhase::AnonymousDeclarations)
            .unwrap_err();
        assert!(matches!(err, PatchError::PhaseOrdering { .. }));

        table
            .advance(PatchPhase::Seeded, PatchPhase::NamedDeclarations)
            .unwrap();
        assert_eq!(table.phase(), PatchPhase::NamedDeclarations);
    }
}
