//! Error taxonomy for the remapper.
//!
//! Patch failures are fail-fast: a structural assumption violated by the
//! program text means the text was produced by an unexpected toolchain (or
//! was already patched), and retrying would deterministically fail the same
//! way. The orchestrator stops at the first failing stage and never returns
//! half-patched bytecode.

use core::fmt;

use thiserror::Error;

use crate::record::PatchPhase;

/// A failure while patching disassembled program text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// A declaration field did not hold the value expected to currently
    /// occupy it. This signals the record was already patched, is malformed,
    /// or the wrong record was located; guessing and patching anyway would
    /// corrupt the program, so this is a hard error.
    #[error(
        "resource '{resource}': {field} field holds {found}, expected {expected} \
         (already patched, or wrong record located?)"
    )]
    PreviousValueMismatch {
        /// Resource name from the binding map.
        resource: String,
        /// Which declaration field mismatched (`"space"` or `"binding"`).
        field: &'static str,
        /// Value expected to currently occupy the field (`-1` = unassigned).
        expected: i64,
        /// Value actually parsed from the program text.
        found: i64,
    },

    /// A located declaration record does not have the shape the patcher
    /// understands.
    #[error("resource '{resource}': {detail}")]
    UnexpectedRecordShape {
        /// Resource name, or a positional description for anonymous records.
        resource: String,
        /// What went wrong.
        detail: String,
    },

    /// A handle-acquisition site does not have the expected instruction
    /// shape.
    #[error("handle site at byte {offset}: {detail}")]
    HandleSiteMalformed {
        /// Byte offset of the site within the program text.
        offset: usize,
        /// What went wrong.
        detail: &'static str,
    },

    /// A declaration or handle site references a resource no binding map
    /// entry accounts for: the binding map is inconsistent with the compiled
    /// program.
    #[error("no binding map entry resolves {0}")]
    ResourceNotResolved(String),

    /// A patch pass ran out of order. The named declaration pass must record
    /// pre-patch locations before the positional pass can match on them, and
    /// both must run before handle sites are patched.
    #[error("patch pass ordering violated: expected phase {expected:?}, table is in {actual:?}")]
    PhaseOrdering {
        /// Phase the pass requires the table to be in.
        expected: PatchPhase,
        /// Phase the table is actually in.
        actual: PatchPhase,
    },
}

/// Diagnostic output from an external toolchain call, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolchainError {
    /// The collaborator's diagnostic text.
    pub message: String,
}

impl ToolchainError {
    /// Wraps diagnostic text from a toolchain collaborator.
    pub fn new(message: impl Into<String>) -> ToolchainError {
        ToolchainError {
            message: message.into(),
        }
    }
}

/// The remap stage that failed, for offline diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapStage {
    /// Reflecting the source bytecode.
    Reflect,
    /// Disassembling the source bytecode into program text.
    Disassemble,
    /// Reassembling the patched program text.
    Assemble,
    /// Validating/signing the reassembled container.
    Validate,
}

impl fmt::Display for RemapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemapStage::Reflect => "reflection",
            RemapStage::Disassemble => "disassembly",
            RemapStage::Assemble => "assembly",
            RemapStage::Validate => "validation",
        };
        f.write_str(name)
    }
}

/// A failure of a whole remap call.
///
/// A failed remap means the compiled program cannot be reused as-is for the
/// requested binding layout; the caller's fallback is to recompile from
/// source with the desired bindings baked in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemapError {
    /// The input is not a recognized DXIL container. Not fatal to the
    /// caller: an alternate bytecode path may apply.
    #[error("input is not a recognized DXIL container")]
    FormatNotRecognized,

    /// The binding map disagrees with what reflection reports for the
    /// compiled program.
    #[error("binding map entry '{name}' disagrees with shader reflection: {detail}")]
    BindingMismatch {
        /// Resource name from the binding map.
        name: String,
        /// What disagreed.
        detail: String,
    },

    /// Patching the program text failed.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// An external toolchain stage failed; the underlying diagnostic text is
    /// propagated verbatim.
    #[error("{stage} failed: {source}")]
    Toolchain {
        /// Which stage failed.
        stage: RemapStage,
        /// The collaborator's diagnostics.
        source: ToolchainError,
    },
}

impl RemapError {
    pub(crate) fn toolchain(stage: RemapStage) -> impl FnOnce(ToolchainError) -> RemapError {
        move |source| RemapError::Toolchain { stage, source }
    }
}
