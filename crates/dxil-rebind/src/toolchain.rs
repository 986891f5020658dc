//! Collaborator interfaces to the external shader toolchain.
//!
//! The remapper never parses shader source or produces container bytes
//! itself; it drives an external compiler through the narrow [`Toolchain`]
//! and [`Reflection`] traits. Production implementations wrap the DirectX
//! shader compiler library; tests substitute mocks.

use std::sync::OnceLock;

use crate::binding::ResourceClass;
use crate::error::ToolchainError;

/// Shader pipeline stage, used to pick target-specific compile arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
    RayGeneration,
    RayMiss,
    RayClosestHit,
    RayAnyHit,
    RayIntersection,
    Callable,
}

impl ShaderStage {
    /// Ray-tracing stages need extra SPIR-V extensions on the Vulkan target.
    pub fn is_ray_tracing(self) -> bool {
        matches!(
            self,
            ShaderStage::RayGeneration
                | ShaderStage::RayMiss
                | ShaderStage::RayClosestHit
                | ShaderStage::RayAnyHit
                | ShaderStage::RayIntersection
                | ShaderStage::Callable
        )
    }
}

/// A shader model version (e.g. 6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ShaderModel {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

/// Version of the loaded compiler library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolchainVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl ToolchainVersion {
    fn at_least(self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

/// Maps a compiler library version to the highest shader model it supports.
pub fn max_shader_model(version: ToolchainVersion) -> ShaderModel {
    match (version.major, version.minor) {
        (1, 5) => ShaderModel { major: 6, minor: 5 },
        (1, 4) => ShaderModel { major: 6, minor: 4 },
        (1, 2) | (1, 3) => ShaderModel { major: 6, minor: 1 },
        _ if version.at_least(1, 6) => ShaderModel { major: 6, minor: 6 },
        _ => ShaderModel { major: 6, minor: 0 },
    }
}

/// Compilation backend the toolchain targets.
///
/// Each target supplies its own argument set and decides whether the
/// produced container must be validated and signed before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerTarget {
    /// Native DXIL for Direct3D 12. Output must be validated/signed.
    Direct3D12,
    /// SPIR-V emitted through the compiler's Vulkan backend.
    Vulkan,
}

impl CompilerTarget {
    /// Whether containers produced for this target must pass the external
    /// validator (which also signs them).
    pub fn requires_validation(self) -> bool {
        matches!(self, CompilerTarget::Direct3D12)
    }

    /// Base compile arguments for this target.
    ///
    /// `debug` selects debug-info/no-optimization flags on the Direct3D
    /// target; `version` gates flags newer compiler releases understand.
    pub fn compile_args(
        self,
        stage: ShaderStage,
        version: ToolchainVersion,
        debug: bool,
    ) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        match self {
            CompilerTarget::Direct3D12 => {
                // Matrices in column-major order.
                args.push("-Zpc".into());
                if debug {
                    args.push("-Zi".into());
                    args.push("-Od".into());
                    if version.at_least(1, 5) {
                        // Silences "no output provided for debug" by embedding
                        // the PDB in the container.
                        args.push("-Qembed_debug".into());
                    }
                } else if version.at_least(1, 5) {
                    args.push("-O3".into());
                } else {
                    args.push("-Od".into());
                }
            }
            CompilerTarget::Vulkan => {
                args.push("-spirv".into());
                args.push("-fspv-reflect".into());
                args.push("-O3".into());
                if stage.is_ray_tracing() {
                    // Defaults must be restated once any -fspv-extension is
                    // passed explicitly.
                    args.push("-fspv-extension=SPV_GOOGLE_hlsl_functionality1".into());
                    args.push("-fspv-extension=SPV_GOOGLE_user_type".into());
                    args.push("-fspv-extension=SPV_NV_ray_tracing".into());
                }
            }
        }
        args
    }
}

/// Input to a source compilation.
#[derive(Debug, Clone)]
pub struct CompileInput<'a> {
    /// Shader source text.
    pub source: &'a str,
    /// Entry point function name.
    pub entry_point: &'a str,
    /// Target profile string (e.g. `ps_6_5`).
    pub profile: &'a str,
    /// Additional compiler arguments (see [`CompilerTarget::compile_args`]).
    pub args: &'a [String],
}

/// Result of a successful source compilation.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    /// The produced bytecode container.
    pub bytecode: Vec<u8>,
    /// Compiler warnings, verbatim.
    pub diagnostics: String,
}

/// One resource binding as reported by shader reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBindingDesc {
    /// Resource name.
    pub name: String,
    /// Resource category.
    pub class: ResourceClass,
    /// Bind point the compiled program uses.
    pub bind_point: u32,
    /// Register space the compiled program uses.
    pub space: u32,
    /// Number of consecutive bind points occupied (0 = unbounded).
    pub bind_count: u32,
}

/// The external compiler toolchain.
///
/// All methods are synchronous; diagnostics are surfaced verbatim through
/// [`ToolchainError`].
pub trait Toolchain {
    /// Disassembles a bytecode container into mutable program text.
    fn disassemble(&self, bytecode: &[u8]) -> Result<String, ToolchainError>;

    /// Assembles program text back into a bytecode container.
    fn assemble(&self, program: &str) -> Result<Vec<u8>, ToolchainError>;

    /// Compiles shader source into a bytecode container.
    fn compile(&self, input: &CompileInput<'_>) -> Result<CompiledShader, ToolchainError>;

    /// Validates (and, where the format demands it, signs) a container.
    ///
    /// Returns the finished container, which may differ from the input by
    /// the embedded signature.
    fn validate(&self, bytecode: &[u8]) -> Result<Vec<u8>, ToolchainError>;

    /// Version of the underlying compiler library.
    fn version(&self) -> ToolchainVersion;
}

/// The external reflection facility.
pub trait Reflection {
    /// Enumerates the resources a compiled program declares, with their
    /// original bind locations.
    fn reflect(&self, bytecode: &[u8]) -> Result<Vec<ResourceBindingDesc>, ToolchainError>;
}

/// Lazily-initialized toolchain handle.
///
/// Loading a compiler library is expensive and can fail; this wrapper
/// performs the load at most once even under concurrent first use, caches
/// the outcome (including failure), and serves later queries without
/// locking.
pub struct LazyToolchain<T> {
    cell: OnceLock<Result<T, ToolchainError>>,
}

impl<T> LazyToolchain<T> {
    /// Creates an empty, not-yet-loaded handle.
    pub const fn new() -> LazyToolchain<T> {
        LazyToolchain {
            cell: OnceLock::new(),
        }
    }

    /// Returns the toolchain, loading it on first use via `load`.
    ///
    /// A failed load is cached: later calls return the same error without
    /// retrying (a missing library will not appear between calls).
    pub fn get_or_load(
        &self,
        load: impl FnOnce() -> Result<T, ToolchainError>,
    ) -> Result<&T, ToolchainError> {
        match self.cell.get_or_init(load) {
            Ok(toolchain) => Ok(toolchain),
            Err(err) => Err(err.clone()),
        }
    }

    /// Returns the toolchain if it has already been loaded successfully.
    pub fn get(&self) -> Option<&T> {
        match self.cell.get() {
            Some(Ok(toolchain)) => Some(toolchain),
            _ => None,
        }
    }

    /// Whether a load has been attempted and succeeded.
    pub fn is_loaded(&self) -> bool {
        self.get().is_some()
    }
}

impl<T> Default for LazyToolchain<T> {
    fn default() -> LazyToolchain<T> {
        LazyToolchain::new()
    }
}
