//! Test doubles for the toolchain seams, plus small program-text builders.
//!
//! The mock "toolchain" stores program text verbatim as the payload part of a
//! structurally-valid container, so disassembly and assembly are lossless and
//! the patch passes can be exercised end to end without the real compiler
//! library. The [`TextReflector`] stands in for the reflection facility by
//! scanning that same text: named declaration records are read directly, and
//! `; reflect:` comment lines report resources whose declarations carry no
//! name (standing in for the reflection blob a real container embeds).

use std::cell::Cell;

use dxil_container::test_utils::build_container;
use dxil_container::{ContainerFile, PART_DXIL};

use crate::binding::ResourceClass;
use crate::error::ToolchainError;
use crate::toolchain::{
    CompileInput, CompiledShader, Reflection, ResourceBindingDesc, Toolchain, ToolchainVersion,
};

/// Type signature used for 2D texture declarations.
pub const TEXTURE2D_TYPE: &str = "%\"class.Texture2D<vector<float, 4> >\"";
/// Type signature used for read-write 2D texture declarations.
pub const RWTEXTURE2D_TYPE: &str = "%\"class.RWTexture2D<vector<float, 4> >\"";
/// Type signature used for sampler declarations.
pub const SAMPLER_TYPE: &str = "%struct.SamplerState";

/// Wraps program text as the payload part of a valid container.
pub fn program_container(text: &str) -> Vec<u8> {
    build_container(&[(PART_DXIL, text.as_bytes())])
}

/// Extracts the program text stored by [`program_container`].
pub fn program_text(bytecode: &[u8]) -> Result<String, ToolchainError> {
    let file =
        ContainerFile::parse(bytecode).map_err(|err| ToolchainError::new(err.to_string()))?;
    let part = file
        .program_part()
        .ok_or_else(|| ToolchainError::new("container has no program part"))?;
    String::from_utf8(part.data.to_vec())
        .map_err(|_| ToolchainError::new("program part is not UTF-8"))
}

/// Formats a resource declaration record that kept its name.
pub fn named_declaration(
    md: u32,
    record_id: u32,
    ty: &str,
    name: &str,
    space: i64,
    bind_point: i64,
    range: u32,
) -> String {
    format!(
        "!{md} = !{{i32 {record_id}, {ty}* @\"{name}\", !\"{name}\", \
         i32 {space}, i32 {bind_point}, i32 {range}, i32 2, i1 false, null}}"
    )
}

/// Formats a name-stripped resource declaration record.
pub fn anonymous_declaration(
    md: u32,
    record_id: u32,
    ty: &str,
    space: i64,
    bind_point: i64,
    range: u32,
) -> String {
    format!(
        "!{md} = !{{i32 {record_id}, {ty}* undef, !\"\", \
         i32 {space}, i32 {bind_point}, i32 {range}, i32 2, i1 false, null}}"
    )
}

/// Formats a handle-acquisition instruction.
///
/// `index` is either an integer literal (`"3"`) or an SSA temporary
/// (`"%22"`) for dynamic indexing.
pub fn create_handle(result: &str, class: ResourceClass, record_id: u32, index: &str) -> String {
    format!(
        "  %{result} = call %dx.types.Handle @dx.op.createHandle(\
         i32 57, i8 {}, i32 {record_id}, i32 {index}, i1 false)",
        class.handle_code()
    )
}

/// Formats the `add` that computes a dynamic resource index from a variable
/// and the array's base bind point. Either operand may be the constant.
pub fn add_index(result: &str, lhs: &str, rhs: &str) -> String {
    format!("  %{result} = add i32 {lhs}, {rhs}")
}

/// Formats the comment line [`TextReflector`] reads for resources whose
/// declaration carries no name.
pub fn reflect_comment(
    name: &str,
    class: ResourceClass,
    space: u32,
    bind_point: u32,
    count: u32,
) -> String {
    format!(
        "; reflect: {name} {} space={space} bind={bind_point} count={count}",
        class_word(class)
    )
}

fn class_word(class: ResourceClass) -> &'static str {
    match class {
        ResourceClass::Srv => "srv",
        ResourceClass::Uav => "uav",
        ResourceClass::Cbuffer => "cbuffer",
        ResourceClass::Sampler => "sampler",
    }
}

/// In-memory toolchain whose container payload is the program text itself.
#[derive(Debug, Default)]
pub struct MockToolchain {
    /// Makes `disassemble` fail with a canned diagnostic.
    pub fail_disassemble: bool,
    /// Makes `assemble` fail with a canned diagnostic.
    pub fail_assemble: bool,
    /// Makes `validate` fail with a canned diagnostic.
    pub fail_validate: bool,
    /// Number of `validate` calls observed.
    pub validations: Cell<usize>,
}

impl MockToolchain {
    /// Creates a mock that succeeds at everything.
    pub fn new() -> MockToolchain {
        MockToolchain::default()
    }
}

impl Toolchain for MockToolchain {
    fn disassemble(&self, bytecode: &[u8]) -> Result<String, ToolchainError> {
        if self.fail_disassemble {
            return Err(ToolchainError::new("disassembly rejected by mock"));
        }
        program_text(bytecode)
    }

    fn assemble(&self, program: &str) -> Result<Vec<u8>, ToolchainError> {
        if self.fail_assemble {
            return Err(ToolchainError::new("assembly rejected by mock"));
        }
        Ok(program_container(program))
    }

    fn compile(&self, _input: &CompileInput<'_>) -> Result<CompiledShader, ToolchainError> {
        Err(ToolchainError::new("mock toolchain does not compile source"))
    }

    fn validate(&self, bytecode: &[u8]) -> Result<Vec<u8>, ToolchainError> {
        self.validations.set(self.validations.get() + 1);
        if self.fail_validate {
            return Err(ToolchainError::new("validation rejected by mock"));
        }
        Ok(bytecode.to_vec())
    }

    fn version(&self) -> ToolchainVersion {
        ToolchainVersion { major: 1, minor: 6 }
    }
}

/// Reflection double that scans the program text inside a mock container.
#[derive(Debug, Default)]
pub struct TextReflector;

impl Reflection for TextReflector {
    fn reflect(&self, bytecode: &[u8]) -> Result<Vec<ResourceBindingDesc>, ToolchainError> {
        let text = program_text(bytecode)?;
        let mut out = Vec::new();
        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("; reflect: ") {
                let desc = parse_reflect_comment(rest).ok_or_else(|| {
                    ToolchainError::new(format!("malformed reflect comment: {line}"))
                })?;
                out.push(desc);
            } else if let Some(desc) = parse_named_record(line) {
                out.push(desc);
            }
        }
        Ok(out)
    }
}

fn parse_reflect_comment(rest: &str) -> Option<ResourceBindingDesc> {
    let mut words = rest.split_whitespace();
    let name = words.next()?.to_owned();
    let class = match words.next()? {
        "srv" => ResourceClass::Srv,
        "uav" => ResourceClass::Uav,
        "cbuffer" => ResourceClass::Cbuffer,
        "sampler" => ResourceClass::Sampler,
        _ => return None,
    };
    let space = words.next()?.strip_prefix("space=")?.parse().ok()?;
    let bind_point = words.next()?.strip_prefix("bind=")?.parse().ok()?;
    let bind_count = words.next()?.strip_prefix("count=")?.parse().ok()?;
    Some(ResourceBindingDesc {
        name,
        class,
        bind_point,
        space,
        bind_count,
    })
}

/// Reads a named resource declaration record back out of the program text.
///
/// Resource records carry a pointer field before the name string; any other
/// metadata line (or a name-stripped record) yields `None`.
fn parse_named_record(line: &str) -> Option<ResourceBindingDesc> {
    let body = line.split_once(" = !{i32 ")?.1;
    let name_field = body.find(", !\"")?;
    let ty = &body[..name_field];
    if !ty.contains("* @") && !ty.contains("* undef") {
        return None;
    }
    let (name, rest) = body[name_field + 4..].split_once('"')?;
    if name.is_empty() {
        return None;
    }
    let (space, rest) = read_i32(rest)?;
    let (bind_point, rest) = read_i32(rest)?;
    let (bind_count, _) = read_i32(rest)?;

    let class = if ty.contains("class.RW") {
        ResourceClass::Uav
    } else if ty.contains("%\"class.") {
        ResourceClass::Srv
    } else if ty.contains("struct.SamplerState") {
        ResourceClass::Sampler
    } else {
        ResourceClass::Cbuffer
    };
    Some(ResourceBindingDesc {
        name: name.to_owned(),
        class,
        bind_point: bind_point as u32,
        space: space as u32,
        bind_count: bind_count as u32,
    })
}

fn read_i32(rest: &str) -> Option<(i64, &str)> {
    let rest = rest.strip_prefix(", i32 ")?;
    let end = rest
        .find(|c: char| c != '-' && !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value = rest[..end].parse().ok()?;
    Some((value, &rest[end..]))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn mock_toolchain_round_trips_program_text() {
        let mock = MockToolchain::new();
        let bytecode = mock.assemble("target datalayout = \"e-m:e\"\n").unwrap();
        assert_eq!(
            mock.disassemble(&bytecode).unwrap(),
            "target datalayout = \"e-m:e\"\n"
        );
    }

    #[test]
    fn reflector_reads_named_records_and_comments() {
        let text = format!(
            "{}\n{}\n{}\n",
            named_declaration(10, 0, TEXTURE2D_TYPE, "g_Tex", 0, 3, 1),
            named_declaration(11, 0, SAMPLER_TYPE, "g_Sampler", 1, 5, 8),
            reflect_comment("Constants", ResourceClass::Cbuffer, 0, 1, 1),
        );
        let descs = TextReflector
            .reflect(&program_container(&text))
            .unwrap();

        assert_eq!(descs.len(), 3);
        assert_eq!(descs[0].name, "g_Tex");
        assert_eq!(descs[0].class, ResourceClass::Srv);
        assert_eq!((descs[0].space, descs[0].bind_point, descs[0].bind_count), (0, 3, 1));
        assert_eq!(descs[1].class, ResourceClass::Sampler);
        assert_eq!((descs[1].space, descs[1].bind_point, descs[1].bind_count), (1, 5, 8));
        assert_eq!(descs[2].name, "Constants");
        assert_eq!(descs[2].class, ResourceClass::Cbuffer);
    }

    #[test]
    fn reflector_skips_non_resource_metadata() {
        let text = "!20 = !{i32 1, !\"main\"}\n!21 = !{!\"dx.version\"}\n";
        let descs = TextReflector.reflect(&program_container(text)).unwrap();
        assert!(descs.is_empty());

        // Name-stripped records are invisible without a reflect comment.
        let stripped = format!(
            "{}\n",
            anonymous_declaration(10, 0, TEXTURE2D_TYPE, 0, 3, 1)
        );
        let descs = TextReflector.reflect(&program_container(&stripped)).unwrap();
        assert!(descs.is_empty());
    }
}
