//! Raw parse nodes for the low-level dialect
//!
//! Produced by the syntax pass without resolving any name. Argument text is
//! kept verbatim and interpreted only during lowering.

use swirl_common::SourceLocation;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawModule {
    pub name: String,
    pub globals: Vec<RawGlobal>,
    pub functions: Vec<RawFunction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawGlobal {
    pub name: String,
    pub ty: String,
    /// Static initializer body, empty when the global has none
    pub initializer: Vec<RawInstruction>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawFunction {
    pub name: String,
    pub ty: String,
    /// `None` for a declaration without a body
    pub blocks: Option<Vec<RawBlock>>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    pub label: String,
    /// `(name, type)` pairs, names without the `%` sigil
    pub arguments: Vec<(String, String)>,
    pub instructions: Vec<RawInstruction>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawInstruction {
    /// Result names without the `%` sigil
    pub results: Vec<String>,
    pub opcode: String,
    pub arguments: String,
    /// Where the instruction appears in the dump
    pub location: SourceLocation,
    /// Source position recorded by the compiler (`loc "file":line:col`)
    pub position: Option<SourceLocation>,
}
