//! Analysis IR for the SWIRL front end
//!
//! This crate defines the IR that per-file translations produce and that
//! whole-program analyses consume, together with its round-trippable text
//! dialect.
//!
//! ## Architecture
//!
//! - `types` - Type tags, block labels and quoting rules
//! - `values` - Values and their insertion-ordered tables
//! - `instructions` - The closed instruction set and its effect classes
//! - `blocks` / `function` / `module` - Structural containers
//! - `builder` - Block-by-block function construction
//! - `printer` / `lexer` / `parser` - The simplified text dialect
//! - `verify` - Structural invariants
//! - `passes` - Pruning and line-number assignment
//! - `merge` - Whole-program module merging

pub use self::blocks::BasicBlock;
pub use self::builder::FunctionBuilder;
pub use self::function::{Function, Linkage};
pub use self::instructions::{
    BranchTarget, Effect, Instruction, InstructionNode, Metadata, SwitchCase,
};
pub use self::merge::{merge_results, MergeReport, ModuleGroup, ModuleMerger, ProgramView};
pub use self::module::Module;
pub use self::parser::parse_module;
pub use self::printer::{print_module, PrintedUnit, Printer, PrinterOptions};
pub use self::types::{BlockId, IrType};
pub use self::values::{
    FloatValue, GlobalValueTable, GlobalVariable, Literal, Named, NamedTable, Scope, Value, ValueTable,
};
pub use self::verify::{verify_function, verify_module};

pub mod passes;
pub mod types;
pub mod values;

mod blocks;
mod builder;
mod function;
mod instructions;
mod lexer;
mod merge;
mod module;
mod parser;
mod printer;
mod verify;

#[cfg(test)]
mod tests;
