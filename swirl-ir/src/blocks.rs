//! Basic Block Management
//!
//! A block is a label, its phi-style arguments, and a sequence of
//! instructions ending in exactly one terminator once construction is done.

use serde::{Deserialize, Serialize};
use crate::instructions::{Instruction, InstructionNode};
use crate::types::BlockId;
use crate::values::Value;

/// Basic Block - a sequence of instructions with a single entry and exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub arguments: Vec<Value>,
    pub instructions: Vec<InstructionNode>,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        Self {
            id,
            arguments: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn with_arguments(id: BlockId, arguments: Vec<Value>) -> Self {
        Self {
            id,
            arguments,
            instructions: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instr: impl Into<InstructionNode>) {
        self.instructions.push(instr.into());
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions
            .last()
            .map(|node| &node.instruction)
            .filter(|instr| instr.is_terminator())
    }

    pub fn has_terminator(&self) -> bool {
        self.terminator().is_some()
    }

    /// Successor labels derived from the terminator
    pub fn successors(&self) -> Vec<&BlockId> {
        self.terminator()
            .map(|instr| instr.successors())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter().map(|node| &node.instruction)
    }
}
