//! IR Builder
//!
//! Provides utilities for constructing a function block by block. Results are
//! registered in the function's value table as they are defined; operands are
//! only ever looked up.

use swirl_common::{SwirlError, SwirlResult};
use crate::blocks::BasicBlock;
use crate::function::{Function, Linkage};
use crate::instructions::{Instruction, InstructionNode};
use crate::types::{BlockId, IrType};
use crate::values::Value;

/// Builder for constructing one function
#[derive(Debug)]
pub struct FunctionBuilder {
    function: Function,
    current_block: Option<usize>,
    next_temp_id: usize,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, linkage: Linkage, ty: IrType) -> Self {
        Self {
            function: Function::new(name, linkage, ty),
            current_block: None,
            next_temp_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    /// Append a block and define its arguments
    pub fn create_block(&mut self, id: BlockId, arguments: Vec<(String, IrType)>) -> SwirlResult<()> {
        if self.has_block(&id) {
            return Err(SwirlError::duplicate(
                id.as_str(),
                &format!("function '{}'", self.function.name),
            ));
        }
        let mut values = Vec::with_capacity(arguments.len());
        for (name, ty) in arguments {
            values.push(self.define(&name, ty)?);
        }
        self.function.blocks.push(BasicBlock::with_arguments(id, values));
        Ok(())
    }

    pub fn has_block(&self, id: &BlockId) -> bool {
        self.function.blocks.iter().any(|b| &b.id == id)
    }

    /// Make `id` the block that `push` appends to
    pub fn switch_to(&mut self, id: &BlockId) -> SwirlResult<()> {
        match self.function.blocks.iter().position(|b| &b.id == id) {
            Some(index) => {
                self.current_block = Some(index);
                Ok(())
            }
            None => Err(SwirlError::unresolved(
                id.as_str(),
                &format!("function '{}'", self.function.name),
            )),
        }
    }

    /// Create a local value; fails if the name is already defined
    pub fn define(&mut self, name: &str, ty: IrType) -> SwirlResult<Value> {
        let value = Value::local(name, ty);
        self.function.values.add(value.clone())?;
        Ok(value)
    }

    /// Define a compiler-introduced local with a name no input uses
    pub fn new_temp(&mut self, ty: IrType) -> SwirlResult<Value> {
        loop {
            let name = format!("t{}", self.next_temp_id);
            self.next_temp_id += 1;
            if !self.function.values.contains(&name) {
                return self.define(&name, ty);
            }
        }
    }

    /// Look up an operand defined earlier
    pub fn value(&self, name: &str) -> SwirlResult<Value> {
        self.function.values.get(name).cloned()
    }

    pub fn push(&mut self, instr: Instruction) -> SwirlResult<()> {
        self.push_node(InstructionNode::new(instr))
    }

    pub fn push_node(&mut self, node: InstructionNode) -> SwirlResult<()> {
        let name = self.function.name.clone();
        let index = self
            .current_block
            .ok_or_else(|| SwirlError::invariant(&name, "no current block"))?;
        let block = &mut self.function.blocks[index];
        if block.has_terminator() {
            return Err(SwirlError::invariant(
                &name,
                format!("'{}' follows the terminator of {}", node.instruction.opcode(), block.id),
            ));
        }
        block.add_instruction(node);
        Ok(())
    }

    pub fn current_block_has_terminator(&self) -> bool {
        self.current_block
            .and_then(|index| self.function.blocks.get(index))
            .is_some_and(BasicBlock::has_terminator)
    }

    pub fn finish(self) -> Function {
        self.function
    }
}
