//! Structural verifier
//!
//! Checks the block-level invariants every finished function must satisfy.
//! Run after lowering, after parsing and after each pass.

use std::collections::HashSet;
use swirl_common::{SwirlError, SwirlResult};
use crate::function::Function;
use crate::module::Module;
use crate::types::is_plain_identifier;

/// Verify one function. Stubs trivially pass.
pub fn verify_function(function: &Function) -> SwirlResult<()> {
    let fail = |message: String| Err(SwirlError::invariant(&function.name, message));

    let mut labels = HashSet::new();
    for block in &function.blocks {
        if !labels.insert(&block.id) {
            return fail(format!("block label {} is defined twice", block.id));
        }
        if !is_plain_identifier(block.id.as_str()) {
            return fail(format!("block label '{}' is not a plain identifier", block.id));
        }
    }
    // Locals print bare as `%name`
    if let Some(value) = function.values.iter().find(|v| !is_plain_identifier(&v.name)) {
        return fail(format!("value name '{}' is not a plain identifier", value.name));
    }

    for block in &function.blocks {
        if block.is_empty() {
            return fail(format!("block {} is empty", block.id));
        }
        let last = block.instructions.len() - 1;
        for (position, node) in block.instructions.iter().enumerate() {
            let is_terminator = node.instruction.is_terminator();
            if position == last && !is_terminator {
                return fail(format!("block {} does not end in a terminator", block.id));
            }
            if position != last && is_terminator {
                return fail(format!(
                    "'{}' in the middle of block {}",
                    node.instruction.opcode(),
                    block.id
                ));
            }
        }
        for successor in block.successors() {
            if !labels.contains(successor) {
                return fail(format!(
                    "block {} branches to unknown block {}",
                    block.id, successor
                ));
            }
        }
    }

    Ok(())
}

pub fn verify_module(module: &Module) -> SwirlResult<()> {
    module.functions().try_for_each(verify_function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BasicBlock;
    use crate::function::Linkage;
    use crate::instructions::{BranchTarget, Instruction};
    use crate::types::{BlockId, IrType};
    use crate::values::Value;

    fn function(blocks: Vec<BasicBlock>) -> Function {
        let mut f = Function::new("f", Linkage::Linked, IrType::new("() -> ()"));
        f.blocks = blocks;
        f
    }

    fn block(label: &str, instructions: Vec<Instruction>) -> BasicBlock {
        let mut block = BasicBlock::new(BlockId::new(label));
        for instr in instructions {
            block.add_instruction(instr);
        }
        block
    }

    fn expect_violation(f: &Function, fragment: &str) {
        match verify_function(f) {
            Err(SwirlError::InvariantViolation { message, .. }) => {
                assert!(message.contains(fragment), "{message}")
            }
            other => panic!("expected invariant violation, got {other:?}"),
        }
    }

    #[test]
    fn test_well_formed_function_passes() {
        let f = function(vec![
            block("bb0", vec![Instruction::Branch { target: BranchTarget::to_block("bb1") }]),
            block("bb1", vec![Instruction::Return { value: None }]),
        ]);
        assert!(verify_function(&f).is_ok());
        assert!(verify_function(&Function::stub("g", IrType::any())).is_ok());
    }

    #[test]
    fn test_detects_violations() {
        expect_violation(&function(vec![block("bb0", vec![])]), "empty");

        let literal = Instruction::IntegerLiteral {
            result: Value::local("0", IrType::new("Int")),
            value: 1,
        };
        expect_violation(
            &function(vec![block("bb0", vec![literal])]),
            "does not end in a terminator",
        );

        expect_violation(
            &function(vec![block(
                "bb0",
                vec![Instruction::Unreachable, Instruction::Return { value: None }],
            )]),
            "middle",
        );

        expect_violation(
            &function(vec![block(
                "bb0",
                vec![Instruction::Branch { target: BranchTarget::to_block("bb9") }],
            )]),
            "unknown block bb9",
        );

        expect_violation(
            &function(vec![
                block("bb0", vec![Instruction::Unreachable]),
                block("bb0", vec![Instruction::Unreachable]),
            ]),
            "defined twice",
        );

        expect_violation(
            &function(vec![block("bb 0", vec![Instruction::Unreachable])]),
            "label 'bb 0'",
        );

        let mut spaced = function(vec![block("bb0", vec![Instruction::Return { value: None }])]);
        spaced.values.add(Value::local("a b", IrType::new("Int"))).unwrap();
        expect_violation(&spaced, "value name 'a b'");
    }
}
