//! Two-phase lowering of a raw module
//!
//! Phase A declares every global, function and block so that the lowering
//! of any block can name them. Phase B lowers the pending raw instructions
//! block by block, then every function is verified before it joins the
//! module.

use crate::lower::{literal_parts, parse_float, parse_integer, InstructionContext};
use crate::sil::raw::{RawInstruction, RawModule};
use crate::sil::text::{string_literal, values};
use log::debug;
use std::collections::HashMap;
use swirl_common::SwirlResult;
use swirl_ir::passes::{assign_line_numbers, prune_module};
use swirl_ir::{verify_function, BlockId, FunctionBuilder, IrType, Linkage, Literal, Module};

/// Lowering state for one translation unit
pub struct ProgramContext {
    module: Module,
    builders: Vec<FunctionBuilder>,
    /// Raw instructions per (function index, block), waiting for phase B
    pending: HashMap<(usize, BlockId), Vec<RawInstruction>>,
}

impl ProgramContext {
    /// Phase A: declare globals, functions and blocks
    pub fn new(raw: RawModule) -> SwirlResult<Self> {
        let mut module = Module::new(raw.name);
        for global in &raw.globals {
            let initializer = evaluate_initializer(&global.initializer);
            module
                .globals
                .declare(&global.name, IrType::new(global.ty.as_str()), initializer);
        }

        let mut builders = Vec::with_capacity(raw.functions.len());
        let mut pending = HashMap::new();
        for (index, function) in raw.functions.into_iter().enumerate() {
            let linkage = if function.blocks.is_some() {
                Linkage::Linked
            } else {
                Linkage::Model
            };
            let mut builder = FunctionBuilder::new(function.name, linkage, IrType::new(function.ty));
            for block in function.blocks.unwrap_or_default() {
                let id = BlockId::new(block.label);
                let arguments = block
                    .arguments
                    .into_iter()
                    .map(|(name, ty)| (name, IrType::new(ty)))
                    .collect();
                builder.create_block(id.clone(), arguments)?;
                pending.insert((index, id), block.instructions);
            }
            builders.push(builder);
        }

        Ok(Self {
            module,
            builders,
            pending,
        })
    }

    /// Phase B: lower every pending block and move the verified functions
    /// into the module
    pub fn lower(&mut self) -> SwirlResult<()> {
        let globals = &mut self.module.globals;
        for (index, builder) in self.builders.iter_mut().enumerate() {
            let labels: Vec<BlockId> = builder
                .function()
                .blocks
                .iter()
                .map(|block| block.id.clone())
                .collect();
            for label in labels {
                let instructions = self.pending.remove(&(index, label.clone())).unwrap_or_default();
                builder.switch_to(&label)?;
                for raw in &instructions {
                    InstructionContext::new(builder, globals, raw).lower()?;
                }
            }
        }

        for builder in self.builders.drain(..) {
            let function = builder.finish();
            if function.has_body() {
                verify_function(&function)?;
            }
            debug!(
                "Lowered '{}': {} blocks, {} instructions",
                function.name,
                function.blocks.len(),
                function.instruction_count()
            );
            self.module.add_function(function)?;
        }
        Ok(())
    }

    /// Remove dead pure instructions; returns how many were removed
    pub fn prune_ir(&mut self) -> SwirlResult<usize> {
        prune_module(&mut self.module)
    }

    /// Number every instruction by its line in the printed module
    pub fn generate_line_numbers(&mut self) -> usize {
        assign_line_numbers(&mut self.module)
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn into_module(self) -> Module {
        self.module
    }
}

/// Reduce a static initializer to a literal: literals, propagated through
/// single-element wrappers such as `struct $Int (%0 : $Builtin.Int64)`
fn evaluate_initializer(instructions: &[RawInstruction]) -> Option<Literal> {
    let mut known: HashMap<&str, Literal> = HashMap::new();
    let mut last = None;
    for raw in instructions {
        let literal = match raw.opcode.as_str() {
            "integer_literal" => literal_parts(&raw.arguments)
                .and_then(|(_, text)| parse_integer(text))
                .map(Literal::Int),
            "float_literal" => literal_parts(&raw.arguments)
                .and_then(|(ty, text)| parse_float(text, &ty))
                .map(Literal::Float),
            "string_literal" => string_literal(&raw.arguments).map(Literal::Str),
            "struct" | "tuple" | "enum" => {
                match values(&raw.arguments).as_slice() {
                    [single] => known.get(single.as_str()).cloned(),
                    _ => None,
                }
            }
            _ => None,
        };
        let Some(literal) = literal else {
            debug!("Initializer does not reduce to a literal at '{}'", raw.opcode);
            return None;
        };
        if let Some(name) = raw.results.first() {
            known.insert(name.as_str(), literal.clone());
        }
        last = Some(literal);
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sil::parse_sil;
    use indoc::indoc;
    use swirl_common::SwirlError;
    use swirl_ir::{FloatValue, Instruction, Value};

    fn context(text: &str) -> SwirlResult<ProgramContext> {
        let mut context = ProgramContext::new(parse_sil(text, "m", "m.sil")?)?;
        context.lower()?;
        Ok(context)
    }

    #[test]
    fn test_initializers_reduce_to_literals() {
        let text = indoc! {r#"
            sil_global @a : $Int = {
              %0 = integer_literal $Builtin.Int64, 5
              %initval = struct $Int (%0 : $Builtin.Int64)
            }
            sil_global @b : $Double = {
              %0 = float_literal $Builtin.FPIEEE64, 0x3FF8000000000000 // 1.5
              %initval = struct $Double (%0 : $Builtin.FPIEEE64)
            }
            sil_global @c : $C = {
              %initval = object $C ()
            }
            sil_global @d : $Int
        "#};
        let module = context(text).unwrap().into_module();
        assert_eq!(module.globals.initializer("a"), Some(&Literal::Int(5)));
        assert_eq!(module.globals.initializer("b"), Some(&Literal::Float(FloatValue(1.5))));
        assert_eq!(module.globals.initializer("c"), None);
        assert_eq!(module.globals.initializer("d"), None);
        assert_eq!(module.globals.len(), 4);
    }

    #[test]
    fn test_blocks_may_branch_forward() {
        let text = indoc! {"
            sil @f : $@convention(thin) (Int) -> Int {
            bb0(%0 : $Int):
              br bb2(%0 : $Int)
            bb1:
              unreachable
            bb2(%1 : $Int):
              return %1 : $Int
            }
        "};
        let module = context(text).unwrap().into_module();
        let f = module.get_function("f").unwrap();
        assert_eq!(f.linkage, Linkage::Linked);
        assert_eq!(f.blocks.len(), 3);
        assert_eq!(
            f.blocks[2].terminator(),
            Some(&Instruction::Return {
                value: Some(Value::local("1", IrType::new("Int")))
            })
        );
    }

    #[test]
    fn test_values_from_earlier_blocks_resolve() {
        let text = indoc! {"
            sil @f : $@convention(thin) () -> Int {
            bb0:
              %0 = integer_literal $Builtin.Int64, 1
              br bb1
            bb1:
              %1 = struct $Int (%0 : $Builtin.Int64)
              return %1 : $Int
            }
        "};
        assert!(context(text).is_ok());
    }

    #[test]
    fn test_missing_terminator_is_an_invariant_violation() {
        let text = indoc! {"
            sil @f : $@convention(thin) () -> () {
            bb0:
              %0 = integer_literal $Builtin.Int64, 1
            }
        "};
        assert!(matches!(
            context(text).err(),
            Some(SwirlError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_passes_run_over_the_context() {
        let text = indoc! {"
            sil @f : $@convention(thin) () -> () {
            bb0:
              %0 = integer_literal $Builtin.Int64, 1
              %1 = tuple ()
              return %1 : $()
            }
        "};
        let mut context = context(text).unwrap();
        assert_eq!(context.prune_ir().unwrap(), 1);
        assert_eq!(context.generate_line_numbers(), 2);
        let f = context.module().get_function("f").unwrap();
        let lines: Vec<_> = f.blocks[0]
            .instructions
            .iter()
            .map(|node| node.metadata.line)
            .collect();
        assert_eq!(lines, vec![Some(5), Some(6)]);
    }
}
