//! IR Instructions
//!
//! Defines the closed instruction set. Every variant is classified by
//! `Instruction::effect` through an exhaustive match, so a new variant
//! cannot be added without deciding whether pruning may remove it.

use serde::{Deserialize, Serialize};
use std::fmt;
use swirl_common::SourceLocation;
use crate::types::{quote, quote_string, BlockId};
use crate::values::{FloatValue, Value};

/// Target of a branch, with the values passed as block arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTarget {
    pub block: BlockId,
    pub args: Vec<Value>,
}

impl BranchTarget {
    pub fn new(block: BlockId, args: Vec<Value>) -> Self {
        Self { block, args }
    }

    pub fn to_block(label: &str) -> Self {
        Self::new(BlockId::new(label), Vec::new())
    }
}

impl fmt::Display for BranchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.block)?;
        if !self.args.is_empty() {
            write!(f, "(")?;
            write_list(f, &self.args)?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Key of a switch case: an enum case name, or a value compared against
/// the scrutinee (`switch_value`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SwitchCase {
    Name(String),
    Value(Value),
}

impl SwitchCase {
    pub fn name(name: impl Into<String>) -> Self {
        SwitchCase::Name(name.into())
    }
}

impl fmt::Display for SwitchCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchCase::Name(name) => write!(f, "{}", quote(name)),
            SwitchCase::Value(value) => write!(f, "{value}"),
        }
    }
}

/// IR Instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Allocation of a fresh object or stack slot: result = new
    New { result: Value },

    /// Integer constant (booleans included)
    IntegerLiteral { result: Value, value: i128 },

    FloatLiteral { result: Value, value: FloatValue },

    StringLiteral { result: Value, value: String },

    /// Reference to a function by name, resolved at module-group level
    FunctionRef { result: Value, function: String },

    /// Address of a global variable
    GlobalAddr { result: Value, global: Value },

    /// Dynamically dispatched member lookup: result = object.member
    DynamicRef {
        result: Value,
        object: Option<Value>,
        member: String,
    },

    /// Copy, conversion or projection that keeps the same underlying value
    Assign { result: Value, source: Value },

    Load { result: Value, address: Value },

    /// Positional element read: result = base[index]
    ArrayRead {
        result: Value,
        base: Value,
        index: usize,
    },

    FieldRead {
        result: Value,
        object: Value,
        field: String,
    },

    /// Struct, tuple or enum construction
    Aggregate { result: Value, elements: Vec<Value> },

    BinaryOp {
        result: Value,
        operator: String,
        lhs: Value,
        rhs: Value,
    },

    UnaryOp {
        result: Value,
        operator: String,
        operand: Value,
    },

    /// Closure creation: result = function partially applied to args
    PartialApply {
        result: Value,
        function: Value,
        args: Vec<Value>,
    },

    /// Function call: result = function(args...)
    Apply {
        result: Option<Value>,
        function: Value,
        args: Vec<Value>,
    },

    /// Compiler builtin with unknown semantics
    Builtin {
        result: Option<Value>,
        name: String,
        args: Vec<Value>,
    },

    /// Low-level operation without a dedicated variant
    Opaque {
        result: Option<Value>,
        opcode: String,
        operands: Vec<Value>,
    },

    /// Store to memory: store value to address
    Store { value: Value, address: Value },

    FieldWrite {
        value: Value,
        object: Value,
        field: String,
    },

    ArrayWrite {
        value: Value,
        base: Value,
        index: usize,
    },

    /// Trap when condition holds
    CondFail { condition: Value },

    Branch { target: BranchTarget },

    ConditionalBranch {
        condition: Value,
        true_target: BranchTarget,
        false_target: BranchTarget,
    },

    /// Multi-way branch on an enum case or value
    Switch {
        operand: Value,
        cases: Vec<(SwitchCase, BlockId)>,
        default: Option<BlockId>,
    },

    /// Call that continues in `normal` or transfers to `error` on throw
    TryApply {
        function: Value,
        args: Vec<Value>,
        normal: BlockId,
        error: BlockId,
    },

    /// Coroutine yield
    Yield {
        values: Vec<Value>,
        resume: BlockId,
        unwind: BlockId,
    },

    Return { value: Option<Value> },

    Throw { value: Value },

    Unreachable,
}

/// What pruning may do with an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Removable once its result is unused
    Pure,
    /// Observable beyond its result; never removed
    SideEffect,
    /// Ends a block; never removed
    Terminator,
}

impl Instruction {
    /// Mnemonic used in the text form
    pub fn opcode(&self) -> &'static str {
        match self {
            Instruction::New { .. } => "new",
            Instruction::IntegerLiteral { .. } => "integer_literal",
            Instruction::FloatLiteral { .. } => "float_literal",
            Instruction::StringLiteral { .. } => "string_literal",
            Instruction::FunctionRef { .. } => "function_ref",
            Instruction::GlobalAddr { .. } => "global_addr",
            Instruction::DynamicRef { .. } => "dynamic_ref",
            Instruction::Assign { .. } => "assign",
            Instruction::Load { .. } => "load",
            Instruction::ArrayRead { .. } => "array_read",
            Instruction::FieldRead { .. } => "field_read",
            Instruction::Aggregate { .. } => "aggregate",
            Instruction::BinaryOp { .. } => "binary_op",
            Instruction::UnaryOp { .. } => "unary_op",
            Instruction::PartialApply { .. } => "partial_apply",
            Instruction::Apply { .. } => "apply",
            Instruction::Builtin { .. } => "builtin",
            Instruction::Opaque { .. } => "opaque",
            Instruction::Store { .. } => "store",
            Instruction::FieldWrite { .. } => "field_write",
            Instruction::ArrayWrite { .. } => "array_write",
            Instruction::CondFail { .. } => "cond_fail",
            Instruction::Branch { .. } => "br",
            Instruction::ConditionalBranch { .. } => "cond_br",
            Instruction::Switch { .. } => "switch",
            Instruction::TryApply { .. } => "try_apply",
            Instruction::Yield { .. } => "yield",
            Instruction::Return { .. } => "return",
            Instruction::Throw { .. } => "throw",
            Instruction::Unreachable => "unreachable",
        }
    }

    /// The value this instruction defines, if any
    pub fn result(&self) -> Option<&Value> {
        match self {
            Instruction::New { result }
            | Instruction::IntegerLiteral { result, .. }
            | Instruction::FloatLiteral { result, .. }
            | Instruction::StringLiteral { result, .. }
            | Instruction::FunctionRef { result, .. }
            | Instruction::GlobalAddr { result, .. }
            | Instruction::DynamicRef { result, .. }
            | Instruction::Assign { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::ArrayRead { result, .. }
            | Instruction::FieldRead { result, .. }
            | Instruction::Aggregate { result, .. }
            | Instruction::BinaryOp { result, .. }
            | Instruction::UnaryOp { result, .. }
            | Instruction::PartialApply { result, .. } => Some(result),
            Instruction::Apply { result, .. }
            | Instruction::Builtin { result, .. }
            | Instruction::Opaque { result, .. } => result.as_ref(),
            Instruction::Store { .. }
            | Instruction::FieldWrite { .. }
            | Instruction::ArrayWrite { .. }
            | Instruction::CondFail { .. }
            | Instruction::Branch { .. }
            | Instruction::ConditionalBranch { .. }
            | Instruction::Switch { .. }
            | Instruction::TryApply { .. }
            | Instruction::Yield { .. }
            | Instruction::Return { .. }
            | Instruction::Throw { .. }
            | Instruction::Unreachable => None,
        }
    }

    /// Every value read by this instruction, branch arguments included
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Instruction::New { .. }
            | Instruction::IntegerLiteral { .. }
            | Instruction::FloatLiteral { .. }
            | Instruction::StringLiteral { .. }
            | Instruction::FunctionRef { .. }
            | Instruction::Unreachable => Vec::new(),
            Instruction::GlobalAddr { global, .. } => vec![global],
            Instruction::DynamicRef { object, .. } => object.iter().collect(),
            Instruction::Assign { source, .. } => vec![source],
            Instruction::Load { address, .. } => vec![address],
            Instruction::ArrayRead { base, .. } => vec![base],
            Instruction::FieldRead { object, .. } => vec![object],
            Instruction::Aggregate { elements, .. } => elements.iter().collect(),
            Instruction::BinaryOp { lhs, rhs, .. } => vec![lhs, rhs],
            Instruction::UnaryOp { operand, .. } => vec![operand],
            Instruction::PartialApply { function, args, .. }
            | Instruction::Apply { function, args, .. }
            | Instruction::TryApply { function, args, .. } => {
                std::iter::once(function).chain(args.iter()).collect()
            }
            Instruction::Builtin { args, .. } => args.iter().collect(),
            Instruction::Opaque { operands, .. } => operands.iter().collect(),
            Instruction::Store { value, address } => vec![value, address],
            Instruction::FieldWrite { value, object, .. } => vec![value, object],
            Instruction::ArrayWrite { value, base, .. } => vec![value, base],
            Instruction::CondFail { condition } => vec![condition],
            Instruction::Branch { target } => target.args.iter().collect(),
            Instruction::ConditionalBranch {
                condition,
                true_target,
                false_target,
            } => std::iter::once(condition)
                .chain(true_target.args.iter())
                .chain(false_target.args.iter())
                .collect(),
            Instruction::Switch { operand, cases, .. } => std::iter::once(operand)
                .chain(cases.iter().filter_map(|(case, _)| match case {
                    SwitchCase::Value(value) => Some(value),
                    SwitchCase::Name(_) => None,
                }))
                .collect(),
            Instruction::Yield { values, .. } => values.iter().collect(),
            Instruction::Return { value } => value.iter().collect(),
            Instruction::Throw { value } => vec![value],
        }
    }

    /// Blocks control may transfer to, in text order
    pub fn successors(&self) -> Vec<&BlockId> {
        match self {
            Instruction::Branch { target } => vec![&target.block],
            Instruction::ConditionalBranch {
                true_target,
                false_target,
                ..
            } => vec![&true_target.block, &false_target.block],
            Instruction::Switch { cases, default, .. } => cases
                .iter()
                .map(|(_, block)| block)
                .chain(default.iter())
                .collect(),
            Instruction::TryApply { normal, error, .. } => vec![normal, error],
            Instruction::Yield { resume, unwind, .. } => vec![resume, unwind],
            _ => Vec::new(),
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Instruction::New { .. }
            | Instruction::IntegerLiteral { .. }
            | Instruction::FloatLiteral { .. }
            | Instruction::StringLiteral { .. }
            | Instruction::FunctionRef { .. }
            | Instruction::GlobalAddr { .. }
            | Instruction::DynamicRef { .. }
            | Instruction::Assign { .. }
            | Instruction::Load { .. }
            | Instruction::ArrayRead { .. }
            | Instruction::FieldRead { .. }
            | Instruction::Aggregate { .. }
            | Instruction::BinaryOp { .. }
            | Instruction::UnaryOp { .. }
            | Instruction::PartialApply { .. } => Effect::Pure,
            Instruction::Apply { .. }
            | Instruction::Builtin { .. }
            | Instruction::Opaque { .. }
            | Instruction::Store { .. }
            | Instruction::FieldWrite { .. }
            | Instruction::ArrayWrite { .. }
            | Instruction::CondFail { .. } => Effect::SideEffect,
            Instruction::Branch { .. }
            | Instruction::ConditionalBranch { .. }
            | Instruction::Switch { .. }
            | Instruction::TryApply { .. }
            | Instruction::Yield { .. }
            | Instruction::Return { .. }
            | Instruction::Throw { .. }
            | Instruction::Unreachable => Effect::Terminator,
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.effect() == Effect::Terminator
    }

    /// Pure instructions may be dropped when their result is dead
    pub fn is_removable(&self) -> bool {
        self.effect() == Effect::Pure
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

fn write_call(f: &mut fmt::Formatter<'_>, callee: &dyn fmt::Display, args: &[Value]) -> fmt::Result {
    write!(f, "{callee}(")?;
    write_list(f, args)?;
    write!(f, ")")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = self.result() {
            write!(f, "{result} := ")?;
        }
        write!(f, "{}", self.opcode())?;
        match self {
            Instruction::New { .. } => {}
            Instruction::IntegerLiteral { value, .. } => write!(f, " {value}")?,
            Instruction::FloatLiteral { value, .. } => write!(f, " {value}")?,
            Instruction::StringLiteral { value, .. } => write!(f, " {}", quote_string(value))?,
            Instruction::FunctionRef { function, .. } => write!(f, " @{}", quote(function))?,
            Instruction::GlobalAddr { global, .. } => write!(f, " {global}")?,
            Instruction::DynamicRef { object, member, .. } => match object {
                Some(object) => write!(f, " {object}, {}", quote(member))?,
                None => write!(f, " {}", quote(member))?,
            },
            Instruction::Assign { source, .. } => write!(f, " {source}")?,
            Instruction::Load { address, .. } => write!(f, " {address}")?,
            Instruction::ArrayRead { base, index, .. } => write!(f, " {base}[{index}]")?,
            Instruction::FieldRead { object, field, .. } => write!(f, " {object}, {}", quote(field))?,
            Instruction::Aggregate { elements, .. } => {
                write!(f, " (")?;
                write_list(f, elements)?;
                write!(f, ")")?;
            }
            Instruction::BinaryOp { operator, lhs, rhs, .. } => {
                write!(f, " {} {lhs}, {rhs}", quote(operator))?
            }
            Instruction::UnaryOp { operator, operand, .. } => {
                write!(f, " {} {operand}", quote(operator))?
            }
            Instruction::PartialApply { function, args, .. }
            | Instruction::Apply { function, args, .. } => {
                write!(f, " ")?;
                write_call(f, function, args)?;
            }
            Instruction::Builtin { name, args, .. } => {
                write!(f, " ")?;
                write_call(f, &quote(name), args)?;
            }
            Instruction::Opaque { opcode, operands, .. } => {
                write!(f, " ")?;
                write_call(f, &quote(opcode), operands)?;
            }
            Instruction::Store { value, address } => write!(f, " {value} to {address}")?,
            Instruction::FieldWrite { value, object, field } => {
                write!(f, " {value} to {object}, {}", quote(field))?
            }
            Instruction::ArrayWrite { value, base, index } => {
                write!(f, " {value} to {base}[{index}]")?
            }
            Instruction::CondFail { condition } => write!(f, " {condition}")?,
            Instruction::Branch { target } => write!(f, " {target}")?,
            Instruction::ConditionalBranch {
                condition,
                true_target,
                false_target,
            } => write!(f, " {condition}, {true_target}, {false_target}")?,
            Instruction::Switch {
                operand,
                cases,
                default,
            } => {
                write!(f, " {operand}")?;
                for (case, block) in cases {
                    write!(f, ", case {case}: {block}")?;
                }
                if let Some(default) = default {
                    write!(f, ", default {default}")?;
                }
            }
            Instruction::TryApply {
                function,
                args,
                normal,
                error,
            } => {
                write!(f, " ")?;
                write_call(f, function, args)?;
                write!(f, ", normal {normal}, error {error}")?;
            }
            Instruction::Yield {
                values,
                resume,
                unwind,
            } => {
                write!(f, " (")?;
                write_list(f, values)?;
                write!(f, "), resume {resume}, unwind {unwind}")?;
            }
            Instruction::Return { value } => {
                if let Some(value) = value {
                    write!(f, " {value}")?;
                }
            }
            Instruction::Throw { value } => write!(f, " {value}")?,
            Instruction::Unreachable => {}
        }
        if let Some(result) = self.result() {
            write!(f, " : {}", result.ty)?;
        }
        Ok(())
    }
}

/// Annotations attached after construction; never part of equality
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Line in the printed IR, set by line-number assignment
    pub line: Option<u32>,
    /// Position in the original program source
    pub position: Option<SourceLocation>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.position.is_none()
    }
}

/// An instruction as stored in a block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionNode {
    pub instruction: Instruction,
    #[serde(default)]
    pub metadata: Metadata,
}

impl InstructionNode {
    pub fn new(instruction: Instruction) -> Self {
        Self {
            instruction,
            metadata: Metadata::default(),
        }
    }

    pub fn with_position(instruction: Instruction, position: Option<SourceLocation>) -> Self {
        Self {
            instruction,
            metadata: Metadata {
                line: None,
                position,
            },
        }
    }
}

impl PartialEq for InstructionNode {
    fn eq(&self, other: &Self) -> bool {
        self.instruction == other.instruction
    }
}

impl From<Instruction> for InstructionNode {
    fn from(instruction: Instruction) -> Self {
        InstructionNode::new(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IrType;

    fn local(name: &str) -> Value {
        Value::local(name, IrType::new("Int"))
    }

    #[test]
    fn test_canonical_text_forms() {
        let cases = vec![
            (
                Instruction::IntegerLiteral { result: local("1"), value: -7 },
                "%1 := integer_literal -7 : $`Int`",
            ),
            (
                Instruction::FunctionRef {
                    result: local("2"),
                    function: "helper".to_string(),
                },
                "%2 := function_ref @`helper` : $`Int`",
            ),
            (
                Instruction::ArrayRead {
                    result: local("3"),
                    base: local("b"),
                    index: 3,
                },
                "%3 := array_read %b[3] : $`Int`",
            ),
            (
                Instruction::Apply {
                    result: None,
                    function: local("f"),
                    args: vec![local("a"), local("b")],
                },
                "apply %f(%a, %b)",
            ),
            (
                Instruction::Store {
                    value: local("v"),
                    address: local("a"),
                },
                "store %v to %a",
            ),
            (
                Instruction::ConditionalBranch {
                    condition: local("c"),
                    true_target: BranchTarget::new(BlockId::new("bb1"), vec![local("a")]),
                    false_target: BranchTarget::to_block("bb2"),
                },
                "cond_br %c, bb1(%a), bb2",
            ),
            (
                Instruction::Switch {
                    operand: local("e"),
                    cases: vec![(SwitchCase::name("#E.a"), BlockId::new("bb1"))],
                    default: Some(BlockId::new("bb2")),
                },
                "switch %e, case `#E.a`: bb1, default bb2",
            ),
            (
                Instruction::Switch {
                    operand: local("v"),
                    cases: vec![
                        (SwitchCase::Value(local("1")), BlockId::new("bb1")),
                        (SwitchCase::Value(local("2")), BlockId::new("bb2")),
                    ],
                    default: None,
                },
                "switch %v, case %1: bb1, case %2: bb2",
            ),
            (Instruction::Return { value: None }, "return"),
        ];
        for (instruction, text) in cases {
            assert_eq!(instruction.to_string(), text);
        }
    }

    #[test]
    fn test_switch_reads_value_cases() {
        let switch = Instruction::Switch {
            operand: local("v"),
            cases: vec![
                (SwitchCase::Value(local("1")), BlockId::new("bb1")),
                (SwitchCase::name("#E.a"), BlockId::new("bb2")),
            ],
            default: Some(BlockId::new("bb3")),
        };
        assert_eq!(switch.operands(), vec![&local("v"), &local("1")]);
        assert_eq!(switch.successors().len(), 3);
    }

    #[test]
    fn test_effect_classification() {
        let literal = Instruction::IntegerLiteral { result: local("1"), value: 0 };
        assert!(literal.is_removable());

        let call = Instruction::Apply {
            result: Some(local("r")),
            function: local("f"),
            args: vec![],
        };
        assert_eq!(call.effect(), Effect::SideEffect);

        let opaque = Instruction::Opaque {
            result: Some(local("r")),
            opcode: "mark_dependence".to_string(),
            operands: vec![],
        };
        assert!(!opaque.is_removable());

        assert!(Instruction::Unreachable.is_terminator());
    }

    #[test]
    fn test_operands_and_successors() {
        let try_apply = Instruction::TryApply {
            function: local("f"),
            args: vec![local("x")],
            normal: BlockId::new("bb1"),
            error: BlockId::new("bb2"),
        };
        let names: Vec<_> = try_apply.operands().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["f", "x"]);
        assert_eq!(
            try_apply.successors(),
            vec![&BlockId::new("bb1"), &BlockId::new("bb2")]
        );
        assert!(try_apply.result().is_none());
    }

    #[test]
    fn test_metadata_does_not_affect_equality() {
        let instruction = Instruction::Return { value: Some(local("0")) };
        let plain = InstructionNode::new(instruction.clone());
        let mut annotated = InstructionNode::with_position(
            instruction,
            Some(SourceLocation::new("main.swift", 3, 5)),
        );
        annotated.metadata.line = Some(12);
        assert_eq!(plain, annotated);
    }
}
