//! Instruction lowering
//!
//! Maps one raw low-level instruction onto zero or more IR instructions.
//! Operands are resolved before results are defined, so a value used ahead
//! of its definition in text order is an unresolved name.

use crate::sil::raw::RawInstruction;
use crate::sil::text::{
    block_target, call_parts, converted_type, decode_float_bits, find_top_level,
    first_type_annotation, first_value, fn_result_type, leading_type, rfind_top_level,
    segment_type, split_top_level, string_literal, symbol, tuple_element_type, type_annotation,
    typed_value, values,
};
use log::{debug, trace, warn};
use swirl_common::{SwirlError, SwirlResult};
use swirl_ir::{
    BlockId, BranchTarget, FloatValue, FunctionBuilder, GlobalValueTable, Instruction, InstructionNode,
    IrType, SwitchCase, Value,
};

/// Ownership, lifetime and debug bookkeeping with no analysis meaning
const BOOKKEEPING: &[&str] = &[
    "debug_value",
    "debug_value_addr",
    "debug_step",
    "strong_retain",
    "strong_release",
    "strong_retain_unowned",
    "retain_value",
    "release_value",
    "retain_value_addr",
    "release_value_addr",
    "unowned_retain",
    "unowned_release",
    "unmanaged_retain_value",
    "unmanaged_release_value",
    "autorelease_value",
    "destroy_value",
    "destroy_addr",
    "end_borrow",
    "end_access",
    "end_lifetime",
    "end_unpaired_access",
    "fix_lifetime",
    "extend_lifetime",
    "set_deallocating",
    "ignored_use",
    "mark_function_escape",
];

/// Known operations with effects the IR does not model; lowered to Opaque quietly
const KNOWN_OPAQUE: &[&str] = &[
    "end_apply",
    "abort_apply",
    "select_enum",
    "select_enum_addr",
    "select_value",
    "inject_enum_addr",
    "is_unique",
    "is_escaping_closure",
    "bind_memory",
    "rebind_memory",
    "begin_unpaired_access",
    "hop_to_executor",
    "get_async_continuation",
    "get_async_continuation_addr",
    "keypath",
    "classify_bridge_object",
    "begin_cow_mutation",
    "unconditional_checked_cast_addr",
    "unchecked_ref_cast_addr",
    "init_block_storage_header",
    "objc_protocol",
    "deinit_existential_addr",
    "deinit_existential_value",
    "copy_block",
    "copy_block_without_escaping",
];

/// Value-preserving conversions, borrows, copies, access markers and projections
const ASSIGN_LIKE: &[&str] = &[
    "begin_borrow",
    "borrowed",
    "copy_value",
    "explicit_copy_value",
    "move_value",
    "unchecked_ownership_conversion",
    "mark_dependence",
    "mark_uninitialized",
    "mark_unresolved_non_copyable_value",
    "mark_unresolved_reference_binding",
    "copyable_to_moveonlywrapper",
    "moveonlywrapper_to_copyable",
    "copyable_to_moveonlywrapper_addr",
    "moveonlywrapper_to_copyable_addr",
    "begin_access",
    "upcast",
    "unchecked_ref_cast",
    "unchecked_addr_cast",
    "unchecked_bitwise_cast",
    "unchecked_trivial_bit_cast",
    "unchecked_value_cast",
    "unconditional_checked_cast",
    "ref_to_raw_pointer",
    "raw_pointer_to_ref",
    "address_to_pointer",
    "pointer_to_address",
    "ref_to_unowned",
    "unowned_to_ref",
    "ref_to_unmanaged",
    "unmanaged_to_ref",
    "strong_copy_unowned_value",
    "strong_copy_unmanaged_value",
    "thin_to_thick_function",
    "thick_to_objc_metatype",
    "objc_to_thick_metatype",
    "thin_function_to_pointer",
    "pointer_to_thin_function",
    "convert_function",
    "convert_escape_to_noescape",
    "bridge_object_to_ref",
    "bridge_object_to_word",
    "ref_to_bridge_object",
    "value_to_bridge_object",
    "open_existential_addr",
    "open_existential_ref",
    "open_existential_box",
    "open_existential_box_value",
    "open_existential_value",
    "open_existential_metatype",
    "init_existential_addr",
    "init_existential_ref",
    "init_existential_metatype",
    "init_existential_value",
    "project_box",
    "project_existential_box",
    "project_block_storage",
    "unchecked_enum_data",
    "init_enum_data_addr",
    "unchecked_take_enum_data_addr",
    "index_addr",
    "index_raw_pointer",
    "tail_addr",
    "ref_tail_addr",
    "begin_dealloc_ref",
    "end_init_let_ref",
    "end_cow_mutation",
    "drop_deinit",
];

/// Integer and floating-point builtins with two operands
const BINARY_BUILTINS: &[&str] = &[
    "add", "sub", "mul", "sdiv", "udiv", "srem", "urem", "and", "or", "xor", "shl", "lshr",
    "ashr", "fadd", "fsub", "fmul", "fdiv", "frem", "sdiv_exact", "udiv_exact",
];

/// Casts and negation builtins with one operand
const UNARY_BUILTINS: &[&str] = &[
    "fneg", "zext", "sext", "trunc", "bitcast", "sitofp", "uitofp", "fptosi", "fptoui",
    "fpext", "fptrunc", "ptrtoint", "inttoptr", "zextOrBitCast", "truncOrBitCast",
    "sextOrBitCast", "int_ctpop", "int_ctlz", "int_cttz", "int_bswap", "int_fabs",
    "int_sqrt",
];

/// Parse an integer literal, clamping values that do not fit in an `i128`
pub(crate) fn parse_integer(text: &str) -> Option<i128> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i128>() {
        return Some(value);
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let clamped = if text.starts_with('-') { i128::MIN } else { i128::MAX };
    warn!("Integer literal {} does not fit in 128 bits; clamping to {}", text, clamped);
    Some(clamped)
}

/// Parse a float literal given as a hexadecimal bit pattern or in decimal
pub(crate) fn parse_float(text: &str, ty: &str) -> Option<FloatValue> {
    decode_float_bits(text, ty)
        .or_else(|| text.trim().parse().ok())
        .map(FloatValue)
}

/// `$Ty, value` operands of the literal instructions
pub(crate) fn literal_parts(arguments: &str) -> Option<(String, &str)> {
    match split_top_level(arguments, ',').as_slice() {
        [ty, value] => Some((segment_type(ty)?, *value)),
        _ => None,
    }
}

/// Builtin name without its trailing type suffixes: `cmp_slt_Int64` -> `cmp_slt`
fn builtin_base(name: &str) -> &str {
    let mut base = name;
    while let Some((head, tail)) = base.rsplit_once('_') {
        let typed = ["Int", "FPIEEE", "Word", "RawPointer", "NativeObject", "BridgeObject", "Vec"]
            .iter()
            .any(|prefix| tail.starts_with(prefix));
        if !typed {
            break;
        }
        base = head;
    }
    base
}

fn is_binary_builtin(base: &str) -> bool {
    BINARY_BUILTINS.contains(&base)
        || base.starts_with("cmp_")
        || base.starts_with("fcmp_")
        || base.ends_with("_with_overflow")
}

/// The `#Type.member` operand, without the `#`
fn member(arguments: &str) -> Option<String> {
    split_top_level(arguments, ',')
        .into_iter()
        .find_map(|segment| segment.strip_prefix('#'))
        .and_then(|member| member.split_whitespace().next())
        .map(str::to_string)
}

fn ir_type(spelling: Option<String>) -> IrType {
    spelling.map_or_else(IrType::any, IrType::new)
}

/// Lowering state for one raw instruction
pub struct InstructionContext<'a> {
    builder: &'a mut FunctionBuilder,
    globals: &'a mut GlobalValueTable,
    raw: &'a RawInstruction,
}

impl<'a> InstructionContext<'a> {
    pub fn new(
        builder: &'a mut FunctionBuilder,
        globals: &'a mut GlobalValueTable,
        raw: &'a RawInstruction,
    ) -> Self {
        Self { builder, globals, raw }
    }

    pub fn lower(mut self) -> SwirlResult<()> {
        let raw = self.raw;
        let args = raw.arguments.as_str();
        trace!("Lowering '{}' in '{}'", raw.opcode, self.builder.name());

        match raw.opcode.as_str() {
            "alloc_stack" => {
                let ty = leading_type(args).unwrap_or_else(|| "Any".to_string());
                self.new_object(IrType::new(format!("*{ty}")))
            }
            "alloc_box" | "alloc_ref" | "alloc_ref_dynamic" | "alloc_existential_box"
            | "alloc_pack" | "alloc_vector" | "metatype" => {
                let ty = leading_type(args).or_else(|| {
                    split_top_level(args, ',').last().and_then(|segment| segment_type(segment))
                });
                self.new_object(ir_type(ty))
            }
            "alloc_global" => {
                let name = self.symbol(args)?;
                self.globals.get_or_create(&name, IrType::any());
                Ok(())
            }

            "integer_literal" => self.integer_literal(args),
            "float_literal" => self.float_literal(args),
            "string_literal" => {
                let value = string_literal(args).ok_or_else(|| self.error("expected a string literal"))?;
                let result = self.result(IrType::new("Builtin.RawPointer"))?;
                self.emit(Instruction::StringLiteral { result, value })
            }

            "function_ref" | "dynamic_function_ref" | "prev_dynamic_function_ref" => {
                let function = self.symbol(args)?;
                let result = self.result(ir_type(type_annotation(args)))?;
                self.emit(Instruction::FunctionRef { result, function })
            }
            "global_addr" | "global_value" => {
                let name = self.symbol(args)?;
                let ty = type_annotation(args).unwrap_or_else(|| "Any".to_string());
                let global_ty = ty.strip_prefix('*').unwrap_or(&ty).to_string();
                let global = self.globals.get_or_create(&name, IrType::new(global_ty));
                let result = self.result(IrType::new(ty))?;
                self.emit(Instruction::GlobalAddr { result, global })
            }
            "class_method" | "super_method" | "objc_method" | "objc_super_method"
            | "witness_method" => self.dynamic_ref(args),

            "apply" | "begin_apply" => {
                let (callee, arg_names, callee_ty) = self.call(args)?;
                let function = self.operand(&callee)?;
                let args = self.resolve(&arg_names)?;
                let ty = ir_type(callee_ty.as_deref().and_then(fn_result_type));
                self.emit_with_results(ty, |result| Instruction::Apply { result, function, args })
            }
            "partial_apply" => {
                let (callee, arg_names, _) = self.call(args)?;
                let function = self.operand(&callee)?;
                let args = self.resolve(&arg_names)?;
                let result = self.result(IrType::any())?;
                self.emit(Instruction::PartialApply { result, function, args })
            }
            "builtin" => self.builtin(args),

            "load" | "load_borrow" | "load_weak" | "load_unowned" => {
                let address = self.first_operand(args)?;
                let result = self.result(pointee(first_type_annotation(args)))?;
                self.emit(Instruction::Load { result, address })
            }
            "store" | "store_weak" | "store_unowned" | "store_borrow" | "assign"
            | "assign_by_wrapper" | "assign_or_init" => self.store(args),
            "copy_addr" | "explicit_copy_addr" | "mark_unresolved_move_addr" => {
                let [source, destination] = self.operand_pair(args)?;
                let temp = self.builder.new_temp(pointee(first_type_annotation(args)))?;
                self.emit(Instruction::Load {
                    result: temp.clone(),
                    address: source,
                })?;
                self.emit(Instruction::Store {
                    value: temp,
                    address: destination,
                })
            }

            "value_metatype" | "existential_metatype" => {
                let source = self.first_operand(args)?;
                let result = self.result(ir_type(leading_type(args)))?;
                self.emit(Instruction::Assign { result, source })
            }
            opcode if ASSIGN_LIKE.contains(&opcode) => {
                let source = self.first_operand(args)?;
                let ty = converted_type(args).or_else(|| first_type_annotation(args));
                let result = self.result(ir_type(ty))?;
                self.emit(Instruction::Assign { result, source })
            }

            "struct" | "tuple" | "enum" | "object" | "vector" => self.aggregate(args),
            "struct_extract" | "struct_element_addr" | "ref_element_addr" => {
                let object = self.first_operand(args)?;
                let field = member(args).ok_or_else(|| self.error("expected a '#' field"))?;
                let result = self.result(IrType::any())?;
                self.emit(Instruction::FieldRead { result, object, field })
            }
            "tuple_extract" | "tuple_element_addr" => self.tuple_element(args),
            "destructure_tuple" | "destructure_struct" => self.destructure(args),

            "cond_fail" => {
                let condition = self.first_operand(args)?;
                self.emit(Instruction::CondFail { condition })
            }

            "br" => {
                let target = self.branch_target(args)?;
                self.emit(Instruction::Branch { target })
            }
            "cond_br" => self.conditional_branch(args),
            "switch_enum" | "switch_enum_addr" | "switch_value" => self.switch(args),
            "checked_cast_br" | "checked_cast_addr_br" | "dynamic_method_br" => {
                self.two_way_switch(args, "success")
            }
            "await_async_continuation" => self.two_way_switch(args, "resume"),
            "try_apply" => self.try_apply(args),
            "yield" => self.yield_(args),
            "return" => {
                let value = first_value(args).map(|name| self.operand(&name)).transpose()?;
                self.emit(Instruction::Return { value })
            }
            "throw" => {
                let value = self.first_operand(args)?;
                self.emit(Instruction::Throw { value })
            }
            "unreachable" => self.emit(Instruction::Unreachable),
            "unwind" => self.emit(Instruction::Return { value: None }),

            opcode if raw.results.is_empty() && is_bookkeeping(opcode) => {
                trace!("Dropping bookkeeping '{}'", opcode);
                Ok(())
            }
            opcode => {
                if KNOWN_OPAQUE.contains(&opcode) {
                    debug!("Keeping '{}' as an opaque operation", opcode);
                } else {
                    warn!(
                        "Unknown opcode '{}' at {}; treating it as opaque",
                        opcode, raw.location
                    );
                }
                self.opaque(args)
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> SwirlError {
        SwirlError::syntax(
            format!("'{}': {}", self.raw.opcode, message.into()),
            self.raw.location.clone(),
        )
    }

    fn operand(&self, name: &str) -> SwirlResult<Value> {
        self.builder.value(name)
    }

    fn resolve(&self, names: &[String]) -> SwirlResult<Vec<Value>> {
        names.iter().map(|name| self.operand(name)).collect()
    }

    fn first_operand(&self, text: &str) -> SwirlResult<Value> {
        let name = first_value(text).ok_or_else(|| self.error("expected an operand"))?;
        self.operand(&name)
    }

    fn operand_pair(&self, text: &str) -> SwirlResult<[Value; 2]> {
        match values(text).as_slice() {
            [first, second, ..] => Ok([self.operand(first)?, self.operand(second)?]),
            _ => Err(self.error("expected two operands")),
        }
    }

    fn symbol(&self, text: &str) -> SwirlResult<String> {
        symbol(text).ok_or_else(|| self.error("expected an '@' symbol"))
    }

    fn call(&self, text: &str) -> SwirlResult<(String, Vec<String>, Option<String>)> {
        call_parts(text).ok_or_else(|| self.error("expected a call '%f(...)'"))
    }

    /// Define the single result of this instruction
    fn result(&mut self, ty: IrType) -> SwirlResult<Value> {
        let raw = self.raw;
        match raw.results.as_slice() {
            [name] => self.builder.define(name, ty),
            [] => Err(self.error("expected a result")),
            _ => Err(self.error("expected exactly one result")),
        }
    }

    fn emit(&mut self, instruction: Instruction) -> SwirlResult<()> {
        self.builder
            .push_node(InstructionNode::with_position(instruction, self.raw.position.clone()))
    }

    /// Emit an instruction with an optional result; several results become
    /// a temporary tuple read element by element
    fn emit_with_results(
        &mut self,
        ty: IrType,
        make: impl FnOnce(Option<Value>) -> Instruction,
    ) -> SwirlResult<()> {
        let raw = self.raw;
        match raw.results.as_slice() {
            [] => self.emit(make(None)),
            [name] => {
                let result = self.builder.define(name, ty)?;
                self.emit(make(Some(result)))
            }
            names => {
                let tuple = self.builder.new_temp(ty.clone())?;
                self.emit(make(Some(tuple.clone())))?;
                self.read_elements(&tuple, names, |index| tuple_element_type(ty.as_str(), index))
            }
        }
    }

    fn read_elements(
        &mut self,
        base: &Value,
        names: &[String],
        element_type: impl Fn(usize) -> Option<String>,
    ) -> SwirlResult<()> {
        for (index, name) in names.iter().enumerate() {
            let result = self.builder.define(name, ir_type(element_type(index)))?;
            self.emit(Instruction::ArrayRead {
                result,
                base: base.clone(),
                index,
            })?;
        }
        Ok(())
    }

    fn new_object(&mut self, ty: IrType) -> SwirlResult<()> {
        let result = self.result(ty)?;
        self.emit(Instruction::New { result })
    }

    fn integer_literal(&mut self, args: &str) -> SwirlResult<()> {
        let (ty, text) = literal_parts(args).ok_or_else(|| self.error("expected '$Type, value'"))?;
        let value = parse_integer(text).ok_or_else(|| self.error(format!("invalid integer '{text}'")))?;
        let result = self.result(IrType::new(ty))?;
        self.emit(Instruction::IntegerLiteral { result, value })
    }

    fn float_literal(&mut self, args: &str) -> SwirlResult<()> {
        let (ty, text) = literal_parts(args).ok_or_else(|| self.error("expected '$Type, value'"))?;
        let value = parse_float(text, &ty).ok_or_else(|| self.error(format!("invalid float '{text}'")))?;
        let result = self.result(IrType::new(ty))?;
        self.emit(Instruction::FloatLiteral { result, value })
    }

    fn dynamic_ref(&mut self, args: &str) -> SwirlResult<()> {
        let segments = split_top_level(args, ',');
        let object = segments
            .first()
            .and_then(|segment| first_value(segment))
            .map(|name| self.operand(&name))
            .transpose()?;
        let member = member(args).ok_or_else(|| self.error("expected a '#' member"))?;
        let ty = segments
            .last()
            .and_then(|segment| segment_type(segment))
            .or_else(|| type_annotation(args));
        let result = self.result(ir_type(ty))?;
        self.emit(Instruction::DynamicRef { result, object, member })
    }

    fn builtin(&mut self, args: &str) -> SwirlResult<()> {
        let name = string_literal(args).ok_or_else(|| self.error("expected a builtin name"))?;
        let operands = self.resolve(&values(args))?;
        let ty = ir_type(type_annotation(args));
        let base = builtin_base(&name);
        let results = self.raw.results.len();

        // The third operand of `*_with_overflow` is the trap-on-overflow flag,
        // not a data input. It is dropped, so its producer may be pruned; the
        // overflow bit is the second result.
        let binary = operands.len() == 2
            || (base.ends_with("_with_overflow") && operands.len() == 3);
        if results == 1 && binary && is_binary_builtin(base) {
            let result = self.result(ty)?;
            return self.emit(Instruction::BinaryOp {
                result,
                operator: base.to_string(),
                lhs: operands[0].clone(),
                rhs: operands[1].clone(),
            });
        }
        if results == 1 && operands.len() == 1 && UNARY_BUILTINS.contains(&base) {
            let result = self.result(ty)?;
            return self.emit(Instruction::UnaryOp {
                result,
                operator: base.to_string(),
                operand: operands[0].clone(),
            });
        }
        self.emit_with_results(ty, |result| Instruction::Builtin {
            result,
            name,
            args: operands,
        })
    }

    fn store(&mut self, args: &str) -> SwirlResult<()> {
        let [value, address] = self.operand_pair(args)?;
        self.emit(Instruction::Store {
            value,
            address: address.clone(),
        })?;
        // store_borrow yields the borrowed address
        if !self.raw.results.is_empty() {
            let result = self.result(address.ty.clone())?;
            self.emit(Instruction::Assign {
                result,
                source: address,
            })?;
        }
        Ok(())
    }

    fn aggregate(&mut self, args: &str) -> SwirlResult<()> {
        let elements = self.resolve(&values(args))?;
        let ty = leading_type(args).or_else(|| {
            // tuple (%0 : $Int, %1 : $Int)
            let open = find_top_level(args, "(")?;
            let inner = args[open + 1..].trim_end().strip_suffix(')')?;
            let types: Option<Vec<String>> = split_top_level(inner, ',')
                .into_iter()
                .map(|element| typed_value(element).map(|(_, ty)| ty))
                .collect();
            Some(format!("({})", types?.join(", ")))
        });
        let result = self.result(ir_type(ty))?;
        self.emit(Instruction::Aggregate { result, elements })
    }

    fn tuple_element(&mut self, args: &str) -> SwirlResult<()> {
        let segments = split_top_level(args, ',');
        let index = segments
            .last()
            .and_then(|segment| segment.parse::<usize>().ok())
            .ok_or_else(|| self.error("expected an element index"))?;
        let base = self.first_operand(args)?;
        let tuple = first_type_annotation(args).unwrap_or_default();
        let ty = match tuple.strip_prefix('*') {
            Some(tuple) => tuple_element_type(tuple, index).map(|ty| format!("*{ty}")),
            None => tuple_element_type(&tuple, index),
        };
        let result = self.result(ir_type(ty))?;
        self.emit(Instruction::ArrayRead { result, base, index })
    }

    fn destructure(&mut self, args: &str) -> SwirlResult<()> {
        let base = self.first_operand(args)?;
        let tuple = first_type_annotation(args).unwrap_or_default();
        let raw = self.raw;
        self.read_elements(&base, &raw.results, |index| tuple_element_type(&tuple, index))
    }

    fn branch_target(&self, segment: &str) -> SwirlResult<BranchTarget> {
        let (label, names) = block_target(segment).ok_or_else(|| self.error("expected a block label"))?;
        Ok(BranchTarget::new(BlockId::new(label), self.resolve(&names)?))
    }

    fn block_label(&self, segment: &str) -> SwirlResult<BlockId> {
        block_target(segment)
            .map(|(label, _)| BlockId::new(label))
            .ok_or_else(|| self.error("expected a block label"))
    }

    fn conditional_branch(&mut self, args: &str) -> SwirlResult<()> {
        let segments = split_top_level(args, ',');
        let [condition, true_target, false_target] = segments.as_slice() else {
            return Err(self.error("expected 'condition, true block, false block'"));
        };
        let condition = self.first_operand(condition)?;
        let true_target = self.branch_target(true_target)?;
        let false_target = self.branch_target(false_target)?;
        self.emit(Instruction::ConditionalBranch {
            condition,
            true_target,
            false_target,
        })
    }

    fn switch(&mut self, args: &str) -> SwirlResult<()> {
        let segments = split_top_level(args, ',');
        let Some((scrutinee, arms)) = segments.split_first() else {
            return Err(self.error("expected an operand"));
        };
        let operand = self.first_operand(scrutinee)?;
        let mut cases = Vec::new();
        let mut default = None;
        for arm in arms {
            if let Some(case) = arm.strip_prefix("case ") {
                let colon = rfind_top_level(case, ":")
                    .ok_or_else(|| self.error(format!("expected 'case value: block' in '{arm}'")))?;
                let key = case[..colon].trim();
                // switch_value compares against values, switch_enum against case names
                let key = if key.starts_with('%') {
                    SwitchCase::Value(self.first_operand(key)?)
                } else {
                    SwitchCase::name(key)
                };
                cases.push((key, self.block_label(&case[colon + 1..])?));
            } else if let Some(block) = arm.strip_prefix("default ") {
                default = Some(self.block_label(block)?);
            } else {
                return Err(self.error(format!("unexpected switch arm '{arm}'")));
            }
        }
        self.emit(Instruction::Switch { operand, cases, default })
    }

    /// Casts and continuations: the first successor is taken on success
    fn two_way_switch(&mut self, args: &str, case: &str) -> SwirlResult<()> {
        let operand = self.first_operand(args)?;
        let segments = split_top_level(args, ',');
        let successors: Vec<&str> = segments
            .iter()
            .skip(1)
            .map(|&segment| {
                segment
                    .strip_prefix("resume ")
                    .or_else(|| segment.strip_prefix("error "))
                    .unwrap_or(segment)
            })
            .filter(|segment| segment.starts_with("bb"))
            .collect();
        let (success, failure) = match successors.as_slice() {
            [success] => (self.block_label(success)?, None),
            [success, failure] => (self.block_label(success)?, Some(self.block_label(failure)?)),
            _ => return Err(self.error("expected one or two successor blocks")),
        };
        self.emit(Instruction::Switch {
            operand,
            cases: vec![(SwitchCase::name(case), success)],
            default: failure,
        })
    }

    fn try_apply(&mut self, args: &str) -> SwirlResult<()> {
        let (callee, arg_names, _) = self.call(args)?;
        let function = self.operand(&callee)?;
        let args_values = self.resolve(&arg_names)?;
        let segments = split_top_level(args, ',');
        let labelled = |prefix: &str| {
            segments
                .iter()
                .find_map(|segment| segment.strip_prefix(prefix))
                .ok_or_else(|| self.error(format!("expected '{}' block", prefix.trim())))
                .and_then(|segment| self.block_label(segment))
        };
        let normal = labelled("normal ")?;
        let error = labelled("error ")?;
        self.emit(Instruction::TryApply {
            function,
            args: args_values,
            normal,
            error,
        })
    }

    fn yield_(&mut self, args: &str) -> SwirlResult<()> {
        let cut = find_top_level(args, ", resume").ok_or_else(|| self.error("expected a resume block"))?;
        let yielded = self.resolve(&values(&args[..cut]))?;
        let segments = split_top_level(&args[cut..], ',');
        let labelled = |prefix: &str| {
            segments
                .iter()
                .find_map(|segment| segment.strip_prefix(prefix))
                .ok_or_else(|| self.error(format!("expected '{}' block", prefix.trim())))
                .and_then(|segment| self.block_label(segment))
        };
        let resume = labelled("resume ")?;
        let unwind = labelled("unwind ")?;
        self.emit(Instruction::Yield {
            values: yielded,
            resume,
            unwind,
        })
    }

    fn opaque(&mut self, args: &str) -> SwirlResult<()> {
        let operands = self.resolve(&values(args))?;
        let ty = ir_type(type_annotation(args));
        let opcode = self.raw.opcode.clone();
        self.emit_with_results(ty, |result| Instruction::Opaque {
            result,
            opcode,
            operands,
        })
    }
}

fn is_bookkeeping(opcode: &str) -> bool {
    BOOKKEEPING.contains(&opcode) || opcode.starts_with("dealloc_") || opcode.starts_with("debug_")
}

/// The type an address annotation points to
fn pointee(annotation: Option<String>) -> IrType {
    match annotation {
        Some(ty) => IrType::new(ty.strip_prefix('*').unwrap_or(&ty).trim()),
        None => IrType::any(),
    }
}
