//! Simplified dialect parser
//!
//! Single pass, one statement per line. Operands resolve against the current
//! function's value table and the module's globals as they are read, so a use
//! that textually precedes its definition is an unresolved name.

use swirl_common::{SourceLocation, SwirlError, SwirlResult};
use crate::builder::FunctionBuilder;
use crate::function::{Function, Linkage};
use crate::instructions::{BranchTarget, Instruction, InstructionNode, Metadata, SwitchCase};
use crate::lexer::{tokenize_line, Token, TokenKind};
use crate::module::Module;
use crate::types::{BlockId, IrType};
use crate::values::{FloatValue, GlobalValueTable, GlobalVariable, Literal, Value};
use crate::verify::verify_function;
use log::debug;

/// Parse simplified-dialect text into a module. `filename` is used in errors.
pub fn parse_module(text: &str, filename: &str) -> SwirlResult<Module> {
    let mut parser = Parser {
        filename,
        module: None,
        function: None,
        in_block: false,
    };
    let mut last_line = 0;
    for (index, line) in text.lines().enumerate() {
        last_line = index as u32 + 1;
        parser.parse_line(line, last_line)?;
    }
    parser.finish(last_line)
}

struct Parser<'a> {
    filename: &'a str,
    module: Option<Module>,
    function: Option<FunctionBuilder>,
    in_block: bool,
}

impl<'a> Parser<'a> {
    fn location(&self, line: u32) -> SourceLocation {
        SourceLocation::new(self.filename, line, 1)
    }

    fn parse_line(&mut self, line: &str, number: u32) -> SwirlResult<()> {
        if line.trim().is_empty() {
            return Ok(());
        }
        let location = self.location(number);
        let tokens = tokenize_line(line, &location)?;
        let mut cursor = Cursor::new(&tokens, location);

        if self.module.is_none() {
            cursor.expect_word("module")?;
            let name = cursor.quoted()?;
            cursor.expect_end()?;
            self.module = Some(Module::new(name));
            return Ok(());
        }

        if self.function.is_none() {
            return match cursor.word()?.as_str() {
                "global" => self.parse_global(&mut cursor),
                "func" => self.parse_function_header(&mut cursor),
                other => Err(cursor.error_before(format!("expected 'global' or 'func', found '{other}'"))),
            };
        }

        if cursor.eat_punct('}') {
            cursor.expect_end()?;
            return self.finish_function(&cursor);
        }

        let indented = line.starts_with(char::is_whitespace);
        if !indented {
            return self.parse_block_label(&mut cursor);
        }
        if !self.in_block {
            return Err(cursor.error_here("instruction outside of a block"));
        }
        self.parse_instruction(&mut cursor)
    }

    fn parse_function_header(&mut self, cursor: &mut Cursor) -> SwirlResult<()> {
        cursor.expect_punct('[')?;
        let linkage = match cursor.word()?.as_str() {
            "linked" => Linkage::Linked,
            "model" => Linkage::Model,
            other => return Err(cursor.error_before(format!("unknown linkage '{other}'"))),
        };
        cursor.expect_punct(']')?;
        let name = cursor.symbol()?;
        cursor.expect_punct(':')?;
        let ty = cursor.ty()?;

        if cursor.eat_punct('{') {
            cursor.expect_end()?;
            self.function = Some(FunctionBuilder::new(name, linkage, ty));
            self.in_block = false;
            return Ok(());
        }
        cursor.expect_end()?;
        self.add_function(Function::new(name, linkage, ty), cursor)
    }

    fn finish_function(&mut self, cursor: &Cursor) -> SwirlResult<()> {
        let Some(builder) = self.function.take() else {
            return Err(cursor.error_before("unexpected '}'"));
        };
        self.in_block = false;
        let function = builder.finish();
        if !function.has_body() {
            return Err(cursor.error_before(format!("function '{}' has an empty body", function.name)));
        }
        verify_function(&function)?;
        self.add_function(function, cursor)
    }

    fn add_function(&mut self, function: Function, cursor: &Cursor) -> SwirlResult<()> {
        let Some(module) = self.module.as_mut() else {
            return Err(cursor.error_before("missing module header"));
        };
        debug!("Parsed function '{}'", function.name);
        module.add_function(function)
    }

    fn parse_block_label(&mut self, cursor: &mut Cursor) -> SwirlResult<()> {
        let Some(builder) = self.function.as_mut() else {
            return Err(cursor.error_here("block label outside of a function"));
        };
        let label = BlockId::new(cursor.word()?);
        let mut arguments = Vec::new();
        if cursor.eat_punct('(') {
            loop {
                let name = cursor.local()?;
                cursor.expect_punct(':')?;
                arguments.push((name, cursor.ty()?));
                if !cursor.eat_punct(',') {
                    break;
                }
            }
            cursor.expect_punct(')')?;
        }
        cursor.expect_punct(':')?;
        cursor.expect_end()?;

        builder.create_block(label.clone(), arguments)?;
        builder.switch_to(&label)?;
        self.in_block = true;
        Ok(())
    }

    fn parse_instruction(&mut self, cursor: &mut Cursor) -> SwirlResult<()> {
        let (Some(builder), Some(module)) = (self.function.as_mut(), self.module.as_ref()) else {
            return Err(cursor.error_here("instruction outside of a function"));
        };
        let mut ctx = InstructionParser {
            cursor,
            builder,
            globals: &module.globals,
        };
        let node = ctx.parse()?;
        ctx.builder.push_node(node)
    }

    fn parse_global(&mut self, cursor: &mut Cursor) -> SwirlResult<()> {
        let Some(module) = self.module.as_mut() else {
            return Err(cursor.error_before("missing module header"));
        };
        let name = cursor.symbol()?;
        cursor.expect_punct(':')?;
        let ty = cursor.ty()?;
        let initializer = if cursor.eat_punct('=') {
            Some(cursor.literal()?)
        } else {
            None
        };
        cursor.expect_end()?;
        module.globals.add(GlobalVariable {
            value: Value::global(name, ty),
            initializer,
        })
    }

    fn finish(self, last_line: u32) -> SwirlResult<Module> {
        let location = self.location(last_line);
        if let Some(builder) = &self.function {
            return Err(SwirlError::syntax(
                format!("function '{}' is not closed", builder.name()),
                location,
            ));
        }
        self.module
            .ok_or_else(|| SwirlError::syntax("missing module header", location))
    }
}

/// Per-instruction parsing state
struct InstructionParser<'c, 't, 'b, 'g> {
    cursor: &'c mut Cursor<'t>,
    builder: &'b mut FunctionBuilder,
    globals: &'g GlobalValueTable,
}

impl InstructionParser<'_, '_, '_, '_> {
    fn operand(&mut self) -> SwirlResult<Value> {
        let name = self.cursor.local()?;
        self.builder.value(&name)
    }

    fn operand_list(&mut self) -> SwirlResult<Vec<Value>> {
        self.cursor.expect_punct('(')?;
        let mut values = Vec::new();
        if self.cursor.eat_punct(')') {
            return Ok(values);
        }
        loop {
            values.push(self.operand()?);
            if !self.cursor.eat_punct(',') {
                break;
            }
        }
        self.cursor.expect_punct(')')?;
        Ok(values)
    }

    fn target(&mut self) -> SwirlResult<BranchTarget> {
        let block = BlockId::new(self.cursor.word()?);
        let args = if self.cursor.peek_punct('(') {
            self.operand_list()?
        } else {
            Vec::new()
        };
        Ok(BranchTarget::new(block, args))
    }

    fn labelled(&mut self, keyword: &str) -> SwirlResult<BlockId> {
        self.cursor.expect_punct(',')?;
        self.cursor.expect_word(keyword)?;
        Ok(BlockId::new(self.cursor.word()?))
    }

    fn index(&mut self) -> SwirlResult<usize> {
        self.cursor.expect_punct('[')?;
        let index = self.cursor.number::<usize>("index")?;
        self.cursor.expect_punct(']')?;
        Ok(index)
    }

    fn parse(&mut self) -> SwirlResult<InstructionNode> {
        let result_name = if let Some(TokenKind::Local(_)) = self.cursor.peek() {
            let name = self.cursor.local()?;
            self.cursor.expect_define()?;
            Some(name)
        } else {
            None
        };

        let opcode = self.cursor.word()?;
        // Operands are resolved before the result is defined, so an instruction
        // cannot consume its own result.
        let result_slot = Value::local(String::new(), IrType::any());

        let mut instruction = match opcode.as_str() {
            "new" => Instruction::New { result: result_slot },
            "integer_literal" => Instruction::IntegerLiteral {
                result: result_slot,
                value: self.cursor.number::<i128>("integer")?,
            },
            "float_literal" => Instruction::FloatLiteral {
                result: result_slot,
                value: FloatValue(self.cursor.number::<f64>("float")?),
            },
            "string_literal" => Instruction::StringLiteral {
                result: result_slot,
                value: self.cursor.string()?,
            },
            "function_ref" => Instruction::FunctionRef {
                result: result_slot,
                function: self.cursor.symbol()?,
            },
            "global_addr" => {
                let name = self.cursor.symbol()?;
                Instruction::GlobalAddr {
                    result: result_slot,
                    global: self.globals.get(&name)?.clone(),
                }
            }
            "dynamic_ref" => {
                let object = if let Some(TokenKind::Local(_)) = self.cursor.peek() {
                    let object = self.operand()?;
                    self.cursor.expect_punct(',')?;
                    Some(object)
                } else {
                    None
                };
                Instruction::DynamicRef {
                    result: result_slot,
                    object,
                    member: self.cursor.quoted()?,
                }
            }
            "assign" => Instruction::Assign {
                result: result_slot,
                source: self.operand()?,
            },
            "load" => Instruction::Load {
                result: result_slot,
                address: self.operand()?,
            },
            "array_read" => {
                let base = self.operand()?;
                Instruction::ArrayRead {
                    result: result_slot,
                    base,
                    index: self.index()?,
                }
            }
            "field_read" => {
                let object = self.operand()?;
                self.cursor.expect_punct(',')?;
                Instruction::FieldRead {
                    result: result_slot,
                    object,
                    field: self.cursor.quoted()?,
                }
            }
            "aggregate" => Instruction::Aggregate {
                result: result_slot,
                elements: self.operand_list()?,
            },
            "binary_op" => {
                let operator = self.cursor.quoted()?;
                let lhs = self.operand()?;
                self.cursor.expect_punct(',')?;
                Instruction::BinaryOp {
                    result: result_slot,
                    operator,
                    lhs,
                    rhs: self.operand()?,
                }
            }
            "unary_op" => {
                let operator = self.cursor.quoted()?;
                Instruction::UnaryOp {
                    result: result_slot,
                    operator,
                    operand: self.operand()?,
                }
            }
            "partial_apply" => {
                let function = self.operand()?;
                Instruction::PartialApply {
                    result: result_slot,
                    function,
                    args: self.operand_list()?,
                }
            }
            "apply" => {
                let function = self.operand()?;
                Instruction::Apply {
                    result: None,
                    function,
                    args: self.operand_list()?,
                }
            }
            "builtin" => {
                let name = self.cursor.quoted()?;
                Instruction::Builtin {
                    result: None,
                    name,
                    args: self.operand_list()?,
                }
            }
            "opaque" => {
                let opcode = self.cursor.quoted()?;
                Instruction::Opaque {
                    result: None,
                    opcode,
                    operands: self.operand_list()?,
                }
            }
            "store" => {
                let value = self.operand()?;
                self.cursor.expect_word("to")?;
                Instruction::Store {
                    value,
                    address: self.operand()?,
                }
            }
            "field_write" => {
                let value = self.operand()?;
                self.cursor.expect_word("to")?;
                let object = self.operand()?;
                self.cursor.expect_punct(',')?;
                Instruction::FieldWrite {
                    value,
                    object,
                    field: self.cursor.quoted()?,
                }
            }
            "array_write" => {
                let value = self.operand()?;
                self.cursor.expect_word("to")?;
                let base = self.operand()?;
                Instruction::ArrayWrite {
                    value,
                    base,
                    index: self.index()?,
                }
            }
            "cond_fail" => Instruction::CondFail {
                condition: self.operand()?,
            },
            "br" => Instruction::Branch {
                target: self.target()?,
            },
            "cond_br" => {
                let condition = self.operand()?;
                self.cursor.expect_punct(',')?;
                let true_target = self.target()?;
                self.cursor.expect_punct(',')?;
                Instruction::ConditionalBranch {
                    condition,
                    true_target,
                    false_target: self.target()?,
                }
            }
            "switch" => {
                let operand = self.operand()?;
                let mut cases = Vec::new();
                let mut default = None;
                while self.cursor.eat_punct(',') {
                    match self.cursor.word()?.as_str() {
                        "case" if default.is_none() => {
                            let case = match self.cursor.peek() {
                                Some(TokenKind::Local(_)) => SwitchCase::Value(self.operand()?),
                                _ => SwitchCase::Name(self.cursor.quoted()?),
                            };
                            self.cursor.expect_punct(':')?;
                            cases.push((case, BlockId::new(self.cursor.word()?)));
                        }
                        "default" if default.is_none() => {
                            default = Some(BlockId::new(self.cursor.word()?));
                        }
                        other => {
                            return Err(self.cursor.error_before(format!("unexpected '{other}' in switch")))
                        }
                    }
                }
                Instruction::Switch {
                    operand,
                    cases,
                    default,
                }
            }
            "try_apply" => {
                let function = self.operand()?;
                let args = self.operand_list()?;
                let normal = self.labelled("normal")?;
                Instruction::TryApply {
                    function,
                    args,
                    normal,
                    error: self.labelled("error")?,
                }
            }
            "yield" => {
                let values = self.operand_list()?;
                let resume = self.labelled("resume")?;
                Instruction::Yield {
                    values,
                    resume,
                    unwind: self.labelled("unwind")?,
                }
            }
            "return" => {
                let value = if let Some(TokenKind::Local(_)) = self.cursor.peek() {
                    Some(self.operand()?)
                } else {
                    None
                };
                Instruction::Return { value }
            }
            "throw" => Instruction::Throw {
                value: self.operand()?,
            },
            "unreachable" => Instruction::Unreachable,
            other => return Err(self.cursor.error_before(format!("unknown instruction '{other}'"))),
        };

        let takes_result = instruction.result().is_some()
            || matches!(
                instruction,
                Instruction::Apply { .. } | Instruction::Builtin { .. } | Instruction::Opaque { .. }
            );

        match (result_name, takes_result) {
            (Some(name), true) => {
                self.cursor.expect_punct(':')?;
                let ty = self.cursor.ty()?;
                let result = self.builder.define(&name, ty)?;
                set_result(&mut instruction, result);
            }
            (None, true) if instruction.result().is_some() => {
                return Err(self.cursor.error_before(format!("'{opcode}' requires a result")));
            }
            (Some(_), false) => {
                return Err(self.cursor.error_before(format!("'{opcode}' does not produce a result")));
            }
            _ => {}
        }

        let metadata = self.cursor.metadata()?;
        self.cursor.expect_end()?;
        Ok(InstructionNode {
            instruction,
            metadata,
        })
    }
}

/// Fill the result slot of a freshly parsed instruction
fn set_result(instruction: &mut Instruction, value: Value) {
    match instruction {
        Instruction::Apply { result, .. }
        | Instruction::Builtin { result, .. }
        | Instruction::Opaque { result, .. } => *result = Some(value),
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
        | Instruction::PartialApply { result, .. } => *result = value,
        _ => {}
    }
}

/// Token cursor over one line
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    location: SourceLocation,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token], location: SourceLocation) -> Self {
        Self {
            tokens,
            pos: 0,
            location,
        }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    /// Error at the current token (or end of line)
    fn error_here(&self, message: impl Into<String>) -> SwirlError {
        let column = match self.tokens.get(self.pos) {
            Some(token) => token.column,
            None => self.tokens.last().map_or(1, |t| t.column + 1),
        };
        SwirlError::syntax(message, self.location.with_column(column))
    }

    /// Error at the token just consumed
    fn error_before(&self, message: impl Into<String>) -> SwirlError {
        let column = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(1, |t| t.column);
        SwirlError::syntax(message, self.location.with_column(column))
    }

    fn next(&mut self, expected: &str) -> SwirlResult<&'t Token> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token)
            }
            None => Err(self.error_here(format!("expected {expected}, found end of line"))),
        }
    }

    fn unexpected(&self, expected: &str) -> SwirlError {
        self.error_before(format!("expected {expected}"))
    }

    fn word(&mut self) -> SwirlResult<String> {
        match &self.next("a keyword or label")?.kind {
            TokenKind::Word(word) => Ok(word.clone()),
            _ => Err(self.unexpected("a keyword or label")),
        }
    }

    fn expect_word(&mut self, keyword: &str) -> SwirlResult<()> {
        let expected = format!("'{keyword}'");
        match &self.next(&expected)?.kind {
            TokenKind::Word(word) if word == keyword => Ok(()),
            _ => Err(self.unexpected(&expected)),
        }
    }

    fn local(&mut self) -> SwirlResult<String> {
        match &self.next("a value")?.kind {
            TokenKind::Local(name) => Ok(name.clone()),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn symbol(&mut self) -> SwirlResult<String> {
        match &self.next("a symbol")?.kind {
            TokenKind::Symbol(name) => Ok(name.clone()),
            _ => Err(self.unexpected("a symbol")),
        }
    }

    fn ty(&mut self) -> SwirlResult<IrType> {
        match &self.next("a type")?.kind {
            TokenKind::Type(spelling) => Ok(IrType::new(spelling.clone())),
            _ => Err(self.unexpected("a type")),
        }
    }

    fn quoted(&mut self) -> SwirlResult<String> {
        match &self.next("a quoted name")?.kind {
            TokenKind::Quoted(text) => Ok(text.clone()),
            _ => Err(self.unexpected("a quoted name")),
        }
    }

    fn string(&mut self) -> SwirlResult<String> {
        match &self.next("a string literal")?.kind {
            TokenKind::Str(text) => Ok(text.clone()),
            _ => Err(self.unexpected("a string literal")),
        }
    }

    fn number<N: std::str::FromStr>(&mut self, what: &str) -> SwirlResult<N> {
        let word = self.word()?;
        word.parse::<N>()
            .map_err(|_| self.error_before(format!("invalid {what} '{word}'")))
    }

    fn literal(&mut self) -> SwirlResult<Literal> {
        match &self.next("a literal")?.kind {
            TokenKind::Str(text) => Ok(Literal::Str(text.clone())),
            TokenKind::Word(word) => {
                if let Ok(value) = word.parse::<i128>() {
                    Ok(Literal::Int(value))
                } else if let Ok(value) = word.parse::<f64>() {
                    Ok(Literal::Float(FloatValue(value)))
                } else {
                    Err(self.error_before(format!("invalid literal '{word}'")))
                }
            }
            _ => Err(self.unexpected("a literal")),
        }
    }

    fn expect_define(&mut self) -> SwirlResult<()> {
        match &self.next("':='")?.kind {
            TokenKind::Define => Ok(()),
            _ => Err(self.unexpected("':='")),
        }
    }

    fn peek_punct(&self, c: char) -> bool {
        self.peek() == Some(&TokenKind::Punct(c))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> SwirlResult<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected '{c}'")))
        }
    }

    /// Optional trailing `; #<line> loc "<file>":<l>:<c>` comment
    fn metadata(&mut self) -> SwirlResult<Metadata> {
        let mut metadata = Metadata::default();
        if !self.eat_punct(';') {
            return Ok(metadata);
        }
        while self.peek().is_some() {
            if self.eat_punct('#') {
                metadata.line = Some(self.number::<u32>("line number")?);
                continue;
            }
            self.expect_word("loc")?;
            let filename = self.string()?;
            self.expect_punct(':')?;
            let line = self.number::<u32>("line")?;
            self.expect_punct(':')?;
            let column = self.number::<u32>("column")?;
            metadata.position = Some(SourceLocation::new(&filename, line, column));
        }
        Ok(metadata)
    }

    fn expect_end(&self) -> SwirlResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error_here("unexpected trailing input")),
        }
    }
}
