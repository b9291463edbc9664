//! Syntax pass over the low-level dialect
//!
//! Line oriented: every line is classified by the current state (top level,
//! skipped declaration, global initializer or function body) and turned into
//! raw nodes. Nothing is resolved here.

use super::raw::{RawBlock, RawFunction, RawGlobal, RawInstruction, RawModule};
use super::text::{
    find_top_level, segment_type, split_debug_suffix, split_top_level, strip_comment, symbol,
    values,
};
use log::debug;
use swirl_common::{SourceLocation, SwirlError, SwirlResult};

enum State {
    TopLevel,
    /// Inside a brace-delimited declaration we do not lower
    Skipping { depth: i64 },
    Initializer(RawGlobal),
    Body {
        function: RawFunction,
        blocks: Vec<RawBlock>,
        current: Option<RawBlock>,
    },
}

/// Parse a textual dump into raw nodes
pub fn parse_sil(text: &str, module_name: &str, filename: &str) -> SwirlResult<RawModule> {
    let mut module = RawModule {
        name: module_name.to_string(),
        ..RawModule::default()
    };
    let mut state = State::TopLevel;

    for (index, line) in text.lines().enumerate() {
        let line = strip_comment(line);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let column = (line.len() - line.trim_start().len()) as u32 + 1;
        let location = SourceLocation::new(filename, index as u32 + 1, column);

        state = match state {
            State::TopLevel => top_level_line(&mut module, trimmed, location)?,
            State::Skipping { depth } => {
                let depth = depth + brace_delta(trimmed);
                if depth > 0 {
                    State::Skipping { depth }
                } else {
                    State::TopLevel
                }
            }
            State::Initializer(mut global) => {
                if trimmed == "}" {
                    module.globals.push(global);
                    State::TopLevel
                } else {
                    if !trimmed.ends_with(':') {
                        global.initializer.push(parse_instruction(trimmed, location)?);
                    }
                    State::Initializer(global)
                }
            }
            State::Body {
                mut function,
                mut blocks,
                mut current,
            } => {
                let indented = line.starts_with(char::is_whitespace);
                if trimmed == "}" && !indented {
                    blocks.extend(current);
                    if blocks.is_empty() {
                        return Err(SwirlError::syntax(
                            format!("function '{}' has an empty body", function.name),
                            location,
                        ));
                    }
                    function.blocks = Some(blocks);
                    module.functions.push(function);
                    State::TopLevel
                } else if !indented {
                    blocks.extend(current.take());
                    current = Some(parse_block_label(trimmed, location)?);
                    State::Body {
                        function,
                        blocks,
                        current,
                    }
                } else {
                    let Some(block) = current.as_mut() else {
                        return Err(SwirlError::syntax(
                            "instruction outside of a basic block",
                            location,
                        ));
                    };
                    block.instructions.push(parse_instruction(trimmed, location)?);
                    State::Body {
                        function,
                        blocks,
                        current,
                    }
                }
            }
        };
    }

    let unterminated = match state {
        State::TopLevel | State::Skipping { .. } => return Ok(module),
        State::Initializer(global) => global.location,
        State::Body { function, .. } => function.location,
    };
    Err(SwirlError::syntax("missing closing '}'", unterminated))
}

fn top_level_line(module: &mut RawModule, line: &str, location: SourceLocation) -> SwirlResult<State> {
    let keyword = line.split_whitespace().next().unwrap_or_default();
    match keyword {
        "sil_global" => {
            let (header, opens) = split_open_brace(line);
            let global = parse_global_header(header, location)?;
            if opens {
                Ok(State::Initializer(global))
            } else {
                module.globals.push(global);
                Ok(State::TopLevel)
            }
        }
        "sil" => {
            let (header, opens) = split_open_brace(line);
            let function = parse_function_header(header, location)?;
            if opens {
                Ok(State::Body {
                    function,
                    blocks: Vec::new(),
                    current: None,
                })
            } else {
                module.functions.push(function);
                Ok(State::TopLevel)
            }
        }
        // sil_stage, import, sil_scope, vtables, witness tables, declarations
        _ => {
            let depth = brace_delta(line);
            Ok(if depth > 0 {
                debug!("Skipping block at {}: {}", location, keyword);
                State::Skipping { depth }
            } else {
                State::TopLevel
            })
        }
    }
}

/// Net count of braces opened on a line, outside string literals
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in line.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// Split a trailing `{` (and a `=` before it) off a header
fn split_open_brace(line: &str) -> (&str, bool) {
    match line.strip_suffix('{') {
        Some(header) => {
            let header = header.trim_end();
            (header.strip_suffix('=').unwrap_or(header).trim_end(), true)
        }
        None => (line, false),
    }
}

/// Symbol name and the `$` type that follows it
fn symbol_and_type(header: &str, location: &SourceLocation) -> SwirlResult<(String, String, usize)> {
    let name = symbol(header)
        .ok_or_else(|| SwirlError::syntax("expected an '@' symbol", location.clone()))?;
    let at = find_top_level(header, "@")
        .ok_or_else(|| SwirlError::syntax("expected an '@' symbol", location.clone()))?;
    let after = header[at + 1 + name.len()..].trim_start();
    let ty = after
        .strip_prefix(':')
        .and_then(segment_type)
        .ok_or_else(|| {
            SwirlError::syntax(
                format!("expected ': $Type' after '@{name}'"),
                location.clone(),
            )
        })?;
    Ok((name, ty, at))
}

fn parse_global_header(header: &str, location: SourceLocation) -> SwirlResult<RawGlobal> {
    let (name, ty, _) = symbol_and_type(header, &location)?;
    Ok(RawGlobal {
        name,
        ty,
        initializer: Vec::new(),
        location,
    })
}

fn parse_function_header(header: &str, location: SourceLocation) -> SwirlResult<RawFunction> {
    // Linkage and attributes between `sil` and the symbol do not affect lowering
    let (name, ty, _) = symbol_and_type(header, &location)?;
    Ok(RawFunction {
        name,
        ty,
        blocks: None,
        location,
    })
}

/// `bb1(%0 : $Int, %1 : @owned $C):`
fn parse_block_label(line: &str, location: SourceLocation) -> SwirlResult<RawBlock> {
    let Some(label) = line.strip_suffix(':') else {
        return Err(SwirlError::syntax("expected a block label", location));
    };
    let (name, arguments) = match label.find('(') {
        Some(open) => {
            let inner = label[open + 1..].strip_suffix(')').ok_or_else(|| {
                SwirlError::syntax("unclosed block argument list", location.clone())
            })?;
            let mut arguments = Vec::new();
            for argument in split_top_level(inner, ',') {
                arguments.push(parse_block_argument(argument, &location)?);
            }
            (&label[..open], arguments)
        }
        None => (label, Vec::new()),
    };
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(SwirlError::syntax(format!("invalid block label '{label}'"), location));
    }
    Ok(RawBlock {
        label: name.to_string(),
        arguments,
        instructions: Vec::new(),
        location,
    })
}

fn parse_block_argument(argument: &str, location: &SourceLocation) -> SwirlResult<(String, String)> {
    let invalid = || SwirlError::syntax(format!("invalid block argument '{argument}'"), location.clone());
    let (name, ty) = argument.split_once(':').ok_or_else(invalid)?;
    let name = name.trim().strip_prefix('%').ok_or_else(invalid)?;
    // ownership annotations such as `@owned` precede the type
    let ty = ty.find('$').map(|dollar| ty[dollar + 1..].trim()).ok_or_else(invalid)?;
    Ok((name.to_string(), ty.to_string()))
}

/// `[%r = | (%a, %b) = ] opcode arguments`
fn parse_instruction(line: &str, location: SourceLocation) -> SwirlResult<RawInstruction> {
    let (text, position) = split_debug_suffix(line);
    let (results, rest) = match find_top_level(text, " = ") {
        Some(eq) if text.starts_with('%') || text.starts_with('(') => (values(&text[..eq]), text[eq + 3..].trim()),
        _ => (Vec::new(), text),
    };
    let (opcode, arguments) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if opcode.is_empty() || !opcode.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(SwirlError::syntax("expected an opcode", location));
    }
    Ok(RawInstruction {
        results,
        opcode: opcode.to_string(),
        arguments: arguments.trim().to_string(),
        location,
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    const DUMP: &str = indoc! {r#"
        sil_stage canonical

        import Builtin
        import Swift

        struct Point {
          @_hasStorage var x: Int { get set }
          init(x: Int)
        }

        // counter
        sil_global hidden @$s4main7counterSivp : $Int

        sil_global private @$s4main5limitSivp : $Int = {
          %0 = integer_literal $Builtin.Int64, 10 // user: %1
          %initval = struct $Int (%0 : $Builtin.Int64)
        }

        sil_scope 1 { loc "main.swift":1:1 parent @main : $@convention(c) (Int32) -> Int32 }

        // main
        sil [ossa] @main : $@convention(c) (Int32, UnsafeMutablePointer<Optional<UnsafeMutablePointer<Int8>>>) -> Int32 {
        bb0(%0 : $Int32, %1 : $UnsafeMutablePointer<Optional<UnsafeMutablePointer<Int8>>>):
          %2 = string_literal utf8 "a // b", loc "main.swift":3:7, scope 1
          (%3, %4) = destructure_tuple %5 : $(Int, Int)
          br bb1 // id: %6

        bb1:                                              // Preds: bb0
          unreachable
        }

        sil @print : $@convention(thin) (@in_guaranteed Any) -> ()

        sil_vtable C {
          #C.init!allocator: (C.Type) -> () -> C : @$s4main1CCACycfC
        }
    "#};

    #[test]
    fn test_parse_dump() {
        let raw = parse_sil(DUMP, "main", "main.sil").unwrap();
        assert_eq!(raw.name, "main");

        let globals: Vec<_> = raw.globals.iter().map(|g| (g.name.as_str(), g.ty.as_str())).collect();
        assert_eq!(globals, vec![("$s4main7counterSivp", "Int"), ("$s4main5limitSivp", "Int")]);
        assert_eq!(raw.globals[1].initializer.len(), 2);
        assert_eq!(raw.globals[1].initializer[1].results, vec!["initval"]);

        assert_eq!(raw.functions.len(), 2);
        let main = &raw.functions[0];
        assert_eq!(main.name, "main");
        assert_eq!(main.location, SourceLocation::new("main.sil", 22, 1));
        let blocks = main.blocks.as_ref().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0].arguments[1],
            ("1".to_string(), "UnsafeMutablePointer<Optional<UnsafeMutablePointer<Int8>>>".to_string())
        );

        let literal = &blocks[0].instructions[0];
        assert_eq!(literal.results, vec!["2"]);
        assert_eq!(literal.opcode, "string_literal");
        assert_eq!(literal.arguments, r#"utf8 "a // b""#);
        assert_eq!(literal.position, Some(SourceLocation::new("main.swift", 3, 7)));
        assert_eq!(literal.location, SourceLocation::new("main.sil", 24, 3));

        let destructure = &blocks[0].instructions[1];
        assert_eq!(destructure.results, vec!["3", "4"]);
        assert_eq!(destructure.arguments, "%5 : $(Int, Int)");
        assert_eq!(blocks[0].instructions[2].opcode, "br");
        assert_eq!(blocks[1].instructions[0].opcode, "unreachable");

        let print = &raw.functions[1];
        assert_eq!(print.name, "print");
        assert!(print.blocks.is_none());
    }

    #[test]
    fn test_instruction_outside_block() {
        let text = indoc! {"
            sil @f : $() -> () {
              unreachable
            }
        "};
        let err = parse_sil(text, "m", "m.sil").unwrap_err();
        assert_eq!(err.location(), Some(&SourceLocation::new("m.sil", 2, 3)));
    }

    #[test]
    fn test_unterminated_function() {
        let text = indoc! {"
            sil @f : $() -> () {
            bb0:
              unreachable
        "};
        let err = parse_sil(text, "m", "m.sil").unwrap_err();
        assert_eq!(err.location(), Some(&SourceLocation::new("m.sil", 1, 1)));
    }

    #[test]
    fn test_missing_symbol() {
        let err = parse_sil("sil hidden : $() -> ()\n", "m", "m.sil").unwrap_err();
        assert!(matches!(err, SwirlError::Syntax { .. }));
    }
}
