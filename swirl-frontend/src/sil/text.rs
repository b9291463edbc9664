//! Text helpers for the low-level dialect
//!
//! Operand lists are scanned at bracket depth zero so that commas, colons and
//! keywords nested inside types (`Dictionary<String, Int>`,
//! `@convention(thin) (Int, Int) -> Int`) or string literals are ignored.

use swirl_common::SourceLocation;

/// Characters at bracket depth zero outside string literals, with byte offsets.
/// Openers are reported before the depth increases, closers after it drops.
fn top_level(text: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut prev = '\0';
    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            prev = c;
            continue;
        }
        match c {
            '"' => {
                if depth == 0 {
                    out.push((i, c));
                }
                in_string = true;
            }
            '(' | '[' | '{' | '<' => {
                if depth == 0 {
                    out.push((i, c));
                }
                depth += 1;
            }
            // the arrow of a function type
            '>' if prev == '-' => {
                if depth == 0 {
                    out.push((i, c));
                }
            }
            ')' | ']' | '}' | '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    out.push((i, c));
                }
            }
            _ => {
                if depth == 0 {
                    out.push((i, c));
                }
            }
        }
        prev = c;
    }
    out
}

/// Split at top-level `separator`; pieces are trimmed and empty ones dropped
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, c) in top_level(text) {
        if c == separator {
            pieces.push(text[start..i].trim());
            start = i + c.len_utf8();
        }
    }
    pieces.push(text[start..].trim());
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

/// First top-level occurrence of `pattern`
pub fn find_top_level(text: &str, pattern: &str) -> Option<usize> {
    top_level(text)
        .into_iter()
        .map(|(i, _)| i)
        .find(|&i| text[i..].starts_with(pattern))
}

/// Last top-level occurrence of `pattern`
pub fn rfind_top_level(text: &str, pattern: &str) -> Option<usize> {
    top_level(text)
        .into_iter()
        .rev()
        .map(|(i, _)| i)
        .find(|&i| text[i..].starts_with(pattern))
}

/// Remove a trailing `//` comment that is not inside a string literal
pub fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    let mut prev = '\0';
    for (i, c) in line.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == '/' && prev == '/' {
            return &line[..i - 1];
        }
        prev = c;
    }
    line
}

/// Split off `, loc "file":l:c` and `, scope N` debug suffixes, returning the
/// instruction text and the recorded source position
pub fn split_debug_suffix(text: &str) -> (&str, Option<SourceLocation>) {
    let cut = [", loc ", ", scope "]
        .iter()
        .filter_map(|pattern| find_top_level(text, pattern))
        .min();
    let Some(cut) = cut else {
        return (text, None);
    };
    let suffix = &text[cut..];
    let position = suffix
        .strip_prefix(", loc ")
        .and_then(|loc| parse_position(loc.trim_start_matches('*')));
    (text[..cut].trim_end(), position)
}

/// `"file":line:col`
fn parse_position(text: &str) -> Option<SourceLocation> {
    let (file, rest) = string_literal_with_rest(text)?;
    let mut numbers = rest.strip_prefix(':')?.split(':');
    let line = leading_digits(numbers.next()?)?;
    let column = leading_digits(numbers.next()?)?;
    Some(SourceLocation::new(&file, line, column))
}

fn leading_digits(text: &str) -> Option<u32> {
    let end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len(), |(i, _)| i);
    text[..end].parse().ok()
}

fn is_value_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.')
}

/// Every `%name` outside string literals, in order, without the sigil
pub fn values(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
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
        if c == '"' {
            in_string = true;
        } else if c == '%' {
            let start = i + 1;
            let mut end = start;
            while let Some(&(j, next)) = chars.peek() {
                if !is_value_char(next) {
                    break;
                }
                end = j + next.len_utf8();
                chars.next();
            }
            if end > start {
                names.push(text[start..end].to_string());
            }
        }
    }
    names
}

pub fn first_value(text: &str) -> Option<String> {
    values(text).into_iter().next()
}

/// First top-level `@symbol`, without the sigil
pub fn symbol(text: &str) -> Option<String> {
    let start = top_level(text)
        .into_iter()
        .find(|&(_, c)| c == '@')
        .map(|(i, _)| i + 1)?;
    let end = text[start..]
        .char_indices()
        .find(|&(_, c)| !is_symbol_char(c))
        .map_or(text.len(), |(i, _)| start + i);
    (end > start).then(|| text[start..end].to_string())
}

/// First string literal, decoded
pub fn string_literal(text: &str) -> Option<String> {
    let open = text.find('"')?;
    string_literal_with_rest(&text[open..]).map(|(value, _)| value)
}

/// Decode a string literal at the start of `text`, returning the text after it
fn string_literal_with_rest(text: &str) -> Option<(String, &str)> {
    let mut chars = text.strip_prefix('"')?.char_indices();
    let mut value = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &text[i + 2..])),
            '\\' => {
                let (_, escaped) = chars.next()?;
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    'u' => {
                        // \u{XXXX}
                        let mut digits = String::new();
                        for (_, d) in chars.by_ref() {
                            match d {
                                '{' => {}
                                '}' => break,
                                d => digits.push(d),
                            }
                        }
                        let code = u32::from_str_radix(&digits, 16).ok()?;
                        value.push(char::from_u32(code)?);
                    }
                    other => value.push(other),
                }
            }
            c => value.push(c),
        }
    }
    None
}

/// Text of a `$`-prefixed type segment, without the sigil
pub fn segment_type(segment: &str) -> Option<String> {
    segment
        .trim()
        .strip_prefix('$')
        .map(|ty| ty.trim().to_string())
}

/// The type of a trailing ` : $T` annotation, up to the next top-level comma
pub fn type_annotation(text: &str) -> Option<String> {
    let colon = top_level(text)
        .into_iter()
        .rev()
        .map(|(i, _)| i)
        .find(|&i| text[i..].starts_with(':') && text[i + 1..].trim_start().starts_with('$'))?;
    let after = text[colon + 1..].trim_start();
    let ty = &after[1..];
    let end = find_top_level(ty, ",").unwrap_or(ty.len());
    Some(ty[..end].trim().to_string())
}

/// The type of the first ` : $T` annotation, the operand type of most
/// single-operand instructions
pub fn first_type_annotation(text: &str) -> Option<String> {
    let colon = top_level(text)
        .into_iter()
        .map(|(i, _)| i)
        .find(|&i| text[i..].starts_with(':') && text[i + 1..].trim_start().starts_with('$'))?;
    let after = text[colon + 1..].trim_start();
    let ty = &after[1..];
    let end = [find_top_level(ty, ","), find_top_level(ty, " : ")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(ty.len());
    Some(ty[..end].trim().to_string())
}

/// Leading `$T` operand after any flags, as in `alloc_stack [lexical] $T`
pub fn leading_type(text: &str) -> Option<String> {
    let text = strip_flags(text);
    if !text.starts_with('$') {
        return None;
    }
    let end = [find_top_level(text, ","), find_top_level(text, " (")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
    segment_type(&text[..end])
}

/// Element `index` of a tuple type such as `(Int, label: String)`
pub fn tuple_element_type(tuple: &str, index: usize) -> Option<String> {
    let inner = tuple.trim().strip_prefix('(')?.strip_suffix(')')?;
    let element = *split_top_level(inner, ',').get(index)?;
    let element = match find_top_level(element, ":") {
        Some(colon) => element[colon + 1..].trim(),
        None => element,
    };
    Some(element.to_string())
}

/// Target type of a conversion: `%0 : $A to [flags] $B`
pub fn converted_type(text: &str) -> Option<String> {
    let to = find_top_level(text, " to ")?;
    let target = strip_flags(&text[to + 4..]);
    let end = find_top_level(target, ",").unwrap_or(target.len());
    segment_type(&target[..end])
}

/// `%4 : $T` as `("4", "T")`
pub fn typed_value(segment: &str) -> Option<(String, String)> {
    let (name, ty) = segment.split_once(':')?;
    let name = name.trim().strip_prefix('%')?;
    Some((name.to_string(), segment_type(ty)?))
}

/// Drop leading `[flag]` groups such as `[take]` or `[callee_guaranteed]`
pub fn strip_flags(text: &str) -> &str {
    let mut rest = text.trim_start();
    while rest.starts_with('[') {
        match top_level(rest).into_iter().find(|&(_, c)| c == ']') {
            Some((close, _)) => rest = rest[close + 1..].trim_start(),
            None => break,
        }
    }
    rest
}

/// Result type of a function type: whatever follows its first top-level `->`
pub fn fn_result_type(ty: &str) -> Option<String> {
    let arrow = find_top_level(ty, "->")?;
    let mut result = ty[arrow + 2..].trim();
    for convention in ["@owned ", "@unowned_inner_pointer ", "@unowned ", "@autoreleased ", "@out "] {
        if let Some(stripped) = result.strip_prefix(convention) {
            result = stripped.trim_start();
        }
    }
    (!result.is_empty()).then(|| result.to_string())
}

/// A call `%f<Subs>(%a, %b) : $T`, as callee, argument names and callee type
pub fn call_parts(text: &str) -> Option<(String, Vec<String>, Option<String>)> {
    let text = strip_flags(text);
    let after_sigil = text.strip_prefix('%')?;
    let name_end = after_sigil
        .char_indices()
        .find(|&(_, c)| !is_value_char(c))
        .map_or(after_sigil.len(), |(i, _)| i);
    let callee = after_sigil[..name_end].to_string();
    let rest = &after_sigil[name_end..];

    let open = top_level(rest).into_iter().find(|&(_, c)| c == '(')?.0;
    let close = top_level(&rest[open..])
        .into_iter()
        .find(|&(_, c)| c == ')')
        .map(|(i, _)| open + i)?;
    let args = values(&rest[open + 1..close]);
    let ty = type_annotation(&rest[close + 1..]);
    Some((callee, args, ty))
}

/// Branch target `bb1` or `bb1(%a : $T, ...)`, as label and argument names
pub fn block_target(segment: &str) -> Option<(String, Vec<String>)> {
    let segment = segment.trim();
    let end = segment
        .char_indices()
        .find(|&(_, c)| !is_value_char(c))
        .map_or(segment.len(), |(i, _)| i);
    if end == 0 {
        return None;
    }
    Some((segment[..end].to_string(), values(&segment[end..])))
}

/// Decode a hexadecimal IEEE bit pattern for the given builtin float type
pub fn decode_float_bits(text: &str, ty: &str) -> Option<f64> {
    let digits = text.trim().strip_prefix("0x")?;
    let bits = u128::from_str_radix(digits, 16).ok()?;
    if ty.contains("FPIEEE32") {
        Some(f32::from_bits(u32::try_from(bits).ok()?) as f64)
    } else if ty.contains("FPIEEE64") {
        Some(f64::from_bits(u64::try_from(bits).ok()?))
    } else if ty.contains("FPIEEE16") {
        Some(decode_half(u16::try_from(bits).ok()?))
    } else if ty.contains("FPIEEE80") {
        Some(decode_extended(bits))
    } else {
        None
    }
}

fn decode_half(bits: u16) -> f64 {
    let sign = if bits >> 15 == 1 { -1.0 } else { 1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let mantissa = f64::from(bits & 0x3ff);
    match exponent {
        0 => sign * mantissa * 2f64.powi(-24),
        0x1f if mantissa == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        e => sign * (1.0 + mantissa / 1024.0) * 2f64.powi(e - 15),
    }
}

/// x87 80-bit extended precision: explicit integer bit, 15-bit exponent
fn decode_extended(bits: u128) -> f64 {
    let sign = if (bits >> 79) & 1 == 1 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 64) & 0x7fff) as i32;
    let mantissa = (bits & u128::from(u64::MAX)) as u64;
    if exponent == 0x7fff {
        return if mantissa << 1 == 0 { sign * f64::INFINITY } else { f64::NAN };
    }
    let exponent = if exponent == 0 { -16382 } else { exponent - 16383 };
    sign * (mantissa as f64 / 2f64.powi(63)) * 2f64.powi(exponent)
}
