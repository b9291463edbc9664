//! IR Type Tags and Identifiers
//!
//! Types are opaque semantic tags carrying the source language's own type
//! spelling; the IR never interprets them. Block labels and the quoting
//! rules shared by the printer and the lexer also live here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type tag, e.g. `Swift.Int` or `@convention(thin) () -> ()`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrType(pub String);

impl IrType {
    pub fn new(spelling: impl Into<String>) -> Self {
        IrType(spelling.into())
    }

    /// Fallback tag for values whose type the dump does not spell out
    pub fn any() -> Self {
        IrType("Any".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", quote(&self.0))
    }
}

/// Basic block label, e.g. `bb3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(label: impl Into<String>) -> Self {
        BlockId(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Backtick-quote a name, escaping `\` and `` ` ``
pub fn quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        if ch == '`' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('`');
    out
}

/// Double-quote a string literal, escaping quotes, backslashes and control characters
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Whether `name` can be printed as a bare `%name` or label
pub fn is_plain_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display_is_quoted() {
        assert_eq!(IrType::new("Swift.Int").to_string(), "$`Swift.Int`");
        assert_eq!(IrType::new("a`b").to_string(), "$`a\\`b`");
    }

    #[test]
    fn test_quote_string_escapes() {
        assert_eq!(quote_string("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    }

    #[test]
    fn test_plain_identifiers() {
        assert!(is_plain_identifier("12"));
        assert!(is_plain_identifier("bb0"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("a b"));
    }
}
