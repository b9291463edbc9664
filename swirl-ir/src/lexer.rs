//! Line lexer for the simplified dialect
//!
//! The dialect is line-oriented, so the lexer works on one line at a time and
//! every token remembers its 1-based column for error reporting.

use swirl_common::{SourceLocation, SwirlError, SwirlResult};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `%name`
    Local(String),
    /// ``@`name` ``
    Symbol(String),
    /// ``$`spelling` ``
    Type(String),
    /// `` `text` ``
    Quoted(String),
    /// `"text"`
    Str(String),
    /// Keywords, labels and numbers
    Word(String),
    /// `:=`
    Define,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub column: u32,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+')
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.')
}

/// Tokenize one line; `location` names the file and line, its column is ignored
pub fn tokenize_line(line: &str, location: &SourceLocation) -> SwirlResult<Vec<Token>> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let error = |column: usize, message: &str| {
        SwirlError::syntax(message.to_string(), location.with_column(column as u32 + 1))
    };

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let kind = match c {
            '%' => {
                i += 1;
                let begin = i;
                while i < chars.len() && is_local_char(chars[i]) {
                    i += 1;
                }
                if i == begin {
                    return Err(error(start, "expected a value name after '%'"));
                }
                TokenKind::Local(chars[begin..i].iter().collect())
            }
            '@' | '$' => {
                if chars.get(i + 1) != Some(&'`') {
                    return Err(error(start, &format!("expected '`' after '{c}'")));
                }
                let (text, next) = read_quoted(&chars, i + 1, '`')
                    .ok_or_else(|| error(start, "unterminated quoted name"))?;
                i = next;
                if c == '@' {
                    TokenKind::Symbol(text)
                } else {
                    TokenKind::Type(text)
                }
            }
            '`' => {
                let (text, next) =
                    read_quoted(&chars, i, '`').ok_or_else(|| error(start, "unterminated quoted name"))?;
                i = next;
                TokenKind::Quoted(text)
            }
            '"' => {
                let (text, next) =
                    read_quoted(&chars, i, '"').ok_or_else(|| error(start, "unterminated string literal"))?;
                i = next;
                TokenKind::Str(text)
            }
            ':' if chars.get(i + 1) == Some(&'=') => {
                i += 2;
                TokenKind::Define
            }
            ':' | ',' | '(' | ')' | '[' | ']' | '{' | '}' | '=' | ';' | '#' => {
                i += 1;
                TokenKind::Punct(c)
            }
            c if is_word_char(c) => {
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                TokenKind::Word(chars[start..i].iter().collect())
            }
            other => return Err(error(start, &format!("unexpected character '{other}'"))),
        };

        tokens.push(Token {
            kind,
            column: start as u32 + 1,
        });
    }

    Ok(tokens)
}

/// Read a `delimiter`-enclosed run starting at `open`, decoding escapes.
/// Returns the text and the index just past the closing delimiter.
fn read_quoted(chars: &[char], open: usize, delimiter: char) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = *chars.get(i + 1)?;
                text.push(match escaped {
                    'n' if delimiter == '"' => '\n',
                    't' if delimiter == '"' => '\t',
                    'r' if delimiter == '"' => '\r',
                    '0' if delimiter == '"' => '\0',
                    other => other,
                });
                i += 2;
            }
            c if c == delimiter => return Some((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    None
}
