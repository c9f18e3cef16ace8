//! Data-only decoding of KOReader's Lua sidecars.
//!
//! A sidecar is a Lua chunk ending in `return { ... }`. Instead of running an
//! interpreter, the chunk is parsed with `full_moon` and the returned
//! expression is folded into a [`LuaValue`] tree. Only literal syntax is
//! understood (tables, strings, numbers, booleans, `nil`, unary minus and
//! parentheses); anything else folds to `nil`.

use full_moon::ast::{Expression, Field, LastStmt, TableConstructor, UnOp};
use full_moon::tokenizer::{StringLiteralQuoteType, Symbol, TokenReference, TokenType};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum LuaValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    Table(LuaTable),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LuaKey {
    Index(i64),
    Name(String),
}

/// Table entries in source order. Re-assigning a key replaces the value in
/// place, assigning `nil` removes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LuaTable {
    entries: Vec<(LuaKey, LuaValue)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    Syntax(String),
    MissingReturn,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Syntax(details) => write!(f, "{}", details),
            DecodeError::MissingReturn => write!(f, "chunk does not end in a return statement"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl LuaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            LuaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&LuaTable> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }
}

impl LuaTable {
    pub fn insert(&mut self, key: LuaKey, value: LuaValue) {
        let existing = self.entries.iter().position(|(k, _)| *k == key);
        match (existing, value) {
            (Some(pos), LuaValue::Nil) => {
                self.entries.remove(pos);
            }
            (Some(pos), value) => self.entries[pos].1 = value,
            (None, LuaValue::Nil) => {}
            (None, value) => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LuaValue> {
        self.entries.iter().find_map(|(k, v)| match k {
            LuaKey::Name(n) if n == name => Some(v),
            _ => None,
        })
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(LuaValue::as_str)
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(LuaValue::as_number)
    }

    pub fn get_table(&self, name: &str) -> Option<&LuaTable> {
        self.get(name).and_then(LuaValue::as_table)
    }

    pub fn values(&self) -> impl Iterator<Item = &LuaValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode the value returned by a Lua chunk.
pub fn decode(content: &str) -> Result<LuaValue, DecodeError> {
    let ast = full_moon::parse(content).map_err(|errors| {
        DecodeError::Syntax(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    })?;

    match ast.nodes().last_stmt() {
        Some(LastStmt::Return(return_stmt)) => Ok(return_stmt
            .returns()
            .iter()
            .next()
            .map(eval)
            .unwrap_or(LuaValue::Nil)),
        _ => Err(DecodeError::MissingReturn),
    }
}

fn eval(expr: &Expression) -> LuaValue {
    match expr {
        Expression::TableConstructor(table) => LuaValue::Table(eval_table(table)),
        Expression::String(token) => string_value(token).map_or(LuaValue::Nil, LuaValue::String),
        Expression::Number(token) => number_value(token).map_or(LuaValue::Nil, LuaValue::Number),
        Expression::Symbol(token) => match token.token().token_type() {
            TokenType::Symbol {
                symbol: Symbol::True,
            } => LuaValue::Boolean(true),
            TokenType::Symbol {
                symbol: Symbol::False,
            } => LuaValue::Boolean(false),
            _ => LuaValue::Nil,
        },
        Expression::Parentheses { expression, .. } => eval(expression),
        Expression::UnaryOperator {
            unop: UnOp::Minus(_),
            expression,
        } => match eval(expression) {
            LuaValue::Number(n) => LuaValue::Number(-n),
            _ => LuaValue::Nil,
        },
        other => {
            debug!("unsupported expression treated as nil: {}", other.to_string().trim());
            LuaValue::Nil
        }
    }
}

fn eval_table(table: &TableConstructor) -> LuaTable {
    let mut out = LuaTable::default();
    let mut next_index = 1;

    for field in table.fields() {
        match field {
            Field::ExpressionKey { key, value, .. } => match table_key(eval(key)) {
                Some(key) => out.insert(key, eval(value)),
                None => debug!("skipping table field with unsupported key"),
            },
            Field::NameKey { key, value, .. } => {
                if let TokenType::Identifier { identifier } = key.token().token_type() {
                    out.insert(LuaKey::Name(identifier.to_string()), eval(value));
                }
            }
            Field::NoKey(value) => {
                out.insert(LuaKey::Index(next_index), eval(value));
                next_index += 1;
            }
            _ => {}
        }
    }

    out
}

fn table_key(value: LuaValue) -> Option<LuaKey> {
    match value {
        LuaValue::String(s) => Some(LuaKey::Name(s)),
        LuaValue::Number(n) if n.fract() == 0.0 => Some(LuaKey::Index(n as i64)),
        _ => None,
    }
}

fn string_value(token: &TokenReference) -> Option<String> {
    if let TokenType::StringLiteral {
        literal,
        quote_type,
        ..
    } = token.token().token_type()
    {
        let literal = literal.to_string();
        return Some(match quote_type {
            StringLiteralQuoteType::Brackets => long_string(&literal),
            _ => unescape(&literal),
        });
    }
    None
}

fn number_value(token: &TokenReference) -> Option<f64> {
    if let TokenType::Number { text } = token.token().token_type() {
        return parse_number(&text.to_string());
    }
    None
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    text.parse().ok()
}

// Long brackets drop a newline that directly follows the opening bracket.
fn long_string(literal: &str) -> String {
    literal
        .strip_prefix("\r\n")
        .or_else(|| literal.strip_prefix('\n'))
        .unwrap_or(literal)
        .to_string()
}

fn unescape(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' || i >= bytes.len() {
            out.push(b);
            continue;
        }

        let c = bytes[i];
        i += 1;
        match c {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' | b'"' | b'\'' => out.push(c),
            b'\n' | b'\r' => {
                out.push(b'\n');
                let pair = if c == b'\n' { b'\r' } else { b'\n' };
                if bytes.get(i) == Some(&pair) {
                    i += 1;
                }
            }
            b'x' => match raw.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok()) {
                Some(v) => {
                    out.push(v);
                    i += 2;
                }
                None => out.extend_from_slice(b"\\x"),
            },
            b'z' => {
                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
            b'0'..=b'9' => {
                let start = i - 1;
                let mut end = start;
                while end < bytes.len() && end - start < 3 && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                match raw[start..end].parse::<u16>() {
                    Ok(v) if v <= 255 => out.push(v as u8),
                    _ => out.extend_from_slice(&bytes[start - 1..end]),
                }
                i = end;
            }
            b'u' => {
                let decoded = raw.get(i..).and_then(|rest| {
                    let rest = rest.strip_prefix('{')?;
                    let close = rest.find('}')?;
                    let ch = char::from_u32(u32::from_str_radix(&rest[..close], 16).ok()?)?;
                    Some((ch, close + 2))
                });
                match decoded {
                    Some((ch, consumed)) => {
                        let mut buf = [0; 4];
                        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                        i += consumed;
                    }
                    None => out.extend_from_slice(b"\\u"),
                }
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_table(content: &str) -> LuaTable {
        match decode(content).unwrap() {
            LuaValue::Table(t) => t,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_nested_table() {
        let table = decode_table(
            r#"
-- we can read Lua syntax here!
return {
    ["stats"] = {
        ["title"] = "Test Book",
        ["pages"] = 312,
    },
    ["finished"] = true,
}
"#,
        );

        let stats = table.get_table("stats").unwrap();
        assert_eq!(stats.get_str("title"), Some("Test Book"));
        assert_eq!(stats.get_number("pages"), Some(312.0));
        assert_eq!(table.get("finished"), Some(&LuaValue::Boolean(true)));
    }

    #[test]
    fn test_decode_keeps_source_order() {
        let table = decode_table(
            r#"return { [2] = "second", [1] = "first", [3] = "third" }"#,
        );

        let values: Vec<_> = table.values().filter_map(LuaValue::as_str).collect();
        assert_eq!(values, vec!["second", "first", "third"]);
    }

    #[test]
    fn test_decode_positional_and_name_keys() {
        let table = decode_table(r#"return { "a", "b", name = "x", -4.5, nothing = nil }"#);

        assert_eq!(table.len(), 4);
        assert_eq!(table.get_str("name"), Some("x"));
        let values: Vec<_> = table.values().cloned().collect();
        assert_eq!(values[3], LuaValue::Number(-4.5));
        assert!(table.get("nothing").is_none());
    }

    #[test]
    fn test_decode_string_escapes() {
        let table = decode_table(
            r#"return { ["text"] = "line one\
line two \"quoted\" tab\there \195\164 \x41" }"#,
        );

        assert_eq!(
            table.get_str("text"),
            Some("line one\nline two \"quoted\" tab\there ä A")
        );
    }

    #[test]
    fn test_decode_long_string() {
        let table = decode_table("return { note = [[\nraw \\n text]] }");

        assert_eq!(table.get_str("note"), Some("raw \\n text"));
    }

    #[test]
    fn test_unsupported_expression_is_nil() {
        let table = decode_table(r#"return { a = os.time(), b = "kept" }"#);

        assert!(table.get("a").is_none());
        assert_eq!(table.get_str("b"), Some("kept"));
    }

    #[test]
    fn test_decode_invalid_lua() {
        let result = decode("return { this is not valid lua [[[");

        assert!(matches!(result, Err(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_decode_without_return() {
        let result = decode("local x = 1");

        assert_eq!(result, Err(DecodeError::MissingReturn));
    }

    #[test]
    fn test_parse_hex_number() {
        assert_eq!(parse_number("0x1F"), Some(31.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }
}
