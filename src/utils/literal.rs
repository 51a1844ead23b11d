//! Relaxed literal parser
//!
//! Parses JavaScript-style object and array literals as authors write them in
//! documents, into `serde_json::Value`. This is a data parser only: nothing is
//! ever evaluated. Accepted on top of strict JSON:
//!
//! - unquoted identifier keys (`{pointSize: 3}`)
//! - single-quoted strings and `\xNN` / `\v` / `\0` escapes
//! - trailing commas in objects and arrays
//! - `//` and `/* */` comments
//! - leading `+`, leading/trailing `.` and hex numbers
//! - `undefined`, `NaN` and `Infinity`, which become `null` since JSON has no
//!   representation for them
//!
//! ```rust
//! use dviz::utils::literal::parse_literal;
//! use serde_json::json;
//!
//! let value = parse_literal("{legend: 'none', colors: ['#555', '#999',]}").unwrap();
//! assert_eq!(value, json!({"legend": "none", "colors": ["#555", "#999"]}));
//! ```

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Maximum nesting of objects and arrays, matching `serde_json`
const MAX_NESTING_DEPTH: usize = 128;

/// Literal syntax error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct LiteralError {
    pub message: String,
    /// Byte offset into the input
    pub offset: usize,
}

impl LiteralError {
    fn new(message: impl Into<String>, offset: usize) -> Self {
        LiteralError {
            message: message.into(),
            offset,
        }
    }
}

/// Parse a complete literal; trailing non-whitespace is an error
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser::new(input);
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.pos < parser.src.len() {
        return Err(LiteralError::new("unexpected trailing input", parser.pos));
    }
    Ok(value)
}

/// Parse a literal that must be an object
pub fn parse_object_literal(input: &str) -> Result<Map<String, Value>, LiteralError> {
    match parse_literal(input)? {
        Value::Object(map) => Ok(map),
        _ => Err(LiteralError::new("expected an object literal", 0)),
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        LiteralParser {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, LiteralError>,
    ) -> Result<Value, LiteralError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(LiteralError::new("nesting too deep", self.pos));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            let rest = self.rest();
            if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                self.pos += c.len_utf8();
            } else if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return Err(LiteralError::new("unterminated comment", self.pos)),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia()?;
        match self.peek() {
            None => Err(LiteralError::new("unexpected end of input", self.pos)),
            Some('{') => self.nested(Self::parse_object),
            Some('[') => self.nested(Self::parse_array),
            Some(q @ ('"' | '\'')) => self.parse_string(q).map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let start = self.pos;
                let ident = self.parse_ident();
                match ident.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" | "NaN" | "Infinity" => Ok(Value::Null),
                    other => Err(LiteralError::new(
                        format!("unexpected identifier '{}'", other),
                        start,
                    )),
                }
            }
            Some(c) => Err(LiteralError::new(
                format!("unexpected character '{}'", c),
                self.pos,
            )),
        }
    }

    fn parse_object(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            if self.eat('}') {
                return Ok(Value::Object(map));
            }

            let key = match self.peek() {
                Some(q @ ('"' | '\'')) => self.parse_string(q)?,
                Some(c) if is_ident_start(c) => self.parse_ident(),
                Some(c) if c.is_ascii_digit() => match self.parse_number()? {
                    Value::Number(n) => n.to_string(),
                    _ => return Err(LiteralError::new("invalid numeric key", self.pos)),
                },
                Some(c) => {
                    return Err(LiteralError::new(
                        format!("expected property name, found '{}'", c),
                        self.pos,
                    ))
                }
                None => return Err(LiteralError::new("unterminated object", self.pos)),
            };

            self.skip_trivia()?;
            if !self.eat(':') {
                return Err(LiteralError::new("expected ':' after property name", self.pos));
            }
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            return Err(LiteralError::new("expected ',' or '}'", self.pos));
        }
    }

    fn parse_array(&mut self) -> Result<Value, LiteralError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            return Err(LiteralError::new("expected ',' or ']'", self.pos));
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LiteralError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(LiteralError::new("unterminated string", start)),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escape_at = self.pos;
                    match self.bump() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('b') => out.push('\u{8}'),
                        Some('f') => out.push('\u{c}'),
                        Some('v') => out.push('\u{b}'),
                        Some('0') => out.push('\0'),
                        Some('x') => out.push(self.parse_hex_escape(2, escape_at)?),
                        Some('u') => out.push(self.parse_hex_escape(4, escape_at)?),
                        // Line continuation
                        Some('\n') => {}
                        Some(other) => out.push(other),
                        None => return Err(LiteralError::new("unterminated string", start)),
                    }
                }
                Some('\n') => return Err(LiteralError::new("newline in string", self.pos - 1)),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_hex_escape(&mut self, digits: usize, at: usize) -> Result<char, LiteralError> {
        let hex = self
            .rest()
            .get(..digits)
            .ok_or_else(|| LiteralError::new("truncated escape", at))?;
        let code =
            u32::from_str_radix(hex, 16).map_err(|_| LiteralError::new("invalid escape", at))?;
        self.pos += digits;
        char::from_u32(code).ok_or_else(|| LiteralError::new("invalid code point", at))
    }

    fn parse_ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.rest().starts_with("Infinity") {
            self.pos += "Infinity".len();
            return Ok(Value::Null);
        }

        if self.rest().starts_with("0x") || self.rest().starts_with("0X") {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let value = i64::from_str_radix(&self.src[digits_start..self.pos], 16)
                .map_err(|_| LiteralError::new("invalid hex number", start))?;
            return Ok(Value::from(if negative { -value } else { value }));
        }

        let digits_start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        let text = &self.src[digits_start..self.pos];
        if text.is_empty() || text == "." {
            return Err(LiteralError::new("invalid number", start));
        }

        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from(if negative { -n } else { n }));
            }
        }

        let n: f64 = text
            .parse()
            .map_err(|_| LiteralError::new("invalid number", start))?;
        let n = if negative { -n } else { n };
        Ok(Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_strict_json() {
        let value = parse_literal(r#"{"a": [1, 2.5, -3], "b": null, "c": true}"#).unwrap();
        assert_eq!(value, json!({"a": [1, 2.5, -3], "b": null, "c": true}));
    }

    #[test]
    fn test_relaxed_object() {
        let value = parse_literal(
            "{
                pointSize: 5, // marker size
                hAxis: {title: 'Age'},
                'chart-area': {left: 0, width: '100%',},
            }",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "pointSize": 5,
                "hAxis": {"title": "Age"},
                "chart-area": {"left": 0, "width": "100%"}
            })
        );
    }

    #[test]
    fn test_nested_arrays() {
        let value = parse_literal("[['x', 'y'], [1, .5], [+2, 3e2], [0x10, -Infinity]]").unwrap();
        assert_eq!(
            value,
            json!([["x", "y"], [1, 0.5], [2, 300.0], [16, null]])
        );
    }

    #[test]
    fn test_string_escapes() {
        let value = parse_literal(r#"'it\'s \x41B "q"'"#).unwrap();
        assert_eq!(value, json!("it's AB \"q\""));
    }

    #[test]
    fn test_errors_carry_offsets() {
        let err = parse_literal("{a: }").unwrap_err();
        assert_eq!(err.offset, 4);

        let err = parse_literal("[1, 2").unwrap_err();
        assert!(err.message.contains("expected"));

        let err = parse_literal("alert('x')").unwrap_err();
        assert!(err.message.contains("alert"));

        assert!(parse_literal("{a: 1} extra").is_err());
        assert!(parse_literal("'open").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let ok = format!("{}{}", "[".repeat(MAX_NESTING_DEPTH), "]".repeat(MAX_NESTING_DEPTH));
        assert!(parse_literal(&ok).is_ok());

        let err = parse_literal(&"[".repeat(20_000)).unwrap_err();
        assert_eq!(err.message, "nesting too deep");
        assert_eq!(err.offset, MAX_NESTING_DEPTH);

        let err = parse_object_literal(&format!("{{a: {}", "{b: ".repeat(10_000))).unwrap_err();
        assert_eq!(err.message, "nesting too deep");
    }

    #[test]
    fn test_object_required() {
        assert!(parse_object_literal("{}").unwrap().is_empty());
        assert!(parse_object_literal("[1]").is_err());
    }
}
