//! Strict parser for literal data structures embedded in log messages.
//!
//! Accepts the literal syntax most producers emit when they stringify a value:
//! JSON, and the Python-style spelling with single-quoted strings, tuples,
//! sets, and `True`/`False`/`None`. Anything else (including bare words) is
//! rejected so the caller can fall back to plain text.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest nesting of `[`, `{` and `(` accepted before a message is treated as text.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq)]
#[error("invalid literal at byte {position}: {reason}")]
pub struct LiteralError {
    pub position: usize,
    pub reason: String,
}

pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        src: input.as_bytes(),
        text: input,
        pos: 0,
        depth: 0,
    };
    parser.skip_whitespace();
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos != parser.src.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> LiteralError {
        LiteralError {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), LiteralError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(open @ (b'{' | b'[' | b'(')) => {
                if self.depth == MAX_DEPTH {
                    return Err(self.error("nesting too deep"));
                }
                self.depth += 1;
                let value = match open {
                    b'{' => self.parse_brace(),
                    b'(' => self.parse_paren(),
                    _ => {
                        self.pos += 1;
                        self.parse_sequence(b']').map(Value::Array)
                    }
                };
                self.depth -= 1;
                value
            }
            Some(b'\'' | b'"') => {
                let mut s = self.parse_string()?;
                // Adjacent string literals concatenate.
                loop {
                    let save = self.pos;
                    self.skip_whitespace();
                    if matches!(self.peek(), Some(b'\'' | b'"')) {
                        s.push_str(&self.parse_string()?);
                    } else {
                        self.pos = save;
                        break;
                    }
                }
                Ok(Value::String(s))
            }
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c as char))),
        }
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        match &self.text[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            word => {
                self.pos = start;
                Err(self.error(format!("'{}' is not a literal", word)))
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }

        let mut is_float = false;
        let mut digits = 0;
        while let Some(c) = self.peek() {
            match c {
                b'0'..=b'9' => digits += 1,
                b'_' if digits > 0 => {}
                b'.' if !is_float => is_float = true,
                _ => break,
            }
            self.pos += 1;
        }
        if digits == 0 {
            self.pos = start;
            return Err(self.error("expected digits"));
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.pos += 1;
            }
            let exp_start = self.pos;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
            if exp_start == self.pos {
                return Err(self.error("expected exponent digits"));
            }
        }

        let literal: String = self.text[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let literal = literal.strip_prefix('+').unwrap_or(&literal);

        if !is_float {
            if let Ok(n) = literal.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            if let Ok(n) = literal.parse::<u64>() {
                return Ok(Value::Number(n.into()));
            }
        }

        literal
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                position: start,
                reason: format!("invalid number '{}'", literal),
            })
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        self.pos += 1;
        let mut out = String::new();

        loop {
            let rest = &self.text[self.pos..];
            let mut chars = rest.chars();
            let c = chars.next().ok_or_else(|| self.error("unterminated string"))?;
            self.pos += c.len_utf8();

            match c {
                '\n' => return Err(self.error("newline in string")),
                '\\' => out.push(self.parse_escape()?),
                c if c as u32 == quote as u32 => return Ok(out),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> Result<char, LiteralError> {
        let c = self.peek().ok_or_else(|| self.error("unterminated escape"))?;
        self.pos += 1;
        match c {
            b'n' => Ok('\n'),
            b't' => Ok('\t'),
            b'r' => Ok('\r'),
            b'0' => Ok('\0'),
            b'\\' => Ok('\\'),
            b'\'' => Ok('\''),
            b'"' => Ok('"'),
            b'/' => Ok('/'),
            b'x' => self.parse_hex_escape(2),
            b'u' => self.parse_hex_escape(4),
            b'U' => self.parse_hex_escape(8),
            other => Err(self.error(format!("unknown escape '\\{}'", other as char))),
        }
    }

    fn parse_hex_escape(&mut self, len: usize) -> Result<char, LiteralError> {
        let digits = self
            .text
            .get(self.pos..self.pos + len)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += len;
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }

    /// Items up to `close`, allowing a trailing comma. Opening delimiter already consumed.
    fn parse_sequence(&mut self, close: u8) -> Result<Vec<Value>, LiteralError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok(items);
                }
                _ => return Err(self.error(format!("expected ',' or '{}'", close as char))),
            }
        }
    }

    /// `(x)` is just `x`; `()`, `(x,)` and `(x, y)` are tuples.
    fn parse_paren(&mut self) -> Result<Value, LiteralError> {
        self.expect(b'(')?;
        self.skip_whitespace();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(Value::Array(Vec::new()));
        }

        let first = self.parse_value()?;
        self.skip_whitespace();
        match self.peek() {
            Some(b')') => {
                self.pos += 1;
                Ok(first)
            }
            Some(b',') => {
                self.pos += 1;
                let mut items = vec![first];
                items.extend(self.parse_sequence(b')')?);
                Ok(Value::Array(items))
            }
            _ => Err(self.error("expected ',' or ')'")),
        }
    }

    /// Dicts become objects; sets become arrays.
    fn parse_brace(&mut self) -> Result<Value, LiteralError> {
        self.expect(b'{')?;
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value()?;
        self.skip_whitespace();
        if self.peek() != Some(b':') {
            let mut items = vec![first];
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    items.extend(self.parse_sequence(b'}')?);
                }
                Some(b'}') => self.pos += 1,
                _ => return Err(self.error("expected ',', ':' or '}'")),
            }
            return Ok(Value::Array(items));
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            self.expect(b':')?;
            self.skip_whitespace();
            let value = self.parse_value()?;
            map.insert(self.key_to_string(key)?, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some(b'}') {
                        self.pos += 1;
                        return Ok(Value::Object(map));
                    }
                    key = self.parse_value()?;
                    self.skip_whitespace();
                }
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn key_to_string(&self, key: Value) -> Result<String, LiteralError> {
        match key {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok("null".to_string()),
            _ => Err(self.error("mapping keys must be scalars")),
        }
    }
}
