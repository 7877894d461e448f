//! Parser for Python-style literal structures.
//!
//! Some tracking clients serialize `event_property` with Python `repr()`
//! instead of JSON: single-quoted strings, `True`/`False`/`None`, tuples.
//! This module accepts that literal subset and maps it onto
//! `serde_json::Value` (tuples and sets become arrays, non-string dict keys
//! are rendered to text).

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 128;

#[derive(Debug, Error, PartialEq)]
#[error("invalid literal at offset {offset}: {message}")]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct LiteralParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl LiteralParser {
    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LiteralError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{}'", expected))),
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let value = match self.peek() {
            Some('{') => self.parse_braces(),
            Some('[') => self.parse_sequence('[', ']').map(Value::Array),
            Some('(') => self.parse_parens(),
            Some('\'') | Some('"') => self.parse_strings(),
            Some(c) if (c == 'u' || c == 'U' || c == 'r' || c == 'R')
                && matches!(self.peek_at(1), Some('\'') | Some('"')) =>
            {
                self.parse_strings()
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                self.parse_number()
            }
            Some(c) if c.is_alphabetic() => self.parse_name(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        };
        self.depth -= 1;
        value
    }

    fn parse_name(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.error(&format!("name '{}' is not a literal", name)))
            }
        }
    }

    /// Items separated by commas, trailing comma allowed.
    fn parse_sequence(&mut self, open: char, close: char) -> Result<Vec<Value>, LiteralError> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                _ => return Err(self.error(&format!("expected ',' or '{}'", close))),
            }
        }
    }

    /// `(x)` is a parenthesized value, `(x,)` and `(x, y)` are tuples.
    fn parse_parens(&mut self) -> Result<Value, LiteralError> {
        self.expect('(')?;
        self.skip_ws();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Value::Array(Vec::new()));
        }
        let first = self.parse_value()?;
        self.skip_ws();
        match self.bump() {
            Some(')') => Ok(first),
            Some(',') => {
                let mut items = vec![first];
                loop {
                    self.skip_ws();
                    if self.peek() == Some(')') {
                        self.pos += 1;
                        return Ok(Value::Array(items));
                    }
                    items.push(self.parse_value()?);
                    self.skip_ws();
                    match self.bump() {
                        Some(',') => continue,
                        Some(')') => return Ok(Value::Array(items)),
                        _ => return Err(self.error("expected ',' or ')'")),
                    }
                }
            }
            _ => Err(self.error("expected ',' or ')'")),
        }
    }

    /// Dict or set literal.
    fn parse_braces(&mut self) -> Result<Value, LiteralError> {
        self.expect('{')?;
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Value::Object(Map::new()));
        }

        let first = self.parse_value()?;
        self.skip_ws();
        if self.peek() != Some(':') {
            // set literal
            let mut items = vec![first];
            loop {
                match self.bump() {
                    Some(',') => {}
                    Some('}') => return Ok(Value::Array(items)),
                    _ => return Err(self.error("expected ',' or '}'")),
                }
                self.skip_ws();
                if self.peek() == Some('}') {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                items.push(self.parse_value()?);
                self.skip_ws();
            }
        }

        let mut map = Map::new();
        let mut key = first;
        loop {
            self.expect(':')?;
            self.skip_ws();
            let value = self.parse_value()?;
            map.insert(self.key_text(key)?, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(Value::Object(map)),
                _ => return Err(self.error("expected ',' or '}'")),
            }
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            key = self.parse_value()?;
            self.skip_ws();
        }
    }

    fn key_text(&self, key: Value) -> Result<String, LiteralError> {
        match key {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(true) => Ok("True".to_string()),
            Value::Bool(false) => Ok("False".to_string()),
            Value::Null => Ok("None".to_string()),
            Value::Array(_) | Value::Object(_) => Err(self.error("unhashable dict key")),
        }
    }

    /// Adjacent string literals concatenate, as in Python source.
    fn parse_strings(&mut self) -> Result<Value, LiteralError> {
        let mut out = self.parse_string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            match self.peek() {
                Some('\'') | Some('"') => out.push_str(&self.parse_string()?),
                _ => {
                    self.pos = save;
                    return Ok(Value::String(out));
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let mut raw = false;
        if let Some(prefix) = self.peek() {
            if !matches!(prefix, '\'' | '"') {
                raw = matches!(prefix, 'r' | 'R');
                self.pos += 1;
            }
        }
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;
            if c == quote {
                if !triple {
                    return Ok(out);
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    return Ok(out);
                }
                out.push(c);
                continue;
            }
            if c == '\n' && !triple {
                return Err(self.error("newline in string"));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }

            let escaped = self
                .bump()
                .ok_or_else(|| self.error("unterminated string"))?;
            if raw {
                out.push('\\');
                out.push(escaped);
                continue;
            }
            match escaped {
                '\n' => {}
                '\\' => out.push('\\'),
                '\'' => out.push('\''),
                '"' => out.push('"'),
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'b' => out.push('\u{8}'),
                'f' => out.push('\u{c}'),
                'v' => out.push('\u{b}'),
                'a' => out.push('\u{7}'),
                '0' => out.push('\0'),
                'x' => out.push(self.parse_hex_escape(2)?),
                'u' => out.push(self.parse_hex_escape(4)?),
                'U' => out.push(self.parse_hex_escape(8)?),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            }
        }
    }

    fn parse_hex_escape(&mut self, digits: usize) -> Result<char, LiteralError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("truncated escape"))?;
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut text = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            self.pos += 1;
            if sign == '-' {
                text.push('-');
            }
            self.skip_ws();
        }

        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(c),
                '_' => {}
                '.' => {
                    is_float = true;
                    text.push(c);
                }
                'e' | 'E' => {
                    is_float = true;
                    text.push(c);
                    if let Some(sign @ ('-' | '+')) = self.peek_at(1) {
                        text.push(sign);
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        if !text.chars().any(|c| c.is_ascii_digit()) {
            self.pos = start;
            return Err(self.error("invalid number"));
        }

        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            if let Ok(n) = text.parse::<u64>() {
                return Ok(Value::Number(n.into()));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| {
                self.pos = start;
                self.error("invalid number")
            })
    }
}
