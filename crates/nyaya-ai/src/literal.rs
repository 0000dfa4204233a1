//! Permissive parser for Python-style literal expressions.
//!
//! Models often answer with dict reprs rather than JSON: single-quoted
//! strings, `True`/`None`, tuples, trailing commas. This reads that subset
//! and produces a `serde_json::Value`. Non-string dict keys are stringified
//! the way a JSON encoder would (`1` becomes `"1"`, `None` becomes `"null"`).

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest nesting accepted before giving up.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    Eof,

    #[error("unexpected {ch:?} at byte {pos}")]
    Unexpected { ch: char, pos: usize },

    #[error("invalid number {0:?}")]
    Number(String),

    #[error("unknown name {0:?}")]
    Name(String),

    #[error("unhashable dict key at byte {0}")]
    Key(usize),

    #[error("invalid escape at byte {0}")]
    Escape(usize),

    #[error("nesting deeper than {MAX_DEPTH}")]
    TooDeep,
}

/// Parse a single literal expression occupying the whole input.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut p = Parser { src: input, pos: 0 };
    let value = p.value(0)?;
    p.skip_ws();
    match p.peek() {
        None => Ok(value),
        Some(ch) => Err(LiteralError::Unexpected { ch, pos: p.pos }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    /// Skip whitespace and `#` comments.
    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.bump();
            } else if ch == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, want: char) -> Result<(), LiteralError> {
        self.skip_ws();
        match self.bump() {
            Some(ch) if ch == want => Ok(()),
            Some(ch) => Err(LiteralError::Unexpected {
                ch,
                pos: self.pos - ch.len_utf8(),
            }),
            None => Err(LiteralError::Eof),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(LiteralError::TooDeep);
        }
        self.skip_ws();
        match self.peek() {
            None => Err(LiteralError::Eof),
            Some('{') => self.dict(depth),
            Some('[') => self.sequence(']', depth),
            Some('(') => self.sequence(')', depth),
            Some('"' | '\'') => self.strings(false),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(ch) => Err(LiteralError::Unexpected { ch, pos: self.pos }),
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key_pos = self.pos;
            let key = dict_key(self.value(depth + 1)?).ok_or(LiteralError::Key(key_pos))?;
            self.expect(':')?;
            let value = self.value(depth + 1)?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(ch) => {
                    return Err(LiteralError::Unexpected {
                        ch,
                        pos: self.pos - ch.len_utf8(),
                    });
                }
                None => return Err(LiteralError::Eof),
            }
        }
    }

    /// Lists and tuples. A parenthesised single value without a comma is
    /// just that value.
    fn sequence(&mut self, close: char, depth: usize) -> Result<Value, LiteralError> {
        let is_tuple = close == ')';
        self.bump();
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.value(depth + 1)?);
            self.skip_ws();
            match self.bump() {
                Some(',') => saw_comma = true,
                Some(ch) if ch == close => break,
                Some(ch) => {
                    return Err(LiteralError::Unexpected {
                        ch,
                        pos: self.pos - ch.len_utf8(),
                    });
                }
                None => return Err(LiteralError::Eof),
            }
        }
        if is_tuple && !saw_comma && items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    /// One or more adjacent string literals, concatenated.
    fn strings(&mut self, raw: bool) -> Result<Value, LiteralError> {
        let mut out = self.string(raw)?;
        loop {
            let save = self.pos;
            self.skip_ws();
            match self.peek() {
                Some('"' | '\'') => out.push_str(&self.string(false)?),
                Some(c) if c.is_alphabetic() => {
                    let prefix_len = self.rest().chars().take_while(|c| c.is_alphabetic()).count();
                    let prefix: String = self.rest().chars().take(prefix_len).collect();
                    let after = self.rest().chars().nth(prefix_len);
                    if is_string_prefix(&prefix) && matches!(after, Some('"' | '\'')) {
                        self.pos += prefix.len();
                        out.push_str(&self.string(prefix.to_ascii_lowercase().contains('r'))?);
                    } else {
                        self.pos = save;
                        break;
                    }
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        Ok(Value::String(out))
    }

    fn string(&mut self, raw: bool) -> Result<String, LiteralError> {
        let quote = self.bump().ok_or(LiteralError::Eof)?;
        let triple: String = std::iter::repeat_n(quote, 3).collect();
        let (long, close) = if self.rest().starts_with(&triple[1..]) {
            self.pos += 2;
            (true, triple)
        } else {
            (false, quote.to_string())
        };

        let mut out = String::new();
        loop {
            if self.rest().starts_with(&close) {
                self.pos += close.len();
                return Ok(out);
            }
            let ch = self.bump().ok_or(LiteralError::Eof)?;
            match ch {
                '\n' if !long => {
                    return Err(LiteralError::Unexpected {
                        ch,
                        pos: self.pos - 1,
                    });
                }
                '\\' if raw => {
                    out.push('\\');
                    if let Some(next) = self.bump() {
                        out.push(next);
                    }
                }
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        let start = self.pos - 1;
        let ch = self.bump().ok_or(LiteralError::Eof)?;
        match ch {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '\\' | '\'' | '"' => out.push(ch),
            '\n' => {}
            'x' => out.push(self.hex_char(2, start)?),
            'u' => out.push(self.hex_char(4, start)?),
            'U' => out.push(self.hex_char(8, start)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn hex_char(&mut self, digits: usize, start: usize) -> Result<char, LiteralError> {
        let hex: String = self.rest().chars().take(digits).collect();
        if hex.len() != digits || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LiteralError::Escape(start));
        }
        self.pos += digits;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or(LiteralError::Escape(start))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let sign_ok = matches!(c, '-' | '+') && (self.pos == start || matches!(prev, 'e' | 'E'));
            if c.is_ascii_digit() || matches!(c, '.' | '_' | 'e' | 'E') || sign_ok {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        let text = text.strip_prefix('+').unwrap_or(&text);
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Number(i.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError::Number(text.to_string()))
    }

    fn name(&mut self) -> Result<Value, LiteralError> {
        let ident: String = self
            .rest()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        let after = self.rest()[ident.len()..].chars().next();
        if is_string_prefix(&ident) && matches!(after, Some('"' | '\'')) {
            self.pos += ident.len();
            return self.strings(ident.to_ascii_lowercase().contains('r'));
        }
        self.pos += ident.len();
        match ident.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(LiteralError::Name(ident)),
        }
    }
}

fn is_string_prefix(ident: &str) -> bool {
    matches!(
        ident.to_ascii_lowercase().as_str(),
        "u" | "r" | "b" | "br" | "rb"
    )
}

fn dict_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
