//! Lossless JSONC parser.
//!
//! Grammar: JSON values plus `//` line comments, `/* */` block comments and
//! trailing commas in objects and arrays. A leading UTF-8 BOM is kept as trivia.

use super::{Document, NodeId, NodeKind};
use crate::errors::{ProjalignError, ProjalignResult};

/// Deepest nesting of objects and arrays accepted.
pub const MAX_DEPTH: usize = 128;

pub(super) fn parse_document(text: &str) -> ProjalignResult<Document> {
    let mut p = Parser {
        src: text,
        pos: 0,
        depth: 0,
        doc: Document::with_root(),
    };
    let root = p.doc.root();

    if p.src.starts_with('\u{feff}') {
        let bom = p.take('\u{feff}'.len_utf8());
        let node = p.doc.push(NodeKind::Trivia, bom, None);
        p.doc.attach(root, node);
    }

    p.trivia(root)?;
    if p.at_end() {
        return Err(p.error("document has no value"));
    }
    let value = p.value()?;
    p.doc.attach(root, value);
    p.trivia(root)?;
    if !p.at_end() {
        return Err(p.error("unexpected characters after the root value"));
    }
    Ok(p.doc)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Open objects and arrays around `pos`.
    depth: usize,
    doc: Document,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn take(&mut self, len: usize) -> String {
        let s = self.src[self.pos..self.pos + len].to_string();
        self.pos += len;
        s
    }

    fn error(&self, msg: impl Into<String>) -> ProjalignError {
        let before = &self.src[..self.pos.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |i| before[i + 1..].chars().count())
            + 1;
        ProjalignError::parse(line, column, msg)
    }

    fn leaf(&mut self, parent: NodeId, kind: NodeKind, len: usize) {
        let raw = self.take(len);
        let node = self.doc.push(kind, raw, None);
        self.doc.attach(parent, node);
    }

    /// Consume whitespace and comments, attaching them to `parent`.
    fn trivia(&mut self, parent: NodeId) -> ProjalignResult<()> {
        loop {
            let rest = self.rest();
            let ws = rest
                .bytes()
                .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
                .count();
            if ws > 0 {
                self.leaf(parent, NodeKind::Trivia, ws);
                continue;
            }
            if rest.starts_with("//") {
                let len = rest.find('\n').unwrap_or(rest.len());
                self.leaf(parent, NodeKind::Trivia, len);
                continue;
            }
            if rest.starts_with("/*") {
                let end = rest[2..]
                    .find("*/")
                    .ok_or_else(|| self.error("unterminated block comment"))?;
                self.leaf(parent, NodeKind::Trivia, end + 4);
                continue;
            }
            return Ok(());
        }
    }

    fn value(&mut self) -> ProjalignResult<NodeId> {
        match self.peek() {
            Some(b'{') => self.nested(Self::object),
            Some(b'[') => self.nested(Self::array),
            Some(b'"') => self.string(NodeKind::String),
            Some(b'-' | b'0'..=b'9') => self.number(),
            Some(b't' | b'f' | b'n') => self.literal(),
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> ProjalignResult<NodeId>) -> ProjalignResult<NodeId> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let node = parse(self);
        self.depth -= 1;
        node
    }

    fn object(&mut self) -> ProjalignResult<NodeId> {
        let obj = self.doc.push(NodeKind::Object, String::new(), None);
        self.leaf(obj, NodeKind::Punct, 1);
        loop {
            self.trivia(obj)?;
            match self.peek() {
                Some(b'}') => {
                    self.leaf(obj, NodeKind::Punct, 1);
                    return Ok(obj);
                }
                Some(b'"') => {
                    let key = self.string(NodeKind::Key)?;
                    self.doc.attach(obj, key);
                    self.trivia(obj)?;
                    if self.peek() != Some(b':') {
                        return Err(self.error("expected ':' after member name"));
                    }
                    self.leaf(obj, NodeKind::Punct, 1);
                    self.trivia(obj)?;
                    let value = self.value()?;
                    self.doc.attach(obj, value);
                    self.trivia(obj)?;
                    match self.peek() {
                        Some(b',') => self.leaf(obj, NodeKind::Punct, 1),
                        Some(b'}') => {
                            self.leaf(obj, NodeKind::Punct, 1);
                            return Ok(obj);
                        }
                        Some(_) => return Err(self.error("expected ',' or '}'")),
                        None => return Err(self.error("unterminated object")),
                    }
                }
                Some(_) => return Err(self.error("expected member name or '}'")),
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn array(&mut self) -> ProjalignResult<NodeId> {
        let arr = self.doc.push(NodeKind::Array, String::new(), None);
        self.leaf(arr, NodeKind::Punct, 1);
        loop {
            self.trivia(arr)?;
            match self.peek() {
                Some(b']') => {
                    self.leaf(arr, NodeKind::Punct, 1);
                    return Ok(arr);
                }
                Some(_) => {
                    let value = self.value()?;
                    self.doc.attach(arr, value);
                    self.trivia(arr)?;
                    match self.peek() {
                        Some(b',') => self.leaf(arr, NodeKind::Punct, 1),
                        Some(b']') => {
                            self.leaf(arr, NodeKind::Punct, 1);
                            return Ok(arr);
                        }
                        Some(_) => return Err(self.error("expected ',' or ']'")),
                        None => return Err(self.error("unterminated array")),
                    }
                }
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn string(&mut self, kind: NodeKind) -> ProjalignResult<NodeId> {
        let src = self.src;
        let start = self.pos;
        let mut decoded = String::new();
        let mut chars = src[start + 1..].char_indices();

        let end = loop {
            let Some((i, c)) = chars.next() else {
                return Err(self.error("unterminated string"));
            };
            match c {
                '"' => break start + 1 + i + 1,
                '\\' => {
                    let Some((_, esc)) = chars.next() else {
                        return Err(self.error("unterminated escape sequence"));
                    };
                    match esc {
                        '"' => decoded.push('"'),
                        '\\' => decoded.push('\\'),
                        '/' => decoded.push('/'),
                        'b' => decoded.push('\u{8}'),
                        'f' => decoded.push('\u{c}'),
                        'n' => decoded.push('\n'),
                        'r' => decoded.push('\r'),
                        't' => decoded.push('\t'),
                        'u' => {
                            let high = self.hex4(&mut chars)?;
                            let code = if (0xD800..0xDC00).contains(&high) {
                                let mut lookahead = chars.clone();
                                let low = match (lookahead.next(), lookahead.next()) {
                                    (Some((_, '\\')), Some((_, 'u'))) => {
                                        let low = self.hex4(&mut lookahead)?;
                                        (0xDC00..0xE000).contains(&low).then_some(low)
                                    }
                                    _ => None,
                                };
                                match low {
                                    Some(low) => {
                                        chars = lookahead;
                                        0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                                    }
                                    None => 0xFFFD,
                                }
                            } else {
                                high
                            };
                            decoded.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                        }
                        _ => return Err(self.error(format!("invalid escape '\\{esc}'"))),
                    }
                }
                c if (c as u32) < 0x20 => {
                    return Err(self.error("control character in string"));
                }
                c => decoded.push(c),
            }
        };

        let raw = self.take(end - start);
        Ok(self.doc.push(kind, raw, Some(decoded)))
    }

    fn hex4(&self, chars: &mut std::str::CharIndices<'_>) -> ProjalignResult<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = chars
                .next()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or_else(|| self.error("invalid \\u escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn number(&mut self) -> ProjalignResult<NodeId> {
        let bytes = self.rest().as_bytes();
        let mut i = 0;
        let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

        if bytes.first() == Some(&b'-') {
            i += 1;
        }
        let int_len = digits(i);
        if int_len == 0 {
            return Err(self.error("invalid number"));
        }
        i += int_len;
        if bytes.get(i) == Some(&b'.') {
            let frac = digits(i + 1);
            if frac == 0 {
                return Err(self.error("invalid number fraction"));
            }
            i += 1 + frac;
        }
        if matches!(bytes.get(i), Some(b'e' | b'E')) {
            i += 1;
            if matches!(bytes.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            let exp = digits(i);
            if exp == 0 {
                return Err(self.error("invalid number exponent"));
            }
            i += exp;
        }

        let raw = self.take(i);
        Ok(self.doc.push(NodeKind::Number, raw, None))
    }

    fn literal(&mut self) -> ProjalignResult<NodeId> {
        let rest = self.rest();
        let (word, kind) = if rest.starts_with("true") {
            ("true", NodeKind::Boolean)
        } else if rest.starts_with("false") {
            ("false", NodeKind::Boolean)
        } else if rest.starts_with("null") {
            ("null", NodeKind::Null)
        } else {
            return Err(self.error("expected a value"));
        };
        let next = rest.as_bytes().get(word.len()).copied();
        if next.is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(self.error("expected a value"));
        }
        let raw = self.take(word.len());
        Ok(self.doc.push(kind, raw, None))
    }
}
