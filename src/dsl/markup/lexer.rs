//! Hand-written tokenizer for DSL article text.
//!
//! Tokens never copy text: every token carries the byte span it covers, and
//! the parser resolves spans against the article text when it needs them.

use std::sync::OnceLock;

use regex::Regex;

use super::{Attribute, Span};

/// Characters that lose their special meaning after a backslash.
const ESCAPABLE: &[char] = &['[', ']', '\\', '{', '}', '~', '@', '#', '^'];

static KEYED_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

/// Matches `key=value` attributes such as `name="Russian"` or `id=1049`.
fn keyed_regex() -> &'static Regex {
    KEYED_ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"^([A-Za-z_][\w-]*)\s*=\s*"?([^"]*)"?$"#).expect("Invalid attribute regex pattern")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind<'a> {
    Text,
    Open { name: &'a str, attribute: Option<Attribute> },
    Close { name: &'a str },
    Escaped(char),
    Comment { terminated: bool },
    Indent,
    Newline,
    /// A `[` that does not start a tag; the rest of the line is lexed normally.
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

pub(crate) struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            at_line_start: true,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn token(&mut self, kind: TokenKind<'a>, len: usize) -> Token<'a> {
        let span = Span::new(self.pos, self.pos + len);
        self.pos += len;
        Token { kind, span }
    }

    fn indent(&mut self) -> Option<Token<'a>> {
        self.at_line_start = false;
        let len = self.rest().len() - self.rest().trim_start_matches([' ', '\t']).len();
        (len > 0).then(|| self.token(TokenKind::Indent, len))
    }

    fn escape(&mut self) -> Token<'a> {
        match self.rest()[1..].chars().next() {
            Some(c) if ESCAPABLE.contains(&c) => self.token(TokenKind::Escaped(c), 1 + c.len_utf8()),
            _ => self.token(TokenKind::Text, 1),
        }
    }

    fn comment(&mut self) -> Token<'a> {
        match self.rest()[2..].find("}}") {
            Some(end) => self.token(TokenKind::Comment { terminated: true }, end + 4),
            None => {
                let len = self.rest().len();
                self.token(TokenKind::Comment { terminated: false }, len)
            }
        }
    }

    fn tag(&mut self) -> Token<'a> {
        let rest = self.rest();
        let Some(end) = rest[1..].find([']', '[', '\n']).map(|i| i + 1) else {
            return self.token(TokenKind::Malformed, 1);
        };
        if rest.as_bytes()[end] != b']' {
            return self.token(TokenKind::Malformed, 1);
        }
        let content = &rest[1..end];
        let kind = if let Some(name) = content.strip_prefix('/') {
            valid_name(name).then_some(TokenKind::Close { name })
        } else {
            let (name, attribute) = match content.split_once([' ', '\t']) {
                Some((name, attribute)) => (name, parse_attribute(attribute)),
                None => (content, None),
            };
            valid_name(name).then_some(TokenKind::Open { name, attribute })
        };
        match kind {
            Some(kind) => self.token(kind, end + 1),
            None => self.token(TokenKind::Malformed, 1),
        }
    }

    fn text(&mut self) -> Token<'a> {
        let bytes = self.rest().as_bytes();
        let mut len = 1;
        while len < bytes.len() {
            match bytes[len] {
                b'\n' | b'\\' | b'[' => break,
                b'\r' if bytes.get(len + 1) == Some(&b'\n') => break,
                b'{' if bytes.get(len + 1) == Some(&b'{') => break,
                _ => len += 1,
            }
        }
        self.token(TokenKind::Text, len)
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c.is_whitespace() || c == '\\' || c == '/')
}

fn parse_attribute(raw: &str) -> Option<Attribute> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Some(match keyed_regex().captures(raw) {
        Some(caps) => Attribute::Keyed {
            key: caps[1].to_string(),
            value: caps[2].to_string(),
        },
        None => Attribute::Plain(raw.to_string()),
    })
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.at_line_start
            && let Some(indent) = self.indent()
        {
            return Some(indent);
        }
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let token = if rest.starts_with('\n') || rest.starts_with("\r\n") {
            self.at_line_start = true;
            let len = if rest.starts_with('\n') { 1 } else { 2 };
            self.token(TokenKind::Newline, len)
        } else if rest.starts_with('\\') {
            self.escape()
        } else if rest.starts_with("{{") {
            self.comment()
        } else if rest.starts_with('[') {
            self.tag()
        } else {
            self.text()
        };
        Some(token)
    }
}
