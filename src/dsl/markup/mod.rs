//! DSL article markup: tokenizer, parser and the resulting tree.
//!
//! ```text
//!  \t[m1]1. [trn]покидать[/trn][/m]
//!  │  │       │
//!  │  │       └─ Tag(trn) [Text]
//!  │  └─ Tag(m1) block, closed by [/m] or at end of line
//!  └─ Indent
//! ```
//!
//! Parsing never fails. Malformed or unbalanced markup is repaired and every
//! repair is reported as a [`Diagnostic`]. Text nodes are byte spans into the
//! article text held by [`Article`], so building the tree copies no text.

mod lexer;
mod parser;
pub mod tags;

use std::fmt;
use std::sync::OnceLock;

use crate::dsl::types::models::TextEncoding;
use crate::dsl::utils;

pub use tags::TagTable;

/// Byte range into an article's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Tag attribute: `[c green]` or `[lang name="Russian"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Plain(String),
    Keyed { key: String, value: String },
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Plain(value) => write!(f, "{}", value),
            Attribute::Keyed { key, value } => write!(f, "{}=\"{}\"", key, value),
        }
    }
}

/// A matched tag pair and everything between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    pub attribute: Option<Attribute>,
    pub children: Vec<MarkupNode>,
}

impl TagNode {
    /// `true` for the margin tags `m`, `m0`..`m9`.
    pub fn is_margin(&self) -> bool {
        tags::is_margin(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(Span),
    Tag(TagNode),
    /// A character written with a backslash escape.
    Escaped(char),
    /// `{{...}}`, delimiters included. Never part of the text content.
    Comment(Span),
    /// Leading tabs and spaces of a line.
    Indent(Span),
    Newline(Span),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A tag was closed because an enclosing block ended.
    ImplicitClose,
    /// A tag was closed and opened again to keep the tree balanced.
    ImplicitReopen,
    /// A tag was still open at the end of the article.
    UnterminatedTag,
    /// A `{{` comment runs to the end of the article.
    UnterminatedComment,
    /// A `[` that does not form a tag, kept as text.
    MalformedTag,
    /// A closing tag with no matching open tag, ignored.
    StrayCloseTag,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DiagnosticKind::ImplicitClose => "tag closed implicitly",
            DiagnosticKind::ImplicitReopen => "tag reopened implicitly",
            DiagnosticKind::UnterminatedTag => "unterminated tag",
            DiagnosticKind::UnterminatedComment => "unterminated comment",
            DiagnosticKind::MalformedTag => "malformed tag",
            DiagnosticKind::StrayCloseTag => "closing tag without open tag",
        };
        f.write_str(text)
    }
}

/// A recovered markup problem. Not an error: the tree is still usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.kind, self.span.start, self.span.end)
    }
}

/// A parsed article body together with the text its spans point into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    text: String,
    nodes: Vec<MarkupNode>,
    diagnostics: Vec<Diagnostic>,
}

impl Article {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn nodes(&self) -> &[MarkupNode] {
        &self.nodes
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resolves a span of this article.
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start..span.end]
    }

    /// Re-emits the tree as DSL markup. Repaired tags come out balanced and
    /// attributes in their normalised form; everything else is verbatim.
    pub fn to_source(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        self.write_source(&self.nodes, &mut out);
        out
    }

    fn write_source(&self, nodes: &[MarkupNode], out: &mut String) {
        for node in nodes {
            match node {
                MarkupNode::Text(span)
                | MarkupNode::Comment(span)
                | MarkupNode::Indent(span)
                | MarkupNode::Newline(span) => out.push_str(self.slice(*span)),
                MarkupNode::Escaped(c) => {
                    out.push('\\');
                    out.push(*c);
                }
                MarkupNode::Tag(tag) => {
                    out.push('[');
                    out.push_str(&tag.name);
                    if let Some(attribute) = &tag.attribute {
                        out.push(' ');
                        out.push_str(&attribute.to_string());
                    }
                    out.push(']');
                    self.write_source(&tag.children, out);
                    if !tag.children.is_empty() || !tags::is_default_void(&tag.name) {
                        out.push_str("[/");
                        out.push_str(tags::closing_name(&tag.name));
                        out.push(']');
                    }
                }
            }
        }
    }

    /// Text content: tags, comments and indentation dropped, escapes resolved.
    pub fn plain_text(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        self.write_plain(&self.nodes, &mut out);
        out
    }

    fn write_plain(&self, nodes: &[MarkupNode], out: &mut String) {
        for node in nodes {
            match node {
                MarkupNode::Text(span) => out.push_str(self.slice(*span)),
                MarkupNode::Escaped(c) => out.push(*c),
                MarkupNode::Newline(_) => out.push('\n'),
                MarkupNode::Tag(tag) => self.write_plain(&tag.children, out),
                MarkupNode::Comment(_) | MarkupNode::Indent(_) => {}
            }
        }
    }
}

static DEFAULT_TABLE: OnceLock<TagTable> = OnceLock::new();

pub(crate) fn default_table() -> &'static TagTable {
    DEFAULT_TABLE.get_or_init(TagTable::default)
}

/// Parses article text with the default tag table.
pub fn parse(text: &str) -> Article {
    parse_with(text, default_table())
}

/// Decodes raw body bytes, then parses them.
pub fn parse_bytes(bytes: &[u8], encoding: TextEncoding) -> Article {
    parse_bytes_with(bytes, encoding, default_table())
}

pub fn parse_bytes_with(bytes: &[u8], encoding: TextEncoding, table: &TagTable) -> Article {
    parse_with(&utils::decode_text(bytes, encoding), table)
}

pub fn parse_with(text: &str, table: &TagTable) -> Article {
    let (nodes, diagnostics) = parser::Parser::new(table).parse(text);
    Article {
        text: text.to_string(),
        nodes,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tag(name: &str, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::Tag(TagNode {
            name: name.to_string(),
            attribute: None,
            children,
        })
    }

    fn text(start: usize, end: usize) -> MarkupNode {
        MarkupNode::Text(Span::new(start, end))
    }

    fn kinds(article: &Article) -> Vec<DiagnosticKind> {
        article.diagnostics().iter().map(|d| d.kind).collect()
    }

    #[test]
    fn test_nested_tags() {
        let article = parse("[b]bold[i]nested[/i] text[/b]");
        assert_eq!(
            &[tag("b", vec![text(3, 7), tag("i", vec![text(10, 16)]), text(20, 25)])],
            article.nodes()
        );
        assert!(article.diagnostics().is_empty());
        assert_eq!("bold nested text", article.plain_text());
    }

    #[test]
    fn test_unclosed_tag() {
        let article = parse("[b]unclosed");
        assert_eq!(&[tag("b", vec![text(3, 11)])], article.nodes());
        assert_eq!(vec![DiagnosticKind::UnterminatedTag], kinds(&article));
        assert_eq!("[b]unclosed[/b]", article.to_source());
    }

    #[test]
    fn test_margin_blocks() {
        let article = parse("\t[m1]one[/m]\n\t[m2]two\n[m1]a[m2]b[/m]");
        let nodes = article.nodes();
        assert_eq!(MarkupNode::Indent(Span::new(0, 1)), nodes[0]);
        assert_eq!(tag("m1", vec![text(5, 8)]), nodes[1]);
        assert_eq!(MarkupNode::Newline(Span::new(12, 13)), nodes[2]);
        assert_eq!(tag("m2", vec![text(18, 21)]), nodes[4]);
        assert_eq!(tag("m1", vec![text(26, 27)]), nodes[6]);
        assert_eq!(tag("m2", vec![text(31, 32)]), nodes[7]);
        assert_eq!(
            vec![DiagnosticKind::ImplicitClose, DiagnosticKind::ImplicitClose],
            kinds(&article)
        );
    }

    #[test]
    fn test_interleaved_close_reopens() {
        let article = parse("[b]x[i]y[/b]z[/i]");
        assert_eq!(
            &[
                tag("b", vec![text(3, 4), tag("i", vec![text(7, 8)])]),
                tag("i", vec![text(12, 13)]),
            ],
            article.nodes()
        );
        assert_eq!(vec![DiagnosticKind::ImplicitReopen], kinds(&article));
    }

    #[test]
    fn test_same_name_reopen_and_reentrant() {
        let article = parse("[b]a[b]c[/b]");
        assert_eq!(&[tag("b", vec![text(3, 4)]), tag("b", vec![text(7, 8)])], article.nodes());
        assert_eq!(vec![DiagnosticKind::ImplicitReopen], kinds(&article));

        let article = parse("[ex]a[ex]b[/ex][/ex]");
        assert_eq!(&[tag("ex", vec![text(4, 5), tag("ex", vec![text(9, 10)])])], article.nodes());
        assert!(article.diagnostics().is_empty());
    }

    #[test]
    fn test_escapes_comments_and_strays() {
        let article = parse("a\\[b\\] {{note}}c[/i]");
        assert_eq!("a[b] c", article.plain_text());
        assert_eq!(vec![DiagnosticKind::StrayCloseTag], kinds(&article));
        assert_eq!("a\\[b\\] {{note}}c", article.to_source());

        let article = parse("x {{open");
        assert_eq!(vec![DiagnosticKind::UnterminatedComment], kinds(&article));
        assert_eq!("x ", article.plain_text());
    }

    #[test]
    fn test_malformed_bracket_is_text() {
        let article = parse("a [b c\nd");
        assert_eq!(vec![DiagnosticKind::MalformedTag], kinds(&article));
        assert_eq!("a [b c\nd", article.plain_text());
        assert_eq!(text(0, 6), article.nodes()[0]);
    }

    #[test]
    fn test_attributes_and_void_tags() {
        let article = parse("[c green]x[/c][br][lang name=\"Russian\"]y[/lang]");
        let MarkupNode::Tag(colour) = &article.nodes()[0] else { panic!("expected tag") };
        assert_eq!(Some(Attribute::Plain("green".into())), colour.attribute);
        assert_eq!(tag("br", vec![]), article.nodes()[1]);
        assert_eq!("[c green]x[/c][br][lang name=\"Russian\"]y[/lang]", article.to_source());
    }

    #[test]
    fn test_parse_bytes_utf16() {
        let bytes: Vec<u8> = "[trn]дом[/trn]".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let article = parse_bytes(&bytes, encoding_rs::UTF_16LE);
        assert_eq!("дом", article.plain_text());
    }

    fn check_spans(article: &Article, nodes: &[MarkupNode]) {
        for node in nodes {
            match node {
                MarkupNode::Text(span)
                | MarkupNode::Comment(span)
                | MarkupNode::Indent(span)
                | MarkupNode::Newline(span) => {
                    assert!(!span.is_empty());
                    assert!(article.text().get(span.start..span.end).is_some());
                }
                MarkupNode::Tag(tag) => check_spans(article, &tag.children),
                MarkupNode::Escaped(_) => {}
            }
        }
    }

    proptest! {
        #[test]
        fn prop_parse_total_and_deterministic(input in r"[ab m1/\[\]\\{}\n\t\r]{0,40}") {
            let article = parse(&input);
            check_spans(&article, article.nodes());
            prop_assert_eq!(&article, &parse(&input));
        }

        #[test]
        fn prop_source_reparses_to_same_text(input in r"(\[/?(b|i|m1|m2|ex)\]|[xy\n]){0,30}") {
            let article = parse(&input);
            let reparsed = parse(&article.to_source());
            prop_assert_eq!(article.plain_text(), reparsed.plain_text());
            prop_assert!(reparsed
                .diagnostics()
                .iter()
                .all(|d| d.kind != DiagnosticKind::UnterminatedTag && d.kind != DiagnosticKind::StrayCloseTag));
        }
    }
}
