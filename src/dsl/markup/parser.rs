//! Stack-based parser with error recovery.
//!
//! Open tags live on a stack of frames until they are closed, explicitly or
//! by one of the recovery rules, at which point the frame is folded into a
//! finished [`TagNode`]. Nodes therefore only ever enter the tree balanced.

use log::trace;

use super::lexer::{Lexer, TokenKind};
use super::tags::{self, TagTable};
use super::{Attribute, Diagnostic, DiagnosticKind, MarkupNode, Span, TagNode};

struct Frame {
    name: String,
    attribute: Option<Attribute>,
    children: Vec<MarkupNode>,
    /// Span of the opening tag.
    span: Span,
}

impl Frame {
    fn new(name: &str, attribute: Option<Attribute>, span: Span) -> Self {
        Self {
            name: name.to_string(),
            attribute,
            children: Vec::new(),
            span,
        }
    }

    fn into_node(self) -> MarkupNode {
        MarkupNode::Tag(TagNode {
            name: self.name,
            attribute: self.attribute,
            children: self.children,
        })
    }
}

pub(crate) struct Parser<'t> {
    table: &'t TagTable,
    root: Vec<MarkupNode>,
    stack: Vec<Frame>,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    pub fn new(table: &'t TagTable) -> Self {
        Self {
            table,
            root: Vec::new(),
            stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn parse(mut self, text: &str) -> (Vec<MarkupNode>, Vec<Diagnostic>) {
        for token in Lexer::new(text) {
            let span = token.span;
            match token.kind {
                TokenKind::Text => self.push_text(span),
                TokenKind::Malformed => {
                    self.diagnose(DiagnosticKind::MalformedTag, span);
                    self.push_text(span);
                }
                TokenKind::Escaped(c) => self.push(MarkupNode::Escaped(c)),
                TokenKind::Comment { terminated } => {
                    if !terminated {
                        self.diagnose(DiagnosticKind::UnterminatedComment, span);
                    }
                    self.push(MarkupNode::Comment(span));
                }
                TokenKind::Indent => self.push(MarkupNode::Indent(span)),
                TokenKind::Newline => {
                    self.close_margin_block();
                    self.push(MarkupNode::Newline(span));
                }
                TokenKind::Open { name, attribute } => self.open(name, attribute, span),
                TokenKind::Close { name } => self.close(name, span),
            }
        }
        while let Some(frame) = self.stack.pop() {
            self.diagnose(DiagnosticKind::UnterminatedTag, frame.span);
            let node = frame.into_node();
            self.push(node);
        }
        (self.root, self.diagnostics)
    }

    fn diagnose(&mut self, kind: DiagnosticKind, span: Span) {
        trace!("Markup diagnostic {:?} at {}..{}", kind, span.start, span.end);
        self.diagnostics.push(Diagnostic { kind, span });
    }

    fn children(&mut self) -> &mut Vec<MarkupNode> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn push(&mut self, node: MarkupNode) {
        self.children().push(node);
    }

    /// Pushes text, extending the previous text node when the spans touch.
    fn push_text(&mut self, span: Span) {
        let children = self.children();
        if let Some(MarkupNode::Text(last)) = children.last_mut()
            && last.end == span.start
        {
            last.end = span.end;
            return;
        }
        children.push(MarkupNode::Text(span));
    }

    /// Pops every frame from `depth` up, folding each into its parent.
    fn unwind(&mut self, depth: usize, kind: DiagnosticKind) {
        while self.stack.len() > depth {
            let Some(frame) = self.stack.pop() else { break };
            self.diagnose(kind, frame.span);
            let node = frame.into_node();
            self.push(node);
        }
    }

    fn open(&mut self, name: &str, attribute: Option<Attribute>, span: Span) {
        if self.table.is_void(name) {
            self.push(MarkupNode::Tag(TagNode {
                name: name.to_string(),
                attribute,
                children: Vec::new(),
            }));
            return;
        }
        if tags::is_margin(name) {
            if let Some(depth) = self.margin_depth() {
                self.unwind(depth, DiagnosticKind::ImplicitClose);
            }
        } else if !self.table.is_reentrant(name)
            && let Some(depth) = self.stack.iter().rposition(|frame| frame.name == name)
        {
            self.diagnose(DiagnosticKind::ImplicitReopen, span);
            self.close_at(depth);
        }
        self.stack.push(Frame::new(name, attribute, span));
    }

    fn close(&mut self, name: &str, span: Span) {
        let target = tags::closing_name(name);
        match self
            .stack
            .iter()
            .rposition(|frame| tags::closing_name(&frame.name) == target)
        {
            Some(depth) => self.close_at(depth),
            None => self.diagnose(DiagnosticKind::StrayCloseTag, span),
        }
    }

    /// Closes the frame at `depth`. Frames opened inside it are closed first
    /// and, unless they are margin blocks, reopened afterwards.
    fn close_at(&mut self, depth: usize) {
        let mut reopen = Vec::new();
        while self.stack.len() > depth + 1 {
            let Some(frame) = self.stack.pop() else { break };
            if tags::is_margin(&frame.name) {
                self.diagnose(DiagnosticKind::ImplicitClose, frame.span);
            } else {
                reopen.push((frame.name.clone(), frame.attribute.clone(), frame.span));
            }
            let node = frame.into_node();
            self.push(node);
        }
        if let Some(frame) = self.stack.pop() {
            let node = frame.into_node();
            self.push(node);
        }
        for (name, attribute, span) in reopen.into_iter().rev() {
            self.diagnose(DiagnosticKind::ImplicitReopen, span);
            self.stack.push(Frame::new(&name, attribute, span));
        }
    }

    /// Depth of the outermost open margin block.
    fn margin_depth(&self) -> Option<usize> {
        self.stack.iter().position(|frame| tags::is_margin(&frame.name))
    }

    /// A margin block never spans a line break.
    fn close_margin_block(&mut self) {
        if let Some(depth) = self.margin_depth() {
            self.unwind(depth, DiagnosticKind::ImplicitClose);
        }
    }
}
