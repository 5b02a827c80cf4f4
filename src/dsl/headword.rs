//! Headword variant expansion.
//!
//! A headword line may pack several search keys:
//!
//! ```text
//! run, runs (informal)   → run, run (informal), runs, runs (informal)
//! wash (up){ing}         → wash, wash (up)
//! a\(b\)                 → a(b)
//! ```
//!
//! - commas separate alternates; a parenthetical after the last alternate
//!   qualifies all of them
//! - each `(...)` group is optional, so both forms are produced
//! - `{...}` parts are "unsorted": shown in the headword, never searchable
//! - a backslash makes the next character literal
//!
//! Every exact-case variant also gets a lowercase [`KeyKind::Folded`] copy
//! when lowercasing changes it.

use super::types::models::KeyKind;

/// Optional groups expanded per alternate. Further groups stay verbatim.
pub const MAX_OPTIONAL_GROUPS: usize = 8;

/// A searchable key produced from a headword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variant {
    pub text: String,
    pub kind: KeyKind,
}

impl Variant {
    fn exact(text: String) -> Self {
        Self { text, kind: KeyKind::Exact }
    }

    /// Expands a produced variant again: the variant itself plus its folded
    /// form, if that differs. Variants are never reinterpreted as markup.
    pub fn expand(&self) -> Vec<Variant> {
        let mut variants = vec![self.clone()];
        if self.kind == KeyKind::Exact {
            let folded = fold(&self.text);
            if folded != self.text {
                variants.push(Variant { text: folded, kind: KeyKind::Folded });
            }
        }
        variants
    }
}

/// All keys of one headword line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// The headword as shown to users: whitespace normalised, case kept.
    pub display: String,
    /// Unique variants; the first is always the display form.
    pub variants: Vec<Variant>,
}

/// Case folding used for keys and queries.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Trims and collapses every whitespace run to a single space.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalises a query the same way exact-case variants are normalised.
pub fn normalize_query(query: &str) -> String {
    normalize_whitespace(query)
}

/// One character of a headword, remembering whether it was escaped.
#[derive(Debug, Clone, Copy)]
struct Symbol {
    ch: char,
    escaped: bool,
}

impl Symbol {
    fn is(&self, ch: char) -> bool {
        !self.escaped && self.ch == ch
    }
}

fn symbols(raw: &str) -> Vec<Symbol> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(Symbol { ch: next, escaped: true }),
                None => out.push(Symbol { ch, escaped: true }),
            }
        } else {
            out.push(Symbol { ch, escaped: false });
        }
    }
    out
}

/// Index of the symbol closing the group opened at `start`, honouring nesting.
fn matching(symbols: &[Symbol], start: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, symbol) in symbols.iter().enumerate().skip(start) {
        if symbol.is(open) {
            depth += 1;
        } else if symbol.is(close) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Splits on commas outside of `(...)` and `{...}`.
fn split_alternates(symbols: &[Symbol]) -> Vec<&[Symbol]> {
    let mut alternates = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, symbol) in symbols.iter().enumerate() {
        if symbol.is('(') || symbol.is('{') {
            depth += 1;
        } else if symbol.is(')') || symbol.is('}') {
            depth = (depth - 1).max(0);
        } else if depth == 0 && symbol.is(',') {
            alternates.push(&symbols[start..i]);
            start = i + 1;
        }
    }
    alternates.push(&symbols[start..]);
    alternates
}

/// Splits a trailing `(...)` group off an alternate, if it ends with one.
fn split_qualifier(symbols: &[Symbol]) -> Option<(&[Symbol], &[Symbol])> {
    let end = symbols.iter().rposition(|s| s.escaped || !s.ch.is_whitespace())?;
    if !symbols[end].is(')') {
        return None;
    }
    let mut depth = 0usize;
    for i in (0..=end).rev() {
        if symbols[i].is(')') {
            depth += 1;
        } else if symbols[i].is('(') {
            depth -= 1;
            if depth == 0 {
                let head = &symbols[..i];
                let has_head = head.iter().any(|s| s.escaped || !s.ch.is_whitespace());
                return has_head.then_some((head, &symbols[i..=end]));
            }
        }
    }
    None
}

/// Renders symbols as text, dropping `{...}` parts.
fn render(symbols: &[Symbol]) -> String {
    let mut out = String::with_capacity(symbols.len());
    let mut i = 0;
    while i < symbols.len() {
        if symbols[i].is('{')
            && let Some(end) = matching(symbols, i, '{', '}')
        {
            i = end + 1;
            continue;
        }
        out.push(symbols[i].ch);
        i += 1;
    }
    out
}

enum Part {
    Fixed(String),
    Optional(String),
}

/// Expands the optional groups of one alternate.
fn expand_alternate(symbols: &[Symbol]) -> Vec<String> {
    let mut parts = Vec::new();
    let mut fixed_start = 0;
    let mut groups = 0;
    let mut i = 0;
    while i < symbols.len() {
        if groups < MAX_OPTIONAL_GROUPS
            && symbols[i].is('(')
            && let Some(end) = matching(symbols, i, '(', ')')
        {
            parts.push(Part::Fixed(render(&symbols[fixed_start..i])));
            parts.push(Part::Optional(render(&symbols[i..=end])));
            groups += 1;
            i = end + 1;
            fixed_start = i;
            continue;
        }
        i += 1;
    }
    parts.push(Part::Fixed(render(&symbols[fixed_start..])));

    (0..1u32 << groups)
        .map(|mask| {
            let mut text = String::new();
            let mut group = 0;
            for part in &parts {
                match part {
                    Part::Fixed(fixed) => text.push_str(fixed),
                    Part::Optional(optional) => {
                        if mask & (1 << group) != 0 {
                            text.push_str(optional);
                        }
                        group += 1;
                    }
                }
            }
            normalize_whitespace(&text)
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Expands a raw headword line into its searchable variants.
///
/// The result is never empty for a non-blank headword and always starts with
/// the display form.
pub fn expand(raw: &str) -> Expansion {
    let display = normalize_whitespace(raw);
    let symbols = symbols(&display);

    let mut alternates: Vec<Vec<Symbol>> = split_alternates(&symbols).into_iter().map(<[_]>::to_vec).collect();
    let shared = match alternates.last() {
        Some(last) if alternates.len() > 1 => {
            split_qualifier(last).map(|(head, qualifier)| (head.to_vec(), qualifier.to_vec()))
        }
        _ => None,
    };
    if let Some((head, qualifier)) = shared {
        let last = alternates.len() - 1;
        alternates[last] = head;
        for alternate in &mut alternates {
            alternate.push(Symbol { ch: ' ', escaped: false });
            alternate.extend_from_slice(&qualifier);
        }
    }

    let mut exact: Vec<String> = Vec::new();
    let mut push = |text: String| {
        if !text.is_empty() && !exact.contains(&text) {
            exact.push(text);
        }
    };
    push(display.clone());
    for alternate in &alternates {
        for text in expand_alternate(alternate) {
            push(text);
        }
    }

    let mut variants: Vec<Variant> = Vec::with_capacity(exact.len() * 2);
    for text in &exact {
        variants.push(Variant::exact(text.clone()));
    }
    for text in &exact {
        let folded = fold(text);
        if !variants.iter().any(|v| v.text == folded) {
            variants.push(Variant { text: folded, kind: KeyKind::Folded });
        }
    }
    Expansion { display, variants }
}
