//! Tag vocabulary of the DSL markup dialect.

use std::collections::HashSet;

/// Tag names understood by Lingvo. `m` and `m0`..`m9` are added by
/// [`TagTable::default`].
const DEFAULT_TAGS: &[&str] = &[
    "b", "i", "u", "c", "sup", "sub", "trn", "trn1", "!trs", "tr", "ex", "com", "*", "p", "'",
    "ref", "url", "s", "video", "t", "lang", "preview", "br",
];

/// Tags that may directly contain themselves.
const DEFAULT_REENTRANT: &[&str] = &["ex", "com", "*"];

/// Tags written without a closing counterpart.
const DEFAULT_VOID: &[&str] = &["br"];

/// Returns `true` for the margin tags `m` and `m0`..`m9`.
pub fn is_margin(name: &str) -> bool {
    match name.as_bytes() {
        [b'm'] => true,
        [b'm', digit] => digit.is_ascii_digit(),
        _ => false,
    }
}

/// Name used by the closing tag: every margin tag closes with `[/m]`.
pub fn closing_name(name: &str) -> &str {
    if is_margin(name) { "m" } else { name }
}

/// Void tags of the default table. Serialisation of a tree has no table at
/// hand and relies on these.
pub(crate) fn is_default_void(name: &str) -> bool {
    DEFAULT_VOID.contains(&name)
}

/// Configurable set of recognised tag names and their nesting rules.
///
/// Unknown names still parse as tags; the table only decides how they nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTable {
    known: HashSet<String>,
    reentrant: HashSet<String>,
    void: HashSet<String>,
}

impl Default for TagTable {
    fn default() -> Self {
        let margins = std::iter::once("m".to_string()).chain((0..=9).map(|level| format!("m{}", level)));
        Self {
            known: DEFAULT_TAGS.iter().map(|name| name.to_string()).chain(margins).collect(),
            reentrant: DEFAULT_REENTRANT.iter().map(|name| name.to_string()).collect(),
            void: DEFAULT_VOID.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl TagTable {
    /// A table with no recognised tags at all.
    pub fn empty() -> Self {
        Self {
            known: HashSet::new(),
            reentrant: HashSet::new(),
            void: HashSet::new(),
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>) -> Self {
        self.known.insert(name.into());
        self
    }

    /// Registers a tag that may nest inside itself.
    pub fn with_reentrant(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.known.insert(name.clone());
        self.reentrant.insert(name);
        self
    }

    /// Registers a tag that never takes a closing tag, such as `[br]`.
    pub fn with_void(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.known.insert(name.clone());
        self.void.insert(name);
        self
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    pub fn is_reentrant(&self, name: &str) -> bool {
        self.reentrant.contains(name)
    }

    pub fn is_void(&self, name: &str) -> bool {
        self.void.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_names() {
        assert!(is_margin("m"));
        assert!(is_margin("m0"));
        assert!(is_margin("m9"));
        assert!(!is_margin("m10"));
        assert!(!is_margin("mx"));
        assert_eq!("m", closing_name("m3"));
        assert_eq!("trn", closing_name("trn"));
    }

    #[test]
    fn test_default_table() {
        let table = TagTable::default();
        assert!(table.is_known("m5"));
        assert!(table.is_known("!trs"));
        assert!(table.is_reentrant("ex"));
        assert!(!table.is_reentrant("b"));
        assert!(table.is_void("br"));
        assert!(!table.is_known("blink"));

        let custom = TagTable::empty().with_reentrant("b");
        assert!(custom.is_known("b"));
        assert!(custom.is_reentrant("b"));
    }
}
