//! Headword index: sorted keys mapping to article body ranges.
//!
//! - [`IndexBuilder`] / [`build`]: expand headwords and sort the keys
//! - [`codec`]: the versioned binary layout
//! - [`file`]: persistence, optionally gzip-wrapped
//!
//! Keys are kept in one array sorted byte-wise; a lookup is two binary
//! searches for the bounds of the equal range.

pub mod codec;
pub mod file;

use log::{debug, info};

use super::headword;
use super::types::error::{DslError, Result};
use super::types::models::{DictionaryProperties, Entry, KeyKind};

/// One key of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: String,
    pub kind: KeyKind,
    /// Ordinal into the index's display headword table.
    pub headword: u32,
    pub offset: u64,
    pub length: u32,
}

/// An immutable, sorted headword index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    entries: Vec<IndexEntry>,
    headwords: Vec<String>,
    properties: DictionaryProperties,
}

impl Index {
    /// Assembles an index from loaded parts, rejecting inconsistent data.
    pub(crate) fn from_parts(
        entries: Vec<IndexEntry>,
        headwords: Vec<String>,
        properties: DictionaryProperties,
    ) -> std::result::Result<Self, String> {
        if let Some(pos) = entries.windows(2).position(|pair| pair[0].key > pair[1].key) {
            return Err(format!("records out of order at position {}", pos + 1));
        }
        if let Some(entry) = entries.iter().find(|e| e.headword as usize >= headwords.len()) {
            return Err(format!(
                "headword ordinal {} out of range ({} headwords)",
                entry.headword,
                headwords.len()
            ));
        }
        Ok(Self {
            entries,
            headwords,
            properties,
        })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn headwords(&self) -> &[String] {
        &self.headwords
    }

    pub fn properties(&self) -> &DictionaryProperties {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display headword of an entry.
    pub fn headword(&self, entry: &IndexEntry) -> &str {
        self.headwords
            .get(entry.headword as usize)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All entries whose key equals `key`, in index order.
    pub fn find(&self, key: &str) -> &[IndexEntry] {
        let start = self.entries.partition_point(|e| e.key.as_str() < key);
        let len = self.entries[start..].partition_point(|e| e.key == key);
        &self.entries[start..start + len]
    }
}

/// Accumulates scanned entries, then sorts them into an [`Index`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    entries: Vec<IndexEntry>,
    headwords: Vec<String>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands the entry's headword and records one key per variant.
    pub fn add(&mut self, entry: &Entry) -> Result<()> {
        let expansion = headword::expand(&entry.headword);
        if expansion.variants.is_empty() {
            return Ok(());
        }
        let length = u32::try_from(entry.length).map_err(|_| DslError::IndexOverflow {
            field: "length",
            value: entry.length,
            max: u32::MAX as u64,
        })?;
        let ordinal = u32::try_from(self.headwords.len()).map_err(|_| DslError::IndexOverflow {
            field: "headword_count",
            value: self.headwords.len() as u64,
            max: u32::MAX as u64,
        })?;
        for variant in expansion.variants {
            if variant.text.len() > u32::MAX as usize {
                return Err(DslError::IndexOverflow {
                    field: "key_length",
                    value: variant.text.len() as u64,
                    max: u32::MAX as u64,
                });
            }
            self.entries.push(IndexEntry {
                key: variant.text,
                kind: variant.kind,
                headword: ordinal,
                offset: entry.offset,
                length,
            });
        }
        self.headwords.push(expansion.display);
        Ok(())
    }

    /// Sorts the keys. Equal keys keep their insertion order.
    pub fn finish(mut self, properties: DictionaryProperties) -> Index {
        self.entries.sort_by(|a, b| a.key.cmp(&b.key));
        info!(
            "Built index: {} keys for {} headwords",
            self.entries.len(),
            self.headwords.len()
        );
        Index {
            entries: self.entries,
            headwords: self.headwords,
            properties,
        }
    }
}

/// Builds an index from scanned entries.
pub fn build<I>(entries: I, properties: DictionaryProperties) -> Result<Index>
where
    I: IntoIterator<Item = Entry>,
{
    let mut builder = IndexBuilder::new();
    for entry in entries {
        builder.add(&entry)?;
    }
    debug!("Sorting {} index keys", builder.entries.len());
    Ok(builder.finish(properties))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(headword: &str, offset: u64, length: u64) -> Entry {
        Entry {
            headword: headword.to_string(),
            offset,
            length,
        }
    }

    #[test]
    fn test_build_and_find() {
        let index = build(
            vec![
                entry("run, runs (informal)", 10, 5),
                entry("Run", 20, 6),
                entry("apple", 30, 7),
            ],
            DictionaryProperties::default(),
        )
        .unwrap();

        let hits = index.find("run");
        assert_eq!(2, hits.len());
        // Homographs stay in scan order.
        assert_eq!((KeyKind::Exact, 10), (hits[0].kind, hits[0].offset));
        assert_eq!((KeyKind::Folded, 20), (hits[1].kind, hits[1].offset));
        assert_eq!("Run", index.headword(&hits[1]));
        assert!(index.find("missing").is_empty());
        assert_eq!(3, index.headwords().len());
    }

    #[test]
    fn test_length_overflow() {
        let result = build(vec![entry("big", 0, u32::MAX as u64 + 1)], DictionaryProperties::default());
        assert!(matches!(result, Err(DslError::IndexOverflow { field: "length", .. })));
    }

    #[test]
    fn test_from_parts_rejects_unsorted() {
        let record = |key: &str| IndexEntry {
            key: key.to_string(),
            kind: KeyKind::Exact,
            headword: 0,
            offset: 0,
            length: 0,
        };
        let props = DictionaryProperties::default();
        assert!(Index::from_parts(vec![record("b"), record("a")], vec!["a".into()], props.clone()).is_err());
        assert!(Index::from_parts(vec![record("a")], vec![], props.clone()).is_err());
        assert!(Index::from_parts(vec![record("a"), record("b")], vec!["a".into()], props).is_ok());
    }

    proptest! {
        #[test]
        fn prop_index_sorted_and_complete(words in prop::collection::vec("[a-zA-Z]{1,6}( [a-z]{1,4})?", 0..40)) {
            let entries: Vec<Entry> = words
                .iter()
                .enumerate()
                .map(|(i, word)| entry(word, i as u64 * 100, 10))
                .collect();
            let index = build(entries.clone(), DictionaryProperties::default()).unwrap();
            prop_assert!(index.entries().windows(2).all(|pair| pair[0].key <= pair[1].key));
            for e in &entries {
                let hits = index.find(&e.headword);
                prop_assert!(hits.iter().any(|hit| hit.offset == e.offset && hit.kind == KeyKind::Exact));
            }
        }
    }
}
