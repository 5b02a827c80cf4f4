//! Query resolution against an index and a byte-range source.

use std::collections::HashSet;

use log::{debug, trace};

use super::headword;
use super::index::{Index, IndexEntry};
use super::markup::{self, Article, TagTable};
use super::source::ByteRangeSource;
use super::types::error::Result;
use super::types::models::KeyKind;

/// One matching article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    /// Display form of the matched headword.
    pub headword: String,
    pub article: Article,
}

/// Resolves `query` to index entries without touching the source.
///
/// Exact-case keys are tried first. Only when none match is the folded query
/// compared against every key. Entries sharing a body range are reported once.
pub fn resolve<'i>(index: &'i Index, query: &str) -> Vec<&'i IndexEntry> {
    let query = headword::normalize_query(query);
    if query.is_empty() {
        return Vec::new();
    }
    let exact: Vec<&IndexEntry> = index
        .find(&query)
        .iter()
        .filter(|entry| entry.kind == KeyKind::Exact)
        .collect();
    let hits = if exact.is_empty() {
        let folded = headword::fold(&query);
        trace!("No exact match for {:?}, trying {:?}", query, folded);
        index.find(&folded).iter().collect()
    } else {
        exact
    };

    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|entry| seen.insert((entry.offset, entry.length)))
        .collect()
}

/// Looks up `query` and parses every matching article.
pub fn lookup<S>(index: &Index, source: &S, query: &str) -> Result<Vec<LookupResult>>
where
    S: ByteRangeSource + ?Sized,
{
    lookup_with(index, source, query, markup::default_table())
}

/// Like [`lookup`], with a custom tag table.
pub fn lookup_with<S>(index: &Index, source: &S, query: &str, table: &TagTable) -> Result<Vec<LookupResult>>
where
    S: ByteRangeSource + ?Sized,
{
    let encoding = index.properties().encoding;
    let results = resolve(index, query)
        .into_iter()
        .map(|entry| {
            let bytes = source.read_range(entry.offset, entry.length as u64)?;
            Ok(LookupResult {
                headword: index.headword(entry).to_string(),
                article: markup::parse_bytes_with(&bytes, encoding, table),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Lookup {:?}: {} result(s)", query, results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::format::scanner::scan;
    use crate::dsl::index::IndexBuilder;
    use crate::dsl::types::error::DslError;

    const SOURCE: &[u8] = b"#NAME \"Test\"\n\nrun, runs (informal)\n\t[trn]to move fast[/trn]\n\nRun\n\t[trn]a sequence[/trn]\n";

    fn index() -> Index {
        let scanner = scan(SOURCE).unwrap();
        let properties = scanner.properties().clone();
        let mut builder = IndexBuilder::new();
        for entry in scanner {
            builder.add(&entry.unwrap()).unwrap();
        }
        builder.finish(properties)
    }

    fn headwords(results: &[LookupResult]) -> Vec<&str> {
        results.iter().map(|r| r.headword.as_str()).collect()
    }

    #[test]
    fn test_exact_then_folded() {
        let index = index();

        let results = lookup(&index, SOURCE, "run").unwrap();
        assert_eq!(vec!["run, runs (informal)"], headwords(&results));
        assert_eq!("to move fast\n", results[0].article.plain_text());

        let results = lookup(&index, SOURCE, "Run").unwrap();
        assert_eq!(vec!["Run"], headwords(&results));

        let results = lookup(&index, SOURCE, "RUN").unwrap();
        assert_eq!(vec!["run, runs (informal)", "Run"], headwords(&results));

        let results = lookup(&index, SOURCE, "  runs   (informal) ").unwrap();
        assert_eq!(vec!["run, runs (informal)"], headwords(&results));
    }

    #[test]
    fn test_missing_key() {
        let index = index();
        assert!(lookup(&index, SOURCE, "walk").unwrap().is_empty());
        assert!(lookup(&index, SOURCE, "   ").unwrap().is_empty());
    }

    #[test]
    fn test_results_deduplicated_by_body() {
        let source: &[u8] = b"Colour\ncolour\n\t[trn]hue[/trn]\n";
        let scanner = scan(source).unwrap();
        let properties = scanner.properties().clone();
        let entries = scanner.collect::<Result<Vec<_>>>().unwrap();
        let index = crate::dsl::index::build(entries, properties).unwrap();

        // "colour" (exact, second line) and "colour" (folded, first line)
        // share one body.
        assert_eq!(2, index.find("colour").len());
        let results = lookup(&index, source, "COLOUR").unwrap();
        assert_eq!(vec!["Colour"], headwords(&results));
        assert_eq!("hue\n", results[0].article.plain_text());
    }

    #[test]
    fn test_short_source_is_error() {
        let index = index();
        let truncated = &SOURCE[..20];
        assert!(matches!(
            lookup(&index, truncated, "Run"),
            Err(DslError::OutOfBounds { .. })
        ));
    }
}
