use std::path::{Path, PathBuf};

use log::{info, warn};

use super::format::scanner::Scanner;
use super::index::{self, Index, IndexBuilder};
use super::lookup::{self, LookupResult};
use super::markup::TagTable;
use super::source::{ByteRangeSource, FileSource};
use super::types::error::{DslError, Result};
use super::types::models::{DictionaryProperties, TextEncoding};
use super::utils;

/// Options for [`DslReader`].
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Where the index is persisted. Without a path the index is rebuilt on
    /// every open and kept in memory only.
    pub index_path: Option<PathBuf>,
    /// Text encoding label overriding detection, e.g. `"windows-1251"`.
    pub encoding: Option<String>,
    pub tag_table: TagTable,
    /// Rebuild an index whose recorded source size no longer matches. When
    /// `false` a stale index is used as is.
    pub rebuild_stale_index: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            index_path: None,
            encoding: None,
            tag_table: TagTable::default(),
            rebuild_stale_index: true,
        }
    }
}

impl ReaderOptions {
    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = Some(label.into());
        self
    }
}

/// A DSL dictionary opened for lookups.
///
/// Opening reuses a persisted index when it matches the source and otherwise
/// scans the source once to build (and, with an index path, save) a new one.
/// Lookups afterwards read only the matching article bodies.
#[derive(Debug)]
pub struct DslReader<S: ByteRangeSource = FileSource> {
    source: S,
    index: Index,
    options: ReaderOptions,
    encoding_override: Option<TextEncoding>,
}

impl DslReader<FileSource> {
    /// Opens the dictionary file at `path`.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the file cannot be read
    /// - `options.encoding` names an unknown encoding
    /// - the source is structurally malformed
    /// - an entry does not fit the index format
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening DSL dictionary: {}", path.display());
        let source = FileSource::open(path)?;
        Self::with_source(source, options)
    }
}

impl<S: ByteRangeSource> DslReader<S> {
    /// Opens a dictionary served by any byte-range source, such as the
    /// decompressed view of an archive.
    pub fn with_source(source: S, options: ReaderOptions) -> Result<Self> {
        let encoding_override = options
            .encoding
            .as_deref()
            .map(|label| utils::parse_encoding(label).ok_or_else(|| DslError::UnknownEncoding(label.to_string())))
            .transpose()?;

        let loaded = match &options.index_path {
            Some(path) => Self::load_existing(path, &source, encoding_override, options.rebuild_stale_index)?,
            None => None,
        };
        let index = match loaded {
            Some(index) => index,
            None => {
                let index = build_index(&source, encoding_override)?;
                if let Some(path) = &options.index_path {
                    index::file::save_index(&index, path)?;
                }
                index
            }
        };
        info!(
            "Dictionary ready: {:?}, {} headwords, {} keys, encoding {}",
            index.properties().name,
            index.headwords().len(),
            index.len(),
            index.properties().encoding.name()
        );
        Ok(Self {
            source,
            index,
            options,
            encoding_override,
        })
    }

    /// Loads the persisted index if it exists and is usable for `source`.
    fn load_existing(
        path: &Path,
        source: &S,
        encoding_override: Option<TextEncoding>,
        rebuild_stale: bool,
    ) -> Result<Option<Index>> {
        if !path.exists() {
            return Ok(None);
        }
        let index = match index::file::load_index(path) {
            Ok(index) => index,
            Err(e) if e.is_index_format() => {
                warn!("Discarding unreadable index {}: {}", path.display(), e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let props = index.properties();
        let size_matches = props.source_size == source.size();
        let encoding_matches = encoding_override.is_none_or(|encoding| encoding == props.encoding);
        if size_matches && encoding_matches {
            return Ok(Some(index));
        }
        if !encoding_matches || rebuild_stale {
            warn!(
                "Index {} is stale (recorded size {}, source size {}), rebuilding",
                path.display(),
                props.source_size,
                source.size()
            );
            return Ok(None);
        }
        warn!("Using stale index {} as requested", path.display());
        Ok(Some(index))
    }

    /// Looks up a headword. A miss is an empty vector.
    pub fn lookup(&self, query: &str) -> Result<Vec<LookupResult>> {
        lookup::lookup_with(&self.index, &self.source, query, &self.options.tag_table)
    }

    /// Scans the source again, yielding every entry in source order.
    pub fn entries(&self) -> Result<Scanner<'_, S>> {
        Scanner::new(&self.source, self.encoding_override)
    }

    pub fn properties(&self) -> &DictionaryProperties {
        self.index.properties()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of headwords (one per headword line of the source).
    pub fn num_entries(&self) -> usize {
        self.index.headwords().len()
    }

    /// Number of searchable keys, variants included.
    pub fn num_keys(&self) -> usize {
        self.index.len()
    }
}

/// Scans `source` once and builds its index.
pub fn build_index<S>(source: &S, encoding: Option<TextEncoding>) -> Result<Index>
where
    S: ByteRangeSource + ?Sized,
{
    let mut scanner = Scanner::new(source, encoding)?;
    let mut builder = IndexBuilder::new();
    for entry in scanner.by_ref() {
        builder.add(&entry?)?;
    }
    Ok(builder.finish(scanner.into_properties()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &[u8] = b"#NAME \"Mini\"\n\nHaus\n\t[trn]house[/trn]\n";

    #[test]
    fn test_in_memory_reader() {
        let reader = DslReader::with_source(SOURCE.to_vec(), ReaderOptions::default()).unwrap();
        assert_eq!(Some("Mini"), reader.properties().name.as_deref());
        assert_eq!(1, reader.num_entries());
        assert_eq!(2, reader.num_keys());
        let results = reader.lookup("haus").unwrap();
        assert_eq!("house\n", results[0].article.plain_text());
        assert_eq!(1, reader.entries().unwrap().count());
    }

    #[test]
    fn test_unknown_encoding_label() {
        let options = ReaderOptions::default().with_encoding("klingon-8");
        assert!(matches!(
            DslReader::with_source(SOURCE.to_vec(), options),
            Err(DslError::UnknownEncoding(_))
        ));
    }
}
