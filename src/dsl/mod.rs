//! Core DSL dictionary module

pub mod format;
pub mod headword;
pub mod index;
pub mod lookup;
pub mod markup;
pub mod reader;
pub mod source;
pub mod types;
pub mod utils;

pub use format::scanner::{Scanner, scan};
pub use headword::{Expansion, Variant, expand, normalize_query};
pub use index::codec::{deserialize, serialize};
pub use index::file::{load_index, save_index};
pub use index::{Index, IndexBuilder, IndexEntry, build};
pub use lookup::{LookupResult, lookup};
pub use markup::{Article, Diagnostic, DiagnosticKind, MarkupNode, TagNode, TagTable, parse};
pub use reader::{DslReader, ReaderOptions};
pub use source::{ByteRangeSource, FileSource};
pub use types::error::{DslError, IndexFormatError, Result};
pub use types::models::{DictionaryProperties, Entry, KeyKind};
