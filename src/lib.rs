//! # dsl-reader
//!
//! A reader for Lingvo DSL dictionary source files (`.dsl`).
//! Parses the tag-based article markup, expands headwords into searchable
//! variants and keeps a persistent binary index of body offsets so single
//! articles can be read without rescanning the dictionary.
//!
//! **Note:** compressed archives (`.dsl.dz`) are supported only through a
//! caller-provided [`ByteRangeSource`] over the decompressed bytes.
pub mod dsl;

// Re-export the main types for convenience
pub use dsl::{
    Article, ByteRangeSource, DictionaryProperties, DslError, DslReader, Entry, FileSource, Index,
    IndexFormatError, KeyKind, LookupResult, MarkupNode, ReaderOptions, Result, TagTable, build,
    deserialize, expand, load_index, lookup, parse, save_index, scan, serialize,
};
