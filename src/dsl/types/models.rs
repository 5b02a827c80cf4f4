//! Core data structures shared by the scanner, the index and the lookup engine.

use encoding_rs::Encoding;

/// Text encoding of a dictionary source.
pub type TextEncoding = &'static Encoding;

/// One dictionary record as discovered by the scanner.
///
/// `offset` and `length` address the body block in the *original* source
/// bytes, so the same range can later be read back through any
/// [`ByteRangeSource`](crate::dsl::source::ByteRangeSource) over that source.
/// A card with several headword lines produces one `Entry` per line, all
/// sharing one body range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Raw headword line, trimmed of its line terminator.
    pub headword: String,
    /// Absolute byte offset of the body block.
    pub offset: u64,
    /// Byte length of the body block, terminator of its last line included.
    pub length: u64,
}

/// Distinguishes exact-case index keys from their case-folded copies.
///
/// Lookups try `Exact` keys first and only fall back to folded matching
/// when nothing matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyKind {
    Exact,
    Folded,
}

impl KeyKind {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            KeyKind::Exact => 0,
            KeyKind::Folded => 1,
        }
    }
}

impl TryFrom<u8> for KeyKind {
    type Error = u8;
    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(Self::Exact),
            1 => Ok(Self::Folded),
            other => Err(other),
        }
    }
}

/// Dictionary-level metadata, taken from the `#` directives at the top of the
/// source and from encoding detection.
///
/// It is stored inside the index so that a loaded index can decode entry
/// bodies and be checked against the source it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryProperties {
    pub name: Option<String>,
    pub index_language: Option<String>,
    pub contents_language: Option<String>,
    /// Value of `#SOURCE_CODE_PAGE`, kept verbatim.
    pub code_page: Option<String>,
    /// Value of `#INCLUDE`. Recorded only; included files are not followed.
    pub include: Option<String>,
    pub encoding: TextEncoding,
    /// Size in bytes of the source the index was built from.
    pub source_size: u64,
}

impl Default for DictionaryProperties {
    fn default() -> Self {
        Self {
            name: None,
            index_language: None,
            contents_language: None,
            code_page: None,
            include: None,
            encoding: encoding_rs::UTF_8,
            source_size: 0,
        }
    }
}

impl DictionaryProperties {
    const NAME: &'static str = "name";
    const INDEX_LANGUAGE: &'static str = "index_language";
    const CONTENTS_LANGUAGE: &'static str = "contents_language";
    const CODE_PAGE: &'static str = "code_page";
    const INCLUDE: &'static str = "include";
    const ENCODING: &'static str = "encoding";
    const SOURCE_SIZE: &'static str = "source_size";

    /// Flattens the properties into ordered key/value pairs for persistence.
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let optional = [
            (Self::NAME, &self.name),
            (Self::INDEX_LANGUAGE, &self.index_language),
            (Self::CONTENTS_LANGUAGE, &self.contents_language),
            (Self::CODE_PAGE, &self.code_page),
            (Self::INCLUDE, &self.include),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }
        pairs.push((Self::ENCODING, self.encoding.name().to_string()));
        pairs.push((Self::SOURCE_SIZE, self.source_size.to_string()));
        pairs
    }

    /// Rebuilds properties from persisted pairs. Unknown keys are ignored so
    /// newer writers can add fields without breaking older readers.
    pub(crate) fn from_pairs(pairs: Vec<(String, String)>) -> std::result::Result<Self, String> {
        let mut props = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                Self::NAME => props.name = Some(value),
                Self::INDEX_LANGUAGE => props.index_language = Some(value),
                Self::CONTENTS_LANGUAGE => props.contents_language = Some(value),
                Self::CODE_PAGE => props.code_page = Some(value),
                Self::INCLUDE => props.include = Some(value),
                Self::ENCODING => {
                    props.encoding = Encoding::for_label(value.as_bytes())
                        .ok_or_else(|| format!("unknown encoding label '{}'", value))?;
                }
                Self::SOURCE_SIZE => {
                    props.source_size = value
                        .parse()
                        .map_err(|e| format!("invalid source size '{}': {}", value, e))?;
                }
                _ => {}
            }
        }
        Ok(props)
    }
}
