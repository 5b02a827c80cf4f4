//! DSL source preamble: text encoding detection and `#` directives.
//!
//! A DSL file opens with a handful of directive lines before the first card:
//!
//! ```text
//! #NAME "Test (En-Ru)"
//! #INDEX_LANGUAGE "English"
//! #CONTENTS_LANGUAGE "Russian"
//! #SOURCE_CODE_PAGE "Cyrillic"
//! ```
//!
//! Most dictionaries are UTF-16LE with a BOM. Files without a BOM are either
//! UTF-16LE (detected by a zero high byte), an ANSI code page named by
//! `#SOURCE_CODE_PAGE`, or UTF-8.

use std::sync::OnceLock;

use encoding_rs::{UTF_8, UTF_16LE};
use log::{debug, trace};
use regex::Regex;

use crate::dsl::types::models::{DictionaryProperties, TextEncoding};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];

/// `#SOURCE_CODE_PAGE` names, in Windows code page order starting at 1250.
const CODE_PAGES: [(&str, TextEncoding); 5] = [
    ("EasternEuropean", encoding_rs::WINDOWS_1250),
    ("Cyrillic", encoding_rs::WINDOWS_1251),
    ("Latin", encoding_rs::WINDOWS_1252),
    ("Greek", encoding_rs::WINDOWS_1253),
    ("Turkish", encoding_rs::WINDOWS_1254),
];

static DIRECTIVE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn directive_regex() -> &'static Regex {
    DIRECTIVE_PATTERN.get_or_init(|| {
        Regex::new(r"^#(NAME|INDEX_LANGUAGE|CONTENTS_LANGUAGE|SOURCE_CODE_PAGE|INCLUDE)\s+(.+?)\s*$")
            .expect("Invalid directive regex pattern")
    })
}

/// Result of sniffing the first bytes of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingGuess {
    pub encoding: TextEncoding,
    /// Length of the byte order mark to skip, 0 if none.
    pub bom_len: usize,
    /// `true` when neither a BOM nor UTF-16 code units were seen, so a
    /// `#SOURCE_CODE_PAGE` directive may still select an ANSI code page.
    pub tentative: bool,
}

/// Guesses the encoding from the first bytes of a source (4 are enough).
pub fn detect_encoding(head: &[u8]) -> EncodingGuess {
    let guess = if head.starts_with(&UTF8_BOM) {
        EncodingGuess { encoding: UTF_8, bom_len: UTF8_BOM.len(), tentative: false }
    } else if head.starts_with(&UTF16LE_BOM) {
        EncodingGuess { encoding: UTF_16LE, bom_len: UTF16LE_BOM.len(), tentative: false }
    } else if head.len() >= 2 && head[0] != 0 && head[1] == 0 {
        EncodingGuess { encoding: UTF_16LE, bom_len: 0, tentative: false }
    } else {
        EncodingGuess { encoding: UTF_8, bom_len: 0, tentative: true }
    };
    debug!(
        "Detected source encoding: {} (bom={} bytes, tentative={})",
        guess.encoding.name(),
        guess.bom_len,
        guess.tentative
    );
    guess
}

/// Maps a `#SOURCE_CODE_PAGE` value to its Windows code page.
pub fn code_page_encoding(name: &str) -> Option<TextEncoding> {
    CODE_PAGES
        .iter()
        .find(|(page, _)| *page == name)
        .map(|(_, encoding)| *encoding)
}

/// Removes one pair of surrounding double quotes.
fn dequote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Applies one preamble line to `props`.
///
/// Returns `true` if the line was a recognised directive. Unrecognised `#`
/// lines are ignored by the caller just like recognised ones.
pub fn apply_directive(props: &mut DictionaryProperties, line: &str) -> bool {
    let line = line.trim_start_matches('\u{FEFF}').trim_end();
    let Some(caps) = directive_regex().captures(line) else {
        trace!("Ignoring unrecognised preamble line: {:?}", line);
        return false;
    };
    let value = dequote(&caps[2]).to_string();
    trace!("Directive #{} = {:?}", &caps[1], value);
    match &caps[1] {
        "NAME" => props.name = Some(value),
        "INDEX_LANGUAGE" => props.index_language = Some(value),
        "CONTENTS_LANGUAGE" => props.contents_language = Some(value),
        "SOURCE_CODE_PAGE" => props.code_page = Some(value),
        "INCLUDE" => props.include = Some(value),
        _ => return false,
    }
    true
}
