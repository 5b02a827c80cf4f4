//! Dictionary scanner: splits a DSL source into entries in one forward pass.
//!
//! ```text
//! #NAME "Sample"            ← preamble (directives, blank lines, {{comments}})
//!
//! abandon                   ← headword line(s): not indented
//!     [m1]1. [trn]...[/trn][/m]   ← body: every line starts with a tab or space
//!     [m2]...[/m]
//!                           ← blank separator
//! abandoned                 ← next card
//! ```
//!
//! Body ranges are recorded exactly as they appear in the source, including
//! each line's indentation and terminator, so they can be read back later
//! through any [`ByteRangeSource`] over the same bytes.

use std::collections::VecDeque;

use log::{debug, info, trace};

use super::header::{self, EncodingGuess};
use crate::dsl::source::ByteRangeSource;
use crate::dsl::types::error::{DslError, Result};
use crate::dsl::types::models::{DictionaryProperties, Entry, TextEncoding};
use crate::dsl::utils::{self, CodeUnits};

/// Bytes requested from the source per read.
const CHUNK_SIZE: usize = 64 * 1024;

/// Scans `source`, detecting its text encoding.
pub fn scan<S: ByteRangeSource + ?Sized>(source: &S) -> Result<Scanner<'_, S>> {
    Scanner::new(source, None)
}

/// One physical line of the source, terminator included.
#[derive(Debug)]
struct Line {
    offset: u64,
    bytes: Vec<u8>,
}

impl Line {
    fn end(&self) -> u64 {
        self.offset + self.bytes.len() as u64
    }
}

/// Buffered forward reader over a byte-range source.
struct LineReader<'a, S: ?Sized> {
    source: &'a S,
    units: CodeUnits,
    buf: Vec<u8>,
    /// Absolute offset of `buf[0]`.
    buf_offset: u64,
    /// Start of the unread part of `buf`.
    start: usize,
    /// Absolute offset of the next chunk to fetch.
    next_read: u64,
    size: u64,
}

impl<'a, S: ByteRangeSource + ?Sized> LineReader<'a, S> {
    fn new(source: &'a S, units: CodeUnits, offset: u64) -> Self {
        Self {
            source,
            units,
            buf: Vec::new(),
            buf_offset: offset,
            start: 0,
            next_read: offset,
            size: source.size(),
        }
    }

    fn next_line(&mut self) -> Result<Option<Line>> {
        loop {
            if let Some(len) = self.units.find_line_end(&self.buf[self.start..]) {
                return Ok(Some(self.take(len)));
            }
            if self.next_read >= self.size {
                let remaining = self.buf.len() - self.start;
                return Ok((remaining > 0).then(|| self.take(remaining)));
            }
            self.fill()?;
        }
    }

    fn take(&mut self, len: usize) -> Line {
        let line = Line {
            offset: self.buf_offset + self.start as u64,
            bytes: self.buf[self.start..self.start + len].to_vec(),
        };
        self.start += len;
        line
    }

    fn fill(&mut self) -> Result<()> {
        self.buf.drain(..self.start);
        self.buf_offset += self.start as u64;
        self.start = 0;

        let want = (self.size - self.next_read).min(CHUNK_SIZE as u64) as usize;
        let old_len = self.buf.len();
        self.buf.resize(old_len + want, 0);
        self.source.read_exact_at(self.next_read, &mut self.buf[old_len..])?;
        self.next_read += want as u64;
        trace!("Fetched {} bytes, scan position {}", want, self.next_read);
        Ok(())
    }
}

/// Lazy iterator over the entries of a DSL source, in source order.
///
/// The preamble is consumed when the scanner is created, so
/// [`properties`](Scanner::properties) and [`encoding`](Scanner::encoding)
/// are available before iteration starts. A structural error is yielded once
/// and ends the iteration.
pub struct Scanner<'a, S: ?Sized> {
    lines: LineReader<'a, S>,
    units: CodeUnits,
    properties: DictionaryProperties,
    lookahead: Option<Line>,
    pending: VecDeque<Entry>,
    cards: u64,
    entries: u64,
    done: bool,
}

impl<'a, S: ByteRangeSource + ?Sized> Scanner<'a, S> {
    /// Creates a scanner. An explicit `encoding` overrides detection.
    pub fn new(source: &'a S, encoding: Option<TextEncoding>) -> Result<Self> {
        let size = source.size();
        let head = source.read_range(0, size.min(4))?;
        let guess = header::detect_encoding(&head);
        let explicit = encoding.is_some();
        let encoding = encoding.unwrap_or(guess.encoding);
        let bom_len = skip_len(&guess, encoding);
        let units = CodeUnits::new(encoding);

        let mut scanner = Self {
            lines: LineReader::new(source, units, bom_len),
            units,
            properties: DictionaryProperties {
                encoding,
                source_size: size,
                ..DictionaryProperties::default()
            },
            lookahead: None,
            pending: VecDeque::new(),
            cards: 0,
            entries: 0,
            done: false,
        };
        let directives = scanner.read_preamble()?;
        scanner.apply_directives(&directives);

        let code_page = scanner
            .properties
            .code_page
            .as_deref()
            .and_then(header::code_page_encoding);
        if guess.tentative
            && !explicit
            && let Some(code_page) = code_page
            && code_page != encoding
        {
            debug!("Switching to code page {} declared by #SOURCE_CODE_PAGE", code_page.name());
            // Directive values were decoded with the guessed encoding.
            scanner.properties = DictionaryProperties {
                encoding: code_page,
                source_size: size,
                ..DictionaryProperties::default()
            };
            scanner.apply_directives(&directives);
        }
        info!(
            "Scanning DSL source: {} bytes, encoding {}, name {:?}",
            size,
            scanner.properties.encoding.name(),
            scanner.properties.name
        );
        Ok(scanner)
    }

    /// Dictionary properties collected from the preamble.
    pub fn properties(&self) -> &DictionaryProperties {
        &self.properties
    }

    pub fn encoding(&self) -> TextEncoding {
        self.properties.encoding
    }

    pub fn into_properties(self) -> DictionaryProperties {
        self.properties
    }

    /// Consumes the preamble, returning its raw directive lines.
    fn read_preamble(&mut self) -> Result<Vec<Line>> {
        let mut directives = Vec::new();
        while let Some(line) = self.lines.next_line()? {
            if self.units.is_blank_line(&line.bytes) || self.is_comment_line(&line) {
                continue;
            }
            if self.units.starts_with_ascii(&line.bytes, b"#") {
                directives.push(line);
                continue;
            }
            self.lookahead = Some(line);
            break;
        }
        Ok(directives)
    }

    fn apply_directives(&mut self, directives: &[Line]) {
        for line in directives {
            let text = self.decode_line(line);
            header::apply_directive(&mut self.properties, &text);
        }
    }

    fn next_raw_line(&mut self) -> Result<Option<Line>> {
        match self.lookahead.take() {
            Some(line) => Ok(Some(line)),
            None => self.lines.next_line(),
        }
    }

    fn is_indented(&self, line: &Line) -> bool {
        line.bytes
            .get(..self.units.width())
            .is_some_and(|unit| self.units.is_blank(unit))
    }

    fn is_comment_line(&self, line: &Line) -> bool {
        self.units.starts_with_ascii(&line.bytes, b"{{")
    }

    fn decode_line(&self, line: &Line) -> String {
        let content = &line.bytes[..line.bytes.len() - self.units.terminator_len(&line.bytes)];
        utils::decode_text(content, self.properties.encoding)
    }

    /// Reads one card: headword lines followed by the indented body.
    fn next_card(&mut self) -> Result<Option<Vec<Entry>>> {
        let first = loop {
            match self.next_raw_line()? {
                None => return Ok(None),
                Some(line) if self.units.is_blank_line(&line.bytes) => continue,
                Some(line) if self.is_comment_line(&line) => continue,
                Some(line) => break line,
            }
        };
        if self.is_indented(&first) {
            return Err(DslError::StructuralScan {
                offset: first.offset,
                message: "body line found before any headword".to_string(),
            });
        }

        let mut headwords = vec![self.decode_line(&first)];
        let mut body_start = first.end();
        let mut body_end = body_start;
        let mut in_body = false;
        let mut after_blank = false;

        while let Some(line) = self.lines.next_line()? {
            if self.units.is_blank_line(&line.bytes) {
                // Inside a body, kept only if another indented line follows.
                // After the headwords, the next non-blank line decides
                // whether the card has a body at all.
                after_blank = !in_body;
                continue;
            }
            if self.is_indented(&line) {
                if !in_body {
                    in_body = true;
                    body_start = line.offset;
                }
                body_end = line.end();
                continue;
            }
            if !in_body && !after_blank && !self.is_comment_line(&line) {
                headwords.push(self.decode_line(&line));
                body_start = line.end();
                body_end = body_start;
                continue;
            }
            self.lookahead = Some(line);
            break;
        }

        let entries: Vec<Entry> = headwords
            .into_iter()
            .map(|headword| headword.trim().to_string())
            .filter(|headword| !headword.is_empty())
            .map(|headword| Entry {
                headword,
                offset: body_start,
                length: body_end - body_start,
            })
            .collect();
        trace!(
            "Card at {}: {} headword(s), body {} bytes",
            body_start,
            entries.len(),
            body_end - body_start
        );
        Ok(Some(entries))
    }
}

/// BOM bytes to skip: only when the chosen encoding agrees with the BOM.
fn skip_len(guess: &EncodingGuess, encoding: TextEncoding) -> u64 {
    if guess.bom_len > 0 && guess.encoding == encoding {
        guess.bom_len as u64
    } else {
        0
    }
}

impl<S: ByteRangeSource + ?Sized> Iterator for Scanner<'_, S> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                self.entries += 1;
                return Some(Ok(entry));
            }
            if self.done {
                return None;
            }
            match self.next_card() {
                Ok(Some(entries)) => {
                    self.cards += 1;
                    self.pending.extend(entries);
                }
                Ok(None) => {
                    self.done = true;
                    info!("Scan complete: {} cards, {} entries", self.cards, self.entries);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &[u8]) -> Vec<Entry> {
        scan(source)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn body<'s>(source: &'s [u8], entry: &Entry) -> &'s [u8] {
        &source[entry.offset as usize..(entry.offset + entry.length) as usize]
    }

    #[test]
    fn test_empty_source() {
        assert!(collect(b"").is_empty());
        assert!(collect(b"#NAME \"Empty\"\n\n").is_empty());
    }

    #[test]
    fn test_cards_and_offsets() {
        let source = b"#NAME \"Sample\"\n\ncat\n\t[trn]a pet[/trn]\n\tsecond\n\ndog\r\n [trn]another[/trn]\r\n";
        let entries = collect(source);
        assert_eq!(2, entries.len());
        assert_eq!("cat", entries[0].headword);
        assert_eq!(b"\t[trn]a pet[/trn]\n\tsecond\n", body(source, &entries[0]));
        assert_eq!("dog", entries[1].headword);
        assert_eq!(b" [trn]another[/trn]\r\n", body(source, &entries[1]));
    }

    #[test]
    fn test_multiple_headwords_share_body() {
        let source = b"colour\ncolor\n\tpaint\n";
        let entries = collect(source);
        assert_eq!(2, entries.len());
        assert_eq!(("colour", "color"), (entries[0].headword.as_str(), entries[1].headword.as_str()));
        assert_eq!((entries[0].offset, entries[0].length), (entries[1].offset, entries[1].length));
        assert_eq!(b"\tpaint\n", body(source, &entries[1]));
    }

    #[test]
    fn test_inner_blank_lines_stay_in_body() {
        let source = b"word\n\tone\n\n\ttwo\n\n\nnext\n\tthree";
        let entries = collect(source);
        assert_eq!(b"\tone\n\n\ttwo\n", body(source, &entries[0]));
        assert_eq!(b"\tthree", body(source, &entries[1]));
    }

    #[test]
    fn test_indented_first_line_is_structural_error() {
        let mut scanner = scan(b"\n\tbody without headword\n".as_slice()).unwrap();
        assert!(matches!(scanner.next(), Some(Err(DslError::StructuralScan { offset: 1, .. }))));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_utf16le_source() {
        let text = "\u{FEFF}#NAME \"Wiki\"\r\n\r\nJapan\r\n\t[m1]日本[/m]\r\n";
        let mut source = Vec::new();
        for unit in text.encode_utf16() {
            source.extend_from_slice(&unit.to_le_bytes());
        }
        let scanner = scan(source.as_slice()).unwrap();
        assert_eq!(encoding_rs::UTF_16LE, scanner.encoding());
        assert_eq!(Some("Wiki"), scanner.properties().name.as_deref());
        let entries = scanner.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(1, entries.len());
        assert_eq!("Japan", entries[0].headword);
        let decoded = utils::decode_text(body(&source, &entries[0]), encoding_rs::UTF_16LE);
        assert_eq!("\t[m1]日本[/m]\r\n", decoded);
    }

    #[test]
    fn test_code_page_directive() {
        let source = b"#SOURCE_CODE_PAGE \"Cyrillic\"\n\ntest\n\t\xea\xee\xed\n";
        let scanner = scan(source.as_slice()).unwrap();
        assert_eq!(encoding_rs::WINDOWS_1251, scanner.encoding());
    }

    #[test]
    fn test_directives_decoded_with_code_page() {
        let text = "#NAME \"Русско-английский\"\n#INDEX_LANGUAGE \"Русский\"\n#SOURCE_CODE_PAGE \"Cyrillic\"\n\nдом\n\thouse\n";
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(text);
        let source = encoded.into_owned();
        let scanner = scan(source.as_slice()).unwrap();
        assert_eq!(encoding_rs::WINDOWS_1251, scanner.encoding());
        assert_eq!(Some("Русско-английский"), scanner.properties().name.as_deref());
        assert_eq!(Some("Русский"), scanner.properties().index_language.as_deref());
        assert_eq!(Some("Cyrillic"), scanner.properties().code_page.as_deref());
        let entries = scanner.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!("дом", entries[0].headword);
    }

    #[test]
    fn test_blank_line_between_headword_and_body() {
        let source = b"word\n\n\tbody\n\nbare\n\nnext\n\n\n\tmore\n";
        let entries = collect(source);
        let headwords: Vec<&str> = entries.iter().map(|e| e.headword.as_str()).collect();
        assert_eq!(vec!["word", "bare", "next"], headwords);
        assert_eq!(b"\tbody\n", body(source, &entries[0]));
        assert_eq!(0, entries[1].length);
        assert_eq!(b"\tmore\n", body(source, &entries[2]));
    }
}
