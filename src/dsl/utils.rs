//! Low-level text encoding utilities

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};

use super::types::models::TextEncoding;

/// Resolves an encoding label (`"utf-8"`, `"UTF-16LE"`, `"windows-1251"`, ...).
pub fn parse_encoding(label: &str) -> Option<TextEncoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Width in bytes of one code unit: 2 for UTF-16, 1 for UTF-8 and ANSI code pages.
pub fn unit_width(encoding: TextEncoding) -> usize {
    if encoding == UTF_16LE || encoding == UTF_16BE { 2 } else { 1 }
}

/// Decodes bytes without BOM sniffing; malformed sequences become U+FFFD.
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> String {
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Byte patterns of the ASCII control characters the scanner cares about,
/// expressed in the code units of one encoding.
#[derive(Debug, Clone, Copy)]
pub struct CodeUnits {
    width: usize,
    big_endian: bool,
}

impl CodeUnits {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            width: unit_width(encoding),
            big_endian: encoding == UTF_16BE,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns `true` if `unit` (exactly one code unit) encodes the ASCII byte `ascii`.
    pub fn is(&self, unit: &[u8], ascii: u8) -> bool {
        match (self.width, self.big_endian) {
            (1, _) => unit == [ascii],
            (_, false) => unit == [ascii, 0],
            (_, true) => unit == [0, ascii],
        }
    }

    pub fn is_blank(&self, unit: &[u8]) -> bool {
        self.is(unit, b' ') || self.is(unit, b'\t')
    }

    pub fn is_line_break(&self, unit: &[u8]) -> bool {
        self.is(unit, b'\n') || self.is(unit, b'\r')
    }

    /// Position just past the first line feed in `bytes`, aligned to code units.
    pub fn find_line_end(&self, bytes: &[u8]) -> Option<usize> {
        bytes
            .chunks_exact(self.width)
            .position(|unit| self.is(unit, b'\n'))
            .map(|index| (index + 1) * self.width)
    }

    /// Number of bytes of line terminator (`\n` or `\r\n`) at the end of `line`.
    pub fn terminator_len(&self, line: &[u8]) -> usize {
        let w = self.width;
        if line.len() < w || !self.is(&line[line.len() - w..], b'\n') {
            return 0;
        }
        if line.len() >= 2 * w && self.is(&line[line.len() - 2 * w..line.len() - w], b'\r') {
            2 * w
        } else {
            w
        }
    }

    /// Returns `true` if the line holds nothing but spaces, tabs and its terminator.
    pub fn is_blank_line(&self, line: &[u8]) -> bool {
        line.chunks_exact(self.width)
            .all(|unit| self.is_blank(unit) || self.is_line_break(unit))
    }

    /// Returns `true` if the line begins with the given ASCII prefix.
    pub fn starts_with_ascii(&self, line: &[u8], prefix: &[u8]) -> bool {
        let mut units = line.chunks_exact(self.width);
        prefix.iter().all(|&ascii| units.next().is_some_and(|unit| self.is(unit, ascii)))
    }
}
