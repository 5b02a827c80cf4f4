//! Binary layout of a serialized index.
//!
//! All integers are little-endian.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ magic "DSLI" │ version u16 │ reserved u16 │ entry_count u64    │
//! ├──────────────────────────────────────────────────────────────┤
//! │ entry_count × key_len u32, key, kind u8, headword u32,       │
//! │               offset u64, length u32                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │ headword_count u32, headword_count × len u32, utf8           │
//! ├──────────────────────────────────────────────────────────────┤
//! │ property_count u16, property_count × key, value (len u32,    │
//! │               utf8 each)                                     │
//! ├──────────────────────────────────────────────────────────────┤
//! │ adler32 u32 of every preceding byte                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use adler2::adler32_slice;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace};

use super::{Index, IndexEntry};
use crate::dsl::types::error::{DslError, IndexFormatError, Result};
use crate::dsl::types::models::{DictionaryProperties, KeyKind};

pub const MAGIC: [u8; 4] = *b"DSLI";
pub const VERSION: u16 = 1;

const HEADER_LEN: usize = 16;
const CHECKSUM_LEN: usize = 4;
/// Smallest possible record: empty key.
const MIN_RECORD_LEN: usize = 4 + 1 + 4 + 8 + 4;

fn overflow(field: &'static str, value: usize, max: u64) -> DslError {
    DslError::IndexOverflow {
        field,
        value: value as u64,
        max,
    }
}

fn write_string(out: &mut Vec<u8>, text: &str, field: &'static str) -> Result<()> {
    let len = u32::try_from(text.len()).map_err(|_| overflow(field, text.len(), u32::MAX as u64))?;
    out.write_u32::<LittleEndian>(len)?;
    out.extend_from_slice(text.as_bytes());
    Ok(())
}

/// Serializes an index.
pub fn serialize(index: &Index) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN + index.entries.len() * (MIN_RECORD_LEN + 8));
    out.extend_from_slice(&MAGIC);
    out.write_u16::<LittleEndian>(VERSION)?;
    out.write_u16::<LittleEndian>(0)?;
    out.write_u64::<LittleEndian>(index.entries.len() as u64)?;

    for entry in &index.entries {
        write_string(&mut out, &entry.key, "key_length")?;
        out.write_u8(entry.kind.to_byte())?;
        out.write_u32::<LittleEndian>(entry.headword)?;
        out.write_u64::<LittleEndian>(entry.offset)?;
        out.write_u32::<LittleEndian>(entry.length)?;
    }

    let headword_count = u32::try_from(index.headwords.len())
        .map_err(|_| overflow("headword_count", index.headwords.len(), u32::MAX as u64))?;
    out.write_u32::<LittleEndian>(headword_count)?;
    for headword in &index.headwords {
        write_string(&mut out, headword, "headword_length")?;
    }

    let pairs = index.properties.to_pairs();
    let property_count =
        u16::try_from(pairs.len()).map_err(|_| overflow("property_count", pairs.len(), u16::MAX as u64))?;
    out.write_u16::<LittleEndian>(property_count)?;
    for (key, value) in &pairs {
        write_string(&mut out, key, "property_length")?;
        write_string(&mut out, value, "property_length")?;
    }

    let checksum = adler32_slice(&out);
    out.write_u32::<LittleEndian>(checksum)?;
    debug!(
        "Serialized index: {} records, {} headwords, {} bytes, checksum {:#010x}",
        index.entries.len(),
        index.headwords.len(),
        out.len(),
        checksum
    );
    Ok(out)
}

/// Cursor over the checksummed body.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn u8(&mut self, context: &'static str) -> Result<u8> {
        self.bytes.read_u8().map_err(|_| truncated(context))
    }

    fn u16(&mut self, context: &'static str) -> Result<u16> {
        self.bytes.read_u16::<LittleEndian>().map_err(|_| truncated(context))
    }

    fn u32(&mut self, context: &'static str) -> Result<u32> {
        self.bytes.read_u32::<LittleEndian>().map_err(|_| truncated(context))
    }

    fn u64(&mut self, context: &'static str) -> Result<u64> {
        self.bytes.read_u64::<LittleEndian>().map_err(|_| truncated(context))
    }

    fn string(&mut self, context: &'static str) -> Result<String> {
        let len = self.u32(context)? as usize;
        if self.bytes.len() < len {
            return Err(truncated(context));
        }
        let (text, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        String::from_utf8(text.to_vec())
            .map_err(|e| corrupt(format!("invalid UTF-8 in {}: {}", context, e)))
    }
}

fn truncated(context: &'static str) -> DslError {
    IndexFormatError::Truncated { context }.into()
}

fn corrupt(message: String) -> DslError {
    IndexFormatError::Corrupt(message).into()
}

/// Deserializes and validates an index.
pub fn deserialize(bytes: &[u8]) -> Result<Index> {
    if bytes.len() < MAGIC.len() {
        return Err(truncated("magic"));
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    if magic != MAGIC {
        return Err(IndexFormatError::BadMagic(magic).into());
    }
    if bytes.len() < HEADER_LEN {
        return Err(truncated("header"));
    }
    let version = (&bytes[4..6]).read_u16::<LittleEndian>()?;
    if version != VERSION {
        return Err(IndexFormatError::UnsupportedVersion {
            found: version,
            supported: VERSION,
        }
        .into());
    }
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(truncated("checksum"));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let expected = (&trailer[..]).read_u32::<LittleEndian>()?;
    let actual = adler32_slice(body);
    trace!("Index checksum: expected={:#010x}, actual={:#010x}", expected, actual);
    if expected != actual {
        return Err(IndexFormatError::ChecksumMismatch { expected, actual }.into());
    }

    let mut reader = Reader {
        bytes: &body[8..],
    };
    let entry_count = reader.u64("entry count")?;
    let capacity = (entry_count as usize).min(reader.bytes.len() / MIN_RECORD_LEN);
    let mut entries = Vec::with_capacity(capacity);
    for _ in 0..entry_count {
        let key = reader.string("record key")?;
        let kind_byte = reader.u8("record kind")?;
        let kind = KeyKind::try_from(kind_byte).map_err(|b| corrupt(format!("unknown key kind {}", b)))?;
        entries.push(IndexEntry {
            key,
            kind,
            headword: reader.u32("record headword")?,
            offset: reader.u64("record offset")?,
            length: reader.u32("record length")?,
        });
    }

    let headword_count = reader.u32("headword count")?;
    let mut headwords = Vec::with_capacity((headword_count as usize).min(reader.bytes.len() / 4));
    for _ in 0..headword_count {
        headwords.push(reader.string("headword")?);
    }

    let property_count = reader.u16("property count")?;
    let mut pairs = Vec::with_capacity(property_count as usize);
    for _ in 0..property_count {
        let key = reader.string("property key")?;
        let value = reader.string("property value")?;
        pairs.push((key, value));
    }
    if !reader.bytes.is_empty() {
        return Err(corrupt(format!("{} trailing bytes", reader.bytes.len())));
    }

    let properties = DictionaryProperties::from_pairs(pairs).map_err(corrupt)?;
    let index = Index::from_parts(entries, headwords, properties).map_err(corrupt)?;
    debug!("Deserialized index: {} records", index.len());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::index::build;
    use crate::dsl::types::models::Entry;
    use proptest::prelude::*;

    fn sample() -> Index {
        let properties = DictionaryProperties {
            name: Some("Sample (En-Ru)".into()),
            index_language: Some("English".into()),
            encoding: encoding_rs::UTF_16LE,
            source_size: 4096,
            ..DictionaryProperties::default()
        };
        let entries = vec![
            Entry { headword: "Run".into(), offset: 40, length: 12 },
            Entry { headword: "abandon".into(), offset: 80, length: 30 },
        ];
        build(entries, properties).unwrap()
    }

    fn format_error(bytes: &[u8]) -> IndexFormatError {
        match deserialize(bytes) {
            Err(DslError::IndexFormat(e)) => e,
            other => panic!("expected an index format error, got {:?}", other),
        }
    }

    #[test]
    fn test_round_trip() {
        let index = sample();
        let bytes = serialize(&index).unwrap();
        assert_eq!(b"DSLI", &bytes[..4]);
        assert_eq!(index, deserialize(&bytes).unwrap());
    }

    #[test]
    fn test_rejects_damaged_input() {
        let bytes = serialize(&sample()).unwrap();

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert_eq!(IndexFormatError::BadMagic(*b"XSLI"), format_error(&bad_magic));

        let mut bad_version = bytes.clone();
        bad_version[4] = 9;
        assert_eq!(
            IndexFormatError::UnsupportedVersion { found: 9, supported: 1 },
            format_error(&bad_version)
        );

        let mut flipped = bytes.clone();
        flipped[20] ^= 0xFF;
        assert!(matches!(format_error(&flipped), IndexFormatError::ChecksumMismatch { .. }));

        assert_eq!(IndexFormatError::Truncated { context: "header" }, format_error(&bytes[..10]));
    }

    #[test]
    fn test_rejects_valid_checksum_with_bad_kind() {
        let mut bytes = serialize(&sample()).unwrap();
        // First record: key_len(4) + "Run"(3) → kind byte at 16 + 7.
        bytes[HEADER_LEN + 7] = 7;
        let body_len = bytes.len() - CHECKSUM_LEN;
        let checksum = adler32_slice(&bytes[..body_len]);
        bytes[body_len..].copy_from_slice(&checksum.to_le_bytes());
        assert!(matches!(format_error(&bytes), IndexFormatError::Corrupt(_)));
    }

    proptest! {
        #[test]
        fn prop_round_trip(words in prop::collection::vec("[a-zA-Zа-я ,()]{1,12}", 0..30)) {
            let entries: Vec<Entry> = words
                .into_iter()
                .enumerate()
                .map(|(i, headword)| Entry { headword, offset: i as u64 * 7, length: i as u64 })
                .collect();
            let index = build(entries, DictionaryProperties::default()).unwrap();
            let bytes = serialize(&index).unwrap();
            prop_assert_eq!(&index, &deserialize(&bytes).unwrap());
        }
    }
}
