//! Index files on disk.
//!
//! A path ending in `.gz` is written gzip-wrapped. Loading sniffs the gzip
//! magic instead of trusting the extension.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info};

use super::{Index, codec};
use crate::dsl::types::error::{IndexFormatError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Writes `index` to `path`, replacing any existing file.
pub fn save_index(index: &Index, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = codec::serialize(index)?;
    let mut writer = BufWriter::new(File::create(path)?);
    if is_gzip_path(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        encoder.write_all(&bytes)?;
        writer = encoder.finish()?;
    } else {
        writer.write_all(&bytes)?;
    }
    writer.flush()?;
    info!("Saved index to {} ({} bytes uncompressed)", path.display(), bytes.len());
    Ok(())
}

/// Reads and validates the index stored at `path`.
pub fn load_index(path: impl AsRef<Path>) -> Result<Index> {
    let path = path.as_ref();
    let raw = fs::read(path)?;
    let bytes = if raw.starts_with(&GZIP_MAGIC) {
        debug!("Index file {} is gzip-compressed", path.display());
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| IndexFormatError::Corrupt(format!("gzip stream: {}", e)))?;
        decoded
    } else {
        raw
    };
    let index = codec::deserialize(&bytes)?;
    info!("Loaded index from {}: {} keys", path.display(), index.len());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::index::build;
    use crate::dsl::types::error::DslError;
    use crate::dsl::types::models::{DictionaryProperties, Entry};

    fn sample() -> Index {
        let entries = vec![Entry { headword: "Haus".into(), offset: 3, length: 9 }];
        build(entries, DictionaryProperties::default()).unwrap()
    }

    #[test]
    fn test_plain_and_gzip_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = sample();

        let plain = dir.path().join("dict.idx");
        save_index(&index, &plain).unwrap();
        assert_eq!(b"DSLI", &fs::read(&plain).unwrap()[..4]);
        assert_eq!(index, load_index(&plain).unwrap());

        let gzipped = dir.path().join("dict.idx.gz");
        save_index(&index, &gzipped).unwrap();
        assert_eq!(GZIP_MAGIC, fs::read(&gzipped).unwrap()[..2]);
        assert_eq!(index, load_index(&gzipped).unwrap());
    }

    #[test]
    fn test_broken_gzip_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gz");
        fs::write(&path, [0x1f, 0x8b, 0x08, 0x00, 0x01]).unwrap();
        assert!(load_index(&path).unwrap_err().is_index_format());
        assert!(matches!(load_index(dir.path().join("missing.idx")), Err(DslError::Io(_))));
    }
}
