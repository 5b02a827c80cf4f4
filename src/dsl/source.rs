//! Byte-range-readable sources.
//!
//! The scanner and the lookup engine never assume a storage or compression
//! format: they only need "read N bytes at offset O" and "total size". Reads
//! are positioned, so one source can serve any number of concurrent lookups
//! without a shared cursor. A compressed archive (e.g. a dictzip reader) plugs
//! in by implementing [`ByteRangeSource`] over its decompressed view.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use super::types::error::{DslError, Result};

/// Storage that can serve arbitrary byte ranges.
pub trait ByteRangeSource: Send + Sync {
    /// Total size of the source in bytes.
    fn size(&self) -> u64;

    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// Implementations must fail rather than return a short read.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Reads exactly `length` bytes at `offset` into a new buffer.
    fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        check_bounds(offset, length, self.size())?;
        let mut buf = vec![0u8; length as usize];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }
}

fn check_bounds(offset: u64, length: u64, size: u64) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(DslError::OutOfBounds { offset, length, size }),
    }
}

/// A plain file read with positioned I/O.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    path: PathBuf,
    size: u64,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        debug!("Opened source {} ({} bytes)", path.display(), size);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteRangeSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len() as u64, self.size)?;
        positioned_read(&self.file, offset, buf)?;
        Ok(())
    }
}

#[cfg(unix)]
fn positioned_read(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn positioned_read(file: &File, mut offset: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::io::{Error, ErrorKind};
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => return Err(Error::new(ErrorKind::UnexpectedEof, "failed to fill whole buffer")),
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

impl ByteRangeSource for [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_bounds(offset, buf.len() as u64, self.size())?;
        let start = offset as usize;
        buf.copy_from_slice(&self[start..start + buf.len()]);
        Ok(())
    }
}

impl ByteRangeSource for Vec<u8> {
    fn size(&self) -> u64 {
        self.as_slice().size()
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.as_slice().read_exact_at(offset, buf)
    }
}

impl<T: ByteRangeSource + ?Sized> ByteRangeSource for &T {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact_at(offset, buf)
    }
}

impl<T: ByteRangeSource + ?Sized> ByteRangeSource for Arc<T> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact_at(offset, buf)
    }
}

impl<T: ByteRangeSource + ?Sized> ByteRangeSource for Box<T> {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact_at(offset, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_slice_read_range() {
        let data = b"0123456789".to_vec();
        assert_eq!(b"345".to_vec(), data.read_range(3, 3).unwrap());
        assert!(matches!(
            data.read_range(8, 5),
            Err(DslError::OutOfBounds { offset: 8, length: 5, size: 10 })
        ));
    }

    #[test]
    fn test_file_source_positioned_reads() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"headword\n\tbody line\n").unwrap();
        tmp.flush().unwrap();

        let source = Arc::new(FileSource::open(tmp.path()).unwrap());
        assert_eq!(20, source.size());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let source = Arc::clone(&source);
                std::thread::spawn(move || source.read_range(10, 4).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(b"body".to_vec(), handle.join().unwrap());
        }
    }
}
