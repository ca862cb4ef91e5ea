//! Blocking positional file I/O.
//!
//! The storage core is single-threaded; every call here is a plain blocking
//! filesystem operation against one exclusively owned handle.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A read/write file accessed by absolute offset.
#[derive(Debug)]
pub struct DataFile {
    file: File,
    path: PathBuf,
}

impl DataFile {
    /// Opens the file at `path` for reading and writing, creating it if it
    /// does not exist.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        Ok(Self { file, path })
    }

    /// Returns the file path.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current file size in bytes.
    pub fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read, which is short only when the read
    /// crosses end-of-file. `buf` is not touched past the returned length.
    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut read = 0;
        while read < buf.len() {
            match self.file.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(read)
    }

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    pub fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }

    /// Writes all of `buf` starting at `offset`.
    pub fn write_all_at(&mut self, buf: &[u8], offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)
    }

    /// Truncates or extends the file to `size` bytes.
    pub fn set_len(&mut self, size: u64) -> io::Result<()> {
        self.file.set_len(size)
    }

    /// Flushes file data and metadata to stable storage.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_open_creates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f.db");

        let file = DataFile::open(&path).unwrap();
        assert_eq!(file.path(), path);
        assert_eq!(file.size().unwrap(), 0);
    }

    #[test]
    fn test_write_and_read_at_offset() {
        let dir = tempdir().unwrap();
        let mut file = DataFile::open(dir.path().join("f.db")).unwrap();

        file.write_all_at(b"cinder", 100).unwrap();
        assert_eq!(file.size().unwrap(), 106);

        let mut buf = [0u8; 6];
        file.read_exact_at(&mut buf, 100).unwrap();
        assert_eq!(&buf, b"cinder");
    }

    #[test]
    fn test_read_at_past_eof_is_short() {
        let dir = tempdir().unwrap();
        let mut file = DataFile::open(dir.path().join("f.db")).unwrap();

        file.write_all_at(b"abc", 0).unwrap();

        let mut buf = [0u8; 8];
        let n = file.read_at(&mut buf, 0).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(&buf[3..], &[0u8; 5]);

        let n = file.read_at(&mut buf, 64).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_read_exact_past_eof_fails() {
        let dir = tempdir().unwrap();
        let mut file = DataFile::open(dir.path().join("f.db")).unwrap();

        file.write_all_at(b"abc", 0).unwrap();

        let mut buf = [0u8; 8];
        let err = file.read_exact_at(&mut buf, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_set_len() {
        let dir = tempdir().unwrap();
        let mut file = DataFile::open(dir.path().join("f.db")).unwrap();

        file.set_len(4096).unwrap();
        assert_eq!(file.size().unwrap(), 4096);

        file.set_len(512).unwrap();
        assert_eq!(file.size().unwrap(), 512);
    }
}
