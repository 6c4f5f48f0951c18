// Copyright 2025 FecFS Developers
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Positioned-read file access
//!
//! The coding engine only needs stateless positioned reads and a size probe,
//! so source and share files sit behind this small seam. Tests substitute the
//! in-memory implementation.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

/// Random-access read source. Implementations must be callable from multiple
/// threads at once.
pub trait RandomAccessFile: Send + Sync {
    /// Read up to `buf.len()` bytes at `offset`, returning the number read.
    /// Returns fewer than requested only at end of file, and 0 at or past it.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Current size in bytes.
    fn len(&self) -> io::Result<u64>;
}

/// A file opened read-only from the OS filesystem
pub struct OsFile {
    inner: File,
}

impl OsFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self { inner: File::open(path)? })
    }
}

impl RandomAccessFile for OsFile {
    fn read_at(&self, mut buf: &mut [u8], mut offset: u64) -> io::Result<usize> {
        // pread may return short mid-file; keep reading so a short result
        // only ever means EOF to the engine.
        let mut total = 0;
        while !buf.is_empty() {
            match self.inner.read_at(buf, offset) {
                Ok(0) => break,
                Ok(n) => {
                    total += n;
                    offset += n as u64;
                    buf = &mut buf[n..];
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(total)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.inner.metadata()?.len())
    }
}

/// An in-memory file, used by tests
pub struct MemoryFile {
    contents: Vec<u8>,
}

impl MemoryFile {
    pub fn new(contents: Vec<u8>) -> Self {
        Self { contents }
    }
}

impl RandomAccessFile for MemoryFile {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        if offset >= self.contents.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.contents.len() - start);
        buf[..n].copy_from_slice(&self.contents[start..start + n]);
        Ok(n)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.contents.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_file_reads_windows() {
        let file = MemoryFile::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];

        assert_eq!(file.read_at(&mut buf, 0).unwrap(), 4);
        assert_eq!(&buf, b"0123");

        assert_eq!(file.read_at(&mut buf, 8).unwrap(), 2);
        assert_eq!(&buf[..2], b"89");

        assert_eq!(file.read_at(&mut buf, 10).unwrap(), 0);
        assert_eq!(file.read_at(&mut buf, 100).unwrap(), 0);
        assert_eq!(file.len().unwrap(), 10);
    }

    #[test]
    fn test_os_file_positioned_read() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();

        let file = OsFile::open(&path).unwrap();
        assert_eq!(file.len().unwrap(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(file.read_at(&mut buf, 6).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(file.read_at(&mut buf, 11).unwrap(), 0);
    }
}
