//! In-memory random-access sink emulating file semantics over a growable
//! buffer.
//!
//! Writing past the current length zero-fills the gap; seeking backward
//! and writing overwrites in place without truncating the tail. Built for
//! the two-phase collection write, where a placeholder count is patched
//! after the elements are known.

use std::io::{self, Read, Seek, SeekFrom, Write};

/// Seekable in-memory byte sink.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    buf: Vec<u8>,
    pos: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing bytes; the cursor starts at 0.
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current length of the buffer, independent of the cursor.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Write for ByteBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        // A forward seek may have left the cursor past the end; the gap
        // becomes zero bytes, like a sparse file read back.
        if self.pos > self.buf.len() {
            self.buf.resize(self.pos, 0);
        }
        let overlap = (self.buf.len() - self.pos).min(data.len());
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
        self.buf.extend_from_slice(&data[overlap..]);
        self.pos += data.len();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ByteBuffer {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.buf.len().saturating_sub(self.pos);
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for ByteBuffer {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let target = match from {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(delta) => self.buf.len() as i128 + delta as i128,
            SeekFrom::Current(delta) => self.pos as i128 + delta as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of buffer",
            ));
        }
        // Seeking past the end is legal; the gap materializes as zeros on
        // the next write.
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}
