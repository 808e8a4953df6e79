//! In-memory byte buffer with a file-like cursor

use crate::{BlobError, Result};
use bytes::{Bytes, BytesMut};
use std::io::SeekFrom;
use tracing::trace;

/// A randomly addressable byte buffer with an independent cursor
///
/// The cursor always stays within `[0, len]`. Writes overwrite in place and
/// extend the buffer when they run past the end.
#[derive(Debug, Default)]
pub(crate) struct SeekableBuffer {
    /// The buffered bytes
    data: BytesMut,
    /// Cursor position
    pos: usize,
}

impl SeekableBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor position
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes from the cursor to the end
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Length of the line starting at the cursor, terminator included
    pub fn line_len(&self) -> usize {
        let rest = self.remaining();
        rest.iter()
            .position(|&b| b == b'\n')
            .map_or(rest.len(), |i| i + 1)
    }

    /// Move the cursor forward, stopping at the end
    pub fn advance(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n).min(self.data.len());
    }

    /// Read up to `limit` bytes (all remaining when `None`)
    pub fn read(&mut self, limit: Option<usize>) -> &[u8] {
        let start = self.pos;
        let available = self.data.len() - start;
        let n = limit.map_or(available, |limit| limit.min(available));
        self.pos += n;
        &self.data[start..self.pos]
    }

    /// Write at the cursor, returning the number of bytes written
    pub fn write(&mut self, buf: &[u8]) -> usize {
        let overlap = (self.data.len() - self.pos).min(buf.len());
        self.data[self.pos..self.pos + overlap].copy_from_slice(&buf[..overlap]);
        if overlap < buf.len() {
            let before = self.data.capacity();
            self.data.extend_from_slice(&buf[overlap..]);
            if self.data.capacity() != before {
                trace!("Buffer grew to {} bytes of capacity", self.data.capacity());
            }
        }
        self.pos += buf.len();
        buf.len()
    }

    /// Move the cursor; positions past the end clamp to the end
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.data.len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset).unwrap_or(i64::MAX),
            SeekFrom::Current(offset) => (self.pos as i64).saturating_add(offset),
            SeekFrom::End(offset) => len.saturating_add(offset),
        };

        if target < 0 {
            return Err(BlobError::InvalidSeek(target));
        }

        self.pos = target.min(len) as usize;
        Ok(self.pos as u64)
    }

    /// Cut the buffer to `size` bytes (the cursor when `None`)
    ///
    /// Never extends the buffer. The cursor is clamped to the new length.
    /// Returns the new length.
    pub fn truncate(&mut self, size: Option<usize>) -> usize {
        let size = size.unwrap_or(self.pos).min(self.data.len());
        self.data.truncate(size);
        self.pos = self.pos.min(size);
        size
    }

    /// Replace the contents and rewind
    pub fn load(&mut self, bytes: &[u8]) {
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.pos = 0;
    }

    /// Drop the contents and rewind
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
    }

    /// Copy of the whole buffer; the cursor is not moved
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    /// Give the backing storage back to the allocator
    pub fn release(&mut self) {
        self.data = BytesMut::new();
        self.pos = 0;
    }
}
