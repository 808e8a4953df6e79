//! BlobFile - a seekable, file-like handle over one remote object

use crate::buffer::SeekableBuffer;
use crate::mode::{Binary, Mode, Text};
use crate::sync::{SyncController, SyncState};
use crate::{BlobError, BlobLocation, BlobStore, OpenOptions, Result};
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tracing::{debug, warn};

/// A text-mode blob file
pub type TextBlobFile = BlobFile<Text>;

/// A binary-mode blob file
pub type BinaryBlobFile = BlobFile<Binary>;

/// A file-like handle backed by a single object in a [`BlobStore`]
///
/// Opening never touches the network. The first read-class operation
/// (`read`, `read_line`, `read_lines`, a seek away from the start) fetches the
/// whole object into memory once; writes only modify the buffer; `flush` and
/// `close` push the whole buffer back if it was modified.
///
/// # Truncate on push
///
/// Every push first truncates the buffer to the current position. After
/// writing into the middle of existing content, seek to the end before
/// flushing to keep the bytes after the cursor.
///
/// Dropping an open handle closes it; errors from that implicit close are
/// logged, not returned. Call [`close`](Self::close) or use
/// [`scope`](Self::scope) to observe them.
pub struct BlobFile<M: Mode = Binary> {
    store: Arc<dyn BlobStore>,
    location: BlobLocation,
    mode: M,
    options: OpenOptions,
    buffer: SeekableBuffer,
    sync: SyncController,
}

impl<M: Mode> BlobFile<M> {
    /// Open a handle, deriving the mode from `options`
    pub fn open(
        store: Arc<dyn BlobStore>,
        location: BlobLocation,
        options: OpenOptions,
    ) -> Result<Self> {
        let mode = M::from_options(&options)?;
        Self::with_mode(store, location, mode, options)
    }

    /// Open a handle with an explicit mode
    pub fn with_mode(
        store: Arc<dyn BlobStore>,
        location: BlobLocation,
        mode: M,
        options: OpenOptions,
    ) -> Result<Self> {
        options.validate()?;
        if options.create_bucket {
            store.ensure_bucket(&location.bucket)?;
        }
        debug!("Opened {} in {:?} mode", location, mode);

        Ok(Self {
            store,
            location,
            mode,
            options,
            buffer: SeekableBuffer::new(),
            sync: SyncController::new(),
        })
    }

    /// Run `f` with this handle and close it afterwards
    ///
    /// The handle is closed on every path out of `f`. An error from `f` wins
    /// over an error from the close.
    pub fn scope<T, E, F>(mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, E>,
        E: From<BlobError>,
    {
        let outcome = f(&mut self);
        let closed = self.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    /// Canonical name, e.g. `s3://bucket/key`
    pub fn name(&self) -> String {
        self.location.name()
    }

    /// The remote object's address
    pub fn location(&self) -> &BlobLocation {
        &self.location
    }

    /// The coercion mode
    pub fn mode(&self) -> &M {
        &self.mode
    }

    /// The options the handle was opened with
    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Where the handle stands relative to the remote object
    pub fn state(&self) -> SyncState {
        self.sync.state()
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.sync.is_closed()
    }

    /// Read up to `limit` units from the cursor, or everything when `None`
    ///
    /// Units are bytes in binary mode and characters in text mode.
    pub fn read(&mut self, limit: Option<usize>) -> Result<M::Owned> {
        self.ensure_fetched()?;
        let len = match limit {
            Some(units) => self.mode.span(self.buffer.remaining(), units),
            None => self.buffer.remaining().len(),
        };
        self.take(len)
    }

    /// Read one line, terminator included, stopping after `limit` units
    ///
    /// Returns empty data at the end of the buffer.
    pub fn read_line(&mut self, limit: Option<usize>) -> Result<M::Owned> {
        self.ensure_fetched()?;
        let line_len = self.buffer.line_len();
        let len = match limit {
            Some(units) => self.mode.span(&self.buffer.remaining()[..line_len], units),
            None => line_len,
        };
        self.take(len)
    }

    /// Read the remaining lines
    ///
    /// With a nonzero `hint`, stops once the lines read so far total at
    /// least `hint` units.
    pub fn read_lines(&mut self, hint: Option<usize>) -> Result<Vec<M::Owned>> {
        let hint = hint.filter(|&hint| hint > 0);
        let mut lines = Vec::new();
        let mut total = 0;

        loop {
            let line = self.read_line(None)?;
            let units = self.mode.units(line.borrow());
            if units == 0 {
                break;
            }
            total += units;
            lines.push(line);
            if hint.is_some_and(|hint| total >= hint) {
                break;
            }
        }

        Ok(lines)
    }

    /// Iterate over the remaining lines
    pub fn lines(&mut self) -> Lines<'_, M> {
        Lines {
            file: self,
            done: false,
        }
    }

    /// Removed legacy line iterator
    #[deprecated(note = "use `lines()` or iterate over `&mut BlobFile` instead")]
    pub fn xreadlines(&mut self) -> Result<Lines<'_, M>> {
        Err(BlobError::Unsupported(
            "xreadlines() has been removed; use lines()".to_string(),
        ))
    }

    /// Write at the cursor, returning the number of units written
    ///
    /// Never fetches. Text is encoded before the buffer is touched, so an
    /// encoding failure leaves the handle unchanged.
    pub fn write(&mut self, data: &M::Borrowed) -> Result<usize> {
        self.sync.check_open()?;
        let bytes = self.mode.encode(data)?;
        self.sync.mark_dirty();
        self.buffer.write(&bytes);
        Ok(self.mode.units(data))
    }

    /// Write every item in order, without separators
    ///
    /// All items are encoded first; if any fails nothing is written.
    pub fn write_lines<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<M::Borrowed>,
    {
        self.sync.check_open()?;
        let encoded = lines
            .into_iter()
            .map(|line| self.mode.encode(line.as_ref()).map(Cow::into_owned))
            .collect::<Result<Vec<Vec<u8>>>>()?;

        self.sync.mark_dirty();
        for bytes in &encoded {
            self.buffer.write(bytes);
        }
        Ok(())
    }

    /// Move the cursor and return the new position
    ///
    /// Before the first fetch the buffer is empty, so any seek that could
    /// land away from the start fetches first and is then applied to the
    /// real content.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.sync.check_open()?;
        let lands_at_start = matches!(pos, SeekFrom::Start(0) | SeekFrom::Current(0));
        if self.sync.fetch_pending() && !lands_at_start {
            self.ensure_fetched()?;
        }
        self.buffer.seek(pos)
    }

    /// Current cursor position; never does I/O
    pub fn tell(&self) -> Result<u64> {
        self.sync.check_open()?;
        Ok(self.buffer.position() as u64)
    }

    /// Cut the content to `size` bytes, or to the cursor when `None`
    ///
    /// Does not extend the content and does not fetch. Returns the new size.
    pub fn truncate(&mut self, size: Option<u64>) -> Result<u64> {
        self.sync.check_open()?;
        self.sync.mark_dirty();
        let size = size.map(|size| usize::try_from(size).unwrap_or(usize::MAX));
        Ok(self.buffer.truncate(size) as u64)
    }

    /// Push local changes, if any
    ///
    /// The pushed object ends at the current position (see the type docs).
    /// Without changes since the last push this makes no remote call.
    pub fn flush(&mut self) -> Result<()> {
        self.sync
            .ensure_pushed(&*self.store, &self.location, &mut self.buffer, &self.options)
    }

    /// Push local changes and release the buffer
    ///
    /// The handle is closed even if the push fails; the failure is returned.
    /// Closing a closed handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.sync.is_closed() {
            return Ok(());
        }

        let pushed = self.flush();
        self.buffer.release();
        self.sync.close();
        debug!("Closed {}", self.location);
        pushed
    }

    /// Byte-level `std::io` view of this handle
    ///
    /// Bypasses text coercion but follows the same fetch, dirty and closed
    /// rules.
    pub fn io(&mut self) -> ByteIo<'_, M> {
        ByteIo { file: self }
    }

    fn ensure_fetched(&mut self) -> Result<()> {
        self.sync
            .ensure_fetched(&*self.store, &self.location, &mut self.buffer)
    }

    /// Decode the next `len` bytes, moving the cursor only on success
    fn take(&mut self, len: usize) -> Result<M::Owned> {
        let decoded = self.mode.decode(&self.buffer.remaining()[..len])?;
        self.buffer.advance(len);
        Ok(decoded)
    }
}

impl<M: Mode> fmt::Debug for BlobFile<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobFile")
            .field("location", &self.location)
            .field("mode", &self.mode)
            .field("state", &self.sync.state())
            .field("len", &self.buffer.len())
            .field("position", &self.buffer.position())
            .finish()
    }
}

impl<M: Mode> Drop for BlobFile<M> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close {} on drop: {}", self.location, e);
        }
    }
}

/// Iterator over the lines of a [`BlobFile`]
///
/// Stops at the end of the buffer or after the first error.
#[derive(Debug)]
pub struct Lines<'a, M: Mode> {
    file: &'a mut BlobFile<M>,
    done: bool,
}

impl<M: Mode> Iterator for Lines<'_, M> {
    type Item = Result<M::Owned>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.file.read_line(None) {
            Ok(line) if self.file.mode.units(line.borrow()) == 0 => {
                self.done = true;
                None
            }
            Ok(line) => Some(Ok(line)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a, M: Mode> IntoIterator for &'a mut BlobFile<M> {
    type Item = Result<M::Owned>;
    type IntoIter = Lines<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines()
    }
}

/// Raw byte access to a [`BlobFile`] through the `std::io` traits
#[derive(Debug)]
pub struct ByteIo<'a, M: Mode> {
    file: &'a mut BlobFile<M>,
}

impl<M: Mode> Read for ByteIo<'_, M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.ensure_fetched()?;
        let chunk = self.file.buffer.read(Some(buf.len()));
        buf[..chunk.len()].copy_from_slice(chunk);
        Ok(chunk.len())
    }
}

impl<M: Mode> BufRead for ByteIo<'_, M> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.file.ensure_fetched()?;
        Ok(self.file.buffer.remaining())
    }

    fn consume(&mut self, amt: usize) {
        self.file.buffer.advance(amt);
    }
}

impl<M: Mode> Write for ByteIo<'_, M> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.sync.check_open()?;
        self.file.sync.mark_dirty();
        Ok(self.file.buffer.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

impl<M: Mode> Seek for ByteIo<'_, M> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.file.seek(pos)?)
    }
}
