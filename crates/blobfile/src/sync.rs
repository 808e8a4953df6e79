//! Lazy fetch/push controller
//!
//! The remote object is fetched at most once per handle and pushed only when
//! the buffer was modified, both as late as possible. The two intents of the
//! handle are folded into one [`SyncState`] so that impossible combinations
//! (fetch still pending on a dirty buffer, activity after close) cannot be
//! represented.

use crate::buffer::SeekableBuffer;
use crate::{BlobError, BlobLocation, BlobStore, OpenOptions, PutMetadata, Result};
use chrono::Utc;
use tracing::{debug, trace};

/// Where a handle stands relative to its remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing fetched, nothing written
    Unfetched,
    /// Buffer matches the remote object as far as this handle knows
    Clean,
    /// Buffer has changes that have not been pushed
    Dirty,
    /// Handle is closed; terminal
    Closed,
}

/// Decides when a handle talks to its store
#[derive(Debug)]
pub(crate) struct SyncController {
    state: SyncState,
}

impl SyncController {
    pub fn new() -> Self {
        Self {
            state: SyncState::Unfetched,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SyncState::Closed
    }

    /// Fail with [`BlobError::Closed`] once the handle is closed
    pub fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(BlobError::Closed);
        }
        Ok(())
    }

    /// Whether the first read-class operation still has to fetch
    pub fn fetch_pending(&self) -> bool {
        self.state == SyncState::Unfetched
    }

    /// Record a local modification
    ///
    /// A write before any fetch settles the fetch as unnecessary: the handle
    /// will replace the remote object rather than merge into it.
    pub fn mark_dirty(&mut self) {
        match self.state {
            SyncState::Unfetched => {
                debug!("Write before first read; remote contents will not be fetched");
                self.state = SyncState::Dirty;
            }
            SyncState::Clean => self.state = SyncState::Dirty,
            SyncState::Dirty | SyncState::Closed => {}
        }
    }

    /// Load the remote object into `buffer` if no fetch happened yet
    ///
    /// A missing object yields an empty buffer.
    pub fn ensure_fetched(
        &mut self,
        store: &dyn BlobStore,
        location: &BlobLocation,
        buffer: &mut SeekableBuffer,
    ) -> Result<()> {
        self.check_open()?;
        if self.state != SyncState::Unfetched {
            return Ok(());
        }

        buffer.clear();
        let contents = if store.exists(location)? {
            match store.get(location) {
                Ok(data) => Some(data),
                Err(BlobError::NotFound(_)) => None,
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        match contents {
            Some(data) => {
                debug!("Fetched {} bytes from {}", data.len(), location);
                buffer.load(&data);
            }
            None => debug!("{} does not exist; starting empty", location),
        }

        self.state = SyncState::Clean;
        Ok(())
    }

    /// Push `buffer` to the store if it was modified
    ///
    /// The buffer is first truncated to the cursor, so anything after the
    /// current position is dropped from the pushed object. The cursor itself
    /// does not move.
    pub fn ensure_pushed(
        &mut self,
        store: &dyn BlobStore,
        location: &BlobLocation,
        buffer: &mut SeekableBuffer,
        options: &OpenOptions,
    ) -> Result<()> {
        self.check_open()?;
        if self.state != SyncState::Dirty {
            trace!("{} has no unpushed changes", location);
            return Ok(());
        }

        let size = buffer.truncate(None);
        let metadata = PutMetadata::from_options(options, location, Utc::now());
        debug!("Uploading {} bytes to {}", size, location);
        store.put(location, buffer.snapshot(), &metadata)?;

        self.state = SyncState::Clean;
        Ok(())
    }

    /// Enter the terminal state
    pub fn close(&mut self) {
        self.state = SyncState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MapStore {
        objects: Mutex<HashMap<String, Bytes>>,
        gets: Mutex<usize>,
        puts: Mutex<usize>,
    }

    impl BlobStore for MapStore {
        fn exists(&self, location: &BlobLocation) -> Result<bool> {
            Ok(self.objects.lock().unwrap().contains_key(&location.key))
        }

        fn get(&self, location: &BlobLocation) -> Result<Bytes> {
            *self.gets.lock().unwrap() += 1;
            self.objects
                .lock()
                .unwrap()
                .get(&location.key)
                .cloned()
                .ok_or_else(|| BlobError::NotFound(location.name()))
        }

        fn put(&self, location: &BlobLocation, data: Bytes, _metadata: &PutMetadata) -> Result<()> {
            *self.puts.lock().unwrap() += 1;
            self.objects.lock().unwrap().insert(location.key.clone(), data);
            Ok(())
        }
    }

    fn seeded(content: &'static [u8]) -> (MapStore, BlobLocation) {
        let store = MapStore::default();
        let location = BlobLocation::new("bucket", "key");
        store
            .objects
            .lock()
            .unwrap()
            .insert(location.key.clone(), Bytes::from_static(content));
        (store, location)
    }

    #[test]
    fn test_fetch_happens_once() {
        let (store, location) = seeded(b"remote");
        let mut sync = SyncController::new();
        let mut buffer = SeekableBuffer::new();

        sync.ensure_fetched(&store, &location, &mut buffer).unwrap();
        buffer.advance(3);
        sync.ensure_fetched(&store, &location, &mut buffer).unwrap();

        assert_eq!(*store.gets.lock().unwrap(), 1);
        assert_eq!(buffer.position(), 3);
        assert_eq!(sync.state(), SyncState::Clean);
    }

    #[test]
    fn test_missing_object_fetches_empty() {
        let store = MapStore::default();
        let location = BlobLocation::new("bucket", "absent");
        let mut sync = SyncController::new();
        let mut buffer = SeekableBuffer::new();

        sync.ensure_fetched(&store, &location, &mut buffer).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(*store.gets.lock().unwrap(), 0);
        assert!(!sync.fetch_pending());
    }

    #[test]
    fn test_push_only_when_dirty() {
        let (store, location) = seeded(b"remote");
        let options = OpenOptions::default();
        let mut sync = SyncController::new();
        let mut buffer = SeekableBuffer::new();

        sync.ensure_pushed(&store, &location, &mut buffer, &options).unwrap();
        assert_eq!(*store.puts.lock().unwrap(), 0);

        sync.mark_dirty();
        buffer.write(b"new");
        sync.ensure_pushed(&store, &location, &mut buffer, &options).unwrap();
        sync.ensure_pushed(&store, &location, &mut buffer, &options).unwrap();
        assert_eq!(*store.puts.lock().unwrap(), 1);
        assert_eq!(sync.state(), SyncState::Clean);
    }

    #[test]
    fn test_write_first_skips_fetch() {
        let (store, location) = seeded(b"remote contents");
        let mut sync = SyncController::new();
        let mut buffer = SeekableBuffer::new();

        sync.mark_dirty();
        buffer.write(b"new");
        assert_eq!(sync.state(), SyncState::Dirty);
        sync.ensure_fetched(&store, &location, &mut buffer).unwrap();
        assert_eq!(*store.gets.lock().unwrap(), 0);
        assert_eq!(buffer.snapshot().as_ref(), b"new");
    }

    #[test]
    fn test_push_truncates_to_cursor() {
        let (store, location) = seeded(b"0123456789");
        let options = OpenOptions::default();
        let mut sync = SyncController::new();
        let mut buffer = SeekableBuffer::new();

        sync.ensure_fetched(&store, &location, &mut buffer).unwrap();
        buffer.advance(2);
        buffer.write(b"ab");
        sync.mark_dirty();
        sync.ensure_pushed(&store, &location, &mut buffer, &options).unwrap();

        let pushed = store.objects.lock().unwrap().get("key").cloned().unwrap();
        assert_eq!(pushed.as_ref(), b"01ab");
        assert_eq!(buffer.position(), 4);
    }

    #[test]
    fn test_closed_rejects_sync() {
        let (store, location) = seeded(b"remote");
        let mut sync = SyncController::new();
        let mut buffer = SeekableBuffer::new();
        sync.close();
        assert!(matches!(
            sync.ensure_fetched(&store, &location, &mut buffer),
            Err(BlobError::Closed)
        ));
        sync.mark_dirty();
        assert!(sync.is_closed());
    }
}
