//! Store wrappers for observing and disturbing a blob file's remote traffic

use blobfile::{BlobError, BlobLocation, BlobStore, PutMetadata, Result};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Number of calls that reached a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Existence checks
    pub exists: usize,
    /// Fetches
    pub get: usize,
    /// Pushes
    pub put: usize,
}

impl CallCounts {
    /// All calls together
    pub fn total(&self) -> usize {
        self.exists + self.get + self.put
    }
}

/// Wraps a [`BlobStore`], counting calls and optionally failing them
///
/// Failed calls are still counted. Failures surface as
/// [`BlobError::Remote`], the same way a transport error would.
#[derive(Debug)]
pub struct InstrumentedStore<S> {
    inner: S,
    exists_calls: AtomicUsize,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    fail_exists: AtomicBool,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
    last_put: Mutex<Option<PutMetadata>>,
}

impl<S: BlobStore> InstrumentedStore<S> {
    /// Wraps `inner` with zeroed counters and no failures
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            exists_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            fail_exists: AtomicBool::new(false),
            fail_get: AtomicBool::new(false),
            fail_put: AtomicBool::new(false),
            last_put: Mutex::new(None),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Calls made so far, failed ones included
    pub fn counts(&self) -> CallCounts {
        CallCounts {
            exists: self.exists_calls.load(Ordering::SeqCst),
            get: self.get_calls.load(Ordering::SeqCst),
            put: self.put_calls.load(Ordering::SeqCst),
        }
    }

    /// Zero all counters
    pub fn reset_counts(&self) {
        self.exists_calls.store(0, Ordering::SeqCst);
        self.get_calls.store(0, Ordering::SeqCst);
        self.put_calls.store(0, Ordering::SeqCst);
    }

    /// Make existence checks fail
    pub fn fail_exists(&self, fail: bool) {
        self.fail_exists.store(fail, Ordering::SeqCst);
    }

    /// Make fetches fail
    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Make pushes fail
    pub fn fail_put(&self, fail: bool) {
        self.fail_put.store(fail, Ordering::SeqCst);
    }

    /// Metadata sent with the most recent successful put
    pub fn last_put_metadata(&self) -> Option<PutMetadata> {
        self.last_put.lock().ok().and_then(|guard| guard.clone())
    }

    fn injected(flag: &AtomicBool, call: &str, location: &BlobLocation) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(BlobError::Remote(format!(
                "injected {} failure for {}",
                call, location
            )));
        }
        Ok(())
    }
}

impl<S: BlobStore> BlobStore for InstrumentedStore<S> {
    fn exists(&self, location: &BlobLocation) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_exists, "exists", location)?;
        self.inner.exists(location)
    }

    fn get(&self, location: &BlobLocation) -> Result<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_get, "get", location)?;
        self.inner.get(location)
    }

    fn put(&self, location: &BlobLocation, data: Bytes, metadata: &PutMetadata) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        Self::injected(&self.fail_put, "put", location)?;
        self.inner.put(location, data, metadata)?;
        if let Ok(mut last) = self.last_put.lock() {
            *last = Some(metadata.clone());
        }
        Ok(())
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        self.inner.ensure_bucket(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestBucket;

    #[test]
    fn test_counts_and_failures() {
        let bucket = TestBucket::new("instrumented").unwrap();
        let store = bucket.instrumented();
        let location = bucket.location("object");

        store
            .put(&location, Bytes::from_static(b"x"), &PutMetadata::default())
            .unwrap();
        assert!(store.exists(&location).unwrap());

        store.fail_get(true);
        assert!(matches!(store.get(&location), Err(BlobError::Remote(_))));
        store.fail_get(false);
        assert_eq!(store.get(&location).unwrap().as_ref(), b"x");

        assert_eq!(
            store.counts(),
            CallCounts {
                exists: 1,
                get: 2,
                put: 1
            }
        );
        store.reset_counts();
        assert_eq!(store.counts().total(), 0);
        assert!(store.last_put_metadata().is_some());
    }
}
