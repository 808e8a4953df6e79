//! Testing utilities and fixtures for blobfile
//!
//! This crate provides an in-memory bucket with instrumented access, common
//! payloads, and assertions for testing code built on blobfile.

use anyhow::Result;
use blobfile::{
    BlobFile, BlobLocation, BlobStore, Mode, ObjectStoreBackend, OpenOptions, PutMetadata,
};
use object_store::memory::InMemory;
use object_store::{Attribute, Attributes, ObjectStore};
use std::sync::{Arc, Once};

pub mod assertions;
pub mod fixtures;
pub mod stores;

pub use stores::InstrumentedStore;

/// Route `tracing` output to the test harness, honouring `RUST_LOG`
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An in-memory bucket whose store counts calls and can inject failures
pub struct TestBucket {
    name: String,
    backend: ObjectStoreBackend,
    store: Arc<InstrumentedStore<ObjectStoreBackend>>,
}

impl TestBucket {
    /// Creates an empty bucket
    pub fn new(name: &str) -> Result<Self> {
        init_test_logging();
        let backend = ObjectStoreBackend::new(name, Arc::new(InMemory::new()))?;
        let store = Arc::new(InstrumentedStore::new(backend.clone()));
        Ok(Self {
            name: name.to_string(),
            backend,
            store,
        })
    }

    /// The bucket name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location of `key` in this bucket
    pub fn location(&self, key: &str) -> BlobLocation {
        BlobLocation::new(&self.name, key)
    }

    /// The instrumented store, for opening handles
    pub fn store(&self) -> Arc<dyn BlobStore> {
        self.store.clone()
    }

    /// Call counters and failure switches
    pub fn instrumented(&self) -> &InstrumentedStore<ObjectStoreBackend> {
        &self.store
    }

    /// Opens `key` with the given options
    pub fn open<M: Mode>(&self, key: &str, options: OpenOptions) -> Result<BlobFile<M>> {
        Ok(BlobFile::open(self.store(), self.location(key), options)?)
    }

    /// Writes `content` straight into the bucket, bypassing the counters
    pub fn seed(&self, key: &str, content: &[u8]) -> Result<()> {
        self.backend.put(
            &self.location(key),
            bytes::Bytes::copy_from_slice(content),
            &PutMetadata::default(),
        )?;
        Ok(())
    }

    /// Reads `key` straight from the bucket, bypassing the counters
    pub fn contents(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let location = self.location(key);
        if !self.backend.exists(&location)? {
            return Ok(None);
        }
        Ok(Some(self.backend.get(&location)?.to_vec()))
    }

    /// Attributes stored with `key`
    pub fn attributes(&self, key: &str) -> Result<Attributes> {
        let path = self.location(key).object_path();
        let result = self
            .backend
            .runtime()
            .block_on(self.backend.store().get(&path))?;
        Ok(result.attributes)
    }

    /// A single attribute of `key` as a string
    pub fn attribute(&self, key: &str, attribute: &Attribute) -> Result<Option<String>> {
        Ok(self
            .attributes(key)?
            .get(attribute)
            .map(|value| AsRef::<str>::as_ref(value).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_and_contents() {
        let bucket = TestBucket::new("fixtures").unwrap();
        assert_eq!(bucket.contents("missing").unwrap(), None);
        bucket.seed("present", b"data").unwrap();
        assert_eq!(bucket.contents("present").unwrap(), Some(b"data".to_vec()));
        assert_eq!(bucket.instrumented().counts().total(), 0);
    }

    #[test]
    fn test_location_uses_bucket_name() {
        let bucket = TestBucket::new("named").unwrap();
        assert_eq!(bucket.location("k").name(), "s3://named/k");
        assert_eq!(bucket.name(), "named");
    }
}
