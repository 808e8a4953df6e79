//! The object store collaborator
//!
//! [`BlobStore`] is the only boundary a blob file crosses: whole-object
//! existence checks, fetches and pushes. [`ObjectStoreBackend`] implements it
//! for any `object_store::ObjectStore` by blocking on a Tokio runtime.

use crate::runtime::{build_runtime, shared_runtime};
use crate::{BlobError, BlobLocation, OpenOptions, PutMetadata, Result};
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, DynObjectStore, ObjectStore, PutOptions, PutPayload};
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::debug;

/// Whole-object access to a remote store
///
/// Timeouts and retries are the implementation's business; callers treat
/// every call as a single all-or-nothing unit.
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Whether the object exists
    fn exists(&self, location: &BlobLocation) -> Result<bool>;

    /// Fetch the full object; fails with [`BlobError::NotFound`] if absent
    fn get(&self, location: &BlobLocation) -> Result<Bytes>;

    /// Replace the full object
    fn put(&self, location: &BlobLocation, data: Bytes, metadata: &PutMetadata) -> Result<()>;

    /// Check the bucket is served by this store
    ///
    /// Called on open when `create_bucket` is set. Stores that can create
    /// buckets may do so here; the default accepts any bucket.
    fn ensure_bucket(&self, _bucket: &str) -> Result<()> {
        Ok(())
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn exists(&self, location: &BlobLocation) -> Result<bool> {
        (**self).exists(location)
    }

    fn get(&self, location: &BlobLocation) -> Result<Bytes> {
        (**self).get(location)
    }

    fn put(&self, location: &BlobLocation, data: Bytes, metadata: &PutMetadata) -> Result<()> {
        (**self).put(location, data, metadata)
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        (**self).ensure_bucket(bucket)
    }
}

/// A [`BlobStore`] over one bucket of an `object_store::ObjectStore`
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    bucket: String,
    store: Arc<DynObjectStore>,
    runtime: Arc<Runtime>,
    /// Whether put metadata is sent as object attributes
    forward_metadata: bool,
    /// Whether the bucket was created when the store was built
    bucket_created: bool,
}

impl ObjectStoreBackend {
    /// Wrap a store serving `bucket`, using the shared runtime
    pub fn new(bucket: impl Into<String>, store: Arc<DynObjectStore>) -> Result<Self> {
        Ok(Self::with_runtime(bucket, store, shared_runtime()?))
    }

    /// Wrap a store with an explicit runtime (useful for testing)
    pub fn with_runtime(
        bucket: impl Into<String>,
        store: Arc<DynObjectStore>,
        runtime: Arc<Runtime>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            store,
            runtime,
            forward_metadata: true,
            bucket_created: false,
        }
    }

    /// Stop sending put metadata, for stores that reject attributes
    pub fn without_metadata(mut self) -> Self {
        self.forward_metadata = false;
        self
    }

    /// Build a backend for the scheme of `location`
    ///
    /// Cloud builders read the usual environment variables; explicit
    /// credentials in `options` take precedence for S3.
    pub fn from_location(location: &BlobLocation, options: &OpenOptions) -> Result<Self> {
        let store = create_object_store(location, options)?;
        let backend = Self::new(location.bucket.clone(), store)?;
        Ok(match location.scheme.as_str() {
            // LocalFileSystem does not support attributes
            "file" => Self {
                bucket_created: options.create_bucket,
                ..backend.without_metadata()
            },
            _ => backend,
        })
    }

    /// Build a backend with a dedicated runtime of `worker_threads` threads
    pub fn with_worker_threads(
        bucket: impl Into<String>,
        store: Arc<DynObjectStore>,
        worker_threads: usize,
    ) -> Result<Self> {
        Ok(Self::with_runtime(bucket, store, build_runtime(worker_threads)?))
    }

    /// The bucket this backend serves
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Get the object store instance
    pub fn store(&self) -> &Arc<DynObjectStore> {
        &self.store
    }

    /// Get the Tokio runtime
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    fn path(&self, location: &BlobLocation) -> Result<ObjectPath> {
        if location.bucket != self.bucket {
            return Err(BlobError::InvalidLocation(format!(
                "{} is outside bucket '{}'",
                location, self.bucket
            )));
        }
        Ok(location.object_path())
    }

    fn attributes(&self, metadata: &PutMetadata) -> Attributes {
        let mut attributes = Attributes::new();
        if !self.forward_metadata {
            return attributes;
        }
        attributes.insert(Attribute::Metadata("acl".into()), metadata.access.as_str().into());
        if let Some(content_type) = &metadata.content_type {
            attributes.insert(Attribute::ContentType, content_type.clone().into());
        }
        if let Some(cache_control) = &metadata.cache_control {
            attributes.insert(Attribute::CacheControl, cache_control.clone().into());
        }
        if let Some(expires) = &metadata.expires {
            attributes.insert(Attribute::Metadata("expires".into()), expires.clone().into());
        }
        attributes
    }
}

impl BlobStore for ObjectStoreBackend {
    fn exists(&self, location: &BlobLocation) -> Result<bool> {
        let path = self.path(location)?;
        match self.runtime.block_on(self.store.head(&path)) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, location: &BlobLocation) -> Result<Bytes> {
        let path = self.path(location)?;
        let result = self
            .runtime
            .block_on(async { self.store.get(&path).await?.bytes().await });
        match result {
            Ok(data) => Ok(data),
            Err(object_store::Error::NotFound { .. }) => Err(BlobError::NotFound(location.name())),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, location: &BlobLocation, data: Bytes, metadata: &PutMetadata) -> Result<()> {
        let path = self.path(location)?;
        let options = PutOptions {
            attributes: self.attributes(metadata),
            ..Default::default()
        };
        if !self.forward_metadata {
            debug!("Store for {} does not take metadata; dropping {:?}", location, metadata);
        }

        self.runtime
            .block_on(self.store.put_opts(&path, PutPayload::from(data), options))?;
        Ok(())
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        if bucket != self.bucket {
            return Err(BlobError::InvalidLocation(format!(
                "Backend serves bucket '{}', not '{}'",
                self.bucket, bucket
            )));
        }
        if !self.bucket_created {
            debug!(
                "Bucket '{}' is not created by this backend; it must already exist",
                bucket
            );
        }
        Ok(())
    }
}

fn create_object_store(location: &BlobLocation, options: &OpenOptions) -> Result<Arc<DynObjectStore>> {
    match location.scheme.as_str() {
        "file" => {
            if options.create_bucket {
                std::fs::create_dir_all(&location.bucket)?;
            }
            let store = object_store::local::LocalFileSystem::new_with_prefix(&location.bucket)?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "aws")]
        "s3" => {
            let mut builder =
                object_store::aws::AmazonS3Builder::from_env().with_bucket_name(&location.bucket);
            if let Some(credentials) = &options.credentials {
                builder = builder
                    .with_access_key_id(&credentials.access_key_id)
                    .with_secret_access_key(&credentials.secret_access_key);
                if let Some(region) = &credentials.region {
                    builder = builder.with_region(region);
                }
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(feature = "gcp")]
        "gs" => {
            let store = object_store::gcp::GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(&location.bucket)
                .build()?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "azure")]
        "az" | "azblob" => {
            let store = object_store::azure::MicrosoftAzureBuilder::from_env()
                .with_container_name(&location.bucket)
                .build()?;
            Ok(Arc::new(store))
        }
        other => Err(BlobError::InvalidLocation(format!(
            "Scheme '{}' is not supported by this build",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn backend() -> ObjectStoreBackend {
        ObjectStoreBackend::new("unit", Arc::new(InMemory::new())).unwrap()
    }

    #[test]
    fn test_missing_object() {
        let backend = backend();
        let location = BlobLocation::new("unit", "missing.txt");
        assert!(!backend.exists(&location).unwrap());
        assert!(matches!(backend.get(&location), Err(BlobError::NotFound(_))));
    }

    #[test]
    fn test_put_get_with_attributes() {
        let backend = backend();
        let location = BlobLocation::new("unit", "dir/object.txt");
        let metadata = PutMetadata {
            content_type: Some("text/plain".to_string()),
            cache_control: Some("max-age=86400".to_string()),
            ..Default::default()
        };

        backend.put(&location, Bytes::from_static(b"data"), &metadata).unwrap();
        assert!(backend.exists(&location).unwrap());
        assert_eq!(backend.get(&location).unwrap().as_ref(), b"data");

        let result = backend
            .runtime()
            .block_on(backend.store().get(&location.object_path()))
            .unwrap();
        let attributes = result.attributes;
        assert_eq!(
            attributes.get(&Attribute::ContentType).map(|v| v.as_ref()),
            Some("text/plain")
        );
        assert_eq!(
            attributes.get(&Attribute::Metadata("acl".into())).map(|v| v.as_ref()),
            Some("public-read")
        );
    }

    #[test]
    fn test_foreign_bucket_rejected() {
        let backend = backend();
        let location = BlobLocation::new("other", "object.txt");
        assert!(matches!(
            backend.exists(&location),
            Err(BlobError::InvalidLocation(_))
        ));
        assert!(backend.ensure_bucket("other").is_err());
        assert!(backend.ensure_bucket("unit").is_ok());
        assert!(!backend.bucket_created);
    }

    #[test]
    fn test_file_backend_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let bucket = dir.path().join("bucket");
        let location = BlobLocation::with_scheme("file", bucket.to_string_lossy(), "note.txt");

        let backend = ObjectStoreBackend::from_location(&location, &OpenOptions::default()).unwrap();
        assert!(bucket.exists());
        assert!(!backend.exists(&location).unwrap());
        assert!(backend.bucket_created);
        assert!(backend.ensure_bucket(&location.bucket).is_ok());

        let metadata = PutMetadata::from_options(
            &OpenOptions::default().with_content_type("text/plain"),
            &location,
            chrono::Utc::now(),
        );
        backend.put(&location, Bytes::from_static(b"on disk"), &metadata).unwrap();
        assert_eq!(std::fs::read(bucket.join("note.txt")).unwrap(), b"on disk");
    }
}
