//! Addresses of blobs inside object stores

use crate::{BlobError, Result};
use object_store::path::Path as ObjectPath;
use std::fmt;
use url::Url;

const S3_HOST_SUFFIX: &str = ".s3.amazonaws.com";

/// A resolved (bucket, key) pair naming exactly one remote object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobLocation {
    /// The storage scheme (s3, gs, az, file)
    pub scheme: String,
    /// The bucket, container, or for `file` URLs the parent directory
    pub bucket: String,
    /// The object key within the bucket
    pub key: String,
}

impl BlobLocation {
    /// Create an S3 location from an already resolved bucket and key
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self::with_scheme("s3", bucket, key)
    }

    /// Create a location for an explicit scheme
    pub fn with_scheme(
        scheme: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            key: key.into().trim_start_matches('/').to_string(),
        }
    }

    /// Parse a URL into a location
    ///
    /// Supports:
    /// - `s3://bucket/path/to/object`, `gs://...`, `az://...`, `azblob://...`
    /// - `http(s)://bucket.s3.amazonaws.com/path/to/object`
    /// - `file:///dir/object` (the parent directory plays the bucket)
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| BlobError::InvalidLocation(format!("Invalid URL {}: {}", url, e)))?;

        let location = match parsed.scheme() {
            "s3" | "gs" | "az" | "azblob" => {
                let bucket = parsed
                    .host_str()
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| BlobError::InvalidLocation("Missing bucket name".to_string()))?;
                Self::with_scheme(parsed.scheme(), bucket, parsed.path())
            }
            "http" | "https" => {
                let host = parsed.host_str().unwrap_or_default();
                let bucket = host.strip_suffix(S3_HOST_SUFFIX).ok_or_else(|| {
                    BlobError::InvalidLocation(format!(
                        "Not an S3 virtual-hosted URL: {}",
                        url
                    ))
                })?;
                Self::new(bucket, parsed.path())
            }
            "file" => {
                let path = parsed.to_file_path().map_err(|_| {
                    BlobError::InvalidLocation(format!("Invalid file URL: {}", url))
                })?;
                let key = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = path
                    .parent()
                    .map(|dir| dir.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Self::with_scheme("file", dir, key)
            }
            other => {
                return Err(BlobError::InvalidLocation(format!(
                    "Unsupported scheme: {}. Use s3://, gs://, az:// or file://",
                    other
                )))
            }
        };

        if location.key.is_empty() {
            return Err(BlobError::InvalidLocation(format!(
                "Missing object key in {}",
                url
            )));
        }
        Ok(location)
    }

    /// The canonical name of the object, e.g. `s3://bucket/key`
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// The key as an `object_store` path
    pub fn object_path(&self) -> ObjectPath {
        ObjectPath::from(self.key.as_str())
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.bucket, self.key)
    }
}
