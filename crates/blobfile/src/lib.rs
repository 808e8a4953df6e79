//! # blobfile
//!
//! File-like access to single objects in cloud object stores. A [`BlobFile`]
//! behaves like a local file (read, write, seek, truncate, line iteration)
//! while the object itself lives in S3, GCS, Azure or any other
//! `object_store` backend.
//!
//! ## Architecture
//!
//! - [`BlobFile`]: the handle. Buffers the whole object in memory, fetches it
//!   lazily on the first read and pushes it back on `flush`/`close` only if it
//!   was modified.
//! - [`Mode`]: [`Binary`] passes bytes through, [`Text`] encodes and decodes
//!   with an [`Encoding`].
//! - [`BlobStore`]: the whole-object store interface. [`ObjectStoreBackend`]
//!   implements it over `object_store`, using an internal Tokio runtime to
//!   bridge the async API to synchronous calls.
//!
//! ```no_run
//! use blobfile::{open_url, OpenOptions, TextBlobFile};
//!
//! # fn main() -> blobfile::Result<()> {
//! let mut file: TextBlobFile = open_url("s3://my-bucket/notes.txt", OpenOptions::default())?;
//! file.write("hello\n")?;
//! file.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod buffer;
mod config;
mod error;
mod file;
mod location;
mod metadata;
mod mode;
mod runtime;
mod store;
mod sync;

pub use config::{Credentials, OpenOptions};
pub use error::{BlobError, Result};
pub use file::{BinaryBlobFile, BlobFile, ByteIo, Lines, TextBlobFile};
pub use location::BlobLocation;
pub use metadata::{guess_content_type, AccessPolicy, PutMetadata, HTTP_DATE_FORMAT};
pub use mode::{Binary, Encoding, Mode, Text};
pub use runtime::build_runtime;
pub use store::{BlobStore, ObjectStoreBackend};
pub use sync::SyncState;

// Re-export commonly used types from object_store
pub use object_store::{path::Path as ObjectPath, ObjectStore};

use std::sync::Arc;

/// Open the object named by `url`
///
/// Builds an [`ObjectStoreBackend`] for the URL's scheme and opens a handle
/// in the mode chosen by the caller's type.
pub fn open_url<M: Mode>(url: &str, options: OpenOptions) -> Result<BlobFile<M>> {
    let location = BlobLocation::parse(url)?;
    let backend = ObjectStoreBackend::from_location(&location, &options)?;
    BlobFile::open(Arc::new(backend), location, options)
}
