//! Metadata sent to the store with every push

use crate::{BlobLocation, OpenOptions};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RFC 1123 date format used by the `Expires` header
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Canned access policy for a pushed object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPolicy {
    /// Only the owner can read the object
    Private,
    /// Anyone can read the object
    #[default]
    PublicRead,
}

impl AccessPolicy {
    /// Header value, as used by `x-amz-acl`
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::Private => "private",
            AccessPolicy::PublicRead => "public-read",
        }
    }
}

impl fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata forwarded verbatim to `BlobStore::put`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PutMetadata {
    /// Access policy
    pub access: AccessPolicy,
    /// Content type
    pub content_type: Option<String>,
    /// Expiry timestamp formatted as an HTTP date
    pub expires: Option<String>,
    /// Cache-Control directive, `max-age=<seconds>`
    pub cache_control: Option<String>,
}

impl PutMetadata {
    /// Build the metadata for a push of `location` happening at `now`
    ///
    /// Without a configured content type, one is guessed from the key's
    /// extension; unknown extensions send none.
    pub fn from_options(
        options: &OpenOptions,
        location: &BlobLocation,
        now: DateTime<Utc>,
    ) -> Self {
        let content_type = options
            .content_type
            .clone()
            .or_else(|| guess_content_type(&location.key));
        let mut metadata = Self {
            access: options.access,
            content_type,
            ..Default::default()
        };

        if options.expiration_days > 0 {
            let days = options.expiration_days;
            metadata.expires = Duration::try_days(i64::from(days))
                .and_then(|delta| now.checked_add_signed(delta))
                .map(|then| then.format(HTTP_DATE_FORMAT).to_string());
            metadata.cache_control = Some(format!(
                "max-age={}",
                u64::from(days) * SECONDS_PER_DAY
            ));
        }

        metadata
    }

    /// The metadata as HTTP header pairs
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("x-amz-acl", self.access.as_str().to_string())];
        if let Some(content_type) = &self.content_type {
            headers.push(("Content-Type", content_type.clone()));
        }
        if let Some(expires) = &self.expires {
            headers.push(("Expires", expires.clone()));
        }
        if let Some(cache_control) = &self.cache_control {
            headers.push(("Cache-Control", cache_control.clone()));
        }
        headers
    }
}

/// MIME type registered for the extension of `key`
pub fn guess_content_type(key: &str) -> Option<String> {
    mime_guess::from_path(key).first_raw().map(str::to_string)
}
