//! Configuration for opening blob files

use crate::metadata::AccessPolicy;
use crate::mode::Encoding;
use crate::{BlobError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Options fixed when a blob file is opened
///
/// Everything except `encoding` is passed through to the store: the
/// access policy, content type and expiration become put metadata, the
/// credentials and bucket flag are used when the backend is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Text codec used in text mode
    pub encoding: String,
    /// Canned access policy applied on every push
    pub access: AccessPolicy,
    /// Content type sent with every push
    pub content_type: Option<String>,
    /// Expiration in days (0 = no Expires/Cache-Control headers)
    pub expiration_days: u32,
    /// Create the bucket when it does not exist
    pub create_bucket: bool,
    /// Explicit credentials (falls back to the environment)
    pub credentials: Option<Credentials>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            access: AccessPolicy::PublicRead,
            content_type: None,
            expiration_days: 0,
            create_bucket: true,
            credentials: None,
        }
    }
}

impl OpenOptions {
    /// Set the text encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the access policy
    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the expiration in days
    pub fn with_expiration_days(mut self, days: u32) -> Self {
        self.expiration_days = days;
        self
    }

    /// Set whether a missing bucket is created
    pub fn with_create_bucket(mut self, create: bool) -> Self {
        self.create_bucket = create;
        self
    }

    /// Set explicit credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Check that the options can be used
    pub fn validate(&self) -> Result<()> {
        self.encoding.parse::<Encoding>()?;
        if let Some(content_type) = &self.content_type {
            if content_type.trim().is_empty() {
                return Err(BlobError::Config("content_type must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Parse options from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let options: OpenOptions = toml::from_str(contents)
            .map_err(|e| BlobError::Config(format!("Failed to parse options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Save options to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BlobError::Config(format!("Failed to serialize options: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example configuration file content
    pub fn default_config_content() -> String {
        r#"# blobfile options

# Text codec for text-mode handles: utf-8, latin-1, ascii
encoding = "utf-8"

# Access policy applied on every push: "private" or "public-read"
access = "public-read"

# Content type sent with every push
# content_type = "text/plain"

# Adds Expires and Cache-Control: max-age headers (0 disables)
expiration_days = 0

# Create the bucket (or directory for file:// URLs) when missing
create_bucket = true

# Explicit credentials; omit to use the environment
# [credentials]
# access_key_id = "AKIA..."
# secret_access_key = "..."
# region = "us-east-1"
"#
        .to_string()
    }
}

/// Static credentials for a store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Region, when the store needs one
    #[serde(default)]
    pub region: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = OpenOptions::default();
        assert_eq!(options.encoding, "utf-8");
        assert_eq!(options.access, AccessPolicy::PublicRead);
        assert_eq!(options.expiration_days, 0);
        assert!(options.create_bucket);
        assert!(options.credentials.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_default_config_content_parses() {
        let options = OpenOptions::from_toml_str(&OpenOptions::default_config_content()).unwrap();
        assert_eq!(options, OpenOptions::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options = OpenOptions::from_toml_str(
            r#"
access = "private"
expiration_days = 7
"#,
        )
        .unwrap();
        assert_eq!(options.access, AccessPolicy::Private);
        assert_eq!(options.expiration_days, 7);
        assert_eq!(options.encoding, "utf-8");
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let err = OpenOptions::from_toml_str(r#"encoding = "ebcdic""#).unwrap_err();
        assert!(matches!(err, BlobError::Codec(_)));
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = OpenOptions::from_toml_str("expiration_days = \"soon\"").unwrap_err();
        assert!(matches!(err, BlobError::Config(_)));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            region: None,
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }
}
