//! Common assertions for blobfile testing

use crate::TestBucket;
use anyhow::{bail, Result};
use object_store::Attribute;

/// Asserts that `key` holds exactly `expected`
pub fn assert_object_eq(bucket: &TestBucket, key: &str, expected: &[u8]) -> Result<()> {
    match bucket.contents(key)? {
        Some(actual) => {
            assert_eq!(
                actual,
                expected,
                "Content mismatch for {}: {:?} vs {:?}",
                key,
                String::from_utf8_lossy(&actual),
                String::from_utf8_lossy(expected)
            );
            Ok(())
        }
        None => bail!("Object {} does not exist", key),
    }
}

/// Asserts that `key` was never written
pub fn assert_object_missing(bucket: &TestBucket, key: &str) -> Result<()> {
    if let Some(actual) = bucket.contents(key)? {
        bail!("Object {} exists with {} bytes", key, actual.len());
    }
    Ok(())
}

/// Asserts that `key` carries `attribute` with the given value
pub fn assert_attribute(
    bucket: &TestBucket,
    key: &str,
    attribute: &Attribute,
    expected: &str,
) -> Result<()> {
    let actual = bucket.attribute(key, attribute)?;
    assert_eq!(
        actual.as_deref(),
        Some(expected),
        "Attribute {:?} mismatch for {}",
        attribute,
        key
    );
    Ok(())
}

/// Asserts that `key` was stored with the given access policy
pub fn assert_acl(bucket: &TestBucket, key: &str, expected: &str) -> Result<()> {
    assert_attribute(bucket, key, &Attribute::Metadata("acl".into()), expected)
}
