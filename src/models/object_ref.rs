//! Represents a stored object addressed by bucket and key.

use std::fmt;

/// A single object location in the store.
///
/// Displays as `bucket/key`, which is also the form used in copy log lines.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    /// Bucket holding the object.
    pub bucket: String,

    /// Object key (path-like identifier within the bucket).
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Value for the `x-amz-copy-source` header: `bucket/key` with the key
    /// URL-encoded so spaces, `=` and other reserved characters survive.
    pub fn copy_source(&self) -> String {
        format!("{}/{}", self.bucket, urlencoding::encode(&self.key))
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_bucket_slash_key() {
        let obj = ObjectRef::new("source", "123456789/cur/report/file.parquet");
        assert_eq!(obj.to_string(), "source/123456789/cur/report/file.parquet");
    }

    #[test]
    fn copy_source_encodes_reserved_characters() {
        let obj = ObjectRef::new("source", "base/Existing CUR/year=2024/file.parquet");
        assert_eq!(
            obj.copy_source(),
            "source/base%2FExisting%20CUR%2Fyear%3D2024%2Ffile.parquet"
        );
    }
}
