//! declared source files pulled into a distribution package

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::SourceStore;

/// the only source scheme the builder can fetch from
pub const CONTENT_SCHEME: &str = "s3://";

/// a file to package: where it comes from, what it is named in the archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    pub source: String,
    pub local_name: String,
}

impl PackageFile {
    pub fn new(source: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            local_name: local_name.into(),
        }
    }

    /// split the content-store URL into (bucket, key)
    pub fn content_location(&self) -> Result<(String, String)> {
        let rest = self
            .source
            .strip_prefix(CONTENT_SCHEME)
            .ok_or_else(|| Error::UnsupportedSource(self.source.clone()))?;

        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| Error::UnsupportedSource(self.source.clone()))?;

        if bucket.is_empty() || key.is_empty() {
            return Err(Error::UnsupportedSource(self.source.clone()));
        }

        Ok((bucket.to_string(), key.to_string()))
    }

    /// fetch the declared bytes from the content store
    pub fn fetch<S: SourceStore>(&self, store: &S) -> Result<Vec<u8>> {
        let (bucket, key) = self.content_location()?;
        store.fetch(&bucket, &key)
    }
}
