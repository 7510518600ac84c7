use std::path::PathBuf;

/// error type for fleet provisioning and distribution operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid rename state for node '{name}': {reason}")]
    InvalidIdentity { name: String, reason: String },

    #[error("duplicate immutable identifier '{identifier}': resolved by both '{first}' and '{second}'")]
    DuplicateIdentity {
        identifier: String,
        first: String,
        second: String,
    },

    #[error("unsupported artifact source '{0}': only s3:// URLs are supported")]
    UnsupportedSource(String),

    #[error("upload of '{key}' to bucket '{bucket}' failed: {message}")]
    Upload {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("object not found in store: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("package '{0}' declares no payload files")]
    EmptyPackage(String),

    #[error("invalid digest hex: {0}")]
    InvalidDigestHex(String),

    #[error("invalid file pattern '{pattern}': {message}")]
    InvalidFilePattern { pattern: String, message: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error at {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
