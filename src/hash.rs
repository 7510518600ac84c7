use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, IoResultExt, Result};

/// read size for streaming file digests
const BLOCK_SIZE: usize = 4096;

/// SHA-256 content digest used for change detection and manifest checksums
///
/// depends only on byte content, never on file metadata, so the same bytes
/// digest identically across platforms and across runs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// parse from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidDigestHex(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidDigestHex(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", &self.to_hex()[..12])
    }
}

impl Serialize for ContentDigest {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// digest a file's content with fixed-size block reads
pub fn digest_file(path: &Path) -> Result<ContentDigest> {
    let mut file = File::open(path).with_path(path)?;
    let mut hasher = Sha256::new();
    let mut block = [0u8; BLOCK_SIZE];

    loop {
        let n = file.read(&mut block).with_path(path)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }

    Ok(ContentDigest(hasher.finalize().into()))
}

/// digest an in-memory byte slice
pub fn digest_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest(Sha256::digest(data).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_digest_hex_roundtrip() {
        let original =
            ContentDigest::from_hex("abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789")
                .unwrap();
        let hex = original.to_hex();
        let parsed = ContentDigest::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_digest_invalid_hex() {
        assert!(ContentDigest::from_hex("not valid hex").is_err());
        assert!(ContentDigest::from_hex("abcd").is_err()); // too short
        assert!(ContentDigest::from_hex(
            "abcdef0123456789abcdef0123456789abcdef0123456789abcdef0123456789ff"
        )
        .is_err()); // too long
    }

    #[test]
    fn test_digest_file_deterministic_across_files() {
        let dir = tempdir().unwrap();

        // same bytes in two different files digest identically
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"same content").unwrap();
        std::fs::write(&b, b"same content").unwrap();

        assert_eq!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn test_digest_file_single_byte_change() {
        let dir = tempdir().unwrap();

        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"content aaaa").unwrap();
        std::fs::write(&b, b"content aaab").unwrap();

        assert_ne!(digest_file(&a).unwrap(), digest_file(&b).unwrap());
    }

    #[test]
    fn test_digest_file_independent_of_mtime() {
        let dir = tempdir().unwrap();

        let path = dir.path().join("file.bin");
        std::fs::write(&path, b"stable").unwrap();
        let first = digest_file(&path).unwrap();

        // rewrite the same bytes (fresh mtime)
        std::fs::write(&path, b"stable").unwrap();
        let second = digest_file(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_digest_file_larger_than_block() {
        let dir = tempdir().unwrap();

        let path = dir.path().join("big.bin");
        let data = vec![0x5au8; BLOCK_SIZE * 3 + 17];
        std::fs::write(&path, &data).unwrap();

        assert_eq!(digest_file(&path).unwrap(), digest_bytes(&data));
    }

    #[test]
    fn test_digest_bytes_matches_file() {
        let dir = tempdir().unwrap();

        let path = dir.path().join("file.bin");
        std::fs::write(&path, b"hello").unwrap();

        assert_eq!(digest_file(&path).unwrap(), digest_bytes(b"hello"));
    }

    #[test]
    fn test_digest_serde_json() {
        let digest = digest_bytes(b"payload");
        let json = serde_json::to_string(&digest).unwrap();
        let parsed: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(digest, parsed);
    }
}
