//! idempotent artifact publication
//!
//! uploads are a create/delete pair keyed by the remote key, with the
//! content digest as part of the effective input: a byte-identical re-run
//! is a no-op, any content change is a delete-then-recreate, and nothing is
//! ever updated in place. the decision (plan) is pure; the effect (apply)
//! is one explicit step.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{IoResultExt, Result};
use crate::hash::{digest_file, ContentDigest};
use crate::package::{BuiltPackage, Manifest, MANIFEST_FILE_NAME, PACKAGE_BASE_NAME};
use crate::store::ObjectStore;

/// a local artifact destined for a remote key
#[derive(Clone, Debug)]
pub struct UploadSpec {
    pub bucket: String,
    pub key: String,
    pub local_path: PathBuf,
    pub digest: ContentDigest,
    /// release history is append-only: retained artifacts survive teardown
    pub retain_on_destroy: bool,
}

impl UploadSpec {
    /// spec for a local file, digesting its current content
    pub fn from_file(
        bucket: impl Into<String>,
        key: impl Into<String>,
        local_path: impl Into<PathBuf>,
        retain_on_destroy: bool,
    ) -> Result<Self> {
        let local_path = local_path.into();
        let digest = digest_file(&local_path)?;
        Ok(Self {
            bucket: bucket.into(),
            key: key.into(),
            local_path,
            digest,
            retain_on_destroy,
        })
    }
}

/// what a publish run will do for one artifact
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadAction {
    /// remote already holds this digest
    Skip,
    /// remote key is absent
    Create,
    /// remote content differs: delete, then recreate
    Replace,
}

/// pure change detection against the remote digest
pub fn plan_upload<S: ObjectStore>(store: &S, spec: &UploadSpec) -> Result<UploadAction> {
    match store.digest(&spec.bucket, &spec.key)? {
        None => Ok(UploadAction::Create),
        Some(remote) if remote == spec.digest => Ok(UploadAction::Skip),
        Some(_) => Ok(UploadAction::Replace),
    }
}

/// apply a planned action
///
/// replace deletes before writing, so a reused key never holds two
/// generations at once.
pub fn apply_upload<S: ObjectStore>(
    store: &mut S,
    spec: &UploadSpec,
    action: UploadAction,
) -> Result<()> {
    match action {
        UploadAction::Skip => {
            debug!(key = %spec.key, digest = %spec.digest, "content unchanged, skipping upload");
            Ok(())
        }
        UploadAction::Create => put_file(store, spec),
        UploadAction::Replace => {
            store.delete(&spec.bucket, &spec.key)?;
            put_file(store, spec)
        }
    }
}

fn put_file<S: ObjectStore>(store: &mut S, spec: &UploadSpec) -> Result<()> {
    let bytes = fs::read(&spec.local_path).with_path(&spec.local_path)?;
    store.put(&spec.bucket, &spec.key, &bytes)?;
    debug!(key = %spec.key, bytes = bytes.len(), digest = %spec.digest, "uploaded");
    Ok(())
}

/// plan and apply in one call, returning the action taken
pub fn publish_file<S: ObjectStore>(store: &mut S, spec: &UploadSpec) -> Result<UploadAction> {
    let action = plan_upload(store, spec)?;
    apply_upload(store, spec, action)?;
    Ok(action)
}

/// remove an artifact on stack teardown, honoring retention
///
/// returns whether a delete was issued.
pub fn retire<S: ObjectStore>(store: &mut S, spec: &UploadSpec) -> Result<bool> {
    if spec.retain_on_destroy {
        debug!(key = %spec.key, "retained on destroy");
        return Ok(false);
    }
    store.delete(&spec.bucket, &spec.key)?;
    Ok(true)
}

/// remote key prefix under which one package version's artifacts live
pub fn release_prefix(version: &str) -> String {
    format!("{PACKAGE_BASE_NAME}/v{version}")
}

/// a package archive and the manifest describing it, published as one unit
#[derive(Clone, Debug)]
pub struct Release {
    pub archive: UploadSpec,
    pub manifest: UploadSpec,
}

impl Release {
    /// write the manifest next to the built archive and pair both for
    /// publication under the versioned release prefix
    pub fn stage(built: &BuiltPackage, manifest: &Manifest, bucket: &str) -> Result<Self> {
        let manifest_path = built.staging_dir.join(MANIFEST_FILE_NAME);
        fs::write(&manifest_path, manifest.to_json()?).with_path(&manifest_path)?;

        let prefix = release_prefix(&manifest.version);
        let archive = UploadSpec {
            bucket: bucket.to_string(),
            key: format!("{prefix}/{}", built.archive_name),
            local_path: built.archive_path.clone(),
            digest: built.digest,
            retain_on_destroy: true,
        };
        let manifest = UploadSpec::from_file(
            bucket,
            format!("{prefix}/{MANIFEST_FILE_NAME}"),
            manifest_path,
            true,
        )?;

        Ok(Self { archive, manifest })
    }
}

/// actions taken for the two halves of a release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub archive: UploadAction,
    pub manifest: UploadAction,
}

/// publish archive strictly before manifest
///
/// a consumer that can see the manifest can therefore always resolve the
/// archive it references; if the archive upload fails, the manifest is
/// never touched.
pub fn publish_release<S: ObjectStore>(store: &mut S, release: &Release) -> Result<ReleaseOutcome> {
    let archive = publish_file(store, &release.archive)?;
    let manifest = publish_file(store, &release.manifest)?;
    info!(
        archive = %release.archive.key,
        manifest = %release.manifest.key,
        "release published"
    );
    Ok(ReleaseOutcome { archive, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    fn spec_for(path: &std::path::Path, key: &str, retain: bool) -> UploadSpec {
        UploadSpec::from_file("bucket", key, path, retain).unwrap()
    }

    /// store double that records the order of mutating calls
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        ops: Vec<String>,
        fail_on_put: Option<String>,
    }

    impl ObjectStore for RecordingStore {
        fn put(&mut self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
            if self.fail_on_put.as_deref() == Some(key) {
                return Err(Error::Upload {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: "simulated transport failure".to_string(),
                });
            }
            self.ops.push(format!("put {key}"));
            self.inner.put(bucket, key, bytes)
        }

        fn delete(&mut self, bucket: &str, key: &str) -> Result<()> {
            self.ops.push(format!("delete {key}"));
            self.inner.delete(bucket, key)
        }

        fn digest(&self, bucket: &str, key: &str) -> Result<Option<ContentDigest>> {
            self.inner.digest(bucket, key)
        }
    }

    #[test]
    fn test_publish_create_then_skip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"v1").unwrap();

        let mut store = MemoryStore::new();
        let spec = spec_for(&path, "prefix/artifact.bin", true);

        assert_eq!(publish_file(&mut store, &spec).unwrap(), UploadAction::Create);
        // byte-identical re-run is a no-op
        assert_eq!(publish_file(&mut store, &spec).unwrap(), UploadAction::Skip);
        assert_eq!(store.object("bucket", "prefix/artifact.bin").unwrap(), b"v1");
    }

    #[test]
    fn test_publish_replace_deletes_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"v1").unwrap();

        let mut store = RecordingStore::default();
        publish_file(&mut store, &spec_for(&path, "k", true)).unwrap();

        std::fs::write(&path, b"v2").unwrap();
        let action = publish_file(&mut store, &spec_for(&path, "k", true)).unwrap();

        assert_eq!(action, UploadAction::Replace);
        assert_eq!(store.ops, ["put k", "delete k", "put k"]);
        assert_eq!(store.inner.object("bucket", "k").unwrap(), b"v2");
    }

    #[test]
    fn test_plan_is_pure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"v1").unwrap();

        let store = MemoryStore::new();
        let spec = spec_for(&path, "k", true);

        assert_eq!(plan_upload(&store, &spec).unwrap(), UploadAction::Create);
        // planning alone must not touch the store
        assert!(store.is_empty());
    }

    #[test]
    fn test_retire_honors_retention() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("artifact.bin");
        std::fs::write(&path, b"v1").unwrap();

        let mut store = MemoryStore::new();

        let retained = spec_for(&path, "release/artifact.bin", true);
        publish_file(&mut store, &retained).unwrap();
        assert!(!retire(&mut store, &retained).unwrap());
        assert!(store.contains("bucket", "release/artifact.bin"));

        let ephemeral = spec_for(&path, "scratch/artifact.bin", false);
        publish_file(&mut store, &ephemeral).unwrap();
        assert!(retire(&mut store, &ephemeral).unwrap());
        assert!(!store.contains("bucket", "scratch/artifact.bin"));
    }

    #[test]
    fn test_release_archive_before_manifest() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("pkg.zip");
        let manifest = dir.path().join("manifest.json");
        std::fs::write(&archive, b"archive bytes").unwrap();
        std::fs::write(&manifest, b"{}").unwrap();

        let release = Release {
            archive: spec_for(&archive, "v1/pkg.zip", true),
            manifest: spec_for(&manifest, "v1/manifest.json", true),
        };

        let mut store = RecordingStore::default();
        publish_release(&mut store, &release).unwrap();

        assert_eq!(store.ops, ["put v1/pkg.zip", "put v1/manifest.json"]);
    }

    #[test]
    fn test_failed_archive_leaves_manifest_unpublished() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("pkg.zip");
        let manifest = dir.path().join("manifest.json");
        std::fs::write(&archive, b"archive bytes").unwrap();
        std::fs::write(&manifest, b"{}").unwrap();

        let release = Release {
            archive: spec_for(&archive, "v1/pkg.zip", true),
            manifest: spec_for(&manifest, "v1/manifest.json", true),
        };

        let mut store = RecordingStore {
            fail_on_put: Some("v1/pkg.zip".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            publish_release(&mut store, &release),
            Err(Error::Upload { .. })
        ));
        assert!(!store.inner.contains("bucket", "v1/manifest.json"));
    }

    #[test]
    fn test_release_prefix() {
        assert_eq!(release_prefix("0.0.3"), "cloud-courier-agent/v0.0.3");
    }
}
