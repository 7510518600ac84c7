//! deterministic package assembly
//!
//! a build stages generated scripts and fetched binaries into a
//! per-version directory, then writes one flat archive with every entry's
//! metadata pinned to fixed constants. identical inputs therefore produce
//! a bit-identical archive whatever the wall clock or filesystem says,
//! which is what keeps re-provisioning from spuriously redistributing.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{digest_file, ContentDigest};
use crate::package::source::PackageFile;
use crate::scripts::{install_script, uninstall_script, wrap_script};
use crate::store::SourceStore;

/// base name of every distribution package and archive
pub const PACKAGE_BASE_NAME: &str = "cloud-courier-agent";

const INSTALL_SCRIPT_NAME: &str = "install.ps1";
const UNINSTALL_SCRIPT_NAME: &str = "uninstall.ps1";

/// inputs for one package version
#[derive(Clone, Debug)]
pub struct PackageSpec {
    /// semantic version string
    pub version: String,
    /// region baked into the generated install script
    pub region: String,
    /// binaries to fetch and bundle; the first is the agent payload the
    /// install script extracts
    pub files: Vec<PackageFile>,
}

impl PackageSpec {
    pub fn new(version: impl Into<String>, region: impl Into<String>, files: Vec<PackageFile>) -> Self {
        Self {
            version: version.into(),
            region: region.into(),
            files,
        }
    }

    /// name of the per-version staging area
    pub fn resource_name(&self) -> String {
        format!("{PACKAGE_BASE_NAME}-{}", self.version)
    }

    /// name of the produced archive
    pub fn archive_name(&self) -> String {
        format!("{}_WINDOWS.zip", self.resource_name())
    }
}

/// result of a deterministic build
#[derive(Debug)]
pub struct BuiltPackage {
    pub version: String,
    /// per-version staging area holding the archive and its inputs
    pub staging_dir: PathBuf,
    pub archive_path: PathBuf,
    pub archive_name: String,
    /// digest of the archive bytes; the manifest checksum and the
    /// publisher's change-detection input
    pub digest: ContentDigest,
    /// archive entries, in order
    pub staged_files: Vec<String>,
}

/// build one package version into `staging_root`
///
/// the staging area is isolated per version, so concurrent builds of
/// different versions never share state.
pub fn build<S: SourceStore>(
    spec: &PackageSpec,
    source: &S,
    staging_root: &Path,
) -> Result<BuiltPackage> {
    let payload = spec
        .files
        .first()
        .ok_or_else(|| Error::EmptyPackage(spec.resource_name()))?
        .local_name
        .clone();

    let staging_dir = staging_root.join(spec.resource_name());
    fs::create_dir_all(&staging_dir).with_path(&staging_dir)?;

    let install_path = staging_dir.join(INSTALL_SCRIPT_NAME);
    fs::write(&install_path, wrap_script(&install_script(&spec.region, &payload)))
        .with_path(&install_path)?;

    let uninstall_path = staging_dir.join(UNINSTALL_SCRIPT_NAME);
    fs::write(&uninstall_path, wrap_script(&uninstall_script())).with_path(&uninstall_path)?;

    let mut staged_files = vec![
        INSTALL_SCRIPT_NAME.to_string(),
        UNINSTALL_SCRIPT_NAME.to_string(),
    ];

    for file in &spec.files {
        let bytes = file.fetch(source)?;
        let local_path = staging_dir.join(&file.local_name);
        fs::write(&local_path, &bytes).with_path(&local_path)?;
        debug!(source = %file.source, name = %file.local_name, bytes = bytes.len(), "staged package file");
        staged_files.push(file.local_name.clone());
    }

    let archive_name = spec.archive_name();
    let archive_path = staging_dir.join(&archive_name);
    write_archive(&archive_path, &staging_dir, &staged_files)?;

    let digest = digest_file(&archive_path)?;
    info!(version = %spec.version, archive = %archive_name, %digest, "package built");

    Ok(BuiltPackage {
        version: spec.version.clone(),
        staging_dir,
        archive_path,
        archive_name,
        digest,
        staged_files,
    })
}

/// write a flat archive with pinned entry metadata
///
/// entry timestamps are forced to the archive format's fixed epoch and
/// permissions to one constant; entries appear in staged order.
fn write_archive(archive_path: &Path, staging_dir: &Path, names: &[String]) -> Result<()> {
    let archive_error = |source| Error::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::create(archive_path).with_path(archive_path)?;
    let mut writer = ZipWriter::new(file);

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    for name in names {
        writer.start_file(name.as_str(), options).map_err(archive_error)?;
        let entry_path = staging_dir.join(name);
        let bytes = fs::read(&entry_path).with_path(&entry_path)?;
        writer.write_all(&bytes).with_path(archive_path)?;
    }

    writer.finish().map_err(archive_error)?;
    Ok(())
}
