//! versioned distribution manifest
//!
//! the JSON shape here is an external contract: the pull-based
//! distribution mechanism and every agent installation parse exactly these
//! fields. one manifest exists per package version and is never edited
//! after publication; new versions get new manifests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::package::builder::BuiltPackage;

/// current manifest schema
pub const MANIFEST_SCHEMA_VERSION: &str = "2.0";

/// file name the manifest is published under, next to its archive
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

pub const PLATFORM_WINDOWS: &str = "windows";
pub const ARCH_X86_64: &str = "x86_64";

/// reference to the archive serving one platform/arch pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    pub file: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    pub sha256: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub checksums: Checksums,
}

/// manifest describing one package version
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    pub version: String,
    /// platform -> arch -> archive reference
    pub packages: BTreeMap<String, BTreeMap<String, PackageRef>>,
    /// archive file name -> integrity checksums
    pub files: BTreeMap<String, FileEntry>,
}

impl Manifest {
    /// manifest for a built package; pure over the archive name and digest
    pub fn for_package(built: &BuiltPackage) -> Self {
        let mut arch = BTreeMap::new();
        arch.insert(
            ARCH_X86_64.to_string(),
            PackageRef {
                file: built.archive_name.clone(),
            },
        );

        let mut packages = BTreeMap::new();
        packages.insert(PLATFORM_WINDOWS.to_string(), arch);

        let mut files = BTreeMap::new();
        files.insert(
            built.archive_name.clone(),
            FileEntry {
                checksums: Checksums {
                    sha256: built.digest.to_hex(),
                },
            },
        );

        Self {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            version: built.version.clone(),
            packages,
            files,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// archive file name serving a platform/arch pair, if any
    pub fn archive_file(&self, platform: &str, arch: &str) -> Option<&str> {
        self.packages
            .get(platform)
            .and_then(|archs| archs.get(arch))
            .map(|r| r.file.as_str())
    }

    /// published sha256 for an archive file, if any
    pub fn sha256(&self, file: &str) -> Option<&str> {
        self.files.get(file).map(|e| e.checksums.sha256.as_str())
    }
}
