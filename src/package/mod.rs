//! deterministic agent package assembly and its distribution manifest

mod builder;
mod manifest;
mod source;

pub use builder::{build, BuiltPackage, PackageSpec, PACKAGE_BASE_NAME};
pub use manifest::{
    Checksums, FileEntry, Manifest, PackageRef, ARCH_X86_64, MANIFEST_FILE_NAME,
    MANIFEST_SCHEMA_VERSION, PLATFORM_WINDOWS,
};
pub use source::{PackageFile, CONTENT_SCHEME};
