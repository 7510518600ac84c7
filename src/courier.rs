//! models and constants shared with the on-node courier agent
//!
//! everything in this module is a cross-process contract: the agent parses
//! the folder-watch JSON published for it and reports heartbeats into the
//! namespace below, so field names and values here cannot change freely.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// root of the parameter tree the agent polls for its configuration
pub const PARAMETER_PREFIX: &str = "/cloud-courier";

/// parameter tree mapping immutable identifiers to current aliases
pub const ALIAS_PARAMETER_PREFIX: &str = "/cloud-courier/computer-aliases";

/// metric namespace the agent reports heartbeats into
pub const HEARTBEAT_NAMESPACE: &str = "CloudCourier/Heartbeat";

/// heartbeat metric name
pub const HEARTBEAT_METRIC: &str = "Heartbeat";

/// metric dimension carrying the node's immutable identifier
pub const NODE_DIMENSION: &str = "NodeRoleName";

/// value of the fixed Application metric dimension
pub const APPLICATION_NAME: &str = "CloudCourier";

/// format version stamped into every config payload the agent reads
pub const CONFIG_FORMAT_VERSION: &str = "1.0";

/// destination fields before the convergence pass fills them in
pub const DESTINATION_PLACEHOLDER: &str = "will-be-filled-in-by-other-code";

fn default_format_version() -> String {
    CONFIG_FORMAT_VERSION.to_string()
}

fn default_recursive() -> bool {
    true
}

fn default_file_pattern() -> String {
    "*".to_string()
}

fn default_destination() -> String {
    DESTINATION_PLACEHOLDER.to_string()
}

fn default_config_refresh() -> u32 {
    60
}

fn default_heartbeat_frequency() -> u32 {
    60
}

/// one folder the agent watches and uploads from
///
/// `s3_bucket_name` and `s3_key_prefix` start as placeholders; the
/// convergence pass fills them from the resolved data bucket and the node's
/// *current* resource name, never from the immutable identifier, so bucket
/// browsers see the current human name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FolderWatch {
    #[serde(default = "default_format_version")]
    pub config_format_version: String,
    pub folder_path: String,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_destination")]
    pub s3_key_prefix: String,
    #[serde(default = "default_destination")]
    pub s3_bucket_name: String,
}

impl FolderWatch {
    /// watch a folder with default pattern and recursion settings
    pub fn new(folder_path: impl Into<String>) -> Self {
        Self {
            config_format_version: default_format_version(),
            folder_path: folder_path.into(),
            recursive: true,
            file_pattern: default_file_pattern(),
            ignore_patterns: Vec::new(),
            s3_key_prefix: default_destination(),
            s3_bucket_name: default_destination(),
        }
    }

    /// copy of this watch with the upload destination filled in
    pub fn with_destination(&self, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let mut filled = self.clone();
        filled.s3_bucket_name = bucket.into();
        filled.s3_key_prefix = prefix.into();
        filled
    }

    /// check that the file pattern and every ignore pattern parse as globs
    pub fn validate_patterns(&self) -> Result<()> {
        for pattern in std::iter::once(&self.file_pattern).chain(self.ignore_patterns.iter()) {
            glob::Pattern::new(pattern).map_err(|e| Error::InvalidFilePattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// agent-level settings published alongside the folder watches
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_format_version")]
    pub config_format_version: String,
    #[serde(default = "default_config_refresh")]
    pub config_refresh_frequency_minutes: u32,
    /// if it's been this long since the last heartbeat, send another one
    #[serde(default = "default_heartbeat_frequency")]
    pub heartbeat_frequency_seconds: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_format_version: default_format_version(),
            config_refresh_frequency_minutes: default_config_refresh(),
            heartbeat_frequency_seconds: default_heartbeat_frequency(),
        }
    }
}
