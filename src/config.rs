//! fleet inventory file loading
//!
//! the inventory is a hand-maintained TOML file: deployment settings plus
//! one record per physical node. the core operates on the in-memory
//! records; this module is the optional loading layer in front of it and
//! rejects malformed watch patterns before anything reaches the resolver.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convergence::FleetContext;
use crate::error::{IoResultExt, Result};
use crate::identity::{IdentityResolver, NodeIdentity};

/// deployment-wide settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub region: String,
    pub data_bucket: String,
    pub logs_bucket: String,
    pub packages_bucket: String,
    /// qualifier appended to every cloud-side name; lets two deployments
    /// of the same inventory coexist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

/// the on-disk inventory
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FleetConfig {
    pub deployment: DeploymentConfig,
    #[serde(default)]
    pub nodes: Vec<NodeIdentity>,
}

impl FleetConfig {
    /// load and validate an inventory file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: FleetConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// save the inventory
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            for watch in node.folders_to_watch.values() {
                watch.validate_patterns()?;
            }
        }
        Ok(())
    }

    pub fn context(&self) -> FleetContext {
        FleetContext {
            data_bucket: self.deployment.data_bucket.clone(),
            logs_bucket: self.deployment.logs_bucket.clone(),
            packages_bucket: self.deployment.packages_bucket.clone(),
            region: self.deployment.region.clone(),
        }
    }

    pub fn resolver(&self) -> IdentityResolver {
        match &self.deployment.suffix {
            Some(suffix) => IdentityResolver::with_suffix(suffix.clone()),
            None => IdentityResolver::new(),
        }
    }
}
