//! one-time node registration bookkeeping
//!
//! whether a node has already been activated is explicit persisted state
//! keyed by immutable identifier, read and written by the convergence pass
//! itself, never re-queried from a live remote inventory mid-pass.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};

/// remote-management agent version the bootstrap script installs
pub const SETUP_AGENT_VERSION: &str = "3.3.1345.0";

/// persisted record of which nodes have completed first-time activation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationLedger {
    #[serde(default)]
    activated: BTreeSet<String>,
}

impl ActivationLedger {
    /// load the ledger; a missing file means no node has activated yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).with_path(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// persist via write-temp-then-rename so readers never see a torn file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content).with_path(&tmp_path)?;
        fs::rename(&tmp_path, path).with_path(path)?;
        Ok(())
    }

    pub fn is_activated(&self, immutable_id: &str) -> bool {
        self.activated.contains(immutable_id)
    }

    /// record a completed activation; returns false if already recorded
    pub fn mark_activated(&mut self, immutable_id: impl Into<String>) -> bool {
        self.activated.insert(immutable_id.into())
    }

    /// forget a node entirely, for inventory retirement
    pub fn retire(&mut self, immutable_id: &str) -> bool {
        self.activated.remove(immutable_id)
    }

    pub fn len(&self) -> usize {
        self.activated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activated.is_empty()
    }
}

/// one-time registration bootstrap for a freshly provisioned node
///
/// downloads the remote-management agent and registers it with the node's
/// activation credentials; emitted only for nodes the ledger has not seen.
pub fn activation_script(activation_id: &str, activation_code: &str, region: &str) -> String {
    [
        r"$dir = $env:TEMP + '/ssm'; ".to_string(),
        r"New-Item -ItemType directory -Path $dir -Force; ".to_string(),
        r"$setupExe = $dir + '/AmazonSSMAgentSetup.exe'; ".to_string(),
        r"cd $dir; ".to_string(),
        format!(
            r"(New-Object System.Net.WebClient).DownloadFile('https://amazon-ssm-{region}.s3.{region}.amazonaws.com/{SETUP_AGENT_VERSION}/windows_amd64/AmazonSSMAgentSetup.exe', $setupExe); "
        ),
        format!(
            r"Start-Process $setupExe -ArgumentList @('/q', '/log', 'install.log', 'CODE={activation_code}', 'ID={activation_id}', 'REGION={region}') -Wait; "
        ),
        r"Get-Service -Name 'AmazonSSMAgent';".to_string(),
    ]
    .concat()
}
