//! node identity model and the resolver that keeps it stable across renames
//!
//! every cloud object tied to a node is keyed by its immutable identifier,
//! derived from the name/location the node was *first* provisioned under.
//! the human-editable inventory may rename or relocate a node at any time;
//! as long as the edit records the previous values in `original_name` /
//! `original_location`, the immutable identifier resolves unchanged and no
//! history is orphaned.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::courier::{AppConfig, FolderWatch};
use crate::error::{Error, Result};

/// a physical site hosting instrument computers
///
/// equality and hashing are case-insensitive: `canonical()` is the only
/// form identifiers are ever derived from, so "Cambridge" and "cambridge"
/// name the same site.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeLocation {
    name: String,
}

impl NodeLocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// the name as written in the inventory
    pub fn name(&self) -> &str {
        &self.name
    }

    /// lower-cased form used for identifier derivation
    pub fn canonical(&self) -> String {
        self.name.to_lowercase()
    }
}

impl PartialEq for NodeLocation {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for NodeLocation {}

impl Hash for NodeLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for NodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

fn default_alert_timeout() -> u32 {
    300
}

/// who to notify when a node's heartbeat goes silent, and after how long
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertingConfig {
    #[serde(default)]
    pub emails: BTreeSet<String>,
    /// how long to wait without seeing a heartbeat before alerting
    #[serde(default = "default_alert_timeout")]
    pub timeout_seconds: u32,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            emails: BTreeSet::new(),
            timeout_seconds: default_alert_timeout(),
        }
    }
}

/// the canonical inventory record for one instrument computer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// current human label
    pub name: String,
    /// current site
    pub location: NodeLocation,
    /// previous label, set only after a rename (both-or-neither with
    /// `original_location`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// previous site, set only after a relocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_location: Option<NodeLocation>,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub folders_to_watch: BTreeMap<String, FolderWatch>,
}

impl NodeIdentity {
    /// a fresh record with defaults for everything but the identity itself
    pub fn new(name: impl Into<String>, location: NodeLocation) -> Self {
        Self {
            name: name.into(),
            location,
            original_name: None,
            original_location: None,
            alerting: AlertingConfig::default(),
            app: AppConfig::default(),
            folders_to_watch: BTreeMap::new(),
        }
    }

    /// display name derived from the *current* name and site
    pub fn resource_name(&self) -> String {
        format!("{}--{}", self.location.canonical(), self.name.to_lowercase())
    }

    /// object-store key prefix for the node's current name; new uploads land
    /// here while credentials stay keyed to the immutable identifier
    pub fn upload_prefix(&self) -> String {
        format!("{}/{}", self.location.canonical(), self.name.to_lowercase())
    }
}

/// the stable cloud-side names for one node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// current display name, moves with renames
    pub resource_name: String,
    /// resource name the node was first provisioned under
    pub original_resource_name: String,
    /// join key for all of the node's cloud-side history; never changes
    /// across the node's lifetime
    pub immutable_id: String,
    /// deployment-qualified pointer to the current resource name
    pub alias: String,
}

/// derives stable identifiers from inventory records
///
/// pure: no I/O, stable across repeated calls. the optional suffix is a
/// deployment qualifier appended to every cloud-side name so separate
/// deployments of the same inventory never collide.
#[derive(Clone, Debug, Default)]
pub struct IdentityResolver {
    suffix: Option<String>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suffix(suffix: impl Into<String>) -> Self {
        Self {
            suffix: Some(suffix.into()),
        }
    }

    fn suffixed(&self, base: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{base}--{suffix}"),
            None => base.to_string(),
        }
    }

    /// resolve one node's names, enforcing the both-or-neither rename rule
    pub fn resolve(&self, node: &NodeIdentity) -> Result<ResolvedIdentity> {
        let original_resource_name = match (&node.original_name, &node.original_location) {
            (None, None) => node.resource_name(),
            (Some(name), Some(location)) => {
                format!("{}--{}", location.canonical(), name.to_lowercase())
            }
            (Some(_), None) => {
                return Err(Error::InvalidIdentity {
                    name: node.name.clone(),
                    reason: "original_name is set but original_location is not".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(Error::InvalidIdentity {
                    name: node.name.clone(),
                    reason: "original_location is set but original_name is not".to_string(),
                })
            }
        };

        let resource_name = node.resource_name();
        Ok(ResolvedIdentity {
            immutable_id: self.suffixed(&original_resource_name),
            alias: self.suffixed(&resource_name),
            resource_name,
            original_resource_name,
        })
    }

    /// resolve every record, failing before returning anything if two
    /// records collide on the same immutable identifier
    ///
    /// callers must run this before any per-node side effect so a rejected
    /// inventory leaves no orphaned cloud objects.
    pub fn resolve_fleet(&self, nodes: &[NodeIdentity]) -> Result<Vec<ResolvedIdentity>> {
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();
        let mut resolved = Vec::with_capacity(nodes.len());

        for (index, node) in nodes.iter().enumerate() {
            let identity = self.resolve(node)?;
            if let Some(&first) = seen.get(&identity.immutable_id) {
                return Err(Error::DuplicateIdentity {
                    identifier: identity.immutable_id.clone(),
                    first: nodes[first].name.clone(),
                    second: node.name.clone(),
                });
            }
            seen.insert(identity.immutable_id.clone(), index);
            resolved.push(identity);
        }

        Ok(resolved)
    }
}
