//! courier-fleet - fleet identity & artifact distribution engine
//!
//! maps a mutable, hand-maintained inventory of lab instrument computers
//! onto immutable cloud identities that survive renames, and builds
//! content-addressed, reproducibly-hashed agent packages for pull-based
//! distribution with idempotent publication.
//!
//! # Core concepts
//!
//! - **Immutable identifier**: the permanent key tying all of a node's
//!   cloud-side state together across renames; derived from the name and
//!   site the node was *first* provisioned under.
//! - **Resource name / alias**: the display name, which moves with renames.
//! - **Built package**: a flat archive with pinned entry metadata, so
//!   identical inputs hash identically on any machine at any time.
//! - **Release**: an archive plus its versioned manifest, published as one
//!   unit (archive strictly first) so a visible manifest always resolves.
//!
//! # Example usage
//!
//! ```
//! use courier_fleet::{IdentityResolver, NodeIdentity, NodeLocation};
//!
//! let node = NodeIdentity::new("Cytation-5", NodeLocation::new("Cambridge"));
//! let resolved = IdentityResolver::new().resolve(&node).unwrap();
//!
//! assert_eq!(resolved.resource_name, "cambridge--cytation-5");
//! assert_eq!(resolved.immutable_id, "cambridge--cytation-5");
//! ```

mod config;
mod courier;
mod error;
mod hash;
mod identity;

pub mod activation;
pub mod alerting;
pub mod commands;
pub mod convergence;
pub mod package;
pub mod policy;
pub mod publish;
pub mod scripts;
pub mod store;

pub use config::{DeploymentConfig, FleetConfig};
pub use courier::{
    AppConfig, FolderWatch, ALIAS_PARAMETER_PREFIX, APPLICATION_NAME, CONFIG_FORMAT_VERSION,
    DESTINATION_PLACEHOLDER, HEARTBEAT_METRIC, HEARTBEAT_NAMESPACE, NODE_DIMENSION,
    PARAMETER_PREFIX,
};
pub use error::{Error, Result};
pub use hash::{digest_bytes, digest_file, ContentDigest};
pub use identity::{
    AlertingConfig, IdentityResolver, NodeIdentity, NodeLocation, ResolvedIdentity,
};
