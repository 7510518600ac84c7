//! one declarative convergence pass over the fleet inventory
//!
//! the pass validates every identity before emitting anything, then maps
//! each node independently into the declarations, policies, and alarm the
//! provisioning layer applies. nodes share no mutable state, so per-node
//! planning is order-independent and safe to parallelize.

use serde::Serialize;
use tracing::{debug, info};

use crate::activation::ActivationLedger;
use crate::alerting::{heartbeat_alarm, HeartbeatAlarm};
use crate::courier::{ALIAS_PARAMETER_PREFIX, PARAMETER_PREFIX};
use crate::error::Result;
use crate::identity::{IdentityResolver, NodeIdentity, ResolvedIdentity};
use crate::policy::{derive_policies, NodePolicy};

/// resolved shared context for one pass
#[derive(Clone, Debug)]
pub struct FleetContext {
    /// bucket node agents upload instrument data into
    pub data_bucket: String,
    /// shared bucket for distribution command logs
    pub logs_bucket: String,
    /// bucket release archives and manifests are published to
    pub packages_bucket: String,
    pub region: String,
}

/// an opaque cloud object for the provisioning layer to create or update
///
/// `name` is the immutable identifier wherever history continuity matters;
/// only display-oriented values inside `properties` carry the current name.
#[derive(Clone, Debug, Serialize)]
pub struct ResourceDeclaration {
    pub kind: String,
    pub name: String,
    pub properties: serde_json::Value,
}

/// everything the provisioning layer needs for one node
#[derive(Debug)]
pub struct NodePlan {
    pub resolved: ResolvedIdentity,
    pub policies: Vec<NodePolicy>,
    pub alarm: HeartbeatAlarm,
    pub declarations: Vec<ResourceDeclaration>,
    /// true when the ledger has not seen this node: the caller should emit
    /// the one-time activation script
    pub needs_activation_script: bool,
}

/// plan the whole fleet
///
/// identity validation is all-or-nothing: a malformed or duplicate record
/// fails the pass before any node is planned, so a rejected inventory
/// leaves nothing to apply.
pub fn plan_fleet(
    resolver: &IdentityResolver,
    nodes: &[NodeIdentity],
    ctx: &FleetContext,
    ledger: &ActivationLedger,
) -> Result<Vec<NodePlan>> {
    let resolved = resolver.resolve_fleet(nodes)?;
    info!(nodes = nodes.len(), "fleet inventory validated");

    nodes
        .iter()
        .zip(resolved)
        .map(|(node, identity)| plan_node(node, identity, ctx, ledger))
        .collect()
}

fn plan_node(
    node: &NodeIdentity,
    resolved: ResolvedIdentity,
    ctx: &FleetContext,
    ledger: &ActivationLedger,
) -> Result<NodePlan> {
    let policies = derive_policies(node, &ctx.data_bucket, &ctx.logs_bucket);
    let alarm = heartbeat_alarm(node, &resolved);

    let mut declarations = vec![
        ResourceDeclaration {
            kind: "node-role".to_string(),
            name: resolved.immutable_id.clone(),
            properties: serde_json::json!({
                "policies": policies,
                "display_name": resolved.resource_name,
            }),
        },
        ResourceDeclaration {
            kind: "activation".to_string(),
            name: resolved.immutable_id.clone(),
            properties: serde_json::json!({
                "description": format!(
                    "For the computer originally named: {}.",
                    resolved.original_resource_name
                ),
                "registration_limit": 1,
                "tags": {
                    "original-computer-info": resolved.original_resource_name,
                    "installed-agent-version": "uninstalled",
                },
            }),
        },
        // immutable identifier -> current alias, for anything that only
        // knows the node's permanent key
        ResourceDeclaration {
            kind: "parameter".to_string(),
            name: format!("{ALIAS_PARAMETER_PREFIX}/{}", resolved.immutable_id),
            properties: serde_json::json!({ "value": resolved.alias }),
        },
        ResourceDeclaration {
            kind: "heartbeat-alarm".to_string(),
            name: resolved.immutable_id.clone(),
            properties: serde_json::to_value(&alarm)?,
        },
    ];

    for (descriptor, watch) in &node.folders_to_watch {
        let filled = watch.with_destination(&ctx.data_bucket, node.upload_prefix());
        declarations.push(ResourceDeclaration {
            kind: "parameter".to_string(),
            name: format!("{PARAMETER_PREFIX}/{}/folders/{descriptor}", resolved.alias),
            properties: serde_json::json!({ "value": serde_json::to_string(&filled)? }),
        });
    }

    let needs_activation_script = !ledger.is_activated(&resolved.immutable_id);
    debug!(
        node = %resolved.immutable_id,
        declarations = declarations.len(),
        needs_activation_script,
        "node planned"
    );

    Ok(NodePlan {
        resolved,
        policies,
        alarm,
        declarations,
        needs_activation_script,
    })
}
