//! per-node least-privilege access derivation
//!
//! pure mapping from a node's identity to the minimal statements its
//! credentials need. nothing here talks to the cloud; the provisioning
//! layer attaches the returned data to the node's role.

use serde::Serialize;

use crate::courier::HEARTBEAT_NAMESPACE;
use crate::identity::NodeIdentity;

/// statement effect; nothing in this engine ever derives a Deny
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

/// a single condition restricting a statement
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub test: String,
    pub variable: String,
    pub values: Vec<String>,
}

/// one access statement, scoped as narrowly as the identity allows
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessStatement {
    pub sid: String,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl AccessStatement {
    fn allow(sid: &str, actions: &[&str], resources: Vec<String>) -> Self {
        Self {
            sid: sid.to_string(),
            effect: Effect::Allow,
            actions: actions.iter().map(|a| a.to_string()).collect(),
            resources,
            conditions: Vec::new(),
        }
    }

    fn with_condition(mut self, test: &str, variable: &str, values: &[&str]) -> Self {
        self.conditions.push(Condition {
            test: test.to_string(),
            variable: variable.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        });
        self
    }
}

/// a named group of statements attached to the node's role as one policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodePolicy {
    pub name: String,
    pub statements: Vec<AccessStatement>,
}

/// derive the three policy classes for one node
///
/// data uploads are scoped to the node's *current* resource name: a renamed
/// node writes under its new prefix going forward, old data stays under the
/// old prefix, and the old credentials are revoked rather than migrated.
pub fn derive_policies(node: &NodeIdentity, data_bucket: &str, logs_bucket: &str) -> Vec<NodePolicy> {
    let upload_prefix = node.upload_prefix();

    vec![
        NodePolicy {
            name: "upload-data".to_string(),
            statements: vec![
                AccessStatement::allow(
                    "UploadData",
                    &[
                        "s3:PutObject",
                        "s3:PutObjectTagging",
                        "s3:AbortMultipartUpload",
                    ],
                    vec![format!("arn:aws:s3:::{data_bucket}/{upload_prefix}/*")],
                ),
                // upload verification reads the ETag via head_object, which
                // needs bucket-level list permission and nothing more
                AccessStatement::allow(
                    "ReadMetadata",
                    &["s3:ListBucket"],
                    vec![format!("arn:aws:s3:::{data_bucket}")],
                ),
            ],
        },
        NodePolicy {
            name: "heartbeat-metrics".to_string(),
            statements: vec![
                // metrics have no resource-level scoping; the namespace
                // condition is the sole boundary
                AccessStatement::allow("Heartbeat", &["cloudwatch:PutMetricData"], vec!["*".to_string()])
                    .with_condition("StringEquals", "cloudwatch:namespace", &[HEARTBEAT_NAMESPACE]),
            ],
        },
        NodePolicy {
            name: "distributor-logs".to_string(),
            statements: vec![
                AccessStatement::allow(
                    "CreateDistributorLogs",
                    &["s3:GetEncryptionConfiguration"],
                    vec![format!("arn:aws:s3:::{logs_bucket}")],
                ),
                AccessStatement::allow(
                    "UploadDistributorLogs",
                    &["s3:PutObject"],
                    vec![format!("arn:aws:s3:::{logs_bucket}/*")],
                ),
            ],
        },
    ]
}
