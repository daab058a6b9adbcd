//! Control-plane documents for virtual nodes.
//!
//! These are snapshots read from the remote service on every call; nothing
//! here is cached or mutated locally.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the control plane.
///
/// Unknown values are preserved so they can be reported verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Active,
    Inactive,
    Deleted,
    Other(String),
}

impl From<String> for NodeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ACTIVE" => Self::Active,
            "INACTIVE" => Self::Inactive,
            "DELETED" => Self::Deleted,
            _ => Self::Other(value),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Active => "ACTIVE".to_string(),
            NodeStatus::Inactive => "INACTIVE".to_string(),
            NodeStatus::Deleted => "DELETED".to_string(),
            NodeStatus::Other(value) => value,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("ACTIVE"),
            Self::Inactive => f.write_str("INACTIVE"),
            Self::Deleted => f.write_str("DELETED"),
            Self::Other(value) => f.write_str(value),
        }
    }
}

/// Status wrapper as it appears on the wire (`{"status": "ACTIVE"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNodeStatus {
    pub status: NodeStatus,
}

/// Resource metadata assigned by the control plane.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    /// Unique resource identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_owner: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "epoch_seconds"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "epoch_seconds"
    )]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// A virtual node as returned by describe, create and delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNode {
    #[serde(default)]
    pub mesh_name: String,

    #[serde(default)]
    pub virtual_node_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VirtualNodeStatus>,
}

impl VirtualNode {
    /// Reported status, if the document carries one.
    pub fn status_code(&self) -> Option<&NodeStatus> {
        self.status.as_ref().map(|s| &s.status)
    }

    pub fn arn(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.arn.as_deref())
    }
}

/// Transport-level details of a control-plane response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub http_status_code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Result payload of a describe, create or delete call.
///
/// A successful call without a `virtualNode` is a malformed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNodeOutput {
    #[serde(rename = "$metadata", default)]
    pub response_metadata: ResponseMetadata,

    #[serde(
        rename = "virtualNode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub virtual_node: Option<VirtualNode>,
}

impl VirtualNodeOutput {
    pub fn new(http_status_code: u16, virtual_node: Option<VirtualNode>) -> Self {
        Self {
            response_metadata: ResponseMetadata {
                http_status_code,
                request_id: None,
            },
            virtual_node,
        }
    }

    /// Status of the contained node, if any.
    pub fn status_code(&self) -> Option<&NodeStatus> {
        self.virtual_node.as_ref().and_then(VirtualNode::status_code)
    }

    /// Resource identifier of the contained node, if any.
    pub fn arn(&self) -> Option<&str> {
        self.virtual_node.as_ref().and_then(VirtualNode::arn)
    }
}

/// Timestamps travel as (possibly fractional) seconds since the epoch.
mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => {
                let secs = ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_millis()) / 1e3;
                serializer.serialize_f64(secs)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(secs) = Option::<f64>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let whole = secs.trunc() as i64;
        let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
        DateTime::from_timestamp(whole, nanos.min(999_999_999))
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
    }
}
