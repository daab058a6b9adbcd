//! Shared fixtures for reconciler tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use meshnode::client::{ControlPlane, RemoteError};
use meshnode::params::ResourceParameters;
use meshnode::types::{
    NodeStatus, ResourceMetadata, VirtualNode, VirtualNodeOutput, VirtualNodeStatus,
};
use serde_json::json;

pub const ARN: &str =
    "arn:aws:appmesh:us-east-1:1234567890:mesh/my-mesh/virtualNode/my-virtual-node";

pub fn mock_spec() -> serde_json::Value {
    json!({
        "listeners": [{ "portMapping": { "port": 8080, "protocol": "http" } }],
        "serviceDiscovery": { "dns": { "hostname": "my-virtual-node.local" } }
    })
}

pub fn parameters() -> ResourceParameters {
    ResourceParameters::new("my-mesh", "my-virtual-node").with_spec(mock_spec())
}

pub fn node_output(http_status_code: u16, status: &str) -> VirtualNodeOutput {
    VirtualNodeOutput::new(
        http_status_code,
        Some(VirtualNode {
            mesh_name: "my-mesh".to_string(),
            virtual_node_name: "my-virtual-node".to_string(),
            metadata: Some(ResourceMetadata {
                arn: Some(ARN.to_string()),
                ..Default::default()
            }),
            spec: Some(mock_spec()),
            status: Some(VirtualNodeStatus {
                status: NodeStatus::from(status.to_string()),
            }),
        }),
    )
}

/// A canned control-plane reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Output(VirtualNodeOutput),
    Fail {
        kind: &'static str,
        status_code: u16,
        message: &'static str,
    },
}

impl Reply {
    pub fn with_status(status: &str) -> Self {
        Self::Output(node_output(200, status))
    }

    pub fn active() -> Self {
        Self::with_status("ACTIVE")
    }

    pub fn created() -> Self {
        Self::Output(node_output(201, "ACTIVE"))
    }

    /// A success without a resource document.
    pub fn malformed() -> Self {
        Self::Output(VirtualNodeOutput::new(200, None))
    }

    pub fn not_found() -> Self {
        Self::Fail {
            kind: "NotFoundException",
            status_code: 404,
            message: "Virtual Node with name my-virtual-node is not present in mesh my-mesh for account 1234567890",
        }
    }

    pub fn generic_failure() -> Self {
        Self::Fail {
            kind: "NotARealException",
            status_code: 500,
            message: "Not A Real Exception. Only used for testing.",
        }
    }

    fn into_result(self) -> Result<VirtualNodeOutput, RemoteError> {
        match self {
            Self::Output(output) => Ok(output),
            Self::Fail {
                kind,
                status_code,
                message,
            } => Err(RemoteError::service(kind, Some(status_code), message)),
        }
    }
}

/// Replays queued replies per operation; the last reply repeats forever.
#[derive(Default)]
pub struct MockControlPlane {
    describe: Mutex<VecDeque<Reply>>,
    create: Mutex<VecDeque<Reply>>,
    delete: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_describe(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.describe.lock().unwrap().extend(replies);
        self
    }

    pub fn on_create(self, reply: Reply) -> Self {
        self.create.lock().unwrap().push_back(reply);
        self
    }

    pub fn on_delete(self, reply: Reply) -> Self {
        self.delete.lock().unwrap().push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == operation)
            .count()
    }

    fn next(
        &self,
        operation: &'static str,
        queue: &Mutex<VecDeque<Reply>>,
    ) -> Result<VirtualNodeOutput, RemoteError> {
        self.calls.lock().unwrap().push(operation);
        let mut queue = queue.lock().unwrap();
        let reply = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        reply
            .unwrap_or_else(|| panic!("unexpected {operation} call"))
            .into_result()
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn describe(
        &self,
        _params: &ResourceParameters,
    ) -> Result<VirtualNodeOutput, RemoteError> {
        self.next("describe", &self.describe)
    }

    async fn create(&self, _params: &ResourceParameters) -> Result<VirtualNodeOutput, RemoteError> {
        self.next("create", &self.create)
    }

    async fn delete(&self, _params: &ResourceParameters) -> Result<VirtualNodeOutput, RemoteError> {
        self.next("delete", &self.delete)
    }
}
