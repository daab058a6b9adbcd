//! Per-operation request views.
//!
//! Each control-plane operation takes only a subset of the action
//! parameters. These views borrow from [`ResourceParameters`] and omit any
//! absent field entirely when serialized; an empty `meshOwner` counts as
//! absent.

use serde::Serialize;

use crate::params::ResourceParameters;

/// Fields accepted by describe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeInput<'a> {
    pub virtual_node_name: &'a str,
    pub mesh_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_owner: Option<&'a str>,
}

/// Fields accepted by create.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput<'a> {
    pub virtual_node_name: &'a str,
    pub mesh_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_owner: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<&'a serde_json::Value>,
}

/// Fields accepted by delete. Same as describe today.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteInput<'a> {
    pub virtual_node_name: &'a str,
    pub mesh_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_owner: Option<&'a str>,
}

fn mesh_owner(params: &ResourceParameters) -> Option<&str> {
    params.mesh_owner.as_deref().filter(|s| !s.is_empty())
}

pub fn describe_input(params: &ResourceParameters) -> DescribeInput<'_> {
    DescribeInput {
        virtual_node_name: &params.virtual_node_name,
        mesh_name: &params.mesh_name,
        mesh_owner: mesh_owner(params),
    }
}

pub fn create_input(params: &ResourceParameters) -> CreateInput<'_> {
    let DescribeInput {
        virtual_node_name,
        mesh_name,
        mesh_owner,
    } = describe_input(params);

    CreateInput {
        virtual_node_name,
        mesh_name,
        mesh_owner,
        spec: params.spec.as_ref(),
    }
}

pub fn delete_input(params: &ResourceParameters) -> DeleteInput<'_> {
    let DescribeInput {
        virtual_node_name,
        mesh_name,
        mesh_owner,
    } = describe_input(params);

    DeleteInput {
        virtual_node_name,
        mesh_name,
        mesh_owner,
    }
}
