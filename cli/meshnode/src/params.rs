//! Action parameters.
//!
//! Inputs arrive as named strings, either as flags or as the `INPUT_<NAME>`
//! variables a workflow runner exports. Empty strings count as absent, and
//! the JSON-encoded `spec` and `tags` inputs are parsed here so that a typo
//! fails the run before any control-plane call is made.

use std::fmt;
use std::str::FromStr;

use clap::Args;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What the action should converge to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Find the virtual node, creating it if absent.
    #[default]
    Create,

    /// Delete the virtual node and wait until it is gone.
    Delete,
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput {
                field: "action",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// A resource tag. Order of tags is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Raw action inputs, before validation.
#[derive(Debug, Clone, Default, Args)]
pub struct ActionInputs {
    /// Action to perform (create or delete). Defaults to create.
    #[arg(long, env = "INPUT_ACTION")]
    pub action: Option<String>,

    /// Account that owns the mesh, when it is shared from another account.
    #[arg(long, env = "INPUT_MESH-OWNER")]
    pub mesh_owner: Option<String>,

    /// Name of the mesh the virtual node belongs to.
    #[arg(long, env = "INPUT_MESH-NAME")]
    pub mesh_name: Option<String>,

    /// Name of the virtual node.
    #[arg(long, env = "INPUT_NAME")]
    pub name: Option<String>,

    /// Virtual node spec, JSON encoded.
    #[arg(long, env = "INPUT_SPEC")]
    pub spec: Option<String>,

    /// Tags, JSON encoded as a list of `{"key": ..., "value": ...}`.
    #[arg(long, env = "INPUT_TAGS")]
    pub tags: Option<String>,
}

/// Validated parameters for a single invocation.
///
/// Identity is `(mesh_owner, mesh_name, virtual_node_name)`; `mesh_owner`
/// is never defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceParameters {
    pub action: Action,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_owner: Option<String>,

    pub mesh_name: String,

    pub virtual_node_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

impl ResourceParameters {
    /// Create parameters for the default (create) action.
    pub fn new(mesh_name: impl Into<String>, virtual_node_name: impl Into<String>) -> Self {
        Self {
            action: Action::Create,
            mesh_owner: None,
            mesh_name: mesh_name.into(),
            virtual_node_name: virtual_node_name.into(),
            spec: None,
            tags: None,
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_mesh_owner(mut self, mesh_owner: impl Into<String>) -> Self {
        self.mesh_owner = Some(mesh_owner.into());
        self
    }

    pub fn with_spec(mut self, spec: serde_json::Value) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Validate raw inputs.
    ///
    /// Inputs are checked in declaration order: action, mesh owner, mesh
    /// name, name, then the JSON fields.
    pub fn from_inputs(inputs: ActionInputs) -> Result<Self> {
        let action = match non_empty(inputs.action) {
            Some(raw) => raw.parse()?,
            None => Action::default(),
        };
        let mesh_owner = non_empty(inputs.mesh_owner);
        let mesh_name = non_empty(inputs.mesh_name).ok_or(Error::MissingInput("mesh-name"))?;
        let virtual_node_name = non_empty(inputs.name).ok_or(Error::MissingInput("name"))?;

        let spec = non_empty(inputs.spec)
            .map(|raw| parse_json_input("spec", raw))
            .transpose()?;
        let tags = non_empty(inputs.tags)
            .map(|raw| parse_json_input("tags", raw))
            .transpose()?;

        Ok(Self {
            action,
            mesh_owner,
            mesh_name,
            virtual_node_name,
            spec,
            tags,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Parse a JSON-encoded input, naming the field and echoing the raw text on
/// failure.
pub fn parse_json_input<T: DeserializeOwned>(field: &'static str, raw: String) -> Result<T> {
    serde_json::from_str(&raw).map_err(|e| Error::InvalidJson {
        field,
        detail: e.to_string(),
        raw,
    })
}
