//! Find-or-create and delete-then-wait for a single virtual node.
//!
//! The reconciler:
//! - Describes the node and branches on the result
//! - Creates it when absent (or reported DELETED)
//! - Deletes it and polls until the control plane confirms it is gone
//!
//! Progress is reported as [`ReconcileEvent`]s to an injected observer; the
//! decision logic itself does no logging.

use meshnode_reconcile::{poll_until, Observer, PollDecision, WaitConfig, WaitError, WaitEvent};

use crate::client::{ControlPlane, RemoteError};
use crate::error::{Error, Result};
use crate::params::{Action, ResourceParameters};
use crate::types::{NodeStatus, VirtualNodeOutput};

/// Outcome of a describe call, with "not found" lifted out of the error path.
#[derive(Debug)]
pub enum DescribeResult {
    Found(VirtualNodeOutput),
    Absent,
    Error(RemoteError),
}

/// Why the reconciler decided to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    NotFound,
    Deleted,
}

/// Structured progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    Searching { name: String },
    Found { name: String },
    /// Found, but the node may not be serving traffic.
    FoundInactive { name: String },
    Absent { name: String, reason: AbsentReason },
    Created { name: String },
    Deleting { name: String },
    WaitingForDeletion { name: String },
    Deleted { name: String },
    Wait(WaitEvent),
}

/// Describe the node and classify the outcome.
pub async fn lookup<C>(client: &C, params: &ResourceParameters) -> DescribeResult
where
    C: ControlPlane + ?Sized,
{
    match client.describe(params).await {
        Ok(output) => DescribeResult::Found(output),
        Err(e) if e.is_not_found() => DescribeResult::Absent,
        Err(e) => DescribeResult::Error(e),
    }
}

/// Return the node if it exists, otherwise create it.
///
/// ACTIVE and INACTIVE nodes are returned unchanged. A node reported as
/// DELETED is treated as absent and created again. Any other status, and any
/// describe error other than NotFound, fails without creating.
pub async fn find_or_create<C, O>(
    client: &C,
    params: &ResourceParameters,
    observer: &O,
) -> Result<VirtualNodeOutput>
where
    C: ControlPlane + ?Sized,
    O: Observer<ReconcileEvent> + ?Sized,
{
    let name = params.virtual_node_name.as_str();
    observer.observe(&ReconcileEvent::Searching {
        name: name.to_string(),
    });

    let reason = match lookup(client, params).await {
        DescribeResult::Error(e) => return Err(e.into()),
        DescribeResult::Absent => AbsentReason::NotFound,
        DescribeResult::Found(output) => {
            let Some(status) = output.status_code().cloned() else {
                return Err(invalid_response(&output));
            };

            match status {
                NodeStatus::Active => {
                    observer.observe(&ReconcileEvent::Found {
                        name: name.to_string(),
                    });
                    return Ok(output);
                }
                NodeStatus::Inactive => {
                    observer.observe(&ReconcileEvent::FoundInactive {
                        name: name.to_string(),
                    });
                    return Ok(output);
                }
                NodeStatus::Deleted => AbsentReason::Deleted,
                NodeStatus::Other(status) => {
                    return Err(Error::UnexpectedStatus {
                        name: name.to_string(),
                        status,
                    });
                }
            }
        }
    };

    observer.observe(&ReconcileEvent::Absent {
        name: name.to_string(),
        reason,
    });
    let created = client.create(params).await?;
    observer.observe(&ReconcileEvent::Created {
        name: name.to_string(),
    });

    Ok(created)
}

/// Poll until the node is gone or reports DELETED.
///
/// Only "still exists" is retried. A response without a status and any
/// describe error other than NotFound abort the wait.
pub async fn wait_until_deleted<C, O>(
    client: &C,
    params: &ResourceParameters,
    wait: &WaitConfig,
    observer: &O,
) -> Result<()>
where
    C: ControlPlane + ?Sized,
    O: Observer<ReconcileEvent> + ?Sized,
{
    let name = params.virtual_node_name.as_str();
    observer.observe(&ReconcileEvent::WaitingForDeletion {
        name: name.to_string(),
    });

    let forward = |event: &WaitEvent| observer.observe(&ReconcileEvent::Wait(event.clone()));
    let result = poll_until(wait, &forward, move || async move {
        match lookup(client, params).await {
            DescribeResult::Absent => Ok(PollDecision::Done(())),
            DescribeResult::Found(output) => match output.status_code() {
                Some(NodeStatus::Deleted) => Ok(PollDecision::Done(())),
                Some(_) => Ok(PollDecision::Retry),
                None => Err(invalid_response(&output)),
            },
            DescribeResult::Error(e) => Err(Error::Remote(e)),
        }
    })
    .await;

    match result {
        Ok(()) => {
            observer.observe(&ReconcileEvent::Deleted {
                name: name.to_string(),
            });
            Ok(())
        }
        Err(WaitError::Timeout { elapsed, attempts }) => Err(Error::WaitTimeout {
            name: name.to_string(),
            elapsed,
            attempts,
        }),
        Err(WaitError::Failed(e)) => Err(e),
    }
}

fn invalid_response(output: &VirtualNodeOutput) -> Error {
    Error::InvalidResponse(serde_json::to_string(output).unwrap_or_default())
}

/// Delete the node, then wait for the deletion to complete.
///
/// Returns the delete response once deletion is confirmed.
pub async fn delete_and_wait<C, O>(
    client: &C,
    params: &ResourceParameters,
    wait: &WaitConfig,
    observer: &O,
) -> Result<VirtualNodeOutput>
where
    C: ControlPlane + ?Sized,
    O: Observer<ReconcileEvent> + ?Sized,
{
    wait.validate()?;

    observer.observe(&ReconcileEvent::Deleting {
        name: params.virtual_node_name.clone(),
    });
    let response = client.delete(params).await?;
    wait_until_deleted(client, params, wait, observer).await?;

    Ok(response)
}

/// Converge the node to the requested action.
pub async fn execute<C, O>(
    client: &C,
    params: &ResourceParameters,
    wait: &WaitConfig,
    observer: &O,
) -> Result<VirtualNodeOutput>
where
    C: ControlPlane + ?Sized,
    O: Observer<ReconcileEvent> + ?Sized,
{
    match params.action {
        Action::Create => find_or_create(client, params, observer).await,
        Action::Delete => delete_and_wait(client, params, wait, observer).await,
    }
}
