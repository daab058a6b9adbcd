//! Error handling and display for the action.

use std::time::Duration;

use colored::Colorize;
use meshnode_reconcile::ReconcileError;
use thiserror::Error;

use crate::client::RemoteError;

/// Errors surfaced at the invocation boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// A control-plane call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The call succeeded but the payload is unusable.
    #[error("Invalid response from describe: {0}")]
    InvalidResponse(String),

    /// The resource exists in a state that is not auto-remediated.
    #[error("{name} found in unexpected state {status}")]
    UnexpectedStatus { name: String, status: String },

    /// Deletion was not confirmed before the wait budget ran out.
    #[error("{name} was not deleted within {elapsed:?} ({attempts} attempts)")]
    WaitTimeout {
        name: String,
        elapsed: Duration,
        attempts: u32,
    },

    #[error("Invalid JSON for {field}: {detail}: {raw}")]
    InvalidJson {
        field: &'static str,
        detail: String,
        raw: String,
    },

    #[error("Input required and not supplied: {0}")]
    MissingInput(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidInput { field: &'static str, value: String },

    #[error("Unable to determine ARN")]
    MissingArn,

    #[error(transparent)]
    InvalidWait(#[from] ReconcileError),

    #[error("failed to write outputs: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Machine-readable kind, used in the failure line.
    pub fn kind(&self) -> &str {
        match self {
            Self::Remote(e) => e.kind(),
            Self::InvalidResponse(_) => "InvalidResponse",
            Self::UnexpectedStatus { .. } => "UnexpectedStatus",
            Self::WaitTimeout { .. } => "TimeoutError",
            Self::InvalidJson { .. } => "InvalidJson",
            Self::MissingInput(_) | Self::InvalidInput { .. } => "InvalidInput",
            Self::MissingArn => "MissingArn",
            Self::InvalidWait(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }

    /// HTTP status code of the failed call, when there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Remote(e) => e.status_code(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Format an error as `<kind> (Status code: <code>): <message>`.
pub fn failure_message(err: &anyhow::Error) -> String {
    let (kind, status_code) = match err.downcast_ref::<Error>() {
        Some(e) => (e.kind().to_string(), e.status_code()),
        None => ("Error".to_string(), None),
    };
    let code = status_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!("{kind} (Status code: {code}): {err}")
}

/// Escape a message for a workflow command line.
fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Print an error in a user-friendly format.
///
/// Under a workflow runner the failure is also emitted as an `::error::`
/// annotation so it shows up on the run summary.
pub fn print_error(err: &anyhow::Error) {
    let message = failure_message(err);
    eprintln!("{} {}", "Error:".red().bold(), message);

    if std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true") {
        println!("::error::{}", escape_workflow_data(&message));
    }

    if let Some(e) = err.downcast_ref::<Error>() {
        match e {
            Error::Remote(RemoteError::Network(_)) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check your network connection and MESHNODE_ENDPOINT.".yellow()
                );
            }
            Error::Remote(RemoteError::Signing(_)) => {
                eprintln!(
                    "\n{}",
                    "Hint: Configure AWS credentials (for example AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY) or set MESHNODE_TOKEN."
                        .yellow()
                );
            }
            Error::Remote(remote) if matches!(remote.status_code(), Some(401 | 403)) => {
                eprintln!(
                    "\n{}",
                    "Hint: The credentials in use may not permit this operation.".yellow()
                );
            }
            Error::WaitTimeout { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Deletion may still complete; raise --max-wait to wait longer.".yellow()
                );
            }
            _ => {}
        }
    }
}
