//! Output publishing.
//!
//! Results are posted as two named outputs, `response` and `arn`. Under a
//! workflow runner they are appended to the file named by `GITHUB_OUTPUT`;
//! otherwise they are printed to stdout.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::VirtualNodeOutput;

/// Output format for stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// JSON format.
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Where outputs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    /// Workflow output file (`GITHUB_OUTPUT`).
    File(PathBuf),
    Stdout(OutputFormat),
}

impl OutputSink {
    /// Use `GITHUB_OUTPUT` when set, stdout otherwise.
    pub fn from_env(format: OutputFormat) -> Self {
        match std::env::var_os("GITHUB_OUTPUT") {
            Some(path) if !path.is_empty() => Self::File(PathBuf::from(path)),
            _ => Self::Stdout(format),
        }
    }
}

/// The outputs posted for a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutputs {
    pub response: VirtualNodeOutput,
    pub arn: String,
}

impl ActionOutputs {
    /// Extract the outputs, failing when the resource identifier is missing.
    pub fn from_response(response: &VirtualNodeOutput) -> Result<Self> {
        let arn = response.arn().ok_or(Error::MissingArn)?.to_string();
        Ok(Self {
            response: response.clone(),
            arn,
        })
    }
}

/// Post the results of the action.
pub fn post_results(response: &VirtualNodeOutput, sink: &OutputSink) -> Result<ActionOutputs> {
    let outputs = ActionOutputs::from_response(response)?;
    info!(arn = %outputs.arn, "ARN found, created, or deleted");

    match sink {
        OutputSink::File(path) => {
            let response_json = serde_json::to_string(&outputs.response).map_err(to_io)?;
            write_output(path, "response", &response_json)?;
            write_output(path, "arn", &outputs.arn)?;
        }
        OutputSink::Stdout(OutputFormat::Json) => {
            println!("{}", render_json(&outputs)?);
        }
        OutputSink::Stdout(OutputFormat::Text) => {
            println!("{} {}", "Success:".green().bold(), outputs.arn);
        }
    }

    Ok(outputs)
}

/// Pretty JSON of both outputs, as printed to stdout.
pub fn render_json(outputs: &ActionOutputs) -> Result<String> {
    serde_json::to_string_pretty(outputs).map_err(to_io)
}

fn to_io(err: serde_json::Error) -> Error {
    Error::Io(std::io::Error::other(err))
}

/// Append `name` to a workflow output file using the heredoc form, which is
/// safe for multi-line values.
pub fn write_output(path: &Path, name: &str, value: &str) -> std::io::Result<()> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{name}<<{delimiter}")?;
    writeln!(file, "{value}")?;
    writeln!(file, "{delimiter}")?;
    Ok(())
}
