//! Command-line interface.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use meshnode_reconcile::WaitConfig;

use crate::client::HttpControlPlane;
use crate::config::Config;
use crate::logging::TracingObserver;
use crate::output::{post_results, ActionOutputs, OutputFormat, OutputSink};
use crate::params::{ActionInputs, ResourceParameters};
use crate::reconciler::execute;

/// meshnode - find, create, or delete a mesh virtual node.
///
/// Every input can also be supplied as the `INPUT_<NAME>` variable a
/// workflow runner exports.
#[derive(Debug, Parser)]
#[command(name = "meshnode")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    inputs: ActionInputs,

    /// Maximum time to wait for a deletion to complete, in seconds.
    #[arg(long, env = "MESHNODE_MAX_WAIT_SECS", default_value = "300")]
    max_wait: u64,

    /// Minimum delay between deletion polls, in seconds.
    #[arg(long, env = "MESHNODE_MIN_DELAY_SECS", default_value = "15")]
    min_delay: u64,

    /// Maximum delay between deletion polls, in seconds.
    #[arg(long, env = "MESHNODE_MAX_DELAY_SECS", default_value = "120")]
    max_delay: u64,

    /// Output format when not writing to a workflow output file (text or json).
    #[arg(long, default_value = "text")]
    format: String,
}

impl Cli {
    /// Deletion wait settings.
    pub fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            min_delay: Duration::from_secs(self.min_delay),
            max_delay: Duration::from_secs(self.max_delay),
            max_wait: Duration::from_secs(self.max_wait),
        }
    }

    /// Run the action.
    ///
    /// Inputs are validated before any control-plane call is made.
    pub async fn run(self, config: Config) -> Result<ActionOutputs> {
        let wait = self.wait_config();
        let format = OutputFormat::parse(&self.format);
        let params = ResourceParameters::from_inputs(self.inputs)?;
        tracing::debug!(
            action = %params.action,
            mesh = %params.mesh_name,
            name = %params.virtual_node_name,
            "Parameters loaded"
        );

        let client = HttpControlPlane::connect(&config).await?;
        let response = execute(&client, &params, &wait, &TracingObserver).await?;

        let outputs = post_results(&response, &OutputSink::from_env(format))?;
        Ok(outputs)
    }
}
