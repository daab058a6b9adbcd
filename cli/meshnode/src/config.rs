//! Configuration for the action.
//!
//! Handles:
//! - Control-plane endpoint, region and credentials
//! - Request settings (user agent, timeout)
//! - Log level and format

use std::time::Duration;

use anyhow::{Context, Result};

/// User agent sent with every control-plane request.
pub const DEFAULT_USER_AGENT: &str = "amazon-appmesh-virtual-node-for-github-actions";

const DEFAULT_REGION: &str = "us-east-1";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Action configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Control-plane API endpoint.
    pub endpoint: String,

    /// AWS region, used for the default endpoint and for signing.
    pub region: String,

    /// Sign requests with SigV4 using the AWS credential chain.
    pub sign_requests: bool,

    /// Bearer token for the control plane, if it requires one. Replaces
    /// signing when set.
    pub token: Option<String>,

    pub user_agent: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating empty values as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let region = get("AWS_REGION")
            .or_else(|| get("AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let endpoint = get("MESHNODE_ENDPOINT")
            .unwrap_or_else(|| format!("https://appmesh.{region}.amazonaws.com"));

        let token = get("MESHNODE_TOKEN");

        let sign_requests = match get("MESHNODE_SIGN_REQUESTS").as_deref() {
            Some("true") | None => true,
            Some("false") => false,
            Some(other) => anyhow::bail!("Invalid MESHNODE_SIGN_REQUESTS: {other}"),
        };

        let user_agent =
            get("MESHNODE_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let request_timeout = match get("MESHNODE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("Invalid MESHNODE_REQUEST_TIMEOUT_SECS: {raw}"))?,
            ),
            None => Duration::from_secs(30),
        };

        let log_level = get("MESHNODE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match get("MESHNODE_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("text") | None => LogFormat::Text,
            Some(other) => anyhow::bail!("Invalid MESHNODE_LOG_FORMAT: {other}"),
        };

        Ok(Self {
            endpoint,
            region,
            sign_requests,
            token,
            user_agent,
            request_timeout,
            log_level,
            log_format,
        })
    }
}
