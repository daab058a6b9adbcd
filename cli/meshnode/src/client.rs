//! Control-plane client for virtual nodes.
//!
//! [`ControlPlane`] is the seam the reconciler and waiter work against.
//! [`HttpControlPlane`] speaks the mesh control plane's REST surface. Every
//! call is a single round trip; failures are returned unchanged.
//!
//! Requests are signed with SigV4 by a [`RequestSigner`] using the standard
//! AWS credential chain, unless a bearer token is configured or signing is
//! turned off for a custom endpoint.

use std::time::SystemTime;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{sign, SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::inputs::{create_input, delete_input, describe_input};
use crate::params::ResourceParameters;
use crate::types::{ResponseMetadata, VirtualNode, VirtualNodeOutput};

/// REST API version prefix.
const API_VERSION: &str = "v20190125";

/// Error kind the control plane reports for a missing resource.
pub const NOT_FOUND_KIND: &str = "NotFoundException";

/// SigV4 signing name of the mesh control plane.
const SIGNING_NAME: &str = "appmesh";

const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";
const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// Failure of a single control-plane call.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service answered with an error.
    #[error("{message}")]
    Service {
        kind: String,
        status_code: Option<u16>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Credentials could not be resolved or the request could not be signed.
    #[error("Failed to sign request: {0}")]
    Signing(String),

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// The service answered, but the body could not be decoded.
    #[error("Failed to parse response: {message}")]
    Decode { status_code: u16, message: String },
}

impl RemoteError {
    /// Create a service error from response details.
    pub fn service(
        kind: impl Into<String>,
        status_code: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            kind: kind.into(),
            status_code,
            message: message.into(),
        }
    }

    /// The "resource absent" signal.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::service(NOT_FOUND_KIND, Some(404), message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Service { kind, .. } if kind == NOT_FOUND_KIND)
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Service { kind, .. } => kind,
            Self::Network(_) => "NetworkError",
            Self::Signing(_) => "CredentialsError",
            Self::Encode(_) => "SerializationError",
            Self::Decode { .. } => "DeserializationError",
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Service { status_code, .. } => *status_code,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Signing(_) | Self::Encode(_) => None,
            Self::Decode { status_code, .. } => Some(*status_code),
        }
    }
}

/// Operations on a single virtual node.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Fetch the node. A missing node fails with a NotFound error.
    async fn describe(&self, params: &ResourceParameters)
        -> Result<VirtualNodeOutput, RemoteError>;

    /// Create the node from the parameters' spec.
    async fn create(&self, params: &ResourceParameters) -> Result<VirtualNodeOutput, RemoteError>;

    /// Request deletion. The node may linger until deletion completes.
    async fn delete(&self, params: &ResourceParameters) -> Result<VirtualNodeOutput, RemoteError>;
}

/// Create request body; mesh name and owner travel in the URL.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVirtualNodeBody<'a> {
    virtual_node_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    spec: Option<&'a serde_json::Value>,
}

/// Error body returned by the control plane.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorResponse {
    #[serde(default, alias = "Message")]
    message: Option<String>,
    #[serde(default, rename = "__type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// Signs control-plane requests with SigV4.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: SharedCredentialsProvider,
    region: String,
}

impl RequestSigner {
    pub fn new(credentials: SharedCredentialsProvider, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Resolve credentials through the standard AWS chain (environment,
    /// shared profile, web identity, container and instance metadata).
    pub async fn from_env(region: &str) -> Result<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let credentials = sdk_config
            .credentials_provider()
            .context("No AWS credentials provider available")?;

        Ok(Self::new(credentials, region))
    }

    /// Headers that sign a request for `method` on `url` with `body`.
    pub async fn sign(
        &self,
        method: &str,
        url: &str,
        body: &[u8],
    ) -> Result<Vec<(String, String)>, RemoteError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| RemoteError::Signing(e.to_string()))?;

        self.sign_with(credentials, method, url, body, SystemTime::now())
    }

    fn sign_with(
        &self,
        credentials: Credentials,
        method: &str,
        url: &str,
        body: &[u8],
        time: SystemTime,
    ) -> Result<Vec<(String, String)>, RemoteError> {
        let identity = credentials.into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_NAME)
            .time(time)
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| RemoteError::Signing(e.to_string()))?
            .into();

        let request =
            SignableRequest::new(method, url, std::iter::empty(), SignableBody::Bytes(body))
                .map_err(|e| RemoteError::Signing(e.to_string()))?;
        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| RemoteError::Signing(e.to_string()))?
            .into_parts();

        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

/// HTTP client for the mesh control plane.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    client: reqwest::Client,
    base_url: Url,
    signer: Option<RequestSigner>,
}

impl HttpControlPlane {
    /// Create a client from config, resolving AWS credentials when requests
    /// are signed.
    pub async fn connect(config: &Config) -> Result<Self> {
        let client = Self::new(config)?;
        if !config.sign_requests || config.token.is_some() {
            return Ok(client);
        }

        let signer = RequestSigner::from_env(&config.region).await?;
        Ok(client.with_signer(signer))
    }

    /// Create an unsigned client from config.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = config.token.as_deref() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("Invalid token format")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid endpoint URL: {}", config.endpoint))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid endpoint URL: {}", config.endpoint);
        }

        Ok(Self {
            client,
            base_url,
            signer: None,
        })
    }

    pub fn with_signer(mut self, signer: RequestSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build `/v20190125/meshes/{mesh}/virtualNodes[/{name}][?meshOwner=]`.
    fn url(&self, mesh_name: &str, node_name: Option<&str>, mesh_owner: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([API_VERSION, "meshes", mesh_name, "virtualNodes"]);
            if let Some(name) = node_name {
                segments.push(name);
            }
        }
        if let Some(owner) = mesh_owner {
            url.query_pairs_mut().append_pair("meshOwner", owner);
        }
        url
    }

    fn log_request(operation: &str, url: &Url, input: &impl Serialize) {
        debug!(
            operation,
            url = %url,
            input = %serde_json::to_string(input).unwrap_or_default(),
            "Sending request to control plane"
        );
    }

    /// Send a request and decode the virtual node it returns.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<VirtualNodeOutput, RemoteError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(signer) = &self.signer {
            let payload = body.as_deref().unwrap_or_default();
            for (name, value) in signer.sign(method.as_str(), url.as_str(), payload).await? {
                request = request.header(name, value);
            }
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Self::service_error(response).await);
        }

        let request_id = header_value(&response, REQUEST_ID_HEADER);
        let body = response.bytes().await?;
        let virtual_node = if body.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            serde_json::from_slice::<Option<VirtualNode>>(&body).map_err(|e| {
                RemoteError::Decode {
                    status_code: status.as_u16(),
                    message: e.to_string(),
                }
            })?
        };

        Ok(VirtualNodeOutput {
            response_metadata: ResponseMetadata {
                http_status_code: status.as_u16(),
                request_id,
            },
            virtual_node,
        })
    }

    /// Classify an error response.
    async fn service_error(response: Response) -> RemoteError {
        let status = response.status();
        let header_kind = header_value(&response, ERROR_TYPE_HEADER)
            .and_then(|v| v.split(':').next().map(str::to_string))
            .filter(|v| !v.is_empty());

        let body: ApiErrorResponse = response.json().await.unwrap_or_default();

        let kind = header_kind
            .or_else(|| {
                body.error_type
                    .as_deref()
                    .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
            })
            .or(body.code)
            .unwrap_or_else(|| {
                if status == StatusCode::NOT_FOUND {
                    NOT_FOUND_KIND.to_string()
                } else {
                    "UnknownError".to_string()
                }
            });

        RemoteError::service(
            kind,
            Some(status.as_u16()),
            body.message.unwrap_or_else(|| "Unknown error".to_string()),
        )
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn describe(
        &self,
        params: &ResourceParameters,
    ) -> Result<VirtualNodeOutput, RemoteError> {
        let input = describe_input(params);
        let url = self.url(
            input.mesh_name,
            Some(input.virtual_node_name),
            input.mesh_owner,
        );
        Self::log_request("DescribeVirtualNode", &url, &input);

        self.send(Method::GET, url, None).await
    }

    async fn create(&self, params: &ResourceParameters) -> Result<VirtualNodeOutput, RemoteError> {
        let input = create_input(params);
        let url = self.url(input.mesh_name, None, input.mesh_owner);
        Self::log_request("CreateVirtualNode", &url, &input);

        let body = CreateVirtualNodeBody {
            virtual_node_name: input.virtual_node_name,
            spec: input.spec,
        };
        let body = serde_json::to_vec(&body)?;
        self.send(Method::PUT, url, Some(body)).await
    }

    async fn delete(&self, params: &ResourceParameters) -> Result<VirtualNodeOutput, RemoteError> {
        let input = delete_input(params);
        let url = self.url(
            input.mesh_name,
            Some(input.virtual_node_name),
            input.mesh_owner,
        );
        Self::log_request("DeleteVirtualNode", &url, &input);

        self.send(Method::DELETE, url, None).await
    }
}
