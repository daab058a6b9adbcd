//! HTTP control-plane client against a mock server.

mod common;

use std::time::Duration;

use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use clap::Parser;
use common::{mock_spec, parameters, ARN};
use meshnode::cli::Cli;
use meshnode::client::{ControlPlane, HttpControlPlane, RemoteError, RequestSigner};
use meshnode::config::{Config, DEFAULT_USER_AGENT};
use meshnode::error::Error;
use meshnode::params::Action;
use meshnode::reconciler::{execute, find_or_create};
use meshnode::types::NodeStatus;
use meshnode_reconcile::{NoopObserver, WaitConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NODE_PATH: &str = "/v20190125/meshes/my-mesh/virtualNodes/my-virtual-node";
const COLLECTION_PATH: &str = "/v20190125/meshes/my-mesh/virtualNodes";

fn config(server: &MockServer) -> Config {
    Config {
        endpoint: server.uri(),
        ..Config::from_lookup(|_| None).unwrap()
    }
}

fn client(server: &MockServer) -> HttpControlPlane {
    HttpControlPlane::new(&config(server)).unwrap()
}

fn node_body(status: &str) -> Value {
    json!({
        "meshName": "my-mesh",
        "virtualNodeName": "my-virtual-node",
        "metadata": {
            "arn": ARN,
            "uid": "a1b2c3",
            "version": 1,
            "meshOwner": "1234567890",
            "resourceOwner": "1234567890",
            "createdAt": 1700000000.5,
            "lastUpdatedAt": 1700000000.5
        },
        "spec": mock_spec(),
        "status": { "status": status }
    })
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404)
        .insert_header(
            "x-amzn-ErrorType",
            "NotFoundException:http://internal.amazon.com/coral/com.amazonaws.appmesh/",
        )
        .set_body_json(json!({
            "message": "Virtual Node with name my-virtual-node is not present in mesh my-mesh"
        }))
}

/// Wait settings short enough for real-time tests.
fn quick_wait() -> WaitConfig {
    WaitConfig {
        min_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        max_wait: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn test_describe_decodes_node() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-amzn-RequestId", "req-1")
                .set_body_json(node_body("ACTIVE")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let output = client(&server).describe(&parameters()).await.unwrap();

    assert_eq!(output.response_metadata.http_status_code, 200);
    assert_eq!(output.response_metadata.request_id.as_deref(), Some("req-1"));
    assert_eq!(output.status_code(), Some(&NodeStatus::Active));
    assert_eq!(output.arn(), Some(ARN));
    let node = output.virtual_node.unwrap();
    assert_eq!(node.spec, Some(mock_spec()));
    assert!(node.metadata.unwrap().created_at.is_some());
}

#[tokio::test]
async fn test_describe_sends_mesh_owner() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .and(query_param("meshOwner", "123456789012"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .expect(1)
        .mount(&server)
        .await;

    let params = parameters().with_mesh_owner("123456789012");
    client(&server).describe(&params).await.unwrap();
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        token: Some("s3cret".to_string()),
        ..config(&server)
    };
    HttpControlPlane::new(&config)
        .unwrap()
        .describe(&parameters())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_signed_requests_carry_sigv4_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .expect(1)
        .mount(&server)
        .await;

    let signer = RequestSigner::new(
        SharedCredentialsProvider::new(Credentials::new(
            "AKIDEXAMPLE",
            "secret",
            None,
            None,
            "test",
        )),
        "eu-west-1",
    );
    client(&server)
        .with_signer(signer)
        .describe(&parameters())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0].headers["authorization"].to_str().unwrap();
    assert!(
        authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"),
        "{authorization}"
    );
    assert!(authorization.contains("/eu-west-1/appmesh/aws4_request"));
    assert!(authorization.contains("Signature="));
}

#[tokio::test]
async fn test_token_replaces_signing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        token: Some("s3cret".to_string()),
        sign_requests: true,
        ..config(&server)
    };
    HttpControlPlane::connect(&config)
        .await
        .unwrap()
        .describe(&parameters())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-amz-date").is_none());
}

#[tokio::test]
async fn test_create_puts_name_and_spec() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(COLLECTION_PATH))
        .and(body_json(json!({
            "virtualNodeName": "my-virtual-node",
            "spec": mock_spec()
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .expect(1)
        .mount(&server)
        .await;

    let output = client(&server).create(&parameters()).await.unwrap();
    assert_eq!(output.arn(), Some(ARN));
}

#[tokio::test]
async fn test_delete_returns_node() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("DELETED")))
        .expect(1)
        .mount(&server)
        .await;

    let output = client(&server).delete(&parameters()).await.unwrap();
    assert_eq!(output.status_code(), Some(&NodeStatus::Deleted));
}

// =============================================================================
// Error classification
// =============================================================================

#[tokio::test]
async fn test_not_found_from_error_type_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let err = client(&server).describe(&parameters()).await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(
        err.to_string(),
        "Virtual Node with name my-virtual-node is not present in mesh my-mesh"
    );
}

#[tokio::test]
async fn test_bare_404_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).describe(&parameters()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_error_kind_from_body_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.appmesh#BadRequestException",
            "Message": "bad mesh name"
        })))
        .mount(&server)
        .await;

    let err = client(&server).describe(&parameters()).await.unwrap_err();

    assert_eq!(err.kind(), "BadRequestException");
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.to_string(), "bad mesh name");
}

#[tokio::test]
async fn test_server_error_is_not_absence() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("x-amzn-ErrorType", "NotARealException")
                .set_body_json(json!({ "message": "Not A Real Exception. Only used for testing." })),
        )
        .mount(&server)
        .await;

    let err = client(&server).describe(&parameters()).await.unwrap_err();

    assert!(!err.is_not_found());
    assert_eq!(err.kind(), "NotARealException");
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_unparseable_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let err = client(&server).describe(&parameters()).await.unwrap_err();

    assert!(matches!(err, RemoteError::Decode { status_code: 200, .. }));
    assert_eq!(err.kind(), "DeserializationError");
}

#[tokio::test]
async fn test_empty_body_is_malformed_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let output = client(&server).describe(&parameters()).await.unwrap();
    assert!(output.virtual_node.is_none());

    let err = find_or_create(&client(&server), &parameters(), &NoopObserver)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn test_find_or_create_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(not_found())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .expect(1)
        .mount(&server)
        .await;

    let output = execute(&client(&server), &parameters(), &quick_wait(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(output.arn(), Some(ARN));
}

#[tokio::test]
async fn test_delete_and_wait_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("DELETED")))
        .expect(1)
        .mount(&server)
        .await;
    // Still visible for two polls, then gone.
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(node_body("ACTIVE")))
        .up_to_n_times(2)
        .expect(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(NODE_PATH))
        .respond_with(not_found())
        .expect(1)
        .with_priority(2)
        .mount(&server)
        .await;

    let params = parameters().with_action(Action::Delete);
    let output = execute(&client(&server), &params, &quick_wait(), &NoopObserver)
        .await
        .unwrap();
    assert_eq!(output.status_code(), Some(&NodeStatus::Deleted));
}

#[tokio::test]
async fn test_invalid_spec_fails_before_any_request() {
    let server = MockServer::start().await;

    let cli = Cli::try_parse_from([
        "meshnode",
        "--mesh-name",
        "my-mesh",
        "--name",
        "my-virtual-node",
        "--spec",
        "{\"listeners\": [",
    ])
    .unwrap();
    let err = cli.run(config(&server)).await.unwrap_err();

    assert!(err.to_string().starts_with("Invalid JSON for spec: "));
    assert!(server.received_requests().await.unwrap().is_empty());
}
