//! Tests for the explorer context and its configuration.

use std::collections::HashMap;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use comet_gateway::GatewayConfig;
use comet_stream::{ConnectStage, ConnectionState, StreamConfig, SubscribeError};

use crate::config::{ExplorerConfig, ENV_API_TOKEN, ENV_API_URL, ENV_PROBE_TIMEOUT_MS, ENV_RPC_URL};
use crate::explorer::Explorer;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn unused_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn test_config_defaults_without_env() {
    let config = ExplorerConfig::from_lookup(lookup(&[]));
    assert_eq!(config.gateway.rpc_url, "http://localhost:26657");
    assert_eq!(config.gateway.api_url, "http://localhost:3000");
    assert!(config.gateway.token.is_none());
    assert_eq!(config.stream.address, "http://localhost:26657");
    assert_eq!(config.stream.probe_timeout, Duration::from_millis(3000));
}

#[test]
fn test_config_env_overrides() {
    let config = ExplorerConfig::from_lookup(lookup(&[
        (ENV_RPC_URL, "https://rpc.example.com"),
        (ENV_API_URL, "https://api.example.com"),
        (ENV_API_TOKEN, "secret"),
        (ENV_PROBE_TIMEOUT_MS, "750"),
    ]));
    assert_eq!(config.gateway.rpc_url, "https://rpc.example.com");
    assert_eq!(config.stream.address, "https://rpc.example.com");
    assert_eq!(config.gateway.api_url, "https://api.example.com");
    assert_eq!(config.gateway.token.as_deref(), Some("secret"));
    assert_eq!(config.stream.probe_timeout, Duration::from_millis(750));
}

#[test]
fn test_config_ignores_empty_and_invalid_values() {
    let config = ExplorerConfig::from_lookup(lookup(&[
        (ENV_API_TOKEN, "  "),
        (ENV_PROBE_TIMEOUT_MS, "soon"),
    ]));
    assert!(config.gateway.token.is_none());
    assert_eq!(config.stream.probe_timeout, Duration::from_millis(3000));
}

#[tokio::test]
async fn test_unreachable_node() {
    let address = unused_address();
    let mut explorer = Explorer::new(ExplorerConfig {
        gateway: GatewayConfig::default(),
        stream: StreamConfig {
            address,
            probe_timeout: Duration::from_millis(500),
        },
    });

    assert!(!explorer.probe().await);
    let err = explorer.connect().await.unwrap_err();
    assert_eq!(err.stage, ConnectStage::Handshake);
    assert_eq!(explorer.state(), ConnectionState::Failed);
}

#[tokio::test]
async fn test_live_windows_need_a_connection() {
    let explorer = Explorer::new(ExplorerConfig::default());

    assert!(matches!(
        explorer.live_blocks().await,
        Err(SubscribeError::NotConnected)
    ));
    assert!(matches!(
        explorer.live_transactions().await,
        Err(SubscribeError::NotConnected)
    ));
}

#[tokio::test]
async fn test_gateway_passthrough_reports_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tx/ABCD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hash": "ABCD",
            "block_id": "BB",
            "tx_type": "transfer",
            "return_code": 0,
            "gas_used": "21000"
        })))
        .mount(&server)
        .await;

    let explorer = Explorer::new(ExplorerConfig {
        gateway: GatewayConfig {
            rpc_url: server.uri(),
            api_url: server.uri(),
            token: None,
        },
        stream: StreamConfig::default(),
    });

    let tx = explorer.transaction("ABCD").await.unwrap();
    assert_eq!(tx.gas_used_or_zero(), 21000);
    assert_eq!(tx.gas_wanted_or_zero(), 0);

    // Unmounted paths answer 404, which reads as absent.
    assert!(explorer.block(7).await.is_none());
    assert!(explorer.block_by_hash("EE").await.is_none());
}
