//! Tests for the gateway client.

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::GatewayClient;
use crate::error::{Endpoint, GatewayError};
use crate::types::GatewayConfig;

fn test_config(server_url: &str) -> GatewayConfig {
    GatewayConfig {
        rpc_url: server_url.to_string(),
        api_url: server_url.to_string(),
        token: Some("test-token".to_string()),
    }
}

fn block_json(height: u64, id: &str, txs: usize) -> serde_json::Value {
    let tx_hashes: Vec<_> = (0..txs)
        .map(|i| serde_json::json!({"hash_id": format!("tx{i}"), "return_code": 0}))
        .collect();
    serde_json::json!({
        "block_id": id,
        "header": {
            "chain_id": "test-chain",
            "height": height.to_string(),
            "time": "2024-01-01T00:00:00Z",
            "proposer_address": "ABCDEF",
            "app_hash": "FF00"
        },
        "tx_hashes": tx_hashes
    })
}

#[tokio::test]
async fn test_recent_blocks_maps_summaries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/block"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [block_json(100, "AA01", 2), block_json(99, "AA00", 0)]
        })))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    let blocks = client.recent_blocks(20).await.unwrap();

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].height, 100);
    assert_eq!(blocks[0].block_id, "aa01");
    assert_eq!(blocks[0].tx_count, 2);
    assert_eq!(blocks[0].proposer.as_deref(), Some("abcdef"));
    assert_eq!(blocks[1].height, 99);
}

#[tokio::test]
async fn test_block_by_height_not_found_is_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/block/height/5"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    assert!(client.block_by_height(5).await.is_none());
}

#[tokio::test]
async fn test_server_error_is_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/block/last"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal server error"))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    assert!(client.latest_block().await.is_none());
    assert!(client.latest_height().await.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tx/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    assert!(client.transaction("abc").await.is_none());
}

#[tokio::test]
async fn test_unreachable_server_is_absent() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GatewayClient::new(test_config(&format!("http://{addr}")));
    assert!(client.blocks(1, 20).await.is_none());
}

#[tokio::test]
async fn test_transaction_detail_passes_fees_through() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tx/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hash": "abc",
            "block_id": "b1",
            "tx_type": "Transfer",
            "fee_amount_per_gas_unit": "0.0001"
        })))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    let tx = client.transaction("abc").await.unwrap();

    assert_eq!(tx.fee_or_zero(), "0.0001");
    assert_eq!(tx.gas_wanted_or_zero(), 0);
    assert_eq!(tx.gas_used_or_zero(), 0);
    assert_eq!(tx.tx_type.as_deref(), Some("Transfer"));
}

#[tokio::test]
async fn test_recent_transactions_resolve_blocks() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tx"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"hash": "T2", "block_id": "b2", "return_code": 1},
                {"hash": "T1", "block_id": "b1"},
                {"hash": "T0", "block_id": "missing"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/block/hash/b2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(block_json(11, "b2", 1)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/block/hash/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(block_json(10, "b1", 1)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/block/hash/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    let txs = client.recent_transactions(20).await.unwrap();

    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].hash, "t2");
    assert_eq!(txs[0].height, 11);
    assert_eq!(txs[0].status_code, 1);
    assert_eq!(txs[1].hash, "t1");
    assert_eq!(txs[1].height, 10);
    assert!(txs[1].is_success());
}

#[tokio::test]
async fn test_validators_unwraps_rpc_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/validators"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "jsonrpc": "2.0",
            "id": -1,
            "result": {
                "block_height": "55",
                "validators": [
                    {"address": "V1", "voting_power": "1000", "proposer_priority": "0"},
                    {"address": "V2", "voting_power": 500, "commission": "0.05"}
                ],
                "count": "2",
                "total": "12"
            }
        })))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    let page = client.validators(2, 10).await.unwrap();

    assert_eq!(page.total, Some(12));
    assert_eq!(page.validators.len(), 2);
    assert_eq!(page.validators[0].voting_power, 1000);
    assert!(page.validators[0].commission.is_none());
    assert_eq!(page.validators[1].commission.as_deref(), Some("0.05"));
}

#[tokio::test]
async fn test_validator_uptime_and_range_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/validator/V1/uptime"))
        .and(query_param("start", "0"))
        .and(query_param("end", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"uptime": 0.975})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/validator/V2/uptime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"uptime": 7.0})))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    assert_eq!(client.validator_uptime("V1", 0, 500).await, Some(0.975));
    assert_eq!(client.validator_uptime("V2", 0, 500).await, None);
}

#[tokio::test]
async fn test_commit_signatures_shapes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/validator/V1/commit_signatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(321)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/validator/V2/commit_signatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"count": "42"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/validator/V3/commit_signatures"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"unexpected": true})))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    assert_eq!(client.validator_commit_signatures("V1").await, Some(321));
    assert_eq!(client.validator_commit_signatures("V2").await, Some(42));
    assert_eq!(client.validator_commit_signatures("V3").await, None);
}

#[tokio::test]
async fn test_token_header_set_on_indexer_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/block/last"))
        .and(header("token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(block_json(7, "b7", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    assert_eq!(client.latest_height().await, Some(7));
}

#[tokio::test]
async fn test_token_header_absent_when_not_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/block/last"))
        .respond_with(ResponseTemplate::new(200).set_body_json(block_json(7, "b7", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let config = GatewayConfig {
        token: None,
        ..test_config(&server.uri())
    };
    let client = GatewayClient::new(config);
    let _ = client.latest_block().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.iter().any(|(name, _)| name == "token"));
}

#[tokio::test]
async fn test_token_never_sent_to_rpc_node() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/validators"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {"validators": [], "total": "0"}
        })))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));
    let page = client.validators(1, 10).await.unwrap();
    assert!(page.validators.is_empty());

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].headers.iter().any(|(name, _)| name == "token"));
}

#[tokio::test]
async fn test_request_errors_name_the_failing_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/tx/AA"))
        .respond_with(ResponseTemplate::new(503).set_body_string("indexer syncing"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/validators"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = GatewayClient::new(test_config(&server.uri()));

    let err = client
        .request::<serde_json::Value>(Endpoint::Indexer, &format!("{}/tx/AA", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Status { endpoint: Endpoint::Indexer, status_code: 503, ref body } if body == "indexer syncing"
    ));
    assert_eq!(err.to_string(), "indexer answered 503: indexer syncing");

    let err = client
        .request::<serde_json::Value>(Endpoint::Rpc, &format!("{}/validators", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode { .. }));
    assert_eq!(err.endpoint(), Endpoint::Rpc);

    let err = client
        .request::<serde_json::Value>(Endpoint::Rpc, &format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound { endpoint: Endpoint::Rpc }));
}

#[test]
fn test_config_defaults() {
    let config = GatewayConfig::default();
    assert_eq!(config.rpc_url, "http://localhost:26657");
    assert_eq!(config.api_url, "http://localhost:3000");
    assert!(config.token.is_none());
}
