use std::{sync::Arc, time::Duration};

use alloy::{
    consensus::Transaction as _,
    primitives::{Address, U256},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use mosaic_faucet::{
    Faucet, FaucetRegistry, FillPolicy, SigningAccount,
    fill::{CoinFaucet, TokenFaucet},
    server::{FillResponse, router},
    test_utils::{MockNode, test_signer},
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tower::ServiceExt as _;

const BENEFICIARY: Address = Address::with_last_byte(0xb0);
const TOKEN: Address = Address::with_last_byte(0x70);

struct Harness {
    coin_node: Arc<MockNode>,
    token_node: Arc<MockNode>,
    app: Router,
}

impl Harness {
    fn new(coin_node: MockNode, token_node: MockNode) -> Self {
        let coin_node = Arc::new(coin_node);
        let token_node = Arc::new(token_node);
        let policy = FillPolicy::new(U256::from(100), U256::from(50));

        let coin = CoinFaucet::new(
            SigningAccount::with_signer("dev", coin_node.clone(), test_signer()),
            policy,
        )
        .unwrap();
        let token = TokenFaucet::new(
            SigningAccount::with_signer("token", token_node.clone(), test_signer()),
            TOKEN,
            policy,
        )
        .unwrap();
        let faucets: [Arc<dyn Faucet>; 2] = [Arc::new(coin), Arc::new(token)];
        let registry = FaucetRegistry::new(faucets).unwrap();

        Self {
            coin_node,
            token_node,
            app: router(Arc::new(registry)),
        }
    }

    fn total_node_calls(&self) -> usize {
        self.coin_node.calls().total() + self.token_node.calls().total()
    }

    async fn post(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        post(self.app.clone(), body.into()).await
    }

    async fn fill(&self, beneficiary: &str) -> (StatusCode, Value) {
        fill(self.app.clone(), beneficiary.to_string()).await
    }

    /// Runs a fill on its own task, independent of the caller's polling.
    fn spawn_fill(&self, beneficiary: String) -> JoinHandle<(StatusCode, Value)> {
        tokio::spawn(fill(self.app.clone(), beneficiary))
    }
}

async fn post(app: Router, body: Body) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://example.org")
        .body(body)
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    assert_eq!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn fill(app: Router, beneficiary: String) -> (StatusCode, Value) {
    post(app, json!({ "beneficiary": beneficiary }).to_string().into()).await
}

/// Waits until `node` has been asked for `count` gas estimations.
async fn wait_for_estimations(node: &MockNode, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while node.calls().estimate_gas < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("fill never reached gas estimation");
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(MockNode::default(), MockNode::default())
    }
}

fn target(chain: &str) -> String {
    format!("{BENEFICIARY}@{chain}")
}

#[tokio::test]
async fn coin_fill_returns_tx_hash() {
    let harness = Harness::new(
        MockNode::default().with_balance(BENEFICIARY, U256::from(10)),
        MockNode::default(),
    );

    let (status, body) = harness.fill(&target("dev")).await;

    assert_eq!(status, StatusCode::OK);
    let response: FillResponse = serde_json::from_value(body).unwrap();
    let sent = harness.coin_node.submitted();
    assert_eq!(sent.len(), 1);
    assert_eq!(response.tx_hash, *sent[0].tx_hash());
    assert_eq!(sent[0].value(), U256::from(100));
    assert_eq!(harness.token_node.calls().total(), 0);
}

#[tokio::test]
async fn token_fill_returns_tx_hash() {
    let harness = Harness::new(
        MockNode::default(),
        MockNode::default().with_token_balance(TOKEN, test_signer().address(), U256::from(500)),
    );

    let (status, body) = harness.fill(&target("token")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["txHash"].is_string());
    assert_eq!(harness.token_node.submitted()[0].to(), Some(TOKEN));
}

#[tokio::test]
async fn funded_beneficiary_is_unprocessable() {
    let harness = Harness::new(
        MockNode::default().with_balance(BENEFICIARY, U256::from(50)),
        MockNode::default(),
    );

    for _ in 0..2 {
        let (status, body) = harness.fill(&target("dev")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Beneficiary already has enough balance.");
    }
    assert_eq!(harness.coin_node.calls().submit, 0);
}

#[tokio::test]
async fn malformed_requests_never_reach_a_node() {
    let harness = Harness::default();
    let bodies = [
        String::new(),
        "not json".to_string(),
        json!({}).to_string(),
        json!({ "beneficiary": 5 }).to_string(),
        json!({ "beneficiary": BENEFICIARY.to_string() }).to_string(),
        json!({ "beneficiary": "@dev" }).to_string(),
        json!({ "beneficiary": format!("{BENEFICIARY}@") }).to_string(),
        json!({ "beneficiary": "0x1234@dev" }).to_string(),
        json!({ "beneficiary": format!("{BENEFICIARY}@dev@token") }).to_string(),
    ];

    for body in bodies {
        let (status, response) = harness.post(body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
        assert!(response["error"].is_string(), "body: {body}");
    }
    assert_eq!(harness.total_node_calls(), 0);
}

#[tokio::test]
async fn unknown_chain_is_named_in_error() {
    let harness = Harness::default();

    let (status, body) = harness.fill(&target("mainnet")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("mainnet"));
    assert_eq!(harness.total_node_calls(), 0);
}

#[tokio::test]
async fn node_failure_is_internal_error() {
    let harness = Harness::default();
    harness
        .coin_node
        .fail_submit("insufficient funds for gas * price + value at http://10.0.0.3:8545");

    let (status, body) = harness.fill(&target("dev")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert_eq!(message, "transaction rejected by node");
    assert!(!message.contains("10.0.0.3"));
}

#[tokio::test]
async fn out_of_tokens_is_internal_error() {
    let harness = Harness::default();

    let (status, body) = harness.fill(&target("token")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "faucet has insufficient funds");
    assert_eq!(harness.token_node.calls().submit, 0);
}

#[tokio::test]
async fn preflight_request_is_allowed() {
    let harness = Harness::default();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/")
        .header(header::ORIGIN, "https://example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = harness.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    assert_eq!(harness.total_node_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_get_distinct_nonces() {
    let harness = Harness::new(MockNode::default().with_pending_count(9), MockNode::default());

    let requests: Vec<_> = (1..=16u8)
        .map(|i| harness.spawn_fill(format!("{}@dev", Address::with_last_byte(i))))
        .collect();
    for response in futures::future::join_all(requests).await {
        assert_eq!(response.unwrap().0, StatusCode::OK);
    }

    let mut nonces: Vec<_> = harness.coin_node.submitted().iter().map(|tx| tx.nonce()).collect();
    nonces.sort_unstable();
    assert_eq!(nonces, (9..25).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_chain_does_not_block_other_chains() {
    let harness = Harness::new(
        MockNode::default(),
        MockNode::default().with_token_balance(TOKEN, test_signer().address(), U256::from(500)),
    );
    harness.coin_node.hold_estimate_gas();

    let stalled = harness.spawn_fill(target("dev"));
    wait_for_estimations(&harness.coin_node, 1).await;

    let (status, _) = tokio::time::timeout(Duration::from_secs(5), harness.fill(&target("token")))
        .await
        .expect("token chain blocked behind coin chain");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.token_node.submitted().len(), 1);
    assert!(!stalled.is_finished());
    assert_eq!(harness.coin_node.calls().submit, 0);

    harness.coin_node.release_estimate_gas();
    let (status, _) = stalled.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.coin_node.submitted().len(), 1);
}

#[tokio::test]
async fn failing_chain_leaves_other_chains_available() {
    let harness = Harness::new(
        MockNode::default(),
        MockNode::default().with_token_balance(TOKEN, test_signer().address(), U256::from(500)),
    );
    harness.coin_node.fail_submit("nonce too low");

    let (status, _) = harness.fill(&target("dev")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = harness.fill(&target("token")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["txHash"].is_string());

    harness.coin_node.clear_failures();
    let (status, _) = harness.fill(&target("dev")).await;
    assert_eq!(status, StatusCode::OK);
}
