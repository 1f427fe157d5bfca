//! Full cycles against an HTTP node and an HTTP webhook.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::{
    Value,
    json,
};
use std::sync::Arc;
use url::Url;
use validator_monitor::{
    HttpNodeRpc,
    Monitor,
    MonitorError,
    RpcError,
    WebhookSink,
};
use wiremock::{
    Mock,
    MockServer,
    ResponseTemplate,
    matchers::{
        method,
        path,
        query_param,
    },
};

fn block_body(height: u64, precommits: Value, evidence: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": -1,
        "result": {
            "block_meta": { "header": { "height": height.to_string() } },
            "block": {
                "header": { "height": height.to_string() },
                "evidence": { "evidence": evidence },
                "last_commit": { "precommits": precommits }
            }
        }
    })
}

fn consensus_body(height: u64, round: u64, validators: &[(&str, &str)], peers: usize) -> Value {
    let validators: Vec<Value> = validators
        .iter()
        .map(|(address, power)| json!({ "address": address, "voting_power": power }))
        .collect();
    json!({
        "jsonrpc": "2.0",
        "id": -1,
        "result": {
            "round_state": {
                "height": height.to_string(),
                "round": round.to_string(),
                "validators": { "validators": validators }
            },
            "peers": vec![json!({}); peers]
        }
    })
}

async fn mount_json(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_node_checks(server: &MockServer, unconfirmed: &str, catching_up: bool) {
    mount_json(
        server,
        "/dump_consensus_state",
        consensus_body(10, 0, &[("AAA", "1000"), ("BBB", "500")], 8),
    )
    .await;
    mount_json(
        server,
        "/num_unconfirmed_txs",
        json!({ "jsonrpc": "2.0", "id": -1, "result": { "n_txs": unconfirmed, "total": unconfirmed } }),
    )
    .await;
    mount_json(
        server,
        "/status",
        json!({ "jsonrpc": "2.0", "id": -1, "result": { "sync_info": { "catching_up": catching_up } } }),
    )
    .await;
}

async fn webhook() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    server
}

async fn posted_texts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            body["text"].as_str().unwrap().to_string()
        })
        .collect()
}

fn monitor(node: &MockServer, hook: &MockServer, validators: &[&str]) -> Monitor {
    let rpc = HttpNodeRpc::new(&node.uri()).unwrap();
    let url = Url::parse(&format!("{}/hook", hook.uri())).unwrap();
    let sink = WebhookSink::new(url).unwrap();
    Monitor::new(
        Arc::new(rpc),
        Arc::new(sink),
        validators.iter().map(|v| (*v).to_string()),
        6.0,
    )
    .unwrap()
}

#[tokio::test]
async fn test_first_cycle_reports_evidence_and_backlog() {
    let node = MockServer::start().await;
    let hook = webhook().await;

    mount_json(
        &node,
        "/block",
        block_body(
            10,
            json!([{ "validator_address": "AAA" }, null, { "validator_address": "BBB" }]),
            json!([{
                "type": "tendermint/DuplicateVoteEvidence",
                "value": {
                    "VoteA": { "validator_address": "AAA" },
                    "VoteB": { "validator_address": "CCC" }
                }
            }]),
        ),
    )
    .await;
    mount_node_checks(&node, "150", false).await;

    let mut monitor = monitor(&node, &hook, &["AAA"]);
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.latest_height, 10);
    assert_eq!(report.undelivered, 0);
    assert_eq!(
        posted_texts(&hook).await,
        vec![
            "Evidence found in block 10 of type tendermint/DuplicateVoteEvidence. The validators involved are: AAA, CCC. AAA is of interest.",
            "There are >= 100 unconfirmed transactions (150).",
        ]
    );
}

#[tokio::test]
async fn test_gap_is_backfilled_over_http() {
    let node = MockServer::start().await;
    let hook = webhook().await;
    mount_node_checks(&node, "0", false).await;

    let mut monitor = monitor(&node, &hook, &["AAA", "BBB"]);

    // Height-specific mocks are registered first so they win over `/block`.
    let both = json!([{ "validator_address": "AAA" }, { "validator_address": "BBB" }]);
    {
        let _latest = Mock::given(method("GET"))
            .and(path("/block"))
            .respond_with(ResponseTemplate::new(200).set_body_json(block_body(
                10,
                both.clone(),
                json!(null),
            )))
            .mount_as_scoped(&node)
            .await;
        monitor.run_cycle().await.unwrap();
    }

    mount_json_at_height(
        &node,
        11,
        block_body(11, json!([{ "validator_address": "AAA" }]), json!(null)),
    )
    .await;
    mount_json_at_height(
        &node,
        12,
        block_body(
            12,
            json!([
                { "validator_address": "AAA" },
                { "validator_address": "AAA" },
                { "validator_address": "BBB" }
            ]),
            json!(null),
        ),
    )
    .await;
    mount_json(&node, "/block", block_body(13, both, json!(null))).await;

    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.blocks_audited, 3);
    assert_eq!(monitor.state().last_confirmed_height(), Some(13));
    assert_eq!(
        posted_texts(&hook).await,
        vec![
            "Validator BBB not found in block 11 last_commit.precommits.",
            "Validator AAA was found more than once in block 12 last_commit.precommits (2 times).",
        ]
    );
}

async fn mount_json_at_height(server: &MockServer, height: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path("/block"))
        .and(query_param("height", height.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_node_error_body_is_forwarded() {
    let node = MockServer::start().await;
    let hook = webhook().await;

    Mock::given(method("GET"))
        .and(path("/block"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream unavailable"))
        .mount(&node)
        .await;

    let mut monitor = monitor(&node, &hook, &["AAA"]);
    let err = monitor.run_cycle().await.unwrap_err();

    assert_matches!(
        err,
        MonitorError::Rpc(RpcError::Status { body, .. }) if body == "upstream unavailable"
    );
    assert_eq!(
        posted_texts(&hook).await,
        vec![
            "There was an error fetching the most recent block: upstream unavailable",
            "Debug message: the monitor had an error around block unknown.",
        ]
    );
}

#[tokio::test]
async fn test_catching_up_and_rejected_webhook() {
    let node = MockServer::start().await;
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_body_string("no"))
        .mount(&hook)
        .await;

    mount_json(
        &node,
        "/block",
        block_body(3, json!([{ "validator_address": "AAA" }]), json!(null)),
    )
    .await;
    mount_node_checks(&node, "0", true).await;

    let mut monitor = monitor(&node, &hook, &["AAA"]);
    let report = monitor.run_cycle().await.unwrap();

    assert_eq!(report.anomalies.len(), 1);
    assert_eq!(report.undelivered, 1);
    assert_eq!(
        posted_texts(&hook).await,
        vec!["The node is currently out of sync and catching up."]
    );
}
