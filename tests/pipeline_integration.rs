//! End-to-end pipeline tests
//!
//! Each test drives a document through the whole stack: mock HTTP server,
//! transport, envelope parser, entity deserializers and history decoder.

use chrono::{TimeZone, Utc};
use onionoo_client::document::{envelope_from_str, EntityList};
use onionoo_client::{
    graph_history_from_json, ClientConfig, Document, Envelope, Error, Flag, GraphHistory,
    OnionooClient, ParseError, ParsePolicy, QueryParams, RelayDetails, RelayUptime,
};
use serde_json::json;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn serve(endpoint: &str, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer) -> OnionooClient {
    let config = ClientConfig::new(server.uri()).with_retry_delay(Duration::from_millis(10));
    OnionooClient::new(config).unwrap()
}

/// Minimal relay document from the Onionoo protocol description
#[tokio::test]
async fn test_minimal_relay_document() {
    init_tracing();

    let server = serve(
        "/details",
        json!({
            "version": "1.0",
            "relays": [{"fingerprint": "ABCD1234", "nickname": "relay1", "flags": ["Running", "Exit"]}]
        }),
    )
    .await;

    let relays = client(&server)
        .relay_details(QueryParams::new())
        .await
        .unwrap();

    assert_eq!(relays.records.len(), 1);
    let relay = &relays.records[0];
    assert_eq!(relay.fingerprint, "ABCD1234");
    assert_eq!(relay.nickname.as_deref(), Some("relay1"));
    assert_eq!(relay.flags, vec![Flag::Running, Flag::Exit]);
    assert!(relay.or_addresses.is_empty());
    assert_eq!(relay.consensus_weight, None);
}

#[tokio::test]
async fn test_missing_fingerprint_is_reported() {
    init_tracing();

    let server = serve("/details", json!({"relays": [{"nickname": "relay1"}]})).await;

    let err = client(&server)
        .relay_details(QueryParams::new())
        .await
        .unwrap_err();

    match err {
        Error::Parse(ParseError::MissingField { field, .. }) => assert_eq!(field, "fingerprint"),
        other => panic!("expected a missing field error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_keys_are_ignored_end_to_end() {
    init_tracing();

    let server = serve(
        "/details",
        json!({
            "version": "9.0",
            "brand_new_meta": {"x": 1},
            "relays": [{"fingerprint": "ABCD", "future_field": [1, 2, 3]}],
            "bridges": []
        }),
    )
    .await;

    let response = client(&server).details(QueryParams::new()).await.unwrap();
    assert_eq!(response.relays[0].fingerprint, "ABCD");
    assert!(response.is_complete());
}

#[tokio::test]
async fn test_uptime_histories_are_decoded() {
    init_tracing();

    let history = json!({
        "first": "2023-01-01",
        "last": "2023-01-02",
        "interval": 3600,
        "factor": 0.5,
        "values": [2, 4, null, 6]
    });
    let server = serve(
        "/uptime",
        json!({
            "relays": [{
                "fingerprint": "ABCD1234",
                "uptime": {"1_month": history},
                "flags": {"Running": {"1_month": history}}
            }],
            "bridges": []
        }),
    )
    .await;

    let response = client(&server)
        .uptime(QueryParams::new().lookup("ABCD1234"))
        .await
        .unwrap();

    let uptime = &response.relays[0];
    assert_eq!(
        uptime.uptime["1_month"].values,
        vec![Some(1.0), Some(2.0), None, Some(3.0)]
    );
    assert_eq!(
        uptime.flags[&Flag::Running]["1_month"].values,
        vec![Some(1.0), Some(2.0), None, Some(3.0)]
    );
}

#[tokio::test]
async fn test_summary_type_filter_reaches_server() {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/summary"))
        .and(query_param("type", "bridge"))
        .and(query_param("running", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "relays": [],
            "bridges": [{"n": "Unnamed", "h": "0010D49C6DA1E46A316563099F41BFE40B6C7183", "r": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bridges = client(&server)
        .bridge_summaries(QueryParams::new().running(true))
        .await
        .unwrap();
    assert_eq!(bridges.records.len(), 1);
    assert_eq!(bridges.records[0].running, Some(true));
}

#[test]
fn test_history_example_decodes() {
    let history = graph_history_from_json(&json!({
        "first": "2023-01-01",
        "last": "2023-01-02",
        "interval": 3600,
        "factor": 0.5,
        "values": [2, 4, null, 6]
    }))
    .unwrap();

    assert_eq!(history.values, vec![Some(1.0), Some(2.0), None, Some(3.0)]);
}

#[test]
fn test_history_encode_decode_tolerance() {
    let samples = vec![Some(12.5), None, Some(0.75), Some(1000.0)];
    let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    for factor in [0.001, 0.5, 2.0] {
        let decoded = graph_history_from_json(&GraphHistory::encode(first, 86400, factor, &samples))
            .unwrap();
        for (got, want) in decoded.values.iter().zip(&samples) {
            match (got, want) {
                (Some(g), Some(w)) => assert!((g - w).abs() <= factor / 2.0 + 1e-9),
                (None, None) => {}
                pair => panic!("null mismatch: {pair:?}"),
            }
        }
    }
}

#[test]
fn test_envelope_from_body() {
    let envelope = envelope_from_str(r#"{"version":"8.0","relays":[],"bridges":[]}"#).unwrap();
    assert_eq!(envelope.meta().version.as_deref(), Some("8.0"));

    let err = envelope_from_str("[]").unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::MalformedEnvelope { .. })));

    let err = envelope_from_str("{").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_missing_list_is_malformed() {
    let envelope = Envelope::from_json(json!({"bridges": []})).unwrap();
    assert!(matches!(
        envelope.decode_relays::<RelayDetails>(ParsePolicy::Strict),
        Err(ParseError::MalformedEnvelope { .. })
    ));
    assert!(envelope.list(EntityList::Bridges).unwrap().is_empty());
}

#[test]
fn test_records_serialize() {
    let relay = RelayDetails::from_json(&json!({
        "fingerprint": "ABCD",
        "as": "AS3",
        "flags": ["HSDir"]
    }))
    .unwrap();
    let out = serde_json::to_value(&relay).unwrap();
    assert_eq!(out["as"], "AS3");
    assert_eq!(out["flags"], json!(["HSDir"]));

    let uptime = RelayUptime::from_json(&json!({"fingerprint": "ABCD"})).unwrap();
    assert!(uptime.flags.is_empty());
}
