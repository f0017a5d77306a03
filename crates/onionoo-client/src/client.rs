//! High-level Onionoo client
//!
//! [`OnionooClient`] validates query parameters, issues requests through a
//! [`Transport`] with retry on transient failures, and hands the JSON to the
//! parsing core.

use crate::document::{
    BridgeBandwidth, BridgeClients, BridgeDetails, BridgeSummary, BridgeUptime, Document,
    EntityBatch, Envelope, RelayBandwidth, RelayDetails, RelaySummary, RelayUptime, RelayWeight, Response,
};
use crate::http::{network_retry, ClientConfig, HttpError, HttpTransport, OnionooRequest, OnionooResponse, Transport};
use crate::params::{Endpoint, NodeType, QueryParams};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

/// Client for the Onionoo API
///
/// Cloning is cheap; clones share the underlying transport.
#[derive(Debug)]
pub struct OnionooClient<T: Transport = HttpTransport> {
    transport: Arc<T>,
    config: ClientConfig,
}

impl<T: Transport> Clone for OnionooClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone(),
        }
    }
}

impl OnionooClient<HttpTransport> {
    /// Create a client backed by `reqwest`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.clone())?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> OnionooClient<T> {
    /// Create a client over an arbitrary transport
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
        }
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the raw JSON document of an endpoint
    ///
    /// Parameters are validated before any request is issued. Transient
    /// failures are retried according to the configuration.
    pub async fn fetch_raw(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> Result<OnionooResponse<Value>> {
        params.validate_for(endpoint)?;
        let request = OnionooRequest::new(endpoint).params(params.to_pairs());
        self.send(request).await
    }

    async fn send(&self, request: OnionooRequest) -> Result<OnionooResponse<Value>> {
        let response = network_retry(self.config.retry_config(), || {
            self.transport.fetch(request.clone())
        })
        .await?;

        tracing::debug!(
            endpoint = %request.endpoint,
            status = response.status,
            "received response"
        );
        Ok(response)
    }

    /// Fetch and split the response envelope of an endpoint
    pub async fn fetch_envelope(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> Result<Envelope> {
        let response = self.fetch_raw(endpoint, params).await?;
        Ok(Envelope::from_json(response.data)?)
    }

    /// Fetch an endpoint only if its document changed after `since`
    ///
    /// Returns `None` when the server answers 304 Not Modified.
    pub async fn fetch_modified_since(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
        since: DateTime<Utc>,
    ) -> Result<Option<Envelope>> {
        params.validate_for(endpoint)?;
        let request = OnionooRequest::new(endpoint)
            .params(params.to_pairs())
            .if_modified_since(since);

        match self.send(request).await {
            Ok(response) => Ok(Some(Envelope::from_json(response.data)?)),
            Err(Error::Http(err)) if err.is_not_modified() => {
                tracing::debug!(%endpoint, %since, "document not modified");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn fetch_response<R: Document, B: Document>(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> Result<Response<R, B>> {
        let envelope = self.fetch_envelope(endpoint, params).await?;
        let response = envelope.into_response::<R, B>(self.config.parse_policy)?;

        tracing::debug!(
            %endpoint,
            relays = response.relays.len(),
            bridges = response.bridges.len(),
            rejected = response.rejected.len(),
            "parsed response"
        );
        Ok(response)
    }

    /// Summary documents of relays and bridges
    pub async fn summary(
        &self,
        params: QueryParams,
    ) -> Result<Response<RelaySummary, BridgeSummary>> {
        self.fetch_response(Endpoint::Summary, &params).await
    }

    /// Details documents of relays and bridges
    pub async fn details(
        &self,
        params: QueryParams,
    ) -> Result<Response<RelayDetails, BridgeDetails>> {
        self.fetch_response(Endpoint::Details, &params).await
    }

    /// Bandwidth documents of relays and bridges
    pub async fn bandwidth(
        &self,
        params: QueryParams,
    ) -> Result<Response<RelayBandwidth, BridgeBandwidth>> {
        self.fetch_response(Endpoint::Bandwidth, &params).await
    }

    /// Weights documents; the bridge list is always empty
    pub async fn weights(&self, params: QueryParams) -> Result<Response<RelayWeight, Value>> {
        self.fetch_response(Endpoint::Weights, &params).await
    }

    /// Clients documents; the relay list is always empty
    pub async fn clients(&self, params: QueryParams) -> Result<Response<Value, BridgeClients>> {
        self.fetch_response(Endpoint::Clients, &params).await
    }

    /// Uptime documents of relays and bridges
    pub async fn uptime(
        &self,
        params: QueryParams,
    ) -> Result<Response<RelayUptime, BridgeUptime>> {
        self.fetch_response(Endpoint::Uptime, &params).await
    }

    async fn fetch_relays<R: Document>(
        &self,
        endpoint: Endpoint,
        params: QueryParams,
    ) -> Result<EntityBatch<R>> {
        let params = params.node_type(NodeType::Relay);
        let envelope = self.fetch_envelope(endpoint, &params).await?;
        Ok(envelope.decode_relays(self.config.parse_policy)?)
    }

    async fn fetch_bridges<B: Document>(
        &self,
        endpoint: Endpoint,
        params: QueryParams,
    ) -> Result<EntityBatch<B>> {
        let params = params.node_type(NodeType::Bridge);
        let envelope = self.fetch_envelope(endpoint, &params).await?;
        Ok(envelope.decode_bridges(self.config.parse_policy)?)
    }

    /// Relay summaries, in the order returned by the server
    ///
    /// Under [`ParsePolicy::SkipInvalid`](crate::ParsePolicy::SkipInvalid)
    /// entities that failed to parse are listed in `rejected`.
    pub async fn relay_summaries(&self, params: QueryParams) -> Result<EntityBatch<RelaySummary>> {
        self.fetch_relays(Endpoint::Summary, params).await
    }

    /// Bridge summaries, in the order returned by the server
    pub async fn bridge_summaries(
        &self,
        params: QueryParams,
    ) -> Result<EntityBatch<BridgeSummary>> {
        self.fetch_bridges(Endpoint::Summary, params).await
    }

    /// Relay details, in the order returned by the server
    pub async fn relay_details(&self, params: QueryParams) -> Result<EntityBatch<RelayDetails>> {
        self.fetch_relays(Endpoint::Details, params).await
    }

    /// Bridge details, in the order returned by the server
    pub async fn bridge_details(&self, params: QueryParams) -> Result<EntityBatch<BridgeDetails>> {
        self.fetch_bridges(Endpoint::Details, params).await
    }
}

impl<T: Transport + 'static> OnionooClient<T> {
    /// Look up relay details by fingerprint
    ///
    /// One request per fingerprint is issued concurrently. Results come back
    /// in input order; `Ok(None)` means no relay matched.
    pub async fn lookup_relays<I, S>(&self, fingerprints: I) -> Vec<Result<Option<RelayDetails>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handles: Vec<_> = fingerprints
            .into_iter()
            .map(Into::into)
            .map(|fingerprint: String| {
                let client = self.clone();
                tokio::spawn(async move { client.lookup_relay(fingerprint).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => Err(HttpError::network(format!("lookup task failed: {err}")).into()),
            };
            results.push(result);
        }
        results
    }

    async fn lookup_relay(&self, fingerprint: String) -> Result<Option<RelayDetails>> {
        if fingerprint.is_empty() || !fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidInput(format!(
                "not a hex fingerprint: {fingerprint:?}"
            )));
        }

        let EntityBatch { records, rejected } = self
            .relay_details(QueryParams::new().lookup(fingerprint))
            .await?;
        match (records.into_iter().next(), rejected.into_iter().next()) {
            (Some(relay), _) => Ok(Some(relay)),
            // a match that failed to parse is not "no such relay"
            (None, Some(entity)) => Err(entity.error.into()),
            (None, None) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ParseError, ParsePolicy};
    use crate::http::MockTransport;
    use crate::test_utils::{fingerprints, fixtures};
    use mockall::predicate::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    fn ok(data: Value) -> std::result::Result<OnionooResponse<Value>, HttpError> {
        Ok(OnionooResponse::new(200, HashMap::new(), data))
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://onionoo.test").with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_summary_parses_both_lists() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .withf(|req| req.endpoint == Endpoint::Summary && req.get_param("limit") == Some("3"))
            .times(1)
            .returning(|_| ok(fixtures::summary_response()));

        let client = OnionooClient::with_transport(transport, config());
        let response = client.summary(QueryParams::new().limit(3)).await.unwrap();

        assert_eq!(response.relays.len(), 2);
        assert_eq!(response.relays[0].fingerprint, fingerprints::MORIA1);
        assert_eq!(response.bridges[0].hashed_fingerprint, fingerprints::BRIDGE);
        assert_eq!(response.meta.relays_truncated, 7000);
    }

    #[tokio::test]
    async fn test_relay_details_forces_type() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .withf(|req| req.endpoint == Endpoint::Details && req.get_param("type") == Some("relay"))
            .times(1)
            .returning(|_| ok(fixtures::details_response()));

        let client = OnionooClient::with_transport(transport, config());
        let relays = client.relay_details(QueryParams::new()).await.unwrap();
        assert!(relays.is_complete());
        assert_eq!(relays.records.len(), 1);
        assert_eq!(relays.records[0].nickname.as_deref(), Some("moria1"));
    }

    #[tokio::test]
    async fn test_typed_helpers_report_skipped_entities() {
        let mut transport = MockTransport::new();
        transport.expect_fetch().times(1).returning(|_| {
            ok(fixtures::relays_response(vec![
                json!({"nickname": "no-fingerprint"}),
                fixtures::relay_details(),
                json!({"fingerprint": "ZZZZ"}),
            ]))
        });

        let client = OnionooClient::with_transport(
            transport,
            config().with_parse_policy(ParsePolicy::SkipInvalid),
        );
        let relays = client.relay_details(QueryParams::new()).await.unwrap();

        assert!(!relays.is_complete());
        assert_eq!(relays.records.len(), 1);
        assert_eq!(relays.records[0].fingerprint, fingerprints::MORIA1);
        let rejected: Vec<_> = relays
            .rejected
            .iter()
            .map(|entity| (entity.index, entity.error.field()))
            .collect();
        assert_eq!(rejected, vec![(0, Some("fingerprint")), (2, Some("fingerprint"))]);
    }

    #[tokio::test]
    async fn test_lookup_of_unparsable_relay_is_an_error() {
        let mut transport = MockTransport::new();
        transport.expect_fetch().times(1).returning(|_| {
            ok(fixtures::relays_response(vec![
                json!({"fingerprint": fingerprints::MORIA1, "running": "sometimes"}),
            ]))
        });

        let client = OnionooClient::with_transport(
            transport,
            config().with_parse_policy(ParsePolicy::SkipInvalid),
        );
        let mut results = client.lookup_relays([fingerprints::MORIA1]).await;
        let err = results.remove(0).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::TypeCoercion { .. })));
    }

    #[tokio::test]
    async fn test_bridge_summaries_only_needs_bridge_list() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .returning(|_| ok(json!({"bridges": [{"n": "Unnamed", "h": "ABCD", "r": true}]})));

        let client = OnionooClient::with_transport(transport, config());
        let bridges = client.bridge_summaries(QueryParams::new()).await.unwrap();
        assert_eq!(bridges.records[0].hashed_fingerprint, "ABCD");
    }

    #[tokio::test]
    async fn test_restricted_parameter_never_hits_transport() {
        let mut transport = MockTransport::new();
        transport.expect_fetch().times(0);

        let client = OnionooClient::with_transport(transport, config());
        let result = client
            .bandwidth(QueryParams::new().fields(["nickname"]))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let mut transport = MockTransport::new();
        let mut seq = mockall::Sequence::new();
        transport
            .expect_fetch()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(HttpError::service_unavailable("stale")));
        transport
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| ok(fixtures::summary_response()));

        let client = OnionooClient::with_transport(transport, config());
        assert!(client.summary(QueryParams::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .times(3)
            .returning(|_| Err(HttpError::network("connection refused")));

        let client = OnionooClient::with_transport(transport, config().with_max_retries(2));
        let err = client.summary(QueryParams::new()).await.unwrap_err();
        assert!(matches!(err, Error::Http(ref e) if e.status() == 0));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .times(1)
            .returning(|_| Err(HttpError::not_found("no such document")));

        let client = OnionooClient::with_transport(transport, config());
        let err = client.uptime(QueryParams::new()).await.unwrap_err();
        assert!(matches!(err, Error::Http(ref e) if e.status() == 404));
    }

    #[tokio::test]
    async fn test_not_modified_returns_none() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .withf(|req| req.headers.contains_key("If-Modified-Since"))
            .times(1)
            .returning(|_| Err(HttpError::not_modified("")));

        let client = OnionooClient::with_transport(transport, config());
        let since = Utc::now();
        let envelope = client
            .fetch_modified_since(Endpoint::Summary, &QueryParams::new(), since)
            .await
            .unwrap();
        assert!(envelope.is_none());
    }

    #[tokio::test]
    async fn test_parse_policy_from_config() {
        let body = fixtures::relays_response(vec![
            json!({"fingerprint": "AAAA"}),
            json!({"nickname": "broken"}),
        ]);

        let mut transport = MockTransport::new();
        let strict_body = body.clone();
        transport
            .expect_fetch()
            .times(1)
            .returning(move |_| ok(strict_body.clone()));
        let strict = OnionooClient::with_transport(transport, config());
        let err = strict.details(QueryParams::new()).await.unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::MissingField { .. })));

        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .times(1)
            .returning(move |_| ok(body.clone()));
        let lenient = OnionooClient::with_transport(
            transport,
            config().with_parse_policy(ParsePolicy::SkipInvalid),
        );
        let response = lenient.details(QueryParams::new()).await.unwrap();
        assert_eq!(response.relays.len(), 1);
        assert_eq!(response.rejected.len(), 1);
    }

    #[tokio::test]
    async fn test_weights_and_clients_passthrough_lists() {
        let mut transport = MockTransport::new();
        transport
            .expect_fetch()
            .with(function(|req: &OnionooRequest| req.endpoint == Endpoint::Weights))
            .returning(|_| ok(fixtures::relays_response(vec![fixtures::relay_weight()])));
        transport
            .expect_fetch()
            .with(function(|req: &OnionooRequest| req.endpoint == Endpoint::Clients))
            .returning(|_| {
                ok(json!({
                    "relays": [],
                    "bridges": [{"fingerprint": "ABCD", "average_clients": {"1_month": fixtures::history_blob()}}]
                }))
            });

        let client = OnionooClient::with_transport(transport, config());
        let weights = client.weights(QueryParams::new()).await.unwrap();
        assert_eq!(weights.relays.len(), 1);

        let clients = client.clients(QueryParams::new()).await.unwrap();
        assert!(clients.relays.is_empty());
        assert_eq!(clients.bridges[0].fingerprint, "ABCD");
    }

    #[tokio::test]
    async fn test_lookup_relays_keeps_input_order() {
        let mut transport = MockTransport::new();
        transport.expect_fetch().returning(|req| {
            let relays = match req.get_param("lookup") {
                Some(fp) if fp == fingerprints::MORIA1 => vec![fixtures::relay_details()],
                Some(fp) if fp == fingerprints::TOR26 => {
                    vec![json!({"fingerprint": fingerprints::TOR26, "nickname": "tor26"})]
                }
                _ => vec![],
            };
            ok(fixtures::relays_response(relays))
        });

        let client = OnionooClient::with_transport(transport, config());
        let results = client
            .lookup_relays([fingerprints::TOR26, "FFFF", "not hex", fingerprints::MORIA1])
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(
            results[0].as_ref().unwrap().as_ref().unwrap().nickname.as_deref(),
            Some("tor26")
        );
        assert!(results[1].as_ref().unwrap().is_none());
        assert!(matches!(results[2], Err(Error::InvalidInput(_))));
        assert_eq!(
            results[3].as_ref().unwrap().as_ref().unwrap().fingerprint,
            fingerprints::MORIA1
        );
    }
}
