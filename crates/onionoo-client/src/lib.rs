//! Onionoo Client Library
//!
//! This crate provides an asynchronous client for the Onionoo API, the Tor
//! network status service, together with the typed documents it returns:
//! relay and bridge summaries, details, bandwidth, weights, clients and
//! uptime documents.
//!
//! The crate is split in three layers:
//!
//! - [`http`]: the transport (request type, configuration, retry logic and
//!   the `reqwest` implementation)
//! - [`document`]: the pure parsing core (response envelope, per-entity
//!   deserializers and the graph history decoder)
//! - [`client`]: the high-level [`OnionooClient`] with one entry point per
//!   Onionoo endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use onionoo_client::{ClientConfig, OnionooClient, QueryParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OnionooClient::new(ClientConfig::default())?;
//!
//!     let relays = client
//!         .relay_summaries(QueryParams::new().running(true).limit(10))
//!         .await?;
//!
//!     for relay in relays {
//!         println!("{} {}", relay.fingerprint, relay.nickname.as_deref().unwrap_or("Unnamed"));
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod document;
pub mod http;
pub mod params;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::OnionooClient;
pub use document::{
    graph_history_from_json, intervaled_history_from_json, BridgeBandwidth, BridgeClients,
    BridgeDetails, BridgeSummary, BridgeUptime, Document, EntityBatch, EntityKind, EntityList,
    Envelope, EnvelopeMeta, ExitPolicy, ExitPolicySummary, Flag, GraphHistory,
    IntervaledHistory, ParseError, ParsePolicy, RejectedEntity, RelayBandwidth, RelayDetails,
    RelaySummary, RelayUptime, RelayWeight, Response,
};
pub use http::{ClientConfig, HttpError, HttpTransport, Transport};
pub use params::{Endpoint, NodeType, OrderBy, OrderField, QueryParams};

/// Result type for Onionoo client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Onionoo client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport or HTTP status error
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// The document did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The response body was not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input (e.g. a parameter the endpoint does not accept)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = Error::InvalidInput("test".to_string());
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_error_from_parse_error() {
        let err: Error = ParseError::MissingField {
            kind: EntityKind::RelayDetails,
            field: "fingerprint".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("fingerprint"));
    }

    #[test]
    fn test_error_from_http_error() {
        let err: Error = HttpError::not_found("no such relay").into();
        assert!(err.to_string().contains("404"));
    }
}
