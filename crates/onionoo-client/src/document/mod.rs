//! Onionoo document parsing
//!
//! This module turns raw Onionoo JSON into typed records. It performs no I/O:
//! every function here is a pure, synchronous transform of one document.
//!
//! Reference: <https://metrics.torproject.org/onionoo.html#responses>
//!
//! # Overview
//!
//! - [`Envelope`] separates the response metadata from the raw `relays` and
//!   `bridges` lists
//! - each record type implements [`Document`], which reads required fields,
//!   default-fills optional ones and ignores keys it does not know
//! - [`GraphHistory`] decodes the compact time series embedded in bandwidth,
//!   weights, clients and uptime documents
//!
//! # Example
//!
//! ```rust
//! use onionoo_client::document::{Envelope, ParsePolicy, RelayDetails};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "version": "8.0",
//!     "relays": [{"fingerprint": "ABCD1234", "nickname": "relay1", "flags": ["Running", "Exit"]}]
//! });
//!
//! let envelope = Envelope::from_json(raw).unwrap();
//! let relays = envelope.decode_relays::<RelayDetails>(ParsePolicy::Strict).unwrap();
//! assert_eq!(relays.records[0].nickname.as_deref(), Some("relay1"));
//! ```

pub mod bandwidth;
pub mod clients;
pub mod details;
pub mod envelope;
pub mod error;
pub mod exit_policy;
pub mod flag;
pub mod history;
pub mod reader;
pub mod summary;
pub mod timestamp;
pub mod uptime;
pub mod weights;

pub use bandwidth::{BridgeBandwidth, RelayBandwidth};
pub use clients::BridgeClients;
pub use details::{BridgeDetails, RelayDetails};
pub use envelope::{
    EntityBatch, EntityList, Envelope, EnvelopeMeta, ParsePolicy, RejectedEntity, Response,
};
pub use error::{EntityKind, ParseError};
pub use exit_policy::{ExitPolicy, ExitPolicyRule, ExitPolicySummary, PolicyAction, PortRange};
pub use flag::Flag;
pub use history::{
    graph_history_from_json, intervaled_history_from_json, GraphHistory, IntervaledHistory,
};
pub use summary::{BridgeSummary, RelaySummary};
pub use uptime::{BridgeUptime, RelayUptime};
pub use weights::RelayWeight;

use serde_json::Value;

/// A record that can be deserialized from one entry of an Onionoo entity list
pub trait Document: Sized {
    /// Kind reported in parse errors
    const KIND: EntityKind;

    /// Deserialize one raw JSON object
    fn from_json(raw: &Value) -> Result<Self, ParseError>;
}

/// Raw passthrough for lists a given endpoint never populates
impl Document for Value {
    const KIND: EntityKind = EntityKind::Raw;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        Ok(raw.clone())
    }
}

/// Parse a response body into an [`Envelope`]
pub fn envelope_from_str(body: &str) -> crate::Result<Envelope> {
    let raw: Value = serde_json::from_str(body)?;
    Ok(Envelope::from_json(raw)?)
}
