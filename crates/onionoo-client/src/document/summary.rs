//! Summary documents
//!
//! Upstream serves summaries with one-letter keys (`n`, `f`, `h`, `a`, `r`).
//! Both those and the long names are accepted.

use super::error::{EntityKind, ParseError};
use super::reader::FieldReader;
use super::Document;
use serde::Serialize;
use serde_json::Value;

const RELAY_FIELDS: &[&str] = &[
    "n",
    "nickname",
    "f",
    "fingerprint",
    "a",
    "addresses",
    "r",
    "running",
];

const BRIDGE_FIELDS: &[&str] = &[
    "n",
    "nickname",
    "h",
    "hashed_fingerprint",
    "r",
    "running",
];

/// Relay summary document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelaySummary {
    /// Relay nickname
    pub nickname: Option<String>,
    /// Relay fingerprint, upper-case hex
    pub fingerprint: String,
    /// Onion-routing and exit addresses; the first is the primary address
    pub addresses: Vec<String>,
    /// Whether the relay was running in the last consensus
    pub running: Option<bool>,
}

impl Document for RelaySummary {
    const KIND: EntityKind = EntityKind::RelaySummary;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, RELAY_FIELDS)?;

        Ok(Self {
            fingerprint: reader.required_hex(reader.resolve(&["fingerprint", "f"]))?,
            nickname: reader.opt_str(reader.resolve(&["nickname", "n"]))?,
            addresses: reader.str_list(reader.resolve(&["addresses", "a"]))?,
            running: reader.opt_bool(reader.resolve(&["running", "r"]))?,
        })
    }
}

/// Bridge summary document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeSummary {
    /// Bridge nickname
    pub nickname: Option<String>,
    /// SHA-1 hash of the bridge fingerprint
    pub hashed_fingerprint: String,
    /// Whether the bridge was running in the last bridge network status
    pub running: Option<bool>,
}

impl Document for BridgeSummary {
    const KIND: EntityKind = EntityKind::BridgeSummary;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, BRIDGE_FIELDS)?;

        Ok(Self {
            hashed_fingerprint: reader
                .required_hex(reader.resolve(&["hashed_fingerprint", "h"]))?,
            nickname: reader.opt_str(reader.resolve(&["nickname", "n"]))?,
            running: reader.opt_bool(reader.resolve(&["running", "r"]))?,
        })
    }
}
