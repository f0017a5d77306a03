//! Clients documents

use super::error::{EntityKind, ParseError};
use super::history::IntervaledHistory;
use super::reader::FieldReader;
use super::Document;
use serde::Serialize;
use serde_json::Value;

const FIELDS: &[&str] = &["fingerprint", "average_clients"];

/// Bridge clients document: estimated average number of clients per day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeClients {
    /// SHA-1 hash of the bridge fingerprint
    pub fingerprint: String,
    /// Average number of clients, per period
    pub average_clients: IntervaledHistory,
}

impl Document for BridgeClients {
    const KIND: EntityKind = EntityKind::BridgeClients;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, FIELDS)?;
        Ok(Self {
            fingerprint: reader.required_hex("fingerprint")?,
            average_clients: reader.histories("average_clients")?,
        })
    }
}
