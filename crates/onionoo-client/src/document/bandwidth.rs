//! Bandwidth documents

use super::error::{EntityKind, ParseError};
use super::history::IntervaledHistory;
use super::reader::FieldReader;
use super::Document;
use serde::Serialize;
use serde_json::Value;

const FIELDS: &[&str] = &["fingerprint", "write_history", "read_history"];

/// Relay bandwidth document: bytes per second written and read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayBandwidth {
    /// Relay fingerprint
    pub fingerprint: String,
    /// Written bytes per second, per period
    pub write_history: IntervaledHistory,
    /// Read bytes per second, per period
    pub read_history: IntervaledHistory,
}

impl Document for RelayBandwidth {
    const KIND: EntityKind = EntityKind::RelayBandwidth;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, FIELDS)?;
        Ok(Self {
            fingerprint: reader.required_hex("fingerprint")?,
            write_history: reader.histories("write_history")?,
            read_history: reader.histories("read_history")?,
        })
    }
}

/// Bridge bandwidth document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeBandwidth {
    /// SHA-1 hash of the bridge fingerprint
    pub fingerprint: String,
    /// Written bytes per second, per period
    pub write_history: IntervaledHistory,
    /// Read bytes per second, per period
    pub read_history: IntervaledHistory,
}

impl Document for BridgeBandwidth {
    const KIND: EntityKind = EntityKind::BridgeBandwidth;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, FIELDS)?;
        Ok(Self {
            fingerprint: reader.required_hex("fingerprint")?,
            write_history: reader.histories("write_history")?,
            read_history: reader.histories("read_history")?,
        })
    }
}
