//! Weights documents
//!
//! Only relays have path selection weights, so there is no bridge variant.

use super::error::{EntityKind, ParseError};
use super::history::IntervaledHistory;
use super::reader::FieldReader;
use super::Document;
use serde::Serialize;
use serde_json::Value;

const FIELDS: &[&str] = &[
    "fingerprint",
    "consensus_weight_fraction",
    "guard_probability",
    "middle_probability",
    "exit_probability",
    "consensus_weight",
];

/// Relay weights document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayWeight {
    /// Relay fingerprint
    pub fingerprint: String,
    /// Share of the total consensus weight
    pub consensus_weight_fraction: IntervaledHistory,
    /// Probability of selection in the guard position
    pub guard_probability: IntervaledHistory,
    /// Probability of selection in the middle position
    pub middle_probability: IntervaledHistory,
    /// Probability of selection in the exit position
    pub exit_probability: IntervaledHistory,
    /// Absolute consensus weight
    pub consensus_weight: IntervaledHistory,
}

impl Document for RelayWeight {
    const KIND: EntityKind = EntityKind::RelayWeight;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, FIELDS)?;
        Ok(Self {
            fingerprint: reader.required_hex("fingerprint")?,
            consensus_weight_fraction: reader.histories("consensus_weight_fraction")?,
            guard_probability: reader.histories("guard_probability")?,
            middle_probability: reader.histories("middle_probability")?,
            exit_probability: reader.histories("exit_probability")?,
            consensus_weight: reader.histories("consensus_weight")?,
        })
    }
}
