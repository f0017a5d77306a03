//! Uptime documents

use super::error::{EntityKind, ParseError};
use super::flag::Flag;
use super::history::{intervaled_history_from_json, IntervaledHistory};
use super::reader::FieldReader;
use super::Document;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const RELAY_FIELDS: &[&str] = &["fingerprint", "uptime", "flags"];
const BRIDGE_FIELDS: &[&str] = &["fingerprint", "uptime"];

/// Relay uptime document
///
/// Uptime values are fractions of time the relay was running; per-flag
/// histories give the fraction of time the relay carried that flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayUptime {
    /// Relay fingerprint
    pub fingerprint: String,
    /// Fractional uptime, per period
    pub uptime: IntervaledHistory,
    /// Fractional flag assignment, per flag and period
    pub flags: BTreeMap<Flag, IntervaledHistory>,
}

impl Document for RelayUptime {
    const KIND: EntityKind = EntityKind::RelayUptime;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, RELAY_FIELDS)?;

        let flags = reader
            .nested("flags", |value| {
                let object = value
                    .as_object()
                    .ok_or_else(|| ParseError::coercion(Self::KIND, "$", value))?;
                object
                    .iter()
                    .map(|(name, histories)| {
                        let histories = intervaled_history_from_json(histories)
                            .map_err(|err| err.within(Self::KIND, name))?;
                        Ok((Flag::from(name.as_str()), histories))
                    })
                    .collect::<Result<BTreeMap<_, _>, ParseError>>()
            })?
            .unwrap_or_default();

        Ok(Self {
            fingerprint: reader.required_hex("fingerprint")?,
            uptime: reader.histories("uptime")?,
            flags,
        })
    }
}

/// Bridge uptime document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeUptime {
    /// SHA-1 hash of the bridge fingerprint
    pub fingerprint: String,
    /// Fractional uptime, per period
    pub uptime: IntervaledHistory,
}

impl Document for BridgeUptime {
    const KIND: EntityKind = EntityKind::BridgeUptime;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let reader = FieldReader::new(Self::KIND, raw, BRIDGE_FIELDS)?;
        Ok(Self {
            fingerprint: reader.required_hex("fingerprint")?,
            uptime: reader.histories("uptime")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use serde_json::json;

    #[test]
    fn test_relay_uptime_flags() {
        let uptime = RelayUptime::from_json(&fixtures::relay_uptime()).unwrap();
        assert_eq!(uptime.uptime["1_week"].len(), 4);
        assert_eq!(
            uptime.flags.keys().collect::<Vec<_>>(),
            vec![&Flag::Guard, &Flag::Running]
        );
        assert_eq!(uptime.flags[&Flag::Running]["1_week"].factor, 0.5);
    }

    #[test]
    fn test_relay_uptime_flags_must_be_a_map() {
        let raw = json!({"fingerprint": "AB", "flags": ["Running"]});
        let err = RelayUptime::from_json(&raw).unwrap_err();
        assert_eq!(err.field(), Some("flags"));
    }

    #[test]
    fn test_relay_uptime_flag_history_error_path() {
        let mut blob = fixtures::history_blob();
        blob["factor"] = json!(0);
        let raw = json!({"fingerprint": "AB", "flags": {"Guard": {"1_week": blob}}});
        let err = RelayUptime::from_json(&raw).unwrap_err();
        assert_eq!(err.kind(), Some(EntityKind::RelayUptime));
        assert_eq!(err.field(), Some("flags.Guard.1_week"));
    }

    #[test]
    fn test_bridge_uptime() {
        let raw = json!({"fingerprint": "AB", "uptime": {"3_months": fixtures::history_blob()}});
        let uptime = BridgeUptime::from_json(&raw).unwrap();
        assert_eq!(uptime.uptime.len(), 1);
    }
}
