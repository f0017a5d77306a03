//! Test utilities and fixtures for Onionoo client testing
//!
//! Sample documents are trimmed copies of real Onionoo responses.

#![allow(dead_code)] // Test utilities may not all be used yet

/// Well-known fingerprints
pub mod fingerprints {
    /// moria1 directory authority
    pub const MORIA1: &str = "9695DFC35FFEB861329B9F1AB04C46397020CE31";

    /// tor26 directory authority
    pub const TOR26: &str = "847B1F850344D7876491A54892F904934E4EB85D";

    /// A hashed bridge fingerprint
    pub const BRIDGE: &str = "0010D49C6DA1E46A316563099F41BFE40B6C7183";
}

/// Sample Onionoo documents
pub mod fixtures {
    use super::fingerprints::*;
    use serde_json::{json, Value};

    /// Four samples over a day, factor 0.5
    pub fn history_blob() -> Value {
        json!({
            "first": "2023-01-01",
            "last": "2023-01-02",
            "interval": 3600,
            "factor": 0.5,
            "values": [2, 4, null, 6]
        })
    }

    /// Summary response with two relays and one bridge
    pub fn summary_response() -> Value {
        json!({
            "version": "8.0",
            "build_revision": "0a1b2c3",
            "relays_published": "2024-05-01 12:00:00",
            "relays_truncated": 7000,
            "relays": [
                {"n": "moria1", "f": MORIA1, "a": ["128.31.0.34"], "r": true},
                {"n": "tor26", "f": TOR26, "a": ["217.196.147.77"], "r": true}
            ],
            "bridges_published": "2024-05-01 11:41:00",
            "bridges": [
                {"n": "Unnamed", "h": BRIDGE, "r": false}
            ]
        })
    }

    /// Full relay details document
    pub fn relay_details() -> Value {
        json!({
            "nickname": "moria1",
            "fingerprint": MORIA1,
            "or_addresses": ["128.31.0.34:9101"],
            "dir_address": "128.31.0.34:9131",
            "last_seen": "2024-05-01 12:00:00",
            "last_changed_address_or_port": "2021-02-22 20:00:00",
            "first_seen": "2007-10-27 12:00:00",
            "running": true,
            "flags": ["Authority", "Running", "Shiny", "Stable", "V2Dir", "Valid"],
            "country": "us",
            "country_name": "United States of America",
            "latitude": 42.3626,
            "longitude": -71.0843,
            "as": "AS3",
            "as_name": "Massachusetts Institute of Technology",
            "consensus_weight": 20,
            "last_restarted": "2024-04-17 19:12:52",
            "bandwidth_rate": 51200,
            "bandwidth_burst": 102400,
            "observed_bandwidth": 356126,
            "advertised_bandwidth": 51200,
            "exit_policy": ["reject *:*"],
            "exit_policy_summary": {"reject": ["1-65535"]},
            "contact": "1024D/EB5A896A28988BF5 arma mit edu",
            "platform": "Tor 0.4.9.0-alpha-dev on Linux",
            "version": "0.4.9.0-alpha-dev",
            "version_status": "experimental",
            "effective_family": [MORIA1],
            "consensus_weight_fraction": 0.0000012,
            "guard_probability": 0.0,
            "middle_probability": 0.0000036,
            "exit_probability": 0.0,
            "measured": true,
            "overload_general_timestamp": 1714564800000u64
        })
    }

    /// Bridge details document
    pub fn bridge_details() -> Value {
        json!({
            "nickname": "Unnamed",
            "hashed_fingerprint": BRIDGE,
            "or_addresses": ["10.16.138.100:443"],
            "last_seen": "2024-05-01 11:41:00",
            "first_seen": "2023-11-08 06:00:00",
            "running": true,
            "flags": ["Running", "Valid"],
            "advertised_bandwidth": 1056768,
            "platform": "Tor 0.4.8.9 on Linux",
            "version": "0.4.8.9",
            "recommended_version": true,
            "version_status": "recommended",
            "transports": ["obfs4"],
            "bridgedb_distributor": "moat"
        })
    }

    /// Details response with one relay and one bridge
    pub fn details_response() -> Value {
        json!({
            "version": "8.0",
            "relays_published": "2024-05-01 12:00:00",
            "relays": [relay_details()],
            "bridges_published": "2024-05-01 11:41:00",
            "bridges": [bridge_details()]
        })
    }

    /// Relay bandwidth document
    pub fn relay_bandwidth() -> Value {
        json!({
            "fingerprint": MORIA1,
            "write_history": {"1_month": history_blob(), "6_months": history_blob()},
            "read_history": {"1_month": history_blob()}
        })
    }

    /// Relay weights document
    pub fn relay_weight() -> Value {
        json!({
            "fingerprint": MORIA1,
            "consensus_weight_fraction": {"1_month": history_blob()},
            "guard_probability": {"1_month": history_blob()},
            "middle_probability": {"1_month": history_blob()},
            "consensus_weight": {"1_month": history_blob()}
        })
    }

    /// Relay uptime document with per-flag histories
    pub fn relay_uptime() -> Value {
        json!({
            "fingerprint": MORIA1,
            "uptime": {"1_week": history_blob()},
            "flags": {
                "Running": {"1_week": history_blob()},
                "Guard": {"1_week": history_blob()}
            }
        })
    }

    /// Wrap relay documents in a response envelope with an empty bridge list
    pub fn relays_response(relays: Vec<Value>) -> Value {
        json!({
            "version": "8.0",
            "relays_published": "2024-05-01 12:00:00",
            "relays": relays,
            "bridges_published": "2024-05-01 11:41:00",
            "bridges": []
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Envelope, RelayDetails};

    #[test]
    fn test_fixture_documents_parse() {
        let envelope = Envelope::from_json(fixtures::details_response()).unwrap();
        assert_eq!(envelope.relays().unwrap().len(), 1);
        assert_eq!(envelope.bridges().unwrap().len(), 1);

        let relay = RelayDetails::from_json(&fixtures::relay_details()).unwrap();
        assert_eq!(relay.fingerprint, fingerprints::MORIA1);
    }

    #[test]
    fn test_relays_response_wrapper() {
        let raw = fixtures::relays_response(vec![fixtures::relay_details()]);
        let envelope = Envelope::from_json(raw).unwrap();
        assert!(envelope.bridges().unwrap().is_empty());
    }
}
