//! Details documents
//!
//! The `fields` query parameter can strip any field from a details document,
//! so only the fingerprint is required. Everything else is optional.
//!
//! Reference: <https://metrics.torproject.org/onionoo.html#details>

use super::error::{EntityKind, ParseError};
use super::exit_policy::{ExitPolicy, ExitPolicySummary};
use super::flag::Flag;
use super::reader::FieldReader;
use super::Document;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

const RELAY_FIELDS: &[&str] = &[
    "nickname",
    "fingerprint",
    "or_addresses",
    "exit_addresses",
    "dir_address",
    "last_seen",
    "last_changed_address_or_port",
    "first_seen",
    "running",
    "hibernating",
    "flags",
    "country",
    "country_name",
    "region_name",
    "city_name",
    "latitude",
    "longitude",
    "as",
    "as_name",
    "consensus_weight",
    "verified_host_names",
    "unverified_host_names",
    "last_restarted",
    "bandwidth_rate",
    "bandwidth_burst",
    "observed_bandwidth",
    "advertised_bandwidth",
    "exit_policy",
    "exit_policy_summary",
    "exit_policy_v6_summary",
    "contact",
    "platform",
    "version",
    "recommended_version",
    "version_status",
    "effective_family",
    "alleged_family",
    "indirect_family",
    "consensus_weight_fraction",
    "guard_probability",
    "middle_probability",
    "exit_probability",
    "measured",
    "unreachable_or_addresses",
];

const BRIDGE_FIELDS: &[&str] = &[
    "nickname",
    "hashed_fingerprint",
    "or_addresses",
    "last_seen",
    "first_seen",
    "running",
    "flags",
    "last_restarted",
    "advertised_bandwidth",
    "platform",
    "version",
    "recommended_version",
    "version_status",
    "transports",
    "bridgedb_distributor",
];

/// Relay details document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayDetails {
    /// Relay nickname, 1 to 19 alphanumerical characters
    pub nickname: Option<String>,
    /// Relay fingerprint, upper-case hex
    pub fingerprint: String,
    /// Addresses and ports accepting onion-routing connections
    pub or_addresses: Vec<String>,
    /// IPv4 addresses used to exit in the past 24 hours
    pub exit_addresses: Vec<String>,
    /// Address and port accepting directory connections
    pub dir_address: Option<String>,
    /// Last time the relay was seen in a consensus
    pub last_seen: Option<DateTime<Utc>>,
    /// Last time the relay stopped announcing an address or port
    pub last_changed_address_or_port: Option<DateTime<Utc>>,
    /// First time the relay was seen in a consensus
    pub first_seen: Option<DateTime<Utc>>,
    /// Last (re-)start of the relay
    pub last_restarted: Option<DateTime<Utc>>,
    /// Whether the relay was running in the last consensus
    pub running: Option<bool>,
    /// Whether the relay reported hibernating
    pub hibernating: Option<bool>,
    /// Flags assigned by the directory authorities
    pub flags: Vec<Flag>,
    /// Two-letter lower-case country code
    pub country: Option<String>,
    /// Country name
    pub country_name: Option<String>,
    /// Region name
    pub region_name: Option<String>,
    /// City name
    pub city_name: Option<String>,
    /// Latitude
    pub latitude: Option<f64>,
    /// Longitude
    pub longitude: Option<f64>,
    /// AS number, e.g. `"AS3"`
    #[serde(rename = "as")]
    pub as_number: Option<String>,
    /// AS name
    pub as_name: Option<String>,
    /// Reverse DNS names with a matching A record
    pub verified_host_names: Vec<String>,
    /// Reverse DNS names without a matching A record
    pub unverified_host_names: Vec<String>,
    /// Average bandwidth in bytes per second
    pub bandwidth_rate: Option<u64>,
    /// Burst bandwidth in bytes per second
    pub bandwidth_burst: Option<u64>,
    /// Bandwidth estimate in bytes per second
    pub observed_bandwidth: Option<u64>,
    /// Bandwidth the relay is willing and capable to provide
    pub advertised_bandwidth: Option<u64>,
    /// Path selection weight assigned by the directory authorities
    pub consensus_weight: Option<u64>,
    /// Full exit policy, empty when not published
    pub exit_policy: ExitPolicy,
    /// IPv4 exit policy summary
    pub exit_policy_summary: Option<ExitPolicySummary>,
    /// IPv6 exit policy summary
    pub exit_policy_v6_summary: Option<ExitPolicySummary>,
    /// Operator contact
    pub contact: Option<String>,
    /// Platform string
    pub platform: Option<String>,
    /// Tor version from the consensus
    pub version: Option<String>,
    /// Whether the version is recommended
    pub recommended_version: Option<bool>,
    /// Status of the version, e.g. `"recommended"` or `"obsolete"`
    pub version_status: Option<String>,
    /// Fingerprints in a mutual family relationship
    pub effective_family: Vec<String>,
    /// Fingerprints listed as family that do not list this relay back
    pub alleged_family: Vec<String>,
    /// Fingerprints reachable through effective family relationships
    pub indirect_family: Vec<String>,
    /// Share of the total consensus weight
    pub consensus_weight_fraction: Option<f64>,
    /// Probability of selection in the guard position
    pub guard_probability: Option<f64>,
    /// Probability of selection in the middle position
    pub middle_probability: Option<f64>,
    /// Probability of selection in the exit position
    pub exit_probability: Option<f64>,
    /// Whether the weight is based on three or more measurements
    pub measured: Option<bool>,
    /// Additional addresses found unreachable
    pub unreachable_or_addresses: Vec<String>,
}

impl RelayDetails {
    /// Whether the relay carries `flag`
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }
}

impl Document for RelayDetails {
    const KIND: EntityKind = EntityKind::RelayDetails;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let r = FieldReader::new(Self::KIND, raw, RELAY_FIELDS)?;

        Ok(Self {
            fingerprint: r.required_hex("fingerprint")?,
            nickname: r.opt_str("nickname")?,
            or_addresses: r.str_list("or_addresses")?,
            exit_addresses: r.str_list("exit_addresses")?,
            dir_address: r.opt_str("dir_address")?,
            last_seen: r.opt_timestamp("last_seen")?,
            last_changed_address_or_port: r.opt_timestamp("last_changed_address_or_port")?,
            first_seen: r.opt_timestamp("first_seen")?,
            last_restarted: r.opt_timestamp("last_restarted")?,
            running: r.opt_bool("running")?,
            hibernating: r.opt_bool("hibernating")?,
            flags: r.flags("flags")?,
            country: r.opt_str("country")?,
            country_name: r.opt_str("country_name")?,
            region_name: r.opt_str("region_name")?,
            city_name: r.opt_str("city_name")?,
            latitude: r.opt_f64("latitude")?,
            longitude: r.opt_f64("longitude")?,
            as_number: r.opt_str("as")?,
            as_name: r.opt_str("as_name")?,
            verified_host_names: r.str_list("verified_host_names")?,
            unverified_host_names: r.str_list("unverified_host_names")?,
            bandwidth_rate: r.opt_u64("bandwidth_rate")?,
            bandwidth_burst: r.opt_u64("bandwidth_burst")?,
            observed_bandwidth: r.opt_u64("observed_bandwidth")?,
            advertised_bandwidth: r.opt_u64("advertised_bandwidth")?,
            consensus_weight: r.opt_u64("consensus_weight")?,
            exit_policy: r
                .nested("exit_policy", ExitPolicy::from_json)?
                .unwrap_or_default(),
            exit_policy_summary: r.nested("exit_policy_summary", ExitPolicySummary::from_json)?,
            exit_policy_v6_summary: r
                .nested("exit_policy_v6_summary", ExitPolicySummary::from_json)?,
            contact: r.opt_str("contact")?,
            platform: r.opt_str("platform")?,
            version: r.opt_str("version")?,
            recommended_version: r.opt_bool("recommended_version")?,
            version_status: r.opt_str("version_status")?,
            effective_family: r.str_list("effective_family")?,
            alleged_family: r.str_list("alleged_family")?,
            indirect_family: r.str_list("indirect_family")?,
            consensus_weight_fraction: r.opt_f64("consensus_weight_fraction")?,
            guard_probability: r.opt_f64("guard_probability")?,
            middle_probability: r.opt_f64("middle_probability")?,
            exit_probability: r.opt_f64("exit_probability")?,
            measured: r.opt_bool("measured")?,
            unreachable_or_addresses: r.str_list("unreachable_or_addresses")?,
        })
    }
}

/// Bridge details document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDetails {
    /// Bridge nickname
    pub nickname: Option<String>,
    /// SHA-1 hash of the bridge fingerprint
    pub hashed_fingerprint: String,
    /// Sanitized onion-routing addresses and ports
    pub or_addresses: Vec<String>,
    /// Last time the bridge was seen in a network status
    pub last_seen: Option<DateTime<Utc>>,
    /// First time the bridge was seen in a network status
    pub first_seen: Option<DateTime<Utc>>,
    /// Whether the bridge was running in the last network status
    pub running: Option<bool>,
    /// Flags assigned by the bridge authority
    pub flags: Vec<Flag>,
    /// Last (re-)start of the bridge
    pub last_restarted: Option<DateTime<Utc>>,
    /// Bandwidth the bridge is willing and capable to provide
    pub advertised_bandwidth: Option<u64>,
    /// Platform string
    pub platform: Option<String>,
    /// Tor version
    pub version: Option<String>,
    /// Whether the version is recommended
    pub recommended_version: Option<bool>,
    /// Status of the version
    pub version_status: Option<String>,
    /// Supported pluggable transport names
    pub transports: Vec<String>,
    /// BridgeDB distributor the bridge is assigned to
    pub bridgedb_distributor: Option<String>,
}

impl Document for BridgeDetails {
    const KIND: EntityKind = EntityKind::BridgeDetails;

    fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let r = FieldReader::new(Self::KIND, raw, BRIDGE_FIELDS)?;

        Ok(Self {
            hashed_fingerprint: r.required_hex("hashed_fingerprint")?,
            nickname: r.opt_str("nickname")?,
            or_addresses: r.str_list("or_addresses")?,
            last_seen: r.opt_timestamp("last_seen")?,
            first_seen: r.opt_timestamp("first_seen")?,
            running: r.opt_bool("running")?,
            flags: r.flags("flags")?,
            last_restarted: r.opt_timestamp("last_restarted")?,
            advertised_bandwidth: r.opt_u64("advertised_bandwidth")?,
            platform: r.opt_str("platform")?,
            version: r.opt_str("version")?,
            recommended_version: r.opt_bool("recommended_version")?,
            version_status: r.opt_str("version_status")?,
            transports: r.str_list("transports")?,
            bridgedb_distributor: r.opt_str("bridgedb_distributor")?,
        })
    }
}
