//! Query parameters for the Onionoo endpoints
//!
//! Onionoo selects, orders and pages documents through a shared set of query
//! parameters. Not every endpoint accepts every parameter; see
//! [`Endpoint::restricted`].
//!
//! Reference: <https://metrics.torproject.org/onionoo.html#parameters>

use crate::document::{timestamp, Flag};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::{Bound, RangeBounds};

/// Onionoo document endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/summary`
    Summary,
    /// `/details`
    Details,
    /// `/bandwidth`
    Bandwidth,
    /// `/weights`
    Weights,
    /// `/clients`
    Clients,
    /// `/uptime`
    Uptime,
}

impl Endpoint {
    /// Every endpoint
    pub const ALL: [Endpoint; 6] = [
        Endpoint::Summary,
        Endpoint::Details,
        Endpoint::Bandwidth,
        Endpoint::Weights,
        Endpoint::Clients,
        Endpoint::Uptime,
    ];

    /// URL path of the endpoint
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Summary => "/summary",
            Endpoint::Details => "/details",
            Endpoint::Bandwidth => "/bandwidth",
            Endpoint::Weights => "/weights",
            Endpoint::Clients => "/clients",
            Endpoint::Uptime => "/uptime",
        }
    }

    /// Parameters the endpoint does not accept
    pub fn restricted(&self) -> &'static [&'static str] {
        match self {
            Endpoint::Details => &[],
            Endpoint::Clients => &["fields", "host_name", "country", "family", "flag", "contact"],
            _ => &["fields"],
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Node category selected by the `type` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Relays only
    Relay,
    /// Bridges only
    Bridge,
}

impl NodeType {
    /// Value sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Relay => "relay",
            NodeType::Bridge => "bridge",
        }
    }
}

/// Field documents can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    /// Consensus weight
    ConsensusWeight,
    /// First seen timestamp
    FirstSeen,
}

impl OrderField {
    /// Name used by the `order` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderField::ConsensusWeight => "consensus_weight",
            OrderField::FirstSeen => "first_seen",
        }
    }
}

/// One ordering criterion
///
/// # Examples
/// ```
/// use onionoo_client::{OrderBy, OrderField};
///
/// assert_eq!(OrderBy::desc(OrderField::ConsensusWeight).to_string(), "-consensus_weight");
/// assert_eq!(OrderBy::asc(OrderField::FirstSeen).to_string(), "first_seen");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderBy {
    /// Field to order by
    pub field: OrderField,
    /// Whether the order is descending
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order
    pub fn asc(field: OrderField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    /// Descending order
    pub fn desc(field: OrderField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

/// Query parameters shared by all endpoints
///
/// # Examples
/// ```
/// use onionoo_client::{Flag, NodeType, QueryParams};
///
/// let params = QueryParams::new()
///     .node_type(NodeType::Relay)
///     .flag(Flag::Exit)
///     .running(true)
///     .limit(10);
///
/// assert_eq!(
///     params.to_pairs(),
///     vec![
///         ("type", "relay".to_string()),
///         ("running", "true".to_string()),
///         ("flag", "Exit".to_string()),
///         ("limit", "10".to_string()),
///     ]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    node_type: Option<NodeType>,
    running: Option<bool>,
    search: Option<String>,
    lookup: Option<String>,
    fingerprint: Option<String>,
    country: Option<String>,
    as_number: Option<String>,
    as_name: Option<String>,
    flag: Option<Flag>,
    first_seen_days: Option<String>,
    last_seen_days: Option<String>,
    first_seen_since: Option<DateTime<Utc>>,
    last_seen_since: Option<DateTime<Utc>>,
    contact: Option<String>,
    family: Option<String>,
    version: Option<String>,
    os: Option<String>,
    host_name: Option<String>,
    recommended_version: Option<bool>,
    fields: Vec<String>,
    order: Vec<OrderBy>,
    offset: Option<u64>,
    limit: Option<u64>,
    invalid: Vec<String>,
}

impl QueryParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Return only relays or only bridges
    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    /// Return only running or only non-running nodes
    pub fn running(mut self, running: bool) -> Self {
        self.running = Some(running);
        self
    }

    /// Full-text search over nicknames, fingerprints and addresses
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    /// Exact fingerprint or hashed fingerprint lookup
    pub fn lookup(mut self, fingerprint: impl Into<String>) -> Self {
        self.lookup = Some(fingerprint.into());
        self
    }

    /// Fingerprint lookup that also returns nodes not seen recently
    pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// Two-letter country code
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// AS number, with or without the `AS` prefix
    pub fn as_number(mut self, as_number: impl Into<String>) -> Self {
        self.as_number = Some(as_number.into());
        self
    }

    /// Substring of the AS name
    pub fn as_name(mut self, as_name: impl Into<String>) -> Self {
        self.as_name = Some(as_name.into());
        self
    }

    /// Relays carrying a flag
    pub fn flag(mut self, flag: Flag) -> Self {
        self.flag = Some(flag);
        self
    }

    /// Nodes first seen within a range of days ago
    ///
    /// An empty range such as `3..3` is reported by [`validate_for`](Self::validate_for).
    pub fn first_seen_days(mut self, days: impl RangeBounds<u32>) -> Self {
        self.first_seen_days = self.day_range("first_seen_days", days);
        self
    }

    /// Nodes last seen within a range of days ago
    pub fn last_seen_days(mut self, days: impl RangeBounds<u32>) -> Self {
        self.last_seen_days = self.day_range("last_seen_days", days);
        self
    }

    fn day_range(&mut self, name: &str, days: impl RangeBounds<u32>) -> Option<String> {
        let range = day_range(days);
        if range.is_none() {
            self.invalid.push(format!("{name} range is empty"));
        }
        range
    }

    /// Nodes first seen at or after a timestamp
    pub fn first_seen_since(mut self, since: DateTime<Utc>) -> Self {
        self.first_seen_since = Some(since);
        self
    }

    /// Nodes last seen at or after a timestamp
    pub fn last_seen_since(mut self, since: DateTime<Utc>) -> Self {
        self.last_seen_since = Some(since);
        self
    }

    /// Substring of the operator contact
    pub fn contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Family of the relay with the given fingerprint
    pub fn family(mut self, fingerprint: impl Into<String>) -> Self {
        self.family = Some(fingerprint.into());
        self
    }

    /// Tor version prefix
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Operating system prefix
    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Host name suffix
    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = Some(host_name.into());
        self
    }

    /// Nodes running a recommended Tor version or not
    pub fn recommended_version(mut self, recommended: bool) -> Self {
        self.recommended_version = Some(recommended);
        self
    }

    /// Restrict details documents to these fields
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Append an ordering criterion
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Skip this many documents
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Return at most this many documents
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Requested node type, if any
    pub fn requested_type(&self) -> Option<NodeType> {
        self.node_type
    }

    /// Encode as `(name, value)` pairs in a stable order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        let mut push = |name: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((name, value));
            }
        };

        push("type", self.node_type.map(|t| t.as_str().to_string()));
        push("running", self.running.map(|r| r.to_string()));
        push("search", self.search.clone());
        push("lookup", self.lookup.clone());
        push("fingerprint", self.fingerprint.clone());
        push("country", self.country.clone());
        push("as", self.as_number.clone());
        push("as_name", self.as_name.clone());
        push("flag", self.flag.as_ref().map(|f| f.as_str().to_string()));
        push("first_seen_days", self.first_seen_days.clone());
        push("last_seen_days", self.last_seen_days.clone());
        push(
            "first_seen_since",
            self.first_seen_since.as_ref().map(timestamp::encode_utc),
        );
        push(
            "last_seen_since",
            self.last_seen_since.as_ref().map(timestamp::encode_utc),
        );
        push("contact", self.contact.clone());
        push("family", self.family.clone());
        push("version", self.version.clone());
        push("os", self.os.clone());
        push("host_name", self.host_name.clone());
        push(
            "recommended_version",
            self.recommended_version.map(|r| r.to_string()),
        );
        push(
            "fields",
            (!self.fields.is_empty()).then(|| self.fields.join(",")),
        );
        push(
            "order",
            (!self.order.is_empty()).then(|| {
                self.order
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            }),
        );
        push("offset", self.offset.map(|o| o.to_string()));
        push("limit", self.limit.map(|l| l.to_string()));

        pairs
    }

    /// Check that every set parameter is accepted by `endpoint`
    pub fn validate_for(&self, endpoint: Endpoint) -> Result<()> {
        if !self.invalid.is_empty() {
            return Err(Error::InvalidInput(self.invalid.join(", ")));
        }

        let rejected: Vec<&str> = self
            .to_pairs()
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| endpoint.restricted().contains(name))
            .collect();

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "the following parameters are not allowed on {}: {}",
                endpoint,
                rejected.join(", ")
            )))
        }
    }
}

/// Encode a day range as `x-y`, `-y`, `x-` or `x`; `None` if it is empty
fn day_range(days: impl RangeBounds<u32>) -> Option<String> {
    let start = match days.start_bound() {
        Bound::Included(&start) => Some(start),
        Bound::Excluded(&start) => Some(start.checked_add(1)?),
        Bound::Unbounded => None,
    };
    let end = match days.end_bound() {
        Bound::Included(&end) => Some(end),
        Bound::Excluded(&end) => Some(end.checked_sub(1)?),
        Bound::Unbounded => None,
    };

    let range = match (start, end) {
        (Some(start), Some(end)) if start > end => return None,
        (Some(start), Some(end)) if start == end => start.to_string(),
        (start, end) => format!(
            "{}-{}",
            start.map(|s| s.to_string()).unwrap_or_default(),
            end.map(|e| e.to_string()).unwrap_or_default()
        ),
    };
    Some(range)
}
