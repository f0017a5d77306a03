//! Exit policies and exit policy summaries
//!
//! A full exit policy is an ordered list of `accept`/`reject` lines where the
//! first matching line wins. The summary form published by Onionoo is a
//! single accept or reject list of ports and port ranges.

use super::error::{EntityKind, ParseError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const KIND: EntityKind = EntityKind::ExitPolicy;

/// Whether a rule accepts or rejects matching traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Traffic is allowed to exit
    Accept,
    /// Traffic is refused
    Reject,
}

impl PolicyAction {
    /// Keyword used in policy lines and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Accept => "accept",
            PolicyAction::Reject => "reject",
        }
    }
}

/// Inclusive range of TCP ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PortRange {
    /// First port of the range
    pub start: u16,
    /// Last port of the range
    pub end: u16,
}

impl PortRange {
    /// Every port (`*` or `1-65535`)
    pub const ALL: PortRange = PortRange {
        start: 1,
        end: u16::MAX,
    };

    /// Range covering a single port
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Whether `port` is in the range
    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }
}

impl FromStr for PortRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(PortRange::ALL);
        }

        let parse_port = |p: &str| p.trim().parse::<u16>().map_err(|_| s.to_string());

        let range = match s.split_once('-') {
            Some((start, end)) => PortRange {
                start: parse_port(start)?,
                end: parse_port(end)?,
            },
            None => PortRange::single(parse_port(s)?),
        };

        if range.start > range.end {
            return Err(s.to_string());
        }
        Ok(range)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == PortRange::ALL {
            f.write_str("*")
        } else if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// One line of an exit policy, e.g. `reject 10.0.0.0/8:*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitPolicyRule {
    /// Accept or reject
    pub action: PolicyAction,
    /// Written with the IPv6-only keyword (`accept6`/`reject6`)
    pub ipv6_only: bool,
    /// Address pattern (`*`, an address, or a network in CIDR notation)
    pub address: String,
    /// Ports the rule applies to
    pub ports: PortRange,
}

impl ExitPolicyRule {
    /// Whether the rule applies to traffic to any address on `port`
    pub fn matches_port(&self, port: u16) -> bool {
        self.address == "*" && self.ports.contains(port)
    }
}

impl FromStr for ExitPolicyRule {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (keyword, target) = line.trim().split_once(' ').ok_or_else(|| line.to_string())?;

        let (action, ipv6_only) = match keyword {
            "accept" => (PolicyAction::Accept, false),
            "accept6" => (PolicyAction::Accept, true),
            "reject" => (PolicyAction::Reject, false),
            "reject6" => (PolicyAction::Reject, true),
            _ => return Err(line.to_string()),
        };

        let (address, ports) = target
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| line.to_string())?;

        if address.is_empty() {
            return Err(line.to_string());
        }

        Ok(Self {
            action,
            ipv6_only,
            address: address.to_string(),
            ports: ports.parse().map_err(|_| line.to_string())?,
        })
    }
}

impl fmt::Display for ExitPolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let family = if self.ipv6_only { "6" } else { "" };
        write!(
            f,
            "{}{} {}:{}",
            self.action.as_str(),
            family,
            self.address,
            self.ports
        )
    }
}

/// Ordered exit policy; the first matching rule decides
///
/// # Examples
/// ```
/// use onionoo_client::document::ExitPolicy;
///
/// let policy = ExitPolicy::from_lines(["reject *:25", "accept *:*"]).unwrap();
/// assert!(!policy.allows_port(25));
/// assert!(policy.allows_port(443));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExitPolicy {
    rules: Vec<ExitPolicyRule>,
}

impl ExitPolicy {
    /// Parse policy lines, keeping their order
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules: Vec<ExitPolicyRule> = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let line = line.as_ref();
                line.parse().map_err(|_| ParseError::TypeCoercion {
                    kind: KIND,
                    field: format!("[{i}]"),
                    raw: Value::String(line.to_string()).to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { rules })
    }

    /// Parse the JSON array form used in details documents
    pub fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let lines = raw
            .as_array()
            .ok_or_else(|| ParseError::coercion(KIND, "$", raw))?;

        let lines = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                line.as_str()
                    .ok_or_else(|| ParseError::coercion(KIND, format!("[{i}]"), line))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_lines(lines)
    }

    /// Rules in the order received
    pub fn rules(&self) -> &[ExitPolicyRule] {
        &self.rules
    }

    /// Whether the policy has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule matching traffic to any address on `port`
    ///
    /// Rules scoped to specific addresses are skipped since they cannot
    /// decide for arbitrary destinations.
    pub fn first_match(&self, port: u16) -> Option<&ExitPolicyRule> {
        self.rules.iter().find(|rule| rule.matches_port(port))
    }

    /// Whether traffic to arbitrary destinations on `port` may exit
    ///
    /// Without a matching rule the port is accepted, as in Tor.
    pub fn allows_port(&self, port: u16) -> bool {
        self.first_match(port)
            .map_or(true, |rule| rule.action == PolicyAction::Accept)
    }
}

/// Compact exit policy summary: one accept or reject list
///
/// # Examples
/// ```
/// use onionoo_client::document::ExitPolicySummary;
/// use serde_json::json;
///
/// let summary = ExitPolicySummary::from_json(&json!({"accept": ["80", "443", "6660-6669"]})).unwrap();
/// assert!(summary.allows_port(6667));
/// assert!(!summary.allows_port(25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitPolicySummary {
    /// Whether `ports` lists accepted or rejected ports
    pub action: PolicyAction,
    /// Ports and port ranges, in the order received
    pub ports: Vec<PortRange>,
}

impl ExitPolicySummary {
    /// Parse a `{"accept": [...]}` or `{"reject": [...]}` object
    pub fn from_json(raw: &Value) -> Result<Self, ParseError> {
        let object = raw
            .as_object()
            .ok_or_else(|| ParseError::coercion(KIND, "$", raw))?;

        let (action, list) = match (object.get("accept"), object.get("reject")) {
            (Some(list), _) => (PolicyAction::Accept, list),
            (None, Some(list)) => (PolicyAction::Reject, list),
            (None, None) => return Err(ParseError::missing(KIND, "accept")),
        };

        let field = action.as_str();
        let items = list
            .as_array()
            .ok_or_else(|| ParseError::coercion(KIND, field, list))?;

        let ports: Vec<PortRange> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str()
                    .and_then(|s| s.parse::<PortRange>().ok())
                    .ok_or_else(|| ParseError::coercion(KIND, format!("{field}[{i}]"), item))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { action, ports })
    }

    /// Whether `port` is listed
    pub fn lists_port(&self, port: u16) -> bool {
        self.ports.iter().any(|range| range.contains(port))
    }

    /// Whether traffic on `port` may exit
    pub fn allows_port(&self, port: u16) -> bool {
        match self.action {
            PolicyAction::Accept => self.lists_port(port),
            PolicyAction::Reject => !self.lists_port(port),
        }
    }

    /// Whether any port at all may exit
    pub fn allows_any(&self) -> bool {
        match self.action {
            PolicyAction::Accept => !self.ports.is_empty(),
            PolicyAction::Reject => !covers_all_ports(&self.ports),
        }
    }
}

/// Whether the union of `ranges` is exactly 1-65535
fn covers_all_ports(ranges: &[PortRange]) -> bool {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|range| range.start);

    // first port not yet covered
    let mut next: u32 = 1;
    for range in sorted {
        if u32::from(range.start) > next {
            return false;
        }
        next = next.max(u32::from(range.end) + 1);
    }
    next > u32::from(u16::MAX)
}
