//! Parse error taxonomy for Onionoo documents

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The kind of record being deserialized when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Top-level response envelope
    Envelope,
    /// Relay summary document
    RelaySummary,
    /// Bridge summary document
    BridgeSummary,
    /// Relay details document
    RelayDetails,
    /// Bridge details document
    BridgeDetails,
    /// Relay bandwidth document
    RelayBandwidth,
    /// Bridge bandwidth document
    BridgeBandwidth,
    /// Relay weights document
    RelayWeight,
    /// Bridge clients document
    BridgeClients,
    /// Relay uptime document
    RelayUptime,
    /// Bridge uptime document
    BridgeUptime,
    /// Graph history object
    GraphHistory,
    /// Exit policy or exit policy summary
    ExitPolicy,
    /// Undecoded JSON passed through as-is
    Raw,
}

impl EntityKind {
    /// Get the human-readable name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Envelope => "envelope",
            EntityKind::RelaySummary => "relay summary",
            EntityKind::BridgeSummary => "bridge summary",
            EntityKind::RelayDetails => "relay details",
            EntityKind::BridgeDetails => "bridge details",
            EntityKind::RelayBandwidth => "relay bandwidth",
            EntityKind::BridgeBandwidth => "bridge bandwidth",
            EntityKind::RelayWeight => "relay weight",
            EntityKind::BridgeClients => "bridge clients",
            EntityKind::RelayUptime => "relay uptime",
            EntityKind::BridgeUptime => "bridge uptime",
            EntityKind::GraphHistory => "graph history",
            EntityKind::ExitPolicy => "exit policy",
            EntityKind::Raw => "raw",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while turning Onionoo JSON into typed records
///
/// All variants are local and non-retryable: they mean the document does not
/// match the expected schema.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// The response envelope is structurally invalid
    #[error("Malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What was wrong with the envelope
        reason: String,
    },

    /// A required field is absent or null
    #[error("Missing required field '{field}' in {kind}")]
    MissingField {
        /// Record being parsed
        kind: EntityKind,
        /// Name of the missing field
        field: String,
    },

    /// A present field could not be coerced to the expected type
    #[error("Cannot coerce field '{field}' in {kind} from {raw}")]
    TypeCoercion {
        /// Record being parsed
        kind: EntityKind,
        /// Name of the offending field
        field: String,
        /// The raw JSON value, serialized
        raw: String,
    },

    /// A graph history object is structurally invalid
    #[error("Malformed history in {kind} at '{}': {reason}", .field.as_deref().unwrap_or("$"))]
    MalformedHistory {
        /// Record the history belongs to
        kind: EntityKind,
        /// Path to the history, e.g. `write_history.1_month`
        field: Option<String>,
        /// What was wrong with the history
        reason: String,
    },
}

impl ParseError {
    /// Create a malformed envelope error
    pub fn malformed_envelope(reason: impl Into<String>) -> Self {
        ParseError::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    /// Create a missing field error
    pub fn missing(kind: EntityKind, field: impl Into<String>) -> Self {
        ParseError::MissingField {
            kind,
            field: field.into(),
        }
    }

    /// Create a type coercion error from the offending JSON value
    pub fn coercion(kind: EntityKind, field: impl Into<String>, raw: &Value) -> Self {
        ParseError::TypeCoercion {
            kind,
            field: field.into(),
            raw: raw.to_string(),
        }
    }

    /// Create a malformed history error
    pub fn malformed_history(reason: impl Into<String>) -> Self {
        ParseError::MalformedHistory {
            kind: EntityKind::GraphHistory,
            field: None,
            reason: reason.into(),
        }
    }

    /// Re-attribute an error raised by a nested deserializer to the
    /// enclosing record
    ///
    /// The field path is prefixed with `key`, so a missing `first` inside
    /// `write_history.1_month` of a bandwidth document reports
    /// `write_history.1_month.first` in relay bandwidth.
    pub fn within(self, kind: EntityKind, key: &str) -> Self {
        let join = |field: &str| match field {
            "" | "$" => key.to_string(),
            field if field.starts_with('[') => format!("{key}{field}"),
            field => format!("{key}.{field}"),
        };
        match self {
            ParseError::MissingField { field, .. } => ParseError::MissingField {
                kind,
                field: join(&field),
            },
            ParseError::TypeCoercion { field, raw, .. } => ParseError::TypeCoercion {
                kind,
                field: join(&field),
                raw,
            },
            ParseError::MalformedHistory { field, reason, .. } => ParseError::MalformedHistory {
                kind,
                field: Some(join(field.as_deref().unwrap_or(""))),
                reason,
            },
            envelope @ ParseError::MalformedEnvelope { .. } => envelope,
        }
    }

    /// Name of the field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ParseError::MissingField { field, .. } | ParseError::TypeCoercion { field, .. } => {
                Some(field)
            }
            ParseError::MalformedHistory { field, .. } => field.as_deref(),
            ParseError::MalformedEnvelope { .. } => None,
        }
    }

    /// Kind of record the error refers to, if any
    pub fn kind(&self) -> Option<EntityKind> {
        match self {
            ParseError::MissingField { kind, .. }
            | ParseError::TypeCoercion { kind, .. }
            | ParseError::MalformedHistory { kind, .. } => Some(*kind),
            ParseError::MalformedEnvelope { .. } => None,
        }
    }
}
