//! Response envelope parsing
//!
//! Every Onionoo response shares the same envelope: protocol metadata plus a
//! `relays` list and a `bridges` list whose entries depend on the endpoint.

use super::error::{EntityKind, ParseError};
use super::reader::FieldReader;
use super::Document;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

const ENVELOPE_FIELDS: &[&str] = &[
    "version",
    "next_major_version_scheduled",
    "build_revision",
    "relays_published",
    "relays_skipped",
    "relays",
    "relays_truncated",
    "bridges_published",
    "bridges_skipped",
    "bridges",
    "bridges_truncated",
];

/// Which entity list of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityList {
    /// The `relays` list
    Relays,
    /// The `bridges` list
    Bridges,
}

impl EntityList {
    /// JSON key of the list
    pub fn key(&self) -> &'static str {
        match self {
            EntityList::Relays => "relays",
            EntityList::Bridges => "bridges",
        }
    }
}

impl fmt::Display for EntityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How entity-level parse failures are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Abort on the first entity that fails to parse
    #[default]
    Strict,
    /// Skip failing entities and record them as [`RejectedEntity`]
    SkipInvalid,
}

/// Response metadata shared by all endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvelopeMeta {
    /// Onionoo protocol version
    pub version: Option<String>,
    /// When the next major protocol version is scheduled, if planned
    pub next_major_version_scheduled: Option<DateTime<Utc>>,
    /// Git revision of the Onionoo instance, if known
    pub build_revision: Option<String>,
    /// When the last known relay consensus started being valid
    pub relays_published: Option<DateTime<Utc>>,
    /// Relays skipped because of an `offset` parameter
    pub relays_skipped: u64,
    /// Relays truncated because of a `limit` parameter
    pub relays_truncated: u64,
    /// When the last known bridge network status was published
    pub bridges_published: Option<DateTime<Utc>>,
    /// Bridges skipped because of an `offset` parameter
    pub bridges_skipped: u64,
    /// Bridges truncated because of a `limit` parameter
    pub bridges_truncated: u64,
}

impl EnvelopeMeta {
    fn read(reader: &FieldReader<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            version: reader.opt_str("version")?,
            next_major_version_scheduled: reader.opt_timestamp("next_major_version_scheduled")?,
            build_revision: reader.opt_str("build_revision")?,
            relays_published: reader.opt_timestamp("relays_published")?,
            relays_skipped: reader.opt_u64("relays_skipped")?.unwrap_or(0),
            relays_truncated: reader.opt_u64("relays_truncated")?.unwrap_or(0),
            bridges_published: reader.opt_timestamp("bridges_published")?,
            bridges_skipped: reader.opt_u64("bridges_skipped")?.unwrap_or(0),
            bridges_truncated: reader.opt_u64("bridges_truncated")?.unwrap_or(0),
        })
    }
}

/// An entity that failed to parse under [`ParsePolicy::SkipInvalid`]
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntity {
    /// List the entity came from
    pub list: EntityList,
    /// Position of the entity in that list
    pub index: usize,
    /// Why it was rejected
    pub error: ParseError,
}

/// Records decoded from one entity list
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBatch<T> {
    /// Successfully parsed records, in received order
    pub records: Vec<T>,
    /// Entities skipped under [`ParsePolicy::SkipInvalid`]
    pub rejected: Vec<RejectedEntity>,
}

impl<T> EntityBatch<T> {
    /// Whether every entity of the list was parsed
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl<T> IntoIterator for EntityBatch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// A fully typed Onionoo response
#[derive(Debug, Clone, PartialEq)]
pub struct Response<R, B> {
    /// Envelope metadata
    pub meta: EnvelopeMeta,
    /// Relay records, in received order
    pub relays: Vec<R>,
    /// Bridge records, in received order
    pub bridges: Vec<B>,
    /// Entities skipped under [`ParsePolicy::SkipInvalid`]
    pub rejected: Vec<RejectedEntity>,
}

impl<R, B> Response<R, B> {
    /// Whether every entity of the document was parsed
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parsed response envelope with undecoded entity lists
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    meta: EnvelopeMeta,
    relays: Option<Vec<Value>>,
    bridges: Option<Vec<Value>>,
}

impl Envelope {
    /// Split a raw response into metadata and entity lists
    ///
    /// Fails when the document is not an object, when neither list is
    /// present, or when a list is present but is not an array. Missing
    /// metadata is never an error.
    pub fn from_json(raw: Value) -> Result<Self, ParseError> {
        if !raw.is_object() {
            return Err(ParseError::malformed_envelope(format!(
                "expected a JSON object, got {raw}"
            )));
        }

        let meta = EnvelopeMeta::read(&FieldReader::new(EntityKind::Envelope, &raw, ENVELOPE_FIELDS)?)?;

        let Value::Object(mut object) = raw else {
            return Err(ParseError::malformed_envelope("expected a JSON object"));
        };

        let relays = take_list(&mut object, EntityList::Relays)?;
        let bridges = take_list(&mut object, EntityList::Bridges)?;

        if relays.is_none() && bridges.is_none() {
            return Err(ParseError::malformed_envelope(
                "neither 'relays' nor 'bridges' is present",
            ));
        }

        Ok(Self {
            meta,
            relays,
            bridges,
        })
    }

    /// Envelope metadata
    pub fn meta(&self) -> &EnvelopeMeta {
        &self.meta
    }

    /// Raw entries of one list
    ///
    /// A missing list is an error, never an empty slice.
    pub fn list(&self, list: EntityList) -> Result<&[Value], ParseError> {
        let entries = match list {
            EntityList::Relays => self.relays.as_deref(),
            EntityList::Bridges => self.bridges.as_deref(),
        };
        entries.ok_or_else(|| {
            ParseError::malformed_envelope(format!("missing '{}' list", list.key()))
        })
    }

    /// Raw relay entries
    pub fn relays(&self) -> Result<&[Value], ParseError> {
        self.list(EntityList::Relays)
    }

    /// Raw bridge entries
    pub fn bridges(&self) -> Result<&[Value], ParseError> {
        self.list(EntityList::Bridges)
    }

    /// Parse every entry of a list, keeping each entry's outcome
    pub fn decode_each<T: Document>(
        &self,
        list: EntityList,
    ) -> Result<Vec<Result<T, ParseError>>, ParseError> {
        Ok(self.list(list)?.iter().map(T::from_json).collect())
    }

    /// Parse a list according to `policy`
    pub fn decode<T: Document>(
        &self,
        list: EntityList,
        policy: ParsePolicy,
    ) -> Result<EntityBatch<T>, ParseError> {
        let mut records = Vec::new();
        let mut rejected = Vec::new();

        for (index, outcome) in self.decode_each::<T>(list)?.into_iter().enumerate() {
            match outcome {
                Ok(record) => records.push(record),
                Err(error) => match policy {
                    ParsePolicy::Strict => {
                        tracing::debug!(%list, index, %error, "entity failed to parse");
                        return Err(error);
                    }
                    ParsePolicy::SkipInvalid => {
                        tracing::warn!(%list, index, %error, "skipping invalid {}", T::KIND);
                        rejected.push(RejectedEntity { list, index, error });
                    }
                },
            }
        }

        Ok(EntityBatch { records, rejected })
    }

    /// Parse the relay list
    pub fn decode_relays<T: Document>(
        &self,
        policy: ParsePolicy,
    ) -> Result<EntityBatch<T>, ParseError> {
        self.decode(EntityList::Relays, policy)
    }

    /// Parse the bridge list
    pub fn decode_bridges<T: Document>(
        &self,
        policy: ParsePolicy,
    ) -> Result<EntityBatch<T>, ParseError> {
        self.decode(EntityList::Bridges, policy)
    }

    /// Parse both lists into a typed [`Response`]
    ///
    /// Both lists must be present.
    pub fn into_response<R: Document, B: Document>(
        self,
        policy: ParsePolicy,
    ) -> Result<Response<R, B>, ParseError> {
        let relays = self.decode_relays::<R>(policy)?;
        let bridges = self.decode_bridges::<B>(policy)?;

        let mut rejected = relays.rejected;
        rejected.extend(bridges.rejected);

        Ok(Response {
            meta: self.meta,
            relays: relays.records,
            bridges: bridges.records,
            rejected,
        })
    }
}

fn take_list(
    object: &mut Map<String, Value>,
    list: EntityList,
) -> Result<Option<Vec<Value>>, ParseError> {
    match object.remove(list.key()) {
        None => Ok(None),
        Some(Value::Array(entries)) => Ok(Some(entries)),
        Some(other) => Err(ParseError::malformed_envelope(format!(
            "'{}' is not a list: {other}",
            list.key()
        ))),
    }
}
