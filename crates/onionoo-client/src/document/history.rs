//! Graph history decoding
//!
//! Onionoo publishes time series (bandwidth, weights, clients, uptime) as
//! "graph history" objects: the timestamps of the first and last interval
//! midpoints, the interval length in seconds, a scaling factor and an array
//! of normalized integer values where `null` marks a missing data point.
//!
//! Reference: <https://metrics.torproject.org/onionoo.html#history_graph>

use super::error::{EntityKind, ParseError};
use super::reader::FieldReader;
use super::timestamp;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

const HISTORY_FIELDS: &[&str] = &["first", "last", "interval", "factor", "count", "values"];

/// Graph histories keyed by period name (e.g. `"1_month"`, `"5_years"`)
pub type IntervaledHistory = BTreeMap<String, GraphHistory>;

/// Decoded time series with a fixed sampling interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphHistory {
    /// Timestamp of the midpoint of the first interval
    pub first: DateTime<Utc>,
    /// Timestamp of the midpoint of the last interval
    pub last: DateTime<Utc>,
    /// Seconds between two data points
    pub interval: u64,
    /// Factor the encoded values were multiplied by
    pub factor: f64,
    /// Number of data points declared upstream, if any
    pub count: Option<u64>,
    /// Decoded samples; `None` marks a missing data point
    pub values: Vec<Option<f64>>,
}

impl GraphHistory {
    /// Decode a graph history object
    ///
    /// Each sample is `encoded * factor`; `null` samples stay `None`.
    ///
    /// # Examples
    /// ```
    /// use onionoo_client::GraphHistory;
    /// use serde_json::json;
    ///
    /// let history = GraphHistory::from_json(&json!({
    ///     "first": "2023-01-01",
    ///     "last": "2023-01-02",
    ///     "interval": 3600,
    ///     "factor": 0.5,
    ///     "values": [2, 4, null, 6]
    /// })).unwrap();
    ///
    /// assert_eq!(history.values, vec![Some(1.0), Some(2.0), None, Some(3.0)]);
    /// ```
    pub fn from_json(raw: &Value) -> Result<Self, ParseError> {
        if !raw.is_object() {
            return Err(ParseError::malformed_history(format!(
                "expected an object, got {raw}"
            )));
        }
        let reader = FieldReader::new(EntityKind::GraphHistory, raw, HISTORY_FIELDS)?;

        let interval = reader.required_i64("interval")?;
        if interval <= 0 {
            return Err(ParseError::malformed_history(format!(
                "interval must be positive, got {interval}"
            )));
        }
        if Duration::try_seconds(interval).is_none() {
            return Err(ParseError::malformed_history(format!(
                "interval is out of range: {interval}"
            )));
        }

        let factor = reader.required_f64("factor")?;
        if factor == 0.0 {
            return Err(ParseError::malformed_history("factor is zero"));
        }

        let first = reader.required_timestamp("first")?;
        let mut last = reader.required_timestamp("last")?;
        let count = reader.opt_u64("count")?;

        let values = match reader.get("values") {
            None => Vec::new(),
            Some(Value::Array(items)) => decode_values(items, factor)?,
            Some(other) => {
                return Err(ParseError::malformed_history(format!(
                    "values must be an array, got {other}"
                )))
            }
        };

        if values.is_empty() {
            last = first;
        }

        let history = Self {
            first,
            last,
            interval: interval as u64,
            factor,
            count,
            values,
        };

        if !history.is_consistent() {
            tracing::warn!(
                first = %history.first,
                last = %history.last,
                interval = history.interval,
                samples = history.values.len(),
                "graph history span does not match its sample count"
            );
        }

        Ok(history)
    }

    /// Encode real-valued samples into the wire shape
    ///
    /// Values are divided by `factor` and rounded, so decoding the result
    /// recovers them within `factor / 2`.
    pub fn encode(
        first: DateTime<Utc>,
        interval: u64,
        factor: f64,
        samples: &[Option<f64>],
    ) -> Value {
        let steps = i64::try_from(samples.len().saturating_sub(1)).unwrap_or(i64::MAX);
        let last = i64::try_from(interval)
            .ok()
            .and_then(|interval| interval.checked_mul(steps))
            .and_then(Duration::try_seconds)
            .and_then(|span| first.checked_add_signed(span))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let values: Vec<Value> = samples
            .iter()
            .map(|sample| match sample {
                Some(v) => json!((v / factor).round() as i64),
                None => Value::Null,
            })
            .collect();

        json!({
            "first": timestamp::encode_utc(&first),
            "last": timestamp::encode_utc(&last),
            "interval": interval,
            "factor": factor,
            "count": samples.len(),
            "values": values,
        })
    }

    /// Number of samples, including missing ones
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the history has no samples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether `(last - first) / interval` is within one sample of the
    /// number of samples
    pub fn is_consistent(&self) -> bool {
        if self.values.len() <= 1 {
            return true;
        }
        let span = (self.last - self.first).num_seconds() as f64 / self.interval as f64;
        (span - self.values.len() as f64).abs() <= 1.0
    }

    /// Timestamp of each sample: `first + i * interval`
    ///
    /// Stops early if a timestamp would fall outside the representable range.
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        let step = i64::try_from(self.interval)
            .ok()
            .and_then(Duration::try_seconds);
        std::iter::successors(Some(self.first), move |prev| {
            step.and_then(|step| prev.checked_add_signed(step))
        })
        .take(self.values.len())
    }

    /// Samples paired with their timestamps
    pub fn points(&self) -> impl Iterator<Item = (DateTime<Utc>, Option<f64>)> + '_ {
        self.timestamps().zip(self.values.iter().copied())
    }

    /// Present samples only
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flatten().copied()
    }
}

fn decode_values(items: &[Value], factor: f64) -> Result<Vec<Option<f64>>, ParseError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_f64().map(|v| Some(v * factor)).ok_or_else(|| {
                ParseError::malformed_history(format!("value {i} is out of range: {n}"))
            }),
            other => Err(ParseError::malformed_history(format!(
                "value {i} is not a number: {other}"
            ))),
        })
        .collect()
}

/// Decode a single graph history object
pub fn graph_history_from_json(raw: &Value) -> Result<GraphHistory, ParseError> {
    GraphHistory::from_json(raw)
}

/// Decode a map of period name to graph history object
pub fn intervaled_history_from_json(raw: &Value) -> Result<IntervaledHistory, ParseError> {
    let object = raw.as_object().ok_or_else(|| {
        ParseError::malformed_history(format!("expected a map of periods, got {raw}"))
    })?;

    object
        .iter()
        .map(|(period, history)| {
            let history = GraphHistory::from_json(history)
                .map_err(|err| err.within(EntityKind::GraphHistory, period))?;
            Ok((period.clone(), history))
        })
        .collect()
}
