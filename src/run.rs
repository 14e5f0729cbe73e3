//! Runs and call-graph edges
//!
//! A run is the raw output of one profiling session: a list of edges, each an
//! aggregated caller→callee invocation record with its cost counters.
//!
//! XHProf-compatible profilers serialize a run as a JSON object keyed by
//! `"caller==>callee"`, with bare keys (e.g. `"main()"`) for top-level calls:
//!
//! ```json
//! {
//!   "main()":             {"ct": 1, "wt": 120, "mu": 2048},
//!   "main()==>load_conf": {"ct": 2, "wt": 45,  "mu": 512}
//! }
//! ```
//!
//! The key is decoded once, here, into an [`Edge`] with an optional caller.

use crate::anomaly::Anomaly;
use crate::error::DecodeError;
use crate::metrics::{MetricVector, CALLS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Separator between caller and callee in raw edge keys
pub const EDGE_SEPARATOR: &str = "==>";

/// Opaque identifier of a profiling run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RunId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One aggregated invocation record between a caller and a callee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Calling symbol; `None` for a top-level entry
    pub caller: Option<String>,
    /// Called symbol
    pub callee: String,
    /// Number of invocations along this edge
    pub calls: u64,
    /// Cost counters (wall time, cpu, memory, ...)
    pub metrics: MetricVector,
}

impl Edge {
    /// A top-level entry with no caller
    pub fn root(callee: impl Into<String>, calls: u64, metrics: MetricVector) -> Self {
        Self {
            caller: None,
            callee: callee.into(),
            calls,
            metrics,
        }
    }

    /// A call from `caller` to `callee`
    pub fn call(
        caller: impl Into<String>,
        callee: impl Into<String>,
        calls: u64,
        metrics: MetricVector,
    ) -> Self {
        Self {
            caller: Some(caller.into()),
            callee: callee.into(),
            calls,
            metrics,
        }
    }

    pub fn is_root(&self) -> bool {
        self.caller.is_none()
    }

    pub fn is_self_recursive(&self) -> bool {
        self.caller.as_deref() == Some(self.callee.as_str())
    }

    /// The edge in raw key notation, for messages
    pub fn key(&self) -> String {
        match &self.caller {
            Some(caller) => format!("{}{}{}", caller, EDGE_SEPARATOR, self.callee),
            None => self.callee.clone(),
        }
    }
}

/// The complete edge set of one profiling session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    id: RunId,
    edges: Vec<Edge>,
    /// Repairs made while decoding the raw document
    anomalies: Vec<Anomaly>,
}

impl Run {
    /// Build a run from already-decoded edges
    ///
    /// Counters get the same repair as decoded ones: negative or non-finite
    /// values become 0 and are recorded as [`Anomaly::InvalidMetric`].
    pub fn from_edges(id: impl Into<RunId>, mut edges: Vec<Edge>) -> Self {
        let mut anomalies = Vec::new();
        for edge in &mut edges {
            repair_counters(edge, &mut anomalies);
        }
        Self {
            id: id.into(),
            edges,
            anomalies,
        }
    }

    /// Decode a raw XHProf-style JSON document
    pub fn from_json_str(id: impl Into<RunId>, json: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(id, &value)
    }

    /// Decode an already-parsed raw document
    ///
    /// Only a non-object top level is rejected. Individual records never fail:
    /// malformed keys become root edges, missing or invalid counters become 0.
    pub fn from_value(id: impl Into<RunId>, value: &Value) -> Result<Self, DecodeError> {
        let object = match value {
            Value::Object(object) => object,
            Value::Array(_) => return Err(DecodeError::NotAnObject("an array")),
            Value::String(_) => return Err(DecodeError::NotAnObject("a string")),
            Value::Number(_) => return Err(DecodeError::NotAnObject("a number")),
            Value::Bool(_) => return Err(DecodeError::NotAnObject("a boolean")),
            Value::Null => return Err(DecodeError::NotAnObject("null")),
        };

        let mut anomalies = Vec::new();
        let mut edges = Vec::with_capacity(object.len());
        let mut fields: Vec<BTreeSet<String>> = Vec::with_capacity(object.len());

        for (key, record) in object {
            let (caller, callee) = split_key(key, &mut anomalies);
            let mut edge = Edge {
                caller,
                callee,
                calls: 0,
                metrics: MetricVector::new(),
            };
            fields.push(decode_counters(&mut edge, record, &mut anomalies));
            edges.push(edge);
        }

        // A field is expected when any edge of the run carries it.
        let expected: BTreeSet<&str> = fields.iter().flatten().map(String::as_str).collect();
        for (edge, present) in edges.iter().zip(&fields) {
            let missing: Vec<String> = expected
                .iter()
                .filter(|field| !present.contains(**field))
                .map(|field| field.to_string())
                .collect();
            if !missing.is_empty() {
                anomalies.push(
                    Anomaly::MissingMetric {
                        edge: edge.key(),
                        metrics: missing,
                    }
                    .logged(),
                );
            }
        }

        let id = id.into();
        tracing::debug!(
            "Decoded run {}: {} edges, {} anomalies",
            id,
            edges.len(),
            anomalies.len()
        );

        Ok(Self {
            id,
            edges,
            anomalies,
        })
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Metric ids carried by at least one edge (the call counter excluded)
    pub fn metric_ids(&self) -> BTreeSet<&str> {
        self.edges
            .iter()
            .flat_map(|edge| edge.metrics.ids())
            .collect()
    }
}

/// Split a raw key into (caller, callee)
fn split_key(key: &str, anomalies: &mut Vec<Anomaly>) -> (Option<String>, String) {
    let parts: Vec<&str> = key.split(EDGE_SEPARATOR).collect();
    match parts.as_slice() {
        [callee] if !callee.is_empty() => (None, callee.to_string()),
        [caller, callee] if !caller.is_empty() && !callee.is_empty() => {
            (Some(caller.to_string()), callee.to_string())
        }
        _ => {
            let callee = parts
                .iter()
                .rev()
                .find(|part| !part.is_empty())
                .map_or_else(|| key.to_string(), |part| part.to_string());
            anomalies.push(
                Anomaly::MalformedEdge {
                    key: key.to_string(),
                    callee: callee.clone(),
                }
                .logged(),
            );
            (None, callee)
        }
    }
}

/// Zero out counters that are negative or non-finite
fn repair_counters(edge: &mut Edge, anomalies: &mut Vec<Anomaly>) {
    let invalid: Vec<String> = edge
        .metrics
        .iter()
        .filter(|(_, value)| !value.is_finite() || *value < 0.0)
        .map(|(metric, _)| metric.to_string())
        .collect();
    for metric in invalid {
        anomalies.push(
            Anomaly::InvalidMetric {
                edge: edge.key(),
                metric: metric.clone(),
            }
            .logged(),
        );
        edge.metrics.set(metric, 0.0);
    }
}

/// Fill the edge counters from a raw record, returning the field names seen
fn decode_counters(
    edge: &mut Edge,
    record: &Value,
    anomalies: &mut Vec<Anomaly>,
) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let Value::Object(counters) = record else {
        anomalies.push(
            Anomaly::InvalidMetric {
                edge: edge.key(),
                metric: "*".to_string(),
            }
            .logged(),
        );
        return seen;
    };

    for (field, raw) in counters {
        seen.insert(field.clone());
        let value = match raw.as_f64() {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                anomalies.push(
                    Anomaly::InvalidMetric {
                        edge: edge.key(),
                        metric: field.clone(),
                    }
                    .logged(),
                );
                0.0
            }
        };

        if field == CALLS {
            edge.calls = raw.as_u64().unwrap_or(value.round() as u64);
        } else {
            edge.metrics.set(field.clone(), value);
        }
    }
    seen
}
