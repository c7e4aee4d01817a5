//! Domain types shared across the monitor.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ── Tabular values ────────────────────────────────────────────────────

/// A single typed cell value from a tabular query response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
}

impl Value {
    /// Coerce a raw text field into a typed value.
    ///
    /// A field that parses fully as a float becomes numeric, `true`/`false`
    /// become booleans, everything else stays a string.
    pub fn coerce(raw: &str) -> Self {
        if let Ok(n) = raw.parse::<f64>() {
            return Value::Num(n);
        }
        match raw {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Str(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Num(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One parsed data row: an ordered mapping from column name to value.
///
/// Every row produced by one parse shares the header's exact column set;
/// column order matches the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    cells: Vec<(String, Value)>,
}

impl TableRow {
    pub fn from_cells(cells: Vec<(String, Value)>) -> Self {
        Self { cells }
    }

    /// Look up a cell by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in header order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ── Time series ───────────────────────────────────────────────────────

/// One fully-typed observation: a timestamp plus named numeric fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub fields: HashMap<String, f64>,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

// ── Typed stream samples ──────────────────────────────────────────────
//
// Each stream has an enumerated set of recognized columns. Unknown
// numeric columns are preserved in `extra` rather than dropped, so
// consumers keep forward compatibility with new fields. Zero is a valid
// reading everywhere; absence is `None`, never 0.

fn split_fields(
    point: &TimeSeriesPoint,
    known: &[&str],
) -> (Vec<Option<f64>>, BTreeMap<String, f64>) {
    let values = known.iter().map(|name| point.field(name)).collect();
    let extra = point
        .fields
        .iter()
        .filter(|(name, _)| !known.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), *value))
        .collect();
    (values, extra)
}

/// Instantaneous electrical readings (1 s cadence).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeSample {
    pub time: DateTime<Utc>,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
    pub frequency: Option<f64>,
    pub extra: BTreeMap<String, f64>,
}

impl RealtimeSample {
    pub const FIELDS: &'static [&'static str] = &["v_rms", "i_rms", "p_active", "frequency"];

    pub fn from_point(point: &TimeSeriesPoint) -> Self {
        let (values, extra) = split_fields(point, Self::FIELDS);
        Self {
            time: point.timestamp,
            voltage: values[0],
            current: values[1],
            power: values[2],
            frequency: values[3],
            extra,
        }
    }
}

/// Power breakdown and accumulated energy (5 s cadence).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSample {
    pub time: DateTime<Utc>,
    pub active: Option<f64>,
    pub reactive: Option<f64>,
    pub apparent: Option<f64>,
    pub energy_wh: Option<f64>,
    pub extra: BTreeMap<String, f64>,
}

impl PowerSample {
    pub const FIELDS: &'static [&'static str] =
        &["p_active", "p_reactive", "p_apparent", "energy_wh"];

    pub fn from_point(point: &TimeSeriesPoint) -> Self {
        let (values, extra) = split_fields(point, Self::FIELDS);
        Self {
            time: point.timestamp,
            active: values[0],
            reactive: values[1],
            apparent: values[2],
            energy_wh: values[3],
            extra,
        }
    }
}

/// Windowed minima and maxima (30 s cadence).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremesSample {
    pub time: DateTime<Utc>,
    pub voltage_min: Option<f64>,
    pub voltage_max: Option<f64>,
    pub power_max: Option<f64>,
    pub extra: BTreeMap<String, f64>,
}

impl ExtremesSample {
    pub const FIELDS: &'static [&'static str] = &["v_min", "v_max", "p_max"];

    pub fn from_point(point: &TimeSeriesPoint) -> Self {
        let (values, extra) = split_fields(point, Self::FIELDS);
        Self {
            time: point.timestamp,
            voltage_min: values[0],
            voltage_max: values[1],
            power_max: values[2],
            extra,
        }
    }
}
