//! Flat columnar tables: one row per selected candidate, one column per quantity

use serde::{Deserialize, Serialize};

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Float,
    Bool,
    #[serde(rename = "uint")]
    UInt,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnKind::Float => "float",
            ColumnKind::Bool => "bool",
            ColumnKind::UInt => "uint",
        };
        write!(f, "{}", name)
    }
}

/// A single cell value produced for one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Bool(bool),
    UInt(u32),
}

impl Value {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Value::Float(_) => ColumnKind::Float,
            Value::Bool(_) => ColumnKind::Bool,
            Value::UInt(_) => ColumnKind::UInt,
        }
    }
}

/// Typed value sequence of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum ColumnData {
    Float(Vec<f32>),
    Bool(Vec<bool>),
    #[serde(rename = "uint")]
    UInt(Vec<u32>),
}

impl ColumnData {
    /// Empty sequence of the given kind
    pub fn with_capacity(kind: ColumnKind, capacity: usize) -> Self {
        match kind {
            ColumnKind::Float => ColumnData::Float(Vec::with_capacity(capacity)),
            ColumnKind::Bool => ColumnData::Bool(Vec::with_capacity(capacity)),
            ColumnKind::UInt => ColumnData::UInt(Vec::with_capacity(capacity)),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Float(_) => ColumnKind::Float,
            ColumnData::Bool(_) => ColumnKind::Bool,
            ColumnData::UInt(_) => ColumnKind::UInt,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Bool(v) => v.len(),
            ColumnData::UInt(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value; hands the value back if its kind does not match
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        match (self, value) {
            (ColumnData::Float(v), Value::Float(x)) => v.push(x),
            (ColumnData::Bool(v), Value::Bool(x)) => v.push(x),
            (ColumnData::UInt(v), Value::UInt(x)) => v.push(x),
            (_, other) => return Err(other),
        }
        Ok(())
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            ColumnData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match self {
            ColumnData::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uints(&self) -> Option<&[u32]> {
        match self {
            ColumnData::UInt(v) => Some(v),
            _ => None,
        }
    }
}

/// Declared layout of one output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub doc: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind, doc: impl Into<String>) -> Self {
        Self { name: name.into(), kind, doc: doc.into() }
    }
}

/// Named, documented column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub doc: String,
    pub data: ColumnData,
}

/// Finished per-event table.
///
/// Every column holds exactly `row_count` values and column names are unique.
/// Only [`crate::core::TableBuilder`] creates tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Rows line up with an existing table of the same name
    pub extension: bool,
    pub row_count: usize,
    pub columns: Vec<Column>,
}

impl Table {
    /// Column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn floats(&self, name: &str) -> Option<&[f32]> {
        self.column(name).and_then(|c| c.data.as_floats())
    }

    pub fn bools(&self, name: &str) -> Option<&[bool]> {
        self.column(name).and_then(|c| c.data.as_bools())
    }

    pub fn uints(&self, name: &str) -> Option<&[u32]> {
        self.column(name).and_then(|c| c.data.as_uints())
    }

    /// Column names in output order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// One-line summary for terminal display
    pub fn to_summary_string(&self) -> String {
        format!(
            "{} | rows={} | columns={} | {}",
            self.name,
            self.row_count,
            self.columns.len(),
            self.column_names().join(",")
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
