//! Flat repository records.
//!
//! GraphQL search nodes arrive as nested JSON objects (`owner { login }`,
//! `stargazers { totalCount }`, ...). Before they are stored they are
//! flattened into a single level of scalar cells so that every record maps
//! directly onto one CSV row.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

/// Field holding the repository owner login after flattening.
pub const OWNER_FIELD: &str = "owner";
/// Field holding the repository name.
pub const NAME_FIELD: &str = "name";
/// Field holding the star count after flattening.
pub const STARS_FIELD: &str = "stargazers";
/// Field holding the repository description.
pub const DESCRIPTION_FIELD: &str = "description";
/// Field holding the mirror flag.
pub const MIRROR_FIELD: &str = "isMirror";
/// Timestamp fields normalized on save.
pub const TIMESTAMP_FIELDS: [&str; 2] = ["createdAt", "pushedAt"];

/// A single scalar cell of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Convert a JSON scalar into a cell.
    ///
    /// Arrays and objects are kept as their compact JSON text; callers that
    /// want object flattening use [`flatten_value`].
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Infer a cell from its CSV text.
    ///
    /// Inference is lossless: a number or boolean is only recognized when
    /// writing it back produces the exact same text.
    #[must_use]
    pub fn parse_cell(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Null;
        }
        match raw {
            "True" | "true" => return Self::Bool(true),
            "False" | "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>()
            && i.to_string() == raw
        {
            return Self::Int(i);
        }
        if raw.bytes().any(|b| b.is_ascii_digit())
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-'))
            && let Ok(f) = raw.parse::<f64>()
            && f.to_string() == raw
        {
            return Self::Float(f);
        }
        Self::Text(raw.to_string())
    }

    /// Render the cell for CSV output.
    #[must_use]
    pub fn to_cell(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view of the cell, accepting integral floats and numeric text.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Flatten a JSON value to a scalar cell.
///
/// Objects are replaced by their first value, recursively, until a
/// non-object value is reached. An empty object flattens to null.
#[must_use]
pub fn flatten_value(value: &Value) -> FieldValue {
    match value {
        Value::Object(map) => map.values().next().map_or(FieldValue::Null, flatten_value),
        other => FieldValue::from_json(other),
    }
}

/// One repository as a flat mapping of field name to scalar cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl RepositoryRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a GraphQL node into a record.
    #[must_use]
    pub fn from_node(node: &Map<String, Value>) -> Self {
        let fields = node
            .iter()
            .map(|(k, v)| (k.clone(), flatten_value(v)))
            .collect();
        Self { fields }
    }

    /// Build a record from a list of cells.
    pub fn from_cells<I, K, V>(cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self {
            fields: cells
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Text of a field, empty when the field is missing or null.
    #[must_use]
    pub fn cell(&self, field: &str) -> String {
        self.get(field).map(FieldValue::to_cell).unwrap_or_default()
    }

    /// The `owner/name` identity, if both parts are present.
    #[must_use]
    pub fn identity(&self) -> Option<String> {
        let owner = self.cell(OWNER_FIELD);
        let name = self.cell(NAME_FIELD);
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("{owner}/{name}"))
    }

    /// Star count of the repository.
    #[must_use]
    pub fn stargazers(&self) -> Option<i64> {
        self.get(STARS_FIELD).and_then(FieldValue::as_i64)
    }

    /// Overlay `other` on top of this record; `other` wins on shared fields.
    #[must_use]
    pub fn merged_with(&self, other: &RepositoryRecord) -> RepositoryRecord {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        RepositoryRecord { fields }
    }
}
