//! Metadata filters for vector index queries
//!
//! [`MetadataFilter`] is a small predicate tree over metadata fields. It is
//! backend-neutral: the Pinecone client serializes it to Mongo-style JSON
//! operators with [`MetadataFilter::to_pinecone_json`], the Qdrant client
//! translates it into `Filter`/`Condition` trees.
//!
//! The content-category filter used by retrieval is built by
//! [`datasource_filter`] from the closed [`DataSource`] enum.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Metadata field holding the content category of a chunk
pub const DATASOURCE_FIELD: &str = "datasource";

/// Content category of an indexed chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSource {
    Pdf,
    Website,
    Custom,
    Github,
}

impl DataSource {
    /// Categories that are always searchable
    pub const DOCUMENTS: [DataSource; 3] =
        [DataSource::Pdf, DataSource::Website, DataSource::Custom];

    /// Value stored in the index metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Pdf => "PDF",
            DataSource::Website => "WEBSITE",
            DataSource::Custom => "CUSTOM",
            DataSource::Github => "GITHUB",
        }
    }

    /// Categories admitted for a query, code repositories only on request
    pub fn admitted(include_code: bool) -> Vec<DataSource> {
        let mut sources = Self::DOCUMENTS.to_vec();
        if include_code {
            sources.push(DataSource::Github);
        }
        sources
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar value compared against a metadata field
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl FilterValue {
    fn to_json(&self) -> Value {
        match self {
            FilterValue::String(s) => Value::String(s.clone()),
            FilterValue::Number(n) => json!(n),
            FilterValue::Bool(b) => Value::Bool(*b),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<DataSource> for FilterValue {
    fn from(value: DataSource) -> Self {
        FilterValue::String(value.as_str().to_string())
    }
}

/// Boolean predicate tree over metadata fields
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataFilter {
    Eq { field: String, value: FilterValue },
    Ne { field: String, value: FilterValue },
    Gt { field: String, value: f64 },
    Gte { field: String, value: f64 },
    Lt { field: String, value: f64 },
    Lte { field: String, value: f64 },
    In { field: String, values: Vec<FilterValue> },
    Nin { field: String, values: Vec<FilterValue> },
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    Exists { field: String, exists: bool },
    And(Vec<MetadataFilter>),
    Or(Vec<MetadataFilter>),
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: f64) -> Self {
        Self::Gt {
            field: field.into(),
            value,
        }
    }

    pub fn gte(field: impl Into<String>, value: f64) -> Self {
        Self::Gte {
            field: field.into(),
            value,
        }
    }

    pub fn lt(field: impl Into<String>, value: f64) -> Self {
        Self::Lt {
            field: field.into(),
            value,
        }
    }

    pub fn lte(field: impl Into<String>, value: f64) -> Self {
        Self::Lte {
            field: field.into(),
            value,
        }
    }

    pub fn is_in<V: Into<FilterValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<FilterValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::Nin {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Inclusive range; either bound may be open
    pub fn range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::Range {
            field: field.into(),
            min,
            max,
        }
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::Exists {
            field: field.into(),
            exists,
        }
    }

    pub fn and(filters: impl IntoIterator<Item = MetadataFilter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    pub fn or(filters: impl IntoIterator<Item = MetadataFilter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// True when the filter constrains nothing and should not be sent
    pub fn is_empty(&self) -> bool {
        match self {
            MetadataFilter::And(children) | MetadataFilter::Or(children) => {
                children.iter().all(MetadataFilter::is_empty)
            }
            MetadataFilter::Range { min, max, .. } => min.is_none() && max.is_none(),
            _ => false,
        }
    }

    /// Serialize to Pinecone's Mongo-style operator JSON
    pub fn to_pinecone_json(&self) -> Value {
        match self {
            MetadataFilter::Eq { field, value } => field_op(field, "$eq", value.to_json()),
            MetadataFilter::Ne { field, value } => field_op(field, "$ne", value.to_json()),
            MetadataFilter::Gt { field, value } => field_op(field, "$gt", json!(value)),
            MetadataFilter::Gte { field, value } => field_op(field, "$gte", json!(value)),
            MetadataFilter::Lt { field, value } => field_op(field, "$lt", json!(value)),
            MetadataFilter::Lte { field, value } => field_op(field, "$lte", json!(value)),
            MetadataFilter::In { field, values } => field_op(
                field,
                "$in",
                Value::Array(values.iter().map(FilterValue::to_json).collect()),
            ),
            MetadataFilter::Nin { field, values } => field_op(
                field,
                "$nin",
                Value::Array(values.iter().map(FilterValue::to_json).collect()),
            ),
            MetadataFilter::Range { field, min, max } => {
                let mut ops = Map::new();
                if let Some(min) = min {
                    ops.insert("$gte".into(), json!(min));
                }
                if let Some(max) = max {
                    ops.insert("$lte".into(), json!(max));
                }
                json!({ field.as_str(): ops })
            }
            MetadataFilter::Exists { field, exists } => field_op(field, "$exists", json!(exists)),
            MetadataFilter::And(children) => logical("$and", children),
            MetadataFilter::Or(children) => logical("$or", children),
        }
    }
}

fn field_op(field: &str, op: &str, value: Value) -> Value {
    json!({ field: { op: value } })
}

fn logical(op: &str, children: &[MetadataFilter]) -> Value {
    let parts: Vec<Value> = children
        .iter()
        .filter(|c| !c.is_empty())
        .map(MetadataFilter::to_pinecone_json)
        .collect();
    json!({ op: parts })
}

/// Restrict `datasource` to document categories, plus GITHUB when code is wanted
pub fn datasource_filter(include_code: bool) -> MetadataFilter {
    MetadataFilter::is_in(DATASOURCE_FIELD, DataSource::admitted(include_code))
}
