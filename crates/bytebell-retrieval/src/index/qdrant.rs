//! Qdrant index backend
//!
//! Each namespace lives in its own collection named `{index_name}-{namespace}`
//! with two named vectors: `dense` and `sparse`. A hybrid query prefetches
//! candidates from both and fuses them with distribution-based score fusion.

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition, Filter, Fusion, PointId,
    PrefetchQueryBuilder, Query, QueryPointsBuilder, Range, Value as QdrantValue, VectorInput,
};
use qdrant_client::Qdrant;
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use super::{IndexQuery, VectorIndex};
use crate::error::{Result, RetrievalError};
use crate::filter::{FilterValue, MetadataFilter};
use crate::schema::SearchMatch;

/// Named dense vector in each collection
pub const DENSE_VECTOR: &str = "dense";

/// Named sparse vector in each collection
pub const SPARSE_VECTOR: &str = "sparse";

/// Connection settings for Qdrant
#[derive(Clone)]
pub struct QdrantIndexConfig {
    /// Qdrant gRPC URL (e.g., "http://localhost:6334")
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Collection prefix; namespaces are appended as `{index_name}-{namespace}`
    pub index_name: String,
}

impl Default for QdrantIndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
            timeout_secs: 30,
            index_name: super::pinecone::DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

impl QdrantIndexConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Collection backing `namespace`
    pub fn collection_for(&self, namespace: &str) -> String {
        format!("{}-{}", self.index_name, namespace)
    }
}

impl std::fmt::Debug for QdrantIndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantIndexConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("index_name", &self.index_name)
            .finish()
    }
}

/// Qdrant-backed vector index
pub struct QdrantIndex {
    client: Qdrant,
    config: QdrantIndexConfig,
}

impl QdrantIndex {
    /// Build a client; no request is made until the first query
    pub fn connect(config: QdrantIndexConfig) -> Result<Self> {
        info!("Using Qdrant at {}", config.url);

        let mut builder =
            Qdrant::from_url(&config.url).timeout(Duration::from_secs(config.timeout_secs));
        if let Some(api_key) = config.api_key.clone() {
            builder = builder.api_key(api_key);
        }

        let client = builder.build().map_err(|e| {
            RetrievalError::Connection(format!("Failed to build Qdrant client: {}", e))
        })?;

        Ok(Self { client, config })
    }
}

impl std::fmt::Debug for QdrantIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantIndex")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
        let collection = self.config.collection_for(query.namespace);
        let limit = query.top_k as u64;
        let filter = query.filter.map(to_filter);

        let mut dense = PrefetchQueryBuilder::default()
            .query(Query::new_nearest(query.vector.dense.clone()))
            .using(DENSE_VECTOR)
            .limit(limit);
        let mut sparse = PrefetchQueryBuilder::default()
            .query(Query::new_nearest(VectorInput::new_sparse(
                query.vector.sparse.indices.clone(),
                query.vector.sparse.values.clone(),
            )))
            .using(SPARSE_VECTOR)
            .limit(limit);
        if let Some(filter) = filter.clone() {
            dense = dense.filter(filter.clone());
            sparse = sparse.filter(filter);
        }

        let mut request = QueryPointsBuilder::new(&collection)
            .add_prefetch(dense)
            .add_prefetch(sparse)
            .query(Query::new_fusion(Fusion::Dbsf))
            .limit(limit)
            .with_payload(true);
        if let Some(filter) = filter {
            request = request.filter(filter);
        }

        debug!(collection = %collection, limit, "Querying Qdrant");
        let response = self.client.query(request).await?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point_id_to_string(point.id?)?;
                let metadata: Map<String, Value> = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, to_json(v)))
                    .collect();
                Some(SearchMatch::new(id, point.score, metadata))
            })
            .collect())
    }

    fn backend(&self) -> &'static str {
        "qdrant"
    }
}

fn point_id_to_string(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Num(n) => Some(n.to_string()),
        PointIdOptions::Uuid(u) => Some(u),
    }
}

/// Convert a Qdrant payload value into JSON
fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d).map(Value::Number).unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(st)) => Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect(),
        ),
    }
}

/// Translate a [`MetadataFilter`] into a top-level Qdrant filter
pub fn to_filter(filter: &MetadataFilter) -> Filter {
    match filter {
        MetadataFilter::And(children) => Filter::must(children.iter().map(to_condition)),
        MetadataFilter::Or(children) => Filter::should(children.iter().map(to_condition)),
        other => Filter::must([to_condition(other)]),
    }
}

fn to_condition(filter: &MetadataFilter) -> Condition {
    match filter {
        MetadataFilter::Eq { field, value } => match_value(field, value),
        MetadataFilter::Ne { field, value } => Filter::must_not([match_value(field, value)]).into(),
        MetadataFilter::Gt { field, value } => Condition::range(
            field.as_str(),
            Range {
                gt: Some(*value),
                ..Default::default()
            },
        ),
        MetadataFilter::Gte { field, value } => Condition::range(
            field.as_str(),
            Range {
                gte: Some(*value),
                ..Default::default()
            },
        ),
        MetadataFilter::Lt { field, value } => Condition::range(
            field.as_str(),
            Range {
                lt: Some(*value),
                ..Default::default()
            },
        ),
        MetadataFilter::Lte { field, value } => Condition::range(
            field.as_str(),
            Range {
                lte: Some(*value),
                ..Default::default()
            },
        ),
        MetadataFilter::In { field, values } => match_any(field, values),
        MetadataFilter::Nin { field, values } => {
            Filter::must_not([match_any(field, values)]).into()
        }
        MetadataFilter::Range { field, min, max } => Condition::range(
            field.as_str(),
            Range {
                gte: *min,
                lte: *max,
                ..Default::default()
            },
        ),
        MetadataFilter::Exists { field, exists: true } => {
            Filter::must_not([Condition::is_empty(field.as_str())]).into()
        }
        MetadataFilter::Exists {
            field,
            exists: false,
        } => Condition::is_empty(field.as_str()),
        MetadataFilter::And(children) => Filter::must(children.iter().map(to_condition)).into(),
        MetadataFilter::Or(children) => Filter::should(children.iter().map(to_condition)).into(),
    }
}

fn match_value(field: &str, value: &FilterValue) -> Condition {
    match value {
        FilterValue::String(s) => Condition::matches(field, s.clone()),
        FilterValue::Bool(b) => Condition::matches(field, *b),
        FilterValue::Number(n) if n.fract() == 0.0 => Condition::matches(field, *n as i64),
        FilterValue::Number(n) => Condition::range(
            field,
            Range {
                gte: Some(*n),
                lte: Some(*n),
                ..Default::default()
            },
        ),
    }
}

/// Set membership: keyword or integer lists map to a single match, mixed lists to `should`
fn match_any(field: &str, values: &[FilterValue]) -> Condition {
    let strings: Option<Vec<String>> = values
        .iter()
        .map(|v| match v {
            FilterValue::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect();
    if let Some(strings) = strings {
        return Condition::matches(field, strings);
    }

    let integers: Option<Vec<i64>> = values
        .iter()
        .map(|v| match v {
            FilterValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        })
        .collect();
    if let Some(integers) = integers {
        return Condition::matches(field, integers);
    }

    Filter::should(values.iter().map(|v| match_value(field, v))).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{datasource_filter, DataSource};
    use qdrant_client::qdrant::{ListValue, Struct};
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_collection_naming() {
        let config = QdrantIndexConfig::default().index_name("bytebell");
        assert_eq!(config.collection_for("sei_meta"), "bytebell-sei_meta");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = QdrantIndexConfig::default().api_key("qdrant-secret");
        assert!(!format!("{:?}", config).contains("qdrant-secret"));
    }

    #[test]
    fn test_datasource_filter_translation() {
        let filter = to_filter(&datasource_filter(true));
        let expected = Filter::must([Condition::matches(
            "datasource",
            DataSource::admitted(true)
                .iter()
                .map(|d| d.as_str().to_string())
                .collect::<Vec<_>>(),
        )]);
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_exclusion_uses_must_not() {
        let condition = to_condition(&MetadataFilter::not_in("datasource", [DataSource::Github]));
        let expected: Condition = Filter::must_not([Condition::matches(
            "datasource",
            vec!["GITHUB".to_string()],
        )])
        .into();
        assert_eq!(condition, expected);
    }

    #[test]
    fn test_range_translation() {
        let condition = to_condition(&MetadataFilter::range("length", Some(10.0), None));
        let expected = Condition::range(
            "length",
            Range {
                gte: Some(10.0),
                ..Default::default()
            },
        );
        assert_eq!(condition, expected);
    }

    #[test]
    fn test_or_translates_to_should() {
        let filter = to_filter(&MetadataFilter::or([
            MetadataFilter::eq("chunk_type", "text"),
            MetadataFilter::eq("length", 12i64),
        ]));
        let expected = Filter::should([
            Condition::matches("chunk_type", "text".to_string()),
            Condition::matches("length", 12i64),
        ]);
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_payload_to_json() {
        let mut fields = HashMap::new();
        fields.insert(
            "inner".to_string(),
            QdrantValue {
                kind: Some(Kind::IntegerValue(3)),
            },
        );
        let value = QdrantValue {
            kind: Some(Kind::StructValue(Struct { fields })),
        };
        assert_eq!(to_json(value), json!({"inner": 3}));

        let list = QdrantValue {
            kind: Some(Kind::ListValue(ListValue {
                values: vec![
                    QdrantValue {
                        kind: Some(Kind::StringValue("a".into())),
                    },
                    QdrantValue {
                        kind: Some(Kind::BoolValue(true)),
                    },
                ],
            })),
        };
        assert_eq!(to_json(list), json!(["a", true]));
    }

    #[test]
    fn test_point_id_to_string() {
        let numeric = PointId {
            point_id_options: Some(PointIdOptions::Num(42)),
        };
        assert_eq!(point_id_to_string(numeric).as_deref(), Some("42"));

        let uuid = PointId {
            point_id_options: Some(PointIdOptions::Uuid("a-b".into())),
        };
        assert_eq!(point_id_to_string(uuid).as_deref(), Some("a-b"));
    }
}
