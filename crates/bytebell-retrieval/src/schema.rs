//! Match, result and response types for namespace searches
//!
//! A [`SearchMatch`] is what the index returns: id, score and the raw
//! metadata bag. Each stage normalizes matches into [`SearchResult`]s with
//! its own transform ([`SearchResult::from_base_match`] or
//! [`SearchResult::from_meta_match`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata field names written by the indexing pipeline
pub mod fields {
    /// Primary passage text
    pub const TEXT: &str = "text";
    /// Secondary passage text, used when `text` is absent
    pub const CHUNK_CONTENT: &str = "chunk_content";
    pub const SOURCE: &str = "source";
    pub const DATASOURCE: &str = "datasource";
    pub const NODE_ID: &str = "node_id";
    pub const TITLE: &str = "title";
    pub const KNOWLEDGE_ID: &str = "knowledge_id";
    pub const URL: &str = "url";
    pub const LENGTH: &str = "length";
    pub const CHUNK_TYPE: &str = "chunk_type";
    pub const META_TYPE: &str = "meta_type";
    pub const REF_CHUNK_ID: &str = "ref_chunk_id";
    pub const REF_DATASOURCE: &str = "ref_datasource";
    pub const REF_NODE_ID: &str = "ref_node_id";
}

/// Raw scored match returned by a vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl SearchMatch {
    pub fn new(id: impl Into<String>, score: f32, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            score,
            metadata,
        }
    }

    /// Metadata field rendered as text; numbers and booleans are stringified
    pub fn field(&self, name: &str) -> Option<String> {
        match self.metadata.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn field_or_empty(&self, name: &str) -> String {
        self.field(name).unwrap_or_default()
    }

    fn length(&self) -> Option<u64> {
        let value = self.metadata.get(fields::LENGTH)?;
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
    }

    /// Passage text: non-empty `text`, else non-empty `chunk_content`
    pub fn content(&self) -> Option<String> {
        self.non_empty_field(fields::TEXT)
            .or_else(|| self.non_empty_field(fields::CHUNK_CONTENT))
    }

    /// Whether the match carries usable passage text
    pub fn has_content(&self) -> bool {
        self.content().is_some()
    }

    fn non_empty_field(&self, name: &str) -> Option<String> {
        self.field(name).filter(|s| !s.is_empty())
    }
}

/// Which namespace a search ran against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Coarse cross-referencing summaries
    Meta,
    /// Detailed passages
    Base,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Meta => "meta",
            Stage::Base => "base",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "meta" => Ok(Stage::Meta),
            "base" => Ok(Stage::Base),
            other => Err(format!("unknown stage '{}', expected 'meta' or 'base'", other)),
        }
    }
}

/// Descriptive fields of a base-namespace passage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseDetails {
    pub source: String,
    pub node_id: String,
    pub title: String,
    pub knowledge_id: String,
    pub url: String,
    pub length: Option<u64>,
    pub chunk_type: String,
}

/// Descriptive fields of a meta-namespace summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaDetails {
    /// Content category of the summarized source
    pub source: String,
    pub node_id: String,
    pub meta_type: String,
    pub length: Option<u64>,
    pub ref_chunk_id: String,
    pub ref_datasource: String,
    pub ref_node_id: String,
    pub chunk_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum ResultDetails {
    Base(BaseDetails),
    Meta(MetaDetails),
}

/// Normalized search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub details: ResultDetails,
}

impl SearchResult {
    /// Transform for the base namespace
    pub fn from_base_match(m: SearchMatch) -> Self {
        let details = BaseDetails {
            source: m.field_or_empty(fields::SOURCE),
            node_id: m.field_or_empty(fields::NODE_ID),
            title: m.field_or_empty(fields::TITLE),
            knowledge_id: m.field_or_empty(fields::KNOWLEDGE_ID),
            url: m.field_or_empty(fields::URL),
            length: m.length(),
            chunk_type: m.field_or_empty(fields::CHUNK_TYPE),
        };
        Self {
            content: m.content().unwrap_or_default(),
            score: m.score,
            details: ResultDetails::Base(details),
            id: m.id,
        }
    }

    /// Transform for the meta namespace
    pub fn from_meta_match(m: SearchMatch) -> Self {
        let details = MetaDetails {
            source: m.field_or_empty(fields::DATASOURCE),
            node_id: m.field_or_empty(fields::NODE_ID),
            meta_type: m.field_or_empty(fields::META_TYPE),
            length: m.length(),
            ref_chunk_id: m.field_or_empty(fields::REF_CHUNK_ID),
            ref_datasource: m.field_or_empty(fields::REF_DATASOURCE),
            ref_node_id: m.field_or_empty(fields::REF_NODE_ID),
            chunk_type: m.field_or_empty(fields::CHUNK_TYPE),
        };
        Self {
            content: m.content().unwrap_or_default(),
            score: m.score,
            details: ResultDetails::Meta(details),
            id: m.id,
        }
    }

    /// Meta type label, empty for base results
    pub fn meta_type(&self) -> &str {
        match &self.details {
            ResultDetails::Meta(meta) => &meta.meta_type,
            ResultDetails::Base(_) => "",
        }
    }

    /// Value of a descriptive field by its display key
    ///
    /// Keys are `content`, `score`, `id` and the detail field names
    /// (`title`, `source`, `url`, `meta_type`, ...).
    pub fn display_field(&self, key: &str) -> Option<String> {
        match key {
            "content" => return Some(self.content.clone()),
            "score" => return Some(format!("{:.4}", self.score)),
            "id" => return Some(self.id.clone()),
            _ => {}
        }

        let value = match &self.details {
            ResultDetails::Base(b) => match key {
                "source" => b.source.clone(),
                "node_id" => b.node_id.clone(),
                "title" => b.title.clone(),
                "knowledge_id" => b.knowledge_id.clone(),
                "url" => b.url.clone(),
                "length" => b.length.map(|l| l.to_string()).unwrap_or_default(),
                "chunk_type" => b.chunk_type.clone(),
                _ => return None,
            },
            ResultDetails::Meta(m) => match key {
                "source" => m.source.clone(),
                "node_id" => m.node_id.clone(),
                "meta_type" => m.meta_type.clone(),
                "length" => m.length.map(|l| l.to_string()).unwrap_or_default(),
                "ref_chunk_id" => m.ref_chunk_id.clone(),
                "ref_datasource" => m.ref_datasource.clone(),
                "ref_node_id" => m.ref_node_id.clone(),
                "chunk_type" => m.chunk_type.clone(),
                _ => return None,
            },
        };
        Some(value)
    }
}

/// Outcome of one namespace search
///
/// `success == false` always comes with an empty `results` list; use the
/// [`RetrievalResponse::succeeded`] and [`RetrievalResponse::failed`]
/// constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub query: String,
    pub namespace: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RetrievalResponse {
    pub fn succeeded(
        query: impl Into<String>,
        namespace: impl Into<String>,
        stage: Stage,
        results: Vec<SearchResult>,
    ) -> Self {
        Self {
            success: true,
            results,
            query: query.into(),
            namespace: namespace.into(),
            stage,
            error: None,
        }
    }

    pub fn failed(
        query: impl Into<String>,
        namespace: impl Into<String>,
        stage: Stage,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            query: query.into(),
            namespace: namespace.into(),
            stage,
            error: Some(error.into()),
        }
    }
}
