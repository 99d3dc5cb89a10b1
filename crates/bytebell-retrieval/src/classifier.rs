//! Code-intent classification
//!
//! Decides whether a query explicitly asks for source code, which controls
//! whether GITHUB sources are admitted by the datasource filter.
//!
//! Two paths:
//! 1. Keyword fast path: a fixed vocabulary matched case-insensitively at the
//!    start of a word, so "debugging" hits `debug`. Terms shorter than
//!    [`PREFIX_MIN_LEN`] must be whole words (plural forms included) so `go`
//!    does not fire on "good". A hit returns `true` without any network call.
//! 2. Model path: a strict YES/NO classification completion. Anything other
//!    than a trimmed `YES` means `false`, and any failure falls back to the
//!    keyword result (`false` at that point).

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::completion::{ChatMessage, ChatModel, CompletionRequest};

/// Explicit code-related terms
pub const CODE_KEYWORDS: &[&str] = &[
    "code",
    "function",
    "class",
    "method",
    "implementation",
    "syntax",
    "programming",
    "script",
    "algorithm",
    "debug",
    "error",
    "bug",
    "example",
    "snippet",
    "repository",
    "github",
    "commit",
    "pull request",
    "api",
    "endpoint",
    "library",
    "framework",
    "package",
    "module",
    "variable",
    "parameter",
    "return",
    "import",
    "export",
    "console",
    "typescript",
    "javascript",
    "python",
    "java",
    "rust",
    "go",
    "how to implement",
    "show me code",
    "code example",
    "sample code",
];

/// Terms at least this long also match as the start of a longer word
pub const PREFIX_MIN_LEN: usize = 4;

static CODE_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    let mut terms: Vec<&str> = CODE_KEYWORDS.to_vec();
    // Longest first so multi-word phrases win over their prefixes
    terms.sort_by_key(|t| std::cmp::Reverse(t.len()));
    let alternation = terms
        .iter()
        .map(|t| {
            let term = regex::escape(t).replace(' ', r"\s+");
            if t.len() >= PREFIX_MIN_LEN {
                format!(r"\b{}", term)
            } else {
                format!(r"\b{}(?:e?s)?\b", term)
            }
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){}", alternation)).expect("code keyword pattern is valid")
});

/// Default classification model
pub const DEFAULT_CLASSIFIER_MODEL: &str = "google/gemini-2.0-flash-lite-001";

/// Settings for the model path
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CLASSIFIER_MODEL.into(),
            max_tokens: 10,
            temperature: 0.1,
        }
    }
}

/// Which path produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPath {
    /// A vocabulary term matched
    Keyword,
    /// The classification model answered
    Model,
    /// The model path failed or is not configured
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub include_code: bool,
    pub path: DecisionPath,
}

/// Decides whether code sources should be searched
#[derive(Clone)]
pub struct QueryClassifier {
    model: Option<Arc<dyn ChatModel>>,
    config: ClassifierConfig,
}

impl QueryClassifier {
    pub fn new(model: Arc<dyn ChatModel>, config: ClassifierConfig) -> Self {
        Self {
            model: Some(model),
            config,
        }
    }

    /// Classifier that only uses the keyword vocabulary
    pub fn keywords_only() -> Self {
        Self {
            model: None,
            config: ClassifierConfig::default(),
        }
    }

    /// First vocabulary term found in `query`
    pub fn keyword_match(query: &str) -> Option<&str> {
        CODE_KEYWORD_RE.find(query).map(|m| m.as_str())
    }

    pub async fn include_code(&self, query: &str) -> bool {
        self.classify(query).await.include_code
    }

    /// Classify `query`; never fails
    pub async fn classify(&self, query: &str) -> Classification {
        if let Some(term) = Self::keyword_match(query) {
            info!(term, "Keyword-based code analysis: INCLUDE code sources");
            return Classification {
                include_code: true,
                path: DecisionPath::Keyword,
            };
        }

        let Some(model) = &self.model else {
            info!("Keyword-based code analysis: EXCLUDE code sources");
            return Classification {
                include_code: false,
                path: DecisionPath::Fallback,
            };
        };

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(classification_prompt(query))],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        match model.complete(request).await {
            Ok(reply) => {
                let include_code = reply.trim().to_uppercase() == "YES";
                info!(
                    "Model code analysis: {} code sources",
                    if include_code { "INCLUDE" } else { "EXCLUDE" }
                );
                Classification {
                    include_code,
                    path: DecisionPath::Model,
                }
            }
            Err(e) => {
                warn!("Model code analysis failed, using keyword result: {}", e);
                Classification {
                    include_code: false,
                    path: DecisionPath::Fallback,
                }
            }
        }
    }
}

impl std::fmt::Debug for QueryClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClassifier")
            .field("model_configured", &self.model.is_some())
            .field("config", &self.config)
            .finish()
    }
}

fn classification_prompt(query: &str) -> String {
    format!(
        r#"You are a strict classifier.

TASK
Decide whether the user **explicitly** requests *source code* or *hands-on programming instructions*.

OUTPUT
Respond with **only** one token: **YES** or **NO** (uppercase, no extra text).

WHEN TO ANSWER **YES**
- The query contains clear code-seeking language such as "code", "code example", "code sample", "snippet", "show me how to <verb>", "implementation", "write", "build", "deploy", "create the contract", "step-by-step code", etc.
- The user asks for a "how to" *and* indicates they want real code or CLI commands.

WHEN TO ANSWER **NO**
- The query is purely conceptual/architectural (e.g. "How does SEI EVM work?").
- Mentioning technical terms (EVM, API, SDK, etc.) **without** an explicit code request.
- The user wants explanations, comparisons, theory, or general discussion only.

REMEMBER
- Do **not** infer a need for code from context; the request must be explicit.
- Ignore polite words ("please"), context captions, or prior conversation; judge this query alone.

QUERY: "{}""#,
        query
    )
}
