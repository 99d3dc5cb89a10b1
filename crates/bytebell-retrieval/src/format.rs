//! Labelled text rendering of stage results

use crate::schema::{RetrievalResponse, SearchResult, Stage};

/// One rendered field: result key and its display label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLabel {
    /// Key understood by [`SearchResult::display_field`]
    pub key: String,
    pub label: String,
}

impl FieldLabel {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Which fields to render and how results are separated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub fields: Vec<FieldLabel>,
    pub separator: String,
}

impl FormatOptions {
    pub const DEFAULT_SEPARATOR: &'static str = "-----";

    /// Title, Source, Content
    pub fn base() -> Self {
        Self {
            fields: vec![
                FieldLabel::new("title", "Title"),
                FieldLabel::new("source", "Source"),
                FieldLabel::new("content", "Content"),
            ],
            separator: Self::DEFAULT_SEPARATOR.into(),
        }
    }

    /// Meta Type, Source, Content
    pub fn meta() -> Self {
        Self {
            fields: vec![
                FieldLabel::new("meta_type", "Meta Type"),
                FieldLabel::new("source", "Source"),
                FieldLabel::new("content", "Content"),
            ],
            separator: Self::DEFAULT_SEPARATOR.into(),
        }
    }

    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Meta => Self::meta(),
            Stage::Base => Self::base(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Render one result; empty when no configured field has a value
    pub fn render_result(&self, result: &SearchResult) -> String {
        let sections = self
            .fields
            .iter()
            .filter_map(|f| {
                let value = result.display_field(&f.key)?;
                (!value.is_empty()).then(|| format!("{}: {}", f.label, value))
            })
            .collect::<Vec<_>>()
            .join("\n");

        if sections.is_empty() {
            sections
        } else {
            format!("{}\n{}", sections, self.separator)
        }
    }

    /// Render a whole response; failed or empty searches render as ""
    pub fn render(&self, response: &RetrievalResponse) -> String {
        if !response.success || response.results.is_empty() {
            return String::new();
        }
        response
            .results
            .iter()
            .map(|r| self.render_result(r))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
