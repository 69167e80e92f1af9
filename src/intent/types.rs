use serde::{Deserialize, Serialize};

use crate::planner::types::Tool;

/// One routable intent: its example phrasings, optional anchor substrings
/// and the tool that handles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSpec {
    pub label: String,
    pub examples: Vec<String>,
    /// Lowercase substrings; when non-empty, keyword matching requires at
    /// least one of them to appear in the input.
    #[serde(default)]
    pub anchors: Vec<String>,
    pub handler: Tool,
}

impl IntentSpec {
    pub fn new(label: impl Into<String>, handler: Tool) -> Self {
        Self {
            label: label.into(),
            examples: Vec::new(),
            anchors: Vec::new(),
            handler,
        }
    }

    pub fn examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn anchors<I, S>(mut self, anchors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.anchors = anchors
            .into_iter()
            .map(|a| a.into().to_lowercase())
            .collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// `None` when no intent cleared the active threshold.
    pub label: Option<String>,
    pub score: f32,
}

impl RouteResult {
    pub fn no_match(score: f32) -> Self {
        Self { label: None, score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteMode {
    Embedding,
    Keyword,
}
