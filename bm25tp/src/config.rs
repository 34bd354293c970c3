//! Rescore configuration.
//!
//! Mirrors the JSON body of a `bm25tp` rescore request:
//! `{"query", "factor_field", "analyzer", "decay", "minimum_should_match", "window_size"}`.

use crate::interface::RescoreResult;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Analyzer used when a request does not name one.
pub const DEFAULT_ANALYZER: &str = "default";

/// Number of top candidates rescored when a request does not say.
pub const DEFAULT_WINDOW_SIZE: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RescoreConfig {
    /// Text analyzed into query terms.
    #[validate(length(min = 1))]
    pub query: String,
    /// Field whose term vectors are scored.
    #[validate(length(min = 1))]
    pub factor_field: String,
    /// Name of the analyzer used for the query.
    #[serde(default = "default_analyzer")]
    #[validate(length(min = 1))]
    pub analyzer: String,
    /// Per-use decay rate; 0 disables decay.
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub decay: f32,
    /// Stored and echoed back, but not applied to admission.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub minimum_should_match: f32,
    #[serde(default = "default_window_size")]
    #[validate(range(min = 1))]
    pub window_size: u32,
}

fn default_analyzer() -> String {
    DEFAULT_ANALYZER.to_string()
}

fn default_window_size() -> u32 {
    DEFAULT_WINDOW_SIZE
}

impl RescoreConfig {
    pub fn new(query: impl Into<String>, factor_field: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            factor_field: factor_field.into(),
            analyzer: default_analyzer(),
            decay: 0.0,
            minimum_should_match: 0.0,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = analyzer.into();
        self
    }

    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_minimum_should_match(mut self, minimum_should_match: f32) -> Self {
        self.minimum_should_match = minimum_should_match;
        self
    }

    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.window_size = window_size;
        self
    }

    /// Parse a JSON request body and validate it.
    pub fn from_json(json: &str) -> RescoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> RescoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
