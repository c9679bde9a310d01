use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Knobs shared by every builder instance.
///
/// JSON keys are camelCase; any missing key takes its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BuilderConfig {
    /// Timestamp field that marks a document as soft-deleted.
    pub soft_delete_field: String,
    /// `$options` value attached to keyword regexes.
    pub keyword_options: String,
    /// Match keywords literally instead of as regex patterns.
    pub escape_keyword: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            soft_delete_field: "deletedAt".to_string(),
            keyword_options: "i".to_string(),
            escape_keyword: false,
        }
    }
}

impl BuilderConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        if config.soft_delete_field.is_empty() {
            return Err(Error::Config("softDeleteField must not be empty".into()));
        }
        if config.soft_delete_field.starts_with('$') {
            return Err(Error::Config(format!(
                "softDeleteField must be a plain field name, got '{}'",
                config.soft_delete_field
            )));
        }
        Ok(config)
    }

    /// Load a config from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Keyword as it should appear in `$regex`.
    pub(crate) fn keyword_pattern(&self, keyword: &str) -> String {
        if self.escape_keyword {
            regex::escape(keyword)
        } else {
            keyword.to_string()
        }
    }
}
