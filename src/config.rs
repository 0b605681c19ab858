use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::document::RenderOptions;
use crate::error::{ExtractError, Result};

/// Names and limits the link engine works with.
///
/// Defaults match a Rails view layer using the `it` gem: `link_to` links,
/// `t(...)` lookups and `It.link(...)` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Helper whose invocations are rewritten
    pub link_helper: String,
    /// Calls that mark a label as already translated
    pub translate_helpers: Vec<String>,
    /// Helper the rewritten directive calls
    pub lookup_helper: String,
    /// Helper rendered in place of a translatable link
    pub placeholder_helper: String,
    /// Keyword arguments forwarded into the placeholder helper call
    pub allowed_keywords: Vec<String>,
    /// Output helpers that may wrap a link call, as in `raw link_to ...`
    pub wrapper_helpers: Vec<String>,
    pub key_max_len: usize,
    pub interpolated_indicator: String,
    /// Helper written in place of the indicator and lookup helper
    pub interpolation_helper: String,
    pub raw_tag: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            link_helper: "link_to".to_string(),
            translate_helpers: vec![
                "t".to_string(),
                "translate".to_string(),
                "I18n.t".to_string(),
                "I18n.translate".to_string(),
            ],
            lookup_helper: "t".to_string(),
            placeholder_helper: "It.link".to_string(),
            allowed_keywords: vec!["class".to_string()],
            wrapper_helpers: vec!["raw".to_string(), "h".to_string()],
            key_max_len: 40,
            interpolated_indicator: "!i!".to_string(),
            interpolation_helper: "it".to_string(),
            raw_tag: "raw".to_string(),
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        ExtractorConfig::default()
    }

    pub fn with_link_helper(&mut self, name: &str) -> &mut Self {
        self.link_helper = name.to_string();
        self
    }

    pub fn with_translate_helper(&mut self, name: &str) -> &mut Self {
        if !self.translate_helpers.iter().any(|h| h == name) {
            self.translate_helpers.push(name.to_string());
        }
        self
    }

    pub fn with_lookup_helper(&mut self, name: &str) -> &mut Self {
        self.lookup_helper = name.to_string();
        self
    }

    pub fn with_placeholder_helper(&mut self, name: &str) -> &mut Self {
        self.placeholder_helper = name.to_string();
        self
    }

    pub fn with_allowed_keyword(&mut self, name: &str) -> &mut Self {
        if !self.allowed_keywords.iter().any(|k| k == name) {
            self.allowed_keywords.push(name.to_string());
        }
        self
    }

    pub fn with_key_max_len(&mut self, len: usize) -> &mut Self {
        self.key_max_len = len;
        self
    }

    pub fn is_allowed_keyword(&self, name: &str) -> bool {
        self.allowed_keywords.iter().any(|k| k == name)
    }

    pub fn render_options(&self) -> RenderOptions<'_> {
        RenderOptions {
            interpolated_indicator: &self.interpolated_indicator,
            lookup_helper: &self.lookup_helper,
            interpolation_helper: &self.interpolation_helper,
            raw_tag: &self.raw_tag,
        }
    }
}

/// Load an [`ExtractorConfig`] from a JSON file
///
/// Any field left out of the file keeps its default:
/// ```json
/// {
///     "link_helper": "link_to",
///     "allowed_keywords": ["class", "data"]
/// }
/// ```
///
/// # Errors
/// - File read errors
/// - Invalid JSON
pub fn load_config_from_file(path: &Path) -> Result<ExtractorConfig> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| ExtractError::Config {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ExtractorConfig::new();
        assert_eq!(config.link_helper, "link_to");
        assert_eq!(config.key_max_len, 40);
        assert!(config.is_allowed_keyword("class"));
        assert!(!config.is_allowed_keyword("title"));
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_builder() {
        let mut config = ExtractorConfig::new();
        config
            .with_allowed_keyword("data")
            .with_allowed_keyword("class")
            .with_translate_helper("_")
            .with_key_max_len(20);
        assert_eq!(config.allowed_keywords, vec!["class", "data"]);
        assert!(config.translate_helpers.contains(&"_".to_string()));
        assert_eq!(config.key_max_len, 20);
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"link_helper": "link_to_page", "key_max_len": 30}}"#).unwrap();

        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.link_helper, "link_to_page");
        assert_eq!(config.key_max_len, 30);
        assert_eq!(config.placeholder_helper, "It.link");
    }

    #[test]
    fn test_load_invalid_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_config_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Config { .. }));
    }
}
