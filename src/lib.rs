use serde::Serialize;
use tracing::debug;

pub mod config;
pub mod document;
pub mod error;
pub mod link;
pub mod parser;

pub use config::{ExtractorConfig, load_config_from_file};
pub use document::{
    Directive, DirectiveKind, DirectiveRegistry, Document, Element, ElementId, Marker, Node,
    RenderOptions, Segment,
};
pub use error::{ExtractError, InvocationError, Result, TemplateError};
pub use link::{Invocation, Label, LinkMatch};
pub use parser::Parser;

/// A lookup key produced by a commit, with the text that belongs in the
/// locale file for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedKey {
    pub key: String,
    pub default_text: String,
}

pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Extractor { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Builds the match of every element that has one, in document order.
    pub fn find_matches(&self, document: &Document) -> Vec<LinkMatch> {
        document
            .element_ids()
            .into_iter()
            .filter_map(|id| LinkMatch::create(document, id, &self.config))
            .collect()
    }

    /// Rewrites every element of the document that holds translatable links
    /// and returns the keys it introduced.
    pub fn extract(&self, document: &mut Document) -> Vec<ExtractedKey> {
        let mut keys = Vec::new();
        for link_match in self.find_matches(document) {
            link_match.apply(document);
            keys.push(ExtractedKey {
                key: link_match.key().to_string(),
                default_text: link_match.default_text().to_string(),
            });
        }
        debug!(keys = keys.len(), "extracted");
        keys
    }

    /// Parses a template, rewrites it and renders it back.
    pub fn extract_source(&self, source: &str) -> Result<(String, Vec<ExtractedKey>)> {
        let mut document = Parser::new(source).parse()?;
        let keys = self.extract(&mut document);
        Ok((document.render(&self.config.render_options()), keys))
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Extractor::new(ExtractorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_source() {
        let extractor = Extractor::default();
        let (output, keys) = extractor
            .extract_source(
                "<ul>\n  <li>Read the <%= link_to \"guide\", guide_path %> first.</li>\n  <li>Nothing here</li>\n</ul>\n",
            )
            .unwrap();

        assert_eq!(
            output,
            "<ul>\n  <li><%= it(\".read_the_guide_first\", guide: It.link(guide_path)) %></li>\n  <li>Nothing here</li>\n</ul>\n"
        );
        assert_eq!(
            keys,
            vec![ExtractedKey {
                key: ".read_the_guide_first".to_string(),
                default_text: "Read the %{guide:guide} first.".to_string(),
            }]
        );
    }

    #[test]
    fn test_extract_source_keeps_unrelated_directives() {
        let extractor = Extractor::default();
        let (output, _) = extractor
            .extract_source(r#"<div><%= "wow!i!" %></div><p>Go <%=link_to "home", root_path%></p>"#)
            .unwrap();
        assert_eq!(
            output,
            r#"<div><%= "wow!i!" %></div><p><%= it(".go_home", home: It.link(root_path)) %></p>"#
        );
    }

    #[test]
    fn test_extract_source_with_other_lookup_helper() {
        let mut config = ExtractorConfig::default();
        config.with_lookup_helper("I18n.t");
        let (output, _) = Extractor::new(config)
            .extract_source(r#"<p>Go <%= link_to "home", root_path %></p>"#)
            .unwrap();
        assert_eq!(output, r#"<p><%= it(".go_home", home: It.link(root_path)) %></p>"#);
    }

    #[test]
    fn test_extract_source_without_matches_is_unchanged() {
        let source = "<div>\n<%=foo%>\n<% #note %>\n<%  if x  %>y<% end %>\n</div>\n";
        let (output, keys) = Extractor::default().extract_source(source).unwrap();
        assert!(keys.is_empty());
        assert_eq!(output, source);
    }

    #[test]
    fn test_extract_source_reports_template_errors() {
        let extractor = Extractor::default();
        let err = extractor.extract_source("<p><%= link_to 'a', b").unwrap_err();
        assert!(matches!(err, ExtractError::Template(_)));
    }

    #[test]
    fn test_find_matches_leaves_document_untouched() {
        let extractor = Extractor::default();
        let document = Parser::new(r#"<p><%= link_to "a", b %></p><p><%= link_to "c", d %></p>"#)
            .parse()
            .unwrap();
        let before = document.clone();
        assert_eq!(extractor.find_matches(&document).len(), 2);
        assert_eq!(document, before);
    }
}
