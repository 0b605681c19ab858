use tracing::trace;

use crate::document::{Directive, DirectiveKind, Document, Element, Segment};
use crate::error::TemplateError;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Erb(Directive),
    Tag(Tag),
    /// Markup that can never open or close an element (HTML comments,
    /// doctypes, tags with ERB inside their attributes).
    Markup(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Tag {
    raw: String,
    name: String,
    closing: bool,
    self_closing: bool,
}

impl Tag {
    fn opens_element(&self) -> bool {
        !self.closing
            && !self.self_closing
            && !VOID_ELEMENTS.contains(&self.name.to_ascii_lowercase().as_str())
    }

    fn closes(&self, name: &str) -> bool {
        self.closing && self.name.eq_ignore_ascii_case(name)
    }
}

/// A reader for ERB templates.
///
/// The parser is not a general HTML parser. It splits the input into text,
/// tags and ERB tags, registers every ERB tag with the document in source
/// order and groups a tag into an [`Element`] when everything up to its
/// matching close tag is text or ERB. All other markup is kept verbatim.
pub struct Parser<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input, position: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Consumes the current character and advances the position.
    /// Returns the character that was consumed, or None if at the end of input.
    fn consume(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn at_tag_start(&self) -> bool {
        let mut chars = self.rest().chars();
        chars.next() == Some('<')
            && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!')
    }

    fn parse_text(&mut self) -> Token {
        let start = self.position;
        while self.peek().is_some() {
            if self.rest().starts_with("<%") || (self.position > start && self.at_tag_start()) {
                break;
            }
            self.consume();
        }
        Token::Text(self.input[start..self.position].to_string())
    }

    /// Parses `<%= ... %>`, `<% ... %>` and `<%# ... %>`.
    ///
    /// `<% #text %>` is a comment as well. Comment text is stored without the
    /// `#` marker and surrounding whitespace; the tag as written is kept for
    /// rendering.
    fn parse_erb(&mut self) -> Result<Token, TemplateError> {
        let start = self.position;
        self.position += 2; // Consume '<%'

        if self.peek() == Some('%') {
            // `<%%` is a literal `<%` in ERB.
            self.consume();
            return Ok(Token::Text("<%%".to_string()));
        }

        let trim_left = if self.peek() == Some('-') {
            self.consume();
            true
        } else {
            false
        };

        let mut kind = match self.peek() {
            Some('=') => {
                self.consume();
                DirectiveKind::Output
            }
            Some('#') => {
                self.consume();
                DirectiveKind::Comment
            }
            _ => DirectiveKind::Statement,
        };

        let Some(end) = self.rest().find("%>") else {
            return Err(TemplateError::UnterminatedTag { offset: start });
        };
        let mut body = &self.rest()[..end];
        self.position += end + 2;

        let trim_right = body.ends_with('-');
        if trim_right {
            body = &body[..body.len() - 1];
        }

        let mut text = body.trim();
        if kind == DirectiveKind::Statement && text.starts_with('#') {
            kind = DirectiveKind::Comment;
            text = text[1..].trim();
        }

        trace!(offset = start, ?kind, text, "erb tag");
        Ok(Token::Erb(Directive {
            kind,
            text: text.to_string(),
            trim_left,
            trim_right,
            source: Some(self.input[start..self.position].to_string()),
        }))
    }

    fn parse_tag(&mut self) -> Token {
        let start = self.position;

        if self.rest().starts_with("<!--") {
            let end = self.rest()[4..]
                .find("-->")
                .map(|i| i + 4 + 3)
                .unwrap_or(self.rest().len());
            self.position += end;
            return Token::Markup(self.input[start..self.position].to_string());
        }

        self.consume(); // Consume '<'
        let closing = self.peek() == Some('/');
        if closing {
            self.consume();
        }
        let declaration = self.peek() == Some('!');

        let name_start = self.position;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '!') {
                break;
            }
            self.consume();
        }
        let name = self.input[name_start..self.position].to_string();

        let mut quote: Option<char> = None;
        while let Some(c) = self.peek() {
            if self.rest().starts_with("<%") {
                // ERB inside attributes: whatever was read so far is plain
                // markup, the ERB tag itself is read by the caller.
                return Token::Markup(self.input[start..self.position].to_string());
            }
            self.consume();
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '>') => {
                    let raw = self.input[start..self.position].to_string();
                    if declaration {
                        return Token::Markup(raw);
                    }
                    let self_closing = raw.ends_with("/>");
                    return Token::Tag(Tag {
                        raw,
                        name,
                        closing,
                        self_closing,
                    });
                }
                _ => {}
            }
        }

        Token::Markup(self.input[start..self.position].to_string())
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, TemplateError> {
        let mut tokens = Vec::new();
        while self.position < self.input.len() {
            let token = if self.rest().starts_with("<%") {
                self.parse_erb()?
            } else if self.at_tag_start() {
                self.parse_tag()
            } else {
                self.parse_text()
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Finds the token that closes the element opened at `open`, provided
    /// only text and ERB tokens lie in between.
    fn leaf_close<'t>(tokens: &'t [Token], open: usize, name: &str) -> Option<(usize, &'t Tag)> {
        for (offset, token) in tokens[open + 1..].iter().enumerate() {
            match token {
                Token::Text(_) | Token::Erb(_) => continue,
                Token::Tag(tag) if tag.closes(name) => return Some((open + 1 + offset, tag)),
                _ => return None,
            }
        }
        None
    }

    pub fn parse(&mut self) -> Result<Document, TemplateError> {
        let tokens = self.tokenize()?;
        let mut document = Document::new();

        let mut index = 0;
        while index < tokens.len() {
            match &tokens[index] {
                Token::Tag(tag) if tag.opens_element() => {
                    if let Some((close, close_tag)) = Self::leaf_close(&tokens, index, &tag.name) {
                        let mut element = Element::new(&tag.name, &tag.raw, &close_tag.raw);
                        for token in &tokens[index + 1..close] {
                            match token {
                                Token::Text(text) => element.push(Segment::Text(text.clone())),
                                Token::Erb(directive) => {
                                    let marker =
                                        document.directives_mut().register(directive.clone());
                                    element.push(Segment::Directive(marker));
                                }
                                _ => {}
                            }
                        }
                        document.push_element(element);
                        index = close + 1;
                        continue;
                    }
                    document.push_markup(&tag.raw);
                }
                Token::Tag(tag) => document.push_markup(&tag.raw),
                Token::Text(text) | Token::Markup(text) => document.push_markup(text),
                Token::Erb(directive) => {
                    document.push_directive(directive.clone());
                }
            }
            index += 1;
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Node, RenderOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_paragraph_with_link() {
        let input = r#"<p>Say <%= link_to "Hello", some_url %> to me</p>"#;
        let document = Parser::new(input).parse().unwrap();

        let id = document.find_element("p").unwrap();
        let element = document.element(id).unwrap();
        assert_eq!(element.segments.len(), 3);
        assert_eq!(element.segments[0], Segment::Text("Say ".to_string()));
        assert_eq!(
            document.directives().values().collect::<Vec<_>>(),
            vec![r#"link_to "Hello", some_url"#]
        );
    }

    #[test]
    fn test_parse_comment_directives() {
        let input = "<p><% #my cool comment %><%# another %></p>";
        let document = Parser::new(input).parse().unwrap();
        let kinds: Vec<_> = document.directives().iter().map(|(_, d)| d.kind).collect();
        assert_eq!(kinds, vec![DirectiveKind::Comment, DirectiveKind::Comment]);
        assert_eq!(
            document.directives().values().collect::<Vec<_>>(),
            vec!["my cool comment", "another"]
        );
    }

    #[test]
    fn test_nested_markup_is_not_an_element() {
        let input = "<div><p>Hi</p><br/></div>";
        let document = Parser::new(input).parse().unwrap();
        assert_eq!(document.element_ids().len(), 1);
        assert_eq!(document.find_element("div"), None);
        assert!(document.find_element("p").is_some());
        assert_eq!(document.render(&RenderOptions::default()), input);
    }

    #[test]
    fn test_top_level_directives_are_registered() {
        let input = "<% if admin? %>\n<p>Admin</p>\n<% end %>";
        let document = Parser::new(input).parse().unwrap();
        assert_eq!(document.directives().len(), 2);
        assert!(matches!(document.nodes()[0], Node::Directive(_)));
        assert_eq!(document.render(&RenderOptions::default()), input);
    }

    #[test]
    fn test_erb_inside_attribute_stays_markup() {
        let input = r#"<p><a href="<%= url %>">here</a></p>"#;
        let document = Parser::new(input).parse().unwrap();
        assert_eq!(document.find_element("p"), None);
        assert_eq!(document.directives().len(), 1);
        assert_eq!(document.render(&RenderOptions::default()), input);
    }

    #[test]
    fn test_trim_markers_round_trip() {
        let input = "<li><%- item.each do |i| -%></li>";
        let document = Parser::new(input).parse().unwrap();
        assert_eq!(document.render(&RenderOptions::default()), input);
    }

    #[test]
    fn test_untouched_tags_keep_their_spacing() {
        let input = "<div>\n<%=foo%>\n<% #note %>\n<%  if x  %>y<% end %>\n</div>\n";
        let document = Parser::new(input).parse().unwrap();
        assert_eq!(
            document.directives().values().collect::<Vec<_>>(),
            vec!["foo", "note", "if x", "end"]
        );
        assert_eq!(document.render(&RenderOptions::default()), input);
    }

    #[test]
    fn test_unterminated_erb_tag() {
        let input = "<p><%= link_to 'x', y </p>";
        let result = Parser::new(input).parse();
        assert_eq!(result, Err(TemplateError::UnterminatedTag { offset: 3 }));
    }
}
