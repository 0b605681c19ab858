//! Sentence composition
//!
//! Turns the ordered content of one element (text runs and parsed link
//! invocations) into a single translation lookup directive:
//!
//! ```ignore
//! Source:    I would just like to say <%= link_to "Hello", some_url %> to you my friend!
//! Directive: !i!t(".i_would_just_like_to_say_hello_to_you_my", hello: It.link(some_url))
//! Default:   I would just like to say %{hello:Hello} to you my friend!
//! ```
//!
//! A link whose label is only known at run time is passed through as a live
//! `link_to(...)` value and the directive is tagged for raw output:
//!
//! ```ignore
//! Source:    Hey there, <%= link_to current_user.name, some_url %>. Welcome to the site!
//! Directive: raw t(".hey_there_current_user_name_welcome_to_t", current_user_name: link_to(current_user.name, some_url))
//! ```

use std::collections::HashMap;

use super::invocation::Invocation;
use super::key::{generate_key, placeholder_name};
use super::label::{Label, allowed_keywords};
use crate::config::ExtractorConfig;

/// One piece of an element's content, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece<'a> {
    Text(&'a str),
    Link(&'a Invocation),
}

/// How the directive has to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveShape {
    /// Every link goes through the placeholder helper.
    Interpolated,
    /// Every link is a live expression.
    Raw,
    /// Both kinds are present.
    RawInterpolated,
}

impl DirectiveShape {
    pub fn is_raw(&self) -> bool {
        !matches!(self, DirectiveShape::Interpolated)
    }

    pub fn is_interpolated(&self) -> bool {
        !matches!(self, DirectiveShape::Raw)
    }
}

/// A named argument of the rendered lookup call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArgument {
    pub name: String,
    pub value: String,
    /// `true` when the value is the original call, evaluated at run time
    pub live: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// Lookup key including its leading period
    pub key: String,
    pub directive: String,
    pub default_text: String,
    pub shape: DirectiveShape,
    pub arguments: Vec<NamedArgument>,
}

pub struct Composer<'c> {
    config: &'c ExtractorConfig,
}

impl<'c> Composer<'c> {
    pub fn new(config: &'c ExtractorConfig) -> Self {
        Composer { config }
    }

    /// `It.link(target, class: "x")`, or `It.link()` when nothing is forwarded.
    fn render_placeholder(&self, invocation: &Invocation) -> String {
        let mut args: Vec<&str> = Vec::new();
        if let Some(target) = &invocation.target {
            args.push(target);
        }
        for keyword in allowed_keywords(&invocation.keyword_args, self.config) {
            args.push(&keyword.raw);
        }
        format!("{}({})", self.config.placeholder_helper, args.join(", "))
    }

    /// Composes the lookup directive for an element.
    ///
    /// Returns `None` when no piece is a translatable link: already
    /// translated links are left to the caller and never reach this point
    /// as pieces.
    pub fn compose(&self, pieces: &[Piece<'_>]) -> Option<Composition> {
        let mut used_names: HashMap<String, usize> = HashMap::new();
        let mut arguments = Vec::new();
        let mut sentence = String::new();
        let mut default_text = String::new();

        for piece in pieces {
            match piece {
                Piece::Text(text) => {
                    sentence.push_str(text);
                    default_text.push_str(text);
                }
                Piece::Link(invocation) => {
                    let (wording, value, live) = match &invocation.label {
                        Label::Literal(text) => {
                            (text.as_str(), self.render_placeholder(invocation), false)
                        }
                        Label::Expression(expression) => (
                            expression.as_str(),
                            invocation.verbatim(&self.config.link_helper),
                            true,
                        ),
                        Label::AlreadyTranslated(_) => continue,
                    };

                    let mut name = placeholder_name(wording);
                    let seen = used_names.entry(name.clone()).or_insert(0);
                    *seen += 1;
                    if *seen > 1 {
                        name = format!("{}_{}", name, seen);
                    }

                    if live {
                        sentence.push_str(&name);
                        default_text.push_str(&format!("%{{{}}}", name));
                    } else {
                        sentence.push_str(wording);
                        default_text.push_str(&format!("%{{{}:{}}}", name, wording));
                    }
                    arguments.push(NamedArgument { name, value, live });
                }
            }
        }

        let any_live = arguments.iter().any(|a| a.live);
        let any_placeholder = arguments.iter().any(|a| !a.live);
        let shape = match (any_placeholder, any_live) {
            (false, false) => return None,
            (true, false) => DirectiveShape::Interpolated,
            (false, true) => DirectiveShape::Raw,
            (true, true) => DirectiveShape::RawInterpolated,
        };

        let mut slug = generate_key(&sentence, self.config.key_max_len);
        if slug.is_empty() {
            // Nothing to slug in the sentence; placeholder names never are empty.
            let names: Vec<&str> = arguments.iter().map(|a| a.name.as_str()).collect();
            slug = generate_key(&names.join(" "), self.config.key_max_len);
        }
        let key = format!(".{}", slug);
        let directive = self.render(&key, shape, &arguments);

        Some(Composition {
            key,
            directive,
            default_text: default_text.split_whitespace().collect::<Vec<_>>().join(" "),
            shape,
            arguments,
        })
    }

    fn render(&self, key: &str, shape: DirectiveShape, arguments: &[NamedArgument]) -> String {
        let mut directive = String::new();
        if shape.is_raw() {
            directive.push_str(&self.config.raw_tag);
            directive.push(' ');
        }
        if shape.is_interpolated() {
            directive.push_str(&self.config.interpolated_indicator);
        }
        directive.push_str(&format!("{}(\"{}\"", self.config.lookup_helper, key));
        for argument in arguments {
            directive.push_str(&format!(", {}: {}", argument.name, argument.value));
        }
        directive.push(')');
        directive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::invocation::parse_invocation;
    use pretty_assertions::assert_eq;

    fn invocation(code: &str) -> Invocation {
        parse_invocation(code, &ExtractorConfig::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_single_literal_link() {
        let config = ExtractorConfig::default();
        let link = invocation(r#"link_to "Hello", some_url"#);
        let composition = Composer::new(&config)
            .compose(&[Piece::Link(&link)])
            .unwrap();
        assert_eq!(composition.key, ".hello");
        assert_eq!(
            composition.directive,
            r#"!i!t(".hello", hello: It.link(some_url))"#
        );
        assert_eq!(composition.shape, DirectiveShape::Interpolated);
        assert_eq!(composition.default_text, "%{hello:Hello}");
    }

    #[test]
    fn test_title_is_dropped_and_class_forwarded() {
        let config = ExtractorConfig::default();
        let link = invocation(r#"link_to "Hello", some_url, title: "Some title", class: "c""#);
        let composition = Composer::new(&config)
            .compose(&[Piece::Link(&link)])
            .unwrap();
        assert_eq!(
            composition.directive,
            r#"!i!t(".hello", hello: It.link(some_url, class: "c"))"#
        );
    }

    #[test]
    fn test_expression_link_keeps_every_argument() {
        let config = ExtractorConfig::default();
        let link = invocation(r#"link_to current_user.name, some_url, title: "T""#);
        let composition = Composer::new(&config)
            .compose(&[Piece::Text("Hey "), Piece::Link(&link)])
            .unwrap();
        assert_eq!(composition.shape, DirectiveShape::Raw);
        assert_eq!(
            composition.directive,
            r#"raw t(".hey_current_user_name", current_user_name: link_to(current_user.name, some_url, title: "T"))"#
        );
        assert_eq!(composition.default_text, "Hey %{current_user_name}");
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let config = ExtractorConfig::default();
        let first = invocation(r#"link_to "here", a_url"#);
        let second = invocation(r#"link_to "here", b_url"#);
        let composition = Composer::new(&config)
            .compose(&[
                Piece::Text("Click "),
                Piece::Link(&first),
                Piece::Text(" or "),
                Piece::Link(&second),
            ])
            .unwrap();
        let names: Vec<_> = composition.arguments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["here", "here_2"]);
        assert_eq!(composition.default_text, "Click %{here:here} or %{here_2:here}");
    }

    #[test]
    fn test_sentence_without_words_keys_on_placeholder_names() {
        let config = ExtractorConfig::default();
        let dots = invocation(r#"link_to "...", x"#);
        let empty = invocation(r#"link_to "", y"#);
        let composer = Composer::new(&config);

        let composition = composer.compose(&[Piece::Link(&dots)]).unwrap();
        assert_eq!(composition.key, ".link");
        assert_eq!(composition.directive, r#"!i!t(".link", link: It.link(x))"#);

        let composition = composer
            .compose(&[
                Piece::Text("-- "),
                Piece::Link(&dots),
                Piece::Text(" / "),
                Piece::Link(&empty),
            ])
            .unwrap();
        assert_eq!(composition.key, ".link_link_2");
    }

    #[test]
    fn test_no_links_no_composition() {
        let config = ExtractorConfig::default();
        let translated = invocation("link_to t('.x'), url");
        let composer = Composer::new(&config);
        assert_eq!(composer.compose(&[Piece::Text("Some Text")]), None);
        assert_eq!(composer.compose(&[Piece::Link(&translated)]), None);
    }

    #[test]
    fn test_custom_config() {
        let mut config = ExtractorConfig::default();
        config
            .with_placeholder_helper("Link.to")
            .with_allowed_keyword("title")
            .with_key_max_len(5);
        let link = invocation(r#"link_to "Hello there", url, title: "T""#);
        let composition = Composer::new(&config)
            .compose(&[Piece::Link(&link)])
            .unwrap();
        assert_eq!(
            composition.directive,
            r#"!i!t(".hello", hello_there: Link.to(url, title: "T"))"#
        );
    }
}
