/// Link-aware extraction
///
/// This module rewrites the text of an element that contains calls to the
/// link helper into one translation lookup, keeping the links as named
/// interpolation arguments.
///
/// # Overview
///
/// 1. **Scanner** - Lists an element's text runs and ERB directives in order
/// 2. **Invocation parser** - Splits a `link_to` call into label, target and keyword arguments
/// 3. **Label classifier** - Literal, already translated, or run-time expression
/// 4. **Key generator** - Slugs the element's sentence into a lookup key
/// 5. **Composer** - Builds the lookup directive and its default locale text
/// 6. **LinkMatch** - Ties it together per element and commits the rewrite
///
/// # Example
///
/// ```ignore
/// use erb_link_i18n::{ExtractorConfig, LinkMatch, Parser};
///
/// let mut document = Parser::new(r#"<p>Say <%= link_to "Hello", some_url %>!</p>"#).parse()?;
/// let id = document.find_element("p").unwrap();
/// let config = ExtractorConfig::default();
/// if let Some(link_match) = LinkMatch::create(&document, id, &config) {
///     link_match.apply(&mut document);
/// }
/// // <p><%= it(".say_hello", hello: It.link(some_url)) %></p>
/// println!("{}", document.render(&config.render_options()));
/// ```
pub mod composer;
pub mod invocation;
pub mod key;
pub mod label;
pub mod matcher;
pub mod scanner;


pub use composer::{Composer, Composition, DirectiveShape, NamedArgument, Piece};
pub use invocation::{Invocation, parse_invocation, split_arguments};
pub use key::{generate_key, placeholder_name, slugify};
pub use label::{KeywordArg, Label, allowed_keywords};
pub use matcher::LinkMatch;
pub use scanner::{ScannedSegment, scan};
