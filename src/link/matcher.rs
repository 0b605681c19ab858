use tracing::{debug, warn};

use super::composer::{Composer, Composition, Piece};
use super::invocation::{Invocation, parse_invocation};
use super::scanner::{ScannedSegment, scan};
use crate::config::ExtractorConfig;
use crate::document::{DirectiveKind, Document, ElementId, Marker, Segment};

/// The rewrite of one element: every translatable link inside it merged
/// into one lookup directive.
///
/// Creating a match has no effect on the document; [`LinkMatch::apply`]
/// commits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    element: ElementId,
    /// Slot of the first merged invocation, rewritten in place
    primary: Marker,
    /// Slots of the other merged invocations, removed on commit
    merged: Vec<Marker>,
    invocations: Vec<Invocation>,
    composition: Composition,
}

impl LinkMatch {
    /// Analyses an element and builds its match.
    ///
    /// Returns `None` when the element holds no link invocation that can be
    /// rewritten, or when it also outputs some other expression: the
    /// expression's place in the sentence could not be kept. Invocations that
    /// fail to parse and invocations whose label is already translated are
    /// left where they are, after the rewritten directive's text.
    pub fn create(
        document: &Document,
        element: ElementId,
        config: &ExtractorConfig,
    ) -> Option<LinkMatch> {
        let segments = scan(document, element);

        let mut links: Vec<(usize, Marker, Invocation)> = Vec::new();
        let mut other_output = None;
        for (index, segment) in segments.iter().enumerate() {
            let ScannedSegment::Code {
                marker,
                kind: DirectiveKind::Output,
                source,
            } = segment
            else {
                continue;
            };
            match parse_invocation(source, config) {
                Ok(Some(invocation)) if invocation.label.is_already_translated() => {
                    debug!(%marker, source, "link label is already translated");
                }
                Ok(Some(invocation)) => links.push((index, *marker, invocation)),
                Ok(None) => other_output = other_output.or(Some(*marker)),
                Err(e) => warn!(%marker, source, "skipping link invocation: {}", e),
            }
        }

        let Some((_, primary, _)) = links.first() else {
            debug!(element = element.index(), "no link invocations");
            return None;
        };
        let primary = *primary;
        if let Some(marker) = other_output {
            debug!(
                element = element.index(),
                %marker,
                "element outputs an expression besides its links"
            );
            return None;
        }

        let mut pieces = Vec::new();
        let mut next_link = links.iter().peekable();
        for (index, segment) in segments.iter().enumerate() {
            match segment {
                ScannedSegment::Text(text) => pieces.push(Piece::Text(text)),
                ScannedSegment::Code { .. } => {
                    if let Some((_, _, invocation)) = next_link.next_if(|(i, _, _)| *i == index) {
                        pieces.push(Piece::Link(invocation));
                    }
                }
            }
        }

        let composition = Composer::new(config).compose(&pieces)?;
        debug!(
            element = element.index(),
            links = links.len(),
            key = composition.key.as_str(),
            "link match"
        );

        let merged = links.iter().skip(1).map(|(_, marker, _)| *marker).collect();
        Some(LinkMatch {
            element,
            primary,
            merged,
            invocations: links.into_iter().map(|(_, _, invocation)| invocation).collect(),
            composition,
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The lookup key, with its leading period.
    pub fn key(&self) -> &str {
        &self.composition.key
    }

    pub fn directive(&self) -> &str {
        &self.composition.directive
    }

    pub fn default_text(&self) -> &str {
        &self.composition.default_text
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Writes the directive into the registry slot of the first merged
    /// invocation and drops the slots and text the directive replaces.
    ///
    /// Unrelated directives inside the element keep their registry entries
    /// and their relative order. Applying the same match again leaves the
    /// document unchanged.
    pub fn apply(&self, document: &mut Document) {
        let registry = document.directives_mut();
        if !registry.upsert(self.primary, &self.composition.directive) {
            warn!(marker = %self.primary, "directive slot no longer exists");
            return;
        }
        for marker in &self.merged {
            registry.remove(*marker);
        }

        if let Some(element) = document.element_mut(self.element) {
            element.segments.retain(|segment| match segment {
                Segment::Text(_) => false,
                Segment::Directive(marker) => !self.merged.contains(marker),
            });
        }
    }
}
