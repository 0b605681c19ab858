use indexmap::IndexMap;

/// Opaque handle to one entry of a [`DirectiveRegistry`].
///
/// Markers are handed out once per parsed ERB tag and never reused, so a
/// marker keeps pointing at the same region of the template for the lifetime
/// of the document even after its text has been rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Marker(usize);

impl Marker {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "erb-directive-{}", self.0)
    }
}

/// The flavour of ERB tag a directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// `<%= code %>`
    Output,
    /// `<% code %>`
    Statement,
    /// `<%# text %>` or `<% #text %>`
    Comment,
}

/// One embedded, non-literal span of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub text: String,
    /// `<%-` was used to open the tag
    pub trim_left: bool,
    /// `-%>` was used to close the tag
    pub trim_right: bool,
    /// The tag exactly as it appeared in the template. Dropped once the
    /// text is rewritten.
    pub source: Option<String>,
}

impl Directive {
    pub fn new(kind: DirectiveKind, text: &str) -> Self {
        Directive {
            kind,
            text: text.to_string(),
            trim_left: false,
            trim_right: false,
            source: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    /// `true` once the text no longer matches the tag in the template.
    pub fn is_rewritten(&self) -> bool {
        self.source.is_none()
    }
}

/// How rewritten directives are written back into a template.
///
/// A rewritten output directive of the form `[raw ]!i!t(...)` is written
/// with the `it` helper in place of the indicator and lookup helper, so
/// `raw !i!t(".a", ...)` becomes `raw it(".a", ...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions<'a> {
    pub interpolated_indicator: &'a str,
    pub lookup_helper: &'a str,
    pub interpolation_helper: &'a str,
    pub raw_tag: &'a str,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        RenderOptions {
            interpolated_indicator: "!i!",
            lookup_helper: "t",
            interpolation_helper: "it",
            raw_tag: "raw",
        }
    }
}

impl RenderOptions<'_> {
    fn rewrite_indicator(&self, text: &str) -> String {
        if self.interpolated_indicator.is_empty() {
            return text.to_string();
        }
        let raw_prefix = format!("{} ", self.raw_tag);
        let (prefix, rest) = match text.strip_prefix(raw_prefix.as_str()) {
            Some(rest) => (raw_prefix.as_str(), rest),
            None => ("", text),
        };
        let call = format!("{}{}(", self.interpolated_indicator, self.lookup_helper);
        match rest.strip_prefix(call.as_str()) {
            Some(args) => format!("{}{}({}", prefix, self.interpolation_helper, args),
            None => text.to_string(),
        }
    }
}

/// Insertion-ordered mapping from marker to the directive's current text.
///
/// Entries keep the position of their first registration; `upsert` rewrites
/// a slot in place and `remove` keeps the order of the remaining entries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DirectiveRegistry {
    entries: IndexMap<Marker, Directive>,
    next: usize,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        DirectiveRegistry::default()
    }

    /// Registers a freshly discovered directive and returns its marker.
    pub fn register(&mut self, directive: Directive) -> Marker {
        let marker = Marker(self.next);
        self.next += 1;
        self.entries.insert(marker, directive);
        marker
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, marker: Marker) -> Option<&str> {
        self.entries.get(&marker).map(|d| d.text.as_str())
    }

    pub fn directive(&self, marker: Marker) -> Option<&Directive> {
        self.entries.get(&marker)
    }

    /// Replaces the text stored at `marker` without moving the entry.
    ///
    /// Returns `false` when the marker is unknown; the registry never
    /// allocates a slot for it.
    pub fn upsert(&mut self, marker: Marker, text: &str) -> bool {
        match self.entries.get_mut(&marker) {
            Some(directive) => {
                if directive.text != text {
                    directive.text = text.to_string();
                    directive.source = None;
                }
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, marker: Marker) -> Option<Directive> {
        self.entries.shift_remove(&marker)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|d| d.text.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Marker, &Directive)> {
        self.entries.iter().map(|(marker, d)| (*marker, d))
    }
}

/// A child of an [`Element`]: either literal text or a reference into the
/// directive registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Directive(Marker),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A tag-scoped leaf container (`<p>`, `<li>`, ...) whose children are only
/// text and ERB tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub open_tag: String,
    pub close_tag: String,
    pub segments: Vec<Segment>,
}

impl Element {
    pub fn new(name: &str, open_tag: &str, close_tag: &str) -> Self {
        Element {
            name: name.to_string(),
            open_tag: open_tag.to_string(),
            close_tag: close_tag.to_string(),
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Markup the reader does not model, kept verbatim.
    Markup(String),
    /// A directive outside of any element.
    Directive(Marker),
    Element(ElementId),
}

/// A parsed template: the top-level node sequence, its elements and the
/// registry of every ERB directive found in it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    directives: DirectiveRegistry,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn push_markup(&mut self, markup: &str) {
        if markup.is_empty() {
            return;
        }
        if let Some(Node::Markup(last)) = self.nodes.last_mut() {
            last.push_str(markup);
        } else {
            self.nodes.push(Node::Markup(markup.to_string()));
        }
    }

    pub fn push_directive(&mut self, directive: Directive) -> Marker {
        let marker = self.directives.register(directive);
        self.nodes.push(Node::Directive(marker));
        marker
    }

    pub fn push_element(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(element);
        self.nodes.push(Node::Element(id));
        id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    pub fn element_ids(&self) -> Vec<ElementId> {
        (0..self.elements.len()).map(ElementId).collect()
    }

    /// First element with the given tag name, in document order.
    pub fn find_element(&self, name: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .position(|element| element.name.eq_ignore_ascii_case(name))
            .map(ElementId)
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    pub fn directives_mut(&mut self) -> &mut DirectiveRegistry {
        &mut self.directives
    }

    /// Writes the template back out with the current directive texts.
    ///
    /// Directives that were never rewritten are written exactly as they
    /// appeared in the source.
    pub fn render(&self, options: &RenderOptions<'_>) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Markup(markup) => out.push_str(markup),
                Node::Directive(marker) => self.render_directive(*marker, options, &mut out),
                Node::Element(id) => {
                    let element = &self.elements[id.0];
                    out.push_str(&element.open_tag);
                    for segment in &element.segments {
                        match segment {
                            Segment::Text(text) => out.push_str(text),
                            Segment::Directive(marker) => {
                                self.render_directive(*marker, options, &mut out)
                            }
                        }
                    }
                    out.push_str(&element.close_tag);
                }
            }
        }
        out
    }

    fn render_directive(&self, marker: Marker, options: &RenderOptions<'_>, out: &mut String) {
        // Segments whose slot was merged into another directive render nothing.
        let Some(directive) = self.directives.directive(marker) else {
            return;
        };
        if let Some(source) = &directive.source {
            out.push_str(source);
            return;
        }
        out.push_str(if directive.trim_left { "<%-" } else { "<%" });
        match directive.kind {
            DirectiveKind::Output => {
                out.push_str("= ");
                out.push_str(&options.rewrite_indicator(&directive.text));
            }
            DirectiveKind::Statement => {
                out.push(' ');
                out.push_str(&directive.text);
            }
            DirectiveKind::Comment => {
                out.push_str("# ");
                out.push_str(&directive.text);
            }
        }
        out.push_str(if directive.trim_right { " -%>" } else { " %>" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_registry_keeps_first_discovery_order() {
        let mut registry = DirectiveRegistry::new();
        let a = registry.register(Directive::new(DirectiveKind::Output, "a"));
        let b = registry.register(Directive::new(DirectiveKind::Comment, "b"));
        let c = registry.register(Directive::new(DirectiveKind::Output, "c"));

        assert!(registry.upsert(a, "rewritten"));
        registry.remove(b);

        assert_eq!(registry.values().collect::<Vec<_>>(), vec!["rewritten", "c"]);
        assert_eq!(registry.get(c), Some("c"));
        assert_eq!(registry.get(b), None);
    }

    #[test]
    fn test_upsert_never_allocates() {
        let mut registry = DirectiveRegistry::new();
        let a = registry.register(Directive::new(DirectiveKind::Output, "a"));
        registry.remove(a);
        assert!(!registry.upsert(a, "again"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_markers_are_not_reused() {
        let mut registry = DirectiveRegistry::new();
        let a = registry.register(Directive::new(DirectiveKind::Output, "a"));
        registry.remove(a);
        let b = registry.register(Directive::new(DirectiveKind::Output, "b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_render_rewrites_interpolated_indicator() {
        let mut doc = Document::new();
        let mut element = Element::new("p", "<p>", "</p>");
        let marker = doc
            .directives_mut()
            .register(Directive::new(DirectiveKind::Output, "raw !i!t(\".hi\", hi: It.link(url))"));
        element.push(Segment::Directive(marker));
        doc.push_element(element);

        assert_eq!(
            doc.render(&RenderOptions::default()),
            "<p><%= raw it(\".hi\", hi: It.link(url)) %></p>"
        );
    }

    fn output(text: &str, source: &str) -> Directive {
        Directive::new(DirectiveKind::Output, text).with_source(source)
    }

    #[test]
    fn test_render_leaves_unrewritten_directives_alone() {
        let mut doc = Document::new();
        doc.push_directive(output("\"wow!i!\"", "<%=\"wow!i!\"%>"));
        doc.push_directive(output("!i!t(\".x\")", "<%= !i!t(\".x\") %>"));
        assert_eq!(
            doc.render(&RenderOptions::default()),
            "<%=\"wow!i!\"%><%= !i!t(\".x\") %>"
        );
    }

    #[test]
    fn test_render_only_rewrites_indicator_before_lookup_helper() {
        let mut doc = Document::new();
        let inside = doc.push_directive(output("x", "<%= x %>"));
        let prefixed = doc.push_directive(output("x", "<%= x %>"));
        doc.directives_mut().upsert(inside, "foo(\"!i!t(\")");
        doc.directives_mut().upsert(prefixed, "!i!I18n.t(\".go\", go: It.link(a))");

        assert_eq!(
            doc.render(&RenderOptions::default()),
            "<%= foo(\"!i!t(\") %><%= !i!I18n.t(\".go\", go: It.link(a)) %>"
        );

        let options = RenderOptions {
            lookup_helper: "I18n.t",
            ..RenderOptions::default()
        };
        assert_eq!(
            doc.render(&options),
            "<%= foo(\"!i!t(\") %><%= it(\".go\", go: It.link(a)) %>"
        );
    }

    #[test]
    fn test_upsert_drops_source_only_on_change() {
        let mut registry = DirectiveRegistry::new();
        let a = registry.register(output("a", "<%=a%>"));
        assert!(registry.upsert(a, "a"));
        assert!(!registry.directive(a).unwrap().is_rewritten());
        assert!(registry.upsert(a, "b"));
        assert!(registry.directive(a).unwrap().is_rewritten());
    }
}
