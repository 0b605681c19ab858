use crate::document::{DirectiveKind, Document, ElementId, Marker, Segment};

/// A child of an element with its directive text resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedSegment<'d> {
    Text(&'d str),
    Code {
        marker: Marker,
        kind: DirectiveKind,
        source: &'d str,
    },
}

/// Yields the segments of an element in document order.
///
/// Directive segments whose registry entry has been merged away are skipped.
/// An unknown element yields nothing.
pub fn scan(document: &Document, id: ElementId) -> Vec<ScannedSegment<'_>> {
    let Some(element) = document.element(id) else {
        return Vec::new();
    };
    element
        .segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Text(text) => Some(ScannedSegment::Text(text.as_str())),
            Segment::Directive(marker) => {
                document
                    .directives()
                    .directive(*marker)
                    .map(|directive| ScannedSegment::Code {
                        marker: *marker,
                        kind: directive.kind,
                        source: directive.text.as_str(),
                    })
            }
        })
        .collect()
}
