//! Inline marking of field references.
//!
//! [`annotate`] recomputes the full annotation set for a buffer. Hosts receive
//! the whole set every time through [`DecorationHost`] and own any diffing
//! against what they rendered before.

use serde::Serialize;

use crate::classifier::{classify, Classification, HighlightPolicy, VisualClass};
use crate::registry::FieldRegistry;
use crate::scanner::scan;
use crate::text::Span;

/// A renderable, classified reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub range: Span,
    pub name: String,
    pub classification: Classification,
    pub visual_class: VisualClass,
}

/// Rendering collaborator that replaces its decorations wholesale.
///
/// The host hands back the handle it returned last time and gets to return a
/// new one; the core never holds on to either.
pub trait DecorationHost {
    type Handle;

    fn replace_decorations(&mut self, previous: Self::Handle, annotations: Vec<Annotation>)
        -> Self::Handle;
}

/// Scan `text` and classify every reference, in buffer order
pub fn annotate(registry: &FieldRegistry, policy: HighlightPolicy, text: &str) -> Vec<Annotation> {
    scan(text)
        .into_iter()
        .map(|reference| {
            let classification = classify(registry, &reference.name);
            Annotation {
                range: reference.span(),
                name: reference.name,
                classification,
                visual_class: policy.visual_class(classification),
            }
        })
        .collect()
}

/// Annotate `text` and deliver the result to `host` as a full replacement
pub fn refresh<H: DecorationHost>(
    host: &mut H,
    previous: H::Handle,
    registry: &FieldRegistry,
    policy: HighlightPolicy,
    text: &str,
) -> H::Handle {
    let annotations = annotate(registry, policy, text);
    tracing::trace!(count = annotations.len(), "replacing decorations");
    host.replace_decorations(previous, annotations)
}
