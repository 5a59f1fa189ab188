//! The entry point hosts talk to.
//!
//! An [`Engine`] owns the read-only registry and the highlight policy chosen
//! at load time. Every operation is a synchronous pure function of its input
//! text, so the engine can be shared freely between requests.

use std::sync::Arc;

use crate::annotator::{self, Annotation, DecorationHost};
use crate::classifier::{classify, Classification, HighlightPolicy, VisualClass};
use crate::completion::{resolve_completion, CompletionItem};
use crate::config::Settings;
use crate::errors::{unknown_field_help, FieldRefError, FieldRefResult};
use crate::hover::{resolve_hover, HoverInfo};
use crate::registry::FieldRegistry;

#[derive(Debug, Clone)]
pub struct Engine {
    registry: FieldRegistry,
    policy: HighlightPolicy,
}

impl Engine {
    pub fn new(registry: FieldRegistry, policy: HighlightPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn sample() -> Self {
        Self::new(FieldRegistry::sample(), HighlightPolicy::default())
    }

    pub fn from_settings(settings: &Settings) -> FieldRefResult<Self> {
        Ok(Self::new(settings.build_registry()?, settings.highlight))
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn policy(&self) -> HighlightPolicy {
        self.policy
    }

    pub fn classify(&self, name: &str) -> Classification {
        classify(&self.registry, name)
    }

    pub fn annotate(&self, text: &str) -> Vec<Annotation> {
        annotator::annotate(&self.registry, self.policy, text)
    }

    /// Recompute annotations for `text` and hand them to `host` in full
    pub fn refresh<H: DecorationHost>(&self, host: &mut H, previous: H::Handle, text: &str) -> H::Handle {
        annotator::refresh(host, previous, &self.registry, self.policy, text)
    }

    /// Hover on a single line at a byte column
    pub fn hover(&self, line: &str, column: usize) -> Option<HoverInfo> {
        resolve_hover(&self.registry, line, column)
    }

    /// Completions for the line text up to the cursor
    pub fn complete(&self, prefix: &str) -> Vec<CompletionItem> {
        resolve_completion(&self.registry, prefix)
    }

    /// Findings for every reference that does not render as valid
    pub fn diagnose(&self, text: &str) -> Vec<FieldRefError> {
        let annotations = self.annotate(text);
        self.findings(Arc::from(text), &annotations)
    }

    /// Findings for annotations already computed over `source`.
    ///
    /// Every finding shares `source`; the buffer is not copied per finding.
    pub fn findings(&self, source: Arc<str>, annotations: &[Annotation]) -> Vec<FieldRefError> {
        annotations
            .iter()
            .filter(|annotation| annotation.visual_class == VisualClass::Unknown)
            .map(|annotation| self.finding(&source, annotation))
            .collect()
    }

    fn finding(&self, source: &Arc<str>, annotation: &Annotation) -> FieldRefError {
        let span = annotation.range.into();
        let name = annotation.name.clone();
        match annotation.classification {
            Classification::KnownUnregistered => FieldRefError::FieldNotEnabled {
                src: Arc::clone(source),
                span,
                name,
            },
            Classification::Valid | Classification::Unknown => FieldRefError::UnknownField {
                src: Arc::clone(source),
                span,
                help: unknown_field_help(&name, self.registry.names()),
                name,
            },
        }
    }
}
