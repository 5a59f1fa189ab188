//! Field name completion inside an open `GET('` call.

use serde::Serialize;

use crate::registry::{FieldDescriptor, FieldRegistry};
use crate::scanner::{accessor_state, AccessorState};

/// A completion candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub detail: String,
}

impl From<&FieldDescriptor> for CompletionItem {
    fn from(descriptor: &FieldDescriptor) -> Self {
        Self {
            label: descriptor.name.clone(),
            insert_text: descriptor.name.clone(),
            detail: descriptor.label.clone(),
        }
    }
}

/// Completion candidates for the text preceding the cursor.
///
/// When `prefix` ends inside an unterminated accessor every registry field
/// is offered in declaration order; filtering by what was typed is left to
/// the editor. Otherwise the list is empty.
pub fn resolve_completion(registry: &FieldRegistry, prefix: &str) -> Vec<CompletionItem> {
    match accessor_state(prefix) {
        AccessorState::Open { .. } => registry.descriptors().map(CompletionItem::from).collect(),
        AccessorState::Outside | AccessorState::Closed(_) => Vec::new(),
    }
}
