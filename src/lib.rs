// Rust 1.93+ triggers false positives on thiserror/miette derive macro fields
#![allow(unused_assignments)]

//! Field reference intelligence for GET('field') expressions
//!
//! Recognizes `GET('fieldName')` accessor calls embedded in free text,
//! checks each name against a field registry, and serves the three editor
//! features built on that: inline marking, hover documentation, and name
//! completion inside an open accessor.
//!
//! # Example
//!
//! ```
//! use fieldref::{Classification, Engine};
//!
//! let engine = Engine::sample();
//! let text = "( GET('wdxTotalAssets') > 0 ) && GET('DYNAMIC_clientcategory') != null";
//!
//! let annotations = engine.annotate(text);
//! assert_eq!(annotations.len(), 2);
//! assert_eq!(annotations[0].classification, Classification::Valid);
//! assert_eq!(annotations[1].classification, Classification::KnownUnregistered);
//!
//! assert!(!engine.complete("( GET('").is_empty());
//! ```

pub mod annotator;
pub mod classifier;
pub mod completion;
pub mod config;
pub mod engine;
pub mod errors;
pub mod hover;
#[cfg(feature = "lsp")]
pub mod lsp;
pub mod registry;
pub mod scanner;
pub mod text;

pub use annotator::{annotate, refresh, Annotation, DecorationHost};
pub use classifier::{classify, Classification, HighlightPolicy, VisualClass};
pub use completion::{resolve_completion, CompletionItem};
pub use config::{ConfigFormat, Settings};
pub use engine::Engine;
pub use errors::{ErrorCode, FieldRefError, FieldRefResult};
pub use hover::{resolve_hover, HoverContents, HoverInfo};
pub use registry::{FieldDescriptor, FieldRegistry, RegistryConfig, TypeTag};
pub use scanner::{accessor_state, scan, AccessorState, Reference};
pub use text::{LineIndex, Span, Utf16Cursor};
