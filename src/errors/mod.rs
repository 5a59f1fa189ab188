//! Error types, diagnostics, and result aliases.
//!
//! Load-time problems with the field registry and per-reference findings both
//! surface as variants of [`FieldRefError`], rendered via `miette` diagnostics.

use std::path::Path;
use std::sync::Arc;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::text::Span;

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Find the best "did you mean?" suggestion from a list of candidates
pub fn find_similar<'a, I>(name: &str, candidates: I, max_distance: usize) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let name_lower = name.to_lowercase();
    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for candidate in candidates {
        let distance = levenshtein_distance(&name_lower, &candidate.to_lowercase());
        if distance <= max_distance && distance < best_distance {
            best_distance = distance;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Help text for a name that is not in the registry
pub fn unknown_field_help<'a, I>(name: &str, available: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let available: Vec<&str> = available.into_iter().collect();
    // Field names are long camelCase identifiers, so allow a few more typos
    let max_distance = (name.chars().count() / 3).clamp(2, 4);

    if let Some(suggestion) = find_similar(name, available.iter().copied(), max_distance) {
        format!("did you mean '{}'?", suggestion)
    } else if available.is_empty() {
        "the field registry is empty".to_string()
    } else if available.len() <= 5 {
        format!("known fields: {}", available.join(", "))
    } else {
        "check the field name for typos".to_string()
    }
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Reference findings (F0xxx)
    F0001, // Unknown field
    F0002, // Known field outside the valid subset

    // Registry errors (R0xxx)
    R0001, // Duplicate field name
    R0002, // Valid name without descriptor
    R0003, // Empty field name
    R0004, // Invalid type tag

    // Configuration errors (C0xxx)
    C0001, // Config parse failure
    C0002, // Unsupported config format
    C0003, // I/O error
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ErrorCode::F0001 => "F0001",
            ErrorCode::F0002 => "F0002",
            ErrorCode::R0001 => "R0001",
            ErrorCode::R0002 => "R0002",
            ErrorCode::R0003 => "R0003",
            ErrorCode::R0004 => "R0004",
            ErrorCode::C0001 => "C0001",
            ErrorCode::C0002 => "C0002",
            ErrorCode::C0003 => "C0003",
        };
        f.write_str(code)
    }
}

/// Main error type
#[derive(Error, Debug, Diagnostic)]
pub enum FieldRefError {
    #[error("unknown field")]
    #[diagnostic(code(F0001), severity(Error), help("{help}"))]
    UnknownField {
        #[source_code]
        src: Arc<str>,
        #[label("'{name}' is not in the field registry")]
        span: SourceSpan,
        name: String,
        help: String,
    },

    #[error("field is not enabled")]
    #[diagnostic(
        code(F0002),
        severity(Warning),
        help("add '{name}' to the valid field list to enable it")
    )]
    FieldNotEnabled {
        #[source_code]
        src: Arc<str>,
        #[label("'{name}' is known but not in the valid subset")]
        span: SourceSpan,
        name: String,
    },

    #[error("duplicate field '{name}'")]
    #[diagnostic(code(R0001), help("each field name may be declared only once"))]
    DuplicateField { name: String },

    #[error("valid field list names fields with no descriptor")]
    #[diagnostic(code(R0002), help("{help}"))]
    ValidFieldWithoutDescriptor { names: Vec<String>, help: String },

    #[error("field name must not be empty")]
    #[diagnostic(code(R0003), help("entry #{index} in the field list has an empty name"))]
    EmptyFieldName { index: usize },

    #[error("invalid type tag for field '{name}'")]
    #[diagnostic(code(R0004), help("use a numeric type code or a non-empty type name"))]
    InvalidTypeTag { name: String },

    #[error("failed to parse configuration {path}")]
    #[diagnostic(code(C0001), help("{message}"))]
    ConfigParse {
        #[source_code]
        src: String,
        #[label("here")]
        span: Option<SourceSpan>,
        path: String,
        message: String,
    },

    #[error("unsupported configuration format: {path}")]
    #[diagnostic(code(C0002), help("use a .json, .yaml or .yml file"))]
    UnsupportedConfigFormat { path: String },

    #[error("I/O error: {message}")]
    #[diagnostic(code(C0003))]
    IoError { message: String },
}

impl FieldRefError {
    pub fn io_error(message: impl Into<String>) -> Self {
        FieldRefError::IoError {
            message: message.into(),
        }
    }

    pub fn read_failed(path: &Path, err: std::io::Error) -> Self {
        FieldRefError::io_error(format!("failed to read {}: {}", path.display(), err))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            FieldRefError::UnknownField { .. } => ErrorCode::F0001,
            FieldRefError::FieldNotEnabled { .. } => ErrorCode::F0002,
            FieldRefError::DuplicateField { .. } => ErrorCode::R0001,
            FieldRefError::ValidFieldWithoutDescriptor { .. } => ErrorCode::R0002,
            FieldRefError::EmptyFieldName { .. } => ErrorCode::R0003,
            FieldRefError::InvalidTypeTag { .. } => ErrorCode::R0004,
            FieldRefError::ConfigParse { .. } => ErrorCode::C0001,
            FieldRefError::UnsupportedConfigFormat { .. } => ErrorCode::C0002,
            FieldRefError::IoError { .. } => ErrorCode::C0003,
        }
    }

    /// Reference findings are advisory; everything else stops a load
    pub fn is_warning(&self) -> bool {
        matches!(self, FieldRefError::FieldNotEnabled { .. })
    }

    /// Get the span (start, end) for this error, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            FieldRefError::UnknownField { span, .. } => Some(Span::from(*span)),
            FieldRefError::FieldNotEnabled { span, .. } => Some(Span::from(*span)),
            FieldRefError::ConfigParse { span, .. } => span.map(Span::from),
            FieldRefError::DuplicateField { .. }
            | FieldRefError::ValidFieldWithoutDescriptor { .. }
            | FieldRefError::EmptyFieldName { .. }
            | FieldRefError::InvalidTypeTag { .. }
            | FieldRefError::UnsupportedConfigFormat { .. }
            | FieldRefError::IoError { .. } => None,
        }
    }

    /// Get a simple error message (without source context)
    pub fn message(&self) -> String {
        match self {
            FieldRefError::UnknownField { name, help, .. } => {
                format!("unknown field '{}': {}", name, help)
            }
            FieldRefError::FieldNotEnabled { name, .. } => {
                format!("field '{}' is known but not enabled", name)
            }
            FieldRefError::DuplicateField { name } => format!("duplicate field '{}'", name),
            FieldRefError::ValidFieldWithoutDescriptor { names, .. } => format!(
                "valid field{} without descriptor: {}",
                if names.len() == 1 { "" } else { "s" },
                names.join(", ")
            ),
            FieldRefError::EmptyFieldName { index } => {
                format!("field #{} has an empty name", index)
            }
            FieldRefError::InvalidTypeTag { name } => {
                format!("invalid type tag for field '{}'", name)
            }
            FieldRefError::ConfigParse { path, message, .. } => {
                format!("failed to parse {}: {}", path, message)
            }
            FieldRefError::UnsupportedConfigFormat { path } => {
                format!("unsupported configuration format: {}", path)
            }
            FieldRefError::IoError { message } => format!("I/O error: {}", message),
        }
    }
}

/// Result type for field reference operations
pub type FieldRefResult<T> = Result<T, FieldRefError>;
