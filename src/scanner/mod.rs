//! Recognition of `GET('name')` accessor calls in free text.
//!
//! The scanner only extracts accessor leaves; the boolean expression around
//! them is never parsed. Anything that is not a complete accessor is simply
//! not a reference, so there is no error mode.

use std::sync::OnceLock;

use regex::Regex;

use crate::text::Span;

/// Text that opens an accessor call
pub const ACCESSOR_OPEN: &str = "GET('";
/// Text that closes an accessor call
pub const ACCESSOR_CLOSE: &str = "')";

/// Complete accessor: `GET('` + non-quote characters + `')`
fn closed_accessor() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"GET\('([^']*)'\)").expect("accessor pattern compiles"))
}

/// Accessor still open at the very end of the input
fn open_accessor() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"GET\('([^']*)\z").expect("accessor pattern compiles"))
}

/// A located `GET('name')` occurrence.
///
/// `start`/`end` delimit the name only (the text between the quotes), as
/// byte offsets into the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

impl Reference {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

/// Find every complete accessor in `text`, left to right.
///
/// Matches never overlap. `GET('')` yields a zero-length reference.
pub fn scan(text: &str) -> Vec<Reference> {
    closed_accessor()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|name| Reference {
            name: name.as_str().to_string(),
            start: name.start(),
            end: name.end(),
        })
        .collect()
}

/// Where the end of some text sits relative to accessor syntax
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorState<'a> {
    /// Not inside an accessor
    Outside,
    /// After `GET('` with no closing `')` yet
    Open {
        /// Byte offset of the first name character
        name_start: usize,
        /// Name characters typed so far
        partial: &'a str,
    },
    /// Directly after a complete accessor
    Closed(Reference),
}

/// Classify the end of `prefix` (typically a line up to the cursor)
pub fn accessor_state(prefix: &str) -> AccessorState<'_> {
    if let Some(name) = open_accessor().captures(prefix).and_then(|caps| caps.get(1)) {
        return AccessorState::Open {
            name_start: name.start(),
            partial: name.as_str(),
        };
    }

    match scan(prefix).pop() {
        Some(reference) if reference.end + ACCESSOR_CLOSE.len() == prefix.len() => {
            AccessorState::Closed(reference)
        }
        _ => AccessorState::Outside,
    }
}
