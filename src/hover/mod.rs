//! Hover documentation for field references.

use serde::Serialize;

use crate::registry::{FieldRegistry, TypeTag};
use crate::scanner::scan;
use crate::text::Span;

/// What a hover over a reference shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HoverContents {
    Field { type_tag: TypeTag, label: String },
    /// The accessor matched but the registry has no descriptor for the name
    NoData,
}

/// Hover result for a reference under the cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverInfo {
    pub name: String,
    /// Byte range of the name within the queried line
    pub range: Span,
    pub contents: HoverContents,
}

impl HoverInfo {
    /// Markdown lines in display order
    pub fn markdown_lines(&self) -> Vec<String> {
        match &self.contents {
            HoverContents::Field { type_tag, label } => vec![
                format!("**Variable:** {}", self.name),
                format!("**Type:** {}", type_tag),
                format!("**Description:** {}", label),
            ],
            HoverContents::NoData => vec!["no data available".to_string()],
        }
    }
}

/// Resolve a hover on `line` at byte column `column`.
///
/// Only complete references on this line are considered. The name span
/// matches inclusively on both ends. Returns `None` when there is no word
/// under the cursor or the cursor is not on a reference name.
pub fn resolve_hover(registry: &FieldRegistry, line: &str, column: usize) -> Option<HoverInfo> {
    word_at(line, column)?;

    let reference = scan(line)
        .into_iter()
        .find(|reference| reference.span().touches(column))?;

    let contents = match registry.lookup(&reference.name) {
        Some(descriptor) => HoverContents::Field {
            type_tag: descriptor.type_tag.clone(),
            label: descriptor.label.clone(),
        },
        None => HoverContents::NoData,
    };

    Some(HoverInfo {
        range: reference.span(),
        name: reference.name,
        contents,
    })
}

/// Span of the word touching `column` (the character at or just before it).
/// `None` for columns past the line or inside a multi-byte character.
fn word_at(line: &str, column: usize) -> Option<Span> {
    let before = line.get(..column)?;
    let after = line.get(column..)?;

    let back: usize = before
        .chars()
        .rev()
        .take_while(|c| is_word_char(*c))
        .map(char::len_utf8)
        .sum();
    let forward: usize = after
        .chars()
        .take_while(|c| is_word_char(*c))
        .map(char::len_utf8)
        .sum();

    if back == 0 && forward == 0 {
        return None;
    }
    Some(Span::new(column - back, column + forward))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hover_inside_name() {
        let registry = FieldRegistry::sample();
        let hover = resolve_hover(&registry, "GET('wdxTotalAssets')", 10).unwrap();
        assert_eq!(hover.name, "wdxTotalAssets");
        assert_eq!(hover.range, Span::new(5, 19));
        assert_eq!(
            hover.markdown_lines(),
            vec![
                "**Variable:** wdxTotalAssets".to_string(),
                "**Type:** 450".to_string(),
                "**Description:** wdx Total Assets".to_string(),
            ]
        );
    }

    #[test]
    fn test_hover_boundaries_inclusive() {
        let registry = FieldRegistry::sample();
        let line = "GET('wdxTotalAssets')";
        assert!(resolve_hover(&registry, line, 5).is_some());
        // Right after the last name character, on the closing quote
        assert!(resolve_hover(&registry, line, 19).is_some());
        assert!(resolve_hover(&registry, line, 20).is_none());
    }

    #[test]
    fn test_hover_outside_reference() {
        let registry = FieldRegistry::sample();
        let line = "GET('wdxTotalAssets') && total";
        // On "GET"
        assert!(resolve_hover(&registry, line, 1).is_none());
        // On "total", a word that is not a reference
        assert!(resolve_hover(&registry, line, 27).is_none());
        // On the `&&` operator
        assert!(resolve_hover(&registry, line, 22).is_none());
    }

    #[test]
    fn test_hover_unknown_field_reports_no_data() {
        let registry = FieldRegistry::sample();
        let hover = resolve_hover(&registry, "GET('doesNotExist') == 1", 8).unwrap();
        assert_eq!(hover.name, "doesNotExist");
        assert_eq!(hover.contents, HoverContents::NoData);
        assert_eq!(hover.markdown_lines(), vec!["no data available".to_string()]);
    }

    #[test]
    fn test_hover_picks_matching_reference_on_line() {
        let registry = FieldRegistry::sample();
        let line = "GET('wdxNetIncome') > GET('DYNAMIC_servicetypes')";
        let col = line.find("servicetypes").unwrap();
        let hover = resolve_hover(&registry, line, col).unwrap();
        assert_eq!(hover.name, "DYNAMIC_servicetypes");
        assert_eq!(
            hover.contents,
            HoverContents::Field {
                type_tag: TypeTag::Name("string".to_string()),
                label: "Service types".to_string(),
            }
        );
    }

    #[test]
    fn test_hover_tolerates_any_position() {
        let registry = FieldRegistry::sample();
        assert!(resolve_hover(&registry, "", 0).is_none());
        assert!(resolve_hover(&registry, "GET('a')", 500).is_none());
        assert!(resolve_hover(&registry, "GET('')", 5).is_none());
        // Column 6 falls inside the 3-byte '名'
        assert!(resolve_hover(&registry, "GET('名')", 6).is_none());
        let hover = resolve_hover(&registry, "GET('名')", 5).unwrap();
        assert_eq!(hover.contents, HoverContents::NoData);
    }

    #[test]
    fn test_word_at() {
        assert_eq!(word_at("ab cd", 0), Some(Span::new(0, 2)));
        assert_eq!(word_at("ab cd", 2), Some(Span::new(0, 2)));
        assert_eq!(word_at("ab cd", 3), Some(Span::new(3, 5)));
        assert_eq!(word_at("a  b", 2), None);
    }
}
