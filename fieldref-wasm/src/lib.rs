use serde::Serialize;
use wasm_bindgen::prelude::*;

use fieldref::scanner::{accessor_state, AccessorState};
use fieldref::text::{byte_to_utf16_col, utf16_to_byte_col, Utf16Cursor};
use fieldref::{ConfigFormat, Engine, LineIndex, Settings, Span};

#[wasm_bindgen]
pub struct ConfigResult {
    summary: String,
    error: String,
    success: bool,
}

#[wasm_bindgen]
impl ConfigResult {
    #[wasm_bindgen(getter)]
    pub fn summary(&self) -> String {
        self.summary.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> String {
        self.error.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn success(&self) -> bool {
        self.success
    }
}

/// Check a settings document without opening a session.
///
/// - `source`: settings text
/// - `format`: "json" or "yaml"
#[wasm_bindgen]
pub fn validate_config(source: &str, format: &str) -> ConfigResult {
    match load(source, format) {
        Ok(engine) => ConfigResult {
            summary: format!(
                "{} fields, {} valid",
                engine.registry().len(),
                engine.registry().valid_names().count()
            ),
            error: String::new(),
            success: true,
        },
        Err(message) => ConfigResult {
            summary: String::new(),
            error: message,
            success: false,
        },
    }
}

fn load(source: &str, format: &str) -> Result<Engine, String> {
    let format = ConfigFormat::from_name(format)
        .ok_or_else(|| format!("unsupported configuration format: {}", format))?;
    let settings = Settings::parse(source, format, "config").map_err(|e| e.message())?;
    Engine::from_settings(&settings).map_err(|e| e.message())
}

/// 1-based range in UTF-16 columns, the shape Monaco expects
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MonacoRange {
    start_line_number: usize,
    start_column: usize,
    end_line_number: usize,
    end_column: usize,
}

impl MonacoRange {
    fn from_span(cursor: &mut Utf16Cursor<'_>, span: Span) -> Self {
        let (start_line, start_col) = cursor.position(span.start);
        let (end_line, end_col) = cursor.position(span.end);
        Self {
            start_line_number: start_line + 1,
            start_column: start_col + 1,
            end_line_number: end_line + 1,
            end_column: end_col + 1,
        }
    }

    fn on_line(line_number: usize, line: &str, span: Span) -> Self {
        Self {
            start_line_number: line_number,
            start_column: byte_to_utf16_col(line, span.start) + 1,
            end_line_number: line_number,
            end_column: byte_to_utf16_col(line, span.end) + 1,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Decoration {
    range: MonacoRange,
    inline_class_name: &'static str,
    name: String,
    classification: fieldref::Classification,
}

#[derive(Serialize)]
struct MarkdownString {
    value: String,
}

#[derive(Serialize)]
struct HoverResult {
    range: MonacoRange,
    contents: Vec<MarkdownString>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Suggestion {
    label: String,
    insert_text: String,
    detail: String,
    range: MonacoRange,
}

/// An editor session over one loaded registry
#[wasm_bindgen]
pub struct Session {
    engine: Engine,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Session {
    /// Session over the built-in sample registry
    #[wasm_bindgen(constructor)]
    pub fn new() -> Session {
        Session {
            engine: Engine::sample(),
        }
    }

    /// Session over a settings document; fails on an invalid registry
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(source: &str, format: &str) -> Result<Session, JsError> {
        load(source, format)
            .map(|engine| Session { engine })
            .map_err(|message| JsError::new(&message))
    }

    /// Full decoration set for `text` as a JSON array
    pub fn annotate(&self, text: &str) -> String {
        let mut cursor = Utf16Cursor::new(text);
        let decorations: Vec<Decoration> = self
            .engine
            .annotate(text)
            .into_iter()
            .map(|annotation| Decoration {
                range: MonacoRange::from_span(&mut cursor, annotation.range),
                inline_class_name: annotation.visual_class.css_class(),
                name: annotation.name,
                classification: annotation.classification,
            })
            .collect();
        to_json(&decorations)
    }

    /// Hover at a 1-based Monaco position; JSON object or `null`
    pub fn hover(&self, text: &str, line_number: usize, column: usize) -> String {
        let Some((line, col)) = locate(text, line_number, column) else {
            return "null".to_string();
        };
        match self.engine.hover(line, col) {
            Some(info) => to_json(&HoverResult {
                range: MonacoRange::on_line(line_number, line, info.range),
                contents: info
                    .markdown_lines()
                    .into_iter()
                    .map(|value| MarkdownString { value })
                    .collect(),
            }),
            None => "null".to_string(),
        }
    }

    /// Completion suggestions at a 1-based Monaco position as a JSON array
    pub fn complete(&self, text: &str, line_number: usize, column: usize) -> String {
        let Some((line, col)) = locate(text, line_number, column) else {
            return "[]".to_string();
        };
        let prefix = &line[..col];
        let AccessorState::Open { name_start, .. } = accessor_state(prefix) else {
            return "[]".to_string();
        };

        let suggestions: Vec<Suggestion> = self
            .engine
            .complete(prefix)
            .into_iter()
            .map(|item| Suggestion {
                label: item.label,
                insert_text: item.insert_text,
                detail: item.detail,
                range: MonacoRange::on_line(line_number, line, Span::new(name_start, col)),
            })
            .collect();
        to_json(&suggestions)
    }
}

/// Line text and byte column for a 1-based line number and UTF-16 column
fn locate(text: &str, line_number: usize, column: usize) -> Option<(&str, usize)> {
    let index = LineIndex::new(text);
    let line = index.line_text(text, line_number.checked_sub(1)?)?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let col = utf16_to_byte_col(line, column.checked_sub(1)?)?;
    Some((line, col))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
