//! Language Server Protocol front end.
//!
//! Provides IDE features for GET('field') expressions: diagnostics and
//! semantic highlighting for references, hover documentation, and field
//! completion inside an open accessor.

use std::sync::Arc;

use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::annotator::{Annotation, DecorationHost};
use crate::classifier::VisualClass;
use crate::engine::Engine;
use crate::errors::FieldRefError;
use crate::hover::HoverInfo;
use crate::scanner::{accessor_state, AccessorState};
use crate::text::{byte_to_utf16_col, utf16_to_byte_col, Span, Utf16Cursor};

/// Semantic token type index for references that render as valid
const TOKEN_VALID: u32 = 0;
/// Semantic token type index for references that render as unknown
const TOKEN_UNKNOWN: u32 = 1;

fn semantic_tokens_legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![
            SemanticTokenType::PROPERTY,
            SemanticTokenType::new("unknownField"),
        ],
        token_modifiers: vec![],
    }
}

/// Identifies the decoration set currently held by a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecorationSetId(u64);

/// Document state tracked by the server
#[derive(Debug)]
pub struct Document {
    /// The document content as a rope for efficient line access
    pub content: Rope,
    /// Annotations from the last refresh
    pub annotations: Vec<Annotation>,
    decorations: DecorationSetId,
}

impl Document {
    pub fn new(content: &str) -> Self {
        Self {
            content: Rope::from_str(content),
            annotations: Vec::new(),
            decorations: DecorationSetId::default(),
        }
    }

    pub fn text(&self) -> String {
        self.content.to_string()
    }

    pub fn decorations(&self) -> DecorationSetId {
        self.decorations
    }

    /// Line text without its terminator
    fn line(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.content.len_lines() {
            return None;
        }
        let line = self.content.line(line_idx).to_string();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

impl DecorationHost for Document {
    type Handle = DecorationSetId;

    fn replace_decorations(
        &mut self,
        previous: DecorationSetId,
        annotations: Vec<Annotation>,
    ) -> DecorationSetId {
        if previous != self.decorations {
            tracing::warn!(
                expected = self.decorations.0,
                got = previous.0,
                "stale decoration handle"
            );
        }
        self.annotations = annotations;
        self.decorations = DecorationSetId(self.decorations.0 + 1);
        self.decorations
    }
}

/// The field reference language server
pub struct FieldRefLanguageServer {
    /// LSP client for sending notifications
    client: Client,
    /// Registry and policy, loaded before the server starts
    engine: Arc<Engine>,
    /// Open documents indexed by URI
    documents: DashMap<Url, Document>,
    /// Server capabilities
    capabilities: Arc<ServerCapabilities>,
}

impl FieldRefLanguageServer {
    pub fn new(client: Client, engine: Arc<Engine>) -> Self {
        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::FULL,
            )),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(vec!["'".to_string(), "(".to_string()]),
                resolve_provider: Some(false),
                ..Default::default()
            }),
            semantic_tokens_provider: Some(
                SemanticTokensServerCapabilities::SemanticTokensOptions(SemanticTokensOptions {
                    legend: semantic_tokens_legend(),
                    full: Some(SemanticTokensFullOptions::Bool(true)),
                    range: None,
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
            ),
            ..Default::default()
        };

        Self {
            client,
            engine,
            documents: DashMap::new(),
            capabilities: Arc::new(capabilities),
        }
    }

    /// Store new content, re-annotate, and compute diagnostics
    fn update_document(&self, uri: &Url, content: &str) -> Vec<Diagnostic> {
        let mut doc = self
            .documents
            .entry(uri.clone())
            .or_insert_with(|| Document::new(""));
        doc.content = Rope::from_str(content);
        let previous = doc.decorations();
        self.engine.refresh(&mut *doc, previous, content);
        tracing::debug!(%uri, references = doc.annotations.len(), "document refreshed");
        build_diagnostics(&self.engine, content, &doc.annotations)
    }

    async fn publish(&self, uri: Url, content: &str) {
        let diagnostics = self.update_document(&uri, content);
        self.client
            .publish_diagnostics(uri, diagnostics, None)
            .await;
    }

    /// Get hover information at the given position
    fn get_hover(&self, uri: &Url, position: Position) -> Option<Hover> {
        let doc = self.documents.get(uri)?;
        let line_idx = position.line as usize;
        let line = doc.line(line_idx)?;
        let column = utf16_to_byte_col(&line, position.character as usize)?;

        let info = self.engine.hover(&line, column)?;
        Some(hover_to_lsp(&info, &line, position.line))
    }

    /// Get completions at the given position
    fn get_completions(&self, uri: &Url, position: Position) -> Vec<CompletionItem> {
        let Some(doc) = self.documents.get(uri) else {
            return Vec::new();
        };
        let Some(line) = doc.line(position.line as usize) else {
            return Vec::new();
        };
        let Some(column) = utf16_to_byte_col(&line, position.character as usize) else {
            return Vec::new();
        };
        let prefix = &line[..column];

        let edit_range = match accessor_state(prefix) {
            AccessorState::Open { name_start, .. } => {
                completion_replace_range(&line, position.line, name_start, column)
            }
            _ => return Vec::new(),
        };

        self.engine
            .complete(prefix)
            .into_iter()
            .enumerate()
            .map(|(order, item)| {
                let documentation = self
                    .engine
                    .registry()
                    .lookup(&item.label)
                    .map(|d| Documentation::String(format!("Type: {}", d.type_tag)));
                CompletionItem {
                    label: item.label,
                    kind: Some(CompletionItemKind::FIELD),
                    detail: Some(item.detail),
                    documentation,
                    sort_text: Some(format!("{:05}", order)),
                    text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(
                        edit_range,
                        item.insert_text,
                    ))),
                    ..Default::default()
                }
            })
            .collect()
    }

    fn get_semantic_tokens(&self, uri: &Url) -> Option<Vec<SemanticToken>> {
        let doc = self.documents.get(uri)?;
        let text = doc.text();
        Some(build_semantic_tokens(&text, &doc.annotations))
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for FieldRefLanguageServer {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: (*self.capabilities).clone(),
            server_info: Some(ServerInfo {
                name: "fieldref-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!(fields = self.engine.registry().len(), "server initialized");
        self.client
            .log_message(
                MessageType::INFO,
                format!(
                    "fieldref language server initialized ({} fields)",
                    self.engine.registry().len()
                ),
            )
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("shutdown requested");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let content = params.text_document.text;
        self.publish(uri, &content).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        // Full sync: the last change carries the whole text
        if let Some(change) = params.content_changes.last() {
            self.publish(uri, &change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        Ok(self.get_hover(&uri, position))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let items = self.get_completions(&uri, position);
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        Ok(self
            .get_semantic_tokens(&params.text_document.uri)
            .map(|data| {
                SemanticTokensResult::Tokens(SemanticTokens {
                    result_id: None,
                    data,
                })
            }))
    }
}

fn hover_to_lsp(info: &HoverInfo, line: &str, line_number: u32) -> Hover {
    let contents = info
        .markdown_lines()
        .into_iter()
        .map(MarkedString::String)
        .collect();
    Hover {
        contents: HoverContents::Array(contents),
        range: Some(Range {
            start: Position::new(line_number, byte_to_utf16_col(line, info.range.start) as u32),
            end: Position::new(line_number, byte_to_utf16_col(line, info.range.end) as u32),
        }),
    }
}

/// Replace range for a completion: the part of the name typed so far
fn completion_replace_range(line: &str, line_number: u32, name_start: usize, cursor: usize) -> Range {
    Range {
        start: Position::new(line_number, byte_to_utf16_col(line, name_start) as u32),
        end: Position::new(line_number, byte_to_utf16_col(line, cursor) as u32),
    }
}

fn span_to_range(cursor: &mut Utf16Cursor<'_>, span: Span) -> Range {
    let (start_line, start_char) = cursor.position(span.start);
    let (end_line, end_char) = cursor.position(span.end);
    Range {
        start: Position::new(start_line as u32, start_char as u32),
        end: Position::new(end_line as u32, end_char as u32),
    }
}

/// Diagnostics for the annotations of the last refresh.
///
/// Annotations arrive in source order, so positions are converted in a single
/// walk over `source`.
fn build_diagnostics(engine: &Engine, source: &str, annotations: &[Annotation]) -> Vec<Diagnostic> {
    let mut cursor = Utf16Cursor::new(source);
    engine
        .findings(Arc::from(source), annotations)
        .iter()
        .map(|finding| {
            let range = match finding.span() {
                Some(span) => span_to_range(&mut cursor, span),
                None => Range::default(),
            };
            finding_to_diagnostic(finding, range)
        })
        .collect()
}

/// Convert a reference finding to an LSP Diagnostic
fn finding_to_diagnostic(finding: &FieldRefError, range: Range) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(if finding.is_warning() {
            DiagnosticSeverity::WARNING
        } else {
            DiagnosticSeverity::ERROR
        }),
        code: Some(NumberOrString::String(finding.code().to_string())),
        source: Some("fieldref".to_string()),
        message: finding.message(),
        ..Default::default()
    }
}

/// Delta-encode single-line annotations as semantic tokens
fn build_semantic_tokens(source: &str, annotations: &[Annotation]) -> Vec<SemanticToken> {
    let mut cursor = Utf16Cursor::new(source);
    let mut result = Vec::with_capacity(annotations.len());
    let mut prev_line = 0u32;
    let mut prev_start = 0u32;

    for annotation in annotations {
        if annotation.range.is_empty() {
            continue;
        }
        let range = span_to_range(&mut cursor, annotation.range);
        // Tokens cannot span lines
        if range.end.line != range.start.line {
            continue;
        }

        let (line, col) = (range.start.line, range.start.character);
        let delta_line = line - prev_line;
        let delta_start = if delta_line == 0 { col - prev_start } else { col };

        result.push(SemanticToken {
            delta_line,
            delta_start,
            length: range.end.character - col,
            token_type: match annotation.visual_class {
                VisualClass::Valid => TOKEN_VALID,
                VisualClass::Unknown => TOKEN_UNKNOWN,
            },
            token_modifiers_bitset: 0,
        });

        prev_line = line;
        prev_start = col;
    }

    result
}

/// Serve LSP over stdio with a preloaded engine
pub async fn run_server(engine: Engine) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let engine = Arc::new(engine);

    let (service, socket) =
        tower_lsp::LspService::new(|client| FieldRefLanguageServer::new(client, engine));
    tower_lsp::Server::new(stdin, stdout, socket)
        .serve(service)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::HighlightPolicy;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_is_decoration_host() {
        let engine = Engine::sample();
        let mut doc = Document::new("");
        let initial = doc.decorations();
        let first = engine.refresh(&mut doc, initial, "GET('a') GET('wdxTotalAssets')");
        assert_eq!(doc.annotations.len(), 2);
        let second = engine.refresh(&mut doc, first, "nothing");
        assert_ne!(first, second);
        assert_eq!(second, doc.decorations());
        assert!(doc.annotations.is_empty());
    }

    #[test]
    fn test_document_line_strips_terminators() {
        let doc = Document::new("first\r\nGET('x')\n");
        assert_eq!(doc.line(0).as_deref(), Some("first"));
        assert_eq!(doc.line(1).as_deref(), Some("GET('x')"));
        assert_eq!(doc.line(5), None);
    }

    #[test]
    fn test_semantic_tokens_delta_encoding() {
        let source = "GET('wdxTotalAssets') && GET('nope')\nGET('名') || GET('wdxNetIncome')";
        let engine = Engine::sample();
        let annotations = engine.annotate(source);
        let tokens = build_semantic_tokens(source, &annotations);

        let simplified: Vec<(u32, u32, u32, u32)> = tokens
            .iter()
            .map(|t| (t.delta_line, t.delta_start, t.length, t.token_type))
            .collect();
        assert_eq!(
            simplified,
            vec![
                (0, 5, 14, TOKEN_VALID),
                (0, 25, 4, TOKEN_UNKNOWN),
                (1, 5, 1, TOKEN_UNKNOWN),
                (0, 12, 12, TOKEN_UNKNOWN),
            ]
        );
    }

    #[test]
    fn test_semantic_tokens_any_descriptor_policy() {
        let engine = Engine::new(crate::registry::FieldRegistry::sample(), HighlightPolicy::AnyDescriptor);
        let source = "GET('wdxNetIncome')";
        let tokens = build_semantic_tokens(source, &engine.annotate(source));
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TOKEN_VALID);
    }

    #[test]
    fn test_semantic_tokens_skip_multiline_and_empty() {
        let source = "GET('a\nb') GET('')";
        let engine = Engine::sample();
        let tokens = build_semantic_tokens(source, &engine.annotate(source));
        assert!(tokens.is_empty());
    }

    fn test_server(engine: Engine) -> (tower_lsp::LspService<FieldRefLanguageServer>, tower_lsp::ClientSocket) {
        let engine = Arc::new(engine);
        tower_lsp::LspService::new(|client| FieldRefLanguageServer::new(client, engine))
    }

    #[test]
    fn test_build_diagnostics() {
        let source = "x\n  GET('wdxNetIncome') && GET('bogus')";
        let engine = Engine::sample();
        let diagnostics = build_diagnostics(&engine, source, &engine.annotate(source));

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(
            diagnostics[0].range,
            Range {
                start: Position::new(1, 7),
                end: Position::new(1, 19),
            }
        );
        assert_eq!(diagnostics[1].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(
            diagnostics[1].code,
            Some(NumberOrString::String("F0001".to_string()))
        );
        assert_eq!(diagnostics[1].range.start, Position::new(1, 30));
    }

    #[test]
    fn test_build_diagnostics_follows_given_annotations() {
        let source = "GET('wdxNetIncome') GET('bogus')";
        let strict = Engine::sample();
        assert!(build_diagnostics(&strict, source, &[]).is_empty());

        let lenient = Engine::new(crate::registry::FieldRegistry::sample(), HighlightPolicy::AnyDescriptor);
        let diagnostics = build_diagnostics(&strict, source, &lenient.annotate(source));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(0, 25));
    }

    #[test]
    fn test_update_document_diagnoses_refreshed_annotations() {
        let (service, _socket) = test_server(Engine::sample());
        let server = service.inner();
        let uri = Url::parse("file:///rules.expr").unwrap();
        let text = "GET('nope') && ".repeat(2000);

        let diagnostics = server.update_document(&uri, &text);
        let doc = server.documents.get(&uri).unwrap();
        assert_eq!(doc.annotations.len(), 2000);
        assert_eq!(diagnostics.len(), doc.annotations.len());
        for (diagnostic, annotation) in diagnostics.iter().zip(&doc.annotations) {
            assert_eq!(diagnostic.range.start.character as usize, annotation.range.start);
            assert_eq!(diagnostic.range.end.character as usize, annotation.range.end);
        }
        assert_eq!(
            diagnostics[1999].range,
            Range {
                start: Position::new(0, 29990),
                end: Position::new(0, 29994),
            }
        );
    }

    #[test]
    fn test_completion_replace_range_multibyte() {
        let line = "é😀 GET('wd";
        let name_start = line.find("wd").unwrap();
        let range = completion_replace_range(line, 4, name_start, line.len());
        assert_eq!(
            range,
            Range {
                start: Position::new(4, 9),
                end: Position::new(4, 11),
            }
        );
    }

    #[test]
    fn test_get_completions_edit_range() {
        let (service, _socket) = test_server(Engine::sample());
        let server = service.inner();
        let uri = Url::parse("file:///rules.expr").unwrap();
        server.update_document(&uri, "x > 1\né😀 GET('wd");

        let items = server.get_completions(&uri, Position::new(1, 11));
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].label, "wdxTotalAssets");
        for item in &items {
            match &item.text_edit {
                Some(CompletionTextEdit::Edit(edit)) => {
                    assert_eq!(edit.range.start, Position::new(1, 9));
                    assert_eq!(edit.range.end, Position::new(1, 11));
                    assert_eq!(edit.new_text, item.label);
                }
                other => panic!("unexpected edit: {:?}", other),
            }
        }

        assert!(server.get_completions(&uri, Position::new(0, 3)).is_empty());
    }

    #[test]
    fn test_hover_to_lsp_uses_utf16_columns() {
        let engine = Engine::sample();
        let line = "é GET('wdxTotalAssets')";
        let column = line.find("Total").unwrap();
        let info = engine.hover(line, column).unwrap();
        let hover = hover_to_lsp(&info, line, 3);
        assert_eq!(
            hover.range,
            Some(Range {
                start: Position::new(3, 7),
                end: Position::new(3, 21),
            })
        );
        match hover.contents {
            HoverContents::Array(items) => assert_eq!(items.len(), 3),
            other => panic!("unexpected contents: {:?}", other),
        }
    }
}
