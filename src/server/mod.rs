//! The JSON-RPC transport adapter.
//!
//! This module is the only place that knows about the wire protocol: it
//! converts 0-based LSP positions to the core's 1-based [`crate::lexer::
//! Position`], converts `file://` URIs to paths and back, and maps every
//! [`crate::query`] result into the matching `lsp_types` response. Every
//! handler defers the actual work to `crate::session`/`crate::query` —
//! nothing here traverses an AST or symbol table directly.

mod watchdog;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp_server::jsonrpc::Result as RpcResult;
use tower_lsp_server::lsp_types::*;
use tower_lsp_server::{Client, LanguageServer};
use tracing::{error, info, warn};

use crate::diagnostic::{Diagnostic as CoreDiagnostic, Severity as CoreSeverity};
use crate::lexer::{Position as CorePosition, Span as CoreSpan};
use crate::query::{
    code_actions, completion, document_symbols, folding, hover, navigation, rename, semantic_tokens, signature_help,
};
use crate::session::Session;

/// `textDocument/semanticTokens/full`'s legend, advertised once at
/// `initialize` and depended on by every token the query engine emits
///.
fn semantic_legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: semantic_tokens::TOKEN_TYPE_LEGEND
            .iter()
            .map(|name| SemanticTokenType::new(name))
            .collect(),
        token_modifiers: vec![
            SemanticTokenModifier::new("declaration"),
            SemanticTokenModifier::new("readonly"),
            SemanticTokenModifier::new("defaultLibrary"),
        ],
    }
}

pub struct Backend {
    client: Client,
    session: Arc<RwLock<Session>>,
    /// Set once a `shutdown` request has been handled; read by the binary
    /// after the service stops to pick the process exit code.
    shutdown_received: Arc<AtomicBool>,
}

impl Backend {
    pub fn new(client: Client, shutdown_received: Arc<AtomicBool>) -> Self {
        Self {
            client,
            session: Arc::new(RwLock::new(Session::new(PathBuf::new(), PathBuf::new()))),
            shutdown_received,
        }
    }

    async fn rebuild_and_publish(&self) {
        let open_paths: Vec<PathBuf> = {
            let mut session = self.session.write().await;
            session.rebuild();
            session.open_paths().cloned().collect()
        };

        let session = self.session.read().await;
        let Some(program) = session.program() else {
            return;
        };

        for path in &open_paths {
            let Some(uri) = path_to_uri(path) else { continue };
            let path_str = path.to_string_lossy();
            let diagnostics = program
                .diagnostics
                .iter()
                .filter(|d| canonicalized_eq(&d.file, &path_str))
                .map(to_lsp_diagnostic)
                .collect();
            self.client.publish_diagnostics(uri, diagnostics, None).await;
        }
    }

    async fn open_document(&self, path: PathBuf, text: String) {
        self.session.write().await.open(path, text);
        self.rebuild_and_publish().await;
    }
}

/// Compares a diagnostic's recorded file (the exact path string the loader
/// read it from) against an open document's path, tolerating the two being
/// non-canonicalized differently.
fn canonicalized_eq(a: &str, b: &str) -> bool {
    let ca = Path::new(a).canonicalize();
    let cb = Path::new(b).canonicalize();
    match (ca, cb) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}

fn to_lsp_severity(severity: CoreSeverity) -> DiagnosticSeverity {
    match severity {
        CoreSeverity::Fatal | CoreSeverity::Error => DiagnosticSeverity::ERROR,
        CoreSeverity::Warning => DiagnosticSeverity::WARNING,
        CoreSeverity::Hint => DiagnosticSeverity::HINT,
    }
}

fn to_lsp_diagnostic(d: &CoreDiagnostic) -> Diagnostic {
    let start = to_lsp_position(d.position);
    let end = Position::new(start.line, start.character + 1);
    Diagnostic {
        range: Range::new(start, end),
        severity: Some(to_lsp_severity(d.severity)),
        code: Some(NumberOrString::String(d.code.as_str().to_string())),
        source: Some("vela".to_string()),
        message: d.message.clone(),
        ..Default::default()
    }
}

/// Wire positions are 0-based; the core is 1-based throughout.
fn to_core_position(p: Position) -> CorePosition {
    CorePosition::new(p.line as usize + 1, p.character as usize + 1)
}

fn to_lsp_position(p: CorePosition) -> Position {
    Position::new((p.line.saturating_sub(1)) as u32, (p.column.saturating_sub(1)) as u32)
}

fn to_lsp_range(span: CoreSpan) -> Range {
    Range::new(to_lsp_position(span.start), to_lsp_position(span.end))
}

fn to_lsp_location(loc: crate::query::support::Location) -> Option<Location> {
    let uri = path_to_uri(Path::new(&loc.file))?;
    Some(Location::new(uri, to_lsp_range(loc.range)))
}

/// Percent-decodes a `file://` URI's path component into a platform path
///. No URL crate is used beyond what `lsp_types::Uri`
/// already gives for parsing — the decode here is a direct byte-level
/// implementation of RFC 3986 percent-decoding.
fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    if uri.scheme().as_str() != "file" {
        return None;
    }
    Some(PathBuf::from(percent_decode(uri.path().as_str())))
}

fn path_to_uri(path: &Path) -> Option<Uri> {
    let raw = path.to_string_lossy();
    let encoded = percent_encode_path(&raw);
    let text = if encoded.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    };
    text.parse().ok()
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn percent_encode_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

fn completion_kind(kind: crate::query::completion::CompletionKind) -> CompletionItemKind {
    use crate::query::completion::CompletionKind::*;
    match kind {
        Routine => CompletionItemKind::FUNCTION,
        Type => CompletionItemKind::STRUCT,
        Variable => CompletionItemKind::VARIABLE,
        Constant => CompletionItemKind::CONSTANT,
        Field => CompletionItemKind::FIELD,
        Keyword => CompletionItemKind::KEYWORD,
        Module => CompletionItemKind::MODULE,
    }
}

fn document_symbol_kind(kind: document_symbols::DocumentSymbolKind) -> SymbolKind {
    use document_symbols::DocumentSymbolKind::*;
    match kind {
        Module => SymbolKind::MODULE,
        Routine => SymbolKind::FUNCTION,
        Type => SymbolKind::STRUCT,
        Variable => SymbolKind::VARIABLE,
        Constant => SymbolKind::CONSTANT,
    }
}

#[allow(deprecated)]
fn to_lsp_document_symbol(sym: document_symbols::DocumentSymbol) -> DocumentSymbol {
    DocumentSymbol {
        name: sym.name,
        detail: None,
        kind: document_symbol_kind(sym.kind),
        tags: None,
        deprecated: None,
        range: to_lsp_range(sym.range),
        selection_range: to_lsp_range(sym.selection_range),
        children: None,
    }
}

fn to_lsp_selection_range(sr: folding::SelectionRange) -> SelectionRange {
    let mut spans = Vec::new();
    let mut current = Some(sr);
    while let Some(node) = current {
        spans.push(node.range);
        current = node.inner.map(|boxed| *boxed);
    }
    // `spans` is outermost-first; LSP wants innermost-first with `parent`
    // pointing outward.
    let mut iter = spans.into_iter().rev();
    let innermost = iter.next().expect("at least the module range is always present");
    let mut node = SelectionRange {
        range: to_lsp_range(innermost),
        parent: None,
    };
    for span in iter {
        node = SelectionRange {
            range: to_lsp_range(span),
            parent: Some(Box::new(node)),
        };
    }
    node
}

impl LanguageServer for Backend {
    #[allow(deprecated)]
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        let workspace_root = params
            .root_uri
            .as_ref()
            .and_then(uri_to_path)
            .or_else(|| params.workspace_folders.as_ref().and_then(|f| f.first()).and_then(|f| uri_to_path(&f.uri)))
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

        {
            let mut session = self.session.write().await;
            *session = Session::discover(&workspace_root);
        }

        if let Some(pid) = params.process_id {
            tokio::spawn(watchdog::watch(pid as i32, || std::process::exit(1)));
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![".".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                type_definition_provider: Some(TypeDefinitionProviderCapability::Simple(true)),
                implementation_provider: Some(ImplementationProviderCapability::Simple(true)),
                references_provider: Some(OneOf::Left(true)),
                document_highlight_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: Default::default(),
                }),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                rename_provider: Some(OneOf::Left(true)),
                folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
                selection_range_provider: Some(SelectionRangeProviderCapability::Simple(true)),
                semantic_tokens_provider: Some(SemanticTokensServerCapabilities::SemanticTokensOptions(
                    SemanticTokensOptions {
                        legend: semantic_legend(),
                        full: Some(SemanticTokensFullOptions::Bool(true)),
                        range: None,
                        work_done_progress_options: Default::default(),
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "vela-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("initialized, building initial program");
        self.rebuild_and_publish().await;
    }

    async fn shutdown(&self) -> RpcResult<()> {
        self.shutdown_received.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else {
            warn!(uri = %params.text_document.uri.as_str(), "did_open: not a file:// URI");
            return;
        };
        self.open_document(path, params.text_document.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return };
        // Full sync only: the last change carries the whole text.
        // Document changes never trigger a rebuild by themselves — only
        // open/save do.
        if let Some(change) = params.content_changes.into_iter().next_back() {
            self.session.write().await.update(&path, change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return };
        if let Some(text) = params.text {
            self.session.write().await.update(&path, text);
        }
        self.rebuild_and_publish().await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return };
        self.session.write().await.close(&path);
        // Clears stale markers for the closed document.
        self.client.publish_diagnostics(params.text_document.uri, vec![], None).await;
    }

    async fn completion(&self, params: CompletionParams) -> RpcResult<Option<CompletionResponse>> {
        let text_params = params.text_document_position;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };
        let Some(buffer) = session.buffer(&path) else { return Ok(None) };

        let items = completion::completion(program, &file, buffer, position)
            .into_iter()
            .map(|item| CompletionItem {
                label: item.label,
                kind: Some(completion_kind(item.kind)),
                detail: item.detail,
                ..Default::default()
            })
            .collect();
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let text_params = params.text_document_position_params;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };
        let Some(buffer) = session.buffer(&path) else { return Ok(None) };

        Ok(hover::hover(program, &file, buffer, position).map(|text| Hover {
            contents: HoverContents::Scalar(MarkedString::String(text)),
            range: None,
        }))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> RpcResult<Option<GotoDefinitionResponse>> {
        let text_params = params.text_document_position_params;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        Ok(navigation::go_to_definition(program, &file, position)
            .and_then(to_lsp_location)
            .map(GotoDefinitionResponse::Scalar))
    }

    async fn goto_type_definition(
        &self,
        params: GotoTypeDefinitionParams,
    ) -> RpcResult<Option<GotoTypeDefinitionResponse>> {
        let text_params = params.text_document_position_params;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        Ok(navigation::type_definition(program, &file, position)
            .and_then(to_lsp_location)
            .map(GotoTypeDefinitionResponse::Scalar))
    }

    async fn goto_implementation(
        &self,
        params: GotoImplementationParams,
    ) -> RpcResult<Option<GotoImplementationResponse>> {
        let text_params = params.text_document_position_params;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        Ok(navigation::implementation(program, &file, position)
            .and_then(to_lsp_location)
            .map(GotoImplementationResponse::Scalar))
    }

    async fn references(&self, params: ReferenceParams) -> RpcResult<Option<Vec<Location>>> {
        let text_params = params.text_document_position;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let locations: Vec<Location> = navigation::references(program, &file, position)
            .into_iter()
            .filter_map(to_lsp_location)
            .collect();
        Ok((!locations.is_empty()).then_some(locations))
    }

    async fn document_highlight(&self, params: DocumentHighlightParams) -> RpcResult<Option<Vec<DocumentHighlight>>> {
        let text_params = params.text_document_position_params;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let highlights: Vec<DocumentHighlight> = navigation::document_highlights(program, &file, position)
            .into_iter()
            .map(|loc| DocumentHighlight {
                range: to_lsp_range(loc.range),
                kind: Some(DocumentHighlightKind::TEXT),
            })
            .collect();
        Ok((!highlights.is_empty()).then_some(highlights))
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> RpcResult<Option<DocumentSymbolResponse>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let symbols: Vec<DocumentSymbol> = document_symbols::document_symbols(program, &file)
            .into_iter()
            .map(to_lsp_document_symbol)
            .collect();
        Ok((!symbols.is_empty()).then_some(DocumentSymbolResponse::Nested(symbols)))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> RpcResult<Option<SignatureHelp>> {
        let text_params = params.text_document_position_params;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };
        let Some(buffer) = session.buffer(&path) else { return Ok(None) };

        let Some(result) = signature_help::signature_help(program, &file, buffer, position) else {
            return Ok(None);
        };

        Ok(Some(SignatureHelp {
            signatures: result
                .signatures
                .into_iter()
                .map(|sig| SignatureInformation {
                    label: sig.label,
                    documentation: None,
                    parameters: None,
                    active_parameter: None,
                })
                .collect(),
            active_signature: Some(0),
            active_parameter: Some(result.active_parameter as u32),
        }))
    }

    async fn code_action(&self, params: CodeActionParams) -> RpcResult<Option<CodeActionResponse>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(params.range.start);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let actions: Vec<CodeActionOrCommand> = code_actions::code_actions(program, &file, position)
            .into_iter()
            .filter_map(|action| {
                let uri = path_to_uri(Path::new(&action.file))?;
                let edits = action
                    .edits
                    .into_iter()
                    .map(|edit| TextEdit {
                        range: Range::new(to_lsp_position(edit.position), to_lsp_position(edit.position)),
                        new_text: edit.new_text,
                    })
                    .collect();
                let mut changes = HashMap::new();
                changes.insert(uri, edits);
                Some(CodeActionOrCommand::CodeAction(CodeAction {
                    title: action.title,
                    kind: Some(CodeActionKind::QUICKFIX),
                    diagnostics: None,
                    edit: Some(WorkspaceEdit {
                        changes: Some(changes),
                        document_changes: None,
                        change_annotations: None,
                    }),
                    command: None,
                    is_preferred: None,
                    disabled: None,
                    data: None,
                }))
            })
            .collect();
        Ok((!actions.is_empty()).then_some(actions))
    }

    async fn rename(&self, params: RenameParams) -> RpcResult<Option<WorkspaceEdit>> {
        let text_params = params.text_document_position;
        let Some(path) = uri_to_path(&text_params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();
        let position = to_core_position(text_params.position);

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        match rename::rename(program, &file, position, &params.new_name) {
            Ok(edit) => {
                let mut changes = HashMap::new();
                for (file, edits) in edit.changes {
                    let Some(uri) = path_to_uri(Path::new(&file)) else { continue };
                    changes.insert(
                        uri,
                        edits
                            .into_iter()
                            .map(|e| TextEdit {
                                range: to_lsp_range(e.range),
                                new_text: e.new_text,
                            })
                            .collect(),
                    );
                }
                Ok(Some(WorkspaceEdit {
                    changes: Some(changes),
                    document_changes: None,
                    change_annotations: None,
                }))
            }
            Err(err) => {
                error!(?err, "rename rejected");
                Err(tower_lsp_server::jsonrpc::Error::invalid_params(format!("{err:?}")))
            }
        }
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> RpcResult<Option<Vec<FoldingRange>>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let ranges: Vec<FoldingRange> = folding::folding_ranges(program, &file)
            .into_iter()
            .map(|r| FoldingRange {
                start_line: (r.start_line.saturating_sub(1)) as u32,
                start_character: None,
                end_line: (r.end_line.saturating_sub(1)) as u32,
                end_character: None,
                kind: None,
                collapsed_text: None,
            })
            .collect();
        Ok((!ranges.is_empty()).then_some(ranges))
    }

    async fn selection_range(&self, params: SelectionRangeParams) -> RpcResult<Option<Vec<SelectionRange>>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let ranges: Vec<SelectionRange> = params
            .positions
            .into_iter()
            .filter_map(|pos| folding::selection_range(program, &file, to_core_position(pos)))
            .map(to_lsp_selection_range)
            .collect();
        Ok((!ranges.is_empty()).then_some(ranges))
    }

    async fn semantic_tokens_full(&self, params: SemanticTokensParams) -> RpcResult<Option<SemanticTokensResult>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let file = path.to_string_lossy().into_owned();

        let session = self.session.read().await;
        let Some(program) = session.program() else { return Ok(None) };

        let tokens = semantic_tokens::semantic_tokens(program, &file);
        let data = semantic_tokens::encode_delta(&tokens)
            .into_iter()
            .map(|t| SemanticToken {
                delta_line: t.delta_line as u32,
                delta_start: t.delta_start as u32,
                length: t.length as u32,
                token_type: t.token_type,
                token_modifiers_bitset: t.modifiers,
            })
            .collect();
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens { result_id: None, data })))
    }
}
