use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionOptions, CompletionParams, CompletionResponse,
    Diagnostic, DiagnosticSeverity, DidChangeConfigurationParams, DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentFormattingParams, DocumentLink, DocumentLinkOptions, DocumentLinkParams,
    DocumentRangeFormattingParams, DocumentSymbolParams, DocumentSymbolResponse, Documentation,
    FileChangeType, GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents,
    HoverParams, InitializeParams, InitializeResult, InitializedParams, Location, MarkupContent,
    MarkupKind, MessageType, NumberOrString, OneOf, Position, Range, ServerCapabilities,
    ServerInfo, SymbolInformation, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextEdit, Url, WorkspaceSymbolParams,
};
use tower_lsp::{async_trait, Client, LanguageServer, LspService, Server};
use tracing::warn;

use crate::config::WorkspaceConfig;
use crate::format::Formatter;
use crate::index::{
    AsmDiagnostic, DiagnosticLevel, SourcePosition, SourceSpan, SymbolIndex, SymbolKind,
};
use crate::syntax;

const CONFIG_FILE: &str = "asmdex.toml";
const COMPLETION_KEYWORDS: &[&str] = &["macro", "endm"];

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$[0-9a-fA-F]+|%[01]+|[0-9]+|\.?[A-Za-z_][A-Za-z_0-9#@]*(?:\.[A-Za-z_0-9#@]+)?")
        .expect("word pattern")
});
static HEX_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([0-9a-fA-F]+)$").expect("hex literal pattern"));
static BIN_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%([01]+)$").expect("binary literal pattern"));
static INT_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("integer literal pattern"));

#[derive(Clone)]
struct DocumentEntry {
    text: String,
    version: i32,
}

/// LSP backend surfacing the symbol index to an editor over stdio.
pub struct AsmLanguageServer {
    client: Client,
    documents: Arc<RwLock<HashMap<Url, DocumentEntry>>>,
    index: Arc<RwLock<SymbolIndex>>,
}

impl AsmLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            index: Arc::new(RwLock::new(SymbolIndex::new())),
        }
    }

    async fn reindex_document(&self, uri: &Url, text: &str) {
        let path = Self::path_from_uri(uri);
        let diagnostics = {
            let mut index = self.index.write().await;
            index.document(path.clone(), text);
            index.diagnostics(&path).to_vec()
        };
        let version = {
            let documents = self.documents.read().await;
            documents.get(uri).map(|entry| entry.version)
        };
        self.publish(uri.clone(), &diagnostics, version).await;
    }

    async fn publish(&self, uri: Url, diagnostics: &[AsmDiagnostic], version: Option<i32>) {
        let converted = diagnostics.iter().map(Self::lsp_diagnostic).collect();
        self.client.publish_diagnostics(uri, converted, version).await;
    }

    async fn publish_all(&self) {
        let per_file: Vec<(PathBuf, Vec<AsmDiagnostic>)> = {
            let index = self.index.read().await;
            index
                .files()
                .map(|(path, table)| (path.to_path_buf(), table.diagnostics.clone()))
                .collect()
        };
        for (path, diagnostics) in per_file {
            if let Ok(uri) = Url::from_file_path(&path) {
                self.publish(uri, &diagnostics, None).await;
            }
        }
    }

    async fn reload_configuration(&self) {
        let mut index = self.index.write().await;
        if let Some(root) = index.workspace_root().map(Path::to_path_buf) {
            match WorkspaceConfig::load(&root.join(CONFIG_FILE)) {
                Ok(config) => index.set_config(config),
                Err(err) => warn!(%err, "keeping previous configuration"),
            }
        }
        index.rescan();
    }

    fn lsp_diagnostic(diag: &AsmDiagnostic) -> Diagnostic {
        let severity = Some(match diag.level {
            DiagnosticLevel::Error => DiagnosticSeverity::ERROR,
            DiagnosticLevel::Warning => DiagnosticSeverity::WARNING,
        });
        Diagnostic {
            range: diag.span.as_ref().map(Self::lsp_range).unwrap_or_default(),
            severity,
            code: Some(NumberOrString::String(diag.code.into())),
            source: Some("asmdex".into()),
            message: diag.message.clone(),
            ..Diagnostic::default()
        }
    }

    fn lsp_position(position: SourcePosition) -> Position {
        Position {
            line: position.line.saturating_sub(1) as u32,
            character: position.column.saturating_sub(1) as u32,
        }
    }

    fn lsp_range(span: &SourceSpan) -> Range {
        Range {
            start: Self::lsp_position(span.start),
            end: Self::lsp_position(span.end),
        }
    }

    fn source_position(position: Position) -> SourcePosition {
        SourcePosition::new(position.line as usize + 1, position.character as usize + 1)
    }

    fn path_from_uri(uri: &Url) -> PathBuf {
        uri.to_file_path()
            .unwrap_or_else(|_| PathBuf::from(uri.path()))
    }

    fn symbol_kind(kind: SymbolKind) -> tower_lsp::lsp_types::SymbolKind {
        match kind {
            SymbolKind::Function => tower_lsp::lsp_types::SymbolKind::FUNCTION,
            SymbolKind::Constant => tower_lsp::lsp_types::SymbolKind::CONSTANT,
        }
    }

    fn completion_kind(kind: SymbolKind) -> CompletionItemKind {
        match kind {
            SymbolKind::Function => CompletionItemKind::FUNCTION,
            SymbolKind::Constant => CompletionItemKind::CONSTANT,
        }
    }

    /// The word (symbol reference or numeric literal) under the cursor.
    fn word_at(line: &str, character: usize) -> Option<String> {
        let byte_col = line
            .char_indices()
            .nth(character)
            .map(|(idx, _)| idx)
            .unwrap_or(line.len());
        WORD_RE
            .find_iter(line)
            .find(|m| m.start() <= byte_col && byte_col <= m.end())
            .map(|m| m.as_str().to_string())
    }

    fn number_hover(text: &str) -> Option<String> {
        let value: u64 = if let Some(caps) = HEX_LITERAL_RE.captures(text) {
            u64::from_str_radix(&caps[1], 16).ok()?
        } else if let Some(caps) = BIN_LITERAL_RE.captures(text) {
            u64::from_str_radix(&caps[1], 2).ok()?
        } else if INT_LITERAL_RE.is_match(text) {
            text.parse().ok()?
        } else {
            return None;
        };
        Some(format!("`{value}`\n\n`${value:x}`\n\n`%{value:b}`"))
    }

    async fn line_of(&self, uri: &Url, line: usize) -> Option<String> {
        let documents = self.documents.read().await;
        documents
            .get(uri)
            .and_then(|entry| entry.text.lines().nth(line).map(str::to_string))
    }

    fn markdown(value: String) -> HoverContents {
        HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        })
    }
}

#[async_trait]
impl LanguageServer for AsmLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        let root = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri.to_file_path().ok());
        {
            let mut index = self.index.write().await;
            if let Some(root) = &root {
                match WorkspaceConfig::load(&root.join(CONFIG_FILE)) {
                    Ok(config) => index.set_config(config),
                    Err(err) => warn!(%err, "falling back to the default configuration"),
                }
            }
            index.set_workspace_root(root);
        }

        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    ..Default::default()
                },
            )),
            completion_provider: Some(CompletionOptions::default()),
            hover_provider: Some(tower_lsp::lsp_types::HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            document_symbol_provider: Some(OneOf::Left(true)),
            workspace_symbol_provider: Some(OneOf::Left(true)),
            document_link_provider: Some(DocumentLinkOptions {
                resolve_provider: Some(false),
                work_done_progress_options: Default::default(),
            }),
            document_formatting_provider: Some(OneOf::Left(true)),
            document_range_formatting_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        };
        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "asmdex".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let indexed = {
            let mut index = self.index.write().await;
            index.scan_workspace().unwrap_or(0)
        };
        self.publish_all().await;
        self.client
            .log_message(
                MessageType::INFO,
                format!("asmdex indexed {indexed} files"),
            )
            .await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.documents.write().await.insert(
            doc.uri.clone(),
            DocumentEntry {
                text: doc.text.clone(),
                version: doc.version,
            },
        );
        self.reindex_document(&doc.uri, &doc.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let uri = params.text_document.uri;
        self.documents.write().await.insert(
            uri.clone(),
            DocumentEntry {
                text: change.text.clone(),
                version: params.text_document.version,
            },
        );
        self.reindex_document(&uri, &change.text).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.write().await.remove(&params.text_document.uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for event in params.changes {
            let path = Self::path_from_uri(&event.uri);
            if event.typ == FileChangeType::DELETED {
                self.index.write().await.remove(&path);
                self.publish(event.uri, &[], None).await;
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(text) => self.reindex_document(&event.uri, &text).await,
                Err(err) => warn!(path = %path.display(), %err, "cannot read changed file"),
            }
        }
    }

    async fn did_change_configuration(&self, _: DidChangeConfigurationParams) {
        self.reload_configuration().await;
        self.publish_all().await;
    }

    async fn hover(&self, params: HoverParams) -> LspResult<Option<Hover>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some(line) = self.line_of(&uri, position.line as usize).await else {
            return Ok(None);
        };
        let Some(word) = Self::word_at(&line, position.character as usize) else {
            return Ok(None);
        };

        let path = Self::path_from_uri(&uri);
        let query = Self::source_position(position);
        let index = self.index.read().await;
        if let Some(found) = index.lookup(&word, &path) {
            if index.symbol_visible_at(&found, &path, query) {
                if let Some(docs) = &found.descriptor.documentation {
                    return Ok(Some(Hover {
                        contents: Self::markdown(docs.clone()),
                        range: None,
                    }));
                }
            }
        }
        Ok(Self::number_hover(&word).map(|value| Hover {
            contents: Self::markdown(value),
            range: None,
        }))
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let path = Self::path_from_uri(&uri);
        let query = Self::source_position(position);

        let mut items: Vec<CompletionItem> = Vec::new();
        for register in syntax::REGISTERS {
            items.push(CompletionItem {
                label: register.to_string(),
                kind: Some(CompletionItemKind::VARIABLE),
                ..CompletionItem::default()
            });
        }
        for keyword in COMPLETION_KEYWORDS {
            items.push(CompletionItem {
                label: keyword.to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..CompletionItem::default()
            });
        }

        let index = self.index.read().await;
        for (name, visible) in index.visible_symbols(&path) {
            if !index.symbol_visible_at(&visible, &path, query) {
                continue;
            }
            items.push(CompletionItem {
                label: name,
                kind: Some(Self::completion_kind(visible.descriptor.kind)),
                documentation: visible.descriptor.documentation.as_ref().map(|docs| {
                    Documentation::MarkupContent(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value: docs.clone(),
                    })
                }),
                ..CompletionItem::default()
            });
        }
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> LspResult<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let Some(line) = self.line_of(&uri, position.line as usize).await else {
            return Ok(None);
        };
        let Some(word) = Self::word_at(&line, position.character as usize) else {
            return Ok(None);
        };

        let path = Self::path_from_uri(&uri);
        let index = self.index.read().await;
        let Some(found) = index.lookup(&word, &path) else {
            return Ok(None);
        };
        if !index.symbol_visible_at(&found, &path, Self::source_position(position)) {
            return Ok(None);
        }
        let location = &found.descriptor.location;
        let Ok(target) = Url::from_file_path(&location.path) else {
            return Ok(None);
        };
        Ok(Some(GotoDefinitionResponse::Scalar(Location::new(
            target,
            Self::lsp_range(location),
        ))))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> LspResult<Option<DocumentSymbolResponse>> {
        let path = Self::path_from_uri(&params.text_document.uri);
        let index = self.index.read().await;
        let Some(table) = index.file_table(&path) else {
            return Ok(None);
        };
        let mut symbols = Vec::new();
        for (name, descriptor) in &table.symbols {
            #[allow(deprecated)]
            symbols.push(SymbolInformation {
                name: name.clone(),
                kind: Self::symbol_kind(descriptor.kind),
                tags: None,
                deprecated: None,
                location: Location::new(
                    params.text_document.uri.clone(),
                    Self::lsp_range(&descriptor.location),
                ),
                container_name: None,
            });
        }
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> LspResult<Option<Vec<SymbolInformation>>> {
        let query = params.query.to_ascii_lowercase();
        let index = self.index.read().await;
        let mut symbols = Vec::new();
        for (path, table) in index.files() {
            let Ok(uri) = Url::from_file_path(path) else {
                continue;
            };
            for (name, descriptor) in &table.symbols {
                if !descriptor.is_exported() {
                    continue;
                }
                if !query.is_empty() && !name.to_ascii_lowercase().contains(&query) {
                    continue;
                }
                #[allow(deprecated)]
                symbols.push(SymbolInformation {
                    name: name.clone(),
                    kind: Self::symbol_kind(descriptor.kind),
                    tags: None,
                    deprecated: None,
                    location: Location::new(uri.clone(), Self::lsp_range(&descriptor.location)),
                    container_name: None,
                });
            }
        }
        Ok(Some(symbols))
    }

    async fn document_link(
        &self,
        params: DocumentLinkParams,
    ) -> LspResult<Option<Vec<DocumentLink>>> {
        let path = Self::path_from_uri(&params.text_document.uri);
        let index = self.index.read().await;
        let Some(table) = index.file_table(&path) else {
            return Ok(None);
        };
        let mut links = Vec::new();
        for include in &table.includes {
            let Some(resolved) = &include.resolved else {
                continue;
            };
            let Ok(target) = Url::from_file_path(resolved) else {
                continue;
            };
            links.push(DocumentLink {
                range: Self::lsp_range(&include.range),
                target: Some(target),
                tooltip: None,
                data: None,
            });
        }
        Ok(Some(links))
    }

    async fn formatting(
        &self,
        params: DocumentFormattingParams,
    ) -> LspResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(entry) = self.documents.read().await.get(&uri).cloned() else {
            return Ok(None);
        };
        let index = self.index.read().await;
        let rules = &index.config().formatting.capitalization;
        let edits = Formatter::new(rules).format(&entry.text);
        Ok(Some(edits.iter().map(case_edit_to_lsp).collect()))
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> LspResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(entry) = self.documents.read().await.get(&uri).cloned() else {
            return Ok(None);
        };
        let start_line = params.range.start.line as usize + 1;
        let end_line = params.range.end.line as usize + 1;
        let index = self.index.read().await;
        let rules = &index.config().formatting.capitalization;
        let edits = Formatter::new(rules).format_range(&entry.text, start_line, end_line);
        Ok(Some(edits.iter().map(case_edit_to_lsp).collect()))
    }
}

fn case_edit_to_lsp(edit: &crate::format::TextEdit) -> TextEdit {
    let line = edit.line.saturating_sub(1) as u32;
    let start = edit.column.saturating_sub(1) as u32;
    TextEdit {
        range: Range {
            start: Position {
                line,
                character: start,
            },
            end: Position {
                line,
                character: start + edit.replacement.len() as u32,
            },
        },
        new_text: edit.replacement.clone(),
    }
}

async fn run_stdio_language_server_impl<F>(factory: F) -> LspResult<()>
where
    F: Fn(Client) -> AsmLanguageServer,
{
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let (service, socket) = LspService::build(factory).finish();
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}

pub async fn run_stdio_language_server() -> LspResult<()> {
    run_stdio_language_server_impl(AsmLanguageServer::new).await
}
