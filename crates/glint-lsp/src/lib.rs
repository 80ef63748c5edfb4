//! # glint-lsp
//!
//! Language server for GLSL over stdio. Documents are kept as text and
//! re-analysed per request; every feature lives in [`features`] and works on
//! a fresh [`Analysis`].

pub mod features;
pub mod line_index;

use dashmap::DashMap;
use glint_core::GlintConfig;
use glint_lang::Analysis;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info};

use crate::line_index::LineIndex;

#[derive(Debug)]
pub struct Backend {
    client: Client,
    document_map: DashMap<String, String>,
    config: GlintConfig,
}

impl Backend {
    pub fn new(client: Client, config: GlintConfig) -> Self {
        Self {
            client,
            document_map: DashMap::new(),
            config,
        }
    }

    /// Run `f` over a fresh analysis of the open document at `uri`.
    fn with_analysis<T>(&self, uri: &Url, f: impl FnOnce(&Analysis, &LineIndex) -> T) -> Option<T> {
        let text = self.document_map.get(uri.as_str())?.value().clone();
        let index = LineIndex::new(&text);
        let analysis = Analysis::with_config(text, self.config.analysis.clone());
        Some(f(&analysis, &index))
    }

    fn at_position<T>(
        &self,
        position: &TextDocumentPositionParams,
        f: impl FnOnce(&Analysis, &LineIndex, usize) -> T,
    ) -> Option<T> {
        self.with_analysis(&position.text_document.uri, |analysis, index| {
            let offset = index.offset(position.position)?;
            Some(f(analysis, index, offset))
        })
        .flatten()
    }

    async fn on_change(&self, uri: Url, text: String, version: Option<i32>) {
        self.document_map.insert(uri.to_string(), text);
        let Some(diagnostics) = self.with_analysis(&uri, features::diagnostics) else {
            return;
        };
        debug!(uri = %uri, count = diagnostics.len(), "publishing diagnostics");
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![".".to_string()]),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                color_provider: self
                    .config
                    .colors
                    .enabled
                    .then_some(ColorProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "glint".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("language server initialized");
        self.client
            .log_message(MessageType::INFO, "Glint GLSL language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.on_change(doc.uri, doc.text, Some(doc.version)).await
    }

    async fn did_change(&self, mut params: DidChangeTextDocumentParams) {
        // Full sync: the last change holds the whole document.
        let Some(change) = params.content_changes.pop() else {
            return;
        };
        self.on_change(
            params.text_document.uri,
            change.text,
            Some(params.text_document.version),
        )
        .await
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(text) = params.text {
            self.on_change(params.text_document.uri, text, None).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.document_map.remove(params.text_document.uri.as_str());
        self.client
            .publish_diagnostics(params.text_document.uri, Vec::new(), None)
            .await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        Ok(self
            .at_position(&params.text_document_position, |analysis, _, offset| {
                features::completions(analysis, offset)
            })
            .map(CompletionResponse::Array))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        Ok(self
            .at_position(&params.text_document_position_params, |analysis, _, offset| {
                features::hover(analysis, offset)
            })
            .flatten())
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri.clone();
        Ok(self
            .at_position(&position, |analysis, index, offset| {
                features::definition(analysis, offset).map(|span| index.range(span))
            })
            .flatten()
            .map(|range| GotoDefinitionResponse::Scalar(Location { uri, range })))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        Ok(self
            .with_analysis(&params.text_document.uri, features::document_symbols)
            .map(DocumentSymbolResponse::Nested))
    }

    async fn document_color(&self, params: DocumentColorParams) -> Result<Vec<ColorInformation>> {
        if !self.config.colors.enabled {
            return Ok(Vec::new());
        }
        Ok(self
            .with_analysis(&params.text_document.uri, features::document_colors)
            .unwrap_or_default())
    }

    async fn color_presentation(
        &self,
        params: ColorPresentationParams,
    ) -> Result<Vec<ColorPresentation>> {
        Ok(self
            .with_analysis(&params.text_document.uri, |analysis, index| {
                features::color_presentations(analysis, index, params.range, params.color)
            })
            .unwrap_or_default())
    }
}

/// Start the Language Server on standard I/O.
pub async fn start_lsp(config: GlintConfig) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend::new(client, config));

    Server::new(stdin, stdout, socket).serve(service).await;
}
