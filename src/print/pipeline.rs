//! The single print operation shared by both calling conventions.

use std::path::PathBuf;
use std::sync::Arc;

use super::assembler::{DocumentAssembler, DocumentParts};
use super::assets::{default_assets_dir, AssetLoader, AssetManifest};
use super::cleanup::TempFileRegistry;
use super::dialog::SaveDialog;
use super::dispatch::OutputDispatcher;
use super::models::{PrintJob, PrintResult};
use super::render::{ReadinessPolicy, RenderBackend, RenderHost, WindowHandle};
use super::rewriter::ContentRewriter;
use super::PrintError;

/// Assets → rewrite → assemble → render → dispatch → cleanup.
pub struct PrintPipeline {
    loader: AssetLoader,
    rewriter: ContentRewriter,
    assembler: DocumentAssembler,
    host: RenderHost,
    dispatcher: OutputDispatcher,
}

pub struct PrintPipelineBuilder {
    backend: Arc<dyn RenderBackend>,
    dialog: Arc<dyn SaveDialog>,
    assets_dir: PathBuf,
    temp_dir: PathBuf,
    manifest: AssetManifest,
    registry: Arc<TempFileRegistry>,
    readiness: ReadinessPolicy,
}

impl PrintPipelineBuilder {
    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn registry(mut self, registry: Arc<TempFileRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn build(self) -> Result<PrintPipeline, PrintError> {
        Ok(PrintPipeline {
            rewriter: ContentRewriter::new(&self.manifest)?,
            loader: AssetLoader::new(self.assets_dir, self.manifest),
            assembler: DocumentAssembler::default(),
            host: RenderHost::new(self.backend, self.registry, self.temp_dir, self.readiness),
            dispatcher: OutputDispatcher::new(self.dialog),
        })
    }
}

impl PrintPipeline {
    pub fn builder(
        backend: Arc<dyn RenderBackend>,
        dialog: Arc<dyn SaveDialog>,
    ) -> PrintPipelineBuilder {
        PrintPipelineBuilder {
            backend,
            dialog,
            assets_dir: default_assets_dir().to_path_buf(),
            temp_dir: std::env::temp_dir(),
            manifest: AssetManifest::STANDARD,
            registry: TempFileRegistry::global(),
            readiness: ReadinessPolicy::default(),
        }
    }

    pub fn registry(&self) -> &Arc<TempFileRegistry> {
        self.host.registry()
    }

    /// Run a job to completion. Never returns an error.
    pub async fn run(&self, job: &PrintJob) -> PrintResult {
        match self.try_run(job, None).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Print job {} failed: {}", job.id, e);
                PrintResult::failed(e.to_string())
            }
        }
    }

    /// Run a job; pipeline errors before dispatch are returned as `Err`.
    ///
    /// Dispatch outcomes (printed, saved, canceled, dispatch failure) are
    /// always `Ok`. The surface and temp file are released before returning.
    /// Dropping this future mid-job leaves only the drop-time temp cleanup;
    /// callers that can go away use [`PrintService`](super::PrintService).
    pub async fn try_run(
        &self,
        job: &PrintJob,
        parent: Option<WindowHandle>,
    ) -> Result<PrintResult, PrintError> {
        let document = self.prepare_document(job).await?;
        let rendered = self.host.render(job.id, document, parent).await?;

        let result = self.dispatcher.dispatch(job, rendered.surface()).await;
        rendered.teardown().await;

        Ok(result)
    }

    /// Load assets and produce the self-contained HTML for `job`.
    pub async fn prepare_document(&self, job: &PrintJob) -> Result<String, PrintError> {
        let bundle = self.loader.load().await?;
        let content = self.rewriter.rewrite(&job.content_html, &bundle);
        let styles = self.rewriter.rewrite(&bundle.combined_style_text, &bundle);

        Ok(self.assembler.assemble(DocumentParts {
            title: job.title(),
            content: &content,
            styles: &styles,
            watermark: bundle.logo_ref(),
        }))
    }
}
