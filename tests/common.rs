#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use docprint_server::print::assets::AssetManifest;
use docprint_server::print::protocol::DeliveryError;
use docprint_server::print::render::{
    PdfOptions, PrintCallback, PrintOptions, SurfaceId, WindowHandle,
};
use docprint_server::print::{
    PrintError, PrintEvent, PrintPipeline, PrintReporter, ReadinessPolicy, RenderBackend,
    RenderSurface, SaveDialog, SaveDialogOptions, SaveDialogResult, TempFileRegistry,
};

/// Content containing this marker makes the mock surface refuse to load.
pub const FAIL_RENDER_MARKER: &str = "<!-- fail-render -->";

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n% mock capture\n%%EOF\n";

/// Write a full asset directory with distinct file contents.
pub fn write_assets(dir: &Path) {
    std::fs::write(
        dir.join("styles.css"),
        ".brand-mark { background: url(\"../assets/icon.png\"); }",
    )
    .unwrap();
    std::fs::write(
        dir.join("documents.css"),
        ".qr { background: url('../assets/qr-code.png'); }",
    )
    .unwrap();
    for asset in AssetManifest::STANDARD.images {
        let mut bytes = vec![0x89, b'P', b'N', b'G'];
        bytes.extend_from_slice(asset.file_name.as_bytes());
        std::fs::write(dir.join(asset.file_name), bytes).unwrap();
    }
}

/// Counters shared between a mock backend and all surfaces it created.
#[derive(Default)]
pub struct SurfaceLog {
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
    pub pdf_captures: AtomicUsize,
    pub print_calls: AtomicUsize,
    pub surface_ids: Mutex<Vec<SurfaceId>>,
    pub loaded_paths: Mutex<Vec<PathBuf>>,
    pub loaded_documents: Mutex<Vec<String>>,
}

impl SurfaceLog {
    pub fn open_surfaces(&self) -> usize {
        self.created.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct MockBackend {
    pub log: Arc<SurfaceLog>,
    pub print_callback: PrintCallback,
    pub pdf: Result<Vec<u8>, String>,
    pub print_delay: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            log: Arc::new(SurfaceLog::default()),
            print_callback: PrintCallback::succeeded(),
            pdf: Ok(PDF_BYTES.to_vec()),
            print_delay: Duration::ZERO,
        }
    }

    /// Make every print call take `delay` before the callback fires.
    pub fn with_print_delay(mut self, delay: Duration) -> Self {
        self.print_delay = delay;
        self
    }

    pub fn with_print_callback(mut self, callback: PrintCallback) -> Self {
        self.print_callback = callback;
        self
    }

    pub fn with_pdf_error(mut self, message: &str) -> Self {
        self.pdf = Err(message.to_string());
        self
    }
}

#[async_trait]
impl RenderBackend for MockBackend {
    async fn create_surface(
        &self,
        _parent: Option<WindowHandle>,
    ) -> Result<Box<dyn RenderSurface>, PrintError> {
        let id = SurfaceId::next();
        self.log.created.fetch_add(1, Ordering::SeqCst);
        self.log.surface_ids.lock().push(id);
        Ok(Box::new(MockSurface {
            id,
            log: self.log.clone(),
            print_callback: self.print_callback.clone(),
            pdf: self.pdf.clone(),
            print_delay: self.print_delay,
            closed: false,
        }))
    }
}

pub struct MockSurface {
    id: SurfaceId,
    log: Arc<SurfaceLog>,
    print_callback: PrintCallback,
    pdf: Result<Vec<u8>, String>,
    print_delay: Duration,
    closed: bool,
}

#[async_trait]
impl RenderSurface for MockSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    async fn load_file(&mut self, path: &Path) -> Result<(), PrintError> {
        let document = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PrintError::SurfaceLoad(e.to_string()))?;
        self.log.loaded_paths.lock().push(path.to_path_buf());
        if document.contains(FAIL_RENDER_MARKER) {
            return Err(PrintError::SurfaceLoad("ERR_FAILED (-2) loading file".into()));
        }
        self.log.loaded_documents.lock().push(document);
        Ok(())
    }

    async fn execute_javascript(&self, script: &str) -> Result<Value, PrintError> {
        if script.contains("fonts") {
            Ok(json!("loaded"))
        } else {
            Ok(json!([794, 1123]))
        }
    }

    async fn print(&self, _options: &PrintOptions) -> PrintCallback {
        self.log.print_calls.fetch_add(1, Ordering::SeqCst);
        if !self.print_delay.is_zero() {
            tokio::time::sleep(self.print_delay).await;
        }
        self.print_callback.clone()
    }

    async fn print_to_pdf(&self, _options: &PdfOptions) -> Result<Vec<u8>, PrintError> {
        self.log.pdf_captures.fetch_add(1, Ordering::SeqCst);
        self.pdf.clone().map_err(PrintError::PdfCapture)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub enum DialogAnswer {
    Choose(PathBuf),
    Cancel,
    /// Offers a path but reports the dialog as canceled.
    Decline(PathBuf),
    Fail(String),
}

pub struct MockDialog {
    answer: DialogAnswer,
    pub requests: Mutex<Vec<SaveDialogOptions>>,
}

impl MockDialog {
    pub fn choosing(path: impl Into<PathBuf>) -> Self {
        Self::new(DialogAnswer::Choose(path.into()))
    }

    pub fn canceling() -> Self {
        Self::new(DialogAnswer::Cancel)
    }

    pub fn declining(path: impl Into<PathBuf>) -> Self {
        Self::new(DialogAnswer::Decline(path.into()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(DialogAnswer::Fail(message.to_string()))
    }

    fn new(answer: DialogAnswer) -> Self {
        Self {
            answer,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SaveDialog for MockDialog {
    async fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> Result<SaveDialogResult, PrintError> {
        self.requests.lock().push(options);
        match &self.answer {
            DialogAnswer::Choose(path) => Ok(SaveDialogResult::chosen(path.clone())),
            DialogAnswer::Cancel => Ok(SaveDialogResult::canceled()),
            DialogAnswer::Decline(path) => Ok(SaveDialogResult {
                file_path: Some(path.clone()),
                canceled: true,
            }),
            DialogAnswer::Fail(message) => Err(PrintError::Dialog(message.clone())),
        }
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<PrintEvent>>,
}

impl RecordingReporter {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|event| event.name()).collect()
    }
}

impl PrintReporter for RecordingReporter {
    fn report(&self, event: PrintEvent) -> Result<(), DeliveryError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Stands in for a UI whose window was closed mid-job.
pub struct ClosedReporter;

impl PrintReporter for ClosedReporter {
    fn report(&self, _event: PrintEvent) -> Result<(), DeliveryError> {
        Err(DeliveryError::Closed("window destroyed".into()))
    }
}

/// An assets dir, a temp dir and an isolated registry for one test.
pub struct Fixture {
    pub assets: tempfile::TempDir,
    pub temp: tempfile::TempDir,
    pub registry: Arc<TempFileRegistry>,
}

impl Fixture {
    pub fn new() -> Self {
        let assets = tempfile::tempdir().unwrap();
        write_assets(assets.path());
        Self {
            assets,
            temp: tempfile::tempdir().unwrap(),
            registry: Arc::new(TempFileRegistry::new()),
        }
    }

    pub fn pipeline(&self, backend: MockBackend, dialog: Arc<dyn SaveDialog>) -> PrintPipeline {
        PrintPipeline::builder(Arc::new(backend), dialog)
            .assets_dir(self.assets.path())
            .temp_dir(self.temp.path())
            .registry(self.registry.clone())
            .readiness(ReadinessPolicy::immediate())
            .build()
            .unwrap()
    }

    /// Poll until `surfaces` surfaces were created and all of them are
    /// closed, with the registry and temp directory empty.
    pub async fn wait_until_settled(&self, log: &SurfaceLog, surfaces: usize) -> bool {
        for _ in 0..300 {
            if log.created.load(Ordering::SeqCst) == surfaces
                && log.open_surfaces() == 0
                && self.registry.is_empty()
                && self.temp_files() == 0
            {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Files currently present in the job temp directory.
    pub fn temp_files(&self) -> usize {
        std::fs::read_dir(self.temp.path()).unwrap().count()
    }
}
