//! Off-screen rendering of assembled documents.
//!
//! The [`RenderHost`] persists a document to a uniquely named temp file,
//! loads it into a fresh [`RenderSurface`] and waits until fonts and
//! layout have settled before handing the surface to the dispatcher.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::cleanup::{TempFileRegistry, TrackedTempFile};
use super::PrintError;

const FONT_READY_SCRIPT: &str =
    "document.fonts ? document.fonts.ready.then(() => document.fonts.status) : 'loaded'";
const LAYOUT_PROBE_SCRIPT: &str =
    "document.documentElement ? [document.documentElement.scrollWidth, document.documentElement.scrollHeight] : [0, 0]";

/// Handle of the window a surface should be parented to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// Opaque identifier of a render surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Paper sizes for PDF capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    /// 210 x 297 mm
    A4,
    /// Width x height in inches
    Custom { width: f64, height: f64 },
}

impl PageSize {
    /// Width in inches.
    pub fn width(&self) -> f64 {
        match self {
            Self::A4 => 8.27,
            Self::Custom { width, .. } => *width,
        }
    }

    /// Height in inches.
    pub fn height(&self) -> f64 {
        match self {
            Self::A4 => 11.69,
            Self::Custom { height, .. } => *height,
        }
    }
}

/// Margins in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub const fn zero() -> Self {
        Self {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub page_size: PageSize,
    pub margins: Margins,
    pub print_background: bool,
    pub prefer_css_page_size: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margins: Margins::zero(),
            print_background: true,
            prefer_css_page_size: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintOptions {
    pub job_title: String,
    pub print_background: bool,
    /// Print without showing the system print dialog.
    pub silent: bool,
}

/// What the OS print subsystem reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintCallback {
    pub success: bool,
    pub failure_reason: Option<String>,
}

impl PrintCallback {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            failure_reason: Some(reason.into()),
        }
    }
}

/// A hidden page that can load a file and print or capture it.
#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn id(&self) -> SurfaceId;

    async fn load_file(&mut self, path: &Path) -> Result<(), PrintError>;

    async fn execute_javascript(&self, script: &str) -> Result<Value, PrintError>;

    /// Hand the page to the system print subsystem. Never returns an error;
    /// failures and user cancellation arrive as an unsuccessful callback.
    async fn print(&self, options: &PrintOptions) -> PrintCallback;

    async fn print_to_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>, PrintError>;

    /// Tear the surface down. Must be safe to call more than once.
    async fn close(&mut self);
}

/// Factory for render surfaces.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn create_surface(
        &self,
        parent: Option<WindowHandle>,
    ) -> Result<Box<dyn RenderSurface>, PrintError>;
}

/// When a loaded surface counts as ready to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Fixed wait after the font probe resolves.
    pub settle_delay: Duration,
    /// Gap between layout samples.
    pub stability_interval: Duration,
    /// Upper bound for the layout poll.
    pub stability_timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(500),
            stability_interval: Duration::from_millis(100),
            stability_timeout: Duration::from_millis(3000),
        }
    }
}

impl ReadinessPolicy {
    /// No settle delay and a tight poll. Used by tests and previews.
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            stability_interval: Duration::ZERO,
            stability_timeout: Duration::from_millis(250),
        }
    }
}

/// A loaded surface plus the temp file backing it.
pub struct RenderedDocument {
    surface: Box<dyn RenderSurface>,
    temp: TrackedTempFile,
}

impl RenderedDocument {
    pub fn surface(&self) -> &dyn RenderSurface {
        self.surface.as_ref()
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Close the surface, then delete the temp file.
    pub async fn teardown(self) {
        let RenderedDocument { mut surface, temp } = self;
        let id = surface.id();
        surface.close().await;
        log::debug!("Closed render surface {}", id);
        temp.release().await;
    }
}

pub struct RenderHost {
    backend: Arc<dyn RenderBackend>,
    registry: Arc<TempFileRegistry>,
    temp_dir: PathBuf,
    readiness: ReadinessPolicy,
}

impl RenderHost {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        registry: Arc<TempFileRegistry>,
        temp_dir: impl Into<PathBuf>,
        readiness: ReadinessPolicy,
    ) -> Self {
        Self {
            backend,
            registry,
            temp_dir: temp_dir.into(),
            readiness,
        }
    }

    pub fn registry(&self) -> &Arc<TempFileRegistry> {
        &self.registry
    }

    /// Persist, load and settle `document` on a new surface.
    ///
    /// A temp file write failure happens before any surface exists. A load
    /// failure closes the surface and deletes the temp file before returning.
    pub async fn render(
        &self,
        job_id: Uuid,
        document: String,
        parent: Option<WindowHandle>,
    ) -> Result<RenderedDocument, PrintError> {
        let temp = self.persist(job_id, document).await?;

        let mut surface = match self.backend.create_surface(parent).await {
            Ok(surface) => surface,
            Err(e) => {
                temp.release().await;
                return Err(e);
            }
        };

        if let Err(e) = surface.load_file(temp.path()).await {
            log::error!(
                "Render surface {} could not load {}: {}",
                surface.id(),
                temp.path().display(),
                e
            );
            surface.close().await;
            temp.release().await;
            return Err(e);
        }

        self.wait_until_ready(surface.as_ref()).await;
        log::debug!("Render surface {} ready for job {}", surface.id(), job_id);

        Ok(RenderedDocument { surface, temp })
    }

    async fn persist(&self, job_id: Uuid, document: String) -> Result<TrackedTempFile, PrintError> {
        let dir = self.temp_dir.clone();
        let prefix = format!("print-{job_id}-");

        let temp = tokio::task::spawn_blocking(move || -> std::io::Result<tempfile::TempPath> {
            let mut file = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(".html")
                .tempfile_in(&dir)?;
            file.write_all(document.as_bytes())?;
            file.flush()?;
            Ok(file.into_temp_path())
        })
        .await
        .map_err(|e| PrintError::TempFile(std::io::Error::other(e)))?
        .map_err(PrintError::TempFile)?;

        Ok(TrackedTempFile::track(temp, self.registry.clone()))
    }

    async fn wait_until_ready(&self, surface: &dyn RenderSurface) {
        match surface.execute_javascript(FONT_READY_SCRIPT).await {
            Ok(status) => log::debug!("Fonts settled on {}: {}", surface.id(), status),
            Err(e) => log::warn!("Font readiness probe failed on {}: {}", surface.id(), e),
        }

        if !self.readiness.settle_delay.is_zero() {
            tokio::time::sleep(self.readiness.settle_delay).await;
        }

        self.wait_for_stable_layout(surface).await;
    }

    async fn wait_for_stable_layout(&self, surface: &dyn RenderSurface) {
        let deadline = Instant::now() + self.readiness.stability_timeout;
        let mut previous: Option<Value> = None;

        loop {
            let sample = match surface.execute_javascript(LAYOUT_PROBE_SCRIPT).await {
                Ok(sample) => sample,
                Err(e) => {
                    log::warn!("Layout probe failed on {}: {}", surface.id(), e);
                    return;
                }
            };

            if previous.as_ref() == Some(&sample) {
                return;
            }
            previous = Some(sample);

            if Instant::now() >= deadline {
                log::warn!(
                    "Layout on {} still changing after {:?}; capturing anyway",
                    surface.id(),
                    self.readiness.stability_timeout
                );
                return;
            }

            tokio::time::sleep(self.readiness.stability_interval).await;
        }
    }
}
