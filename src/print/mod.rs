//! Print/PDF export pipeline.
//!
//! Turns a caller-supplied HTML fragment into a self-contained document,
//! renders it on an off-screen surface and either prints it or saves it as PDF:
//! - `assets` - reads style sheets and images into an [`AssetBundle`]
//! - `rewriter` - replaces asset references with embedded data URIs
//! - `assembler` - wraps content into a complete print document
//! - `render` - temp file persistence, surface loading and readiness
//! - `dispatch` - print / save-as-PDF output modes
//! - `cleanup` - temp file registry and guaranteed deletion
//! - `pipeline` - the single internal print operation
//! - `protocol` - request/response and fire-and-forget adapters
//! - `handlers` - HTTP routes for the protocol layer

pub mod assembler;
pub mod assets;
pub mod chromium;
pub mod cleanup;
pub mod dialog;
pub mod dispatch;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod protocol;
pub mod render;
pub mod rewriter;
pub mod traits;

pub use assembler::DocumentAssembler;
pub use assets::{AssetBundle, AssetKey, AssetManifest};
pub use cleanup::{TempFileRegistry, TrackedTempFile};
pub use dialog::{ExportDirectoryDialog, SaveDialog, SaveDialogOptions, SaveDialogResult};
pub use models::{PrintJob, PrintMode, PrintRequest, PrintResult};
pub use pipeline::PrintPipeline;
pub use protocol::{PrintEvent, PrintReporter, PrintService};
pub use render::{ReadinessPolicy, RenderBackend, RenderHost, RenderSurface};
pub use rewriter::ContentRewriter;
pub use traits::Validator;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while producing a print job.
#[derive(Debug, Error)]
pub enum PrintError {
    #[error("invalid asset match pattern: {0}")]
    AssetPattern(#[from] regex::Error),
    #[error("invalid print request: {0}")]
    Validation(String),
    #[error("failed to load print asset {}: {source}", path.display())]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write print document to temporary file: {0}")]
    TempFile(#[source] std::io::Error),
    #[error("failed to create render surface: {0}")]
    SurfaceCreate(String),
    #[error("render surface failed to load document: {0}")]
    SurfaceLoad(String),
    #[error("save dialog failed: {0}")]
    Dialog(String),
    #[error("failed to capture PDF: {0}")]
    PdfCapture(String),
    #[error("failed to write PDF to {}: {source}", path.display())]
    PdfWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
