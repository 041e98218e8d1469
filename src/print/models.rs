//! Request, job and result types shared by the print pipeline and its callers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::traits::Validator;

const FALLBACK_FILE_STEM: &str = "document";

/// Output mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PrintMode {
    /// Send the document to the system printer.
    #[serde(rename = "print")]
    Print,
    /// Capture the document as PDF and write it to a chosen path.
    #[serde(rename = "savePDF")]
    SavePdf,
}

impl PrintMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::SavePdf => "savePDF",
        }
    }
}

/// Inbound payload for both calling conventions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrintRequest {
    /// Full HTML fragment to render.
    pub content: String,
    pub mode: PrintMode,
    /// Default file name stem used when saving a PDF.
    #[serde(default)]
    pub name: String,
}

impl PrintRequest {
    pub fn new(content: impl Into<String>, mode: PrintMode, name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mode,
            name: name.into(),
        }
    }
}

impl Validator for PrintRequest {
    fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("print content must not be empty".to_string());
        }
        Ok(())
    }
}

/// Outcome reported to the caller.
///
/// Cancellation is `success: false` with `canceled: true` and no `error`;
/// a genuine failure always carries an `error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PrintResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled: Option<bool>,
}

impl PrintResult {
    pub fn printed() -> Self {
        Self {
            success: true,
            error: None,
            path: None,
            canceled: None,
        }
    }

    pub fn saved(path: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            path: Some(path.into()),
            canceled: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            path: None,
            canceled: None,
        }
    }

    pub fn canceled() -> Self {
        Self {
            success: false,
            error: None,
            path: None,
            canceled: Some(true),
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.unwrap_or(false)
    }
}

/// A single render request as it moves through the pipeline.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: Uuid,
    pub content_html: String,
    pub mode: PrintMode,
    pub output_name: String,
}

impl PrintJob {
    pub fn new(request: PrintRequest) -> Self {
        Self::with_id(Uuid::new_v4(), request)
    }

    pub fn with_id(id: Uuid, request: PrintRequest) -> Self {
        Self {
            id,
            content_html: request.content,
            mode: request.mode,
            output_name: request.name,
        }
    }

    /// File name offered by the save dialog: the sanitized job name plus `.pdf`.
    pub fn default_pdf_file_name(&self) -> String {
        let stem = sanitize_filename::sanitize(self.output_name.trim());
        let stem = stem.trim_end_matches(".pdf").trim();
        let stem = if stem.is_empty() { FALLBACK_FILE_STEM } else { stem };
        format!("{stem}.pdf")
    }

    /// Title used for the assembled document.
    pub fn title(&self) -> &str {
        let name = self.output_name.trim();
        if name.is_empty() {
            FALLBACK_FILE_STEM
        } else {
            name
        }
    }
}
