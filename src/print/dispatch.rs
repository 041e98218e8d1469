//! Output modes for a ready render surface.

use std::sync::Arc;

use super::dialog::{SaveDialog, SaveDialogOptions};
use super::models::{PrintJob, PrintMode, PrintResult};
use super::render::{PdfOptions, PrintOptions, RenderSurface};
use super::PrintError;

const DEFAULT_PRINT_FAILURE: &str = "Print failed";

/// Routes a job to the print subsystem or to a PDF file.
pub struct OutputDispatcher {
    dialog: Arc<dyn SaveDialog>,
    pdf_options: PdfOptions,
}

impl OutputDispatcher {
    pub fn new(dialog: Arc<dyn SaveDialog>) -> Self {
        Self {
            dialog,
            pdf_options: PdfOptions::default(),
        }
    }

    /// Every outcome, including errors, is folded into a [`PrintResult`].
    pub async fn dispatch(&self, job: &PrintJob, surface: &dyn RenderSurface) -> PrintResult {
        match job.mode {
            PrintMode::Print => self.print(job, surface).await,
            PrintMode::SavePdf => match self.save_pdf(job, surface).await {
                Ok(result) => result,
                Err(e) => {
                    log::error!("Saving PDF for job {} failed: {}", job.id, e);
                    PrintResult::failed(e.to_string())
                }
            },
        }
    }

    async fn print(&self, job: &PrintJob, surface: &dyn RenderSurface) -> PrintResult {
        let options = PrintOptions {
            job_title: job.title().to_string(),
            print_background: true,
            silent: false,
        };

        let callback = surface.print(&options).await;
        if callback.success {
            log::info!("Job {} sent to printer", job.id);
            PrintResult::printed()
        } else {
            let reason = callback
                .failure_reason
                .unwrap_or_else(|| DEFAULT_PRINT_FAILURE.to_string());
            log::info!("Job {} was not printed: {}", job.id, reason);
            PrintResult::failed(reason)
        }
    }

    async fn save_pdf(
        &self,
        job: &PrintJob,
        surface: &dyn RenderSurface,
    ) -> Result<PrintResult, PrintError> {
        let choice = self
            .dialog
            .show_save_dialog(SaveDialogOptions::pdf(job.default_pdf_file_name()))
            .await?;

        let path = match choice.file_path {
            Some(path) if !choice.canceled => path,
            _ => {
                log::info!("Save dialog for job {} was canceled", job.id);
                return Ok(PrintResult::canceled());
            }
        };

        let pdf = surface.print_to_pdf(&self.pdf_options).await?;
        tokio::fs::write(&path, &pdf)
            .await
            .map_err(|source| PrintError::PdfWrite {
                path: path.clone(),
                source,
            })?;

        log::info!(
            "Job {} saved {} bytes to {}",
            job.id,
            pdf.len(),
            path.display()
        );
        Ok(PrintResult::saved(path.to_string_lossy()))
    }
}
