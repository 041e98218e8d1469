//! Calling conventions for print jobs.
//!
//! [`PrintService::invoke`] answers with a [`PrintResult`];
//! [`PrintService::send`] runs the job in the background and reports
//! lifecycle events to an injected [`PrintReporter`]. Both go through the
//! same internal operation.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::models::{PrintJob, PrintMode, PrintRequest, PrintResult};
use super::pipeline::PrintPipeline;
use super::traits::Validator;
use super::PrintError;

/// Lifecycle notification for fire-and-forget jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum PrintEvent {
    #[serde(rename = "printStarted", rename_all = "camelCase")]
    PrintStarted { job_id: Uuid },
    #[serde(rename = "printDone", rename_all = "camelCase")]
    PrintDone { job_id: Uuid },
    #[serde(rename = "printFailed", rename_all = "camelCase")]
    PrintFailed { job_id: Uuid, error: String },
    #[serde(rename = "PDFSaved", rename_all = "camelCase")]
    PdfSaved {
        job_id: Uuid,
        #[serde(flatten)]
        result: PrintResult,
    },
    #[serde(rename = "printProcessError", rename_all = "camelCase")]
    PrintProcessError { job_id: Uuid, error: String },
}

impl PrintEvent {
    pub fn job_id(&self) -> Uuid {
        match self {
            Self::PrintStarted { job_id }
            | Self::PrintDone { job_id }
            | Self::PrintFailed { job_id, .. }
            | Self::PdfSaved { job_id, .. }
            | Self::PrintProcessError { job_id, .. } => *job_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PrintStarted { .. } => "printStarted",
            Self::PrintDone { .. } => "printDone",
            Self::PrintFailed { .. } => "printFailed",
            Self::PdfSaved { .. } => "PDFSaved",
            Self::PrintProcessError { .. } => "printProcessError",
        }
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("no subscriber is listening for print events")]
    NoSubscribers,
    #[error("event receiver is gone: {0}")]
    Closed(String),
}

/// Where lifecycle events go. Delivery is best-effort.
pub trait PrintReporter: Send + Sync {
    fn report(&self, event: PrintEvent) -> Result<(), DeliveryError>;
}

/// Publishes events to a broadcast channel (the SSE endpoint subscribes to it).
#[derive(Debug, Clone)]
pub struct BroadcastReporter {
    sender: broadcast::Sender<PrintEvent>,
}

impl BroadcastReporter {
    pub fn new(sender: broadcast::Sender<PrintEvent>) -> Self {
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PrintEvent> {
        self.sender.subscribe()
    }
}

impl PrintReporter for BroadcastReporter {
    fn report(&self, event: PrintEvent) -> Result<(), DeliveryError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| DeliveryError::NoSubscribers)
    }
}

/// A background job started by [`PrintService::send`].
pub struct PrintTicket {
    pub job_id: Uuid,
    pub handle: JoinHandle<PrintResult>,
}

#[derive(Clone)]
pub struct PrintService {
    pipeline: Arc<PrintPipeline>,
}

impl PrintService {
    pub fn new(pipeline: Arc<PrintPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &Arc<PrintPipeline> {
        &self.pipeline
    }

    /// Request/response: run the job and return its result.
    ///
    /// The job runs on its own task, so a caller that goes away mid-job
    /// does not cut teardown short.
    pub async fn invoke(&self, request: PrintRequest) -> PrintResult {
        let job_id = Uuid::new_v4();
        let service = self.clone();
        let handle = tokio::spawn(async move { service.execute(job_id, request, None).await });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Print job {} task did not complete: {}", job_id, e);
                PrintResult::failed(format!("print job {job_id} did not complete: {e}"))
            }
        }
    }

    /// Fire-and-forget: spawn the job and stream events to `reporter`.
    pub fn send(&self, request: PrintRequest, reporter: Arc<dyn PrintReporter>) -> PrintTicket {
        let job_id = Uuid::new_v4();
        let service = self.clone();
        let handle = tokio::spawn(async move {
            service
                .execute(job_id, request, Some(reporter.as_ref()))
                .await
        });
        PrintTicket { job_id, handle }
    }

    async fn execute(
        &self,
        job_id: Uuid,
        request: PrintRequest,
        reporter: Option<&dyn PrintReporter>,
    ) -> PrintResult {
        log::info!(
            "Print job {} started (mode={}, {} bytes of content)",
            job_id,
            request.mode.as_str(),
            request.content.len()
        );
        deliver(reporter, PrintEvent::PrintStarted { job_id });

        let outcome = match request.validate() {
            Ok(()) => {
                let job = PrintJob::with_id(job_id, request);
                self.pipeline
                    .try_run(&job, None)
                    .await
                    .map(|result| (job.mode, result))
            }
            Err(message) => Err(PrintError::Validation(message)),
        };

        match outcome {
            Ok((mode, result)) => {
                deliver(reporter, completion_event(job_id, mode, &result));
                result
            }
            Err(e) => {
                log::error!("Print job {} failed: {}", job_id, e);
                let error = e.to_string();
                deliver(
                    reporter,
                    PrintEvent::PrintProcessError {
                        job_id,
                        error: error.clone(),
                    },
                );
                PrintResult::failed(error)
            }
        }
    }
}

fn completion_event(job_id: Uuid, mode: PrintMode, result: &PrintResult) -> PrintEvent {
    match mode {
        PrintMode::Print if result.success => PrintEvent::PrintDone { job_id },
        PrintMode::Print => PrintEvent::PrintFailed {
            job_id,
            error: result.error.clone().unwrap_or_default(),
        },
        PrintMode::SavePdf => PrintEvent::PdfSaved {
            job_id,
            result: result.clone(),
        },
    }
}

fn deliver(reporter: Option<&dyn PrintReporter>, event: PrintEvent) {
    let Some(reporter) = reporter else {
        return;
    };
    let name = event.name();
    let job_id = event.job_id();
    if let Err(e) = reporter.report(event) {
        log::warn!("Dropped {} event for job {}: {}", name, job_id, e);
    }
}
