//! Headless Chromium render backend.
//!
//! Each surface launches its own browser with a private profile directory,
//! so concurrent jobs never share a page. Printing captures the page as
//! PDF and spools it to the OS print command.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use url::Url;

use super::render::{
    PdfOptions, PrintCallback, PrintOptions, RenderBackend, RenderSurface, SurfaceId, WindowHandle,
};
use super::PrintError;

/// Sends PDF bytes to the system print queue (`lp` by default).
#[derive(Debug, Clone)]
pub struct PrintSpooler {
    command: String,
    printer: Option<String>,
}

impl PrintSpooler {
    pub fn new(command: impl Into<String>, printer: Option<String>) -> Self {
        Self {
            command: command.into(),
            printer,
        }
    }

    /// Feed `pdf` to the spooler on stdin; its exit status decides success.
    pub async fn submit(&self, title: &str, pdf: &[u8]) -> PrintCallback {
        let mut cmd = tokio::process::Command::new(&self.command);
        if let Some(printer) = &self.printer {
            cmd.arg("-d").arg(printer);
        }
        cmd.arg("-t")
            .arg(title)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return PrintCallback::failed(format!(
                    "print subsystem unavailable ({}): {}",
                    self.command, e
                ))
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(pdf).await {
                log::warn!("Print spooler closed its input early: {}", e);
            }
        }

        match child.wait_with_output().await {
            Ok(output) if output.status.success() => PrintCallback::succeeded(),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                if stderr.is_empty() {
                    PrintCallback::failed(format!("print spooler exited with {}", output.status))
                } else {
                    PrintCallback::failed(stderr)
                }
            }
            Err(e) => PrintCallback::failed(format!("print spooler did not finish: {e}")),
        }
    }
}

impl Default for PrintSpooler {
    fn default() -> Self {
        Self::new("lp", None)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChromiumBackend {
    chrome_path: Option<PathBuf>,
    spooler: PrintSpooler,
}

impl ChromiumBackend {
    pub fn new(chrome_path: Option<PathBuf>, spooler: PrintSpooler) -> Self {
        Self {
            chrome_path,
            spooler,
        }
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    async fn create_surface(
        &self,
        parent: Option<WindowHandle>,
    ) -> Result<Box<dyn RenderSurface>, PrintError> {
        if let Some(parent) = parent {
            log::debug!("Headless surface ignores parent window {:?}", parent);
        }

        let profile = tempfile::Builder::new()
            .prefix("print-surface-")
            .tempdir()
            .map_err(|e| PrintError::SurfaceCreate(e.to_string()))?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile.path());
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(PrintError::SurfaceCreate)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PrintError::SurfaceCreate(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    log::warn!("Failed to close browser after page error: {}", close_err);
                }
                handler_task.abort();
                return Err(PrintError::SurfaceCreate(e.to_string()));
            }
        };

        let surface = ChromiumSurface {
            id: SurfaceId::next(),
            browser: Some(browser),
            page: Some(page),
            handler_task: Some(handler_task),
            profile: Some(profile),
            spooler: self.spooler.clone(),
        };
        log::debug!("Launched headless render surface {}", surface.id);

        Ok(Box::new(surface))
    }
}

pub struct ChromiumSurface {
    id: SurfaceId,
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
    profile: Option<TempDir>,
    spooler: PrintSpooler,
}

impl ChromiumSurface {
    fn page(&self) -> Result<&Page, PrintError> {
        self.page
            .as_ref()
            .ok_or_else(|| PrintError::SurfaceLoad(format!("{} is closed", self.id)))
    }
}

#[async_trait]
impl RenderSurface for ChromiumSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    async fn load_file(&mut self, path: &Path) -> Result<(), PrintError> {
        let url = file_url(path)?;
        let page = self.page()?;
        page.goto(url.as_str())
            .await
            .map_err(|e| PrintError::SurfaceLoad(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| PrintError::SurfaceLoad(e.to_string()))?;
        Ok(())
    }

    async fn execute_javascript(&self, script: &str) -> Result<Value, PrintError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(PrintError::SurfaceLoad)?;

        let evaluation = self
            .page()?
            .evaluate_expression(params)
            .await
            .map_err(|e| PrintError::SurfaceLoad(e.to_string()))?;

        Ok(evaluation.value().cloned().unwrap_or(Value::Null))
    }

    /// Headless pages have no print dialog; `silent` is implied.
    async fn print(&self, options: &PrintOptions) -> PrintCallback {
        let pdf_options = PdfOptions {
            print_background: options.print_background,
            ..PdfOptions::default()
        };
        let pdf = match self.print_to_pdf(&pdf_options).await {
            Ok(pdf) => pdf,
            Err(e) => return PrintCallback::failed(e.to_string()),
        };
        self.spooler.submit(&options.job_title, &pdf).await
    }

    async fn print_to_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>, PrintError> {
        let params = PrintToPdfParams::builder()
            .paper_width(options.page_size.width())
            .paper_height(options.page_size.height())
            .margin_top(options.margins.top)
            .margin_right(options.margins.right)
            .margin_bottom(options.margins.bottom)
            .margin_left(options.margins.left)
            .print_background(options.print_background)
            .prefer_css_page_size(options.prefer_css_page_size)
            .build();

        self.page()?
            .pdf(params)
            .await
            .map_err(|e| PrintError::PdfCapture(e.to_string()))
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                log::warn!("Failed to close page on {}: {}", self.id, e);
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                log::warn!("Failed to close browser for {}: {}", self.id, e);
            }
            if let Err(e) = browser.wait().await {
                log::warn!("Browser for {} did not exit cleanly: {}", self.id, e);
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        self.profile.take();
    }
}

impl Drop for ChromiumSurface {
    fn drop(&mut self) {
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

/// `file://` URL for an absolute local path.
pub fn file_url(path: &Path) -> Result<Url, PrintError> {
    Url::from_file_path(path).map_err(|()| {
        PrintError::SurfaceLoad(format!("{} is not an absolute file path", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_file_url_escapes_path() {
        let url = file_url(Path::new("/tmp/ünïcode dir#1/print-1 a.html")).unwrap();
        assert_eq!(url.scheme(), "file");
        assert_eq!(
            url.as_str(),
            "file:///tmp/%C3%BCn%C3%AFcode%20dir%231/print-1%20a.html"
        );
        assert_eq!(
            url.to_file_path().unwrap(),
            Path::new("/tmp/ünïcode dir#1/print-1 a.html")
        );
    }

    #[test]
    fn test_file_url_rejects_relative_path() {
        let err = file_url(Path::new("print-1.html")).unwrap_err();
        assert!(err.to_string().contains("not an absolute file path"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spooler_reports_exit_status() {
        let ok = PrintSpooler::new("true", None).submit("job", b"%PDF-1.7").await;
        assert!(ok.success);

        let failed = PrintSpooler::new("false", None).submit("job", b"%PDF-1.7").await;
        assert!(!failed.success);
        assert!(failed.failure_reason.is_some());
    }

    #[tokio::test]
    async fn test_missing_spooler_is_a_failed_callback() {
        let callback = PrintSpooler::new("definitely-not-a-print-command", None)
            .submit("job", b"%PDF")
            .await;
        assert!(!callback.success);
        assert!(callback
            .failure_reason
            .unwrap()
            .contains("print subsystem unavailable"));
    }
}
