//! Shared application state handed to every HTTP handler.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::print::chromium::{ChromiumBackend, PrintSpooler};
use crate::print::protocol::BroadcastReporter;
use crate::print::{
    ExportDirectoryDialog, PrintError, PrintPipeline, PrintService, TempFileRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub service: PrintService,
    pub reporter: BroadcastReporter,
}

impl AppState {
    pub fn new(service: PrintService, reporter: BroadcastReporter) -> Self {
        Self { service, reporter }
    }

    /// Wire the headless Chromium backend and export directory from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, PrintError> {
        let backend = ChromiumBackend::new(
            config.chrome_path.clone(),
            PrintSpooler::new(config.print_command.clone(), config.printer_name.clone()),
        );
        let dialog = ExportDirectoryDialog::new(config.export_dir.clone());

        let pipeline = PrintPipeline::builder(Arc::new(backend), Arc::new(dialog))
            .assets_dir(config.assets_dir.clone())
            .temp_dir(config.temp_dir.clone())
            .registry(TempFileRegistry::global())
            .readiness(config.readiness)
            .build()?;

        let (sender, _receiver) = broadcast::channel(config.event_channel_capacity);

        Ok(Self::new(
            PrintService::new(Arc::new(pipeline)),
            BroadcastReporter::new(sender),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_builds_from_default_config() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert!(AppState::from_config(&config).is_ok());
    }

    #[test]
    fn test_pattern_errors_surface_as_print_errors() {
        let err: PrintError = regex::Regex::new("(").unwrap_err().into();
        assert!(err.to_string().starts_with("invalid asset match pattern"));
    }
}
