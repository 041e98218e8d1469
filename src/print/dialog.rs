//! Save-file dialog capability.

use async_trait::async_trait;
use std::path::PathBuf;

use super::PrintError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDialogOptions {
    pub title: String,
    pub default_file_name: String,
    pub filters: Vec<FileFilter>,
}

impl SaveDialogOptions {
    /// Options for saving a PDF under `default_file_name`.
    pub fn pdf(default_file_name: impl Into<String>) -> Self {
        Self {
            title: "Save as PDF".to_string(),
            default_file_name: default_file_name.into(),
            filters: vec![FileFilter {
                name: "PDF Files".to_string(),
                extensions: vec!["pdf".to_string()],
            }],
        }
    }
}

/// What the user picked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveDialogResult {
    pub file_path: Option<PathBuf>,
    pub canceled: bool,
}

impl SaveDialogResult {
    pub fn chosen(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(path.into()),
            canceled: false,
        }
    }

    pub fn canceled() -> Self {
        Self {
            file_path: None,
            canceled: true,
        }
    }
}

/// Asks where a file should be written.
#[async_trait]
pub trait SaveDialog: Send + Sync {
    async fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> Result<SaveDialogResult, PrintError>;
}

/// Non-interactive dialog that always answers `<dir>/<default file name>`.
#[derive(Debug, Clone)]
pub struct ExportDirectoryDialog {
    dir: PathBuf,
}

impl ExportDirectoryDialog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SaveDialog for ExportDirectoryDialog {
    async fn show_save_dialog(
        &self,
        options: SaveDialogOptions,
    ) -> Result<SaveDialogResult, PrintError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            PrintError::Dialog(format!(
                "cannot prepare export directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;
        Ok(SaveDialogResult::chosen(
            self.dir.join(&options.default_file_name),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_options_filter_pdf_only() {
        let options = SaveDialogOptions::pdf("Quote 7.pdf");
        assert_eq!(options.default_file_name, "Quote 7.pdf");
        assert_eq!(options.filters.len(), 1);
        assert_eq!(options.filters[0].extensions, vec!["pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_export_directory_dialog_creates_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("exports").join("2026");
        let dialog = ExportDirectoryDialog::new(&dir);

        let result = dialog
            .show_save_dialog(SaveDialogOptions::pdf("invoice.pdf"))
            .await
            .unwrap();

        assert!(!result.canceled);
        assert_eq!(result.file_path, Some(dir.join("invoice.pdf")));
        assert!(dir.is_dir());
    }
}
