//! Asset loading for print documents.
//!
//! Every request reads the style sheets and images listed in the
//! [`AssetManifest`] straight from disk and turns the images into
//! `data:` URIs, so the assembled document has no file dependencies.
//! Nothing is cached between requests.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::{Path, PathBuf};

use super::PrintError;

/// Logical name of an embeddable image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Icon,
    IconAlt,
    Logo,
    QrCode,
}

/// One row of the manifest: which file backs which logical image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageAsset {
    pub key: AssetKey,
    pub file_name: &'static str,
}

/// Declarative list of every file the pipeline inlines.
#[derive(Debug, Clone, Copy)]
pub struct AssetManifest {
    pub images: &'static [ImageAsset],
    pub style_sheets: &'static [&'static str],
}

impl AssetManifest {
    /// The assets shipped with the application.
    pub const STANDARD: AssetManifest = AssetManifest {
        images: &[
            ImageAsset {
                key: AssetKey::Icon,
                file_name: "icon.png",
            },
            ImageAsset {
                key: AssetKey::IconAlt,
                file_name: "icon-alt.png",
            },
            ImageAsset {
                key: AssetKey::Logo,
                file_name: "logo.png",
            },
            ImageAsset {
                key: AssetKey::QrCode,
                file_name: "qr-code.png",
            },
        ],
        style_sheets: &["styles.css", "documents.css"],
    };
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// An image ready to be referenced from HTML or CSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    pub key: AssetKey,
    pub file_name: String,
    pub data_uri: String,
}

/// Style text and embedded images produced for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBundle {
    pub combined_style_text: String,
    images: Vec<EmbeddedImage>,
}

impl AssetBundle {
    pub fn new(combined_style_text: impl Into<String>, images: Vec<EmbeddedImage>) -> Self {
        Self {
            combined_style_text: combined_style_text.into(),
            images,
        }
    }

    pub fn images(&self) -> &[EmbeddedImage] {
        &self.images
    }

    pub fn image(&self, key: AssetKey) -> Option<&EmbeddedImage> {
        self.images.iter().find(|image| image.key == key)
    }

    pub fn icon_ref(&self) -> &str {
        self.data_uri(AssetKey::Icon)
    }

    pub fn icon_alt_ref(&self) -> &str {
        self.data_uri(AssetKey::IconAlt)
    }

    pub fn logo_ref(&self) -> &str {
        self.data_uri(AssetKey::Logo)
    }

    pub fn qr_code_ref(&self) -> &str {
        self.data_uri(AssetKey::QrCode)
    }

    fn data_uri(&self, key: AssetKey) -> &str {
        self.image(key)
            .map(|image| image.data_uri.as_str())
            .unwrap_or_default()
    }
}

/// Encode raw bytes as a `data:` URI, guessing the MIME type from the file name.
pub fn to_data_uri(file_name: &str, bytes: &[u8]) -> String {
    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    format!("data:{};base64,{}", mime.essence_str(), BASE64.encode(bytes))
}

/// Reads the manifest's files from an assets directory.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    dir: PathBuf,
    manifest: AssetManifest,
}

impl AssetLoader {
    pub fn new(dir: impl Into<PathBuf>, manifest: AssetManifest) -> Self {
        Self {
            dir: dir.into(),
            manifest,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Load a fresh bundle. Fails on the first missing or unreadable file.
    pub async fn load(&self) -> Result<AssetBundle, PrintError> {
        let mut styles = Vec::with_capacity(self.manifest.style_sheets.len());
        for sheet in self.manifest.style_sheets {
            let path = self.dir.join(sheet);
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| asset_error(path, source))?;
            styles.push(text);
        }

        let mut images = Vec::with_capacity(self.manifest.images.len());
        for asset in self.manifest.images {
            let path = self.dir.join(asset.file_name);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|source| asset_error(path, source))?;
            images.push(EmbeddedImage {
                key: asset.key,
                file_name: asset.file_name.to_string(),
                data_uri: to_data_uri(asset.file_name, &bytes),
            });
        }

        log::debug!(
            "Loaded {} style sheets and {} images from {}",
            styles.len(),
            images.len(),
            self.dir.display()
        );

        Ok(AssetBundle::new(styles.join("\n"), images))
    }
}

fn asset_error(path: PathBuf, source: std::io::Error) -> PrintError {
    log::error!("Print asset unavailable at {}: {}", path.display(), source);
    PrintError::AssetLoad { path, source }
}

/// Default assets directory bundled with the crate.
pub fn default_assets_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))
}
