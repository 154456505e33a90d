//! Input resolution: turn a user-supplied file into a classified document.
//!
//! The pipeline accepts two kinds of input: a paginated PDF, or a single
//! raster image (PNG/JPEG) that behaves like a one-page document. We check
//! magic bytes up front so callers get a meaningful error rather than a
//! decoder failure deep inside rasterisation.

use crate::error::CardMakerError;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// What kind of document the bytes contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Classify raw bytes by their magic number.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(DocumentKind::Pdf);
        }
        match image::guess_format(bytes).ok()? {
            ImageFormat::Png => Some(DocumentKind::Png),
            ImageFormat::Jpeg => Some(DocumentKind::Jpeg),
            _ => None,
        }
    }

    pub fn is_pdf(self) -> bool {
        self == DocumentKind::Pdf
    }
}

/// A loaded, classified input document.
///
/// Bytes are shared so the blocking render workers can hold them without
/// copying.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub kind: DocumentKind,
    pub bytes: Arc<[u8]>,
}

impl SourceDocument {
    /// Classify in-memory bytes. `name` is used in labels and error messages.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self, CardMakerError> {
        let name = name.into();
        let bytes: Vec<u8> = bytes.into();
        let kind = DocumentKind::sniff(&bytes).ok_or_else(|| CardMakerError::UnsupportedInput {
            name: name.clone(),
            magic: bytes.iter().take(4).copied().collect(),
        })?;
        debug!("Classified '{}' as {:?} ({} bytes)", name, kind, bytes.len());
        Ok(Self {
            name,
            kind,
            bytes: Arc::from(bytes),
        })
    }
}

/// Read a local file and classify it.
pub async fn load_input(path: impl AsRef<Path>) -> Result<SourceDocument, CardMakerError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| map_read_error(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    debug!("Read input {}", path.display());
    SourceDocument::from_bytes(name, bytes)
}

fn map_read_error(path: &Path, e: std::io::Error) -> CardMakerError {
    let path = PathBuf::from(path);
    match e.kind() {
        std::io::ErrorKind::NotFound => CardMakerError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => CardMakerError::PermissionDenied { path },
        _ => CardMakerError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn sniffs_pdf_and_images() {
        assert_eq!(DocumentKind::sniff(b"%PDF-1.7\n"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::sniff(&png_bytes()), Some(DocumentKind::Png));
        assert_eq!(
            DocumentKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]),
            Some(DocumentKind::Jpeg)
        );
        assert_eq!(DocumentKind::sniff(b"hello"), None);
    }

    #[test]
    fn unsupported_bytes_report_magic() {
        let err = SourceDocument::from_bytes("notes.txt", b"hello".to_vec()).unwrap_err();
        match err {
            CardMakerError::UnsupportedInput { name, magic } => {
                assert_eq!(name, "notes.txt");
                assert_eq!(magic, b"hell".to_vec());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = load_input("/definitely/not/here.pdf").await.unwrap_err();
        assert!(matches!(err, CardMakerError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn loads_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let doc = load_input(&path).await.unwrap();
        assert_eq!(doc.kind, DocumentKind::Png);
        assert_eq!(doc.name, "scan.png");
    }
}
