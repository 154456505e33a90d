//! PDF decoding via pdfium.
//!
//! ## Why bind explicitly?
//!
//! `Pdfium::default()` panics when no library can be found. Card making is
//! often run against raster scans only, so binding happens lazily (only when
//! a PDF arrives) and failure is reported as
//! [`CardMakerError::PdfiumBindingFailed`] with instructions instead.
//!
//! Lookup order: explicit path from config, then `PDFIUM_LIB_PATH`, then the
//! system dynamic loader.

use crate::error::CardMakerError;
use crate::pipeline::decoder::{check_index, DocumentDecoder, OpenDocument};
use crate::raster::{scaled_size, RasterImage};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// [`DocumentDecoder`] backed by a bound pdfium library.
pub struct PdfiumDecoder {
    pdfium: Pdfium,
    password: Option<String>,
}

impl std::fmt::Debug for PdfiumDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfiumDecoder")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl PdfiumDecoder {
    /// Bind to pdfium. `lib_path` may name the library file or its directory.
    pub fn bind(lib_path: Option<&Path>, password: Option<String>) -> Result<Self, CardMakerError> {
        let explicit = lib_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium at {}", lib.display());
                Pdfium::bind_to_library(&lib).map_err(|e| {
                    CardMakerError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e))
                })?
            }
            None => Pdfium::bind_to_system_library()
                .map_err(|e| CardMakerError::PdfiumBindingFailed(format!("{:?}", e)))?,
        };

        info!("pdfium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            password,
        })
    }
}

struct PdfiumDocument<'a> {
    name: String,
    document: PdfDocument<'a>,
}

impl DocumentDecoder for PdfiumDecoder {
    fn open<'a>(
        &'a self,
        name: &str,
        bytes: &'a [u8],
    ) -> Result<Box<dyn OpenDocument + 'a>, CardMakerError> {
        let password = self.password.as_deref();
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        CardMakerError::WrongPassword {
                            name: name.to_string(),
                        }
                    } else {
                        CardMakerError::PasswordRequired {
                            name: name.to_string(),
                        }
                    }
                } else {
                    CardMakerError::CorruptDocument {
                        name: name.to_string(),
                        detail: err_str,
                    }
                }
            })?;

        info!("PDF '{}' loaded: {} pages", name, document.pages().len());
        Ok(Box::new(PdfiumDocument {
            name: name.to_string(),
            document,
        }))
    }
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, CardMakerError> {
        check_index(index, self.page_count())?;
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| CardMakerError::Decode {
                page: index,
                detail: format!("{}: {:?}", self.name, e),
            })
    }
}

impl OpenDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<(f32, f32), CardMakerError> {
        let page = self.page(index)?;
        Ok((page.width().value, page.height().value))
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RasterImage, CardMakerError> {
        let page = self.page(index)?;
        let (w, h) = scaled_size(page.width().value, page.height().value, scale).map_err(|e| {
            CardMakerError::Decode {
                page: index,
                detail: e.to_string(),
            }
        })?;

        let render_config = PdfRenderConfig::new().set_target_size(w as i32, h as i32);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| CardMakerError::Decode {
                page: index,
                detail: format!("{:?}", e),
            })?;

        let image = RasterImage::from(bitmap.as_image());
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
