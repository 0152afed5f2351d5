//! PDF rasterisation: render single pages to image files via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while rasterising. Every call runs on tokio's blocking
//! pool so the async workers never stall on a large page.
//!
//! ## Why files?
//!
//! Rendered pages are written into the quiz's scratch directory and handed
//! around as paths. The pipeline records every path and deletes them during
//! cleanup, so peak memory stays at one page image rather than a whole
//! cluster of decoded bitmaps.

use crate::error::RenderError;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Output image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Rasterisation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Rendering density in DPI. Range: 72–400. Default: 150.
    pub density: u32,
    /// Maximum image width in pixels. Default: 2000.
    pub width: u32,
    /// Maximum image height in pixels. Default: 2000.
    pub height: u32,
    pub format: ImageFormat,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            density: 150,
            width: 2000,
            height: 2000,
            format: ImageFormat::Png,
        }
    }
}

/// A page rendered to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// 1-indexed page number.
    pub page: usize,
    pub path: PathBuf,
    pub format: ImageFormat,
}

/// Page rasterisation backend.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, document: Arc<[u8]>) -> Result<usize, RenderError>;

    /// Render 1-indexed `page` into an image file inside `dest_dir`.
    async fn render_page(
        &self,
        document: Arc<[u8]>,
        page: usize,
        opts: &RenderOptions,
        dest_dir: &Path,
    ) -> Result<RenderedPage, RenderError>;
}

/// Renderer backed by the pdfium library.
///
/// The library is bound with `Pdfium::default()`, which looks for libpdfium
/// next to the executable and on the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn page_count(&self, document: Arc<[u8]>) -> Result<usize, RenderError> {
        tokio::task::spawn_blocking(move || page_count_blocking(&document))
            .await
            .map_err(|e| RenderError::Unreadable {
                detail: format!("page count task panicked: {e}"),
            })?
    }

    async fn render_page(
        &self,
        document: Arc<[u8]>,
        page: usize,
        opts: &RenderOptions,
        dest_dir: &Path,
    ) -> Result<RenderedPage, RenderError> {
        let opts = *opts;
        let path = dest_dir.join(format!("page-{page:04}.{}", opts.format.extension()));
        let out = path.clone();

        tokio::task::spawn_blocking(move || render_page_blocking(&document, page, &opts, &out))
            .await
            .map_err(|e| RenderError::Page {
                page,
                detail: format!("render task panicked: {e}"),
            })??;

        Ok(RenderedPage {
            page,
            path,
            format: opts.format,
        })
    }
}

fn page_count_blocking(document: &[u8]) -> Result<usize, RenderError> {
    let pdfium = Pdfium::default();
    let doc = pdfium
        .load_pdf_from_byte_slice(document, None)
        .map_err(|e| RenderError::Unreadable {
            detail: format!("{:?}", e),
        })?;
    Ok(doc.pages().len() as usize)
}

fn render_page_blocking(
    document: &[u8],
    page: usize,
    opts: &RenderOptions,
    out: &Path,
) -> Result<(), RenderError> {
    let page_err = |detail: String| RenderError::Page { page, detail };

    let pdfium = Pdfium::default();
    let doc = pdfium
        .load_pdf_from_byte_slice(document, None)
        .map_err(|e| page_err(format!("{:?}", e)))?;

    let index = page
        .checked_sub(1)
        .and_then(|i| u16::try_from(i).ok())
        .ok_or_else(|| page_err("page number out of range".into()))?;
    let pdf_page = doc
        .pages()
        .get(index)
        .map_err(|e| page_err(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(opts.density as f32 / 72.0)
        .set_maximum_width(opts.width as i32)
        .set_maximum_height(opts.height as i32);

    let bitmap = pdf_page
        .render_with_config(&render_config)
        .map_err(|e| page_err(format!("{:?}", e)))?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page,
        image.width(),
        image.height()
    );

    save_image(&image, opts.format, out).map_err(|e| page_err(e.to_string()))
}

/// Write `image` to `out` in the requested format. JPEG has no alpha
/// channel, so RGBA bitmaps are flattened to RGB first.
fn save_image(image: &DynamicImage, format: ImageFormat, out: &Path) -> Result<(), image::ImageError> {
    match format {
        ImageFormat::Png => image.save_with_format(out, image::ImageFormat::Png),
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .save_with_format(out, image::ImageFormat::Jpeg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn default_options() {
        let o = RenderOptions::default();
        assert_eq!(o.density, 150);
        assert_eq!((o.width, o.height), (2000, 2000));
        assert_eq!(o.format, ImageFormat::Png);
    }

    #[test]
    fn format_metadata() {
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn save_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255])));

        let png = dir.path().join("p.png");
        save_image(&img, ImageFormat::Png, &png).unwrap();
        assert!(std::fs::metadata(&png).unwrap().len() > 0);

        let jpg = dir.path().join("p.jpg");
        save_image(&img, ImageFormat::Jpeg, &jpg).unwrap();
        assert!(std::fs::metadata(&jpg).unwrap().len() > 0);
    }
}
