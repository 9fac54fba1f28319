//! PDFium backed page source.

use std::path::Path;

use image::RgbImage;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::errors::{BoardScanError, ProcessingStage};
use crate::core::traits::PageSource;
use crate::domain::{DocumentId, PageBox, PageId, Rect, Size};
use crate::processors::crop_rect;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to initialize PDFium: {0}")]
    InitError(String),

    #[error("Failed to load PDF: {0}")]
    LoadError(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render page {page}: {message}")]
    RenderError { page: usize, message: String },

    #[error("PDF has no pages")]
    EmptyPdf,
}

impl From<PdfError> for BoardScanError {
    fn from(error: PdfError) -> Self {
        match error {
            PdfError::RenderError { page, message } => BoardScanError::Render { page, message },
            other => BoardScanError::adapter_execution_error("pdfium", ProcessingStage::Rendering, other),
        }
    }
}

/// Longest edge, in pixels, of the full-page bitmap a render may allocate.
const MAX_RENDER_EDGE: f32 = 4096.0;

/// Box edges in PDF user space (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoxEdges {
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
}

impl BoxEdges {
    fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    fn from_pdf_rect(rect: PdfRect) -> Self {
        Self::new(
            rect.left().value,
            rect.bottom().value,
            rect.right().value,
            rect.top().value,
        )
    }

    /// Top-left origin rectangle relative to `origin`'s top-left corner.
    fn relative_to(&self, origin: &BoxEdges) -> Rect {
        Rect::new(
            self.left - origin.left,
            origin.top - self.top,
            self.right - self.left,
            self.top - self.bottom,
        )
    }
}

/// Page boxes in page units, top-left origin relative to the crop box.
///
/// Missing boxes fall back the way PDF viewers resolve them: art box to crop
/// box, crop box to media box.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageGeometry {
    media: Rect,
    crop: Rect,
    art: Rect,
}

impl PageGeometry {
    fn read(page: &PdfPage) -> Self {
        let boundaries = page.boundaries();
        let page_size = Size::new(page.width().value, page.height().value);
        Self::from_boxes(
            page_size,
            boundaries.media().ok().map(|b| BoxEdges::from_pdf_rect(b.bounds)),
            boundaries.crop().ok().map(|b| BoxEdges::from_pdf_rect(b.bounds)),
            boundaries.art().ok().map(|b| BoxEdges::from_pdf_rect(b.bounds)),
        )
    }

    fn from_boxes(
        page_size: Size,
        media: Option<BoxEdges>,
        crop: Option<BoxEdges>,
        art: Option<BoxEdges>,
    ) -> Self {
        let media = media.unwrap_or(BoxEdges::new(0.0, 0.0, page_size.width, page_size.height));
        let crop = crop.unwrap_or(media);
        let art = art.unwrap_or(crop);
        Self {
            media: media.relative_to(&crop),
            crop: crop.relative_to(&crop),
            art: art.relative_to(&crop),
        }
    }

    fn get(&self, page_box: PageBox) -> Rect {
        match page_box {
            PageBox::MediaBox => self.media,
            PageBox::CropBox => self.crop,
            PageBox::ArtBox => self.art,
        }
    }

    /// Scale from page units to pixels that fits `page_box` into `target`.
    ///
    /// The crop box is what PDFium rasterizes, so the scale is lowered when
    /// the full crop box would exceed [`MAX_RENDER_EDGE`].
    fn render_scale(&self, page_box: PageBox, target: Size) -> Option<f32> {
        let region = self.get(page_box);
        let fitted = Size::new(region.width, region.height).fit_within(target)?;
        let scale = fitted.width / region.width;
        let longest = self.crop.width.max(self.crop.height) * scale;
        if longest > MAX_RENDER_EDGE {
            Some(MAX_RENDER_EDGE / self.crop.width.max(self.crop.height))
        } else {
            Some(scale)
        }
    }
}

fn bind_pdfium() -> Result<Pdfium, PdfError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/lib")))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/usr/local/lib"))
        })
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("/opt/homebrew/lib"))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| PdfError::InitError(format!("Could not find PDFium library: {}", e)))?;
    Ok(Pdfium::new(bindings))
}

/// An open PDF document.
///
/// The document bytes are kept in memory and reopened for each render, since
/// a loaded PDFium document borrows the library handle. Renders are
/// serialized behind a mutex.
pub struct PdfiumPageSource {
    id: DocumentId,
    pdfium: Mutex<Pdfium>,
    bytes: Vec<u8>,
    pages: Vec<PageGeometry>,
}

impl PdfiumPageSource {
    /// Opens the PDF file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PdfError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    /// Opens a PDF held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PdfError> {
        if !is_pdf_bytes(&bytes) {
            return Err(PdfError::LoadError("missing %PDF header".to_string()));
        }
        let pdfium = bind_pdfium()?;
        let pages = {
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| PdfError::LoadError(e.to_string()))?;
            document
                .pages()
                .iter()
                .map(|page| PageGeometry::read(&page))
                .collect::<Vec<_>>()
        };
        if pages.is_empty() {
            return Err(PdfError::EmptyPdf);
        }

        let id = DocumentId::next();
        debug!("Opened {} with {} pages", id, pages.len());
        Ok(Self {
            id,
            pdfium: Mutex::new(pdfium),
            bytes,
            pages,
        })
    }

    fn geometry(&self, page: PageId) -> Option<&PageGeometry> {
        if page.document() != self.id {
            return None;
        }
        self.pages.get(page.index())
    }

    fn render(&self, page: PageId, target: Size, page_box: PageBox) -> Result<RgbImage, PdfError> {
        let render_error = |message: String| PdfError::RenderError {
            page: page.index(),
            message,
        };
        let geometry = self
            .geometry(page)
            .ok_or_else(|| render_error("page does not belong to this document".to_string()))?;

        let region = geometry.get(page_box);
        let scale = geometry
            .render_scale(page_box, target)
            .ok_or_else(|| render_error(format!("cannot fit {:?} into {:?}", region, target)))?;

        let full_width = (geometry.crop.width * scale).round().max(1.0) as i32;
        let full_height = (geometry.crop.height * scale).round().max(1.0) as i32;
        let config = PdfRenderConfig::new()
            .set_target_width(full_width)
            .set_target_height(full_height)
            .render_form_data(true)
            .render_annotations(true);

        let rendered = {
            let pdfium = self.pdfium.lock();
            let document = pdfium
                .load_pdf_from_byte_slice(&self.bytes, None)
                .map_err(|e| PdfError::LoadError(e.to_string()))?;
            let pdf_page = document
                .pages()
                .get(page.index() as u16)
                .map_err(|e| render_error(e.to_string()))?;
            let bitmap = pdf_page
                .render_with_config(&config)
                .map_err(|e| render_error(e.to_string()))?;
            bitmap.as_image().to_rgb8()
        };

        if region == geometry.crop {
            return Ok(rendered);
        }
        crop_rect(&rendered, &region.scaled(scale, scale)).map_err(|e| render_error(e.to_string()))
    }
}

impl PageSource for PdfiumPageSource {
    fn document(&self) -> DocumentId {
        self.id
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_bounds(&self, page: PageId, page_box: PageBox) -> Option<Size> {
        self.geometry(page)
            .map(|geometry| geometry.get(page_box))
            .map(|rect| Size::new(rect.width, rect.height))
    }

    fn render_thumbnail(&self, page: PageId, target: Size, page_box: PageBox) -> Option<RgbImage> {
        match self.render(page, target, page_box) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("No thumbnail for {}: {}", page, e);
                None
            }
        }
    }
}

/// Check if bytes represent a PDF file (magic bytes: %PDF)
pub fn is_pdf_bytes(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[0..4] == b"%PDF"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_pdf_bytes() {
        assert!(is_pdf_bytes(b"%PDF-1.7\n"));
        assert!(!is_pdf_bytes(b"PK\x03\x04"));
        assert!(!is_pdf_bytes(b"%P"));
    }

    #[test]
    fn test_rejects_non_pdf_before_binding() {
        let err = PdfiumPageSource::from_bytes(b"not a pdf".to_vec())
            .err()
            .unwrap();
        assert!(matches!(err, PdfError::LoadError(_)));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = PdfiumPageSource::open("no/such/file.pdf").err().unwrap();
        assert!(matches!(err, PdfError::Read { .. }));
    }

    const LETTER: Size = Size {
        width: 612.0,
        height: 792.0,
    };

    fn letter_box() -> BoxEdges {
        BoxEdges::new(0.0, 0.0, 612.0, 792.0)
    }

    #[test]
    fn test_art_box_inset_within_crop_box() {
        let crop = BoxEdges::new(36.0, 36.0, 576.0, 756.0);
        let art = BoxEdges::new(72.0, 100.0, 540.0, 700.0);
        let geometry = PageGeometry::from_boxes(LETTER, Some(letter_box()), Some(crop), Some(art));

        assert_eq!(geometry.crop, Rect::new(0.0, 0.0, 540.0, 720.0));
        assert_eq!(geometry.art, Rect::new(36.0, 56.0, 468.0, 600.0));
    }

    #[test]
    fn test_missing_boxes_fall_back() {
        let crop = BoxEdges::new(36.0, 36.0, 576.0, 756.0);
        let geometry = PageGeometry::from_boxes(LETTER, Some(letter_box()), Some(crop), None);
        assert_eq!(geometry.get(PageBox::ArtBox), geometry.get(PageBox::CropBox));

        let bare = PageGeometry::from_boxes(LETTER, None, None, None);
        let full = Rect::new(0.0, 0.0, 612.0, 792.0);
        assert_eq!(bare.media, full);
        assert_eq!(bare.crop, full);
        assert_eq!(bare.art, full);
    }

    #[test]
    fn test_media_box_larger_than_crop_box() {
        let crop = BoxEdges::new(50.0, 40.0, 562.0, 752.0);
        let geometry = PageGeometry::from_boxes(LETTER, Some(letter_box()), Some(crop), None);

        assert_eq!(geometry.media, Rect::new(-50.0, -40.0, 612.0, 792.0));
        assert_eq!(geometry.get(PageBox::MediaBox).width, 612.0);
        assert_eq!(geometry.get(PageBox::CropBox), Rect::new(0.0, 0.0, 512.0, 712.0));
    }

    #[test]
    fn test_render_scale_fits_requested_box() {
        let geometry = PageGeometry::from_boxes(LETTER, None, None, None);
        let scale = geometry
            .render_scale(PageBox::CropBox, Size::new(448.0, 672.0))
            .unwrap();
        assert!((scale - 448.0 / 612.0).abs() < 1e-6);
    }

    #[test]
    fn test_render_scale_is_capped_for_tiny_boxes() {
        let art = BoxEdges::new(300.0, 400.0, 320.0, 420.0);
        let geometry = PageGeometry::from_boxes(LETTER, None, None, Some(art));

        let scale = geometry
            .render_scale(PageBox::ArtBox, Size::new(896.0, 1344.0))
            .unwrap();
        assert!(792.0 * scale <= MAX_RENDER_EDGE + 0.5);
        assert!((scale - MAX_RENDER_EDGE / 792.0).abs() < 1e-6);
    }

    #[test]
    fn test_render_error_maps_to_render() {
        let err: BoardScanError = PdfError::RenderError {
            page: 3,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(err, BoardScanError::Render { page: 3, .. }));
    }
}
