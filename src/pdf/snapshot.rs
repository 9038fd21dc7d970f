//! PDF from a raster capture of the form.
//!
//! The capture is scaled to the printable A4 width and cut into page-high
//! bands; each band becomes one page.

use image::{imageops, DynamicImage, GenericImageView};
use log::debug;
use printpdf::{Image, ImageTransform, Mm, PdfDocument};

use super::layout::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::error::{DailyworkError, Result};

pub const SNAPSHOT_MARGIN_MM: f64 = 10.0;
pub const SNAPSHOT_WIDTH_MM: f64 = PAGE_WIDTH_MM - 2.0 * SNAPSHOT_MARGIN_MM;
pub const SNAPSHOT_PAGE_HEIGHT_MM: f64 = PAGE_HEIGHT_MM - 2.0 * SNAPSHOT_MARGIN_MM;

const MM_PER_INCH: f64 = 25.4;

/// One horizontal band of the source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub y: u32,
    pub height: u32,
}

/// Cuts an image of `width` x `height` pixels into page bands, top to bottom.
///
/// Bands are contiguous and the last one may be shorter.
pub fn page_slices(width: u32, height: u32) -> Vec<PageSlice> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let band = (SNAPSHOT_PAGE_HEIGHT_MM * width as f64 / SNAPSHOT_WIDTH_MM).floor() as u32;
    let band = band.max(1);

    let mut slices = Vec::new();
    let mut y = 0;
    while y < height {
        let h = band.min(height - y);
        slices.push(PageSlice { y, height: h });
        y += h;
    }
    slices
}

/// Renders the capture as a paginated PDF.
pub fn render_snapshot(capture: &DynamicImage) -> Result<Vec<u8>> {
    let (width, height) = capture.dimensions();
    let slices = page_slices(width, height);
    if slices.is_empty() {
        return Err(DailyworkError::Pdf("snapshot image is empty".to_string()));
    }
    let mm_per_px = SNAPSHOT_WIDTH_MM / width as f64;
    let dpi = (MM_PER_INCH / mm_per_px) as f32;
    debug!(
        "Snapshot {}x{} px across {} page(s) at {:.1} dpi",
        width,
        height,
        slices.len(),
        dpi
    );

    let (doc, first_page, first_layer) = PdfDocument::new(
        "dailywork",
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "Layer 1",
    );

    for (i, slice) in slices.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM as f32),
                Mm(PAGE_HEIGHT_MM as f32),
                format!("Layer {}", i + 1),
            );
            doc.get_page(page).get_layer(layer)
        };

        let band = imageops::crop_imm(capture, 0, slice.y, width, slice.height).to_image();
        let band = DynamicImage::ImageRgba8(band).to_rgb8();
        let image = Image::from_dynamic_image(&DynamicImage::ImageRgb8(band));

        let band_height_mm = slice.height as f64 * mm_per_px;
        image.add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(SNAPSHOT_MARGIN_MM as f32)),
                translate_y: Some(Mm(
                    (PAGE_HEIGHT_MM - SNAPSHOT_MARGIN_MM - band_height_mm) as f32
                )),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_cover_the_image_exactly_once() {
        let slices = page_slices(760, 3000);
        // 277 / 190 * 760 = 1108 px per page
        assert_eq!(
            slices,
            vec![
                PageSlice { y: 0, height: 1108 },
                PageSlice { y: 1108, height: 1108 },
                PageSlice { y: 2216, height: 784 },
            ]
        );
        let total: u32 = slices.iter().map(|s| s.height).sum();
        assert_eq!(total, 3000);
    }

    #[test]
    fn short_image_is_one_page() {
        assert_eq!(page_slices(190, 50), vec![PageSlice { y: 0, height: 50 }]);
        assert!(page_slices(0, 50).is_empty());
    }

    #[test]
    fn renders_a_pdf() {
        let capture = DynamicImage::new_rgb8(40, 100);
        let bytes = render_snapshot(&capture).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
