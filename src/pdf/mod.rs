//! PDF export: a laid-out report, or a paginated snapshot image.

pub mod layout;
pub mod snapshot;

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, warn};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rect, Rgb,
};

use crate::config::PdfConfig;
use crate::error::Result;
use crate::models::WorkRecord;
use layout::{DrawOp, Labels, Page, ReportLayout, Rgb8, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};

pub use snapshot::{page_slices, render_snapshot, PageSlice};

/// Well-known Hangul fonts, tried in order when none is configured.
const SYSTEM_FONTS: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
        "/usr/share/fonts/truetype/nanum/NanumGothicBold.ttf",
    ),
    (
        "/usr/share/fonts/nanum/NanumGothic.ttf",
        "/usr/share/fonts/nanum/NanumGothicBold.ttf",
    ),
    (
        "/Library/Fonts/NanumGothic.ttf",
        "/Library/Fonts/NanumGothicBold.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/AppleGothic.ttf",
        "/System/Library/Fonts/Supplemental/AppleGothic.ttf",
    ),
    ("C:\\Windows\\Fonts\\malgun.ttf", "C:\\Windows\\Fonts\\malgunbd.ttf"),
];

#[derive(Debug, Clone)]
enum FontSource {
    /// Helvetica from the PDF base-14 set; ASCII only.
    Helvetica { bold: bool },
    TrueType(Vec<u8>),
}

impl FontSource {
    fn embed(&self, doc: &PdfDocumentReference) -> Result<IndirectFontRef> {
        Ok(match self {
            FontSource::Helvetica { bold: false } => doc.add_builtin_font(BuiltinFont::Helvetica)?,
            FontSource::Helvetica { bold: true } => {
                doc.add_builtin_font(BuiltinFont::HelveticaBold)?
            }
            FontSource::TrueType(bytes) => doc.add_external_font(Cursor::new(bytes.as_slice()))?,
        })
    }
}

/// Regular and bold faces used by the report.
#[derive(Debug, Clone)]
pub struct FontSet {
    regular: FontSource,
    bold: FontSource,
}

impl FontSet {
    pub fn builtin() -> Self {
        FontSet {
            regular: FontSource::Helvetica { bold: false },
            bold: FontSource::Helvetica { bold: true },
        }
    }

    /// Loads TrueType faces. Without a bold file the regular face is used for both.
    pub fn from_files(regular: &Path, bold: Option<&Path>) -> Result<Self> {
        let regular_bytes = fs::read(regular)?;
        let bold_bytes = match bold {
            Some(path) => fs::read(path)?,
            None => regular_bytes.clone(),
        };
        Ok(FontSet {
            regular: FontSource::TrueType(regular_bytes),
            bold: FontSource::TrueType(bold_bytes),
        })
    }

    /// Configured fonts, else the first installed system font, else Helvetica.
    pub fn resolve(config: &PdfConfig) -> Result<Self> {
        if let Some(font) = &config.font {
            debug!("Using configured PDF font {}", font.display());
            return Self::from_files(font, config.bold_font.as_deref());
        }
        for &(regular, bold) in SYSTEM_FONTS {
            let regular = PathBuf::from(regular);
            if regular.exists() {
                debug!("Using system PDF font {}", regular.display());
                let bold = PathBuf::from(bold);
                let bold = bold.exists().then_some(bold.as_path());
                return Self::from_files(&regular, bold);
            }
        }
        warn!("No Hangul font found; the PDF uses Helvetica and English labels. Set [pdf] font in config.toml.");
        Ok(Self::builtin())
    }

    /// Whether the faces can show non-ASCII text.
    pub fn is_unicode(&self) -> bool {
        matches!(self.regular, FontSource::TrueType(_))
    }

    pub fn labels(&self) -> Labels {
        if self.is_unicode() {
            Labels::korean()
        } else {
            Labels::english()
        }
    }
}

/// Replaces what the base-14 fonts cannot encode with `?`.
fn ascii_only(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

fn color(c: Rgb8) -> Color {
    Color::Rgb(Rgb::new(
        c.0 as f32 / 255.0,
        c.1 as f32 / 255.0,
        c.2 as f32 / 255.0,
        None,
    ))
}

struct Faces {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    unicode: bool,
}

fn draw_page(layer: &PdfLayerReference, page: &Page, faces: &Faces) {
    for op in &page.ops {
        match op {
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let mode = match (fill, stroke) {
                    (Some(_), Some(_)) => PaintMode::FillStroke,
                    (Some(_), None) => PaintMode::Fill,
                    (None, Some(_)) => PaintMode::Stroke,
                    (None, None) => continue,
                };
                if let Some(fill) = fill {
                    layer.set_fill_color(color(*fill));
                }
                if let Some(stroke) = stroke {
                    layer.set_outline_color(color(*stroke));
                    layer.set_outline_thickness(0.5);
                }
                let rect = Rect::new(
                    Mm(*x as f32),
                    Mm((PAGE_HEIGHT_MM - y - height) as f32),
                    Mm((x + width) as f32),
                    Mm((PAGE_HEIGHT_MM - y) as f32),
                )
                .with_mode(mode);
                layer.add_rect(rect);
            }
            DrawOp::Text {
                x,
                y,
                size,
                bold,
                color: c,
                text,
            } => {
                if text.is_empty() {
                    continue;
                }
                let font = if *bold { &faces.bold } else { &faces.regular };
                let text = if faces.unicode {
                    text.clone()
                } else {
                    ascii_only(text)
                };
                layer.set_fill_color(color(*c));
                layer.use_text(
                    text,
                    *size as f32,
                    Mm(*x as f32),
                    Mm((PAGE_HEIGHT_MM - y) as f32),
                    font,
                );
            }
        }
    }
}

/// Renders the report for `record` to PDF bytes.
pub fn render_report(
    record: &WorkRecord,
    fonts: &FontSet,
    generated_at: NaiveDateTime,
) -> Result<Vec<u8>> {
    let labels = fonts.labels();
    let report = ReportLayout::build(record, generated_at, &labels);

    let (doc, first_page, first_layer) = PdfDocument::new(
        labels.title,
        Mm(PAGE_WIDTH_MM as f32),
        Mm(PAGE_HEIGHT_MM as f32),
        "Layer 1",
    );
    let faces = Faces {
        regular: fonts.regular.embed(&doc)?,
        bold: fonts.bold.embed(&doc)?,
        unicode: fonts.is_unicode(),
    };

    for (i, page) in report.pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = doc.add_page(
                Mm(PAGE_WIDTH_MM as f32),
                Mm(PAGE_HEIGHT_MM as f32),
                format!("Layer {}", i + 1),
            );
            doc.get_page(page_index).get_layer(layer_index)
        };
        draw_page(&layer, page, &faces);
    }
    debug!("Rendered report with {} page(s)", report.pages.len());

    Ok(doc.save_to_bytes()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn ascii_fallback_masks_hangul() {
        assert_eq!(ascii_only("Kim 김"), "Kim ?");
        assert_eq!(ascii_only("a\tb"), "a?b");
    }

    #[test]
    fn builtin_fonts_use_english_labels() {
        let fonts = FontSet::builtin();
        assert!(!fonts.is_unicode());
        assert_eq!(fonts.labels().title, "Daily Work Log");
    }

    #[test]
    fn renders_with_builtin_fonts() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let mut record = WorkRecord::new(date);
        record.author = "김철수".to_string();
        record.tasks[0].description = "Review".to_string();
        let generated_at = date.and_hms_opt(9, 0, 0).unwrap();
        let bytes = render_report(&record, &FontSet::builtin(), generated_at).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
