//! PDF document writer – implements [`DocumentWriter`] with `printpdf`
//! (v0.8 ops-based API).

use printpdf::*;

use crate::export::{DocumentWriter, PageId};

/// pt → mm
const MM_PER_PT: f32 = 0.352778;

/// A page being assembled.
struct PendingPage {
    width_pt: f32,
    height_pt: f32,
    ops: Vec<Op>,
}

/// Accumulates pages and ops, then serialises them in [`DocumentWriter::save`].
pub struct PdfDocumentWriter {
    doc: PdfDocument,
    pages: Vec<PendingPage>,
    warnings: Vec<PdfWarnMsg>,
}

impl PdfDocumentWriter {
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_mut(&mut self, page: PageId) -> Result<&mut PendingPage, String> {
        let count = self.pages.len();
        self.pages
            .get_mut(page)
            .ok_or_else(|| format!("No page {page} (document has {count})"))
    }
}

impl DocumentWriter for PdfDocumentWriter {
    fn create_page(&mut self, width_pt: f32, height_pt: f32) -> PageId {
        self.pages.push(PendingPage {
            width_pt,
            height_pt,
            ops: Vec::new(),
        });
        self.pages.len() - 1
    }

    fn draw_image(
        &mut self,
        page: PageId,
        png: &[u8],
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), String> {
        let page_height = self.page_mut(page)?.height_pt;

        // Decode with the `image` crate to obtain pixel dimensions.
        let dyn_img =
            ::image::load_from_memory(png).map_err(|e| format!("Image decode error: {e}"))?;
        let (px_width, px_height) = (dyn_img.width(), dyn_img.height());

        let raw = RawImage::decode_from_bytes(png, &mut self.warnings)
            .map_err(|e| format!("PDF image encode error: {e}"))?;
        let xobj_id = self.doc.add_image(&raw);

        // PDF origin is bottom-left; our layout origin is top-left.
        let img_bottom_y = page_height - y - height;

        // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
        let scale_x = if px_width > 0 {
            width / px_width as f32
        } else {
            1.0
        };
        let scale_y = if px_height > 0 {
            height / px_height as f32
        } else {
            1.0
        };

        self.page_mut(page)?.ops.push(Op::UseXobject {
            id: xobj_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(img_bottom_y)),
                dpi: Some(72.0),
                scale_x: Some(scale_x),
                scale_y: Some(scale_y),
                rotate: None,
            },
        });
        Ok(())
    }

    fn draw_rectangle_outline(
        &mut self,
        page: PageId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color_hex: &str,
        stroke_width: f32,
    ) -> Result<(), String> {
        let [r, g, b] =
            parse_hex_color(color_hex).ok_or_else(|| format!("Invalid colour {color_hex:?}"))?;
        let page = self.page_mut(page)?;
        let pdf_y = page.height_pt - y;

        let x1 = x;
        let y1 = pdf_y - height;
        let x2 = x + width;
        let y2 = pdf_y;

        page.ops.push(Op::SetOutlineColor {
            col: Color::Rgb(Rgb {
                r,
                g,
                b,
                icc_profile: None,
            }),
        });
        page.ops.push(Op::SetOutlineThickness {
            pt: Pt(stroke_width),
        });
        page.ops.push(Op::DrawLine {
            line: Line {
                points: [(x1, y2), (x2, y2), (x2, y1), (x1, y1)]
                    .into_iter()
                    .map(|(px, py)| LinePoint {
                        p: Point {
                            x: Pt(px),
                            y: Pt(py),
                        },
                        bezier: false,
                    })
                    .collect(),
                is_closed: true,
            },
        });
        Ok(())
    }

    fn save(&mut self) -> Result<Vec<u8>, String> {
        let pages: Vec<PdfPage> = std::mem::take(&mut self.pages)
            .into_iter()
            .map(|p| PdfPage::new(Mm(p.width_pt * MM_PER_PT), Mm(p.height_pt * MM_PER_PT), p.ops))
            .collect();
        if pages.is_empty() {
            return Err("Document has no pages".to_string());
        }
        if !self.warnings.is_empty() {
            log::debug!("{} image warning(s) while embedding", self.warnings.len());
        }

        self.doc.with_pages(pages);
        let bytes = self.doc.save(&PdfSaveOptions::default(), &mut Vec::new());
        Ok(bytes)
    }
}

/// Parse `#rrggbb` or `#rgb` into RGB components in `[0, 1]`.
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim().trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
    match hex.len() {
        6 => Some([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?]),
        3 => Some([
            channel(&hex[0..1].repeat(2))?,
            channel(&hex[1..2].repeat(2))?,
            channel(&hex[2..3].repeat(2))?,
        ]),
        _ => None,
    }
}
