//! Export – rasterizes resolved cards and composes them into one document.
//!
//! An export is an explicit list of steps: one raster step per card followed
//! by a single compose step. [`ExportJob::step`] runs exactly one of them and
//! hands control back, so a host can stay responsive between cards. Cards are
//! processed strictly in order against one reused rasterizer surface.
//!
//! Failure semantics:
//! - a card that fails to rasterize is logged and left out; the run goes on;
//! - zero rasterized cards is [`ExportError::NoContent`];
//! - output already written is left in place when a run fails.

use std::path::{Path, PathBuf};

use crate::config::ProjectConfig;
use crate::error::{CardError, ExportError};
use crate::fs::FileSystem;
use crate::layout_config::DeckLayout;
use crate::pagination::{paginate, CardSize, PageParams};
use crate::pipeline::ResolvedCard;
use crate::units::{
    mm_to_points, resolve_card_dimensions, PageOrientation, CSS_PX_PER_INCH, POINTS_PER_INCH,
};

/// Stem of the composed document file.
pub const DOCUMENT_STEM: &str = "deck";

/// Largest card edge, in device pixels, handed to a rasterizer.
pub const MAX_RASTER_PX: u32 = 16_384;

/// HTML-to-PNG capability.
pub trait Rasterizer {
    /// Render `html` into a `width_px` × `height_px` PNG. `dpi_scale` is the
    /// device-pixel ratio relative to 96 dpi CSS pixels. Implementations must
    /// wait for embedded images and fonts before capturing.
    fn render(
        &mut self,
        html: &str,
        width_px: u32,
        height_px: u32,
        dpi_scale: f32,
    ) -> Result<Vec<u8>, String>;

    /// Clear the drawing surface between cards.
    fn reset(&mut self) {}
}

/// Handle of a page created by a [`DocumentWriter`].
pub type PageId = usize;

/// Paged-document capability. Coordinates are points from the page's
/// top-left corner.
pub trait DocumentWriter {
    fn create_page(&mut self, width_pt: f32, height_pt: f32) -> PageId;

    fn draw_image(
        &mut self,
        page: PageId,
        png: &[u8],
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), String>;

    #[allow(clippy::too_many_arguments)]
    fn draw_rectangle_outline(
        &mut self,
        page: PageId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color_hex: &str,
        stroke_width: f32,
    ) -> Result<(), String>;

    fn save(&mut self) -> Result<Vec<u8>, String>;

    /// File extension of the saved document.
    fn extension(&self) -> &str {
        "pdf"
    }
}

/// One successfully rasterized card.
#[derive(Debug, Clone)]
pub struct RenderedCardImage {
    /// Index of the card in the export input.
    pub index: usize,
    pub png: Vec<u8>,
    /// Where the PNG was written, if writing succeeded.
    pub path: Option<PathBuf>,
    /// Physical size in points.
    pub size: CardSize,
}

/// A step of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rasterize(usize),
    Compose,
}

/// Result of running one step.
#[derive(Debug)]
pub enum StepOutcome {
    /// Raster progress in `[0, 1]`.
    Progress(f32),
    Finished(ExportReport),
}

/// Summary of a successful export.
#[derive(Debug)]
pub struct ExportReport {
    pub total: usize,
    /// Export-input indices of the cards that made it into the document.
    pub exported: Vec<usize>,
    pub failures: Vec<CardError>,
    pub layout: DeckLayout,
    pub image_paths: Vec<PathBuf>,
    pub document_path: PathBuf,
}

/// A resumable export run.
pub struct ExportJob<'a> {
    cards: &'a [ResolvedCard],
    config: &'a ProjectConfig,
    fs: &'a dyn FileSystem,
    rasterizer: &'a mut dyn Rasterizer,
    writer: &'a mut dyn DocumentWriter,
    output_dir: PathBuf,
    next: usize,
    images: Vec<RenderedCardImage>,
    failures: Vec<CardError>,
    finished: bool,
}

impl<'a> ExportJob<'a> {
    /// Prepare an export into `<root>/<export.output_dir>`. Creating the
    /// output directory is the only work done up front.
    pub fn new(
        cards: &'a [ResolvedCard],
        config: &'a ProjectConfig,
        root: &Path,
        fs: &'a dyn FileSystem,
        rasterizer: &'a mut dyn Rasterizer,
        writer: &'a mut dyn DocumentWriter,
    ) -> Result<Self, ExportError> {
        let output_dir = root.join(&config.export.output_dir);
        fs.ensure_directory(&output_dir)
            .map_err(ExportError::OutputDirectory)?;
        log::debug!(
            "Exporting {} card(s) into {}",
            cards.len(),
            output_dir.display()
        );
        Ok(Self {
            cards,
            config,
            fs,
            rasterizer,
            writer,
            output_dir,
            next: 0,
            images: Vec::with_capacity(cards.len()),
            failures: Vec::new(),
            finished: false,
        })
    }

    /// The full step list of this run.
    pub fn steps(&self) -> Vec<Step> {
        (0..self.cards.len())
            .map(Step::Rasterize)
            .chain(std::iter::once(Step::Compose))
            .collect()
    }

    /// The step [`ExportJob::step`] will run next.
    pub fn next_step(&self) -> Option<Step> {
        if self.finished {
            None
        } else if self.next < self.cards.len() {
            Some(Step::Rasterize(self.next))
        } else {
            Some(Step::Compose)
        }
    }

    /// Completed raster steps over total cards.
    pub fn progress(&self) -> f32 {
        if self.cards.is_empty() {
            1.0
        } else {
            self.next as f32 / self.cards.len() as f32
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run the next step.
    pub fn step(&mut self) -> Result<StepOutcome, ExportError> {
        match self.next_step() {
            None => Err(ExportError::Finished),
            Some(Step::Rasterize(i)) => {
                self.rasterize(i);
                self.next += 1;
                Ok(StepOutcome::Progress(self.progress()))
            }
            Some(Step::Compose) => {
                self.finished = true;
                self.compose().map(StepOutcome::Finished)
            }
        }
    }

    fn rasterize(&mut self, i: usize) {
        let cards = self.cards;
        let resolved = &cards[i];
        let dims = resolve_card_dimensions(&resolved.card, self.config);
        let dpi = self.config.export.effective_dpi();
        let size = CardSize {
            width: dims.width_pt(),
            height: dims.height_pt(),
        };
        let width_px = (size.width / POINTS_PER_INCH * dpi).round().max(1.0);
        let height_px = (size.height / POINTS_PER_INCH * dpi).round().max(1.0);
        let limit = MAX_RASTER_PX as f32;
        if !(width_px <= limit && height_px <= limit) {
            let err = CardError::Oversized {
                index: i,
                width_px,
                height_px,
                limit: MAX_RASTER_PX,
            };
            log::error!("{err}");
            self.failures.push(err);
            return;
        }
        let (width_px, height_px) = (width_px as u32, height_px as u32);
        let dpi_scale = dpi / CSS_PX_PER_INCH;

        let result = self
            .rasterizer
            .render(&resolved.html, width_px, height_px, dpi_scale);
        self.rasterizer.reset();

        let png = match result {
            Ok(png) => png,
            Err(message) => {
                let err = CardError::Raster { index: i, message };
                log::error!("{err}");
                self.failures.push(err);
                return;
            }
        };
        log::debug!("Card {i}: rasterized {width_px}×{height_px} px");

        let path = self.output_dir.join(format!("{}.png", resolved.index + 1));
        let path = match self.fs.write_binary(&path, &png) {
            Ok(()) => Some(path),
            Err(source) => {
                let err = CardError::WriteImage { index: i, source };
                log::error!("{err}");
                self.failures.push(err);
                None
            }
        };

        self.images.push(RenderedCardImage {
            index: i,
            png,
            path,
            size,
        });
    }

    fn compose(&mut self) -> Result<ExportReport, ExportError> {
        if self.images.is_empty() {
            return Err(ExportError::NoContent {
                total: self.cards.len(),
            });
        }

        let config = self.config;
        let export = &config.export;
        let (page_width, page_height) = export.page_size.size_pt(PageOrientation::Portrait);
        let params = PageParams {
            page_width,
            page_height,
            orientation: export.orientation,
            margin: mm_to_points(export.effective_margin_mm()),
            border: mm_to_points(export.effective_border_mm()),
            layout: export.layout,
        };
        let (page_w, page_h) = params.effective_size();

        let sizes: Vec<CardSize> = self.images.iter().map(|img| img.size).collect();
        let mut placements = paginate(&sizes, &params).map_err(ExportError::Layout)?;

        // `paginate` indexes its own input; map back to export indices.
        let mut placed = vec![false; self.images.len()];
        for p in &mut placements {
            placed[p.card] = true;
            p.card = self.images[p.card].index;
        }
        for (img, &ok) in self.images.iter().zip(&placed) {
            if ok {
                continue;
            }
            let err = CardError::Placement {
                index: img.index,
                message: "unusable card size".to_string(),
            };
            log::error!("{err}");
            self.failures.push(err);
        }

        let layout = DeckLayout {
            page_width_pt: page_w,
            page_height_pt: page_h,
            placements,
        };
        let pages: Vec<PageId> = (0..layout.page_count())
            .map(|_| self.writer.create_page(page_w, page_h))
            .collect();

        let mut exported = Vec::with_capacity(layout.placements.len());
        for p in &layout.placements {
            let Some(img) = self.images.iter().find(|img| img.index == p.card) else {
                continue;
            };
            let page = pages[p.page_index];
            if let Err(message) = self
                .writer
                .draw_image(page, &img.png, p.x, p.y, p.width, p.height)
            {
                let err = CardError::Placement {
                    index: p.card,
                    message,
                };
                log::error!("{err}");
                self.failures.push(err);
                continue;
            }
            if p.border > 0.0 {
                // The stroke is centred on the path; inset by half so it
                // covers exactly the border band around the card.
                let half = p.border / 2.0;
                if let Err(message) = self.writer.draw_rectangle_outline(
                    page,
                    p.x - half,
                    p.y - half,
                    p.width + p.border,
                    p.height + p.border,
                    &export.border_color,
                    p.border,
                ) {
                    log::warn!("Card {}: border not drawn: {message}", p.card);
                }
            }
            exported.push(p.card);
        }

        if exported.is_empty() {
            return Err(ExportError::NoContent {
                total: self.cards.len(),
            });
        }

        let bytes = self.writer.save().map_err(ExportError::Document)?;
        let document_path = self
            .output_dir
            .join(format!("{DOCUMENT_STEM}.{}", self.writer.extension()));
        self.fs
            .write_binary(&document_path, &bytes)
            .map_err(ExportError::WriteDocument)?;

        let layout_path = self.output_dir.join(format!("{DOCUMENT_STEM}.layout.json"));
        if let Err(e) = self.fs.write_binary(&layout_path, layout.to_json().as_bytes()) {
            log::warn!("Layout dump not written: {e}");
        }

        log::info!(
            "Exported {}/{} card(s) on {} page(s) to {}",
            exported.len(),
            self.cards.len(),
            layout.page_count(),
            document_path.display()
        );

        Ok(ExportReport {
            total: self.cards.len(),
            exported,
            failures: std::mem::take(&mut self.failures),
            image_paths: self.images.iter().filter_map(|img| img.path.clone()).collect(),
            layout,
            document_path,
        })
    }
}

/// Run a whole export, reporting raster progress in `[0, 1]` after each card.
pub fn export_to_document(
    cards: &[ResolvedCard],
    config: &ProjectConfig,
    root: &Path,
    fs: &dyn FileSystem,
    rasterizer: &mut dyn Rasterizer,
    writer: &mut dyn DocumentWriter,
    on_progress: &mut dyn FnMut(f32),
) -> Result<ExportReport, ExportError> {
    let mut job = ExportJob::new(cards, config, root, fs, rasterizer, writer)?;
    loop {
        match job.step()? {
            StepOutcome::Progress(p) => on_progress(p),
            StepOutcome::Finished(report) => return Ok(report),
        }
    }
}
