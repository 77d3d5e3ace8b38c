//! # card-forge – Template-driven card decks → print-ready PDF
//!
//! This crate turns a CSV deck plus HTML card templates into card HTML, and
//! rasterized cards into a paginated PDF. The pipeline stages are:
//!
//! 1. **Load** – project config ([`config`]), deck ([`deck`]), locale bundle ([`i18n`])
//! 2. **Resolve** – pick a template per card and render it ([`pipeline`], [`template`])
//! 3. **Rasterize** – external HTML → PNG capability ([`export::Rasterizer`], [`raster`])
//! 4. **Paginate** – place card images on pages ([`pagination`])
//! 5. **Compose** – emit PDF bytes via printpdf ([`render`])
//!
//! Stages 3–5 are driven step by step by [`export::ExportJob`].

pub mod assets;
pub mod config;
pub mod deck;
pub mod error;
pub mod export;
pub mod fs;
pub mod i18n;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod raster;
pub mod render;
pub mod template;
pub mod templates;
pub mod units;

// Re-exports for convenience
pub use config::ProjectConfig;
pub use deck::{parse_csv, CardRecord, ColumnNames};
pub use export::{export_to_document, ExportJob, ExportReport};
pub use pipeline::{CardPipeline, ResolvedCard};
pub use units::{resolve_card_dimensions, to_pixels, CardDimensions, Unit};
