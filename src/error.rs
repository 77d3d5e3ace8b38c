//! Error taxonomy.
//!
//! Three tiers:
//! - per-card failures ([`CardError`]) are logged and the card is skipped;
//! - configuration degradations never surface as errors, only `log::warn!`;
//! - hard failures ([`ExportError`], [`PipelineError`]) abort the operation.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a [`crate::fs::FileSystem`] operation.
#[derive(Error, Debug, Clone)]
pub enum FsError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("File '{0}' is not valid UTF-8")]
    InvalidUtf8(PathBuf),
}

impl FsError {
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            FsError::NotFound(path.to_path_buf())
        } else {
            FsError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    }
}

/// Failure to parse a CSV deck.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeckError {
    #[error("Deck is empty: no header row")]
    MissingHeader,

    #[error("Unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },
}

/// Failure to load a project configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid project config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Project has no \"deck\" entry")]
    MissingDeck,

    #[error("Deck '{path}': {source}")]
    Deck { path: PathBuf, source: DeckError },
}

/// A recoverable failure scoped to one card.
#[derive(Error, Debug, Clone)]
pub enum CardError {
    #[error("Row {row}: no usable template (requested: {requested:?})")]
    TemplateUnavailable {
        row: usize,
        requested: Option<String>,
    },

    #[error("Card {index}: rasterization failed: {message}")]
    Raster { index: usize, message: String },

    #[error("Card {index}: {width_px}×{height_px} px exceeds the raster limit of {limit} px")]
    Oversized {
        index: usize,
        width_px: f32,
        height_px: f32,
        limit: u32,
    },

    #[error("Card {index}: could not write image: {source}")]
    WriteImage { index: usize, source: FsError },

    #[error("Card {index}: could not be placed: {message}")]
    Placement { index: usize, message: String },
}

/// Hard failure of the card resolution pipeline.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("No usable templates: neither a default template nor any per-card template could be loaded")]
    NoTemplates,
}

/// Hard failure of an export run.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No content: none of the {total} cards could be rasterized")]
    NoContent { total: usize },

    #[error("Could not create output directory: {0}")]
    OutputDirectory(FsError),

    #[error("Page layout failed: {0}")]
    Layout(String),

    #[error("Document composition failed: {0}")]
    Document(String),

    #[error("Could not write document: {0}")]
    WriteDocument(FsError),

    #[error("Export already finished")]
    Finished,
}
