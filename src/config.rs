//! Project configuration – a JSON file that sits at the project root.
//!
//! Every field is optional; missing fields take the defaults below.
//!
//! ```json
//! {
//!   "deck": "cards.csv",
//!   "default_template": "templates/card.html",
//!   "columns": { "id": "Key" },
//!   "localization": { "directory": "i18n", "default_locale": "en", "locales": ["en", "de"] },
//!   "card": { "width": 63, "height": 88, "unit": "mm", "dpi": 300 },
//!   "export": { "page_size": "A4", "margin_mm": 10, "border_thickness_mm": 0.2 }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::deck::{parse_csv, CardRecord, ColumnNames};
use crate::error::ConfigError;
use crate::fs::FileSystem;
use crate::units::{PageOrientation, PageSize, Unit};

/// Top-level project configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Names of the well-known deck columns.
    pub columns: ColumnNames,
    /// CSV deck, relative to the project root.
    pub deck: Option<PathBuf>,
    /// Template used by rows without a usable per-row template.
    pub default_template: Option<PathBuf>,
    pub localization: LocalizationSettings,
    /// Project-wide card size defaults.
    pub card: CardDefaults,
    pub export: ExportSettings,
}

impl ProjectConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Read and parse a project file through `fs`.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, ConfigError> {
        let text = fs.read_text(path)?;
        Self::from_json(&text)
    }

    /// Read and parse the deck named by `deck`, relative to `root`.
    pub fn load_deck(
        &self,
        fs: &dyn FileSystem,
        root: &Path,
    ) -> Result<Vec<CardRecord>, ConfigError> {
        let path = root.join(self.deck.as_ref().ok_or(ConfigError::MissingDeck)?);
        let text = fs.read_text(&path)?;
        parse_csv(&text).map_err(|source| ConfigError::Deck { path, source })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizationSettings {
    /// Directory holding `<locale>.json` bundles, relative to the project root.
    pub directory: Option<PathBuf>,
    pub default_locale: String,
    /// Locales offered to the user. Empty means "just the default".
    pub locales: Vec<String>,
}

impl Default for LocalizationSettings {
    fn default() -> Self {
        Self {
            directory: None,
            default_locale: "en".to_string(),
            locales: Vec::new(),
        }
    }
}

impl LocalizationSettings {
    /// Available locales, always containing the default one.
    pub fn available_locales(&self) -> Vec<String> {
        let mut locales = self.locales.clone();
        if !locales.contains(&self.default_locale) {
            locales.insert(0, self.default_locale.clone());
        }
        locales
    }
}

/// Card size defaults. `None` (or non-positive values) defer to the built-in
/// fallback of 2.5 × 3.5 in at 300 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardDefaults {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub unit: Option<Unit>,
    pub dpi: Option<f32>,
}

/// How cards are arranged on pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Row-major grid, as many cards per page as fit.
    #[default]
    Grid,
    /// One card per page, shrunk to fit the printable area if needed.
    OnePerPage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub page_size: PageSize,
    pub orientation: PageOrientation,
    /// Page margin and gap between cards, in millimetres.
    pub margin_mm: f32,
    /// Cut-line border around each card, in millimetres. `0` disables it.
    pub border_thickness_mm: f32,
    /// Border colour as `#rrggbb` or `#rgb`.
    pub border_color: String,
    /// Raster resolution used for card images.
    pub dpi: f32,
    pub layout: LayoutMode,
    /// Output directory, relative to the project root.
    pub output_dir: PathBuf,
    /// External HTML-to-PNG command. See [`crate::raster::CommandRasterizer`].
    pub rasterizer: Vec<String>,
    /// Document title embedded in the PDF metadata.
    pub title: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: PageOrientation::Portrait,
            margin_mm: 10.0,
            border_thickness_mm: 0.0,
            border_color: "#000000".to_string(),
            dpi: 300.0,
            layout: LayoutMode::Grid,
            output_dir: PathBuf::from("export"),
            rasterizer: Vec::new(),
            title: "card-forge deck".to_string(),
        }
    }
}

impl ExportSettings {
    /// Raster dpi, falling back to 300 for unusable values.
    pub fn effective_dpi(&self) -> f32 {
        if self.dpi.is_finite() && self.dpi > 0.0 {
            self.dpi
        } else {
            log::warn!("Export dpi {} is unusable; using 300", self.dpi);
            300.0
        }
    }

    /// Margin clamped to a finite, non-negative value.
    pub fn effective_margin_mm(&self) -> f32 {
        if self.margin_mm.is_finite() && self.margin_mm >= 0.0 {
            self.margin_mm
        } else {
            0.0
        }
    }

    /// Border thickness clamped to a finite, non-negative value.
    pub fn effective_border_mm(&self) -> f32 {
        if self.border_thickness_mm.is_finite() && self.border_thickness_mm >= 0.0 {
            self.border_thickness_mm
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeckError, FsError};
    use crate::fs::MemoryFileSystem;

    #[test]
    fn empty_object_uses_defaults() {
        let config = ProjectConfig::from_json("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.columns.id, "id");
        assert_eq!(config.export.page_size, PageSize::A4);
        assert_eq!(config.export.margin_mm, 10.0);
    }

    #[test]
    fn parses_full_config() {
        let json = r##"{
            "deck": "cards.csv",
            "default_template": "templates/card.html",
            "columns": { "id": "Key", "template": "Layout" },
            "localization": { "directory": "i18n", "default_locale": "de", "locales": ["en"] },
            "card": { "width": 63, "height": 88, "unit": "mm" },
            "export": {
                "page_size": { "Custom": { "width_mm": 200, "height_mm": 300 } },
                "orientation": "landscape",
                "border_thickness_mm": 0.3,
                "border_color": "#ff0000",
                "layout": "one_per_page"
            }
        }"##;
        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.columns.id, "Key");
        assert_eq!(config.columns.width, "width");
        assert_eq!(config.card.unit, Some(Unit::Mm));
        assert_eq!(config.card.dpi, None);
        assert_eq!(config.export.orientation, PageOrientation::Landscape);
        assert_eq!(config.export.layout, LayoutMode::OnePerPage);
        assert_eq!(
            config.export.page_size,
            PageSize::Custom {
                width_mm: 200.0,
                height_mm: 300.0
            }
        );
        assert_eq!(
            config.localization.available_locales(),
            vec!["de".to_string(), "en".to_string()]
        );
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(
            ProjectConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_the_deck_relative_to_the_root() {
        let fs = MemoryFileSystem::new();
        fs.add("/p/cards.csv", "id,Name\nfire,Fireball\n");
        fs.add("/p/broken.csv", "id,Name\nfire,\"Fireball\n");
        let mut config = ProjectConfig {
            deck: Some(PathBuf::from("cards.csv")),
            ..ProjectConfig::default()
        };

        let cards = config.load_deck(&fs, Path::new("/p")).unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].get("Name"), Some("Fireball"));

        config.deck = Some(PathBuf::from("broken.csv"));
        match config.load_deck(&fs, Path::new("/p")) {
            Err(ConfigError::Deck { path, source }) => {
                assert_eq!(path, PathBuf::from("/p/broken.csv"));
                assert_eq!(source, DeckError::UnterminatedQuote { line: 2 });
            }
            other => panic!("expected a deck error, got {other:?}"),
        }

        config.deck = Some(PathBuf::from("gone.csv"));
        assert!(matches!(
            config.load_deck(&fs, Path::new("/p")),
            Err(ConfigError::Fs(FsError::NotFound(_)))
        ));

        config.deck = None;
        assert!(matches!(
            config.load_deck(&fs, Path::new("/p")),
            Err(ConfigError::MissingDeck)
        ));
    }

    #[test]
    fn unusable_export_numbers_are_clamped() {
        let settings = ExportSettings {
            dpi: f32::NAN,
            margin_mm: -4.0,
            border_thickness_mm: f32::INFINITY,
            ..ExportSettings::default()
        };
        assert_eq!(settings.effective_dpi(), 300.0);
        assert_eq!(settings.effective_margin_mm(), 0.0);
        assert_eq!(settings.effective_border_mm(), 0.0);
    }
}
