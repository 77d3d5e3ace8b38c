//! Physical units, card dimensions and page sizes.
//!
//! Everything here is pure arithmetic. Bad input never produces NaN or
//! non-positive sizes; it falls back to project defaults and then to a poker
//! card (2.5 × 3.5 in at 300 dpi).

use serde::{Deserialize, Serialize};

use crate::config::ProjectConfig;
use crate::deck::CardRecord;

pub const MM_PER_INCH: f32 = 25.4;
pub const CM_PER_INCH: f32 = 2.54;
/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;
/// CSS reference pixels per inch.
pub const CSS_PX_PER_INCH: f32 = 96.0;

pub const FALLBACK_WIDTH_IN: f32 = 2.5;
pub const FALLBACK_HEIGHT_IN: f32 = 3.5;
pub const FALLBACK_DPI: f32 = 300.0;

/// A length unit accepted in configs and per-card overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Mm,
    Cm,
    #[default]
    #[serde(alias = "in")]
    Inch,
    Px,
}

impl Unit {
    /// Parse a unit name. Unknown text yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mm" => Some(Unit::Mm),
            "cm" => Some(Unit::Cm),
            "in" | "inch" | "inches" | "\"" => Some(Unit::Inch),
            "px" => Some(Unit::Px),
            _ => None,
        }
    }

    /// Convert a length in inches into this unit (pixels assume `dpi`).
    pub fn from_inches(self, inches: f32, dpi: f32) -> f32 {
        match self {
            Unit::Inch => inches,
            Unit::Mm => inches * MM_PER_INCH,
            Unit::Cm => inches * CM_PER_INCH,
            Unit::Px => inches * dpi,
        }
    }
}

/// Convert `value` in `unit` to device pixels at `dpi`. `px` is the identity.
pub fn to_pixels(value: f32, unit: Unit, dpi: f32) -> f32 {
    match unit {
        Unit::Inch => value * dpi,
        Unit::Mm => (value / MM_PER_INCH) * dpi,
        Unit::Cm => (value / CM_PER_INCH) * dpi,
        Unit::Px => value,
    }
}

/// Convert `value` in `unit` to PDF points. Pixel lengths are interpreted at
/// `dpi` to recover their physical size.
pub fn to_points(value: f32, unit: Unit, dpi: f32) -> f32 {
    match unit {
        Unit::Px => value / dpi * POINTS_PER_INCH,
        _ => to_pixels(value, unit, POINTS_PER_INCH),
    }
}

/// Millimetres to PDF points.
pub fn mm_to_points(mm: f32) -> f32 {
    to_pixels(mm, Unit::Mm, POINTS_PER_INCH)
}

/// The resolved physical size of one card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardDimensions {
    pub width: f32,
    pub height: f32,
    pub unit: Unit,
    pub dpi: f32,
}

impl CardDimensions {
    pub fn width_px(&self) -> f32 {
        to_pixels(self.width, self.unit, self.dpi)
    }

    pub fn height_px(&self) -> f32 {
        to_pixels(self.height, self.unit, self.dpi)
    }

    pub fn width_pt(&self) -> f32 {
        to_points(self.width, self.unit, self.dpi)
    }

    pub fn height_pt(&self) -> f32 {
        to_points(self.height, self.unit, self.dpi)
    }
}

fn usable(v: f32) -> Option<f32> {
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Parse a per-card numeric override. Empty cells are silently absent;
/// anything else that does not parse to a finite positive number is logged.
fn parse_override(card: &CardRecord, column: &str) -> Option<f32> {
    let raw = card.get_non_empty(column)?;
    let parsed = raw.parse::<f32>().ok().and_then(usable);
    if parsed.is_none() {
        log::warn!("Ignoring {column} override {raw:?}: not a positive number");
    }
    parsed
}

/// Resolve a card's size: per-card override > project default > fallback.
pub fn resolve_card_dimensions(card: &CardRecord, config: &ProjectConfig) -> CardDimensions {
    let columns = &config.columns;
    let defaults = &config.card;

    let dpi = defaults.dpi.and_then(usable).unwrap_or(FALLBACK_DPI);

    let unit = match card.get_non_empty(&columns.unit) {
        Some(raw) => Unit::parse(raw).unwrap_or_else(|| {
            log::warn!("Ignoring unit override {raw:?}: unrecognised unit");
            defaults.unit.unwrap_or_default()
        }),
        None => defaults.unit.unwrap_or_default(),
    };

    let width = parse_override(card, &columns.width)
        .or_else(|| defaults.width.and_then(usable))
        .unwrap_or_else(|| unit.from_inches(FALLBACK_WIDTH_IN, dpi));
    let height = parse_override(card, &columns.height)
        .or_else(|| defaults.height.and_then(usable))
        .unwrap_or_else(|| unit.from_inches(FALLBACK_HEIGHT_IN, dpi));

    CardDimensions {
        width,
        height,
        unit,
        dpi,
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// A paper size. Sizes are stored in portrait orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PageSize {
    /// Portrait `(width, height)` in millimetres.
    pub fn size_mm(&self) -> (f32, f32) {
        match *self {
            PageSize::A3 => (297.0, 420.0),
            PageSize::A4 => (210.0, 297.0),
            PageSize::A5 => (148.0, 210.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::Custom {
                width_mm,
                height_mm,
            } => match (usable(width_mm), usable(height_mm)) {
                (Some(w), Some(h)) => (w, h),
                _ => {
                    log::warn!("Custom page size {width_mm}×{height_mm} mm is unusable; using A4");
                    PageSize::A4.size_mm()
                }
            },
        }
    }

    /// Effective `(width, height)` in points after applying orientation.
    pub fn size_pt(&self, orientation: PageOrientation) -> (f32, f32) {
        let (w, h) = self.size_mm();
        let (w, h) = (mm_to_points(w), mm_to_points(h));
        match orientation {
            PageOrientation::Portrait => (w, h),
            PageOrientation::Landscape => (h, w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardDefaults;

    #[test]
    fn to_pixels_formulas() {
        for dpi in [72.0, 96.0, 300.0, 600.0] {
            assert_eq!(to_pixels(2.5, Unit::Inch, dpi), 2.5 * dpi);
            assert_eq!(to_pixels(63.0, Unit::Mm, dpi), (63.0 / 25.4) * dpi);
            assert_eq!(to_pixels(8.8, Unit::Cm, dpi), (8.8 / 2.54) * dpi);
            assert_eq!(to_pixels(750.0, Unit::Px, dpi), 750.0);
        }
    }

    #[test]
    fn parse_units() {
        assert_eq!(Unit::parse(" MM "), Some(Unit::Mm));
        assert_eq!(Unit::parse("in"), Some(Unit::Inch));
        assert_eq!(Unit::parse("inch"), Some(Unit::Inch));
        assert_eq!(Unit::parse("furlong"), None);
    }

    #[test]
    fn fallback_dimensions() {
        let card = CardRecord::from_pairs([("id", "x")]);
        let dims = resolve_card_dimensions(&card, &ProjectConfig::default());
        assert_eq!(dims.unit, Unit::Inch);
        assert_eq!(dims.width, 2.5);
        assert_eq!(dims.height, 3.5);
        assert_eq!(dims.dpi, 300.0);
        assert_eq!(dims.width_px(), 750.0);
        assert_eq!(dims.height_px(), 1050.0);
    }

    #[test]
    fn overrides_beat_project_defaults() {
        let config = ProjectConfig {
            card: CardDefaults {
                width: Some(63.0),
                height: Some(88.0),
                unit: Some(Unit::Mm),
                dpi: Some(300.0),
            },
            ..ProjectConfig::default()
        };
        let card = CardRecord::from_pairs([("width", "70"), ("height", ""), ("unit", "mm")]);
        let dims = resolve_card_dimensions(&card, &config);
        assert_eq!(dims.width, 70.0);
        assert_eq!(dims.height, 88.0);
        assert_eq!(dims.unit, Unit::Mm);
    }

    #[test]
    fn garbage_overrides_never_escape() {
        let inputs = ["NaN", "inf", "-inf", "-3", "0", "abc", "1e40", "  "];
        for w in inputs {
            for h in inputs {
                let card = CardRecord::from_pairs([("width", w), ("height", h), ("unit", "???")]);
                let dims = resolve_card_dimensions(&card, &ProjectConfig::default());
                assert!(dims.width.is_finite() && dims.width > 0.0, "width from {w:?}");
                assert!(dims.height.is_finite() && dims.height > 0.0, "height from {h:?}");
                assert!(dims.width_px().is_finite() && dims.height_px().is_finite());
            }
        }
    }

    #[test]
    fn fallback_converts_into_resolved_unit() {
        let card = CardRecord::from_pairs([("unit", "mm")]);
        let dims = resolve_card_dimensions(&card, &ProjectConfig::default());
        assert_eq!(dims.unit, Unit::Mm);
        assert!((dims.width - 63.5).abs() < 1e-4);
        assert!((dims.height - 88.9).abs() < 1e-4);
    }

    #[test]
    fn points_for_physical_and_pixel_units() {
        assert!((to_points(1.0, Unit::Inch, 300.0) - 72.0).abs() < 1e-4);
        assert!((to_points(25.4, Unit::Mm, 300.0) - 72.0).abs() < 1e-4);
        assert!((to_points(300.0, Unit::Px, 300.0) - 72.0).abs() < 1e-4);
    }

    #[test]
    fn landscape_swaps_page_sides() {
        let (pw, ph) = PageSize::A4.size_pt(PageOrientation::Portrait);
        let (lw, lh) = PageSize::A4.size_pt(PageOrientation::Landscape);
        assert!((pw - 595.2756).abs() < 0.01);
        assert!((ph - 841.8898).abs() < 0.01);
        assert_eq!((pw, ph), (lh, lw));
    }
}
