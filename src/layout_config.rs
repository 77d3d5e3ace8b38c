//! Layout config – the intermediate representation between pagination and
//! document composition. This is the "frozen" structure that encodes exactly
//! where each card image goes.

use serde::{Deserialize, Serialize};

/// Where one card lands. Coordinates are relative to the page's top-left
/// corner, in the paginator's unit (PDF points during export), and describe
/// the card image itself; a border, if any, is drawn around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePlacement {
    /// Position of the card in the paginator's input.
    pub card: usize,
    pub page_index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Border stroke drawn around the card, after scaling.
    pub border: f32,
    /// Shrink factor applied to fit the printable area (1 = actual size).
    pub scale: f32,
}

/// A complete deck layout ready for composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckLayout {
    /// Width of each page in PDF points (1 pt = 1/72 inch), after orientation.
    pub page_width_pt: f32,
    /// Height of each page in PDF points, after orientation.
    pub page_height_pt: f32,
    /// Placements in input order.
    pub placements: Vec<PagePlacement>,
}

impl DeckLayout {
    /// Number of pages the placements span.
    pub fn page_count(&self) -> usize {
        self.placements
            .iter()
            .map(|p| p.page_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Placements on page `page_index`, in input order.
    pub fn page(&self, page_index: usize) -> impl Iterator<Item = &PagePlacement> {
        self.placements
            .iter()
            .filter(move |p| p.page_index == page_index)
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_and_json() {
        let placement = |card, page_index| PagePlacement {
            card,
            page_index,
            x: 10.0,
            y: 10.0,
            width: 50.0,
            height: 80.0,
            border: 0.0,
            scale: 1.0,
        };
        let layout = DeckLayout {
            page_width_pt: 595.0,
            page_height_pt: 842.0,
            placements: vec![placement(0, 0), placement(1, 0), placement(2, 1)],
        };
        assert_eq!(layout.page_count(), 2);
        assert_eq!(layout.page(0).count(), 2);

        let parsed = DeckLayout::from_json(&layout.to_json()).unwrap();
        assert_eq!(parsed, layout);
    }
}
