//! Pagination – places fixed-size card images onto pages.
//!
//! Handles:
//! - row-major placement with row wrap and page breaks
//! - page orientation
//! - border footprint around every card
//! - shrink-to-fit for cards larger than the printable area
//!
//! Placement strictly follows input order; no reordering for density.
//! All lengths share one unit (points during export, millimetres in tests).

use crate::config::LayoutMode;
use crate::layout_config::PagePlacement;
use crate::units::PageOrientation;

/// Slack for float comparisons against the printable edge.
const FIT_EPSILON: f32 = 1e-3;

/// Size of one card image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardSize {
    pub width: f32,
    pub height: f32,
}

/// Page geometry for a pagination run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageParams {
    /// Portrait page width.
    pub page_width: f32,
    /// Portrait page height.
    pub page_height: f32,
    pub orientation: PageOrientation,
    /// Page margin, also used as the gap between cards.
    pub margin: f32,
    /// Border thickness around each card; inflates the footprint on every side.
    pub border: f32,
    pub layout: LayoutMode,
}

impl PageParams {
    /// Effective `(width, height)` after applying orientation.
    pub fn effective_size(&self) -> (f32, f32) {
        match self.orientation {
            PageOrientation::Portrait => (self.page_width, self.page_height),
            PageOrientation::Landscape => (self.page_height, self.page_width),
        }
    }

    /// Printable `(width, height)`: page minus margin on each side.
    pub fn printable_size(&self) -> (f32, f32) {
        let (w, h) = self.effective_size();
        (w - 2.0 * self.margin, h - 2.0 * self.margin)
    }
}

/// Shrink factor that fits a footprint into the available space.
///
/// `min(1, available_w / footprint_w, available_h / footprint_h)`. The
/// footprint already includes the border, so the border shrinks with the card.
pub fn fit_scale(footprint_w: f32, footprint_h: f32, available_w: f32, available_h: f32) -> f32 {
    1.0f32
        .min(available_w / footprint_w)
        .min(available_h / footprint_h)
}

/// Place `cards` onto pages.
///
/// Returns an error if the margin leaves no printable area. Cards with
/// unusable sizes are logged and left out; callers can detect them by the
/// missing `card` index.
pub fn paginate(cards: &[CardSize], params: &PageParams) -> Result<Vec<PagePlacement>, String> {
    let (page_w, page_h) = params.effective_size();
    let (avail_w, avail_h) = params.printable_size();
    let margin = params.margin;
    let border = params.border.max(0.0);

    if !(avail_w > 0.0 && avail_h > 0.0 && avail_w.is_finite() && avail_h.is_finite()) {
        return Err(format!(
            "Margin {margin} leaves no printable area on a {page_w}×{page_h} page"
        ));
    }

    let mut placements = Vec::with_capacity(cards.len());
    let mut page = 0usize;
    let mut on_page = 0usize;
    let mut in_row = 0usize;
    let mut x = margin;
    let mut y = margin;
    let mut row_height = 0.0f32;

    for (i, card) in cards.iter().enumerate() {
        if !(card.width.is_finite() && card.height.is_finite() && card.width > 0.0 && card.height > 0.0)
        {
            log::error!("Card {i}: unusable size {}×{}, not placed", card.width, card.height);
            continue;
        }

        let footprint_w = card.width + 2.0 * border;
        let footprint_h = card.height + 2.0 * border;
        let scale = fit_scale(footprint_w, footprint_h, avail_w, avail_h);
        if scale < 1.0 && params.layout == LayoutMode::Grid {
            log::warn!(
                "Card {i}: {footprint_w}×{footprint_h} exceeds the printable area, scaled by {scale:.3}"
            );
        }
        let (footprint_w, footprint_h) = (footprint_w * scale, footprint_h * scale);

        match params.layout {
            LayoutMode::Grid => {
                if in_row > 0 && x + footprint_w > page_w - margin + FIT_EPSILON {
                    x = margin;
                    y += row_height + margin;
                    row_height = 0.0;
                    in_row = 0;
                }
                if on_page > 0 && y + footprint_h > page_h - margin + FIT_EPSILON {
                    page += 1;
                    on_page = 0;
                    x = margin;
                    y = margin;
                    row_height = 0.0;
                }
            }
            LayoutMode::OnePerPage => {
                if on_page > 0 {
                    page += 1;
                    on_page = 0;
                }
                x = margin;
                y = margin;
            }
        }

        let scaled_border = border * scale;
        placements.push(PagePlacement {
            card: i,
            page_index: page,
            x: x + scaled_border,
            y: y + scaled_border,
            width: card.width * scale,
            height: card.height * scale,
            border: scaled_border,
            scale,
        });
        log::debug!("Card {i} → page {page} at ({x:.2}, {y:.2})");

        x += footprint_w + margin;
        row_height = row_height.max(footprint_h);
        in_row += 1;
        on_page += 1;
    }

    Ok(placements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a4(margin: f32, border: f32) -> PageParams {
        PageParams {
            page_width: 210.0,
            page_height: 297.0,
            orientation: PageOrientation::Portrait,
            margin,
            border,
            layout: LayoutMode::Grid,
        }
    }

    fn cards(n: usize, width: f32, height: f32) -> Vec<CardSize> {
        vec![CardSize { width, height }; n]
    }

    fn positions(placements: &[PagePlacement]) -> Vec<(usize, f32, f32)> {
        placements.iter().map(|p| (p.page_index, p.x, p.y)).collect()
    }

    #[test]
    fn five_poker_cards_on_a4() {
        let placements = paginate(&cards(5, 63.0, 88.0), &a4(10.0, 0.0)).unwrap();
        assert_eq!(
            positions(&placements),
            vec![
                (0, 10.0, 10.0),
                (0, 83.0, 10.0),
                (0, 10.0, 108.0),
                (0, 83.0, 108.0),
                (1, 10.0, 10.0),
            ]
        );
        assert!(placements.iter().all(|p| p.scale == 1.0));
    }

    #[test]
    fn three_columns_fit_with_small_margin() {
        // 5 + 63 + 5 + 63 + 5 + 63 = 204 <= 205
        let placements = paginate(&cards(10, 63.0, 88.0), &a4(5.0, 0.0)).unwrap();
        let xs: Vec<f32> = placements.iter().take(3).map(|p| p.x).collect();
        assert_eq!(xs, vec![5.0, 73.0, 141.0]);
        // three rows: 5, 98, 191 (191 + 88 = 279 <= 292)
        assert_eq!(placements[8].y, 191.0);
        assert_eq!(placements[8].page_index, 0);
        assert_eq!(placements[9].page_index, 1);
    }

    #[test]
    fn border_inflates_the_footprint() {
        // Without border two columns fit exactly: 10 + 90 + 10 + 90 = 200.
        let params = a4(10.0, 0.0);
        let plain = paginate(&cards(2, 90.0, 50.0), &params).unwrap();
        assert_eq!(plain[1].page_index, 0);
        assert_eq!(plain[1].y, 10.0);

        let bordered = paginate(&cards(2, 90.0, 50.0), &a4(10.0, 1.0)).unwrap();
        assert_eq!((bordered[0].x, bordered[0].y), (11.0, 11.0));
        // 10 + 92 + 10 + 92 = 204 > 200 → second card wraps.
        assert_eq!((bordered[1].x, bordered[1].y), (11.0, 73.0));
    }

    #[test]
    fn landscape_fits_more_columns() {
        let params = PageParams {
            orientation: PageOrientation::Landscape,
            ..a4(10.0, 0.0)
        };
        let placements = paginate(&cards(4, 63.0, 88.0), &params).unwrap();
        // 297 wide: 10, 83, 156 fit (156 + 63 = 219 <= 287), 229 does not.
        let row: Vec<(usize, f32, f32)> = positions(&placements);
        assert_eq!(row[2], (0, 156.0, 10.0));
        assert_eq!(row[3], (0, 10.0, 108.0));
    }

    #[test]
    fn oversized_cards_are_scaled_with_their_border() {
        let params = a4(10.0, 5.0);
        let placements = paginate(&cards(1, 380.0, 100.0), &params).unwrap();
        let p = placements[0];
        // footprint 390 wide into 190 available
        let scale = 190.0 / 390.0;
        assert!((p.scale - scale).abs() < 1e-6);
        assert!((p.border - 5.0 * scale).abs() < 1e-5);
        assert!((p.x - p.border + p.width + 2.0 * p.border - 200.0).abs() < 1e-3);
    }

    #[test]
    fn placements_stay_inside_printable_area() {
        for border in [0.0, 0.5, 3.0] {
            for (w, h) in [(63.0, 88.0), (70.0, 120.0), (44.0, 67.0), (300.0, 400.0)] {
                let params = a4(7.0, border);
                for p in paginate(&cards(25, w, h), &params).unwrap() {
                    let (left, top) = (p.x - p.border, p.y - p.border);
                    let (right, bottom) = (p.x + p.width + p.border, p.y + p.height + p.border);
                    assert!(left >= 7.0 - 1e-3 && top >= 7.0 - 1e-3);
                    assert!(right <= 203.0 + 1e-2, "right edge {right} for {w}×{h}");
                    assert!(bottom <= 290.0 + 1e-2, "bottom edge {bottom} for {w}×{h}");
                }
            }
        }
    }

    #[test]
    fn one_per_page_layout() {
        let params = PageParams {
            layout: LayoutMode::OnePerPage,
            ..a4(10.0, 0.0)
        };
        let placements = paginate(&cards(3, 400.0, 100.0), &params).unwrap();
        let pages: Vec<usize> = placements.iter().map(|p| p.page_index).collect();
        assert_eq!(pages, vec![0, 1, 2]);
        assert!((placements[0].width - 190.0).abs() < 1e-3);
        assert!(placements.iter().all(|p| p.x == 10.0 && p.y == 10.0));
    }

    #[test]
    fn no_printable_area_is_an_error() {
        assert!(paginate(&cards(1, 10.0, 10.0), &a4(150.0, 0.0)).is_err());
    }

    #[test]
    fn unusable_sizes_are_skipped() {
        let input = vec![
            CardSize { width: 63.0, height: 88.0 },
            CardSize { width: f32::NAN, height: 88.0 },
            CardSize { width: 63.0, height: 88.0 },
        ];
        let placements = paginate(&input, &a4(10.0, 0.0)).unwrap();
        let ids: Vec<usize> = placements.iter().map(|p| p.card).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!((placements[1].x, placements[1].y), (83.0, 10.0));
    }
}
