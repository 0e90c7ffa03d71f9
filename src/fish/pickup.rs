//! Loot pickup by item-label color

use rand::Rng;

use crate::error::Result;
use crate::geometry::Point;
use crate::input::MouseButton;
use crate::screen_reader::locator::color_pixels;
use crate::session::Session;

const BLUE: [u8; 3] = [89, 96, 241];
const YELLOW: [u8; 3] = [233, 231, 77];
const ORANGE: [u8; 3] = [243, 143, 36];
const COLOR_TOLERANCE: i32 = 5;

const MIN_Y_OFFSET: i32 = 30;
const MAX_Y_OFFSET: i32 = 150;
const CLICK_SPAN: i32 = 120;
const CLICK_FLEX: f64 = 30.0;

/// Orange pixels above which the last attempt warns about legendary drops
const LEGENDARY_PIXELS: usize = 10;

/// Bounding box of matched label pixels, relative to the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// Bounding box of the matched pixels
pub fn label_bounds(pts: &[(u32, u32)]) -> Option<LabelBounds> {
    let min_x = pts.iter().map(|p| p.0).min()? as i32;
    let min_y = pts.iter().map(|p| p.1).min()? as i32;
    let max_x = pts.iter().map(|p| p.0).max()? as i32;
    let max_y = pts.iter().map(|p| p.1).max()? as i32;
    Some(LabelBounds { left: min_x, top: min_y, width: max_x - min_x, height: max_y - min_y })
}

/// Unjittered click grid over the labels, in the capture's coordinates.
///
/// The area is shifted down below the labels since items lie under their names.
pub fn click_grid(bounds: LabelBounds) -> Vec<Point> {
    let left = bounds.left;
    let top = bounds.top + MIN_Y_OFFSET;
    let height = bounds.height + MAX_Y_OFFSET - MIN_Y_OFFSET;
    let half = CLICK_SPAN / 2;
    let mut points = Vec::new();
    for j in 0..=height / CLICK_SPAN {
        for i in 0..=bounds.width / CLICK_SPAN {
            points.push(Point::new(left + CLICK_SPAN * i + half, top + CLICK_SPAN * j + half));
        }
    }
    points
}

/// Click over every visible item label. Returns `false` when nothing was found.
pub fn pickup(session: &Session, attempted: u32, pickup_blue: bool, legendary_alarm: bool) -> Result<bool> {
    let region = session.profile.pickup_region;
    let Some(img) = session.capture(Some(region)) else {
        return Ok(false);
    };
    let colors: &[[u8; 3]] = if pickup_blue { &[BLUE, YELLOW, ORANGE] } else { &[YELLOW, BLUE] };
    let pts = color_pixels(&img, colors, COLOR_TOLERANCE);
    let Some(bounds) = label_bounds(&pts) else {
        return Ok(false);
    };

    let mut rng = rand::thread_rng();
    let mut flex = || ((rng.gen::<f64>() - 0.5) * CLICK_FLEX) as i32;
    for p in click_grid(bounds) {
        let at = Point::new(region.left + p.x + flex(), region.top + p.y + flex());
        session.click_point(at, MouseButton::Left)?;
        session.sleep(0.1);
    }

    let last = session.profile.pickup_limit.map_or(false, |limit| attempted + 1 >= limit);
    if legendary_alarm && last && color_pixels(&img, &[ORANGE], COLOR_TOLERANCE).len() > LEGENDARY_PIXELS {
        tracing::warn!("[PICKUP] Legendary items are still lying on the ground");
    }
    tracing::info!("[PICKUP] Finished picking attempt #{}", attempted + 1);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Game;
    use image::Rgb;

    #[test]
    fn test_click_grid_covers_labels() {
        let grid = click_grid(LabelBounds { left: 10, top: 20, width: 250, height: 0 });
        // 250 wide -> 3 columns, 120 tall after the shift -> 2 rows
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0], Point::new(70, 110));
        assert_eq!(grid[2], Point::new(310, 110));
        assert_eq!(grid[3], Point::new(70, 230));
    }

    #[test]
    fn test_label_bounds() {
        assert_eq!(label_bounds(&[]), None);
        let b = label_bounds(&[(5, 9), (40, 2), (12, 30)]).unwrap();
        assert_eq!(b, LabelBounds { left: 5, top: 2, width: 35, height: 28 });
    }

    #[test]
    fn test_pickup_without_labels() {
        let game = Game::windows();
        assert!(!pickup(&game.session(), 0, true, false).unwrap());
        assert_eq!(game.input.clicks(), 0);
    }

    #[test]
    fn test_pickup_clicks_below_yellow_label() {
        let game = Game::windows();
        game.scene().fill(|x, y| {
            if (500..540).contains(&x) && (300..304).contains(&y) {
                Rgb([235, 230, 75])
            } else {
                Rgb([20, 20, 20])
            }
        });
        assert!(pickup(&game.session(), 0, true, true).unwrap());
        // 39 wide -> one column, 123 tall -> two rows
        assert_eq!(game.input.clicks(), 2);
    }
}
