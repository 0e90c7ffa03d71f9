//! Pull-bar reader: turns a captured strip into a nudge decision

use std::cell::Cell;

use image::RgbImage;

use crate::error::Result;
use crate::profile::{BarMechanic, ColorBar, IndexBar, Nudge};
use crate::screen_reader::locator::luminance;
use crate::screen_reader::Template;
use crate::session::Session;
use crate::utils::clock::jitter;

/// A successful read of the bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// Target-zone span of the index bar
    Span(usize),
    /// In-zone share of the color bar, percent
    Percent(f64),
}

/// Marker position and target zone of one index-bar scanline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarReading {
    pub pointer: usize,
    pub bright: Vec<usize>,
    pub span: usize,
    pub len: usize,
}

/// What to do about a plausible reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarAction {
    Nudge(usize),
    Pause,
}

/// Luminance of the first row of a strip
pub fn luminance_row(strip: &RgbImage) -> Vec<f32> {
    if strip.height() == 0 {
        return Vec::new();
    }
    (0..strip.width()).map(|x| luminance(strip.get_pixel(x, 0))).collect()
}

/// Marker index: last pixel of the longest run of at least `n_dark` dark pixels (leftmost on
/// ties), moved back by `n_offset`. `None` when there is no such run or it lands before 0.
pub fn pointer_index(lum: &[f32], dark: f32, n_dark: usize, n_offset: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None; // (len, last index)
    let mut run = 0;
    for (i, v) in lum.iter().enumerate() {
        if *v < dark {
            run += 1;
        } else {
            run = 0;
        }
        let run_ends = run > 0 && lum.get(i + 1).map_or(true, |next| *next >= dark);
        if run_ends && run >= n_dark.max(1) && best.map_or(true, |(len, _)| run > len) {
            best = Some((run, i));
        }
    }
    best.and_then(|(_, last)| last.checked_sub(n_offset))
}

/// Indices strictly brighter than `bright`
pub fn bright_indices(lum: &[f32], bright: f32) -> Vec<usize> {
    lum.iter()
        .enumerate()
        .filter(|(_, v)| **v > bright)
        .map(|(i, _)| i)
        .collect()
}

/// Max minus min of the indices; 0 with fewer than two
pub fn span(indices: &[usize]) -> usize {
    match (indices.iter().min(), indices.iter().max()) {
        (Some(lo), Some(hi)) if indices.len() > 1 => hi - lo,
        _ => 0,
    }
}

/// Read marker and zone; `None` when the marker or the zone is missing
pub fn read_index_bar(lum: &[f32], cfg: &IndexBar) -> Option<BarReading> {
    let pointer = pointer_index(lum, cfg.dark, cfg.n_dark, cfg.n_offset)?;
    let bright = bright_indices(lum, cfg.bright);
    if bright.is_empty() {
        return None;
    }
    let span = span(&bright);
    Some(BarReading { pointer, bright, span, len: lum.len() })
}

/// Plausible target zone, or a narrow zone already pinned at the right edge
pub fn is_plausible(reading: &BarReading, cfg: &IndexBar) -> bool {
    let n = reading.bright.len();
    let zone = (2..=10).contains(&n) && cfg.lb < reading.span && reading.span < cfg.ub;
    let right_end = reading.bright[0] > cfg.right_edge && reading.span < 10;
    zone || right_end
}

/// Nudge count for a plausible reading; `None` when the reading is inconclusive
pub fn decide(reading: &BarReading, cfg: &IndexBar) -> Option<BarAction> {
    if !is_plausible(reading, cfg) {
        return None;
    }
    let c = reading.pointer as i64;
    let first = reading.bright[0] as i64;
    let last = reading.bright[reading.bright.len() - 1] as i64;
    let step = cfg.step.max(1) as i64;

    let action = if first < c && c < last - step {
        BarAction::Nudge(1)
    } else if reading.span < 10 {
        BarAction::Nudge(((reading.len as i64 - c).max(0) / step) as usize)
    } else if c < first {
        BarAction::Nudge(((last - c) / step) as usize)
    } else {
        BarAction::Pause
    };
    Some(action)
}

/// Percent of pixels within `tolerance` (exclusive) of `color`; `None` for an empty strip
pub fn color_share(strip: &RgbImage, color: [u8; 3], tolerance: i32) -> Option<f64> {
    let total = strip.width() as usize * strip.height() as usize;
    if total == 0 {
        return None;
    }
    let hits = strip
        .pixels()
        .filter(|px| px.0.iter().zip(color).all(|(a, b)| (*a as i32 - b as i32).abs() < tolerance))
        .count();
    Some(hits as f64 * 100.0 / total as f64)
}

/// Reads the bar with the profile's mechanic and issues nudges
pub struct BarReader<'a> {
    session: Session<'a>,
    /// Missing ready button already reported for this pull
    warned: Cell<bool>,
}

impl<'a> BarReader<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session, warned: Cell::new(false) }
    }

    /// One poll. `Some` means the bar was read; `None` means retry.
    pub fn pull(&self) -> Result<Option<Signal>> {
        match &self.session.profile.bar {
            BarMechanic::Index(cfg) => self.pull_index(cfg),
            BarMechanic::Color(cfg) => self.pull_color(cfg),
        }
    }

    fn pull_index(&self, cfg: &IndexBar) -> Result<Option<Signal>> {
        let Some(strip) = self.session.capture(Some(cfg.strip)) else {
            return Ok(None);
        };
        let lum = luminance_row(&strip);
        let Some(reading) = read_index_bar(&lum, cfg) else {
            return Ok(None);
        };
        let Some(action) = decide(&reading, cfg) else {
            tracing::trace!("[BAR] Inconclusive: {} bright, span {}", reading.bright.len(), reading.span);
            return Ok(None);
        };
        tracing::trace!("[BAR] pointer {} span {} -> {:?}", reading.pointer, reading.span, action);
        match action {
            BarAction::Nudge(n) => self.nudge(n)?,
            BarAction::Pause => self.session.sleep(jitter(0.03)),
        }
        Ok(Some(Signal::Span(reading.span)))
    }

    fn pull_color(&self, cfg: &ColorBar) -> Result<Option<Signal>> {
        let Some(strip) = self.session.capture(Some(cfg.strip)) else {
            return Ok(None);
        };
        let Some(percent) = color_share(&strip, cfg.color, cfg.tolerance) else {
            return Ok(None);
        };
        if percent < cfg.min_percent {
            tracing::trace!("[BAR] Out of zone ({:.1}% in zone), nudging", percent);
            self.nudge(1)?;
            return Ok(Some(Signal::Percent(percent)));
        }
        tracing::trace!("[BAR] Stable ({:.1}% in zone)", percent);
        Ok(None)
    }

    fn nudge(&self, times: usize) -> Result<()> {
        if times == 0 {
            return Ok(());
        }
        match self.session.profile.nudge {
            Nudge::Key(key) => {
                for _ in 0..times {
                    self.session.input.press_key(key, std::time::Duration::from_millis(10))?;
                }
            }
            Nudge::ClickReadyBox => {
                let ready = self
                    .session
                    .cache
                    .get(Template::Ready.key())
                    .or_else(|| self.session.check(Template::Ready, 0.8));
                match ready {
                    Some(b) => self.session.click_box_with(
                        &b,
                        times as u32,
                        0.01,
                        crate::input::MouseButton::Left,
                        Default::default(),
                    )?,
                    None if !self.warned.replace(true) => {
                        tracing::warn!("[BAR] Ready button not found, cannot nudge")
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Key;
    use crate::profile::{BarMechanic, PlatformProfile};
    use crate::screen_reader::Settings;
    use crate::testing::{mb, Game};
    use crate::geometry::Point;
    use image::Rgb;

    fn mac_bar() -> IndexBar {
        match PlatformProfile::macos(Point::new(0, 0), Point::new(0, 0), &Settings::default()).bar {
            BarMechanic::Index(cfg) => cfg,
            BarMechanic::Color(_) => unreachable!(),
        }
    }

    fn strip(len: usize, dark: std::ops::Range<usize>, bright: &[usize]) -> Vec<f32> {
        (0..len)
            .map(|i| {
                if dark.contains(&i) {
                    20.0
                } else if bright.contains(&i) {
                    220.0
                } else {
                    110.0
                }
            })
            .collect()
    }

    #[test]
    fn test_pointer_is_end_of_dark_run_minus_offset() {
        let lum = strip(882, 41..51, &[]);
        assert_eq!(pointer_index(&lum, 70.0, 10, 8), Some(42));
    }

    #[test]
    fn test_short_dark_run_is_no_pointer() {
        let lum = strip(882, 41..50, &[]);
        assert_eq!(pointer_index(&lum, 70.0, 10, 8), None);
    }

    #[test]
    fn test_pointer_before_strip_start() {
        let lum = strip(100, 0..5, &[]);
        assert_eq!(pointer_index(&lum, 70.0, 3, 8), None);
    }

    #[test]
    fn test_longest_run_wins() {
        let mut lum = strip(300, 10..22, &[]);
        for v in lum.iter_mut().take(130).skip(100) {
            *v = 10.0;
        }
        assert_eq!(pointer_index(&lum, 70.0, 10, 0), Some(129));
    }

    #[test]
    fn test_span() {
        assert_eq!(span(&[]), 0);
        assert_eq!(span(&[7]), 0);
        assert_eq!(span(&[200, 205, 300]), 100);
    }

    #[test]
    fn test_pointer_inside_zone_nudges_once() {
        let cfg = mac_bar();
        let lum = strip(882, 291..301, &[200, 230, 260, 500]);
        let reading = read_index_bar(&lum, &cfg).unwrap();
        assert_eq!(reading.pointer, 292);
        assert_eq!(reading.span, 300);
        assert_eq!(decide(&reading, &cfg), Some(BarAction::Nudge(1)));
    }

    #[test]
    fn test_pointer_before_zone_nudges_to_zone_end() {
        let cfg = mac_bar();
        let lum = strip(882, 50..60, &[300, 320, 500]);
        let reading = read_index_bar(&lum, &cfg).unwrap();
        assert_eq!(reading.pointer, 51);
        // (500 - 51) / 80
        assert_eq!(decide(&reading, &cfg), Some(BarAction::Nudge(5)));
    }

    #[test]
    fn test_narrow_zone_at_right_edge() {
        let cfg = mac_bar();
        let lum = strip(882, 690..700, &[700, 705]);
        let reading = read_index_bar(&lum, &cfg).unwrap();
        assert_eq!(reading.pointer, 691);
        // (882 - 691) / 80
        assert_eq!(decide(&reading, &cfg), Some(BarAction::Nudge(2)));
    }

    #[test]
    fn test_pointer_past_zone_pauses() {
        let cfg = mac_bar();
        let lum = strip(882, 450..460, &[200, 250, 400]);
        let reading = read_index_bar(&lum, &cfg).unwrap();
        assert_eq!(decide(&reading, &cfg), Some(BarAction::Pause));
    }

    #[test]
    fn test_inconclusive_zone() {
        let cfg = mac_bar();
        // eleven bright pixels is not a target zone
        let bright: Vec<usize> = (300..311).collect();
        let lum = strip(882, 50..60, &bright);
        let reading = read_index_bar(&lum, &cfg).unwrap();
        assert_eq!(decide(&reading, &cfg), None);
    }

    #[test]
    fn test_no_bright_pixels_is_a_failed_read() {
        let cfg = mac_bar();
        assert!(read_index_bar(&strip(882, 50..60, &[]), &cfg).is_none());
        assert!(read_index_bar(&[], &cfg).is_none());
    }

    #[test]
    fn test_color_share() {
        let mut img = RgbImage::from_pixel(100, 2, Rgb([0, 0, 0]));
        img.put_pixel(3, 1, Rgb([115, 40, 30]));
        assert_eq!(color_share(&img, [111, 44, 35], 20), Some(0.5));
        assert_eq!(color_share(&RgbImage::new(0, 0), [111, 44, 35], 20), None);
    }

    #[test]
    fn test_reader_presses_nudge_key() {
        let game = Game::macos();
        game.scene().fill(|x, _| {
            if (291..301).contains(&(x - 612)) {
                Rgb([10, 10, 10])
            } else if [812, 842, 872, 1112].contains(&x) {
                Rgb([250, 250, 250])
            } else {
                Rgb([110, 110, 110])
            }
        });
        let reader = BarReader::new(game.session());
        assert_eq!(reader.pull().unwrap(), Some(Signal::Span(300)));
        assert_eq!(game.input.presses(Key::Char('n')), 1);
    }

    #[test]
    fn test_color_reader_clicks_ready_box() {
        let mut game = Game::windows();
        game.profile.bar = BarMechanic::Color(ColorBar {
            strip: crate::screen_reader::Region::new(560, 160, 806, 2),
            color: [111, 44, 35],
            tolerance: 20,
            min_percent: 1.0,
        });
        game.cache.put("ready", mb(1700, 900, 100, 100));
        let reader = BarReader::new(game.session());
        assert!(matches!(reader.pull().unwrap(), Some(Signal::Percent(p)) if p == 0.0));
        assert_eq!(game.input.clicks(), 1);

        game.scene().fill(|_, _| Rgb([111, 44, 35]));
        let reader = BarReader::new(game.session());
        assert_eq!(reader.pull().unwrap(), None);
        assert_eq!(game.input.clicks(), 1);
    }

    #[test]
    fn test_color_reader_finds_uncached_ready_box() {
        let mut game = Game::windows();
        game.profile.bar = BarMechanic::Color(ColorBar {
            strip: crate::screen_reader::Region::new(560, 160, 806, 2),
            color: [111, 44, 35],
            tolerance: 20,
            min_percent: 1.0,
        });
        let reader = BarReader::new(game.session());
        // nothing to click: the read still counts and polling goes on quietly
        for _ in 0..3 {
            assert!(reader.pull().unwrap().is_some());
        }
        assert_eq!(game.input.clicks(), 0);
        assert!(reader.warned.get());

        game.scene().show(Template::Ready, mb(1700, 900, 100, 100));
        assert!(reader.pull().unwrap().is_some());
        assert_eq!(game.input.clicks(), 1);
    }
}
