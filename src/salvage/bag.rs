//! Bag capacity gauge

use image::RgbImage;

use crate::error::Result;
use crate::screen_reader::locator::luminance;
use crate::screen_reader::Template;
use crate::session::Session;
use crate::utils::Activity;

/// Luminance step that marks the fill line of the gauge
const EDGE_STEP: f32 = 15.0;
const OPEN_TIMEOUT_SECS: f64 = 10.0;

/// Remaining capacity (0 = full, 1 = empty) read from a 1-px column of the gauge
pub fn capacity_from_column(column: &RgbImage) -> Option<f64> {
    let h = column.height();
    if h == 0 || column.width() == 0 {
        return None;
    }
    let lum: Vec<f32> = (0..h).map(|y| luminance(column.get_pixel(0, y))).collect();
    let edge = lum
        .windows(2)
        .map(|w| w[1] - w[0])
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, d)| match best {
            Some((_, max)) if max >= d => best,
            _ => Some((i, d)),
        });

    match edge {
        Some((i, d)) if d > EDGE_STEP => Some((i as f64 / h as f64 + 0.02).min(1.0)),
        _ => {
            let mean_red = (0..h).map(|y| column.get_pixel(0, y)[0] as f64).sum::<f64>() / h as f64;
            Some(if mean_red > 100.0 { 0.0 } else { 1.0 })
        }
    }
}

/// Open the bag, read the gauge and close it again. `None` when the bag never opened.
pub fn check_bag_capacity(session: &Session) -> Result<Option<f64>> {
    let s = session;
    s.state.set_activity(Activity::CheckingBag);
    s.activate()?;
    s.sleep(1.0);
    let Some(icon) = s.check(Template::IconBag, 0.8) else {
        tracing::debug!("[BAG] Bag icon not visible");
        return Ok(None);
    };
    s.click_box(&icon)?;
    let start = s.clock.now();
    s.sleep(3.0);
    let mut close = s.check(Template::Close, 0.8);
    while close.is_none() && s.clock.since(start) < OPEN_TIMEOUT_SECS {
        s.sleep(1.0);
        close = s.check(Template::Close, 0.8);
    }
    let Some(close) = close else {
        tracing::warn!("[BAG] Bag did not open");
        return Ok(None);
    };

    let capacity = s
        .capture(Some(s.profile.bag_gauge))
        .and_then(|column| capacity_from_column(&column));
    s.click_box(&close)?;
    if let Some(c) = capacity {
        tracing::info!("[BAG] Remaining capacity {:.0}%", c * 100.0);
    }
    Ok(capacity)
}
