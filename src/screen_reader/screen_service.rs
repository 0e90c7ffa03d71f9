//! Screen capture service

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbImage};
use screenshots::Screen;
use serde::{Deserialize, Serialize};

/// Region for screenshot capture, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// Create from window rect (x1, y1, x2, y2)
    pub fn from_rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            left: x1,
            top: y1,
            width: (x2 - x1).max(0) as u32,
            height: (y2 - y1).max(0) as u32,
        }
    }

    /// Same region moved by a window origin
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self { left: self.left + dx, top: self.top + dy, ..*self }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Service for capturing screenshots
pub struct ScreenService {
    retries: u32,
    delay: Duration,
}

impl ScreenService {
    pub fn new() -> Self {
        Self { retries: 3, delay: Duration::from_millis(100) }
    }

    /// Take a screenshot with retries; `None` after the last failure
    pub fn safe_screenshot(&self, region: Option<Region>) -> Option<RgbImage> {
        if region.is_some_and(|r| r.is_empty()) {
            return None;
        }
        for i in 0..self.retries {
            match self.capture(region) {
                Ok(img) => return Some(img),
                Err(e) => {
                    tracing::warn!("Screenshot failed: {}. Retrying ({}/{})", e, i + 1, self.retries);
                    thread::sleep(self.delay);
                }
            }
        }
        None
    }

    fn capture(&self, region: Option<Region>) -> Result<RgbImage> {
        let screens = Screen::all().context("Failed to get screens")?;
        let screen = screens.first().context("No screens found")?;

        let image = match region {
            Some(r) => screen
                .capture_area(r.left, r.top, r.width, r.height)
                .context("Failed to capture area")?,
            None => screen.capture().context("Failed to capture screen")?,
        };

        // screenshots links its own `image` version; go through raw bytes
        let rgba = image::RgbaImage::from_raw(image.width(), image.height(), image.to_vec())
            .context("Failed to create image from raw data")?;

        Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}

impl Default for ScreenService {
    fn default() -> Self {
        Self::new()
    }
}
