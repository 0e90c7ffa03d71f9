//! Screen geometry: points and located boxes

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::screen_reader::Region;

/// A point in screen capture pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Fractional insets applied to a box before picking a random click point.
///
/// Left/top are added, right/bottom are negative and shrink the far edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inset {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Inset {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }
}

impl Default for Inset {
    fn default() -> Self {
        Self::new(0.2, 0.2, -0.2, -0.2)
    }
}

/// An axis-aligned rectangle reported by the locator.
///
/// Width and height are always positive. The wire form is `[left, top, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[i32; 4]", into = "[i32; 4]")]
pub struct MatchBox {
    left: i32,
    top: i32,
    width: i32,
    height: i32,
}

impl MatchBox {
    /// Build a box from a locator hit
    pub fn from_match(left: i32, top: i32, width: i32, height: i32) -> Result<Self, Error> {
        if width <= 0 || height <= 0 {
            return Err(Error::MalformedBox([left, top, width, height]));
        }
        Ok(Self { left, top, width, height })
    }

    /// Box over a calibrated region such as the minimap
    pub fn from_region(r: Region) -> Result<Self, Error> {
        Self::from_match(r.left, r.top, r.width as i32, r.height as i32)
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Integer center, rounding toward the top-left
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2, self.top + self.height / 2)
    }

    /// Same box moved by an offset
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self { left: self.left + dx, top: self.top + dy, ..*self }
    }

    /// Box grown by a border on every side
    pub fn grown(&self, dx: i32, dy: i32) -> Self {
        Self {
            left: self.left - dx,
            top: self.top - dy,
            width: (self.width + 2 * dx).max(1),
            height: (self.height + 2 * dy).max(1),
        }
    }

    /// Search region covering this box
    pub fn region(&self) -> Region {
        Region::new(self.left, self.top, self.width as u32, self.height as u32)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right() && p.y >= self.top && p.y < self.bottom()
    }

    /// Two samples of the same on-screen object agree when every edge moved at most `max_diff`.
    pub fn matches(&self, other: &MatchBox, max_diff: i32) -> bool {
        (self.left - other.left).abs() <= max_diff
            && (self.top - other.top).abs() <= max_diff
            && (self.right() - other.right()).abs() <= max_diff
            && (self.bottom() - other.bottom()).abs() <= max_diff
    }

    /// Uniformly random point inside the inset area
    pub fn random_point<R: Rng + ?Sized>(&self, inset: Inset, rng: &mut R) -> Point {
        let left = self.left as f32 + inset.left * self.width as f32;
        let top = self.top as f32 + inset.top * self.height as f32;
        let width = self.width as f32 * (1.0 - inset.left + inset.right);
        let height = self.height as f32 * (1.0 - inset.top + inset.bottom);
        let x = left + rng.gen::<f32>() * width.max(0.0);
        let y = top + rng.gen::<f32>() * height.max(0.0);
        Point::new(x as i32, y as i32)
    }
}

impl TryFrom<[i32; 4]> for MatchBox {
    type Error = Error;

    fn try_from(raw: [i32; 4]) -> Result<Self, Error> {
        Self::from_match(raw[0], raw[1], raw[2], raw[3])
    }
}

impl From<MatchBox> for [i32; 4] {
    fn from(b: MatchBox) -> Self {
        [b.left, b.top, b.width, b.height]
    }
}
