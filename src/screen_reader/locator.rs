//! Perception seam: template and text location, plus pixel-color helpers

use std::collections::HashMap;

use image::{Rgb, RgbImage};

use super::screen_service::Region;
use crate::error::LocatorError;
use crate::geometry::{MatchBox, Point};

/// Grayscale weights shared by the bar reader and the bag gauge
pub const LUMA_WEIGHTS: [f32; 3] = [0.2989, 0.5870, 0.1140];

/// Channel spread under which a region counts as gray
pub const GRAY_THRESHOLD: i32 = 5;

/// Reference images the agent looks for. Each variant doubles as its cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Standby,
    Waiting,
    Ready,
    Pulling,
    CancelLair,
    CancelParty,
    CancelRaid,
    Talk,
    Pick,
    Trade,
    SelectAll,
    Exchange,
    Close,
    Shop,
    Amount,
    Number9,
    Buy,
    FindNpc,
    Navigate,
    IconFish,
    IconBlacksmith,
    NpcFish,
    NpcBlacksmith,
    Services,
    WhiteUnticked,
    BlueUnticked,
    YellowUnticked,
    NoWhite,
    NoBlue,
    NoYellow,
    Salvage,
    IconBag,
}

impl Template {
    /// File under `<data_dir>/images/`
    pub fn file_name(&self) -> &'static str {
        match self {
            Template::Standby => "standby.png",
            Template::Waiting => "not_ready.png",
            Template::Ready => "pull.png",
            Template::Pulling => "pulling.png",
            Template::CancelLair => "cancel_lair.png",
            Template::CancelParty | Template::CancelRaid => "cancel.png",
            Template::Talk => "talk.png",
            Template::Pick => "pick.png",
            Template::Trade => "trade.png",
            Template::SelectAll => "select_all.png",
            Template::Exchange => "exchange.png",
            Template::Close => "x.png",
            Template::Shop => "shop.png",
            Template::Amount => "amount.png",
            Template::Number9 => "number9.png",
            Template::Buy => "buy.png",
            Template::FindNpc => "find_npc.png",
            Template::Navigate => "navigate.png",
            Template::IconFish => "icon_fish.png",
            Template::IconBlacksmith => "icon_bs.png",
            Template::NpcFish => "npc_fish.png",
            Template::NpcBlacksmith => "npc_bs.png",
            Template::Services => "services.png",
            Template::WhiteUnticked => "white_unticked.png",
            Template::BlueUnticked => "blue_unticked.png",
            Template::YellowUnticked => "yellow_unticked.png",
            Template::NoWhite => "no_white.png",
            Template::NoBlue => "no_blue.png",
            Template::NoYellow => "no_yellow.png",
            Template::Salvage => "salvage.png",
            Template::IconBag => "icon_bag.png",
        }
    }

    /// Key in the calibration cache
    pub fn key(&self) -> &'static str {
        match self {
            Template::Standby => "standby",
            Template::Waiting => "waiting",
            Template::Ready => "ready",
            Template::Pulling => "pulling",
            Template::CancelLair => "interrupted_lair",
            Template::CancelParty => "interrupted_party",
            Template::CancelRaid => "interrupted_raid",
            Template::Talk => "talk",
            Template::Pick => "pick",
            Template::Trade => "trade",
            Template::SelectAll => "select_all",
            Template::Exchange => "exchange",
            Template::Close => "x",
            Template::Shop => "shop",
            Template::Amount => "amount",
            Template::Number9 => "number9",
            Template::Buy => "buy",
            Template::FindNpc => "find_npc",
            Template::Navigate => "navigate",
            Template::IconFish => "icon_fish",
            Template::IconBlacksmith => "icon_bs",
            Template::NpcFish => "npc_fish",
            Template::NpcBlacksmith => "npc_bs",
            Template::Services => "services",
            Template::WhiteUnticked => "white_unticked",
            Template::BlueUnticked => "blue_unticked",
            Template::YellowUnticked => "yellow_unticked",
            Template::NoWhite => "no_white",
            Template::NoBlue => "no_blue",
            Template::NoYellow => "no_yellow",
            Template::Salvage => "salvage",
            Template::IconBag => "icon_bag",
        }
    }

    /// HUD widgets that never move, so a hit is worth caching
    pub fn is_anchored(&self) -> bool {
        matches!(
            self,
            Template::Standby
                | Template::Waiting
                | Template::Ready
                | Template::Pulling
                | Template::CancelLair
                | Template::CancelParty
                | Template::CancelRaid
                | Template::Talk
                | Template::Pick
        )
    }
}

/// One word recognised by OCR, in image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    pub text: String,
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub conf: f32,
}

/// Image and text location on the live screen.
///
/// A miss is `None` or an empty list. Boxes are in absolute screen pixels except for
/// `locate_in`, which reports coordinates relative to the given image.
pub trait Locator {
    /// Capture the screen, or a region of it, as RGB
    fn capture(&self, region: Option<Region>) -> Option<RgbImage>;

    /// Every position scoring above `confidence`, in row-major order
    fn locate_all(&self, template: Template, region: Option<Region>, confidence: f32) -> Vec<MatchBox>;

    fn locate(&self, template: Template, region: Option<Region>, confidence: f32) -> Option<MatchBox> {
        self.locate_all(template, region, confidence).into_iter().next()
    }

    /// Match against an already captured (and possibly filtered) image
    fn locate_in(&self, template: Template, haystack: &RgbImage, confidence: f32) -> Option<MatchBox>;

    /// OCR restricted to the characters in `whitelist`
    fn read_text(&self, image: &RgbImage, whitelist: &str) -> Result<Vec<TextHit>, LocatorError>;
}

pub fn luminance(px: &Rgb<u8>) -> f32 {
    px[0] as f32 * LUMA_WEIGHTS[0] + px[1] as f32 * LUMA_WEIGHTS[1] + px[2] as f32 * LUMA_WEIGHTS[2]
}

/// Every channel within `tolerance` (inclusive) of `color`
pub fn color_close(px: &Rgb<u8>, color: [u8; 3], tolerance: i32) -> bool {
    px.0.iter()
        .zip(color)
        .all(|(a, b)| (*a as i32 - b as i32).abs() <= tolerance)
}

/// True when neighbouring channels of every pixel differ by less than `threshold`
pub fn is_achromatic(img: &RgbImage, threshold: i32) -> bool {
    img.pixels().all(|px| {
        let [r, g, b] = px.0.map(i32::from);
        (r - g).abs() < threshold && (g - b).abs() < threshold
    })
}

/// Black out every pixel with any channel at or beyond `threshold` from `color`
pub fn extract_color(img: &RgbImage, color: [u8; 3], threshold: i32) -> RgbImage {
    let mut out = img.clone();
    for px in out.pixels_mut() {
        if !color_close(px, color, threshold - 1) {
            *px = Rgb([0, 0, 0]);
        }
    }
    out
}

/// Coordinates of pixels within `tolerance` of any of `colors`
pub fn color_pixels(img: &RgbImage, colors: &[[u8; 3]], tolerance: i32) -> Vec<(u32, u32)> {
    img.enumerate_pixels()
        .filter(|(_, _, px)| colors.iter().any(|c| color_close(px, *c, tolerance)))
        .map(|(x, y, _)| (x, y))
        .collect()
}

/// Single screen pixel strictly within `tolerance` of `color`
pub fn pixel_matches(locator: &dyn Locator, at: Point, color: [u8; 3], tolerance: i32) -> bool {
    let Some(img) = locator.capture(Some(Region::new(at.x, at.y, 1, 1))) else {
        return false;
    };
    match img.pixels().next() {
        Some(px) => color_close(px, color, tolerance - 1),
        None => false,
    }
}

/// Median position of all pixels in `img` matching `color`, if more than `min_count` match
pub fn color_median(img: &RgbImage, color: [u8; 3], tolerance: i32, min_count: usize) -> Option<(u32, u32)> {
    let pts = color_pixels(img, &[color], tolerance);
    if pts.len() <= min_count {
        return None;
    }
    let mut xs: Vec<u32> = pts.iter().map(|p| p.0).collect();
    let mut ys: Vec<u32> = pts.iter().map(|p| p.1).collect();
    xs.sort_unstable();
    ys.sort_unstable();
    Some((median(&xs), median(&ys)))
}

fn median(sorted: &[u32]) -> u32 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2
    }
}

/// Capture a region, optionally keep only pixels near a color, and OCR it.
///
/// Returns recognised words mapped to their screen boxes; words with empty boxes are dropped.
pub fn text_locate(
    locator: &dyn Locator,
    region: Option<Region>,
    filter: Option<([u8; 3], i32)>,
    whitelist: &str,
) -> Result<HashMap<String, MatchBox>, LocatorError> {
    let Some(img) = locator.capture(region) else {
        return Ok(HashMap::new());
    };
    let img = match filter {
        Some((color, threshold)) => extract_color(&img, color, threshold),
        None => img,
    };
    let (dx, dy) = region.map(|r| (r.left, r.top)).unwrap_or((0, 0));

    let mut found = HashMap::new();
    for hit in locator.read_text(&img, whitelist)? {
        let word = hit.text.trim();
        if word.is_empty() {
            continue;
        }
        if let Ok(b) = MatchBox::from_match(hit.left + dx, hit.top + dy, hit.width, hit.height) {
            found.entry(word.to_string()).or_insert(b);
        }
    }
    Ok(found)
}
