//! Index-bar reading end to end: scanline luminance to nudge decision
//!
//! Run with: cargo test --test bar_scenarios

use image::{Rgb, RgbImage};

use immortal_angler::fish::bar::{decide, is_plausible, luminance_row, pointer_index, read_index_bar, span, BarAction};
use immortal_angler::geometry::Point;
use immortal_angler::profile::{BarMechanic, IndexBar};
use immortal_angler::{PlatformProfile, Settings};

const BAR_LEN: u32 = 882;
const DARK: u8 = 20;
const MID: u8 = 110;
const BRIGHT: u8 = 230;

fn index_bar() -> IndexBar {
    match PlatformProfile::macos(Point::new(0, 0), Point::new(0, 0), &Settings::default()).bar {
        BarMechanic::Index(cfg) => cfg,
        BarMechanic::Color(_) => panic!("default settings use the index bar"),
    }
}

/// A one-row strip: gray background, a dark marker run and bright zone pixels
fn scanline(dark: std::ops::Range<u32>, bright: &[u32]) -> RgbImage {
    RgbImage::from_fn(BAR_LEN, 1, |x, _| {
        let v = if dark.contains(&x) {
            DARK
        } else if bright.contains(&x) {
            BRIGHT
        } else {
            MID
        };
        Rgb([v, v, v])
    })
}

#[test]
fn test_marker_position_from_captured_strip() {
    let cfg = index_bar();
    // ten dark pixels ending at index 50
    let lum = luminance_row(&scanline(41..51, &[]));
    assert_eq!(lum.len(), BAR_LEN as usize);
    assert_eq!(pointer_index(&lum, cfg.dark, cfg.n_dark, cfg.n_offset), Some(42));
}

#[test]
fn test_zone_span_outside_bounds_is_not_a_target() {
    let cfg = index_bar();
    let lum = luminance_row(&scanline(41..51, &[200, 205, 300]));
    let reading = read_index_bar(&lum, &cfg).expect("marker and zone visible");
    assert_eq!(reading.bright, vec![200, 205, 300]);
    assert_eq!(span(&reading.bright), 100);
    // a span of 100 is narrower than the lower bound of 150
    assert!(!is_plausible(&reading, &cfg));
    assert_eq!(decide(&reading, &cfg), None);
}

#[test]
fn test_marker_left_of_zone_is_pushed_through() {
    let cfg = index_bar();
    let lum = luminance_row(&scanline(41..51, &[200, 205, 400]));
    let reading = read_index_bar(&lum, &cfg).expect("marker and zone visible");
    assert_eq!(reading.span, 200);
    assert!(is_plausible(&reading, &cfg));
    // (400 - 42) / 80
    assert_eq!(decide(&reading, &cfg), Some(BarAction::Nudge(4)));
}

#[test]
fn test_marker_inside_zone_gets_single_nudge() {
    let cfg = index_bar();
    let lum = luminance_row(&scanline(241..251, &[200, 300, 420]));
    let reading = read_index_bar(&lum, &cfg).expect("marker and zone visible");
    assert_eq!(reading.pointer, 242);
    assert_eq!(decide(&reading, &cfg), Some(BarAction::Nudge(1)));
}

#[test]
fn test_blank_strip_is_unreadable() {
    let cfg = index_bar();
    let lum = luminance_row(&scanline(0..0, &[]));
    assert!(read_index_bar(&lum, &cfg).is_none());
    assert!(luminance_row(&RgbImage::new(BAR_LEN, 0)).is_empty());
}
