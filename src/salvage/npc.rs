//! Finding NPCs on screen by name color and OCR

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::LocatorError;
use crate::geometry::{MatchBox, Point};
use crate::screen_reader::locator::{color_median, extract_color};
use crate::screen_reader::{text_locate, Template};
use crate::session::Session;

/// Characters that spell both NPC names
const NAME_WHITELIST: &str = "aBceFhlkimrst";
/// Name plates sit above the character
const NAME_OFFSET: i32 = 20;
const COLOR_TOLERANCE: i32 = 5;
const MIN_NAME_PIXELS: usize = 20;
/// Two sightings closer than this are the same spot
pub const AGREEMENT_PX: i32 = 5;

static OCR_MISSING_LOGGED: AtomicBool = AtomicBool::new(false);

/// Trip destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Npc {
    Fisherman,
    Blacksmith,
}

impl Npc {
    /// Word the OCR reports for the name plate
    pub fn name(&self) -> &'static str {
        match self {
            Npc::Fisherman => "Fisher",
            Npc::Blacksmith => "Ferretre",
        }
    }

    /// Name plate template used when OCR is unavailable; its key caches the last sighting
    pub fn template(&self) -> Template {
        match self {
            Npc::Fisherman => Template::NpcFish,
            Npc::Blacksmith => Template::NpcBlacksmith,
        }
    }

    /// Map marker of the NPC
    pub fn icon(&self) -> Template {
        match self {
            Npc::Fisherman => Template::IconFish,
            Npc::Blacksmith => Template::IconBlacksmith,
        }
    }
}

/// Median of the name-colored pixels on screen, just below the name plate
pub fn find_npc_by_color(session: &Session) -> Option<Point> {
    let img = session.capture(None)?;
    let (x, y) = color_median(&img, session.profile.npc_color, COLOR_TOLERANCE, MIN_NAME_PIXELS)?;
    Some(Point::new(x as i32, y as i32 + NAME_OFFSET))
}

/// Locate a name plate by OCR, falling back to template matching when no OCR engine is installed
pub fn find_npc_by_name(session: &Session, npc: Npc) -> Option<MatchBox> {
    let profile = session.profile;
    let region = profile.npc_search;
    let filter = Some((profile.npc_color, profile.npc_threshold));
    match text_locate(session.locator, region, filter, NAME_WHITELIST) {
        Ok(words) => words.get(npc.name()).map(|b| b.translated(0, NAME_OFFSET)),
        Err(LocatorError::OcrUnavailable) => {
            if !OCR_MISSING_LOGGED.swap(true, Ordering::Relaxed) {
                tracing::warn!("[SALVAGE] Tesseract is not installed, matching name plates by image");
            }
            let img = session.capture(region)?;
            let filtered = extract_color(&img, profile.npc_color, profile.npc_threshold);
            let (dx, dy) = region.map_or((0, 0), |r| (r.left, r.top));
            session
                .locator
                .locate_in(npc.template(), &filtered, 0.5)
                .map(|b| b.translated(dx, dy))
        }
        Err(e) => {
            tracing::debug!("[SALVAGE] {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen_reader::TextHit;
    use crate::testing::{mb, Game};
    use image::Rgb;

    fn hit(text: &str, left: i32, top: i32) -> TextHit {
        TextHit { text: text.into(), left, top, width: 60, height: 14, conf: 91.0 }
    }

    #[test]
    fn test_name_from_ocr() {
        let game = Game::windows();
        game.scene().text = Ok(vec![hit("Ferretre", 300, 200), hit("Fisher", 40, 50)]);
        let session = game.session();
        assert_eq!(find_npc_by_name(&session, Npc::Fisherman), Some(mb(40, 70, 60, 14)));
        assert_eq!(find_npc_by_name(&session, Npc::Blacksmith), Some(mb(300, 220, 60, 14)));
    }

    #[test]
    fn test_ocr_offsets_by_search_region() {
        let game = Game::macos();
        game.scene().text = Ok(vec![hit("Fisher", 40, 50)]);
        // mac search region starts at the origin
        assert_eq!(find_npc_by_name(&game.session(), Npc::Fisherman), Some(mb(40, 70, 60, 14)));
    }

    #[test]
    fn test_missing_ocr_falls_back_to_template() {
        let game = Game::windows();
        game.scene().text = Err(LocatorError::OcrUnavailable);
        assert_eq!(find_npc_by_name(&game.session(), Npc::Fisherman), None);
        game.scene().show(Template::NpcFish, mb(80, 90, 70, 20));
        assert_eq!(find_npc_by_name(&game.session(), Npc::Fisherman), Some(mb(80, 90, 70, 20)));
    }

    #[test]
    fn test_find_by_color_needs_enough_pixels() {
        let game = Game::windows();
        assert_eq!(find_npc_by_color(&game.session()), None);
        game.scene().fill(|x, y| {
            if (100..110).contains(&x) && (50..53).contains(&y) {
                Rgb([248, 198, 134])
            } else {
                Rgb([0, 0, 0])
            }
        });
        assert_eq!(find_npc_by_color(&game.session()), Some(Point::new(104, 71)));
    }
}
