//! Status classifier: which fishing HUD state the screen shows

use serde::Serialize;

use super::base::FishType;
use crate::geometry::MatchBox;
use crate::screen_reader::locator::{is_achromatic, pixel_matches, GRAY_THRESHOLD};
use crate::screen_reader::Template;
use crate::session::Session;

/// Discrete game state seen on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Standby,
    Waiting,
    BonusNotReached,
    Ready,
    Pulling,
    InterruptedLair,
    InterruptedParty,
    InterruptedRaid,
    Talk,
    Pick,
}

impl Status {
    /// Every status with a template of its own
    pub const ALL: [Status; 9] = [
        Status::Standby,
        Status::Waiting,
        Status::Ready,
        Status::Pulling,
        Status::InterruptedLair,
        Status::InterruptedParty,
        Status::InterruptedRaid,
        Status::Talk,
        Status::Pick,
    ];

    pub fn template(&self) -> Template {
        match self {
            Status::Standby => Template::Standby,
            Status::Waiting => Template::Waiting,
            Status::BonusNotReached | Status::Ready => Template::Ready,
            Status::Pulling => Template::Pulling,
            Status::InterruptedLair => Template::CancelLair,
            Status::InterruptedParty => Template::CancelParty,
            Status::InterruptedRaid => Template::CancelRaid,
            Status::Talk => Template::Talk,
            Status::Pick => Template::Pick,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Status::InterruptedLair | Status::InterruptedParty | Status::InterruptedRaid)
    }

    fn describe(&self) -> &'static str {
        match self {
            Status::Standby => "standby",
            Status::Waiting => "waiting for fish",
            Status::BonusNotReached => "bonus not reached",
            Status::Ready => "ready to pull",
            Status::Pulling => "pulling fish",
            Status::InterruptedLair => "interrupted by lair",
            Status::InterruptedParty => "interrupted by party invite",
            Status::InterruptedRaid => "interrupted by raid invite",
            Status::Talk => "npc talk available",
            Status::Pick => "item pickup available",
        }
    }
}

/// Whether a transition deserves a log line. `Waiting` and `BonusNotReached` count as one state.
pub fn should_log(prev: Option<Status>, status: Status) -> bool {
    let fold = |s: Status| match s {
        Status::BonusNotReached => Status::Waiting,
        other => other,
    };
    prev.map(fold) != Some(fold(status))
}

/// Polls the status templates in priority order
pub struct StatusClassifier<'a> {
    session: Session<'a>,
}

impl<'a> StatusClassifier<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    /// First matching status, highest priority first. `None` is a valid steady state.
    pub fn classify(&self, prev: Option<Status>, fish_type: FishType) -> Option<(Status, MatchBox)> {
        let start = self.session.clock.now();
        let found = self.detect(fish_type);
        if let Some((status, _)) = found {
            if should_log(prev, status) {
                tracing::info!(
                    "[STATUS] {}, check took {:.2} seconds",
                    status.describe(),
                    self.session.clock.since(start)
                );
            }
        }
        found
    }

    fn detect(&self, fish_type: FishType) -> Option<(Status, MatchBox)> {
        let s = &self.session;
        let profile = s.profile;

        let interrupts = Status::ALL
            .into_iter()
            .filter(|st| st.is_interrupt() && (profile.raid_check || *st != Status::InterruptedRaid));
        for status in interrupts.chain([Status::Pulling]) {
            if let Some(b) = s.check(status.template(), 0.8) {
                return Some((status, b));
            }
        }

        if let Some(b) = s.check(Template::Ready, 0.99) {
            let gray = if profile.gray_check { self.is_gray(&b)? } else { false };
            if !gray {
                let indicator = profile.fish_type_pixel(fish_type);
                let qualifies = fish_type.is_wildcard()
                    || pixel_matches(
                        s.locator,
                        indicator,
                        profile.fish_type_color,
                        profile.fish_type_tolerance,
                    );
                let status = if qualifies { Status::Ready } else { Status::BonusNotReached };
                return Some((status, b));
            }
        }

        if let Some(b) = s.check(Template::Waiting, 0.99) {
            let gray = if profile.gray_check { self.is_gray(&b)? } else { true };
            if gray {
                return Some((Status::Waiting, b));
            }
        }

        for status in [Status::Standby, Status::Pick] {
            if let Some(b) = s.check(status.template(), 0.8) {
                return Some((status, b));
            }
        }
        None
    }

    /// `None` when the frame could not be captured
    fn is_gray(&self, b: &MatchBox) -> Option<bool> {
        let img = self.session.capture(Some(b.region()))?;
        Some(is_achromatic(&img, GRAY_THRESHOLD))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mb, Game};
    use image::Rgb;

    #[test]
    fn test_interrupt_beats_pulling() {
        let game = Game::windows();
        game.scene().show(Template::Pulling, mb(528, 200, 83, 31));
        game.scene().show(Template::CancelParty, mb(760, 1000, 225, 45));
        let classifier = StatusClassifier::new(game.session());
        let (status, b) = classifier.classify(None, FishType::Yellow).unwrap();
        assert_eq!(status, Status::InterruptedParty);
        assert_eq!(b, mb(760, 1000, 225, 45));
    }

    #[test]
    fn test_gray_frame_is_waiting() {
        let game = Game::windows();
        game.scene().show(Template::Ready, mb(100, 100, 20, 20));
        game.scene().show(Template::Waiting, mb(100, 100, 20, 20));
        game.scene().fill(|_, _| Rgb([120, 120, 120]));
        let classifier = StatusClassifier::new(game.session());
        for prev in [None, Some(Status::Ready), Some(Status::Waiting)] {
            let (status, _) = classifier.classify(prev, FishType::White).unwrap();
            assert_eq!(status, Status::Waiting);
        }
    }

    #[test]
    fn test_colored_frame_with_wrong_indicator_is_bonus_not_reached() {
        let game = Game::windows();
        game.scene().show(Template::Ready, mb(100, 100, 20, 20));
        game.scene().fill(|x, y| if x == 955 && y == 75 { Rgb([250, 20, 20]) } else { Rgb([200, 60, 30]) });
        let classifier = StatusClassifier::new(game.session());
        let (status, _) = classifier.classify(Some(Status::Waiting), FishType::Yellow).unwrap();
        assert_eq!(status, Status::BonusNotReached);
        assert!(!should_log(Some(Status::Waiting), status));
    }

    #[test]
    fn test_indicator_match_is_ready() {
        let game = Game::windows();
        game.scene().show(Template::Ready, mb(100, 100, 20, 20));
        game.scene().fill(|x, y| if x == 955 && y == 75 { Rgb([130, 120, 110]) } else { Rgb([200, 60, 30]) });
        let classifier = StatusClassifier::new(game.session());
        let (status, _) = classifier.classify(None, FishType::Yellow).unwrap();
        assert_eq!(status, Status::Ready);
    }

    #[test]
    fn test_white_is_wildcard() {
        let game = Game::windows();
        game.scene().show(Template::Ready, mb(100, 100, 20, 20));
        game.scene().fill(|_, _| Rgb([200, 60, 30]));
        let classifier = StatusClassifier::new(game.session());
        let (status, _) = classifier.classify(None, FishType::White).unwrap();
        assert_eq!(status, Status::Ready);
    }

    #[test]
    fn test_raid_check_is_platform_gated() {
        let game = Game::macos();
        game.scene().show(Template::CancelRaid, mb(760, 1255, 225, 45));
        let classifier = StatusClassifier::new(game.session());
        assert!(classifier.classify(None, FishType::Yellow).is_none());

        let game = Game::windows();
        game.scene().show(Template::CancelRaid, mb(760, 1255, 225, 45));
        let classifier = StatusClassifier::new(game.session());
        assert_eq!(classifier.classify(None, FishType::Yellow).unwrap().0, Status::InterruptedRaid);
    }

    #[test]
    fn test_dropped_frame_is_nothing_seen() {
        let game = Game::windows();
        game.scene().show(Template::Ready, mb(100, 100, 20, 20));
        game.scene().show(Template::Waiting, mb(100, 100, 20, 20));
        game.scene().capture_fails = true;
        let classifier = StatusClassifier::new(game.session());
        assert!(classifier.classify(None, FishType::White).is_none());
        assert!(classifier.classify(Some(Status::Waiting), FishType::Yellow).is_none());

        game.scene().hide(Template::Ready);
        assert!(classifier.classify(None, FishType::White).is_none());
    }

    #[test]
    fn test_dropped_frame_without_gray_check() {
        // the color check is off on this profile, so no capture is needed
        let game = Game::macos();
        game.scene().show(Template::Ready, mb(1850, 1150, 60, 60));
        game.scene().capture_fails = true;
        let classifier = StatusClassifier::new(game.session());
        assert_eq!(classifier.classify(None, FishType::White).unwrap().0, Status::Ready);
    }

    #[test]
    fn test_nothing_visible() {
        let game = Game::windows();
        let classifier = StatusClassifier::new(game.session());
        assert!(classifier.classify(Some(Status::Standby), FishType::Blue).is_none());
    }

    #[test]
    fn test_should_log() {
        assert!(should_log(None, Status::Standby));
        assert!(!should_log(Some(Status::Standby), Status::Standby));
        assert!(!should_log(Some(Status::BonusNotReached), Status::Waiting));
        assert!(should_log(Some(Status::Waiting), Status::Ready));
    }
}
