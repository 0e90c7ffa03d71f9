//! Selling the catch and restocking bait

use crate::error::Result;
use crate::fish::{Location, Status};
use crate::geometry::{Inset, MatchBox};
use crate::input::{Key, MouseButton};
use crate::profile::{LocationProfile, TradeMode};
use crate::salvage::find_npc_by_color;
use crate::screen_reader::Template;
use crate::session::{ClickImage, Session};
use crate::utils::Activity;

pub const SELL_ATTEMPTS: u32 = 3;
pub const BUY_ATTEMPTS: u32 = 3;
/// Observation cycles the walking trade may take
const WALK_CYCLE_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkStage {
    Trade,
    Buy,
    Back,
}

pub struct TradeSequencer<'a> {
    session: Session<'a>,
    location: Location,
}

impl<'a> TradeSequencer<'a> {
    pub fn new(session: Session<'a>, location: Location) -> Self {
        Self { session, location }
    }

    /// Sell fish and buy bait with the profile's trade mode
    pub fn run(&self) -> Result<bool> {
        let s = self.session;
        s.state.set_activity(Activity::Trading);
        s.activate()?;
        let moves = s.profile.location(self.location);
        let ok = match s.profile.trade {
            TradeMode::Walk => self.walk_trade(&moves)?,
            TradeMode::Gui => {
                let ok = self.gui_trade()?;
                for (key, secs) in &moves.after_trade {
                    s.activate()?;
                    s.hold(*key, *secs)?;
                }
                ok
            }
        };
        if ok {
            s.state.update_stats(|st| st.trades += 1);
        }
        Ok(ok)
    }

    /// Sell, then buy. Each phase has its own attempt budget.
    pub fn gui_trade(&self) -> Result<bool> {
        let sold = self.sell()?;
        let bought = self.buy()?;
        Ok(sold && bought)
    }

    fn sell(&self) -> Result<bool> {
        let s = self.session;
        for attempt in 1..=SELL_ATTEMPTS {
            if s.cancelled() {
                return Ok(false);
            }
            s.sleep(1.0);
            tracing::info!("[TRADE] Selling through the trade window ({}/{})", attempt, SELL_ATTEMPTS);
            let Some(npc) = find_npc_by_color(&s) else {
                tracing::debug!("[TRADE] Fisherman not on screen");
                continue;
            };
            s.click_point(npc, MouseButton::Left)?;

            let mut misses = 0;
            misses += miss(s.click_image(Template::Trade, 5.0, ClickImage::default())?);
            s.sleep(1.0);
            misses += miss(s.click_image(Template::SelectAll, 3.0, ClickImage::default().confidence(0.30))?);
            misses += miss(s.click_image(Template::Exchange, 3.0, ClickImage::default().confidence(0.97))?);
            s.sleep(1.0);
            if misses == 0 {
                return Ok(true);
            }
            self.back_out()?;
        }
        Ok(false)
    }

    fn buy(&self) -> Result<bool> {
        let s = self.session;
        for attempt in 1..=BUY_ATTEMPTS {
            if s.cancelled() {
                return Ok(false);
            }
            s.sleep(3.0);
            tracing::info!("[TRADE] Buying bait ({}/{})", attempt, BUY_ATTEMPTS);
            while s.dismiss_interrupts()? {
                if s.cancelled() {
                    return Ok(false);
                }
                s.sleep(0.5);
            }
            let Some(npc) = find_npc_by_color(&s) else {
                continue;
            };
            s.click_point(npc, MouseButton::Left)?;

            let amount = ClickImage { inset: Inset::new(0.2, 0.7, -0.2, -0.1), ..ClickImage::default() };
            let nine = ClickImage { clicks: 3, interval: 0.5, ..ClickImage::default() };
            let buy = ClickImage { border: (15, 15), ..ClickImage::default().confidence(0.97) };

            let mut misses = 0;
            misses += miss(s.click_image(Template::Shop, 3.0, ClickImage::default())?);
            misses += miss(s.click_image(Template::Amount, 3.0, amount)?);
            misses += miss(s.click_image(Template::Number9, 3.0, nine)?);
            misses += miss(s.click_image(Template::Buy, 3.0, buy)?);
            misses += miss(s.click_image(Template::Close, 3.0, ClickImage::default())?);
            if misses == 0 {
                s.sleep(1.0);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Close whatever dialog a failed sell left open
    fn back_out(&self) -> Result<()> {
        let s = self.session;
        let center = s.profile.window_center;
        s.click_point(center, MouseButton::Left)?;
        s.sleep(0.3);
        s.click_point(center, MouseButton::Left)?;
        s.sleep(0.3);
        s.click_image(Template::Close, 1.0, ClickImage::default())?;
        s.sleep(0.5);
        s.click_point(center, MouseButton::Left)?;
        s.sleep(1.0);
        Ok(())
    }

    /// Walk up to the fisherman, run the sell and buy scripts, walk back to the water
    pub fn walk_trade(&self, moves: &LocationProfile) -> Result<bool> {
        let s = self.session;
        let mut stage = WalkStage::Trade;
        for _ in 0..WALK_CYCLE_LIMIT {
            if s.cancelled() {
                return Ok(false);
            }
            tracing::debug!("[TRADE] {:?}", stage);
            match (self.npc_or_fish(), stage) {
                (Some((Status::InterruptedParty, b)), _) => {
                    s.activate()?;
                    s.click_box(&b)?;
                }
                (Some((Status::Talk, _)), WalkStage::Trade) => {
                    tracing::info!("[TRADE] Selling fish to npc...");
                    s.run_script(&s.profile.sell_script)?;
                    stage = WalkStage::Buy;
                    s.sleep(1.0);
                }
                (Some((Status::Talk, _)), WalkStage::Buy) => {
                    tracing::info!("[TRADE] Buying baits...");
                    s.run_script(&s.profile.buy_script)?;
                    s.sleep(0.5);
                    s.walk(Key::Char('d'), 0.02)?;
                    stage = WalkStage::Back;
                }
                (Some((Status::Standby, _)), WalkStage::Back) => return Ok(true),
                (Some((Status::Pick, _)), _) => {
                    s.activate()?;
                    s.sleep(0.1);
                    s.hold(Key::Space, 0.01)?;
                }
                (_, WalkStage::Trade) => s.walk(moves.key_to_npc, 0.1)?,
                (_, WalkStage::Buy) => s.walk(moves.key_to_npc, 0.05)?,
                (_, WalkStage::Back) => s.walk(moves.key_to_fish, 0.1)?,
            }
            s.sleep(2.0);
        }
        tracing::warn!("[TRADE] Walking trade did not finish");
        Ok(false)
    }

    fn npc_or_fish(&self) -> Option<(Status, MatchBox)> {
        [Status::InterruptedParty, Status::Talk, Status::Standby, Status::Pick]
            .into_iter()
            .find_map(|status| self.session.check(status.template(), 0.8).map(|b| (status, b)))
    }
}

fn miss(found: bool) -> u32 {
    u32::from(!found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::testing::{mb, Action, Game};
    use image::Rgb;

    fn show_npc(game: &Game) {
        game.scene().fill(|x, y| {
            if (200..230).contains(&x) && (100..104).contains(&y) {
                Rgb([248, 198, 134])
            } else {
                Rgb([0, 0, 0])
            }
        });
    }

    fn show_dialogs(game: &Game) {
        let mut scene = game.scene();
        for (i, t) in [
            Template::Trade,
            Template::SelectAll,
            Template::Exchange,
            Template::Shop,
            Template::Amount,
            Template::Number9,
            Template::Buy,
            Template::Close,
        ]
        .into_iter()
        .enumerate()
        {
            scene.show(t, mb(100 + 120 * i as i32, 700, 100, 40));
        }
    }

    #[test]
    fn test_gui_trade() {
        let game = Game::windows();
        show_npc(&game);
        show_dialogs(&game);
        let trade = TradeSequencer::new(game.session(), Location::Tundra);
        assert!(trade.run().unwrap());
        assert_eq!(game.state.get_stats().trades, 1);
        // tundra steps right after trading
        assert_eq!(game.input.presses(Key::Char('d')), 1);
    }

    #[test]
    fn test_failed_sell_backs_out_every_attempt() {
        let game = Game::windows();
        show_npc(&game);
        show_dialogs(&game);
        game.scene().hide(Template::Trade);
        let trade = TradeSequencer::new(game.session(), Location::Tundra);
        assert!(!trade.gui_trade().unwrap());
        let center = Point::new(960, 540);
        let center_clicks = game.input.count(|a| matches!(a, Action::Click { at, .. } if *at == center));
        assert_eq!(center_clicks, 3 * SELL_ATTEMPTS as usize);
    }

    #[test]
    fn test_no_npc_on_screen() {
        let game = Game::windows();
        show_dialogs(&game);
        let trade = TradeSequencer::new(game.session(), Location::Bilefen);
        assert!(!trade.gui_trade().unwrap());
        assert_eq!(game.input.clicks(), 0);
    }

    #[test]
    fn test_walking_trade() {
        let game = Game::macos();
        let hud = mb(1550, 870, 60, 60);
        game.input.on_action(move |action, scene| match action {
            Action::KeyUp(Key::Char('w')) => scene.show(Template::Talk, hud),
            Action::KeyUp(Key::Char('d')) => {
                scene.hide(Template::Talk);
                scene.show(Template::Standby, hud);
            }
            _ => {}
        });
        let trade = TradeSequencer::new(game.session(), Location::Tundra);
        assert!(trade.run().unwrap());
        assert_eq!(game.input.presses(Key::Space), 2);
        assert_eq!(game.input.count(|a| *a == Action::KeyDown(Key::Char('w'))), 1);
    }
}
