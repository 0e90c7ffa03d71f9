//! Fishing cycle: cast, wait, pull, pick up, until the cycle budget runs out

use std::time::Duration;

use super::bar::BarReader;
use super::base::FishType;
use super::pickup::pickup;
use super::status::{Status, StatusClassifier};
use crate::error::Result;
use crate::geometry::MatchBox;
use crate::input::{CastBinding, MouseButton};
use crate::profile::CastMethod;
use crate::salvage::npc::find_npc_by_color;
use crate::session::Session;
use crate::utils::Activity;

/// Casts per cycle
pub const MAX_ATTEMPTS: u32 = 30;
/// Consecutive standby sightings that end the cycle (the bag is full or the bait is gone)
pub const MAX_STANDBY: u32 = 3;
/// Pickup budget is restored after this long without picking up
const PICKUP_RESET_SECS: f64 = 600.0;
/// A bite that missed the bonus blocks `ready` for this long
const READY_DEBOUNCE_SECS: f64 = 10.0;
const WARMUP_TAPS: u32 = 10;
const PICKUP_TAPS: u32 = 15;
const SETTLE_SECS: f64 = 1.0;
const BAR_POLL_SECS: f64 = 0.01;

pub struct FishingController<'a> {
    session: Session<'a>,
    fish_type: FishType,
    attempted: u32,
    n_standby: u32,
    pickup_attempted: u32,
    last_pickup: Duration,
    last_fish_up: Option<Duration>,
    prev: Option<Status>,
}

impl<'a> FishingController<'a> {
    pub fn new(session: Session<'a>, fish_type: FishType) -> Self {
        Self {
            last_pickup: session.clock.now(),
            session,
            fish_type,
            attempted: 0,
            n_standby: 0,
            pickup_attempted: 0,
            last_fish_up: None,
            prev: None,
        }
    }

    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    /// Run one fishing cycle. `Ok(false)` when stopped from outside.
    pub fn run(&mut self) -> Result<bool> {
        let s = self.session;
        s.state.set_activity(Activity::Fishing);
        self.seed_cache();
        s.activate()?;

        let classifier = StatusClassifier::new(s);
        while self.attempted < MAX_ATTEMPTS && self.n_standby < MAX_STANDBY {
            if s.cancelled() {
                return Ok(false);
            }
            self.poll(&classifier)?;
        }
        tracing::info!(
            "[FISH] Cycle finished after {} casts ({} standby in a row)",
            self.attempted,
            self.n_standby
        );
        Ok(true)
    }

    /// One classify-dispatch-settle iteration
    fn poll(&mut self, classifier: &StatusClassifier) -> Result<()> {
        if let Some((status, b)) = classifier.classify(self.prev, self.fish_type) {
            self.dispatch(status, b)?;
            self.prev = Some(status);
        }
        self.session.sleep(SETTLE_SECS);
        Ok(())
    }

    /// Record where every visible HUD widget sits before the loop starts
    fn seed_cache(&self) {
        let s = self.session;
        for status in Status::ALL {
            let template = status.template();
            if let Some(b) = s.check(template, 0.8) {
                s.cache.put(template.key(), b);
            }
        }
    }

    fn dispatch(&mut self, status: Status, b: MatchBox) -> Result<()> {
        let s = self.session;
        match status {
            Status::Pulling => self.pull_loop()?,
            Status::InterruptedLair | Status::InterruptedParty | Status::InterruptedRaid | Status::Pick => {
                s.activate()?;
                s.click_box(&b)?;
            }
            Status::Standby => {
                s.activate()?;
                s.sleep(1.0);
                self.cast(&b)?;
                self.attempted += 1;
                s.state.update_stats(|st| st.casts += 1);
                if s.clock.since(self.last_pickup) > PICKUP_RESET_SECS {
                    self.pickup_attempted = 0;
                }
                self.n_standby = if self.prev == Some(Status::Standby) { self.n_standby + 1 } else { 1 };
                s.sleep(1.0);
                tracing::info!("[FISH] Fishing attempts: {}", self.attempted);
            }
            Status::Ready => {
                let debounced = self
                    .last_fish_up
                    .map_or(true, |t| s.clock.since(t) > READY_DEBOUNCE_SECS);
                if debounced {
                    s.activate()?;
                    s.sleep(0.1);
                    s.cache.put(status.template().key(), b);
                    s.click_box(&b)?;
                    s.sleep(0.1);
                    self.pull_loop()?;
                    s.state.update_stats(|st| st.pulls += 1);
                    if let Some(fallback) = s.profile.post_pull_pointer {
                        s.move_to(find_npc_by_color(&s).unwrap_or(fallback))?;
                    }
                }
            }
            Status::BonusNotReached => self.last_fish_up = Some(s.clock.now()),
            Status::Waiting => self.try_pickup()?,
            Status::Talk => {}
        }
        Ok(())
    }

    fn cast(&self, standby: &MatchBox) -> Result<()> {
        let s = self.session;
        match s.profile.cast {
            CastMethod::ClickStandby => s.click_box(standby),
            CastMethod::Binding(binding) => {
                match binding {
                    CastBinding::Key(key) => s.input.press_key(key, Duration::from_millis(10))?,
                    CastBinding::MouseRight => {
                        s.click_box_with(standby, 1, 0.01, MouseButton::Right, Default::default())?
                    }
                }
                s.move_to(standby.top_left())?;
                if self.attempted == 0 {
                    s.sleep(0.5);
                    s.tap_burst(s.profile.interact_key, WARMUP_TAPS)?;
                }
                Ok(())
            }
        }
    }

    fn try_pickup(&mut self) -> Result<()> {
        let s = self.session;
        let Some(limit) = s.profile.pickup_limit else {
            return Ok(());
        };
        if self.pickup_attempted >= limit {
            return Ok(());
        }
        tracing::info!("[PICKUP] Picking up items...");
        s.state.set_activity(Activity::PickingUp);
        self.last_pickup = s.clock.now();
        s.tap_burst(s.profile.interact_key, PICKUP_TAPS)?;
        if pickup(&s, self.pickup_attempted, true, false)? {
            self.pickup_attempted += 1;
        } else {
            self.pickup_attempted = limit;
        }
        s.state.set_activity(Activity::Fishing);
        Ok(())
    }

    /// Track the bar until it stops reading for `max_timeout` or `max_fishing_time` passes
    fn pull_loop(&self) -> Result<()> {
        let s = self.session;
        let profile = s.profile;
        let reader = BarReader::new(s);
        s.state.set_activity(Activity::Pulling);

        let start = s.clock.now();
        let mut last_read = start;
        while s.clock.since(start) < profile.max_fishing_time && s.clock.since(last_read) < profile.max_timeout {
            if reader.pull()?.is_some() {
                last_read = s.clock.now();
            }
            s.sleep(BAR_POLL_SECS);
        }
        tracing::debug!("[FISH] Pull ended after {:.1}s", s.clock.since(start));
        s.state.set_activity(Activity::Fishing);
        Ok(())
    }
}
