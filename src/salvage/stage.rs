//! Navigation and salvage stage machine with stuck detection and bounded retries

use std::fmt;
use std::time::Duration;

use super::npc::{find_npc_by_name, Npc, AGREEMENT_PX};
use crate::error::Result;
use crate::fish::Location;
use crate::geometry::MatchBox;
use crate::input::{Key, MouseButton};
use crate::profile::{LocationProfile, Recovery};
use crate::screen_reader::Template;
use crate::session::Session;
use crate::utils::Activity;

pub const DEFAULT_TRIES: u32 = 3;
/// Cycles a stage may repeat before the run counts as stuck
pub const STUCK_LIMIT: u32 = 30;
/// Seconds of walking before the NPC counts as not found
pub const NAVIGATION_TIME_LIMIT: f64 = 60.0;
const SALVAGE_PASSES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    OpeningMap,
    FindNpc,
    FoundNpc,
    Navigating,
    ReachedNpc,
    NpcNameNotFound,
    Salv,
    SalvWithoutBox,
    DialogBs,
    Salvaging,
    Salvaged,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::OpeningMap => "opening_map",
            Stage::FindNpc => "find_npc",
            Stage::FoundNpc => "found_npc",
            Stage::Navigating => "navigating",
            Stage::ReachedNpc => "reached_npc",
            Stage::NpcNameNotFound => "npc_name_not_found",
            Stage::Salv => "salv",
            Stage::SalvWithoutBox => "salv_without_box",
            Stage::DialogBs => "dialog_bs",
            Stage::Salvaging => "salvaging",
            Stage::Salvaged => "salvaged",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How one attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done(bool),
    Stuck,
}

/// Stage state of a single attempt
pub struct StageMachine<'a> {
    session: Session<'a>,
    moves: LocationProfile,
    tries: u32,
    stuck_limit: u32,
    navigation_time_limit: f64,
    stage: Stage,
    prev_stage: Option<Stage>,
    stuck_count: u32,
    destination: Npc,
    nav_start: Duration,
    npc_box: Option<MatchBox>,
}

impl<'a> StageMachine<'a> {
    pub fn new(
        session: Session<'a>,
        moves: LocationProfile,
        tries: u32,
        stuck_limit: u32,
        navigation_time_limit: f64,
    ) -> Self {
        Self {
            nav_start: session.clock.now(),
            session,
            moves,
            tries,
            stuck_limit,
            navigation_time_limit,
            stage: Stage::OpeningMap,
            prev_stage: None,
            stuck_count: 0,
            destination: if tries > 0 { Npc::Blacksmith } else { Npc::Fisherman },
            npc_box: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn stuck_count(&self) -> u32 {
        self.stuck_count
    }

    pub fn destination(&self) -> Npc {
        self.destination
    }

    /// One cycle: interrupts first, then the stage, then stuck bookkeeping
    pub fn step(&mut self) -> Result<Option<Outcome>> {
        let s = self.session;
        if s.dismiss_interrupts()? {
            s.sleep(1.0);
            return Ok(None);
        }
        if let Some(done) = self.advance()? {
            return Ok(Some(Outcome::Done(done)));
        }
        self.track_progress();
        tracing::debug!("[SALVAGE] {}", self.stage);
        if self.stuck_count > self.stuck_limit {
            tracing::warn!("[SALVAGE] Stuck at stage {}, tries left: {}", self.stage, self.tries);
            return Ok(Some(Outcome::Stuck));
        }
        s.sleep(1.0);
        Ok(None)
    }

    fn track_progress(&mut self) {
        let same = self.prev_stage == Some(self.stage);
        if same && self.stage != Stage::Navigating {
            self.stuck_count += 1;
        } else if !same {
            self.stuck_count = 0;
        } else if self.session.clock.since(self.nav_start) > self.navigation_time_limit {
            if self.tries > 1 {
                self.stuck_count = self.stuck_limit + 1;
            } else {
                self.stage = Stage::NpcNameNotFound;
            }
        }
        self.prev_stage = Some(self.stage);
    }

    /// Run the current stage. `Some` ends the attempt.
    fn advance(&mut self) -> Result<Option<bool>> {
        let s = self.session;
        let profile = s.profile;
        match self.stage {
            Stage::OpeningMap => match s.check(Template::FindNpc, 0.8) {
                Some(b) => {
                    s.click_box(&b)?;
                    self.stage = Stage::FindNpc;
                }
                None => {
                    s.click_box(&MatchBox::from_region(profile.minimap)?)?;
                    s.sleep(2.0);
                }
            },
            Stage::FindNpc => match s.check(self.destination.icon(), 0.8) {
                Some(b) => {
                    s.click_box(&b)?;
                    self.stage = Stage::FoundNpc;
                }
                None => s.scroll_down(profile.map_scroll_origin)?,
            },
            Stage::FoundNpc => {
                if let Some(b) = s.check(Template::Navigate, 0.8) {
                    s.click_box(&b)?;
                    if let Some(park) = profile.park_pointer {
                        s.input.move_to(park)?;
                    }
                    self.stage = Stage::Navigating;
                    self.nav_start = s.clock.now();
                }
            }
            Stage::Navigating => {
                s.sleep(2.0);
                let sighting = find_npc_by_name(&s, self.destination);
                if let (Some(old), Some(new)) = (self.npc_box, sighting) {
                    if old.matches(&new, AGREEMENT_PX) {
                        self.stage = Stage::ReachedNpc;
                        if !profile.dialog_via_talk {
                            s.cache.put(self.destination.template().key(), new);
                        }
                    }
                }
                self.npc_box = sighting;
            }
            Stage::ReachedNpc => match self.destination {
                Npc::Blacksmith => {
                    self.stage = Stage::Salv;
                    self.destination = Npc::Fisherman;
                }
                Npc::Fisherman => {
                    if let Some((key, secs)) = self.moves.final_step {
                        s.hold(key, secs)?;
                    }
                    return Ok(Some(true));
                }
            },
            Stage::NpcNameNotFound => match self.destination {
                Npc::Blacksmith => {
                    if profile.dialog_via_talk || s.cache.contains(Npc::Blacksmith.template().key()) {
                        self.stage = Stage::SalvWithoutBox;
                        self.destination = Npc::Fisherman;
                    }
                }
                Npc::Fisherman => {
                    if let Some(spot) = self.moves.back_to_fishing {
                        s.click_point(spot, MouseButton::Middle)?;
                    }
                    tracing::info!(
                        "[SALVAGE] Fisher npc not found, possibly blocked by other players. Assuming it was reached."
                    );
                    return Ok(Some(true));
                }
            },
            Stage::Salv | Stage::SalvWithoutBox => {
                if profile.dialog_via_talk {
                    if let Some(b) = s.check(Template::Talk, 0.8) {
                        s.click_box(&b)?;
                        self.stage = Stage::DialogBs;
                    }
                } else {
                    let target = match self.stage {
                        Stage::Salv => self.npc_box,
                        _ => s.cache.get(Npc::Blacksmith.template().key()),
                    };
                    if let Some(b) = target {
                        s.click_center(&b)?;
                    }
                    self.stage = Stage::DialogBs;
                }
            }
            Stage::DialogBs => {
                if let Some(b) = s.check(Template::Services, 0.8) {
                    s.click_box(&b)?;
                    self.stage = Stage::Salvaging;
                }
            }
            Stage::Salvaging => {
                self.salvage_items()?;
                s.state.update_stats(|st| st.salvages += 1);
                self.stage = Stage::Salvaged;
            }
            Stage::Salvaged => {
                if let Some(b) = s.check(Template::Close, 0.8) {
                    s.click_box(&b)?;
                    self.stage = Stage::OpeningMap;
                }
            }
        }
        Ok(None)
    }

    /// Tick every unticked tier and confirm, until all tiers are empty or the passes run out
    fn salvage_items(&self) -> Result<()> {
        let s = self.session;
        for pass in 1..=SALVAGE_PASSES {
            for tier in [Template::WhiteUnticked, Template::BlueUnticked, Template::YellowUnticked] {
                if let Some(b) = s.check(tier, 0.8) {
                    s.click_box(&b)?;
                }
                s.sleep(1.0);
            }
            let confirm = s
                .check(Template::Salvage, 0.98)
                .or_else(|| s.check(Template::Salvage, 0.95));
            if let Some(b) = confirm {
                s.click_box(&b)?;
                s.sleep(1.0);
            }
            let empty = [Template::NoWhite, Template::NoBlue, Template::NoYellow]
                .into_iter()
                .all(|t| s.check(t, 0.8).is_some());
            if empty {
                tracing::info!("[SALVAGE] Every tier salvaged after {} passes", pass);
                break;
            }
        }
        Ok(())
    }
}

/// A full salvage trip with bounded retries
pub struct SalvageRun<'a> {
    session: Session<'a>,
    location: Location,
    stuck_limit: u32,
    navigation_time_limit: f64,
    recoveries: u32,
}

impl<'a> SalvageRun<'a> {
    pub fn new(session: Session<'a>, location: Location) -> Self {
        Self {
            session,
            location,
            stuck_limit: STUCK_LIMIT,
            navigation_time_limit: NAVIGATION_TIME_LIMIT,
            recoveries: 0,
        }
    }

    pub fn with_limits(mut self, stuck_limit: u32, navigation_time_limit: f64) -> Self {
        self.stuck_limit = stuck_limit;
        self.navigation_time_limit = navigation_time_limit;
        self
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Walk to the blacksmith, salvage, walk back to the fisherman.
    ///
    /// Every stuck attempt is followed by one recovery and a retry with one try less; with
    /// no tries left the retry only walks back. A stuck attempt with no tries left gives up.
    pub fn run(&mut self, tries: u32) -> Result<bool> {
        let s = self.session;
        s.state.set_activity(Activity::Salvaging);
        s.activate()?;

        let mut tries = tries;
        loop {
            let mut machine = StageMachine::new(
                s,
                s.profile.location(self.location),
                tries,
                self.stuck_limit,
                self.navigation_time_limit,
            );
            let outcome = loop {
                if s.cancelled() {
                    return Ok(false);
                }
                if let Some(outcome) = machine.step()? {
                    break outcome;
                }
            };

            match outcome {
                Outcome::Done(ok) => return Ok(ok),
                Outcome::Stuck => {
                    self.recover()?;
                    if tries == 0 {
                        tracing::warn!("[SALVAGE] Out of tries, giving up");
                        return Ok(false);
                    }
                    tries -= 1;
                }
            }
        }
    }

    /// Back out of dialogs until the bag icon shows again
    fn recover(&mut self) -> Result<()> {
        let s = self.session;
        self.recoveries += 1;
        s.state.set_activity(Activity::Recovering);
        while s.check(Template::IconBag, 0.8).is_none() {
            if s.cancelled() {
                break;
            }
            match s.profile.recovery {
                Recovery::CloseOrSpace => match s.check(Template::Close, 0.8) {
                    Some(b) => s.click_box(&b)?,
                    None => s.input.press_key(Key::Space, Duration::from_millis(10))?,
                },
                Recovery::Escape => s.input.press_key(Key::Escape, Duration::from_millis(10))?,
            }
            s.sleep(3.0);
        }
        s.state.set_activity(Activity::Salvaging);
        Ok(())
    }
}
