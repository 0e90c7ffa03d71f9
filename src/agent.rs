//! Supervisory loop: fish, check the bag, salvage, trade, repeat

use crate::error::{Error, Result};
use crate::fish::{FishType, FishingController, Location};
use crate::log_main::{CycleEntry, Journal};
use crate::salvage::{check_bag_capacity, SalvageRun, DEFAULT_TRIES};
use crate::screen_reader::Settings;
use crate::session::Session;
use crate::trade::TradeSequencer;
use crate::utils::Activity;

/// What the agent does each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentConfig {
    pub location: Location,
    pub fish_type: FishType,
    pub auto_salvage: bool,
    /// Salvage once the remaining bag capacity drops below this percentage
    pub salvage_capacity: u8,
}

impl AgentConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            location: settings.location,
            fish_type: settings.fish_type,
            auto_salvage: settings.auto_salvage,
            salvage_capacity: settings.salvage_capacity,
        }
    }
}

pub struct Agent<'a> {
    session: Session<'a>,
    config: AgentConfig,
    journal: Option<&'a Journal>,
}

impl<'a> Agent<'a> {
    pub fn new(session: Session<'a>, config: AgentConfig) -> Self {
        Self { session, config, journal: None }
    }

    pub fn with_journal(mut self, journal: &'a Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// One fishing cycle followed by the optional salvage trip and the trade.
    ///
    /// Returns `false` when the fishing cycle was stopped from outside.
    pub fn fish_and_trade(&self) -> Result<bool> {
        let s = self.session;
        let cfg = self.config;
        let mut entry = CycleEntry::now(cfg.location.value(), cfg.fish_type.value());

        let mut controller = FishingController::new(s, cfg.fish_type);
        let finished = controller.run()?;
        entry.casts = controller.attempted();
        if !finished {
            return Ok(false);
        }
        s.sleep(1.0);

        if cfg.auto_salvage {
            let capacity = check_bag_capacity(&s)?;
            s.sleep(1.0);
            entry.bag_capacity = capacity;
            match capacity {
                None => tracing::warn!("[BAG] Failed to check bag capacity"),
                Some(c) => {
                    tracing::info!("[BAG] Bag capacity checked: about {:.0}% left", c * 100.0);
                    if c * 100.0 < cfg.salvage_capacity as f64 {
                        let salvaged = SalvageRun::new(s, cfg.location).run(DEFAULT_TRIES)?;
                        if salvaged {
                            tracing::info!("[SALVAGE] Successfully salvaged items");
                        } else {
                            tracing::warn!("[SALVAGE] Failed to salvage");
                        }
                        entry.salvaged = Some(salvaged);
                    }
                    s.sleep(1.0);
                }
            }
        }

        entry.traded = TradeSequencer::new(s, cfg.location).run()?;
        s.sleep(1.0);
        s.state.update_stats(|st| st.cycles += 1);
        if let Some(journal) = self.journal {
            if let Err(e) = journal.log_cycle(entry) {
                tracing::warn!("[AGENT] Failed to write cycle journal: {}", e);
            }
        }
        Ok(true)
    }

    /// Repeat `fish_and_trade` until stopped. The input fail-safe recentres the pointer and
    /// the loop carries on; any other error ends the loop.
    pub fn auto_fishing(&self) -> Result<()> {
        let s = self.session;
        while !s.cancelled() {
            match self.fish_and_trade() {
                Ok(_) => {}
                Err(Error::FailSafe) => {
                    tracing::warn!("[AGENT] Fail-safe triggered, recentring the pointer and continuing...");
                    s.state.set_activity(Activity::Recovering);
                    s.input.recenter()?;
                    s.sleep(2.0);
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!("[AGENT] Stopped, {}", s.state.to_json());
        Ok(())
    }
}
