//! Shared agent state between the hotkey thread and the agent worker

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

/// What the agent is doing right now
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Fishing,
    Pulling,
    PickingUp,
    CheckingBag,
    Salvaging,
    Trading,
    Recovering,
    Stopped,
}

impl Activity {
    /// Get human-readable description of the activity
    pub fn description(&self) -> &'static str {
        match self {
            Activity::Idle => "Idle",
            Activity::Fishing => "Fishing...",
            Activity::Pulling => "Pulling the bar",
            Activity::PickingUp => "Picking up items",
            Activity::CheckingBag => "Checking bag capacity",
            Activity::Salvaging => "Walking to the blacksmith",
            Activity::Trading => "Trading fish",
            Activity::Recovering => "Recovering from fail-safe",
            Activity::Stopped => "Agent stopped",
        }
    }
}

/// Session counters shown on stop and written to the cycle journal
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SharedStats {
    pub casts: u32,
    pub pulls: u32,
    pub cycles: u32,
    pub salvages: u32,
    pub trades: u32,
}

/// Cooperative stop flag plus current activity and counters.
///
/// Owned by an `Arc` shared between the main thread and the agent worker.
pub struct BotState {
    running: AtomicBool,
    activity: RwLock<Activity>,
    stats: RwLock<SharedStats>,
}

impl BotState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            activity: RwLock::new(Activity::Idle),
            stats: RwLock::new(SharedStats::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
        if running {
            self.set_activity(Activity::Fishing);
        } else {
            self.set_activity(Activity::Stopped);
        }
    }

    pub fn get_activity(&self) -> Activity {
        *self.activity.read()
    }

    pub fn set_activity(&self, activity: Activity) {
        *self.activity.write() = activity;
    }

    pub fn get_stats(&self) -> SharedStats {
        self.stats.read().clone()
    }

    /// Apply a mutation to the counters under the write lock
    pub fn update_stats(&self, f: impl FnOnce(&mut SharedStats)) {
        f(&mut self.stats.write());
    }

    pub fn reset_stats(&self) {
        *self.stats.write() = SharedStats::default();
    }

    /// Status as a JSON line for the journal
    pub fn to_json(&self) -> String {
        let stats = self.get_stats();
        serde_json::json!({
            "running": self.is_running(),
            "activity": self.get_activity().description(),
            "stats": stats,
        })
        .to_string()
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}
