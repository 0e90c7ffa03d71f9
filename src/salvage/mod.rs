//! Salvage trips: bag check, NPC lookup and the navigation stage machine

pub mod bag;
pub mod npc;
pub mod stage;

pub use bag::check_bag_capacity;
pub use npc::{find_npc_by_color, find_npc_by_name, Npc};
pub use stage::{SalvageRun, Stage, DEFAULT_TRIES};
