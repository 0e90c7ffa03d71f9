//! Shared utilities: data paths, clock, stop flag and hotkeys

pub mod bot_state;
pub mod clock;
pub mod keybinds;
pub mod path;

pub use bot_state::{Activity, BotState};
pub use clock::{Clock, SystemClock};
pub use path::get_data_dir;
