//! Immortal Angler - fishing, salvage and trade agent for Diablo Immortal
//!
//! Reads the game through screen capture, template matching and OCR, and plays it
//! through synthetic mouse and keyboard input.

pub mod agent;
pub mod error;
pub mod fish;
pub mod geometry;
pub mod input;
pub mod log_main;
pub mod profile;
pub mod salvage;
pub mod screen_reader;
pub mod session;
pub mod trade;
pub mod utils;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use agent::{Agent, AgentConfig};
pub use error::{Error, Result};
pub use fish::{FishType, FishingController, Location, Status};
pub use profile::PlatformProfile;
pub use screen_reader::{ImageService, RegionCache, Settings};
pub use session::Session;
pub use utils::{get_data_dir, BotState};
