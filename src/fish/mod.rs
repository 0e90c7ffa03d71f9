//! Fishing: bar reading, status classification and the cycle controller

pub mod bar;
pub mod base;
pub mod controller;
pub mod pickup;
pub mod status;

pub use bar::{BarReader, Signal};
pub use base::{FishType, Location};
pub use controller::FishingController;
pub use status::{Status, StatusClassifier};
