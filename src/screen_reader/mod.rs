//! Screen reader module: capture, template and text location, region cache

pub mod base;
pub mod cache;
pub mod image_service;
pub mod locator;
pub mod screen_service;

pub use base::{BarVariant, Settings};
pub use cache::RegionCache;
pub use image_service::ImageService;
pub use locator::{text_locate, Locator, Template, TextHit};
pub use screen_service::{Region, ScreenService};
