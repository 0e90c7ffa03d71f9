//! Error types shared by every activity

use thiserror::Error;

/// Errors that escape an activity loop.
///
/// Perception misses are never errors; they are `None` and the caller keeps polling.
#[derive(Debug, Error)]
pub enum Error {
    #[error("key `{0}` is not an accepted keyboard key")]
    UnboundKey(String),

    #[error("unknown location `{0}` (expected bilefen, ashwold or tundra)")]
    UnknownLocation(String),

    #[error("unknown fish type `{0}` (expected white, blue or yellow)")]
    UnknownFishType(String),

    #[error("malformed box {0:?}: width and height must be positive")]
    MalformedBox([i32; 4]),

    #[error("input fail-safe triggered: pointer was forced to a screen corner")]
    FailSafe,

    #[error("input backend error: {0}")]
    Input(String),

    #[error("game window `{0}` not found")]
    WindowNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the text locator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    /// The OCR engine binary is not installed; callers fall back to template matching.
    #[error("OCR engine is not installed")]
    OcrUnavailable,

    #[error("OCR failed: {0}")]
    Ocr(String),
}
