//! Key name validation and global hotkey codes

use std::collections::HashMap;

use global_hotkey::hotkey::Code;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};

/// Named keys accepted in settings, besides single letters and digits
const SPECIAL_KEYS: &[&str] = &[
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
    "ESC", "ESCAPE", "ENTER", "RETURN", "SPACE", "TAB", "BACKSPACE",
    "UP", "DOWN", "LEFT", "RIGHT", "SHIFT", "CTRL", "ALT",
];

static HOTKEY_CODES: Lazy<HashMap<&'static str, Code>> = Lazy::new(|| {
    let mut m = HashMap::new();
    let letters = [
        Code::KeyA, Code::KeyB, Code::KeyC, Code::KeyD, Code::KeyE, Code::KeyF, Code::KeyG,
        Code::KeyH, Code::KeyI, Code::KeyJ, Code::KeyK, Code::KeyL, Code::KeyM, Code::KeyN,
        Code::KeyO, Code::KeyP, Code::KeyQ, Code::KeyR, Code::KeyS, Code::KeyT, Code::KeyU,
        Code::KeyV, Code::KeyW, Code::KeyX, Code::KeyY, Code::KeyZ,
    ];
    const LETTER_NAMES: [&str; 26] = [
        "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q",
        "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
    ];
    for (name, code) in LETTER_NAMES.iter().zip(letters) {
        m.insert(*name, code);
    }
    let digits = [
        ("0", Code::Digit0), ("1", Code::Digit1), ("2", Code::Digit2), ("3", Code::Digit3),
        ("4", Code::Digit4), ("5", Code::Digit5), ("6", Code::Digit6), ("7", Code::Digit7),
        ("8", Code::Digit8), ("9", Code::Digit9),
    ];
    m.extend(digits);
    let functions = [
        ("F1", Code::F1), ("F2", Code::F2), ("F3", Code::F3), ("F4", Code::F4),
        ("F5", Code::F5), ("F6", Code::F6), ("F7", Code::F7), ("F8", Code::F8),
        ("F9", Code::F9), ("F10", Code::F10), ("F11", Code::F11), ("F12", Code::F12),
    ];
    m.extend(functions);
    m.insert("ESC", Code::Escape);
    m.insert("ESCAPE", Code::Escape);
    m.insert("ENTER", Code::Enter);
    m.insert("RETURN", Code::Enter);
    m.insert("SPACE", Code::Space);
    m.insert("TAB", Code::Tab);
    m
});

/// Normalise a key name to its upper-case form, or `None` if it is not a key.
pub fn resolve_key(key_name: &str) -> Option<String> {
    let key_upper = key_name.trim().to_uppercase();
    if key_upper.is_empty() {
        return None;
    }

    if SPECIAL_KEYS.contains(&key_upper.as_str()) {
        return Some(key_upper);
    }

    let mut chars = key_upper.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(key_upper),
        _ => None,
    }
}

/// Global hotkey code for the stop key.
pub fn stop_code(key_name: &str) -> Result<Code> {
    resolve_key(key_name)
        .and_then(|k| HOTKEY_CODES.get(k.as_str()).copied())
        .ok_or_else(|| Error::UnboundKey(key_name.to_string()))
}
