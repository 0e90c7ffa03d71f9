//! Input simulation: the `InputDriver` seam and its enigo backend

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[cfg(any(windows, target_os = "macos"))]
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
#[cfg(any(windows, target_os = "macos"))]
use parking_lot::Mutex;
#[cfg(any(windows, target_os = "macos"))]
use std::thread;

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::utils::keybinds::resolve_key;

/// Keyboard keys the agent presses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Letter or digit, stored lowercase
    Char(char),
    Space,
    Escape,
    Enter,
    Tab,
    F(u8),
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = resolve_key(s).ok_or_else(|| Error::UnboundKey(s.to_string()))?;
        let key = match name.as_str() {
            "SPACE" => Key::Space,
            "ESC" | "ESCAPE" => Key::Escape,
            "ENTER" | "RETURN" => Key::Enter,
            "TAB" => Key::Tab,
            f if f.len() > 1 && f.starts_with('F') => match f[1..].parse::<u8>() {
                Ok(n @ 1..=12) => Key::F(n),
                _ => return Err(Error::UnboundKey(s.to_string())),
            },
            single if single.len() == 1 => match single.chars().next() {
                Some(c) => Key::Char(c.to_ascii_lowercase()),
                None => return Err(Error::UnboundKey(s.to_string())),
            },
            _ => return Err(Error::UnboundKey(s.to_string())),
        };
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Space => write!(f, "space"),
            Key::Escape => write!(f, "esc"),
            Key::Enter => write!(f, "enter"),
            Key::Tab => write!(f, "tab"),
            Key::F(n) => write!(f, "F{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// How the rod is cast on the key-cast profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastBinding {
    Key(Key),
    MouseRight,
}

impl FromStr for CastBinding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("mouseright") {
            return Ok(CastBinding::MouseRight);
        }
        s.parse().map(CastBinding::Key)
    }
}

/// Synthetic input on the game window.
///
/// Every call may fail with `Error::FailSafe` when the pointer was forced into a screen
/// corner; the supervisory loop recentres and continues.
pub trait InputDriver {
    fn click(&self, at: Point, clicks: u32, interval: Duration, button: MouseButton) -> Result<()>;
    fn key_down(&self, key: Key) -> Result<()>;
    fn key_up(&self, key: Key) -> Result<()>;
    /// Press and hold for `hold`, then release
    fn press_key(&self, key: Key, hold: Duration) -> Result<()>;
    fn move_to(&self, at: Point) -> Result<()>;
    /// Wheel notches at a point; negative scrolls the view down
    fn scroll(&self, at: Point, amount: i32) -> Result<()>;
    fn activate_window(&self) -> Result<()>;
    /// Pointer-space screen size
    fn screen_size(&self) -> (i32, i32);

    /// Move the pointer to the middle of the screen, even out of a fail-safe corner
    fn recenter(&self) -> Result<()> {
        let (w, h) = self.screen_size();
        self.move_to(Point::new(w / 2, h / 2))
    }
}

/// enigo-backed driver for the desktop session
#[cfg(any(windows, target_os = "macos"))]
pub struct DesktopInput {
    enigo: Mutex<Enigo>,
    window_title: String,
}

#[cfg(any(windows, target_os = "macos"))]
impl DesktopInput {
    pub fn new(window_title: impl Into<String>) -> Result<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| Error::Input(format!("{:?}", e)))?;
        Ok(Self { enigo: Mutex::new(enigo), window_title: window_title.into() })
    }

    /// Refuse to act once the pointer sits in a screen corner
    fn guard(&self, enigo: &Enigo) -> Result<()> {
        let (x, y) = enigo.location().map_err(input_err)?;
        let (w, h) = enigo.main_display().map_err(input_err)?;
        let corner = (x <= 0 || x >= w - 1) && (y <= 0 || y >= h - 1);
        if corner {
            return Err(Error::FailSafe);
        }
        Ok(())
    }
}

#[cfg(any(windows, target_os = "macos"))]
fn input_err(e: enigo::InputError) -> Error {
    Error::Input(format!("{:?}", e))
}

#[cfg(any(windows, target_os = "macos"))]
fn to_enigo_key(key: Key) -> enigo::Key {
    match key {
        Key::Char(c) => enigo::Key::Unicode(c),
        Key::Space => enigo::Key::Space,
        Key::Escape => enigo::Key::Escape,
        Key::Enter => enigo::Key::Return,
        Key::Tab => enigo::Key::Tab,
        Key::F(n) => match n {
            1 => enigo::Key::F1,
            2 => enigo::Key::F2,
            3 => enigo::Key::F3,
            4 => enigo::Key::F4,
            5 => enigo::Key::F5,
            6 => enigo::Key::F6,
            7 => enigo::Key::F7,
            8 => enigo::Key::F8,
            9 => enigo::Key::F9,
            10 => enigo::Key::F10,
            11 => enigo::Key::F11,
            _ => enigo::Key::F12,
        },
    }
}

#[cfg(any(windows, target_os = "macos"))]
impl InputDriver for DesktopInput {
    fn click(&self, at: Point, clicks: u32, interval: Duration, button: MouseButton) -> Result<()> {
        let mut enigo = self.enigo.lock();
        self.guard(&enigo)?;
        enigo.move_mouse(at.x, at.y, Coordinate::Abs).map_err(input_err)?;
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
            MouseButton::Middle => Button::Middle,
        };
        for i in 0..clicks {
            if i > 0 {
                thread::sleep(interval);
            }
            enigo.button(button, Direction::Click).map_err(input_err)?;
        }
        Ok(())
    }

    fn key_down(&self, key: Key) -> Result<()> {
        let mut enigo = self.enigo.lock();
        self.guard(&enigo)?;
        enigo.key(to_enigo_key(key), Direction::Press).map_err(input_err)
    }

    fn key_up(&self, key: Key) -> Result<()> {
        let mut enigo = self.enigo.lock();
        enigo.key(to_enigo_key(key), Direction::Release).map_err(input_err)
    }

    fn press_key(&self, key: Key, hold: Duration) -> Result<()> {
        self.key_down(key)?;
        thread::sleep(hold);
        self.key_up(key)
    }

    fn move_to(&self, at: Point) -> Result<()> {
        let mut enigo = self.enigo.lock();
        self.guard(&enigo)?;
        enigo.move_mouse(at.x, at.y, Coordinate::Abs).map_err(input_err)
    }

    fn scroll(&self, at: Point, amount: i32) -> Result<()> {
        let mut enigo = self.enigo.lock();
        self.guard(&enigo)?;
        enigo.move_mouse(at.x, at.y, Coordinate::Abs).map_err(input_err)?;
        thread::sleep(Duration::from_millis(100));
        // enigo scrolls down on positive lengths
        enigo.scroll(-amount, Axis::Vertical).map_err(input_err)
    }

    fn activate_window(&self) -> Result<()> {
        crate::window::activate_window(&self.window_title)
    }

    fn screen_size(&self) -> (i32, i32) {
        self.enigo.lock().main_display().unwrap_or((1920, 1080))
    }

    fn recenter(&self) -> Result<()> {
        let mut enigo = self.enigo.lock();
        let (w, h) = enigo.main_display().map_err(input_err)?;
        enigo.move_mouse(w / 2, h / 2, Coordinate::Abs).map_err(input_err)
    }
}

/// Stand-in on platforms the game does not run on: every action warns and succeeds.
#[cfg(not(any(windows, target_os = "macos")))]
pub struct DesktopInput;

#[cfg(not(any(windows, target_os = "macos")))]
impl DesktopInput {
    pub fn new(_window_title: impl Into<String>) -> Result<Self> {
        tracing::warn!("Input simulation not implemented on this platform");
        Ok(Self)
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
impl InputDriver for DesktopInput {
    fn click(&self, at: Point, _clicks: u32, _interval: Duration, _button: MouseButton) -> Result<()> {
        tracing::warn!("click({}, {}) not implemented on this platform", at.x, at.y);
        Ok(())
    }

    fn key_down(&self, key: Key) -> Result<()> {
        tracing::warn!("key_down({}) not implemented on this platform", key);
        Ok(())
    }

    fn key_up(&self, _key: Key) -> Result<()> {
        Ok(())
    }

    fn press_key(&self, key: Key, _hold: Duration) -> Result<()> {
        tracing::warn!("press_key({}) not implemented on this platform", key);
        Ok(())
    }

    fn move_to(&self, _at: Point) -> Result<()> {
        Ok(())
    }

    fn scroll(&self, _at: Point, _amount: i32) -> Result<()> {
        Ok(())
    }

    fn activate_window(&self) -> Result<()> {
        Ok(())
    }

    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!("5".parse::<Key>().unwrap(), Key::Char('5'));
        assert_eq!("N".parse::<Key>().unwrap(), Key::Char('n'));
        assert_eq!("space".parse::<Key>().unwrap(), Key::Space);
        assert_eq!("Esc".parse::<Key>().unwrap(), Key::Escape);
        assert_eq!("f10".parse::<Key>().unwrap(), Key::F(10));
    }

    #[test]
    fn test_unbound_key_fails_fast() {
        for bad in ["", "ctrl+x", "mouse4", "UP"] {
            assert!(matches!(bad.parse::<Key>(), Err(Error::UnboundKey(_))), "{bad}");
        }
    }

    #[test]
    fn test_cast_binding() {
        assert_eq!("mouseRight".parse::<CastBinding>().unwrap(), CastBinding::MouseRight);
        assert_eq!("e".parse::<CastBinding>().unwrap(), CastBinding::Key(Key::Char('e')));
        assert!("??".parse::<CastBinding>().is_err());
    }
}
