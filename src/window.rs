//! Game window lookup and activation

#[cfg(target_os = "macos")]
use std::process::Command;

#[cfg(windows)]
use windows::core::PCWSTR;
#[cfg(windows)]
use windows::Win32::Foundation::{HWND, RECT};
#[cfg(windows)]
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetWindowRect, SetForegroundWindow, ShowWindow, SW_SHOW,
};

use crate::error::{Error, Result};
use crate::geometry::Point;

/// Default window title of the game client
pub const TARGET_TITLE: &str = "Diablo Immortal";

/// Where the game window sits, in capture pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlacement {
    pub origin: Point,
    pub center: Point,
}

#[cfg(windows)]
fn find_window(title: &str) -> Option<HWND> {
    let title_wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();

    unsafe {
        let hwnd = FindWindowW(PCWSTR::null(), PCWSTR(title_wide.as_ptr())).ok()?;
        if hwnd.0 as usize == 0 {
            None
        } else {
            Some(hwnd)
        }
    }
}

/// Locate the game window
#[cfg(windows)]
pub fn locate_window(title: &str) -> Result<WindowPlacement> {
    let hwnd = find_window(title).ok_or_else(|| Error::WindowNotFound(title.to_string()))?;
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut rect) }.map_err(|_| Error::WindowNotFound(title.to_string()))?;
    Ok(WindowPlacement {
        origin: Point::new(rect.left, rect.top),
        center: Point::new((rect.left + rect.right) / 2, (rect.top + rect.bottom) / 2),
    })
}

/// Locate the game window. macOS reports points; captures are in retina pixels.
#[cfg(target_os = "macos")]
pub fn locate_window(title: &str) -> Result<WindowPlacement> {
    let script = format!(
        "tell application \"System Events\" to tell process \"{}\" to get {{position, size}} of window 1",
        title
    );
    let output = Command::new("osascript").args(["-e", &script]).output()?;
    let text = String::from_utf8_lossy(&output.stdout);
    let nums = parse_osascript_numbers(&text);
    if !output.status.success() || nums.len() < 2 {
        return Err(Error::WindowNotFound(title.to_string()));
    }
    let origin = Point::new(nums[0] * 2, nums[1] * 2);
    let center = match (nums.get(2), nums.get(3)) {
        (Some(w), Some(h)) => Point::new((nums[0] + w / 2) * 2, (nums[1] + h / 2) * 2),
        _ => origin,
    };
    Ok(WindowPlacement { origin, center })
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn locate_window(title: &str) -> Result<WindowPlacement> {
    tracing::warn!("Window lookup not implemented on this platform");
    Err(Error::WindowNotFound(title.to_string()))
}

/// Bring the game window to the front
#[cfg(windows)]
pub fn activate_window(title: &str) -> Result<()> {
    let hwnd = find_window(title).ok_or_else(|| Error::WindowNotFound(title.to_string()))?;
    unsafe {
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = SetForegroundWindow(hwnd);
    }
    Ok(())
}

#[cfg(target_os = "macos")]
pub fn activate_window(title: &str) -> Result<()> {
    let script = format!("tell application \"{}\" to activate", title);
    let status = Command::new("osascript").args(["-e", &script]).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::WindowNotFound(title.to_string()))
    }
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn activate_window(_title: &str) -> Result<()> {
    tracing::warn!("Window activation not implemented on this platform");
    Ok(())
}

/// Integers in an AppleScript list reply such as `10, 25, 1280, 800`
pub fn parse_osascript_numbers(reply: &str) -> Vec<i32> {
    reply
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}
