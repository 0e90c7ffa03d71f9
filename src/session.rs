//! Session context handed to every activity, plus the shared perception/action helpers

use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};
use crate::geometry::{Inset, MatchBox, Point};
use crate::input::{InputDriver, Key, MouseButton};
use crate::profile::{PlatformProfile, ScriptStep};
use crate::screen_reader::{Locator, Region, RegionCache, Template};
use crate::utils::{BotState, Clock};

/// Border added around a cached box before searching it again
const CACHE_MARGIN: i32 = 10;

/// Search options for `Session::check_with`
#[derive(Debug, Clone, Copy)]
pub struct Check {
    pub confidence: f32,
    pub region: Option<Region>,
    /// Grow a hit by this many pixels on each side
    pub border: (i32, i32),
}

impl Check {
    pub fn new(confidence: f32) -> Self {
        Self { confidence, region: None, border: (0, 0) }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn border(mut self, x: i32, y: i32) -> Self {
        self.border = (x, y);
        self
    }
}

impl Default for Check {
    fn default() -> Self {
        Self::new(0.8)
    }
}

/// Options for `Session::click_image`
#[derive(Debug, Clone, Copy)]
pub struct ClickImage {
    pub clicks: u32,
    pub interval: f64,
    pub confidence: f32,
    pub border: (i32, i32),
    pub inset: Inset,
}

impl Default for ClickImage {
    fn default() -> Self {
        Self { clicks: 1, interval: 0.01, confidence: 0.9, border: (10, 10), inset: Inset::default() }
    }
}

impl ClickImage {
    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// Everything an activity needs, borrowed from the owner for the run.
#[derive(Clone, Copy)]
pub struct Session<'a> {
    pub profile: &'a PlatformProfile,
    pub locator: &'a dyn Locator,
    pub input: &'a dyn InputDriver,
    pub clock: &'a dyn Clock,
    pub cache: &'a RegionCache,
    pub state: &'a BotState,
}

impl<'a> Session<'a> {
    pub fn new(
        profile: &'a PlatformProfile,
        locator: &'a dyn Locator,
        input: &'a dyn InputDriver,
        clock: &'a dyn Clock,
        cache: &'a RegionCache,
        state: &'a BotState,
    ) -> Self {
        Self { profile, locator, input, clock, cache, state }
    }

    /// Cooperative stop: checked at loop tops only
    pub fn cancelled(&self) -> bool {
        !self.state.is_running()
    }

    pub fn sleep(&self, secs: f64) {
        self.clock.sleep_secs(secs);
    }

    /// Re-acquire focus; a missing window is logged, not fatal
    pub fn activate(&self) -> Result<()> {
        match self.input.activate_window() {
            Err(Error::WindowNotFound(title)) => {
                tracing::warn!("Game window '{}' not found, continuing", title);
                Ok(())
            }
            other => other,
        }
    }

    pub fn check(&self, template: Template, confidence: f32) -> Option<MatchBox> {
        self.check_with(template, Check::new(confidence))
    }

    /// Locate a template, narrowing the search with known regions.
    ///
    /// Order: explicit region, the profile's fixed region (final), cached box (falls back
    /// to a full search), full search. Anchored templates found by a full search are cached.
    pub fn check_with(&self, template: Template, opts: Check) -> Option<MatchBox> {
        let hit = if let Some(region) = opts.region {
            self.locator.locate(template, Some(region), opts.confidence)
        } else if let Some(region) = self.profile.default_regions.get(&template) {
            self.locator.locate(template, Some(*region), opts.confidence)
        } else {
            let cached = self.cache.get(template.key()).and_then(|b| {
                let region = b.grown(CACHE_MARGIN, CACHE_MARGIN).region();
                self.locator.locate(template, Some(region), opts.confidence)
            });
            cached.or_else(|| {
                let found = self.locator.locate(template, None, opts.confidence)?;
                if template.is_anchored() {
                    self.cache.put(template.key(), found);
                }
                Some(found)
            })
        };

        let (bx, by) = opts.border;
        hit.map(|b| if bx > 0 || by > 0 { b.grown(bx, by) } else { b })
    }

    /// Click a random point inside the inset box
    pub fn click_box_with(&self, b: &MatchBox, clicks: u32, interval: f64, button: MouseButton, inset: Inset) -> Result<()> {
        let p = b.random_point(inset, &mut rand::thread_rng());
        self.input.click(self.profile.to_pointer(p), clicks, Duration::from_secs_f64(interval), button)
    }

    pub fn click_box(&self, b: &MatchBox) -> Result<()> {
        self.click_box_with(b, 1, 0.01, MouseButton::Left, Inset::default())
    }

    pub fn click_center(&self, b: &MatchBox) -> Result<()> {
        self.click_point(b.center(), MouseButton::Left)
    }

    /// Click a point given in capture pixels
    pub fn click_point(&self, p: Point, button: MouseButton) -> Result<()> {
        self.input.click(self.profile.to_pointer(p), 1, Duration::ZERO, button)
    }

    pub fn move_to(&self, p: Point) -> Result<()> {
        self.input.move_to(self.profile.to_pointer(p))
    }

    /// Poll a template until `max_time` seconds pass; retry each poll 0.02 lower.
    ///
    /// Returns `false` when the template never showed up.
    pub fn click_image(&self, template: Template, max_time: f64, opts: ClickImage) -> Result<bool> {
        let start = self.clock.now();
        let check = Check::new(opts.confidence).border(opts.border.0, opts.border.1);
        loop {
            let hit = self
                .check_with(template, check)
                .or_else(|| self.check_with(template, Check { confidence: opts.confidence - 0.02, ..check }));
            if let Some(b) = hit {
                self.sleep(1.0);
                self.click_box_with(&b, opts.clicks, opts.interval, MouseButton::Left, opts.inset)?;
                return Ok(true);
            }
            if self.clock.since(start) > max_time {
                tracing::debug!("[TRADE] {} not found within {:.0}s", template.file_name(), max_time);
                return Ok(false);
            }
            self.sleep(0.1);
        }
    }

    /// Short taps of `key` with human-ish gaps
    pub fn tap_burst(&self, key: Key, times: u32) -> Result<()> {
        for _ in 0..times {
            self.input.press_key(key, Duration::from_millis(10))?;
            let gap: f64 = 0.05 + rand::thread_rng().gen::<f64>() * 0.1;
            self.sleep((gap * 10.0).round() / 10.0);
        }
        Ok(())
    }

    /// Hold a movement key
    pub fn walk(&self, key: Key, duration: f64) -> Result<()> {
        self.activate()?;
        self.sleep(0.3);
        self.input.key_down(key)?;
        self.sleep(duration);
        self.input.key_up(key)
    }

    pub fn hold(&self, key: Key, duration: f64) -> Result<()> {
        self.input.press_key(key, Duration::from_secs_f64(duration))
    }

    /// Click the first visible lair/party/raid dismiss button. Returns whether one was hit.
    pub fn dismiss_interrupts(&self) -> Result<bool> {
        for template in [Template::CancelLair, Template::CancelParty, Template::CancelRaid] {
            if let Some(b) = self.check(template, 0.8) {
                tracing::info!("[AGENT] Dismissing {}", template.key());
                self.click_box(&b)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Scroll the open map at a jittered point near `origin`
    pub fn scroll_down(&self, origin: Point) -> Result<()> {
        let mut rng = rand::thread_rng();
        let at = origin.offset(rng.gen_range(0..100), rng.gen_range(0..200));
        self.input.scroll(self.profile.to_pointer(at), -1)
    }

    /// Play a fixed click script
    pub fn run_script(&self, steps: &[ScriptStep]) -> Result<()> {
        for step in steps {
            match *step {
                ScriptStep::Press(key) => self.input.press_key(key, Duration::from_millis(10))?,
                ScriptStep::Click(p) => self.input.click(p, 1, Duration::ZERO, MouseButton::Left)?,
                ScriptStep::Wait(secs) => self.sleep(secs),
            }
        }
        Ok(())
    }

    /// Capture in absolute screen pixels
    pub fn capture(&self, region: Option<Region>) -> Option<image::RgbImage> {
        self.locator.capture(region)
    }
}
