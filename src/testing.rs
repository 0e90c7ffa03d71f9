//! In-crate fake game for controller tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use image::{Rgb, RgbImage};

use crate::error::{LocatorError, Result};
use crate::geometry::{MatchBox, Point};
use crate::input::{CastBinding, InputDriver, Key, MouseButton};
use crate::profile::PlatformProfile;
use crate::screen_reader::{Locator, Region, RegionCache, Settings, Template, TextHit};
use crate::session::Session;
use crate::utils::{BotState, Clock};

pub fn mb(l: i32, t: i32, w: i32, h: i32) -> MatchBox {
    MatchBox::from_match(l, t, w, h).unwrap()
}

/// What the fake screen currently shows
pub struct Scene {
    pub visible: HashMap<Template, MatchBox>,
    pub pixel: Box<dyn Fn(i32, i32) -> Rgb<u8>>,
    pub text: std::result::Result<Vec<TextHit>, LocatorError>,
    pub size: (u32, u32),
    /// Every capture comes back empty, as on a dropped frame
    pub capture_fails: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            visible: HashMap::new(),
            pixel: Box::new(|_, _| Rgb([0, 0, 0])),
            text: Ok(Vec::new()),
            size: (400, 300),
            capture_fails: false,
        }
    }
}

impl Scene {
    pub fn show(&mut self, t: Template, b: MatchBox) {
        self.visible.insert(t, b);
    }

    pub fn hide(&mut self, t: Template) {
        self.visible.remove(&t);
    }

    pub fn fill(&mut self, f: impl Fn(i32, i32) -> Rgb<u8> + 'static) {
        self.pixel = Box::new(f);
    }
}

pub struct FakeScreen {
    pub scene: Rc<RefCell<Scene>>,
    pub locate_calls: Cell<u32>,
}

fn overlaps(b: &MatchBox, r: &Region) -> bool {
    b.left() < r.left + r.width as i32
        && r.left < b.right()
        && b.top() < r.top + r.height as i32
        && r.top < b.bottom()
}

impl Locator for FakeScreen {
    fn capture(&self, region: Option<Region>) -> Option<RgbImage> {
        let scene = self.scene.borrow();
        let r = region.unwrap_or(Region::new(0, 0, scene.size.0, scene.size.1));
        if scene.capture_fails || r.is_empty() {
            return None;
        }
        Some(RgbImage::from_fn(r.width, r.height, |x, y| {
            (scene.pixel)(r.left + x as i32, r.top + y as i32)
        }))
    }

    fn locate_all(&self, template: Template, region: Option<Region>, _confidence: f32) -> Vec<MatchBox> {
        self.locate_calls.set(self.locate_calls.get() + 1);
        let scene = self.scene.borrow();
        match scene.visible.get(&template) {
            Some(b) if region.map_or(true, |r| overlaps(b, &r)) => vec![*b],
            _ => Vec::new(),
        }
    }

    fn locate_in(&self, template: Template, _haystack: &RgbImage, _confidence: f32) -> Option<MatchBox> {
        self.scene.borrow().visible.get(&template).copied()
    }

    fn read_text(&self, _image: &RgbImage, _whitelist: &str) -> std::result::Result<Vec<TextHit>, LocatorError> {
        self.scene.borrow().text.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Click { at: Point, clicks: u32, button: MouseButton },
    KeyDown(Key),
    KeyUp(Key),
    Press(Key),
    Move(Point),
    Scroll(Point, i32),
    Activate,
}

type Reaction = Box<dyn FnMut(&Action, &mut Scene)>;

/// Records every action and lets a reaction mutate the scene
pub struct FakeInput {
    pub scene: Rc<RefCell<Scene>>,
    pub actions: RefCell<Vec<Action>>,
    reaction: RefCell<Option<Reaction>>,
}

impl FakeInput {
    fn record(&self, action: Action) -> Result<()> {
        if let Some(react) = self.reaction.borrow_mut().as_mut() {
            react(&action, &mut self.scene.borrow_mut());
        }
        self.actions.borrow_mut().push(action);
        Ok(())
    }

    pub fn on_action(&self, f: impl FnMut(&Action, &mut Scene) + 'static) {
        *self.reaction.borrow_mut() = Some(Box::new(f));
    }

    pub fn count(&self, pred: impl Fn(&Action) -> bool) -> usize {
        self.actions.borrow().iter().filter(|a| pred(a)).count()
    }

    pub fn presses(&self, key: Key) -> usize {
        self.count(|a| *a == Action::Press(key))
    }

    pub fn clicks(&self) -> usize {
        self.count(|a| matches!(a, Action::Click { .. }))
    }
}

impl InputDriver for FakeInput {
    fn click(&self, at: Point, clicks: u32, _interval: Duration, button: MouseButton) -> Result<()> {
        self.record(Action::Click { at, clicks, button })
    }

    fn key_down(&self, key: Key) -> Result<()> {
        self.record(Action::KeyDown(key))
    }

    fn key_up(&self, key: Key) -> Result<()> {
        self.record(Action::KeyUp(key))
    }

    fn press_key(&self, key: Key, _hold: Duration) -> Result<()> {
        self.record(Action::Press(key))
    }

    fn move_to(&self, at: Point) -> Result<()> {
        self.record(Action::Move(at))
    }

    fn scroll(&self, at: Point, amount: i32) -> Result<()> {
        self.record(Action::Scroll(at, amount))
    }

    fn activate_window(&self) -> Result<()> {
        self.record(Action::Activate)
    }

    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }
}

/// Virtual time: sleeping advances it, reading it ticks one millisecond
#[derive(Default)]
pub struct FakeClock {
    now: Cell<Duration>,
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        let t = self.now.get() + Duration::from_millis(1);
        self.now.set(t);
        t
    }

    fn sleep(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }
}

/// Fake screen, input and clock wired to one scene
pub struct Game {
    pub scene: Rc<RefCell<Scene>>,
    pub screen: FakeScreen,
    pub input: FakeInput,
    pub clock: FakeClock,
    pub cache: RegionCache,
    pub state: BotState,
    pub profile: PlatformProfile,
}

impl Game {
    /// Desktop profile at origin 0 with cast key `5`
    pub fn windows() -> Self {
        let profile = PlatformProfile::windows(
            Point::new(0, 0),
            Point::new(960, 540),
            &Settings::default(),
            CastBinding::Key(Key::Char('5')),
        );
        Self::with_profile(profile)
    }

    pub fn macos() -> Self {
        let profile = PlatformProfile::macos(Point::new(0, 0), Point::new(1200, 900), &Settings::default());
        Self::with_profile(profile)
    }

    pub fn with_profile(profile: PlatformProfile) -> Self {
        let scene = Rc::new(RefCell::new(Scene::default()));
        let state = BotState::new();
        state.set_running(true);
        Self {
            screen: FakeScreen { scene: scene.clone(), locate_calls: Cell::new(0) },
            input: FakeInput { scene: scene.clone(), actions: RefCell::new(Vec::new()), reaction: RefCell::new(None) },
            scene,
            clock: FakeClock::default(),
            cache: RegionCache::new(),
            state,
            profile,
        }
    }

    pub fn session(&self) -> Session<'_> {
        Session::new(&self.profile, &self.screen, &self.input, &self.clock, &self.cache, &self.state)
    }

    pub fn scene(&self) -> std::cell::RefMut<'_, Scene> {
        self.scene.borrow_mut()
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.now.get().as_secs_f64()
    }
}
