//! Platform profile: every calibration constant, chosen once at startup

use std::collections::HashMap;

use crate::fish::{FishType, Location};
use crate::geometry::Point;
use crate::input::{CastBinding, Key};
use crate::screen_reader::{BarVariant, Region, Settings, Template};

/// Client flavour the calibration was taken on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Windows
        }
    }
}

/// Thresholds of the marker-and-zone pull bar
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBar {
    /// 1-px scanline over the bar
    pub strip: Region,
    /// Luminance under which a pixel belongs to the marker
    pub dark: f32,
    /// Luminance over which a pixel belongs to the target zone
    pub bright: f32,
    pub n_dark: usize,
    pub n_offset: usize,
    pub lb: usize,
    pub ub: usize,
    pub right_edge: usize,
    /// How far one nudge moves the marker
    pub step: usize,
}

/// Thresholds of the in-zone color pull bar
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBar {
    pub strip: Region,
    pub color: [u8; 3],
    pub tolerance: i32,
    /// Nudge while the in-zone share (percent) is below this
    pub min_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BarMechanic {
    Index(IndexBar),
    Color(ColorBar),
}

/// What one "nudge" of the pull bar is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nudge {
    Key(Key),
    /// Click the cached `ready` button
    ClickReadyBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastMethod {
    /// Click the standby button itself
    ClickStandby,
    /// Use the configured binding, then tap the interact key on the first cast
    Binding(CastBinding),
}

/// How the salvage run backs out of dialogs when stuck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Click a close cross if one is visible, otherwise press space
    CloseOrSpace,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeMode {
    /// Walk to the fisherman and run fixed click scripts
    Walk,
    /// Open the trade dialog through template-anchored clicks
    Gui,
}

/// One step of a fixed click script, in pointer coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptStep {
    Press(Key),
    Click(Point),
    Wait(f64),
}

/// Per-spot movement
#[derive(Debug, Clone, PartialEq)]
pub struct LocationProfile {
    pub key_to_npc: Key,
    pub key_to_fish: Key,
    /// Middle-click target that walks back to the fishing spot
    pub back_to_fishing: Option<Point>,
    /// Step taken once the fisherman is reached again
    pub final_step: Option<(Key, f64)>,
    /// Key holds after a GUI trade
    pub after_trade: Vec<(Key, f64)>,
}

/// Every platform-dependent constant, in capture pixels unless noted
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub origin: Point,
    /// Capture pixels per pointer unit (2 on retina)
    pub pointer_scale: i32,
    /// Window center in capture pixels
    pub window_center: Point,

    pub bar: BarMechanic,
    pub nudge: Nudge,
    pub cast: CastMethod,
    pub interact_key: Key,

    pub fish_type_x: HashMap<FishType, i32>,
    pub fish_type_y: i32,
    pub fish_type_color: [u8; 3],
    pub fish_type_tolerance: i32,
    pub gray_check: bool,
    pub raid_check: bool,

    pub max_fishing_time: f64,
    pub max_timeout: f64,
    pub pickup_limit: Option<u32>,
    pub pickup_region: Region,
    /// After a pull, park the pointer over the fisherman (or this fallback)
    pub post_pull_pointer: Option<Point>,

    pub npc_color: [u8; 3],
    pub npc_threshold: i32,
    pub npc_search: Option<Region>,

    /// Fixed search regions of HUD templates; a miss there is final
    pub default_regions: HashMap<Template, Region>,
    pub minimap: Region,
    pub map_scroll_origin: Point,
    /// Pointer park spot after pressing navigate, pointer coordinates
    pub park_pointer: Option<Point>,
    pub dialog_via_talk: bool,
    pub recovery: Recovery,
    pub bag_gauge: Region,

    pub trade: TradeMode,
    pub sell_script: Vec<ScriptStep>,
    pub buy_script: Vec<ScriptStep>,
}

impl PlatformProfile {
    /// Profile for the running platform
    pub fn detect(origin: Point, window_center: Point, settings: &Settings) -> crate::error::Result<Self> {
        match Platform::current() {
            Platform::MacOs => Ok(Self::macos(origin, window_center, settings)),
            Platform::Windows => {
                let cast = settings.fish_key.parse::<CastBinding>()?;
                Ok(Self::windows(origin, window_center, settings, cast))
            }
        }
    }

    /// Retina calibration; `origin` is already in capture pixels
    pub fn macos(origin: Point, window_center: Point, settings: &Settings) -> Self {
        let at = |x: i32, y: i32, w: u32, h: u32| Region::new(origin.x + x, origin.y + y, w, h);
        let interrupt_party = at(760, 1255, 225, 45);
        let hud_ready = at(1800, 1100, 230, 230);
        let hud_standby = at(1540, 860, 100, 100);
        let default_regions = HashMap::from([
            (Template::CancelLair, at(735, 945, 180, 40)),
            (Template::CancelParty, interrupt_party),
            (Template::CancelRaid, interrupt_party),
            (Template::Pulling, at(528, 200, 83, 31)),
            (Template::Ready, hud_ready),
            (Template::Waiting, hud_ready),
            (Template::Standby, hud_standby),
            (Template::Talk, hud_standby),
            (Template::Pick, hud_standby),
        ]);

        let bar = match settings.bar_variant {
            BarVariant::Index => BarMechanic::Index(IndexBar {
                strip: at(612, 214, 882, 1),
                dark: 70.0,
                bright: 165.0,
                n_dark: 10,
                n_offset: 8,
                lb: 150,
                ub: 350,
                right_edge: 650,
                step: 80,
            }),
            BarVariant::Color => BarMechanic::Color(color_bar(at(612, 230, 882, 2))),
        };

        // click scripts are in pointer points
        let p = |x: i32, y: i32| ScriptStep::Click(Point::new(origin.x / 2 + x, origin.y / 2 + y));
        let sell_script = vec![
            ScriptStep::Press(Key::Space),
            ScriptStep::Wait(1.0),
            p(850, 540),
            ScriptStep::Wait(0.5),
            p(530, 660),
            ScriptStep::Wait(0.2),
            p(880, 650),
            ScriptStep::Wait(0.2),
            p(1010, 170),
            ScriptStep::Wait(15.0),
        ];
        let mut buy_script = vec![
            ScriptStep::Press(Key::Space),
            ScriptStep::Wait(1.0),
            p(840, 600),
            ScriptStep::Wait(1.0),
            p(890, 600),
        ];
        for _ in 0..3 {
            buy_script.extend([ScriptStep::Wait(0.2), p(960, 470)]);
        }
        buy_script.extend([
            ScriptStep::Wait(0.2),
            p(900, 655),
            ScriptStep::Wait(0.2),
            p(1010, 170),
            ScriptStep::Wait(0.2),
            p(1010, 170),
        ]);

        Self {
            platform: Platform::MacOs,
            origin,
            pointer_scale: 2,
            window_center,
            bar,
            nudge: Nudge::Key(Key::Char('n')),
            cast: CastMethod::ClickStandby,
            interact_key: Key::Char('e'),
            fish_type_x: fish_type_x([0, 910, 1047]),
            fish_type_y: 137,
            fish_type_color: FISH_TYPE_COLOR,
            fish_type_tolerance: FISH_TYPE_TOLERANCE,
            gray_check: false,
            raid_check: false,
            max_fishing_time: 20.0,
            max_timeout: 2.0,
            pickup_limit: None,
            pickup_region: at(400, 240, 1120, 600),
            post_pull_pointer: None,
            npc_color: [230, 190, 135],
            npc_threshold: 40,
            npc_search: Some(at(0, 0, 2100, 1630)),
            default_regions,
            minimap: at(1700, 100, 250, 180),
            map_scroll_origin: Point::new(origin.x + 250, origin.y + 400),
            park_pointer: None,
            dialog_via_talk: true,
            recovery: Recovery::CloseOrSpace,
            bag_gauge: at(1710, 1290, 1, 76),
            trade: TradeMode::Walk,
            sell_script,
            buy_script,
        }
    }

    /// Desktop calibration at 1920x1080
    pub fn windows(origin: Point, window_center: Point, settings: &Settings, cast: CastBinding) -> Self {
        let at = |x: i32, y: i32, w: u32, h: u32| Region::new(origin.x + x, origin.y + y, w, h);
        let bar = match settings.bar_variant {
            BarVariant::Index => BarMechanic::Index(IndexBar {
                strip: at(560, 145, 806, 1),
                dark: 70.0,
                bright: (settings.brightness as f32 / 10.0).floor() + 150.0,
                n_dark: 9,
                n_offset: 7,
                lb: 130,
                ub: 300,
                right_edge: 600,
                step: 65,
            }),
            BarVariant::Color => BarMechanic::Color(color_bar(at(560, 160, 806, 2))),
        };

        Self {
            platform: Platform::Windows,
            origin,
            pointer_scale: 1,
            window_center,
            bar,
            nudge: Nudge::ClickReadyBox,
            cast: CastMethod::Binding(cast),
            interact_key: Key::Char('e'),
            fish_type_x: fish_type_x([0, 826, 955]),
            fish_type_y: 75,
            fish_type_color: FISH_TYPE_COLOR,
            fish_type_tolerance: FISH_TYPE_TOLERANCE,
            gray_check: true,
            raid_check: true,
            max_fishing_time: 40.0,
            max_timeout: 5.0,
            pickup_limit: Some(10),
            pickup_region: at(400, 240, 1120, 600),
            post_pull_pointer: Some(Point::new(origin.x + 960, origin.y + 540)),
            npc_color: [248, 198, 134],
            npc_threshold: 30,
            npc_search: None,
            default_regions: HashMap::new(),
            minimap: at(1620, 10, 220, 150),
            map_scroll_origin: Point::new(origin.x + 250, origin.y + 400),
            park_pointer: Some(Point::new(origin.x + 960, origin.y + 1000)),
            dialog_via_talk: false,
            recovery: Recovery::Escape,
            bag_gauge: at(1560, 947, 1, 70),
            trade: TradeMode::Gui,
            sell_script: Vec::new(),
            buy_script: Vec::new(),
        }
    }

    /// Movement for a fishing spot
    pub fn location(&self, location: Location) -> LocationProfile {
        let k = Key::Char;
        match self.platform {
            Platform::MacOs => {
                let (to_npc, to_fish) = match location {
                    Location::Bilefen | Location::Tundra => (k('w'), k('s')),
                    Location::Ashwold => (k('a'), k('w')),
                };
                LocationProfile {
                    key_to_npc: to_npc,
                    key_to_fish: to_fish,
                    back_to_fishing: None,
                    final_step: None,
                    after_trade: Vec::new(),
                }
            }
            Platform::Windows => {
                let o = self.origin;
                let (back, step, after) = match location {
                    Location::Bilefen => (o.offset(970, 670), k('s'), vec![(k('a'), 0.05)]),
                    Location::Tundra => (o.offset(1100, 670), k('s'), vec![(k('d'), 0.05)]),
                    Location::Ashwold => (o.offset(1400, 385), k('d'), vec![(k('d'), 0.5), (k('w'), 1.5)]),
                };
                LocationProfile {
                    key_to_npc: k('w'),
                    key_to_fish: k('s'),
                    back_to_fishing: Some(back),
                    final_step: Some((step, 0.3)),
                    after_trade: after,
                }
            }
        }
    }

    /// Screen pixel of the rarity indicator for a fish type
    pub fn fish_type_pixel(&self, fish_type: FishType) -> Point {
        let x = self.fish_type_x.get(&fish_type).copied().unwrap_or(0);
        Point::new(self.origin.x + x, self.origin.y + self.fish_type_y)
    }

    /// Capture pixels to pointer coordinates
    pub fn to_pointer(&self, p: Point) -> Point {
        Point::new(p.x / self.pointer_scale, p.y / self.pointer_scale)
    }
}

/// Indicator color of a qualifying bite
const FISH_TYPE_COLOR: [u8; 3] = [125, 125, 100];
const FISH_TYPE_TOLERANCE: i32 = 100;

fn fish_type_x(xs: [i32; 3]) -> HashMap<FishType, i32> {
    HashMap::from([
        (FishType::White, xs[0]),
        (FishType::Blue, xs[1]),
        (FishType::Yellow, xs[2]),
    ])
}

fn color_bar(strip: Region) -> ColorBar {
    ColorBar { strip, color: [111, 44, 35], tolerance: 20, min_percent: 1.0 }
}
