//! Immortal Angler - fishing, salvage and trade agent for Diablo Immortal
//!
//! Usage: `immortal-angler [location] [fish-type]`
//!        `immortal-angler --reset-cache`
//!
//! Without arguments the location and fish type come from `config/settings.json`.
//! The stop key (F10 by default) ends the run. `--reset-cache` forgets every saved HUD
//! position and exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use global_hotkey::{
    hotkey::{Code, HotKey},
    GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState,
};

use immortal_angler::fish::{FishType, Location};
use immortal_angler::input::DesktopInput;
use immortal_angler::log_main::Journal;
use immortal_angler::utils::keybinds::stop_code;
use immortal_angler::utils::path::{images_dir, journal_dir, log_dir, regions_path, settings_path};
use immortal_angler::utils::SystemClock;
use immortal_angler::window::{locate_window, WindowPlacement};
use immortal_angler::{
    get_data_dir, Agent, AgentConfig, BotState, ImageService, PlatformProfile, RegionCache, Session, Settings,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// Log filter configuration:
// - Sets default level to 'info'
// - Keeps the capture and input backends quiet
const LOG_FILTER: &str = "info,immortal_angler=info,screenshots=warn,enigo=warn";

fn init_logging(base: &Path) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_dir = log_dir(base);
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file_path = log_dir.join("debug.log");
    let file_result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LOG_FILTER));

    match file_result {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false);
            let stdout_layer = tracing_subscriber::fmt::layer();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stdout_layer)
                .init();

            tracing::info!("[INIT] Logging initialized, file: {:?}", log_file_path);
        }
        Err(e) => {
            // Fallback: stdout-only logging with same filter
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            eprintln!("[INIT] Failed to create debug log file at {:?}: {}", log_file_path, e);
        }
    }
}

/// Positional `[location] [fish-type]`; unknown values fall back to tundra and yellow.
/// A direct invocation always salvages when the bag runs low.
fn apply_cli_args(settings: &mut Settings, args: &[String]) {
    if args.is_empty() {
        return;
    }
    settings.location = args[0].parse().unwrap_or_else(|_| {
        tracing::warn!("[INIT] Unknown location {:?}, using tundra", args[0]);
        Location::Tundra
    });
    settings.fish_type = match args.get(1) {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            tracing::warn!("[INIT] Unknown fish type {:?}, using yellow", arg);
            FishType::Yellow
        }),
        None => FishType::Yellow,
    };
    settings.auto_salvage = true;
}

const RESET_CACHE_FLAG: &str = "--reset-cache";

/// Read settings; a first run writes the defaults out so they can be edited
fn load_settings(path: &Path) -> Settings {
    let settings = Settings::load(path);
    if !path.exists() {
        match settings.save(path) {
            Ok(()) => tracing::info!("[INIT] Wrote default settings to {:?}", path),
            Err(e) => tracing::warn!("[INIT] Failed to write default settings: {}", e),
        }
    }
    settings
}

/// Drop the saved HUD positions, in memory and on disk
fn reset_cache(base: &Path) -> anyhow::Result<()> {
    let path = regions_path(base);
    RegionCache::load(&path).reset().context("Failed to delete region cache")?;
    tracing::info!("[INIT] Region cache reset ({:?})", path);
    Ok(())
}

/// Build the live services on the worker thread and run the agent until stopped
fn run_agent(
    settings: Settings,
    placement: WindowPlacement,
    base: PathBuf,
    state: Arc<BotState>,
) -> anyhow::Result<()> {
    let profile = PlatformProfile::detect(placement.origin, placement.center, &settings)
        .context("Invalid fish key in settings")?;
    let cache = RegionCache::load(regions_path(&base));
    let image_service = ImageService::new(images_dir(&base));
    let input = DesktopInput::new(settings.window_title.clone()).context("Failed to start input simulation")?;
    let clock = SystemClock::new();
    let journal = Journal::new(journal_dir(&base));

    let session = Session::new(&profile, &image_service, &input, &clock, &cache, &state);
    let agent = Agent::new(session, AgentConfig::from_settings(&settings)).with_journal(&journal);
    tracing::info!(
        "[AGENT] Fishing {} fish at {} (auto salvage: {})",
        settings.fish_type,
        settings.location,
        settings.auto_salvage
    );
    agent.auto_fishing()?;
    Ok(())
}

/// Drain pending window messages so hotkey events get delivered
#[cfg(windows)]
fn pump_messages() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE};

    let mut msg = MSG::default();
    unsafe {
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

#[cfg(not(windows))]
fn pump_messages() {}

fn main() -> anyhow::Result<()> {
    let base = get_data_dir();
    init_logging(&base);

    println!("Immortal Angler {}", env!("CARGO_PKG_VERSION"));
    println!("================================");

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == RESET_CACHE_FLAG) {
        return reset_cache(&base);
    }

    let mut settings = load_settings(&settings_path(&base));
    apply_cli_args(&mut settings, &args);

    let stop: Code = stop_code(&settings.stop_key).context("Invalid stop key in settings")?;
    let placement = locate_window(&settings.window_title).context("Game window not found")?;
    tracing::info!("[INIT] Game window at {:?}", placement.origin);

    let manager = GlobalHotKeyManager::new().context("Failed to create hotkey manager")?;
    let stop_hotkey = HotKey::new(None, stop);
    manager.register(stop_hotkey).context("Failed to register stop hotkey")?;
    println!("Hotkeys: STOP={}", settings.stop_key);

    let journal = Journal::new(journal_dir(&base));
    if let Err(e) = journal.start_session() {
        tracing::warn!("[INIT] Failed to write session journal: {}", e);
    }

    let state = Arc::new(BotState::new());
    state.set_running(true);

    let worker_state = state.clone();
    let worker_base = base.clone();
    let worker = thread::spawn(move || run_agent(settings, placement, worker_base, worker_state));

    let receiver = GlobalHotKeyEvent::receiver();
    while !worker.is_finished() {
        if let Ok(event) = receiver.try_recv() {
            if event.id == stop_hotkey.id() && event.state == HotKeyState::Pressed && state.is_running() {
                tracing::info!("[AGENT] Stop key pressed, finishing the current step...");
                state.set_running(false);
            }
        }
        pump_messages();
        thread::sleep(POLL_INTERVAL);
    }

    let result = match worker.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!("Agent thread panicked")),
    };

    state.set_running(false);
    if let Err(e) = journal.stop_session() {
        tracing::warn!("[AGENT] Failed to write session journal: {}", e);
    }
    let _ = manager.unregister(stop_hotkey);
    println!("Session stats: {}", state.to_json());

    result
}
