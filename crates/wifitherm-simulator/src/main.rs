//! Desktop simulator for the wifitherm sensor node.
//!
//! Runs the real core control loop against host stand-ins for the hardware:
//! a synthetic sensor, a JSON config file, std TCP for reports, the terminal
//! as captive portal and stdout as the display. Built with the `window`
//! feature, the panel is rendered in an SDL2 window via
//! `embedded-graphics-simulator` instead.
//!
//! # Environment
//!
//! | Variable            | Default          | Meaning                                |
//! |---------------------|------------------|----------------------------------------|
//! | `RUST_LOG`          | `info`           | Log filter                             |
//! | `WIFITHERM_CONFIG`  | `config.json`    | Config record path                     |
//! | `WIFITHERM_TRIGGER` | `provision.flag` | Provisioning is forced while it exists |
//! | `WIFITHERM_TICK_MS` | `2000`           | Sensor minimum delay (tick period)     |

mod display;
mod network;
mod portal;
mod sensor;
mod storage;

use embassy_futures::block_on;
use embassy_time::{Duration, Instant};
#[cfg(not(feature = "window"))]
use embedded_hal_async::delay::DelayNs;
use log::info;

use wifitherm_core::constants::DEVICE_ID;
use wifitherm_core::control_loop::{Clock, ControlLoop, Devices};
use wifitherm_core::display::{DisplayPresenter, Palette, TextSurface};

use crate::network::StdConnector;
use crate::portal::{FileTrigger, TerminalPortal};
use crate::sensor::MockSensorGenerator;
use crate::storage::FileStorage;

const DEFAULT_TICK_MS: u64 = 2000;

/// Monotonic time from embassy-time's std driver.
struct HostClock;

impl Clock for HostClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sleeps the calling thread; the simulator has nothing else to run.
#[cfg(not(feature = "window"))]
struct ThreadDelay;

#[cfg(not(feature = "window"))]
impl DelayNs for ThreadDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(std::time::Duration::from_nanos(ns.into()));
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

type SimDevices<D> =
    Devices<FileTrigger, TerminalPortal, FileStorage, MockSensorGenerator, D, StdConnector>;

fn devices<D: TextSurface>(surface: D, tick: Duration) -> SimDevices<D> {
    let config_path = env_or("WIFITHERM_CONFIG", "config.json");
    let trigger_path = env_or("WIFITHERM_TRIGGER", "provision.flag");
    info!("Config file: {}", config_path);
    info!("Provisioning trigger: {} (create it to hold the button)", trigger_path);

    Devices {
        trigger: FileTrigger::new(trigger_path),
        portal: TerminalPortal,
        storage: FileStorage::new(config_path),
        sensor: MockSensorGenerator::new(tick),
        display: DisplayPresenter::new(surface, Palette::default()),
        connector: StdConnector,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting {} simulator", DEVICE_ID);

    let tick_ms = env_or("WIFITHERM_TICK_MS", "")
        .parse()
        .unwrap_or(DEFAULT_TICK_MS);
    let tick = Duration::from_millis(tick_ms);

    #[cfg(not(feature = "window"))]
    run_console(tick);
    #[cfg(feature = "window")]
    window::run(tick);
}

#[cfg(not(feature = "window"))]
fn run_console(tick: Duration) {
    let mut control = ControlLoop::boot(devices(display::ConsoleSurface::new(), tick), HostClock.now());
    match block_on(control.run(&HostClock, &mut ThreadDelay)) {}
}

#[cfg(feature = "window")]
mod window {
    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;
    use embedded_graphics_simulator::{
        OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window, sdl2::Keycode,
    };
    use wifitherm_core::display::GraphicsSurface;

    use super::*;

    /// Same geometry as the firmware's panel.
    const DISPLAY_WIDTH: u32 = 320;
    const DISPLAY_HEIGHT: u32 = 240;

    /// Pixel scale factor for the simulator window.
    const WINDOW_SCALE: u32 = 2;

    /// Event polling period while waiting for the next tick (~30 FPS).
    const FRAME_DURATION: std::time::Duration = std::time::Duration::from_millis(33);

    pub fn run(tick: Duration) {
        let display = SimulatorDisplay::<Rgb565>::new(Size::new(DISPLAY_WIDTH, DISPLAY_HEIGHT));
        let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
        let mut window = Window::new("wifitherm", &output_settings);
        info!("Keys: Q=Quit");

        let mut control = ControlLoop::boot(devices(GraphicsSurface::new(display), tick), HostClock.now());

        // The SDL window is lazily initialized on the first `update()` call.
        // We must call `update()` once before `events()` or it will panic.
        window.update(control.presenter().surface().target());

        'running: loop {
            block_on(control.tick(HostClock.now()));

            let next_tick = std::time::Instant::now() + std::time::Duration::from_millis(tick.as_millis());
            while std::time::Instant::now() < next_tick {
                window.update(control.presenter().surface().target());
                for event in window.events() {
                    match event {
                        SimulatorEvent::Quit => break 'running,
                        SimulatorEvent::KeyDown { keycode, .. }
                            if keycode == Keycode::Q || keycode == Keycode::Escape =>
                        {
                            break 'running;
                        }
                        _ => {}
                    }
                }
                std::thread::sleep(FRAME_DURATION);
            }
        }

        info!("Simulator exiting");
    }
}
