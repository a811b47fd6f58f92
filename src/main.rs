//! Armada entry point
//!
//! Handles platform-specific initialization and runs the bundled skirmish.
//! Native builds play it headless and log the result; the web build exposes
//! it to the page, which drives it from `requestAnimationFrame`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use armada::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use armada::graphics::{GpuLimits, GraphicsConfig, GraphicsSettings};
use armada::persistence::SettingsStore;
use armada::sim::ClassLibrary;
use armada::{Mission, MissionConfig, MissionState};

const GRAPHICS_JSON: &str = include_str!("../demos/graphics.json");
const CLASSES_JSON: &str = include_str!("../demos/classes.json");
const SKIRMISH_JSON: &str = include_str!("../demos/skirmish.json");

/// Give up on a skirmish nobody wins
const TIME_LIMIT: f32 = 900.0;

/// A loaded mission plus the fixed-step accumulator driving it
struct Skirmish {
    graphics: GraphicsSettings,
    mission: Mission,
    accumulator: f32,
}

impl Skirmish {
    fn load(store: Box<dyn SettingsStore>, seed: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let config = GraphicsConfig::from_json(GRAPHICS_JSON)?;
        let graphics = GraphicsSettings::new(config, GpuLimits::desktop(), store)?;
        let classes = ClassLibrary::from_json(CLASSES_JSON)?;
        let mission_config = MissionConfig::default()
            .with_graphics(&graphics)
            .with_seed(seed);
        let mut mission = Mission::from_json(SKIRMISH_JSON, &classes, mission_config)?;
        // no asset loader here, every model counts as loaded
        mission.all_resources_ready();
        log::info!(
            "Skirmish loaded: {} spacecraft, {} teams, state {:?}",
            mission.spacecraft_count(),
            mission.teams().len(),
            mission.state()
        );
        Ok(Self {
            graphics,
            mission,
            accumulator: 0.0,
        })
    }

    /// Run as many fixed steps as `dt` covers
    fn update(&mut self, dt: f32) {
        self.accumulator += dt.min(MAX_FRAME_DT);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.mission.tick(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
    }

    fn is_over(&self) -> bool {
        self.mission.state() != MissionState::InProgress || self.mission.elapsed() >= TIME_LIMIT
    }

    fn report(&self) {
        log::info!(
            "Skirmish over after {:.1}s ({} ticks): {:?}",
            self.mission.elapsed(),
            self.mission.ticks(),
            self.mission.state()
        );
        for team in self.mission.teams() {
            if let Some(stats) = self.mission.team_stats(team.id()) {
                match serde_json::to_string(&stats) {
                    Ok(json) => log::info!("{}: {}", team.display_name(), json),
                    Err(e) => log::warn!("{}: stats unavailable ({})", team.id(), e),
                }
            }
        }
        for (_, craft) in self.mission.spacecrafts() {
            let stats = craft.stats();
            log::debug!(
                "{}: {} kills, {:.0} score, {}/{} hits",
                craft.id(),
                stats.kills,
                stats.score,
                stats.hits,
                stats.shots_fired
            );
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use wasm_bindgen::prelude::*;

    use armada::persistence::LocalStorage;

    use super::Skirmish;

    /// Handle the page keeps to drive the skirmish
    #[wasm_bindgen]
    pub struct WebSkirmish {
        inner: Skirmish,
    }

    #[wasm_bindgen]
    impl WebSkirmish {
        #[wasm_bindgen(constructor)]
        pub fn new(seed: u64) -> Result<WebSkirmish, JsError> {
            let inner = Skirmish::load(Box::new(LocalStorage::new()), seed)
                .map_err(|e| JsError::new(&e.to_string()))?;
            Ok(Self { inner })
        }

        /// Advance by a frame delta in seconds; returns false once the mission is over
        pub fn update(&mut self, dt: f32) -> bool {
            self.inner.update(dt);
            if self.inner.is_over() {
                self.inner.report();
                return false;
            }
            true
        }

        pub fn state(&self) -> String {
            format!("{:?}", self.inner.mission.state())
        }

        pub fn shader_complexity(&self) -> String {
            self.inner.graphics.shader_complexity().to_string()
        }

        /// Text of the message currently on screen
        pub fn message(&self) -> Option<String> {
            self.inner.mission.messages().current().map(|m| m.text.clone())
        }
    }

    pub fn init() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }
        log::info!("Armada starting...");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::init();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use armada::persistence::MemoryStore;

    env_logger::init();
    log::info!("Armada (native) starting headless skirmish...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let mut skirmish = Skirmish::load(Box::new(MemoryStore::new()), seed)?;
    log::info!(
        "Graphics: complexity '{}', {} point lights, particles x{:.2}",
        skirmish.graphics.shader_complexity(),
        skirmish.graphics.max_point_lights(),
        skirmish.graphics.particle_amount()
    );

    let mut last_message = None;
    while !skirmish.is_over() {
        skirmish.update(SIM_DT);
        let current = skirmish.mission.messages().current().map(|m| m.text.clone());
        if current != last_message {
            if let Some(text) = &current {
                log::info!("[{:.1}s] message: {}", skirmish.mission.elapsed(), text);
            }
            last_message = current;
        }
    }
    skirmish.report();
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
