//! Armada - mission simulation core of a 3D space-combat game
//!
//! Core modules:
//! - `graphics`: Quality settings, shader requirements and device limits
//! - `sim`: Spacecraft, equipment, projectiles, particles and spatial queries
//! - `mission`: Teams, objectives (triggers, conditions, actions) and the tick
//! - `persistence`: Key-value storage for settings
//! - `error`: Configuration and graphics error types

pub mod error;
pub mod graphics;
pub mod mission;
pub mod persistence;
pub mod sim;

pub use error::{ConfigError, GraphicsError};
pub use graphics::GraphicsSettings;
pub use mission::{Mission, MissionConfig, MissionState};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta fed to the accumulator (tab switches, debugger pauses)
    pub const MAX_FRAME_DT: f32 = 0.1;
}
