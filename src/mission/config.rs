//! Tunable mission parameters

use serde::{Deserialize, Serialize};

use crate::graphics::GraphicsSettings;

/// Mission tuning (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MissionConfig {
    pub projectile_pool_size: usize,
    pub particle_pool_size: usize,
    pub octree_max_depth: u32,
    pub octree_max_objects: usize,
    /// Fraction of a craft's score value reserved for the killing blow
    pub final_blow_share: f32,
    /// Radians within which a weapon counts as aimed
    pub aim_tolerance: f32,
    /// Multiplier on explosion particle counts
    pub particle_amount: f32,
    /// Multiplier on dust cloud particle counts
    pub dust_amount: f32,
    pub seed: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            projectile_pool_size: 1000,
            particle_pool_size: 2000,
            octree_max_depth: 4,
            octree_max_objects: 8,
            final_blow_share: 0.2,
            aim_tolerance: 2f32.to_radians(),
            particle_amount: 1.0,
            dust_amount: 1.0,
            seed: 0,
        }
    }
}

impl MissionConfig {
    /// Take the effect amounts from the active graphics settings
    pub fn with_graphics(mut self, graphics: &GraphicsSettings) -> Self {
        self.particle_amount = graphics.particle_amount();
        self.dust_amount = graphics.dust_amount();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}
