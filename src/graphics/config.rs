//! Graphics configuration format
//!
//! Parsed from the game's graphics JSON: the shader complexity levels under
//! `shaders` and the quality option lists under `context`.

use serde::{Deserialize, Serialize};

use super::options::{OptionEntry, OptionSet};
use super::shaders::ComplexityDescriptor;
use crate::error::{ConfigError, ConfigResult};

/// An option list with its default selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionListConfig {
    pub default: String,
    pub options: Vec<OptionEntry>,
}

impl OptionListConfig {
    /// Build the option set, selecting the default (or the highest level if
    /// the default is not among the options)
    pub fn build(&self, setting: &'static str) -> ConfigResult<OptionSet> {
        if self.options.is_empty() {
            return Err(ConfigError::invalid(setting, "no options defined"));
        }
        let mut set = OptionSet::new(setting, self.options.clone());
        if set.set_current(&self.default, true).unwrap_or(false) {
            return Ok(set);
        }
        log::warn!("Default '{}' of {} is not an option", self.default, setting);
        Ok(set)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Default complexity name
    pub complexity: String,
    /// Complexity levels ordered from simplest to most complex
    pub complexities: Vec<ComplexityDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    #[serde(default)]
    pub antialiasing: bool,
    /// Values: 0 bilinear, 1 trilinear, >1 anisotropic sample count
    pub filtering: OptionListConfig,
    /// Values are texture sizes in pixels
    pub texture_quality: OptionListConfig,
    pub cubemap_quality: OptionListConfig,
    pub lod_level: OptionListConfig,
    #[serde(default)]
    pub shadow_mapping: bool,
    /// Values are shadow map sizes in pixels
    pub shadow_quality: OptionListConfig,
    /// Values are the number of shadow map ranges
    pub shadow_distance: OptionListConfig,
    #[serde(default = "default_shadow_depth_ratio")]
    pub shadow_depth_ratio: f32,
    /// Values are the maximum number of dynamic point lights
    pub point_light_amount: OptionListConfig,
    /// Values are particle count factors
    pub particle_amount: OptionListConfig,
    pub dust_amount: OptionListConfig,
}

fn default_shadow_depth_ratio() -> f32 {
    1.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    pub shaders: ShaderConfig,
    pub context: ContextConfig,
}

impl GraphicsConfig {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: GraphicsConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::json("graphics", e))?;
        if config.shaders.complexities.is_empty() {
            return Err(ConfigError::invalid(
                "graphics shaders",
                "no complexity levels defined",
            ));
        }
        Ok(config)
    }

    pub fn complexity(&self, name: &str) -> Option<&ComplexityDescriptor> {
        self.shaders.complexities.iter().find(|c| c.name == name)
    }
}
