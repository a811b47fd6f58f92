//! Graphics settings engine
//!
//! Owns every quality setting, keeps them within what the graphics device
//! can do, and persists user choices through a [`SettingsStore`].
//!
//! Setting lifecycle: defaults from the configuration → hardware limits
//! applied → persisted overrides restored → shader requirements resolved.
//! The invariant kept at all times is that the active shader complexity,
//! with the current shadow and light settings, fits the device limits. When a
//! change breaks it, dependent settings are lowered in a fixed order
//! (shadow distance, then shadow mapping, then point lights).

use super::config::GraphicsConfig;
use super::options::{OptionSet, QualityOptions, QualityPreferenceList};
use super::shaders::{
    ComplexityDescriptor, GpuLimits, RequirementCounts, ShaderFeature, ShaderRequirements,
    calculate_requirements,
};
use crate::error::{ConfigError, GraphicsError, GraphicsResult};
use crate::persistence::{KEY_PREFIX, SettingsStore};

/// Settings that are chosen from an option list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityAxis {
    Filtering,
    TextureQuality,
    CubemapQuality,
    LodLevel,
    ShadowQuality,
    ShadowDistance,
    PointLightAmount,
    ParticleAmount,
    DustAmount,
    ShaderComplexity,
}

impl QualityAxis {
    pub const ALL: [QualityAxis; 10] = [
        QualityAxis::Filtering,
        QualityAxis::TextureQuality,
        QualityAxis::CubemapQuality,
        QualityAxis::LodLevel,
        QualityAxis::ShadowQuality,
        QualityAxis::ShadowDistance,
        QualityAxis::PointLightAmount,
        QualityAxis::ParticleAmount,
        QualityAxis::DustAmount,
        QualityAxis::ShaderComplexity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityAxis::Filtering => "filtering",
            QualityAxis::TextureQuality => "texture quality",
            QualityAxis::CubemapQuality => "cubemap quality",
            QualityAxis::LodLevel => "LOD level",
            QualityAxis::ShadowQuality => "shadow quality",
            QualityAxis::ShadowDistance => "shadow distance",
            QualityAxis::PointLightAmount => "point light amount",
            QualityAxis::ParticleAmount => "particle amount",
            QualityAxis::DustAmount => "dust amount",
            QualityAxis::ShaderComplexity => "shader complexity",
        }
    }

    fn storage_key(&self) -> String {
        let suffix = match self {
            QualityAxis::Filtering => "filtering",
            QualityAxis::TextureQuality => "textureQuality",
            QualityAxis::CubemapQuality => "cubemapQuality",
            QualityAxis::LodLevel => "lodLevel",
            QualityAxis::ShadowQuality => "shadowQuality",
            QualityAxis::ShadowDistance => "shadowDistance",
            QualityAxis::PointLightAmount => "pointLightAmount",
            QualityAxis::ParticleAmount => "particleAmount",
            QualityAxis::DustAmount => "dustAmount",
            QualityAxis::ShaderComplexity => "shaderComplexity",
        };
        format!("{}graphics_{}", KEY_PREFIX, suffix)
    }

    /// Whether a change on this axis can break the shader requirement invariant
    pub fn affects_requirements(&self) -> bool {
        matches!(
            self,
            QualityAxis::ShadowDistance
                | QualityAxis::PointLightAmount
                | QualityAxis::ShaderComplexity
        )
    }
}

fn antialiasing_key() -> String {
    format!("{}graphics_antialiasing", KEY_PREFIX)
}

fn shadow_mapping_key() -> String {
    format!("{}graphics_shadowMapping", KEY_PREFIX)
}

/// One step taken while bringing requirements within the device limits
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    ShadowDistanceLowered(String),
    ShadowMappingDisabled,
    PointLightsLowered(String),
}

/// Values derived from the active complexity level, refreshed when it changes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DerivedFeatures {
    pub shadow_mapping_available: bool,
    pub dynamic_lights_available: bool,
    pub luminosity_textures: bool,
    pub reveal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowParameters {
    pub map_size: u32,
    pub ranges: u32,
    pub depth_ratio: f32,
}

/// Everything a renderer needs to pick shader variants and budgets
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParameters {
    pub shader_complexity: String,
    pub antialiasing: bool,
    pub filtering: String,
    pub anisotropy: f32,
    pub texture_quality: String,
    pub cubemap_quality: String,
    pub lod_level: u32,
    pub max_directional_lights: u32,
    pub max_point_lights: u32,
    pub max_spot_lights: u32,
    pub shadows: Option<ShadowParameters>,
    pub particle_amount: f32,
    pub dust_amount: f32,
    pub luminosity_textures: bool,
    pub reveal: bool,
}

/// Current value of every quality setting
#[derive(Debug, Clone)]
struct QualityState {
    antialiasing: bool,
    shadow_mapping: bool,
    filtering: OptionSet,
    texture_quality: QualityPreferenceList,
    cubemap_quality: QualityPreferenceList,
    lod_level: OptionSet,
    shadow_quality: OptionSet,
    shadow_distance: OptionSet,
    point_light_amount: OptionSet,
    particle_amount: OptionSet,
    dust_amount: OptionSet,
    /// Values are indices into the configured complexity list
    shader_complexity: OptionSet,
}

impl QualityState {
    fn from_config(config: &GraphicsConfig) -> GraphicsResult<Self> {
        let ctx = &config.context;
        let levels = config
            .shaders
            .complexities
            .iter()
            .enumerate()
            .map(|(i, c)| super::options::OptionEntry::new(c.name.clone(), i as f32))
            .collect();
        let mut shader_complexity = OptionSet::new(QualityAxis::ShaderComplexity.as_str(), levels);
        if !shader_complexity.set_current(&config.shaders.complexity, true)? {
            log::warn!(
                "Default shader complexity '{}' is not configured",
                config.shaders.complexity
            );
        }
        Ok(Self {
            antialiasing: ctx.antialiasing,
            shadow_mapping: ctx.shadow_mapping,
            filtering: ctx.filtering.build(QualityAxis::Filtering.as_str())?,
            texture_quality: QualityPreferenceList::new(
                ctx.texture_quality.build(QualityAxis::TextureQuality.as_str())?,
            ),
            cubemap_quality: QualityPreferenceList::new(
                ctx.cubemap_quality.build(QualityAxis::CubemapQuality.as_str())?,
            ),
            lod_level: ctx.lod_level.build(QualityAxis::LodLevel.as_str())?,
            shadow_quality: ctx.shadow_quality.build(QualityAxis::ShadowQuality.as_str())?,
            shadow_distance: ctx.shadow_distance.build(QualityAxis::ShadowDistance.as_str())?,
            point_light_amount: ctx
                .point_light_amount
                .build(QualityAxis::PointLightAmount.as_str())?,
            particle_amount: ctx.particle_amount.build(QualityAxis::ParticleAmount.as_str())?,
            dust_amount: ctx.dust_amount.build(QualityAxis::DustAmount.as_str())?,
            shader_complexity,
        })
    }

    fn options(&self, axis: QualityAxis) -> &OptionSet {
        match axis {
            QualityAxis::Filtering => &self.filtering,
            QualityAxis::TextureQuality => self.texture_quality.options(),
            QualityAxis::CubemapQuality => self.cubemap_quality.options(),
            QualityAxis::LodLevel => &self.lod_level,
            QualityAxis::ShadowQuality => &self.shadow_quality,
            QualityAxis::ShadowDistance => &self.shadow_distance,
            QualityAxis::PointLightAmount => &self.point_light_amount,
            QualityAxis::ParticleAmount => &self.particle_amount,
            QualityAxis::DustAmount => &self.dust_amount,
            QualityAxis::ShaderComplexity => &self.shader_complexity,
        }
    }

    fn options_mut(&mut self, axis: QualityAxis) -> &mut OptionSet {
        match axis {
            QualityAxis::Filtering => &mut self.filtering,
            QualityAxis::TextureQuality => self.texture_quality.options_mut(),
            QualityAxis::CubemapQuality => self.cubemap_quality.options_mut(),
            QualityAxis::LodLevel => &mut self.lod_level,
            QualityAxis::ShadowQuality => &mut self.shadow_quality,
            QualityAxis::ShadowDistance => &mut self.shadow_distance,
            QualityAxis::PointLightAmount => &mut self.point_light_amount,
            QualityAxis::ParticleAmount => &mut self.particle_amount,
            QualityAxis::DustAmount => &mut self.dust_amount,
            QualityAxis::ShaderComplexity => &mut self.shader_complexity,
        }
    }
}

/// Selections of the settings that take part in requirement resolution
#[derive(Debug, Clone, Copy)]
struct DependentSnapshot {
    shader_complexity: Option<usize>,
    shadow_distance: Option<usize>,
    point_light_amount: Option<usize>,
    shadow_mapping: bool,
}

/// The graphics settings of one session
pub struct GraphicsSettings {
    config: GraphicsConfig,
    limits: GpuLimits,
    store: Box<dyn SettingsStore>,
    state: QualityState,
    derived: DerivedFeatures,
}

impl std::fmt::Debug for GraphicsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsSettings")
            .field("limits", &self.limits)
            .field("state", &self.state)
            .field("derived", &self.derived)
            .finish_non_exhaustive()
    }
}

impl GraphicsSettings {
    /// Load defaults, apply device limits, restore persisted choices and
    /// resolve shader requirements.
    pub fn new(
        config: GraphicsConfig,
        limits: GpuLimits,
        store: Box<dyn SettingsStore>,
    ) -> GraphicsResult<Self> {
        let state = QualityState::from_config(&config)?;
        let mut settings = Self {
            config,
            limits,
            store,
            state,
            derived: DerivedFeatures::default(),
        };
        settings.apply_hardware_limits()?;
        settings.restore_persisted();
        settings.refresh_derived();
        settings.resolve_requirements()?;
        log::info!(
            "Graphics settings ready: complexity '{}', shadows {}, {} point lights",
            settings.shader_complexity(),
            settings.is_shadow_mapping_active(),
            settings.max_point_lights()
        );
        Ok(settings)
    }

    pub fn limits(&self) -> &GpuLimits {
        &self.limits
    }

    /// Drop option levels the device cannot handle and complexity levels
    /// whose shaders do not fit even with every optional feature off.
    fn apply_hardware_limits(&mut self) -> GraphicsResult<()> {
        let limits = self.limits;
        self.state.texture_quality.options_mut().apply_limit(limits.max_texture_size as f32);
        self.state.cubemap_quality.options_mut().apply_limit(limits.max_cubemap_size as f32);
        self.state.shadow_quality.apply_limit(limits.max_renderbuffer_size as f32);
        self.state.filtering.apply_limit(limits.max_anisotropy.max(1.0));

        for axis in [
            QualityAxis::TextureQuality,
            QualityAxis::CubemapQuality,
            QualityAxis::ShadowQuality,
            QualityAxis::Filtering,
        ] {
            if self.state.options(axis).is_empty() {
                return Err(ConfigError::invalid(
                    axis.as_str(),
                    "no option is supported by this graphics device",
                )
                .into());
            }
        }

        let complexities = &self.config.shaders.complexities;
        self.state.shader_complexity.retain(|entry| {
            let descriptor = &complexities[entry.value as usize];
            let base = calculate_requirements(descriptor, &descriptor.base_counts());
            let fits = limits.satisfies(&base);
            if !fits {
                log::warn!(
                    "Shader complexity '{}' is not supported by this device and was removed",
                    descriptor.name
                );
            }
            fits
        });
        if self.state.shader_complexity.is_empty() {
            let lowest = complexities
                .first()
                .map(|c| c.name.clone())
                .unwrap_or_default();
            log::error!("No shader complexity level fits this graphics device");
            return Err(GraphicsError::Unsatisfiable { complexity: lowest });
        }
        Ok(())
    }

    fn restore_persisted(&mut self) {
        for axis in QualityAxis::ALL {
            let key = axis.storage_key();
            let Some(value) = self.store.get(&key) else {
                continue;
            };
            match self.state.options_mut(axis).set_current(&value, false) {
                Ok(_) => log::debug!("Restored {} '{}'", axis.as_str(), value),
                Err(e) => {
                    log::warn!("Ignoring persisted setting: {}", e);
                    self.store.remove(&key);
                }
            }
        }
        if let Some(value) = self.read_bool(&antialiasing_key()) {
            self.state.antialiasing = value;
        }
        if let Some(value) = self.read_bool(&shadow_mapping_key()) {
            self.state.shadow_mapping = value;
        }
    }

    fn read_bool(&mut self, key: &str) -> Option<bool> {
        let value = self.store.get(key)?;
        match value.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => {
                log::warn!("Ignoring persisted '{}' = '{}'", key, value);
                self.store.remove(key);
                None
            }
        }
    }

    /// Forget persisted choices and return to the configured defaults
    pub fn restore_defaults(&mut self) -> GraphicsResult<()> {
        for axis in QualityAxis::ALL {
            self.store.remove(&axis.storage_key());
        }
        self.store.remove(&antialiasing_key());
        self.store.remove(&shadow_mapping_key());
        self.state = QualityState::from_config(&self.config)?;
        self.apply_hardware_limits()?;
        self.refresh_derived();
        self.resolve_requirements()?;
        Ok(())
    }

    fn refresh_derived(&mut self) {
        let d = self.complexity_descriptor();
        self.derived = DerivedFeatures {
            shadow_mapping_available: d.has_feature(ShaderFeature::ShadowMapping),
            dynamic_lights_available: d.has_feature(ShaderFeature::DynamicLights),
            luminosity_textures: d.has_feature(ShaderFeature::LuminosityTextures),
            reveal: d.has_feature(ShaderFeature::Reveal),
        };
    }

    fn complexity_index(&self) -> usize {
        self.state.shader_complexity.current_value().unwrap_or(0.0) as usize
    }

    /// Descriptor of the active complexity level
    pub fn complexity_descriptor(&self) -> &ComplexityDescriptor {
        &self.config.shaders.complexities[self.complexity_index()]
    }

    // --- Requirement resolution ---

    pub fn is_shadow_mapping_active(&self) -> bool {
        self.state.shadow_mapping && self.derived.shadow_mapping_available
    }

    pub fn max_point_lights(&self) -> u32 {
        if !self.derived.dynamic_lights_available {
            return 0;
        }
        let budget = self.state.point_light_amount.current_value().unwrap_or(0.0) as u32;
        budget.min(self.complexity_descriptor().max_point_lights)
    }

    pub fn max_spot_lights(&self) -> u32 {
        if self.max_point_lights() > 0 {
            self.complexity_descriptor().max_spot_lights
        } else {
            0
        }
    }

    fn shadow_range_count(&self) -> u32 {
        self.state.shadow_distance.current_value().unwrap_or(0.0) as u32
    }

    /// Runtime counts the current settings imply for `descriptor`
    fn counts_for(&self, descriptor: &ComplexityDescriptor) -> RequirementCounts {
        let mut counts = descriptor.base_counts();
        if self.state.shadow_mapping && descriptor.has_feature(ShaderFeature::ShadowMapping) {
            counts.shadow_maps = descriptor.max_directional_lights;
            counts.shadow_ranges = descriptor.max_directional_lights * self.shadow_range_count();
            counts.shadow_samples = descriptor.num_shadow_samples;
        }
        if descriptor.has_feature(ShaderFeature::DynamicLights) {
            let budget = self.state.point_light_amount.current_value().unwrap_or(0.0) as u32;
            counts.point_lights = budget.min(descriptor.max_point_lights);
            if counts.point_lights > 0 {
                counts.spot_lights = descriptor.max_spot_lights;
            }
        }
        counts
    }

    pub fn requirement_counts(&self) -> RequirementCounts {
        self.counts_for(self.complexity_descriptor())
    }

    /// Requirements of the active complexity with the current settings
    pub fn current_requirements(&self) -> ShaderRequirements {
        let descriptor = self.complexity_descriptor();
        calculate_requirements(descriptor, &self.counts_for(descriptor))
    }

    /// Lower dependent settings until the active complexity fits the device.
    ///
    /// Returns the steps taken, empty when nothing had to change. Fails when
    /// shadows are off and the point light budget is at its floor but the
    /// requirements still do not fit.
    pub fn resolve_requirements(&mut self) -> GraphicsResult<Vec<Degradation>> {
        let mut steps = Vec::new();
        loop {
            let required = self.current_requirements();
            if self.limits.satisfies(&required) {
                for step in &steps {
                    log::warn!("Lowered graphics setting to fit the device: {:?}", step);
                }
                return Ok(steps);
            }
            if self.is_shadow_mapping_active() {
                if self.state.shadow_distance.decrease() {
                    let name = self.state.shadow_distance.current_name().unwrap_or_default();
                    steps.push(Degradation::ShadowDistanceLowered(name.to_string()));
                } else {
                    self.state.shadow_mapping = false;
                    steps.push(Degradation::ShadowMappingDisabled);
                }
                continue;
            }
            if self.max_point_lights() > 0 && self.state.point_light_amount.decrease() {
                let name = self.state.point_light_amount.current_name().unwrap_or_default();
                steps.push(Degradation::PointLightsLowered(name.to_string()));
                continue;
            }
            let complexity = self.shader_complexity().to_string();
            log::error!(
                "Shader complexity '{}' needs {:?}, which this device cannot provide",
                complexity,
                required
            );
            return Err(GraphicsError::Unsatisfiable { complexity });
        }
    }

    fn snapshot(&self) -> DependentSnapshot {
        DependentSnapshot {
            shader_complexity: self.state.shader_complexity.current_index(),
            shadow_distance: self.state.shadow_distance.current_index(),
            point_light_amount: self.state.point_light_amount.current_index(),
            shadow_mapping: self.state.shadow_mapping,
        }
    }

    fn restore_snapshot(&mut self, snapshot: DependentSnapshot) {
        restore_index(&mut self.state.shader_complexity, snapshot.shader_complexity);
        restore_index(&mut self.state.shadow_distance, snapshot.shadow_distance);
        restore_index(&mut self.state.point_light_amount, snapshot.point_light_amount);
        self.state.shadow_mapping = snapshot.shadow_mapping;
        self.refresh_derived();
    }

    /// Re-validate after a change, undoing it if it cannot be satisfied
    fn revalidate(&mut self, before: DependentSnapshot) -> GraphicsResult<()> {
        self.refresh_derived();
        match self.resolve_requirements() {
            Ok(_) => Ok(()),
            Err(e) => {
                self.restore_snapshot(before);
                Err(e)
            }
        }
    }

    // --- Setters ---

    /// Select `value` on `axis`.
    ///
    /// With `fallback_to_highest` an unknown value selects the highest
    /// available level; without it an invalid-option error is returned and
    /// the previous value stays. Returns whether `value` itself was selected.
    pub fn set_option(
        &mut self,
        axis: QualityAxis,
        value: &str,
        persist: bool,
        fallback_to_highest: bool,
    ) -> GraphicsResult<bool> {
        let before = self.snapshot();
        let exact = self
            .state
            .options_mut(axis)
            .set_current(value, fallback_to_highest)?;
        if axis.affects_requirements() {
            self.revalidate(before)?;
        }
        if persist {
            if let Some(name) = self.state.options(axis).current_name() {
                let name = name.to_string();
                self.store.set(&axis.storage_key(), &name);
            }
        }
        Ok(exact)
    }

    pub fn set_filtering(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::Filtering, value, persist, fallback)
    }

    pub fn set_texture_quality(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::TextureQuality, value, persist, fallback)
    }

    pub fn set_cubemap_quality(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::CubemapQuality, value, persist, fallback)
    }

    pub fn set_lod_level(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::LodLevel, value, persist, fallback)
    }

    pub fn set_shadow_quality(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::ShadowQuality, value, persist, fallback)
    }

    pub fn set_shadow_distance(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::ShadowDistance, value, persist, fallback)
    }

    pub fn set_point_light_amount(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::PointLightAmount, value, persist, fallback)
    }

    pub fn set_particle_amount(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::ParticleAmount, value, persist, fallback)
    }

    pub fn set_dust_amount(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::DustAmount, value, persist, fallback)
    }

    pub fn set_shader_complexity(
        &mut self,
        value: &str,
        persist: bool,
        fallback: bool,
    ) -> GraphicsResult<bool> {
        self.set_option(QualityAxis::ShaderComplexity, value, persist, fallback)
    }

    pub fn set_antialiasing(&mut self, value: bool, persist: bool) {
        self.state.antialiasing = value;
        if persist {
            self.store.set(&antialiasing_key(), if value { "true" } else { "false" });
        }
    }

    /// Toggle shadow mapping. Turning it on re-validates requirements, which
    /// may lower the shadow distance or switch shadows straight back off.
    pub fn set_shadow_mapping(&mut self, value: bool, persist: bool) -> GraphicsResult<()> {
        let before = self.snapshot();
        self.state.shadow_mapping = value;
        self.revalidate(before)?;
        if persist {
            let stored = if self.state.shadow_mapping { "true" } else { "false" };
            self.store.set(&shadow_mapping_key(), stored);
        }
        Ok(())
    }

    // --- Getters ---

    pub fn options(&self, axis: QualityAxis) -> &OptionSet {
        self.state.options(axis)
    }

    pub fn current_name(&self, axis: QualityAxis) -> &str {
        self.state.options(axis).current_name().unwrap_or_default()
    }

    pub fn current_value(&self, axis: QualityAxis) -> f32 {
        self.state.options(axis).current_value().unwrap_or(0.0)
    }

    pub fn shader_complexity(&self) -> &str {
        self.current_name(QualityAxis::ShaderComplexity)
    }

    pub fn antialiasing(&self) -> bool {
        self.state.antialiasing
    }

    /// The user's shadow mapping choice (see `is_shadow_mapping_active` for
    /// whether shadows are actually rendered)
    pub fn shadow_mapping(&self) -> bool {
        self.state.shadow_mapping
    }

    pub fn derived(&self) -> DerivedFeatures {
        self.derived
    }

    pub fn texture_quality_preferences(&self) -> Vec<&str> {
        self.state.texture_quality.preference_order()
    }

    pub fn cubemap_quality_preferences(&self) -> Vec<&str> {
        self.state.cubemap_quality.preference_order()
    }

    /// Complexity levels that fit the device with the current shadow and
    /// light settings, without any degradation
    pub fn complexities_fitting_current_settings(&self) -> Vec<&str> {
        let complexities = &self.config.shaders.complexities;
        self.state.shader_complexity.filtered_names(|value| {
            let descriptor = &complexities[value as usize];
            let required = calculate_requirements(descriptor, &self.counts_for(descriptor));
            self.limits.satisfies(&required)
        })
    }

    pub fn particle_amount(&self) -> f32 {
        self.current_value(QualityAxis::ParticleAmount)
    }

    pub fn dust_amount(&self) -> f32 {
        self.current_value(QualityAxis::DustAmount)
    }

    pub fn render_parameters(&self) -> RenderParameters {
        let descriptor = self.complexity_descriptor();
        let shadows = self.is_shadow_mapping_active().then(|| ShadowParameters {
            map_size: self.current_value(QualityAxis::ShadowQuality) as u32,
            ranges: self.shadow_range_count(),
            depth_ratio: self.config.context.shadow_depth_ratio,
        });
        let filtering_value = self.current_value(QualityAxis::Filtering);
        RenderParameters {
            shader_complexity: self.shader_complexity().to_string(),
            antialiasing: self.state.antialiasing,
            filtering: self.current_name(QualityAxis::Filtering).to_string(),
            anisotropy: if filtering_value > 1.0 { filtering_value } else { 0.0 },
            texture_quality: self.current_name(QualityAxis::TextureQuality).to_string(),
            cubemap_quality: self.current_name(QualityAxis::CubemapQuality).to_string(),
            lod_level: self.current_value(QualityAxis::LodLevel) as u32,
            max_directional_lights: descriptor.max_directional_lights,
            max_point_lights: self.max_point_lights(),
            max_spot_lights: self.max_spot_lights(),
            shadows,
            particle_amount: self.particle_amount(),
            dust_amount: self.dust_amount(),
            luminosity_textures: self.derived.luminosity_textures,
            reveal: self.derived.reveal,
        }
    }
}

fn restore_index(set: &mut OptionSet, index: Option<usize>) {
    match index.and_then(|i| set.entries().get(i).map(|e| e.name.clone())) {
        Some(name) => {
            if let Err(e) = set.set_current(&name, false) {
                log::debug!("Could not restore '{}' for {}: {}", name, set.setting(), e);
            }
        }
        None => set.select_highest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn demo_config() -> GraphicsConfig {
        GraphicsConfig::from_json(include_str!("../../demos/graphics.json")).unwrap()
    }

    fn settings_with(limits: GpuLimits, store: MemoryStore) -> GraphicsResult<GraphicsSettings> {
        GraphicsSettings::new(demo_config(), limits, Box::new(store))
    }

    /// Limits that only the simplest complexity level fits
    fn minimal_limits() -> GpuLimits {
        GpuLimits {
            max_vertex_uniform_vectors: 128,
            max_vertex_attributes: 8,
            max_varying_vectors: 8,
            max_texture_image_units: 8,
            max_fragment_uniform_vectors: 16,
            max_texture_size: 2048,
            max_cubemap_size: 1024,
            max_renderbuffer_size: 2048,
            max_anisotropy: 0.0,
        }
    }

    #[test]
    fn test_defaults_on_capable_device() {
        let settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        assert_eq!(settings.shader_complexity(), "normal");
        assert!(settings.is_shadow_mapping_active());
        assert!(settings.derived().luminosity_textures);
        assert!(settings.limits().satisfies(&settings.current_requirements()));
    }

    #[test]
    fn test_hardware_limits_filter_options() {
        let settings = settings_with(minimal_limits(), MemoryStore::new()).unwrap();
        let textures = settings.options(QualityAxis::TextureQuality);
        assert!(textures.entries().iter().all(|e| e.value <= 2048.0));
        // anisotropic filtering removed when unsupported
        assert!(settings.current_value(QualityAxis::Filtering) <= 1.0);
    }

    #[test]
    fn test_unsupported_complexities_are_pruned() {
        let settings = settings_with(minimal_limits(), MemoryStore::new()).unwrap();
        assert_eq!(settings.options(QualityAxis::ShaderComplexity).names(), vec!["simple"]);
        assert_eq!(settings.shader_complexity(), "simple");
    }

    #[test]
    fn test_requesting_pruned_complexity_is_minor_error() {
        let mut settings = settings_with(minimal_limits(), MemoryStore::new()).unwrap();
        let err = settings.set_shader_complexity("normal", false, false).unwrap_err();
        assert!(err.is_minor());
        assert_eq!(settings.shader_complexity(), "simple");

        // with fallback the best available level is used silently
        assert!(!settings.set_shader_complexity("normal", false, true).unwrap());
        assert_eq!(settings.shader_complexity(), "simple");
    }

    #[test]
    fn test_no_fitting_complexity_is_fatal() {
        let limits = GpuLimits {
            max_vertex_uniform_vectors: 1,
            ..minimal_limits()
        };
        let err = settings_with(limits, MemoryStore::new()).unwrap_err();
        assert!(matches!(err, GraphicsError::Unsatisfiable { .. }));
    }

    #[test]
    fn test_degradation_order() {
        // Fits "normal" without shadows and with few point lights only
        let limits = GpuLimits {
            max_fragment_uniform_vectors: 100,
            ..GpuLimits::desktop()
        };
        let mut settings = settings_with(limits, MemoryStore::new()).unwrap();
        let steps = settings.resolve_requirements().unwrap();
        assert!(steps.is_empty(), "construction already resolved");

        settings.set_shadow_mapping(true, false).unwrap();
        settings.set_point_light_amount("maximum", false, false).unwrap();

        let counts = settings.requirement_counts();
        assert!(settings.limits().satisfies(&settings.current_requirements()));
        // shadows are lowered before point lights: whenever point lights were
        // lowered, shadows must already be off
        if settings.current_name(QualityAxis::PointLightAmount) != "maximum" {
            assert_eq!(counts.shadow_ranges, 0);
            assert!(!settings.is_shadow_mapping_active());
        }
    }

    #[test]
    fn test_degradation_steps_in_order() {
        let mut settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        settings.set_shadow_distance("far", false, false).unwrap();
        settings.set_point_light_amount("maximum", false, false).unwrap();
        let required = settings.current_requirements();

        // shrink the fragment budget so that even one shadow range too many
        // is not affordable
        settings.limits.max_fragment_uniform_vectors = required.fragment_uniform_vectors - 1;
        let steps = settings.resolve_requirements().unwrap();
        assert!(matches!(steps.first(), Some(Degradation::ShadowDistanceLowered(_))));
        assert!(settings.limits().satisfies(&settings.current_requirements()));

        // idempotent once satisfied
        let snapshot = settings.render_parameters();
        assert!(settings.resolve_requirements().unwrap().is_empty());
        assert_eq!(settings.render_parameters(), snapshot);
    }

    #[test]
    fn test_unsatisfiable_after_exhausting_degradation() {
        let mut settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        let complexity = settings.shader_complexity().to_string();
        settings.limits.max_fragment_uniform_vectors = 1;
        let err = settings.resolve_requirements().unwrap_err();
        assert!(matches!(err, GraphicsError::Unsatisfiable { complexity: c } if c == complexity));
        assert!(!settings.is_shadow_mapping_active());
    }

    #[test]
    fn test_persist_and_restore() {
        let mut store = MemoryStore::new();
        store.set("armada_graphics_textureQuality", "low");
        store.set("armada_graphics_antialiasing", "true");
        store.set("armada_graphics_lodLevel", "nonsense");
        let restored = settings_with(GpuLimits::desktop(), store).unwrap();
        assert_eq!(restored.current_name(QualityAxis::TextureQuality), "low");
        assert!(restored.antialiasing());
        // invalid persisted values fall back to the default
        assert_eq!(restored.current_name(QualityAxis::LodLevel), "high");
    }

    #[test]
    fn test_restore_index_out_of_range_selects_highest() {
        use crate::graphics::options::OptionEntry;
        let mut set = OptionSet::new(
            "lodLevel",
            vec![OptionEntry::new("low", 1.0), OptionEntry::new("high", 2.0)],
        );
        restore_index(&mut set, Some(0));
        assert_eq!(set.current_name(), Some("low"));
        restore_index(&mut set, Some(7));
        assert_eq!(set.current_name(), Some("high"));
        restore_index(&mut set, None);
        assert_eq!(set.current_name(), Some("high"));
    }

    #[test]
    fn test_persist_flag_writes_store() {
        let mut settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        settings.set_dust_amount("none", true, false).unwrap();
        assert_eq!(
            settings.store.get("armada_graphics_dustAmount").as_deref(),
            Some("none")
        );
        settings.set_lod_level("low", false, false).unwrap();
        assert!(settings.store.get("armada_graphics_lodLevel").is_none());

        settings.restore_defaults().unwrap();
        assert!(settings.store.get("armada_graphics_dustAmount").is_none());
        assert_eq!(settings.current_name(QualityAxis::DustAmount), "medium");
    }

    #[test]
    fn test_texture_preferences_follow_selection() {
        let mut settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        settings.set_texture_quality("medium", false, false).unwrap();
        assert_eq!(
            settings.texture_quality_preferences(),
            vec!["medium", "low", "high", "ultra"]
        );
    }

    #[test]
    fn test_render_parameters() {
        let mut settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        settings.set_shadow_mapping(false, false).unwrap();
        let params = settings.render_parameters();
        assert!(params.shadows.is_none());
        assert_eq!(params.shader_complexity, "normal");
        assert!(params.max_point_lights > 0);

        settings.set_shader_complexity("simple", false, false).unwrap();
        let params = settings.render_parameters();
        assert_eq!(params.max_point_lights, 0);
        assert!(!params.luminosity_textures);
    }

    #[test]
    fn test_complexities_fitting_current_settings() {
        let settings = settings_with(GpuLimits::desktop(), MemoryStore::new()).unwrap();
        let fitting = settings.complexities_fitting_current_settings();
        assert!(fitting.contains(&"simple"));
        assert!(fitting.contains(&settings.shader_complexity()));
    }
}
