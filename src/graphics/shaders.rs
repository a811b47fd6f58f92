//! Shader resource requirements
//!
//! Each shader complexity level declares what its shaders need from the GPU:
//! a static part, a part per optional feature, and a part that grows with
//! the number of lights, shadow maps, etc. (dependent requirements).
//! `calculate_requirements` adds these up for a given feature configuration.

use std::collections::BTreeSet;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

/// GPU resource counts needed by a shader variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShaderRequirements {
    pub vertex_uniform_vectors: u32,
    pub attributes: u32,
    pub varying_vectors: u32,
    pub texture_units: u32,
    pub fragment_uniform_vectors: u32,
}

impl ShaderRequirements {
    pub const ZERO: Self = Self {
        vertex_uniform_vectors: 0,
        attributes: 0,
        varying_vectors: 0,
        texture_units: 0,
        fragment_uniform_vectors: 0,
    };

    pub const fn new(
        vertex_uniform_vectors: u32,
        attributes: u32,
        varying_vectors: u32,
        texture_units: u32,
        fragment_uniform_vectors: u32,
    ) -> Self {
        Self {
            vertex_uniform_vectors,
            attributes,
            varying_vectors,
            texture_units,
            fragment_uniform_vectors,
        }
    }

    /// Component-wise sum, saturating at `u32::MAX`
    pub fn combine(self, other: Self) -> Self {
        Self {
            vertex_uniform_vectors: self
                .vertex_uniform_vectors
                .saturating_add(other.vertex_uniform_vectors),
            attributes: self.attributes.saturating_add(other.attributes),
            varying_vectors: self.varying_vectors.saturating_add(other.varying_vectors),
            texture_units: self.texture_units.saturating_add(other.texture_units),
            fragment_uniform_vectors: self
                .fragment_uniform_vectors
                .saturating_add(other.fragment_uniform_vectors),
        }
    }
}

impl Add for ShaderRequirements {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.combine(other)
    }
}

impl AddAssign for ShaderRequirements {
    fn add_assign(&mut self, other: Self) {
        *self = self.combine(other);
    }
}

impl Mul<u32> for ShaderRequirements {
    type Output = Self;

    fn mul(self, count: u32) -> Self {
        Self {
            vertex_uniform_vectors: self.vertex_uniform_vectors.saturating_mul(count),
            attributes: self.attributes.saturating_mul(count),
            varying_vectors: self.varying_vectors.saturating_mul(count),
            texture_units: self.texture_units.saturating_mul(count),
            fragment_uniform_vectors: self.fragment_uniform_vectors.saturating_mul(count),
        }
    }
}

impl Sum for ShaderRequirements {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::combine)
    }
}

/// What the graphics device can provide
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuLimits {
    pub max_vertex_uniform_vectors: u32,
    pub max_vertex_attributes: u32,
    pub max_varying_vectors: u32,
    pub max_texture_image_units: u32,
    pub max_fragment_uniform_vectors: u32,
    pub max_texture_size: u32,
    pub max_cubemap_size: u32,
    pub max_renderbuffer_size: u32,
    /// 0 when anisotropic filtering is not supported
    #[serde(default)]
    pub max_anisotropy: f32,
}

impl GpuLimits {
    /// Limits of a typical desktop WebGL device
    pub fn desktop() -> Self {
        Self {
            max_vertex_uniform_vectors: 4096,
            max_vertex_attributes: 16,
            max_varying_vectors: 30,
            max_texture_image_units: 16,
            max_fragment_uniform_vectors: 1024,
            max_texture_size: 16384,
            max_cubemap_size: 16384,
            max_renderbuffer_size: 16384,
            max_anisotropy: 16.0,
        }
    }

    /// Whether every component of `req` fits within these limits
    pub fn satisfies(&self, req: &ShaderRequirements) -> bool {
        req.vertex_uniform_vectors <= self.max_vertex_uniform_vectors
            && req.attributes <= self.max_vertex_attributes
            && req.varying_vectors <= self.max_varying_vectors
            && req.texture_units <= self.max_texture_image_units
            && req.fragment_uniform_vectors <= self.max_fragment_uniform_vectors
    }
}

/// Optional shader features a complexity level can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShaderFeature {
    ShadowMapping,
    DynamicLights,
    LuminosityTextures,
    Reveal,
}

/// Requirements of the optional features, added when the feature is in use
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureRequirements {
    pub shadows: ShaderRequirements,
    pub dynamic_lights: ShaderRequirements,
    pub reveal: ShaderRequirements,
}

/// Requirements per unit of a runtime count
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependentRequirements {
    pub directional_light: ShaderRequirements,
    pub point_light: ShaderRequirements,
    pub spot_light: ShaderRequirements,
    pub shadow_map: ShaderRequirements,
    pub shadow_range: ShaderRequirements,
    pub shadow_sample: ShaderRequirements,
    pub luminosity_factor: ShaderRequirements,
    pub group_transform: ShaderRequirements,
}

/// One shader complexity level from the graphics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityDescriptor {
    pub name: String,
    #[serde(default)]
    pub features: BTreeSet<ShaderFeature>,
    #[serde(default)]
    pub requirements: ShaderRequirements,
    #[serde(default)]
    pub feature_requirements: FeatureRequirements,
    #[serde(default)]
    pub dependent_requirements: DependentRequirements,
    #[serde(default = "default_directional_lights")]
    pub max_directional_lights: u32,
    #[serde(default)]
    pub max_point_lights: u32,
    #[serde(default)]
    pub max_spot_lights: u32,
    #[serde(default)]
    pub num_luminosity_factors: u32,
    #[serde(default)]
    pub num_group_transforms: u32,
    /// Shadow map samples taken per fragment (soft shadows)
    #[serde(default = "default_shadow_samples")]
    pub num_shadow_samples: u32,
}

fn default_directional_lights() -> u32 {
    1
}

fn default_shadow_samples() -> u32 {
    1
}

impl ComplexityDescriptor {
    pub fn has_feature(&self, feature: ShaderFeature) -> bool {
        self.features.contains(&feature)
    }

    /// Counts with every optional feature switched off
    pub fn base_counts(&self) -> RequirementCounts {
        RequirementCounts {
            directional_lights: self.max_directional_lights,
            luminosity_factors: self.num_luminosity_factors,
            group_transforms: self.num_group_transforms,
            ..RequirementCounts::default()
        }
    }
}

/// Runtime counts the dependent requirements scale with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequirementCounts {
    pub directional_lights: u32,
    pub point_lights: u32,
    pub spot_lights: u32,
    pub shadow_maps: u32,
    pub shadow_ranges: u32,
    pub shadow_samples: u32,
    pub luminosity_factors: u32,
    pub group_transforms: u32,
}

/// Total requirements of a complexity level for the given counts.
///
/// The shadow feature cost applies when shadow ranges are in use, the
/// dynamic light cost when there is at least one point light, and the
/// reveal cost whenever the level offers reveal.
pub fn calculate_requirements(
    descriptor: &ComplexityDescriptor,
    counts: &RequirementCounts,
) -> ShaderRequirements {
    let dep = &descriptor.dependent_requirements;
    let mut total = descriptor.requirements
        + dep.directional_light * counts.directional_lights
        + dep.point_light * counts.point_lights
        + dep.spot_light * counts.spot_lights
        + dep.shadow_map * counts.shadow_maps
        + dep.shadow_range * counts.shadow_ranges
        + dep.shadow_sample * counts.shadow_samples
        + dep.luminosity_factor * counts.luminosity_factors
        + dep.group_transform * counts.group_transforms;

    if counts.shadow_maps > 0 && counts.shadow_ranges > 0 {
        total += descriptor.feature_requirements.shadows;
    }
    if counts.point_lights > 0 {
        total += descriptor.feature_requirements.dynamic_lights;
    }
    if descriptor.has_feature(ShaderFeature::Reveal) {
        total += descriptor.feature_requirements.reveal;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn descriptor() -> ComplexityDescriptor {
        ComplexityDescriptor {
            name: "normal".to_string(),
            features: [ShaderFeature::ShadowMapping, ShaderFeature::DynamicLights]
                .into_iter()
                .collect(),
            requirements: ShaderRequirements::new(20, 6, 8, 4, 10),
            feature_requirements: FeatureRequirements {
                shadows: ShaderRequirements::new(0, 0, 0, 0, 3),
                dynamic_lights: ShaderRequirements::new(0, 0, 0, 0, 1),
                reveal: ShaderRequirements::new(0, 0, 1, 0, 2),
            },
            dependent_requirements: DependentRequirements {
                directional_light: ShaderRequirements::new(0, 0, 0, 0, 2),
                point_light: ShaderRequirements::new(0, 0, 0, 0, 2),
                shadow_map: ShaderRequirements::new(0, 0, 0, 1, 0),
                shadow_range: ShaderRequirements::new(0, 0, 0, 1, 1),
                group_transform: ShaderRequirements::new(4, 0, 0, 0, 0),
                ..DependentRequirements::default()
            },
            max_directional_lights: 2,
            max_point_lights: 64,
            max_spot_lights: 0,
            num_luminosity_factors: 0,
            num_group_transforms: 5,
            num_shadow_samples: 1,
        }
    }

    #[test]
    fn test_base_requirements() {
        let d = descriptor();
        let req = calculate_requirements(&d, &d.base_counts());
        assert_eq!(req, ShaderRequirements::new(40, 6, 8, 4, 14));
    }

    #[test]
    fn test_feature_costs_follow_counts() {
        let d = descriptor();
        let counts = RequirementCounts {
            point_lights: 3,
            shadow_maps: 2,
            shadow_ranges: 6,
            ..d.base_counts()
        };
        let req = calculate_requirements(&d, &counts);
        // base 14 + 3 point lights * 2 + dynamic 1 + 6 ranges * 1 + shadows 3
        assert_eq!(req.fragment_uniform_vectors, 14 + 6 + 1 + 6 + 3);
        // 4 base + 2 shadow maps + 6 ranges
        assert_eq!(req.texture_units, 12);
    }

    #[test]
    fn test_reveal_always_added_when_available() {
        let mut d = descriptor();
        d.features.insert(ShaderFeature::Reveal);
        let req = calculate_requirements(&d, &d.base_counts());
        assert_eq!(req.varying_vectors, 9);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let big = ShaderRequirements::new(u32::MAX / 2, 1, 1, 1, u32::MAX);
        let scaled = big * 3;
        assert_eq!(scaled.vertex_uniform_vectors, u32::MAX);
        assert_eq!(scaled.attributes, 3);
        let sum = big + big + ShaderRequirements::new(5, 0, 0, 0, 0);
        assert_eq!(sum.vertex_uniform_vectors, u32::MAX);
        assert_eq!(sum.fragment_uniform_vectors, u32::MAX);
        assert!(!GpuLimits::desktop().satisfies(&sum));
    }

    #[test]
    fn test_limits() {
        let limits = GpuLimits::desktop();
        assert!(limits.satisfies(&ShaderRequirements::new(100, 8, 8, 8, 100)));
        assert!(!limits.satisfies(&ShaderRequirements::new(100, 8, 8, 17, 100)));
    }

    #[test]
    fn test_descriptor_from_json() {
        let d: ComplexityDescriptor = serde_json::from_str(
            r#"{
                "name": "simple",
                "features": ["reveal"],
                "requirements": {"vertexUniformVectors": 10, "fragmentUniformVectors": 5},
                "dependentRequirements": {"groupTransform": {"vertexUniformVectors": 4}},
                "numGroupTransforms": 2
            }"#,
        )
        .unwrap();
        assert!(d.has_feature(ShaderFeature::Reveal));
        assert_eq!(d.max_directional_lights, 1);
        assert_eq!(d.requirements.attributes, 0);
        let req = calculate_requirements(&d, &d.base_counts());
        assert_eq!(req.vertex_uniform_vectors, 18);
    }

    fn arb_req() -> impl Strategy<Value = ShaderRequirements> {
        (0u32..1000, 0u32..1000, 0u32..1000, 0u32..1000, 0u32..1000)
            .prop_map(|(a, b, c, d, e)| ShaderRequirements::new(a, b, c, d, e))
    }

    proptest! {
        #[test]
        fn prop_combine_commutative_associative(a in arb_req(), b in arb_req(), c in arb_req()) {
            prop_assert_eq!(a.combine(b), b.combine(a));
            prop_assert_eq!(a.combine(b.combine(c)), a.combine(b).combine(c));
            prop_assert_eq!([a, b, c].into_iter().sum::<ShaderRequirements>(), a + b + c);
        }
    }
}
