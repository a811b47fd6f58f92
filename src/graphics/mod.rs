//! Graphics configuration
//!
//! Derives the concrete rendering parameters (shader complexity, light,
//! shadow and particle budgets) from layered quality settings, within the
//! limits of the graphics device.

pub mod config;
pub mod options;
pub mod settings;
pub mod shaders;

pub use config::{ContextConfig, GraphicsConfig, OptionListConfig, ShaderConfig};
pub use options::{OptionEntry, OptionSet, QualityOptions, QualityPreferenceList};
pub use settings::{
    Degradation, DerivedFeatures, GraphicsSettings, QualityAxis, RenderParameters,
    ShadowParameters,
};
pub use shaders::{
    ComplexityDescriptor, GpuLimits, RequirementCounts, ShaderFeature, ShaderRequirements,
    calculate_requirements,
};
