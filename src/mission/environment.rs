//! Mission environment: directional lights and dust clouds
//!
//! Dust particles fill a cube around the camera. They never move on their
//! own; when the camera leaves a particle behind, the particle wraps to the
//! opposite face, so the cloud seems endless.

use glam::Vec3;
use rand::Rng;

use super::data::{DustCloudData, EnvironmentData, LightSourceData};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    /// Unit vector toward the light
    pub direction: Vec3,
    pub color: Vec3,
}

impl LightSource {
    fn from_data(data: &LightSourceData) -> Self {
        Self {
            direction: data.direction.normalize_or(Vec3::Z),
            color: data.color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DustCloud {
    pub color: Vec3,
    /// Half extent of the cube around the camera
    pub range: f32,
    particles: Vec<Vec3>,
}

impl DustCloud {
    fn from_data<R: Rng>(data: &DustCloudData, amount: f32, rng: &mut R) -> Self {
        let count = (data.count as f32 * amount).round().max(0.0) as usize;
        let range = data.range.max(f32::EPSILON);
        let particles = (0..count)
            .map(|_| {
                Vec3::new(
                    rng.random_range(-range..range),
                    rng.random_range(-range..range),
                    rng.random_range(-range..range),
                )
            })
            .collect();
        Self {
            color: data.color,
            range,
            particles,
        }
    }

    pub fn particles(&self) -> &[Vec3] {
        &self.particles
    }

    fn wrap_around(&mut self, center: Vec3) {
        let size = 2.0 * self.range;
        let range = Vec3::splat(self.range);
        for particle in &mut self.particles {
            let offset = (*particle - center + range).rem_euclid(Vec3::splat(size)) - range;
            *particle = center + offset;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Environment {
    light_sources: Vec<LightSource>,
    dust_clouds: Vec<DustCloud>,
}

impl Environment {
    /// `dust_amount` scales the particle count of every dust cloud
    pub fn from_data<R: Rng>(data: &EnvironmentData, dust_amount: f32, rng: &mut R) -> Self {
        Self {
            light_sources: data.light_sources.iter().map(LightSource::from_data).collect(),
            dust_clouds: data
                .dust_clouds
                .iter()
                .map(|cloud| DustCloud::from_data(cloud, dust_amount, rng))
                .collect(),
        }
    }

    pub fn light_sources(&self) -> &[LightSource] {
        &self.light_sources
    }

    /// The lights a shader with room for `max` directional lights renders
    pub fn lights_within(&self, max: u32) -> &[LightSource] {
        let n = (max as usize).min(self.light_sources.len());
        &self.light_sources[..n]
    }

    pub fn dust_clouds(&self) -> &[DustCloud] {
        &self.dust_clouds
    }

    /// Keep the dust around `center` (the camera)
    pub fn simulate(&mut self, center: Vec3) {
        for cloud in &mut self.dust_clouds {
            cloud.wrap_around(center);
        }
    }
}
