//! Pooled transient objects: projectiles and particles

use std::rc::Rc;

use glam::Vec3;
use rand::Rng;

use super::classes::{ExplosionClass, ProjectileClass};
use super::collision::Aabb;
use super::equipment::ProjectileSpawn;
use super::pool::Poolable;
use super::spacecraft::SpacecraftHandle;

#[derive(Debug, Clone, Default)]
pub struct Projectile {
    class: Option<Rc<ProjectileClass>>,
    /// The craft that fired it (never hit by its own projectiles)
    pub origin: Option<SpacecraftHandle>,
    pub position: Vec3,
    pub velocity: Vec3,
    age: f32,
    hit: bool,
}

impl Poolable for Projectile {
    fn can_be_reused(&self) -> bool {
        match &self.class {
            Some(class) => self.hit || self.age >= class.duration,
            None => true,
        }
    }
}

impl Projectile {
    pub fn new(spawn: ProjectileSpawn, origin: Option<SpacecraftHandle>) -> Self {
        Self {
            class: Some(spawn.class),
            origin,
            position: spawn.position,
            velocity: spawn.velocity,
            age: 0.0,
            hit: false,
        }
    }

    pub fn class(&self) -> Option<&Rc<ProjectileClass>> {
        self.class.as_ref()
    }

    pub fn damage(&self) -> f32 {
        self.class.as_ref().map_or(0.0, |c| c.damage)
    }

    pub fn size(&self) -> f32 {
        self.class.as_ref().map_or(0.0, |c| c.size)
    }

    pub fn age(&self) -> f32 {
        self.age
    }

    pub fn has_hit(&self) -> bool {
        self.hit
    }

    /// Move along the path for one tick; returns the segment travelled
    pub fn advance(&mut self, dt: f32) -> (Vec3, Vec3) {
        let start = self.position;
        self.position += self.velocity * dt;
        self.age += dt;
        (start, self.position)
    }

    /// Box around the segment travelled this tick
    pub fn path_box(&self, start: Vec3, end: Vec3) -> Aabb {
        Aabb::of_segment(start, end, self.size())
    }

    pub fn mark_hit(&mut self, position: Vec3) {
        self.position = position;
        self.hit = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleKind {
    #[default]
    Spark,
    Fire,
    Smoke,
    Dust,
}

#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub kind: ParticleKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub age: f32,
    pub duration: f32,
}

impl Poolable for Particle {
    fn can_be_reused(&self) -> bool {
        self.age >= self.duration
    }
}

impl Particle {
    pub fn advance(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.age += dt;
    }

    /// 0 at spawn, 1 when finished
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.age / self.duration).min(1.0)
        } else {
            1.0
        }
    }
}

fn random_direction<R: Rng>(rng: &mut R) -> Vec3 {
    // Rejection sampling inside the unit ball
    loop {
        let v = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let len2 = v.length_squared();
        if len2 > 1e-4 && len2 <= 1.0 {
            return v / len2.sqrt();
        }
    }
}

/// Particles of an explosion, scaled by the particle amount setting
pub fn explosion_particles<R: Rng>(
    class: &ExplosionClass,
    position: Vec3,
    velocity: Vec3,
    amount: f32,
    rng: &mut R,
) -> Vec<Particle> {
    let count = (class.particle_count as f32 * amount).round().max(0.0) as usize;
    (0..count)
        .map(|i| {
            let speed = class.particle_speed * rng.random_range(0.3..1.0);
            Particle {
                kind: if i % 3 == 0 {
                    ParticleKind::Smoke
                } else {
                    ParticleKind::Fire
                },
                position,
                velocity: velocity + random_direction(rng) * speed,
                size: class.particle_size * rng.random_range(0.5..1.5),
                age: 0.0,
                duration: class.duration * rng.random_range(0.5..1.0),
            }
        })
        .collect()
}
