//! Spacecraft simulation
//!
//! Everything that moves in a mission lives here. This module has no
//! rendering or platform dependencies:
//! - One `tick(dt)` per frame, single-threaded
//! - Seeded RNG only
//! - Entities addressed through generation-checked handles

pub mod arena;
pub mod classes;
pub mod collision;
pub mod computers;
pub mod control;
pub mod effects;
pub mod equipment;
pub mod events;
pub mod octree;
pub mod physics;
pub mod pool;
pub mod resources;
pub mod spacecraft;

pub use arena::{Arena, Handle};
pub use classes::{
    BlinkerClass, ClassLibrary, DamageIndicatorClass, EquipmentProfile, ExplosionClass,
    JumpEngineClass, ProjectileClass, PropulsionClass, ShieldClass, SpacecraftClass, WeaponClass,
    WeaponRotation, WeaponSlot,
};
pub use collision::{Aabb, SegmentHit, segment_aabb_intersection, sphere_aabb_overlap};
pub use computers::{FlightMode, Maneuver, ManeuveringComputer, TargetInfo, TargetingComputer};
pub use control::{
    Command, ControlContext, Controller, CraftView, PursuitController, TargetCommand,
    controller_for,
};
pub use effects::{Particle, ParticleKind, Projectile, explosion_particles};
pub use equipment::{
    BurnNeed, JumpEngine, JumpState, JumpTransition, ProjectileSpawn, Propulsion, Shield,
    ThrusterBurn, Weapon,
};
pub use events::{EventHandler, EventHandlers, EventKind, SpacecraftEvent};
pub use octree::{Octree, OctreeItem};
pub use physics::PhysicalBody;
pub use pool::{Pool, Poolable};
pub use resources::ReadinessGate;
pub use spacecraft::{
    CombatStats, DamageOutcome, ExplosionSpawn, LifeState, Spacecraft, SpacecraftHandle, Squad,
};
