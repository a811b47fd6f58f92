//! Equipment instances mounted on a spacecraft
//!
//! Each piece wraps its shared class with the per-craft runtime state:
//! weapon cool-downs and turret angles, thruster burn levels, remaining
//! shield capacity and the jump engine's sequence.

use std::rc::Rc;

use glam::{Quat, Vec3};

use super::classes::{JumpEngineClass, ProjectileClass, PropulsionClass, ShieldClass, WeaponClass};
use super::physics::PhysicalBody;

/// A projectile a weapon wants to put into the world
#[derive(Debug, Clone)]
pub struct ProjectileSpawn {
    pub class: Rc<ProjectileClass>,
    pub position: Vec3,
    pub velocity: Vec3,
}

#[derive(Debug, Clone)]
pub struct Weapon {
    class: Rc<WeaponClass>,
    /// Mount point in the craft's local frame
    slot: Vec3,
    /// Turret yaw (positive = left), radians
    yaw: f32,
    /// Turret pitch (positive = up), radians
    pitch: f32,
    cooldown: f32,
    aimed: bool,
}

impl Weapon {
    pub fn new(class: Rc<WeaponClass>, slot: Vec3) -> Self {
        Self {
            class,
            slot,
            yaw: 0.0,
            pitch: 0.0,
            cooldown: 0.0,
            aimed: false,
        }
    }

    pub fn class(&self) -> &Rc<WeaponClass> {
        &self.class
    }

    pub fn is_fixed(&self) -> bool {
        self.class.is_fixed()
    }

    pub fn slot(&self) -> Vec3 {
        self.slot
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }

    /// Whether the last aim call left the weapon pointing at its target
    pub fn is_aimed(&self) -> bool {
        self.aimed
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_z(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Firing direction in the craft's local frame
    pub fn direction(&self) -> Vec3 {
        self.rotation() * Vec3::Y
    }

    pub fn simulate(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Turn toward a local-frame direction at the turret's rate.
    ///
    /// Fixed weapons do not move; they count as aimed when the direction is
    /// within `tolerance` radians of straight ahead.
    pub fn aim(&mut self, local_direction: Vec3, dt: f32, tolerance: f32) -> bool {
        let Some(dir) = local_direction.try_normalize() else {
            self.aimed = false;
            return false;
        };
        let desired_yaw = (-dir.x).atan2(dir.y);
        let desired_pitch = dir.z.atan2(dir.x.hypot(dir.y));

        match self.class.rotation {
            None => {
                self.aimed = dir.angle_between(Vec3::Y) <= tolerance;
            }
            Some(rotation) => {
                let max_yaw = rotation.max_yaw.to_radians();
                let max_pitch = rotation.max_pitch.to_radians();
                let step = rotation.rate.to_radians() * dt;
                let yaw_goal = desired_yaw.clamp(-max_yaw, max_yaw);
                let pitch_goal = desired_pitch.clamp(-max_pitch, max_pitch);
                self.yaw += (yaw_goal - self.yaw).clamp(-step, step);
                self.pitch += (pitch_goal - self.pitch).clamp(-step, step);
                self.aimed = self.direction().angle_between(dir) <= tolerance;
            }
        }
        self.aimed
    }

    /// Swing the turret back to its rest position
    pub fn reset_aim(&mut self, dt: f32) {
        self.aimed = false;
        if let Some(rotation) = self.class.rotation {
            let step = rotation.rate.to_radians() * dt;
            self.yaw -= self.yaw.clamp(-step, step);
            self.pitch -= self.pitch.clamp(-step, step);
        }
    }

    /// Ready to fire again with the turret at rest
    pub fn reset(&mut self) {
        self.cooldown = 0.0;
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.aimed = false;
    }

    /// Fire a volley from every barrel if the weapon has cooled down
    pub fn fire(
        &mut self,
        body: &PhysicalBody,
        only_if_aimed_or_fixed: bool,
    ) -> Vec<ProjectileSpawn> {
        if !self.is_ready() || (only_if_aimed_or_fixed && !self.is_fixed() && !self.aimed) {
            return Vec::new();
        }
        self.cooldown = self.class.cooldown;

        let rotation = self.rotation();
        let direction = body.orientation * (rotation * Vec3::Y);
        let velocity = body.velocity + direction * self.class.projectile_velocity;
        self.class
            .barrels
            .iter()
            .map(|barrel| ProjectileSpawn {
                class: self.class.projectile.clone(),
                position: body.to_world(self.slot + rotation * *barrel),
                velocity,
            })
            .collect()
    }
}

/// Burn levels in [-1, 1] per thruster group
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrusterBurn {
    /// +Y
    pub forward: f32,
    /// +X
    pub strafe: f32,
    /// +Z
    pub lift: f32,
    /// About +Z (left)
    pub yaw: f32,
    /// About +X (up)
    pub pitch: f32,
    /// About +Y (right)
    pub roll: f32,
}

impl ThrusterBurn {
    pub fn clamped(self) -> Self {
        let c = |v: f32| v.clamp(-1.0, 1.0);
        Self {
            forward: c(self.forward),
            strafe: c(self.strafe),
            lift: c(self.lift),
            yaw: c(self.yaw),
            pitch: c(self.pitch),
            roll: c(self.roll),
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Burn level needed per unit of velocity change per second, derived from
/// mass and thrust
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnNeed {
    pub linear: f32,
    pub angular: f32,
}

#[derive(Debug, Clone)]
pub struct Propulsion {
    class: Rc<PropulsionClass>,
    burn: ThrusterBurn,
}

impl Propulsion {
    pub fn new(class: Rc<PropulsionClass>) -> Self {
        Self {
            class,
            burn: ThrusterBurn::default(),
        }
    }

    pub fn class(&self) -> &Rc<PropulsionClass> {
        &self.class
    }

    pub fn burn(&self) -> ThrusterBurn {
        self.burn
    }

    pub fn set_burn(&mut self, burn: ThrusterBurn) {
        self.burn = burn.clamped();
    }

    pub fn reset_burn(&mut self) {
        self.burn = ThrusterBurn::default();
    }

    pub fn burn_need(&self, mass: f32) -> BurnNeed {
        BurnNeed {
            linear: mass / self.class.thrust.max(f32::EPSILON),
            angular: mass / self.class.angular_thrust.max(f32::EPSILON),
        }
    }

    /// Push the body with the current burn levels
    pub fn simulate(&self, body: &mut PhysicalBody) {
        let b = self.burn;
        body.add_local_force(Vec3::new(b.strafe, b.forward, b.lift) * self.class.thrust);
        body.add_local_torque(Vec3::new(b.pitch, b.roll, b.yaw) * self.class.angular_thrust);
    }
}

#[derive(Debug, Clone)]
pub struct Shield {
    class: Rc<ShieldClass>,
    capacity: f32,
    recharge_wait: f32,
}

impl Shield {
    pub fn new(class: Rc<ShieldClass>) -> Self {
        let capacity = class.capacity;
        Self {
            class,
            capacity,
            recharge_wait: 0.0,
        }
    }

    pub fn class(&self) -> &Rc<ShieldClass> {
        &self.class
    }

    pub fn capacity(&self) -> f32 {
        self.capacity
    }

    /// Remaining capacity as a fraction of the maximum
    pub fn ratio(&self) -> f32 {
        if self.class.capacity > 0.0 {
            self.capacity / self.class.capacity
        } else {
            0.0
        }
    }

    /// Soak up as much of `amount` as possible; returns what passes through
    pub fn absorb(&mut self, amount: f32) -> f32 {
        let absorbed = amount.min(self.capacity);
        self.capacity -= absorbed;
        self.recharge_wait = self.class.recharge_delay;
        amount - absorbed
    }

    pub fn simulate(&mut self, dt: f32) {
        if self.recharge_wait > 0.0 {
            self.recharge_wait -= dt;
            return;
        }
        self.capacity = (self.capacity + self.class.recharge_rate * dt).min(self.class.capacity);
    }

    pub fn reset(&mut self) {
        self.capacity = self.class.capacity;
        self.recharge_wait = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpState {
    Idle,
    Preparing,
    JumpingOut,
    Away,
    JumpingIn,
}

/// Observable steps of the jump sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTransition {
    Engaged,
    Cancelled,
    OutStarted,
    JumpedOut,
    InStarted,
    ArrivedIn,
}

#[derive(Debug, Clone)]
pub struct JumpEngine {
    class: Rc<JumpEngineClass>,
    state: JumpState,
    timer: f32,
}

impl JumpEngine {
    pub fn new(class: Rc<JumpEngineClass>) -> Self {
        Self {
            class,
            state: JumpState::Idle,
            timer: 0.0,
        }
    }

    pub fn class(&self) -> &Rc<JumpEngineClass> {
        &self.class
    }

    pub fn state(&self) -> JumpState {
        self.state
    }

    /// Seconds left in the current phase
    pub fn timer(&self) -> f32 {
        self.timer
    }

    /// Start preparing, or cancel if already preparing
    pub fn jump_out(&mut self) -> Option<JumpTransition> {
        match self.state {
            JumpState::Idle => {
                self.state = JumpState::Preparing;
                self.timer = self.class.prepare_duration;
                Some(JumpTransition::Engaged)
            }
            JumpState::Preparing => {
                self.state = JumpState::Idle;
                self.timer = 0.0;
                Some(JumpTransition::Cancelled)
            }
            other => {
                log::warn!("Cannot jump out while {:?}", other);
                None
            }
        }
    }

    pub fn jump_in(&mut self) -> Option<JumpTransition> {
        if self.state != JumpState::Away {
            log::warn!("Cannot jump in while {:?}", self.state);
            return None;
        }
        self.state = JumpState::JumpingIn;
        self.timer = self.class.jump_in_duration;
        Some(JumpTransition::InStarted)
    }

    /// Mark the engine as away without running the sequence (craft that
    /// start the mission outside the scene)
    pub fn set_away(&mut self) {
        self.state = JumpState::Away;
        self.timer = 0.0;
    }

    pub fn simulate(&mut self, dt: f32) -> Option<JumpTransition> {
        match self.state {
            JumpState::Idle | JumpState::Away => None,
            JumpState::Preparing => {
                self.timer -= dt;
                (self.timer <= 0.0).then(|| {
                    self.state = JumpState::JumpingOut;
                    self.timer = self.class.jump_out_duration;
                    JumpTransition::OutStarted
                })
            }
            JumpState::JumpingOut => {
                self.timer -= dt;
                (self.timer <= 0.0).then(|| {
                    self.state = JumpState::Away;
                    self.timer = 0.0;
                    JumpTransition::JumpedOut
                })
            }
            JumpState::JumpingIn => {
                self.timer -= dt;
                (self.timer <= 0.0).then(|| {
                    self.state = JumpState::Idle;
                    self.timer = 0.0;
                    JumpTransition::ArrivedIn
                })
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = JumpState::Idle;
        self.timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::classes::WeaponRotation;

    fn projectile() -> Rc<ProjectileClass> {
        Rc::new(ProjectileClass {
            name: "bolt".into(),
            size: 0.5,
            mass: 1.0,
            damage: 10.0,
            duration: 2.0,
            explosion: None,
        })
    }

    fn weapon(rotation: Option<WeaponRotation>) -> Weapon {
        Weapon::new(
            Rc::new(WeaponClass {
                name: "gun".into(),
                projectile: projectile(),
                cooldown: 0.5,
                projectile_velocity: 100.0,
                barrels: vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
                rotation,
                score_value: 10.0,
            }),
            Vec3::new(0.0, 2.0, 0.0),
        )
    }

    fn jump_class() -> Rc<JumpEngineClass> {
        Rc::new(JumpEngineClass {
            name: "jump".into(),
            prepare_duration: 2.0,
            jump_out_duration: 1.0,
            jump_out_acceleration: 100.0,
            jump_in_duration: 1.0,
            jump_in_velocity: 200.0,
            score_value: 0.0,
        })
    }

    #[test]
    fn test_weapon_cooldown() {
        let body = PhysicalBody::new(1.0, Vec3::ZERO, Quat::IDENTITY, 1.0);
        let mut gun = weapon(None);
        let volley = gun.fire(&body, false);
        assert_eq!(volley.len(), 2);
        assert!((volley[0].velocity - Vec3::new(0.0, 100.0, 0.0)).length() < 1e-4);
        assert!((volley[1].position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-4);

        assert!(gun.fire(&body, false).is_empty());
        gun.simulate(0.3);
        assert!(gun.fire(&body, false).is_empty());
        gun.simulate(0.3);
        assert_eq!(gun.fire(&body, false).len(), 2);
    }

    #[test]
    fn test_fixed_weapon_aim_tolerance() {
        let mut gun = weapon(None);
        assert!(gun.aim(Vec3::new(0.05, 1.0, 0.0), 0.1, 0.1));
        assert!(!gun.aim(Vec3::new(1.0, 1.0, 0.0), 0.1, 0.1));
        assert_eq!(gun.direction(), Vec3::Y);
    }

    #[test]
    fn test_turret_turns_at_rate() {
        let rotation = WeaponRotation {
            rate: 90.0,
            max_yaw: 180.0,
            max_pitch: 45.0,
        };
        let mut gun = weapon(Some(rotation));
        let left = Vec3::new(-1.0, 0.0, 0.0);
        // 90 degrees at 90 deg/s: not there after half a second
        assert!(!gun.aim(left, 0.5, 0.01));
        let body = PhysicalBody::new(1.0, Vec3::ZERO, Quat::IDENTITY, 1.0);
        assert!(gun.fire(&body, true).is_empty());
        assert!(gun.aim(left, 0.6, 0.01));
        assert!((gun.direction() - left).length() < 1e-3);
        assert_eq!(gun.fire(&body, true).len(), 2);
    }

    #[test]
    fn test_turret_pitch_limit() {
        let rotation = WeaponRotation {
            rate: 1000.0,
            max_yaw: 180.0,
            max_pitch: 30.0,
        };
        let mut gun = weapon(Some(rotation));
        // straight up is out of reach
        assert!(!gun.aim(Vec3::new(0.0, 0.01, 1.0), 1.0, 0.05));
    }

    #[test]
    fn test_shield_absorb_and_recharge() {
        let mut shield = Shield::new(Rc::new(ShieldClass {
            name: "s".into(),
            capacity: 20.0,
            recharge_delay: 1.0,
            recharge_rate: 10.0,
            score_value: 0.0,
        }));
        assert_eq!(shield.absorb(15.0), 0.0);
        assert_eq!(shield.absorb(15.0), 10.0);
        assert_eq!(shield.capacity(), 0.0);
        shield.simulate(0.5);
        assert_eq!(shield.capacity(), 0.0);
        shield.simulate(0.5);
        shield.simulate(1.0);
        assert!((shield.capacity() - 10.0).abs() < 1e-4);
        shield.simulate(5.0);
        assert_eq!(shield.capacity(), 20.0);
    }

    #[test]
    fn test_jump_sequence() {
        let mut engine = JumpEngine::new(jump_class());
        assert_eq!(engine.jump_out(), Some(JumpTransition::Engaged));
        assert_eq!(engine.simulate(1.5), None);
        assert_eq!(engine.simulate(0.5), Some(JumpTransition::OutStarted));
        assert_eq!(engine.state(), JumpState::JumpingOut);
        assert_eq!(engine.jump_out(), None);
        assert_eq!(engine.simulate(1.0), Some(JumpTransition::JumpedOut));
        assert_eq!(engine.state(), JumpState::Away);
        assert_eq!(engine.jump_out(), None);
        assert_eq!(engine.jump_in(), Some(JumpTransition::InStarted));
        assert_eq!(engine.simulate(1.0), Some(JumpTransition::ArrivedIn));
        assert_eq!(engine.state(), JumpState::Idle);
    }

    #[test]
    fn test_jump_cancel() {
        let mut engine = JumpEngine::new(jump_class());
        engine.jump_out();
        engine.simulate(1.0);
        assert_eq!(engine.jump_out(), Some(JumpTransition::Cancelled));
        assert_eq!(engine.state(), JumpState::Idle);
        assert_eq!(engine.simulate(5.0), None);
        assert_eq!(engine.jump_in(), None);
    }

    #[test]
    fn test_burn_need_and_clamp() {
        let propulsion = Propulsion::new(Rc::new(PropulsionClass {
            name: "p".into(),
            thrust: 200.0,
            angular_thrust: 50.0,
            score_value: 0.0,
        }));
        let need = propulsion.burn_need(100.0);
        assert_eq!(need.linear, 0.5);
        assert_eq!(need.angular, 2.0);
        let burn = ThrusterBurn {
            forward: 3.0,
            yaw: -2.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(burn.forward, 1.0);
        assert_eq!(burn.yaw, -1.0);
    }
}
