//! Onboard computers
//!
//! The maneuvering computer turns pilot or AI intents into thruster burn
//! levels according to the flight mode. The targeting computer tracks the
//! selected target and the lead point weapons should aim at.

use glam::Vec3;

use super::equipment::{BurnNeed, ThrusterBurn};
use super::physics::PhysicalBody;
use super::spacecraft::SpacecraftHandle;

/// Top speed multiplier while cruising
pub const CRUISE_SPEED_FACTOR: f32 = 2.0;
/// Turn rate multiplier while cruising
pub const CRUISE_TURN_FACTOR: f32 = 0.4;
/// Strafe/lift speed relative to top speed in combat mode
pub const COMBAT_STRAFE_FACTOR: f32 = 0.5;
/// Fraction of top speed the speed target changes by per second of input
pub const SPEED_CHANGE_RATE: f32 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightMode {
    /// Thrusters fire only while commanded; the craft drifts otherwise
    Free,
    /// Holds a speed target along the nose and cancels drift and spin
    #[default]
    Combat,
    /// Faster, forward only, wide turns
    Cruise,
}

impl FlightMode {
    pub fn next(self) -> Self {
        match self {
            FlightMode::Free => FlightMode::Combat,
            FlightMode::Combat => FlightMode::Cruise,
            FlightMode::Cruise => FlightMode::Free,
        }
    }
}

/// Control intents that take an intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Maneuver {
    Forward,
    Reverse,
    StrafeLeft,
    StrafeRight,
    Raise,
    Lower,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
    RollLeft,
    RollRight,
}

#[derive(Debug, Clone)]
pub struct ManeuveringComputer {
    mode: FlightMode,
    /// m/s along the nose (combat and cruise)
    speed_target: f32,
    max_speed: f32,
    /// rad/s
    turn_rate: f32,
    // Intents for the current tick, cleared after use
    speed_change: f32,
    forward: f32,
    strafe: f32,
    lift: f32,
    yaw: f32,
    pitch: f32,
    roll: f32,
}

impl ManeuveringComputer {
    pub fn new(max_speed: f32, turn_rate_degrees: f32) -> Self {
        Self {
            mode: FlightMode::default(),
            speed_target: 0.0,
            max_speed,
            turn_rate: turn_rate_degrees.to_radians(),
            speed_change: 0.0,
            forward: 0.0,
            strafe: 0.0,
            lift: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.mode
    }

    pub fn set_flight_mode(&mut self, mode: FlightMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.speed_target = self.speed_target.clamp(self.min_speed(), self.top_speed());
    }

    pub fn speed_target(&self) -> f32 {
        self.speed_target
    }

    pub fn set_speed_target(&mut self, speed: f32) {
        self.speed_target = speed.clamp(self.min_speed(), self.top_speed());
    }

    pub fn top_speed(&self) -> f32 {
        match self.mode {
            FlightMode::Cruise => self.max_speed * CRUISE_SPEED_FACTOR,
            _ => self.max_speed,
        }
    }

    fn min_speed(&self) -> f32 {
        match self.mode {
            FlightMode::Cruise => 0.0,
            _ => -self.max_speed * 0.5,
        }
    }

    /// Register an intent for the next tick. Intensity defaults to 1.
    pub fn command(&mut self, maneuver: Maneuver, intensity: Option<f32>) {
        let i = intensity.unwrap_or(1.0).clamp(0.0, 1.0);
        match maneuver {
            Maneuver::Forward => {
                self.forward += i;
                self.speed_change += i;
            }
            Maneuver::Reverse => {
                self.forward -= i;
                self.speed_change -= i;
            }
            Maneuver::StrafeLeft => self.strafe -= i,
            Maneuver::StrafeRight => self.strafe += i,
            Maneuver::Raise => self.lift += i,
            Maneuver::Lower => self.lift -= i,
            Maneuver::YawLeft => self.yaw += i,
            Maneuver::YawRight => self.yaw -= i,
            Maneuver::PitchUp => self.pitch += i,
            Maneuver::PitchDown => self.pitch -= i,
            Maneuver::RollLeft => self.roll -= i,
            Maneuver::RollRight => self.roll += i,
        }
    }

    /// Stop all motion intents (destruction, jump sequences)
    pub fn reset(&mut self) {
        self.speed_target = 0.0;
        self.clear_intents();
    }

    fn clear_intents(&mut self) {
        self.speed_change = 0.0;
        self.forward = 0.0;
        self.strafe = 0.0;
        self.lift = 0.0;
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.roll = 0.0;
    }

    /// Burn levels for this tick; consumes the registered intents
    pub fn control_thrusters(
        &mut self,
        body: &PhysicalBody,
        need: BurnNeed,
        dt: f32,
    ) -> ThrusterBurn {
        let burn = if self.mode == FlightMode::Free {
            ThrusterBurn {
                forward: self.forward,
                strafe: self.strafe,
                lift: self.lift,
                yaw: self.yaw,
                pitch: self.pitch,
                roll: self.roll,
            }
        } else {
            let top = self.top_speed();
            let change = self.speed_change * self.max_speed * SPEED_CHANGE_RATE * dt;
            self.speed_target = (self.speed_target + change).clamp(self.min_speed(), top);

            let (side_speed, turn_rate) = match self.mode {
                FlightMode::Cruise => (0.0, self.turn_rate * CRUISE_TURN_FACTOR),
                _ => (self.max_speed * COMBAT_STRAFE_FACTOR, self.turn_rate),
            };
            let dt = dt.max(f32::EPSILON);
            let rel = body.relative_velocity();
            let spin = body.angular_velocity;
            let linear = |target: f32, current: f32| (target - current) * need.linear / dt;
            let angular =
                |input: f32, current: f32| (input * turn_rate - current) * need.angular / dt;

            ThrusterBurn {
                forward: linear(self.speed_target, rel.y),
                strafe: linear(self.strafe * side_speed, rel.x),
                lift: linear(self.lift * side_speed, rel.z),
                yaw: angular(self.yaw, spin.z),
                pitch: angular(self.pitch, spin.x),
                roll: angular(self.roll, spin.y),
            }
        };
        self.clear_intents();
        burn.clamped()
    }
}

/// What the targeting computer needs to know about its target
#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub position: Vec3,
    pub velocity: Vec3,
    pub body_size: f32,
}

#[derive(Debug, Clone, Default)]
pub struct TargetingComputer {
    target: Option<SpacecraftHandle>,
    lead_point: Option<Vec3>,
}

impl TargetingComputer {
    pub fn target(&self) -> Option<SpacecraftHandle> {
        self.target
    }

    /// Returns the previous target
    pub fn set_target(&mut self, target: Option<SpacecraftHandle>) -> Option<SpacecraftHandle> {
        self.lead_point = None;
        std::mem::replace(&mut self.target, target)
    }

    /// Where weapons should aim to hit the target, updated each tick
    pub fn lead_point(&self) -> Option<Vec3> {
        self.lead_point
    }

    /// The candidate after (or before) the current target, wrapping around
    pub fn cycle(
        &self,
        candidates: &[SpacecraftHandle],
        forward: bool,
    ) -> Option<SpacecraftHandle> {
        if candidates.is_empty() {
            return None;
        }
        let current = self.target.and_then(|t| candidates.iter().position(|c| *c == t));
        let n = candidates.len();
        let index = match (current, forward) {
            (None, true) => 0,
            (None, false) => n - 1,
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
        };
        Some(candidates[index])
    }

    pub fn update(
        &mut self,
        body: &PhysicalBody,
        target: Option<&TargetInfo>,
        projectile_speed: Option<f32>,
    ) {
        self.lead_point = target.map(|t| match projectile_speed {
            Some(speed) => intercept_point(body.position, body.velocity, t, speed),
            None => t.position,
        });
    }
}

/// Aim point for a projectile fired at `speed` (inheriting the shooter's
/// velocity) to meet a target moving in a straight line. Falls back to the
/// target's position when no intercept exists.
pub fn intercept_point(
    origin: Vec3,
    origin_velocity: Vec3,
    target: &TargetInfo,
    speed: f32,
) -> Vec3 {
    let offset = target.position - origin;
    let rel_velocity = target.velocity - origin_velocity;
    let a = rel_velocity.length_squared() - speed * speed;
    let b = 2.0 * offset.dot(rel_velocity);
    let c = offset.length_squared();

    let time = if a.abs() < 1e-6 {
        if b.abs() < 1e-6 { None } else { Some(-c / b) }
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            None
        } else {
            let sqrt = disc.sqrt();
            let t1 = (-b - sqrt) / (2.0 * a);
            let t2 = (-b + sqrt) / (2.0 * a);
            [t1, t2]
                .into_iter()
                .filter(|t| *t > 0.0)
                .min_by(|x, y| x.total_cmp(y))
        }
    };

    match time {
        Some(t) if t > 0.0 => target.position + rel_velocity * t,
        _ => target.position,
    }
}
