//! Control commands and the AI hook
//!
//! The UI and AI modules steer spacecraft through the same [`Command`]s.
//! AI modules implement [`Controller`]: once per tick they receive a
//! read-only view of their craft and its surroundings and answer with
//! commands, which the mission applies before the craft is simulated.

use std::f32::consts::FRAC_PI_4;

use glam::{Quat, Vec3};

use super::computers::{FlightMode, Maneuver};
use super::spacecraft::SpacecraftHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetCommand {
    NextHostile,
    PreviousHostile,
    /// Closest hostile
    BestHostile,
    NextNonHostile,
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Control(Maneuver, Option<f32>),
    SpeedTarget(f32),
    FlightMode(FlightMode),
    ToggleFlightMode,
    Target(TargetCommand),
    Fire { only_if_aimed_or_fixed: bool },
    JumpOut,
    JumpIn,
    ToggleHitbox,
}

/// Snapshot of a craft as seen by a controller
#[derive(Debug, Clone)]
pub struct CraftView {
    pub handle: SpacecraftHandle,
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    pub body_size: f32,
    pub hull_integrity: f32,
    /// Hostile to the controlled craft
    pub hostile: bool,
}

pub struct ControlContext<'a> {
    pub own: &'a CraftView,
    pub target: Option<&'a CraftView>,
    pub lead_point: Option<Vec3>,
    /// Every other active craft in the scene
    pub others: &'a [CraftView],
    pub max_speed: f32,
    /// How far the primary weapon reaches, 0 when unarmed
    pub weapon_range: f32,
}

pub trait Controller {
    fn control(&mut self, ctx: &ControlContext<'_>, dt: f32) -> Vec<Command>;
}

/// Basic dogfighting: pick the closest hostile, turn toward the lead
/// point, close in and fire when lined up.
#[derive(Debug, Clone)]
pub struct PursuitController {
    /// Radians off the nose within which fixed guns fire
    pub fire_angle: f32,
    /// Seconds between retargeting checks
    pub retarget_interval: f32,
    since_retarget: f32,
}

impl Default for PursuitController {
    fn default() -> Self {
        Self {
            fire_angle: 5f32.to_radians(),
            retarget_interval: 2.0,
            since_retarget: 0.0,
        }
    }
}

impl Controller for PursuitController {
    fn control(&mut self, ctx: &ControlContext<'_>, dt: f32) -> Vec<Command> {
        self.since_retarget += dt;
        let Some(target) = ctx.target else {
            self.since_retarget = 0.0;
            return if ctx.others.iter().any(|c| c.hostile) {
                vec![Command::Target(TargetCommand::BestHostile)]
            } else {
                vec![Command::SpeedTarget(0.0)]
            };
        };

        let mut commands = Vec::new();
        if self.since_retarget >= self.retarget_interval {
            self.since_retarget = 0.0;
            commands.push(Command::Target(TargetCommand::BestHostile));
        }

        let aim = ctx.lead_point.unwrap_or(target.position);
        let local = ctx.own.orientation.inverse() * (aim - ctx.own.position);
        let distance = local.length();
        let Some(dir) = local.try_normalize() else {
            return commands;
        };

        let yaw = (-dir.x).atan2(dir.y);
        let pitch = dir.z.atan2(dir.x.hypot(dir.y));
        let intensity = |angle: f32| Some((angle.abs() / FRAC_PI_4).min(1.0));
        if yaw.abs() > 1e-3 {
            let maneuver = if yaw > 0.0 {
                Maneuver::YawLeft
            } else {
                Maneuver::YawRight
            };
            commands.push(Command::Control(maneuver, intensity(yaw)));
        }
        if pitch.abs() > 1e-3 {
            let maneuver = if pitch > 0.0 {
                Maneuver::PitchUp
            } else {
                Maneuver::PitchDown
            };
            commands.push(Command::Control(maneuver, intensity(pitch)));
        }

        let in_range = distance < ctx.weapon_range;
        let speed = if in_range {
            ctx.max_speed * 0.5
        } else {
            ctx.max_speed
        };
        commands.push(Command::SpeedTarget(speed));

        if in_range && dir.angle_between(Vec3::Y) <= self.fire_angle {
            commands.push(Command::Fire {
                only_if_aimed_or_fixed: true,
            });
        }
        commands
    }
}

/// Controller for an AI type named in mission data
pub fn controller_for(kind: &str) -> Option<Box<dyn Controller>> {
    match kind {
        "fighter" | "pursuit" => Some(Box::new(PursuitController::default())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::arena::Handle;

    fn view(index: u32, position: Vec3, hostile: bool) -> CraftView {
        CraftView {
            handle: Handle::from_raw(index, 0),
            position,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            body_size: 5.0,
            hull_integrity: 1.0,
            hostile,
        }
    }

    #[test]
    fn test_requests_target_when_hostiles_present() {
        let own = view(0, Vec3::ZERO, false);
        let others = vec![view(1, Vec3::new(0.0, 100.0, 0.0), true)];
        let ctx = ControlContext {
            own: &own,
            target: None,
            lead_point: None,
            others: &others,
            max_speed: 100.0,
            weapon_range: 500.0,
        };
        let mut ai = PursuitController::default();
        assert_eq!(
            ai.control(&ctx, 0.1),
            vec![Command::Target(TargetCommand::BestHostile)]
        );
    }

    #[test]
    fn test_turns_toward_and_fires_at_target() {
        let own = view(0, Vec3::ZERO, false);
        let ahead = view(1, Vec3::new(0.0, 100.0, 0.0), true);
        let left = view(2, Vec3::new(-100.0, 10.0, 0.0), true);
        let others = vec![ahead.clone(), left.clone()];
        let mut ai = PursuitController::default();

        let ctx = ControlContext {
            own: &own,
            target: Some(&ahead),
            lead_point: None,
            others: &others,
            max_speed: 100.0,
            weapon_range: 500.0,
        };
        let commands = ai.control(&ctx, 0.1);
        assert!(commands.contains(&Command::Fire {
            only_if_aimed_or_fixed: true
        }));
        assert!(commands.contains(&Command::SpeedTarget(50.0)));

        let ctx = ControlContext {
            target: Some(&left),
            ..ctx
        };
        let commands = ai.control(&ctx, 0.1);
        assert!(commands.contains(&Command::Control(Maneuver::YawLeft, Some(1.0))));
        assert!(!commands.iter().any(|c| matches!(c, Command::Fire { .. })));
    }

    #[test]
    fn test_unknown_ai_type() {
        assert!(controller_for("fighter").is_some());
        assert!(controller_for("kamikaze").is_none());
    }
}
