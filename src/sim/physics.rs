//! Rigid body motion for spacecraft
//!
//! Local frame: +X right, +Y forward, +Z up. Forces and torques are
//! accumulated during a tick and integrated once by [`PhysicalBody::simulate`]
//! with semi-implicit Euler. There is no drag: a craft keeps drifting until
//! its thrusters counter the motion.

use std::cell::Cell;

use glam::{Mat3, Mat4, Quat, Vec3};

#[derive(Debug, Clone)]
pub struct PhysicalBody {
    /// kg
    pub mass: f32,
    pub position: Vec3,
    pub orientation: Quat,
    /// World frame, m/s
    pub velocity: Vec3,
    /// Local frame (pitch about X, roll about Y, yaw about Z), rad/s
    pub angular_velocity: Vec3,
    /// Radius of the bounding sphere
    pub body_size: f32,
    /// Local frame force accumulated this tick
    force: Vec3,
    /// Local frame torque accumulated this tick
    torque: Vec3,
    relative_velocity: Cell<Option<Vec3>>,
    turning_matrix: Cell<Option<Mat3>>,
}

impl PhysicalBody {
    pub fn new(mass: f32, position: Vec3, orientation: Quat, body_size: f32) -> Self {
        Self {
            mass: mass.max(0.001),
            position,
            orientation: orientation.normalize(),
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            body_size,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            relative_velocity: Cell::new(None),
            turning_matrix: Cell::new(None),
        }
    }

    /// World space forward direction
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Z
    }

    /// Push along a local axis for this tick, in newtons
    pub fn add_local_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Rotational push for this tick (normalized by mass)
    pub fn add_local_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// Velocity expressed in the body's own frame, computed at most once per
    /// tick.
    pub fn relative_velocity(&self) -> Vec3 {
        if let Some(v) = self.relative_velocity.get() {
            return v;
        }
        let v = self.orientation.inverse() * self.velocity;
        self.relative_velocity.set(Some(v));
        v
    }

    /// Rotation applied over one second at the current angular velocity
    pub fn turning_matrix(&self) -> Mat3 {
        if let Some(m) = self.turning_matrix.get() {
            return m;
        }
        let m = Mat3::from_quat(Quat::from_scaled_axis(self.angular_velocity));
        self.turning_matrix.set(Some(m));
        m
    }

    /// Model matrix with the given visual scale
    pub fn scaled_orientation_matrix(&self, scale: f32) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(scale), self.orientation, self.position)
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.orientation.inverse() * (world - self.position)
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    fn invalidate(&self) {
        self.relative_velocity.set(None);
        self.turning_matrix.set(None);
    }

    /// Directly overwrite the velocity (jump sequences, respawn)
    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
        self.invalidate();
    }

    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
        self.invalidate();
    }

    /// Integrate accumulated forces over `dt` seconds and clear them
    pub fn simulate(&mut self, dt: f32) {
        let acceleration = self.orientation * (self.force / self.mass);
        self.velocity += acceleration * dt;
        self.angular_velocity += self.torque / self.mass * dt;
        self.position += self.velocity * dt;

        let rotation = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.orientation = (self.orientation * rotation).normalize();

        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
        self.invalidate();
    }
}
