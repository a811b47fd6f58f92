//! Spacecraft entity
//!
//! Two independent state machines drive a craft: alive → destroying → dead
//! (hitpoints), and present ↔ away (jump engine). While destroying, the wreck
//! keeps drifting until its explosion has played out; only then do the
//! `Destructed` listeners decide whether the entity is freed or kept for a
//! respawn.

use std::fmt;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::arena::Handle;
use super::classes::{EquipmentProfile, ExplosionClass, SpacecraftClass};
use super::collision::{Aabb, segment_aabb_intersection};
use super::computers::{
    FlightMode, Maneuver, ManeuveringComputer, TargetInfo, TargetingComputer,
};
use super::equipment::{
    BurnNeed, JumpEngine, JumpState, JumpTransition, ProjectileSpawn, Propulsion, Shield, Weapon,
};
use super::events::{EventHandler, EventHandlers, EventKind, SpacecraftEvent};
use super::physics::PhysicalBody;

pub type SpacecraftHandle = Handle<Spacecraft>;

/// Squad membership, written "alpha 2" in mission data
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Squad {
    pub name: String,
    pub index: u32,
}

impl Squad {
    pub fn parse(text: &str) -> Option<Self> {
        let (name, index) = text.trim().rsplit_once(' ')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            index: index.parse().ok()?,
        })
    }
}

impl fmt::Display for Squad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeState {
    Alive,
    /// Explosion playing; seconds left until dead
    Destroying { remaining: f32 },
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CombatStats {
    pub kills: u32,
    pub score: f32,
    /// Hitpoints actually removed from other craft
    pub damage_dealt: f32,
    pub shots_fired: u32,
    pub hits: u32,
}

impl CombatStats {
    pub fn hit_ratio(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.hits as f32 / self.shots_fired as f32
        }
    }
}

/// An explosion the mission should spawn particles for
#[derive(Debug, Clone)]
pub struct ExplosionSpawn {
    pub class: Rc<ExplosionClass>,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Result of [`Spacecraft::damage`], used to credit the attacker
#[derive(Debug, Clone, Default)]
pub struct DamageOutcome {
    /// Hitpoints removed (after shield and armor, clamped at overkill)
    pub applied: f32,
    pub shield_absorbed: f32,
    pub killed: bool,
    /// Score the attacker earns if the victim is hostile to it
    pub score: f32,
    pub explosions: Vec<ExplosionSpawn>,
}

#[derive(Debug)]
pub struct Spacecraft {
    id: String,
    class: Rc<SpacecraftClass>,
    team: Option<String>,
    squad: Option<Squad>,
    piloted: bool,
    hitpoints: f32,
    life: LifeState,
    /// Only meaningful once dead: the `Destructed` listeners let it go
    reusable: bool,
    away: bool,
    body: PhysicalBody,
    /// Set once the model resource is ready
    model_scale: Option<f32>,
    profile_name: Option<String>,
    weapons: Vec<Weapon>,
    propulsion: Option<Propulsion>,
    shield: Option<Shield>,
    jump_engine: Option<JumpEngine>,
    targeting: TargetingComputer,
    maneuvering: ManeuveringComputer,
    targeted_by: Vec<SpacecraftHandle>,
    stats: CombatStats,
    score_value: f32,
    burn_need: Option<BurnNeed>,
    indicators_shown: Vec<bool>,
    blink_time: f32,
    show_hitbox: bool,
    handlers: EventHandlers,
}

impl Spacecraft {
    pub fn new(
        id: impl Into<String>,
        class: Rc<SpacecraftClass>,
        position: Vec3,
        orientation: Quat,
    ) -> Self {
        let body = PhysicalBody::new(class.mass, position, orientation, class.body_size);
        let maneuvering = ManeuveringComputer::new(class.max_speed, class.turn_rate);
        let mut craft = Self {
            id: id.into(),
            team: None,
            squad: None,
            piloted: false,
            hitpoints: class.hitpoints,
            life: LifeState::Alive,
            reusable: false,
            away: false,
            body,
            model_scale: None,
            profile_name: None,
            weapons: Vec::new(),
            propulsion: None,
            shield: None,
            jump_engine: None,
            targeting: TargetingComputer::default(),
            maneuvering,
            targeted_by: Vec::new(),
            stats: CombatStats::default(),
            score_value: 0.0,
            burn_need: None,
            indicators_shown: vec![false; class.damage_indicators.len()],
            blink_time: 0.0,
            show_hitbox: false,
            handlers: EventHandlers::default(),
            class,
        };
        craft.update_cached_values();
        craft
    }

    pub fn with_team(mut self, team: Option<String>) -> Self {
        self.team = team;
        self
    }

    pub fn with_squad(mut self, squad: Option<Squad>) -> Self {
        self.squad = squad;
        self
    }

    pub fn with_piloted(mut self, piloted: bool) -> Self {
        self.piloted = piloted;
        self
    }

    // --- identity and state -------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class(&self) -> &Rc<SpacecraftClass> {
        &self.class
    }

    pub fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    pub fn squad(&self) -> Option<&Squad> {
        self.squad.as_ref()
    }

    pub fn is_piloted(&self) -> bool {
        self.piloted
    }

    pub fn set_piloted(&mut self, piloted: bool) {
        self.piloted = piloted;
    }

    /// Teamless craft are hostile to everyone
    pub fn is_hostile_to(&self, other: &Spacecraft) -> bool {
        match (&self.team, &other.team) {
            (Some(a), Some(b)) => a != b,
            _ => true,
        }
    }

    pub fn hitpoints(&self) -> f32 {
        self.hitpoints
    }

    pub fn max_hitpoints(&self) -> f32 {
        self.class.hitpoints
    }

    /// Remaining hitpoints as a fraction of the maximum
    pub fn hull_integrity(&self) -> f32 {
        self.hitpoints / self.class.hitpoints
    }

    pub fn life_state(&self) -> LifeState {
        self.life
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_destroying(&self) -> bool {
        matches!(self.life, LifeState::Destroying { .. })
    }

    pub fn is_dead(&self) -> bool {
        self.life == LifeState::Dead
    }

    /// Dead and released by its `Destructed` listeners
    pub fn is_reusable(&self) -> bool {
        self.is_dead() && self.reusable
    }

    pub fn is_away(&self) -> bool {
        self.away
    }

    /// Alive and in the scene
    pub fn is_active(&self) -> bool {
        self.is_alive() && !self.away
    }

    pub fn body(&self) -> &PhysicalBody {
        &self.body
    }

    pub fn position(&self) -> Vec3 {
        self.body.position
    }

    /// Teleport (mission setup, respawn)
    pub fn set_position(&mut self, position: Vec3) {
        self.body.position = position;
    }

    pub fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    pub fn orientation(&self) -> Quat {
        self.body.orientation
    }

    pub fn target_info(&self) -> TargetInfo {
        TargetInfo {
            position: self.body.position,
            velocity: self.body.velocity,
            body_size: self.body.body_size,
        }
    }

    pub fn stats(&self) -> &CombatStats {
        &self.stats
    }

    /// Score for destroying this craft with its current loadout
    pub fn score_value(&self) -> f32 {
        self.score_value
    }

    pub fn burn_need(&self) -> Option<BurnNeed> {
        self.burn_need
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn shield(&self) -> Option<&Shield> {
        self.shield.as_ref()
    }

    pub fn propulsion(&self) -> Option<&Propulsion> {
        self.propulsion.as_ref()
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile_name.as_deref()
    }

    pub fn jump_state(&self) -> Option<JumpState> {
        self.jump_engine.as_ref().map(JumpEngine::state)
    }

    fn is_jumping(&self) -> bool {
        matches!(
            self.jump_state(),
            Some(JumpState::JumpingOut | JumpState::JumpingIn)
        )
    }

    // --- rendering-facing state ---------------------------------------------

    pub fn model_scale(&self) -> Option<f32> {
        self.model_scale
    }

    /// Applied when the model resource finished loading
    pub fn apply_model_scale(&mut self, scale: f32) {
        self.model_scale = Some(scale);
    }

    /// Model matrix, once the model's scale is known
    pub fn model_matrix(&self) -> Option<Mat4> {
        self.model_scale
            .map(|scale| self.body.scaled_orientation_matrix(scale))
    }

    pub fn is_hitbox_visible(&self) -> bool {
        self.show_hitbox
    }

    pub fn toggle_hitbox_visibility(&mut self) {
        self.show_hitbox = !self.show_hitbox;
    }

    /// World positions of the navigation lights lit right now
    pub fn lit_blinkers(&self) -> Vec<Vec3> {
        if !self.is_active() {
            return Vec::new();
        }
        self.class
            .blinkers
            .iter()
            .filter(|blinker| {
                let phase = self.blink_time % blinker.period.max(f32::EPSILON);
                blinker
                    .blinks
                    .iter()
                    .any(|&start| phase >= start && phase < start + blinker.blink_length)
            })
            .map(|blinker| self.body.to_world(blinker.position))
            .collect()
    }

    // --- events ---------------------------------------------------------------

    pub fn add_event_handler(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.add(kind, handler);
    }

    /// Dispatch to this craft's listeners; see [`EventHandlers::dispatch`]
    /// for the aggregation rule
    pub fn handle_event(&mut self, event: &SpacecraftEvent) -> bool {
        self.handlers.dispatch(event)
    }

    // --- equipment --------------------------------------------------------------

    pub fn equip_profile(&mut self, profile: &EquipmentProfile) {
        self.unequip();
        let slots = &self.class.weapon_slots;
        if profile.weapons.len() > slots.len() {
            log::warn!(
                "{}: profile '{}' has {} weapons for {} slots, extra weapons ignored",
                self.id,
                profile.name,
                profile.weapons.len(),
                slots.len()
            );
        }
        self.weapons = slots
            .iter()
            .zip(&profile.weapons)
            .map(|(slot, class)| Weapon::new(class.clone(), slot.position))
            .collect();
        self.propulsion = profile.propulsion.clone().map(Propulsion::new);
        self.shield = profile.shield.clone().map(Shield::new);
        self.jump_engine = profile.jump_engine.clone().map(|class| {
            let mut engine = JumpEngine::new(class);
            if self.away {
                engine.set_away();
            }
            engine
        });
        self.profile_name = Some(profile.name.clone());
        self.update_cached_values();
    }

    pub fn unequip(&mut self) {
        self.weapons.clear();
        self.propulsion = None;
        self.shield = None;
        self.jump_engine = None;
        self.profile_name = None;
        self.update_cached_values();
    }

    fn update_cached_values(&mut self) {
        self.score_value = self.class.score_value
            + self
                .weapons
                .iter()
                .map(|w| w.class().score_value)
                .sum::<f32>()
            + self.propulsion.as_ref().map_or(0.0, |p| p.class().score_value)
            + self.shield.as_ref().map_or(0.0, |s| s.class().score_value)
            + self.jump_engine.as_ref().map_or(0.0, |j| j.class().score_value);
        self.burn_need = self
            .propulsion
            .as_ref()
            .map(|p| p.burn_need(self.class.mass));
    }

    // --- controls -----------------------------------------------------------------

    pub fn flight_mode(&self) -> FlightMode {
        self.maneuvering.flight_mode()
    }

    pub fn set_flight_mode(&mut self, mode: FlightMode) {
        self.maneuvering.set_flight_mode(mode);
    }

    pub fn toggle_flight_mode(&mut self) {
        let next = self.maneuvering.flight_mode().next();
        self.maneuvering.set_flight_mode(next);
    }

    pub fn control(&mut self, maneuver: Maneuver, intensity: Option<f32>) {
        self.maneuvering.command(maneuver, intensity);
    }

    pub fn speed_target(&self) -> f32 {
        self.maneuvering.speed_target()
    }

    pub fn set_speed_target(&mut self, speed: f32) {
        self.maneuvering.set_speed_target(speed);
    }

    pub fn target(&self) -> Option<SpacecraftHandle> {
        self.targeting.target()
    }

    pub fn targeting(&self) -> &TargetingComputer {
        &self.targeting
    }

    /// Switch target; returns the previous one. Bookkeeping on the targeted
    /// craft is the caller's job (it lives in another arena slot).
    pub fn set_target(&mut self, target: Option<SpacecraftHandle>) -> Option<SpacecraftHandle> {
        let previous = self.targeting.set_target(target);
        if previous != target {
            self.handlers
                .dispatch(&SpacecraftEvent::TargetSwitched { target });
        }
        previous
    }

    pub fn targeted_by(&self) -> &[SpacecraftHandle] {
        &self.targeted_by
    }

    pub fn add_targeter(&mut self, by: SpacecraftHandle) {
        if !self.targeted_by.contains(&by) {
            self.targeted_by.push(by);
            self.handlers
                .dispatch(&SpacecraftEvent::BeingTargeted { by });
        }
    }

    pub fn remove_targeter(&mut self, by: SpacecraftHandle) {
        self.targeted_by.retain(|h| *h != by);
    }

    /// Fire every weapon that is ready. With `only_if_aimed_or_fixed`, turrets
    /// that are not on target hold their fire.
    pub fn fire(&mut self, only_if_aimed_or_fixed: bool) -> Vec<ProjectileSpawn> {
        if !self.is_active() || self.is_jumping() {
            return Vec::new();
        }
        let mut spawns = Vec::new();
        for weapon in &mut self.weapons {
            spawns.extend(weapon.fire(&self.body, only_if_aimed_or_fixed));
        }
        let shots = spawns.len() as u32;
        if shots > 0 {
            self.stats.shots_fired += shots;
            self.handlers.dispatch(&SpacecraftEvent::Fired { shots });
        }
        spawns
    }

    /// Start the jump-out sequence, or cancel it while still preparing
    pub fn jump_out(&mut self) {
        if !self.is_alive() {
            log::warn!("{}: cannot jump out while destroyed", self.id);
            return;
        }
        if self.away {
            log::warn!("{}: cannot jump out, already away", self.id);
            return;
        }
        let Some(engine) = &mut self.jump_engine else {
            log::warn!("{}: cannot jump out without a jump engine", self.id);
            return;
        };
        match engine.jump_out() {
            Some(JumpTransition::Engaged) => {
                self.handlers.dispatch(&SpacecraftEvent::JumpEngaged);
            }
            Some(JumpTransition::Cancelled) => {
                self.handlers.dispatch(&SpacecraftEvent::JumpCancelled);
            }
            _ => {}
        }
    }

    /// Return to the scene. Craft without a jump engine arrive instantly.
    pub fn jump_in(&mut self) {
        if !self.away {
            log::warn!("{}: cannot jump in, not away", self.id);
            return;
        }
        self.away = false;
        match &mut self.jump_engine {
            Some(engine) => {
                if engine.jump_in().is_some() {
                    let speed = engine.class().jump_in_velocity;
                    let forward = self.body.forward();
                    self.body.set_velocity(forward * speed);
                }
            }
            None => {
                self.handlers.dispatch(&SpacecraftEvent::ArrivedIn);
            }
        }
    }

    /// Start outside the scene without running the jump sequence
    pub fn set_away(&mut self) {
        self.away = true;
        self.body.stop();
        if let Some(engine) = &mut self.jump_engine {
            engine.set_away();
        }
    }

    // --- damage -----------------------------------------------------------------

    /// Apply a hit: the shield absorbs first, then armor takes a flat amount
    /// off, the rest comes off the hitpoints.
    ///
    /// A hit that brings the hitpoints to zero starts the destruction
    /// sequence and carries the final-blow share of the score; other hits
    /// carry score in proportion to the hitpoints removed.
    pub fn damage(
        &mut self,
        amount: f32,
        position: Vec3,
        direction: Vec3,
        by: Option<SpacecraftHandle>,
        final_blow_share: f32,
    ) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::default();
        }
        let share = final_blow_share.clamp(0.0, 1.0);
        let mut outcome = DamageOutcome::default();

        let mut remaining = amount.max(0.0);
        if let Some(shield) = &mut self.shield {
            let through = shield.absorb(remaining);
            outcome.shield_absorbed = remaining - through;
            remaining = through;
        }
        let after_armor = (remaining - self.class.armor).max(0.0);
        let applied = after_armor.min(self.hitpoints);
        let before = self.hitpoints;
        self.hitpoints -= applied;
        outcome.applied = applied;
        outcome.score = applied / self.class.hitpoints * self.score_value * (1.0 - share);

        log::debug!(
            "{} hit for {:.1} ({:.1} applied), {:.1} hp left",
            self.id,
            amount,
            applied,
            self.hitpoints
        );
        self.handlers.dispatch(&SpacecraftEvent::BeingHit {
            by,
            damage: applied,
            position,
        });

        if before > 0.0 && self.hitpoints <= 0.0 {
            self.hitpoints = 0.0;
            outcome.killed = true;
            outcome.score += self.score_value * share;
            if let Some(explosion) = self.class.explosion.clone() {
                outcome.explosions.push(ExplosionSpawn {
                    class: explosion,
                    position: self.body.position,
                    velocity: self.body.velocity,
                });
            }
            self.start_destruction();
        } else {
            let integrity = self.hull_integrity() * 100.0;
            let class = self.class.clone();
            for (i, indicator) in class.damage_indicators.iter().enumerate() {
                if self.indicators_shown[i] || integrity >= indicator.hull_integrity {
                    continue;
                }
                self.indicators_shown[i] = true;
                outcome.explosions.push(ExplosionSpawn {
                    class: indicator.explosion.clone(),
                    position: self.body.to_world(indicator.position),
                    velocity: self.body.velocity - direction.normalize_or_zero(),
                });
                self.handlers
                    .dispatch(&SpacecraftEvent::DamageIndicatorShown {
                        hull_integrity: indicator.hull_integrity,
                    });
            }
        }
        outcome
    }

    fn start_destruction(&mut self) {
        log::info!("{} destroyed", self.id);
        self.life = LifeState::Destroying {
            remaining: self.class.destruction_duration(),
        };
        self.maneuvering.reset();
        if let Some(propulsion) = &mut self.propulsion {
            propulsion.reset_burn();
        }
        if let Some(engine) = &mut self.jump_engine {
            engine.reset();
        }
    }

    /// Credit this craft for a hit it dealt
    pub fn credit(&mut self, outcome: &DamageOutcome, hostile: bool) {
        self.stats.damage_dealt += outcome.applied;
        self.stats.hits += 1;
        if hostile {
            self.stats.score += outcome.score;
        }
        if outcome.killed {
            self.stats.kills += 1;
        }
    }

    /// Swept test of a projectile path (radius `radius`) against the
    /// hitboxes. Returns the world position of the first contact.
    pub fn hit_test(&self, start: Vec3, end: Vec3, radius: f32) -> Option<Vec3> {
        if !self.is_active() {
            return None;
        }
        let bound = Aabb::around(self.body.position, self.body.body_size + radius);
        segment_aabb_intersection(start, end, &bound)?;

        let local_start = self.body.to_local(start);
        let local_end = self.body.to_local(end);
        let pad = Vec3::splat(radius);
        let size = self.body.body_size;
        let fallback = [Aabb::around(Vec3::ZERO, size)];
        let boxes = if self.class.hitboxes.is_empty() {
            &fallback[..]
        } else {
            &self.class.hitboxes[..]
        };
        boxes
            .iter()
            .filter_map(|hitbox| {
                let padded = Aabb::new(hitbox.min - pad, hitbox.max + pad);
                segment_aabb_intersection(local_start, local_end, &padded)
            })
            .min_by(|a, b| a.t.total_cmp(&b.t))
            .map(|hit| start.lerp(end, hit.t))
    }

    /// Reset to full health in place, keeping identity and loadout
    pub fn respawn(&mut self) {
        self.hitpoints = self.class.hitpoints;
        self.life = LifeState::Alive;
        self.reusable = false;
        self.away = false;
        self.indicators_shown.iter_mut().for_each(|s| *s = false);
        self.body.stop();
        self.maneuvering.reset();
        for weapon in &mut self.weapons {
            weapon.reset();
        }
        if let Some(shield) = &mut self.shield {
            shield.reset();
        }
        if let Some(engine) = &mut self.jump_engine {
            engine.reset();
        }
        log::debug!("{} respawned", self.id);
    }

    // --- simulation ---------------------------------------------------------------

    /// Advance one tick. Alive, present craft run their computers, equipment
    /// and body; wrecks drift until their explosion ends.
    pub fn simulate(&mut self, dt: f32, target: Option<&TargetInfo>, aim_tolerance: f32) {
        match self.life {
            LifeState::Dead => return,
            LifeState::Destroying { remaining } => {
                self.body.simulate(dt);
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.life = LifeState::Destroying { remaining };
                } else {
                    self.life = LifeState::Dead;
                    self.reusable = self.handlers.dispatch(&SpacecraftEvent::Destructed);
                    log::debug!(
                        "{} destruction finished (reusable: {})",
                        self.id,
                        self.reusable
                    );
                }
                return;
            }
            LifeState::Alive => {}
        }
        if self.away {
            return;
        }

        let projectile_speed = self
            .weapons
            .first()
            .map(|w| w.class().projectile_velocity);
        self.targeting.update(&self.body, target, projectile_speed);

        let aim_point = self.targeting.lead_point().map(|p| self.body.to_local(p));
        for weapon in &mut self.weapons {
            weapon.simulate(dt);
            match aim_point {
                Some(point) => {
                    weapon.aim(point - weapon.slot(), dt, aim_tolerance);
                }
                None => weapon.reset_aim(dt),
            }
        }

        let steering = matches!(
            self.jump_state(),
            None | Some(JumpState::Idle | JumpState::Preparing)
        );
        if let (Some(propulsion), Some(need)) = (&mut self.propulsion, self.burn_need) {
            if steering {
                let burn = self.maneuvering.control_thrusters(&self.body, need, dt);
                propulsion.set_burn(burn);
                propulsion.simulate(&mut self.body);
            } else {
                propulsion.reset_burn();
            }
        }

        self.simulate_jump(dt);
        if self.away {
            return;
        }

        if let Some(shield) = &mut self.shield {
            shield.simulate(dt);
        }
        self.blink_time += dt;
        self.body.simulate(dt);
    }

    fn simulate_jump(&mut self, dt: f32) {
        let Some(engine) = &mut self.jump_engine else {
            return;
        };
        let transition = engine.simulate(dt);
        let class = engine.class().clone();
        let (state, timer) = (engine.state(), engine.timer());

        let forward = self.body.forward();
        match state {
            JumpState::JumpingOut => {
                let velocity = self.body.velocity + forward * class.jump_out_acceleration * dt;
                self.body.set_velocity(velocity);
            }
            JumpState::JumpingIn if class.jump_in_duration > 0.0 => {
                let factor = timer / class.jump_in_duration;
                self.body.set_velocity(forward * class.jump_in_velocity * factor);
            }
            _ => {}
        }

        let event = match transition {
            Some(JumpTransition::OutStarted) => Some(SpacecraftEvent::JumpOutStarted),
            Some(JumpTransition::JumpedOut) => {
                log::info!("{} jumped out", self.id);
                self.away = true;
                self.body.stop();
                self.maneuvering.reset();
                Some(SpacecraftEvent::JumpedOut)
            }
            Some(JumpTransition::ArrivedIn) => {
                self.body.set_velocity(Vec3::ZERO);
                Some(SpacecraftEvent::ArrivedIn)
            }
            _ => None,
        };
        if let Some(event) = event {
            self.handlers.dispatch(&event);
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::sim::classes::{
        DamageIndicatorClass, ExplosionClass, JumpEngineClass, ProjectileClass, PropulsionClass,
        ShieldClass, WeaponClass, WeaponSlot,
    };
    use std::collections::HashMap;

    pub fn explosion(duration: f32) -> Rc<ExplosionClass> {
        Rc::new(ExplosionClass {
            name: "boom".into(),
            duration,
            particle_count: 4,
            particle_speed: 10.0,
            particle_size: 1.0,
        })
    }

    pub fn cannon(damage: f32) -> Rc<WeaponClass> {
        Rc::new(WeaponClass {
            name: "cannon".into(),
            projectile: Rc::new(ProjectileClass {
                name: "bolt".into(),
                size: 0.2,
                mass: 1.0,
                damage,
                duration: 2.0,
                explosion: None,
            }),
            cooldown: 0.25,
            projectile_velocity: 400.0,
            barrels: vec![Vec3::ZERO],
            rotation: None,
            score_value: 5.0,
        })
    }

    pub fn profile(damage: f32) -> EquipmentProfile {
        EquipmentProfile {
            name: "default".into(),
            weapons: vec![cannon(damage)],
            propulsion: Some(Rc::new(PropulsionClass {
                name: "engine".into(),
                thrust: 2000.0,
                angular_thrust: 400.0,
                score_value: 5.0,
            })),
            shield: None,
            jump_engine: Some(Rc::new(JumpEngineClass {
                name: "jump".into(),
                prepare_duration: 1.0,
                jump_out_duration: 0.5,
                jump_out_acceleration: 500.0,
                jump_in_duration: 0.5,
                jump_in_velocity: 300.0,
                score_value: 0.0,
            })),
        }
    }

    pub fn class(hitpoints: f32, armor: f32) -> Rc<SpacecraftClass> {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), Rc::new(profile(10.0)));
        Rc::new(SpacecraftClass {
            name: "test".into(),
            kind: "fighter".into(),
            model: "test.egm".into(),
            model_scale: 2.0,
            hitpoints,
            armor,
            mass: 100.0,
            body_size: 5.0,
            max_speed: 100.0,
            turn_rate: 90.0,
            hitboxes: vec![Aabb::new(Vec3::new(-2.0, -4.0, -1.0), Vec3::new(2.0, 4.0, 1.0))],
            weapon_slots: vec![WeaponSlot {
                position: Vec3::new(0.0, 4.0, 0.0),
            }],
            explosion: Some(explosion(1.0)),
            damage_indicators: vec![DamageIndicatorClass {
                hull_integrity: 50.0,
                position: Vec3::ZERO,
                explosion: explosion(3.0),
            }],
            blinkers: Vec::new(),
            score_value: 100.0,
            equipment_profiles: profiles,
        })
    }

    pub fn shield(capacity: f32) -> Rc<ShieldClass> {
        Rc::new(ShieldClass {
            name: "shield".into(),
            capacity,
            recharge_delay: 1.0,
            recharge_rate: 5.0,
            score_value: 0.0,
        })
    }

    pub fn craft(id: &str, hitpoints: f32, armor: f32) -> Spacecraft {
        Spacecraft::new(id, class(hitpoints, armor), Vec3::ZERO, Quat::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::sim::classes::BlinkerClass;
    use proptest::prelude::*;
    use std::cell::Cell;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_squad_parse() {
        let squad = Squad::parse("alpha 2").unwrap();
        assert_eq!(squad.name, "alpha");
        assert_eq!(squad.index, 2);
        assert_eq!(squad.to_string(), "alpha 2");
        assert_eq!(Squad::parse("red leader 1").unwrap().name, "red leader");
        assert!(Squad::parse("alpha").is_none());
        assert!(Squad::parse("alpha x").is_none());
    }

    #[test]
    fn test_armor_reduces_damage() {
        let mut craft = craft("a", 100.0, 5.0);
        let outcome = craft.damage(12.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert_eq!(outcome.applied, 7.0);
        assert_eq!(craft.hitpoints(), 93.0);
        // armor absorbs weak hits entirely
        let outcome = craft.damage(4.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert_eq!(outcome.applied, 0.0);
        assert_eq!(craft.hitpoints(), 93.0);
    }

    #[test]
    fn test_shield_absorbs_before_armor() {
        let mut craft = craft("a", 100.0, 5.0);
        let mut profile = profile(10.0);
        profile.shield = Some(shield(10.0));
        craft.equip_profile(&profile);

        let outcome = craft.damage(12.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert_eq!(outcome.shield_absorbed, 10.0);
        // 2 left after the shield, all taken by armor
        assert_eq!(outcome.applied, 0.0);
        let outcome = craft.damage(12.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert_eq!(outcome.applied, 7.0);
    }

    #[test]
    fn test_lethal_hit_and_score_split() {
        let mut craft = craft("a", 50.0, 0.0);
        craft.unequip();
        assert_eq!(craft.score_value(), 100.0);

        let first = craft.damage(25.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert!(!first.killed);
        assert!((first.score - 40.0).abs() < 1e-4);

        let second = craft.damage(100.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert!(second.killed);
        assert_eq!(second.applied, 25.0);
        // 40 for the damage plus the 20 final-blow bonus
        assert!((second.score - 60.0).abs() < 1e-4);
        assert_eq!(second.explosions.len(), 1);
        assert_eq!(craft.hitpoints(), 0.0);
        assert!(craft.is_destroying());

        // no second kill for hitting a wreck
        let third = craft.damage(100.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        assert!(!third.killed);
        assert_eq!(third.applied, 0.0);
    }

    #[test]
    fn test_damage_indicator_once() {
        let shown = Rc::new(Cell::new(0));
        let mut craft = craft("a", 100.0, 0.0);
        let s = shown.clone();
        craft.add_event_handler(
            EventKind::DamageIndicatorShown,
            Box::new(move |_: &SpacecraftEvent| {
                s.set(s.get() + 1);
                true
            }),
        );
        assert!(craft.damage(40.0, Vec3::ZERO, Vec3::Y, None, 0.2).explosions.is_empty());
        assert_eq!(craft.damage(20.0, Vec3::ZERO, Vec3::Y, None, 0.2).explosions.len(), 1);
        assert!(craft.damage(10.0, Vec3::ZERO, Vec3::Y, None, 0.2).explosions.is_empty());
        assert_eq!(shown.get(), 1);
    }

    #[test]
    fn test_destruction_sequence_and_veto() {
        let mut freed = craft("a", 10.0, 0.0);
        freed.damage(20.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        freed.simulate(0.5, None, 0.1);
        assert!(freed.is_destroying());
        freed.simulate(0.6, None, 0.1);
        assert!(freed.is_dead());
        assert!(freed.is_reusable());

        let mut kept = craft("b", 10.0, 0.0);
        kept.add_event_handler(EventKind::Destructed, Box::new(|_: &SpacecraftEvent| false));
        kept.damage(20.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        kept.simulate(2.0, None, 0.1);
        assert!(kept.is_dead());
        assert!(!kept.is_reusable());

        kept.respawn();
        assert!(kept.is_alive());
        assert_eq!(kept.hitpoints(), 10.0);
    }

    #[test]
    fn test_credit_counts_kill_and_hostile_score() {
        let mut attacker = craft("attacker", 100.0, 0.0);
        let mut victim = craft("victim", 10.0, 0.0);
        victim.unequip();
        let outcome = victim.damage(50.0, Vec3::ZERO, Vec3::Y, None, 0.2);
        attacker.credit(&outcome, false);
        assert_eq!(attacker.stats().kills, 1);
        assert_eq!(attacker.stats().score, 0.0);
        assert_eq!(attacker.stats().damage_dealt, 10.0);
    }

    #[test]
    fn test_hostility() {
        let a = craft("a", 10.0, 0.0).with_team(Some("red".into()));
        let b = craft("b", 10.0, 0.0).with_team(Some("red".into()));
        let c = craft("c", 10.0, 0.0).with_team(Some("blue".into()));
        let d = craft("d", 10.0, 0.0);
        assert!(!a.is_hostile_to(&b));
        assert!(a.is_hostile_to(&c));
        assert!(a.is_hostile_to(&d));
        assert!(d.is_hostile_to(&a));
    }

    #[test]
    fn test_fire_counts_shots() {
        let mut craft = craft("a", 100.0, 0.0);
        craft.equip_profile(&profile(10.0));
        let fired = Rc::new(Cell::new(0u32));
        let f = fired.clone();
        craft.add_event_handler(
            EventKind::Fired,
            Box::new(move |event: &SpacecraftEvent| {
                if let SpacecraftEvent::Fired { shots } = event {
                    f.set(f.get() + shots);
                }
                true
            }),
        );
        let spawns = craft.fire(false);
        assert_eq!(spawns.len(), 1);
        assert!((spawns[0].position - Vec3::new(0.0, 4.0, 0.0)).length() < 1e-4);
        assert!(craft.fire(false).is_empty());
        assert_eq!(craft.stats().shots_fired, 1);
        assert_eq!(fired.get(), 1);
        assert_eq!(craft.stats().hit_ratio(), 0.0);
    }

    #[test]
    fn test_equip_updates_cached_values() {
        let mut craft = craft("a", 100.0, 0.0);
        assert!(craft.burn_need().is_none());
        assert_eq!(craft.score_value(), 100.0);
        craft.equip_profile(&profile(10.0));
        assert_eq!(craft.weapons().len(), 1);
        assert_eq!(craft.score_value(), 110.0);
        let need = craft.burn_need().unwrap();
        assert_eq!(need.linear, 0.05);
        craft.unequip();
        assert!(craft.weapons().is_empty());
        assert!(craft.burn_need().is_none());
    }

    #[test]
    fn test_jump_out_and_back() {
        let mut craft = craft("a", 100.0, 0.0);
        craft.equip_profile(&profile(10.0));
        craft.jump_out();
        assert_eq!(craft.jump_state(), Some(JumpState::Preparing));
        // second call cancels while preparing
        craft.jump_out();
        assert_eq!(craft.jump_state(), Some(JumpState::Idle));

        craft.jump_out();
        for _ in 0..120 {
            craft.simulate(DT, None, 0.1);
        }
        assert!(craft.is_away());
        assert!(craft.fire(false).is_empty());
        let position = craft.position();
        craft.simulate(1.0, None, 0.1);
        assert_eq!(craft.position(), position);

        craft.jump_in();
        assert!(!craft.is_away());
        assert_eq!(craft.jump_state(), Some(JumpState::JumpingIn));
        for _ in 0..60 {
            craft.simulate(DT, None, 0.1);
        }
        assert_eq!(craft.jump_state(), Some(JumpState::Idle));
    }

    #[test]
    fn test_combat_mode_accelerates_to_speed_target() {
        let mut craft = craft("a", 100.0, 0.0);
        craft.equip_profile(&profile(10.0));
        craft.set_speed_target(40.0);
        for _ in 0..600 {
            craft.simulate(DT, None, 0.1);
        }
        assert!((craft.body().relative_velocity().y - 40.0).abs() < 1.0);
        assert!(craft.position().y > 0.0);
    }

    #[test]
    fn test_hit_test_uses_hitboxes() {
        let craft = craft("a", 100.0, 0.0);
        // passes through the hull along Y
        let hit = craft
            .hit_test(Vec3::new(0.0, -20.0, 0.0), Vec3::new(0.0, 20.0, 0.0), 0.0)
            .unwrap();
        assert!((hit.y + 4.0).abs() < 1e-3);
        // inside the bounding sphere box but beside the narrow hull
        assert!(
            craft
                .hit_test(Vec3::new(4.0, -20.0, 0.0), Vec3::new(4.0, 20.0, 0.0), 0.5)
                .is_none()
        );
    }

    #[test]
    fn test_blinkers() {
        let mut class = (*class(10.0, 0.0)).clone();
        class.blinkers = vec![BlinkerClass {
            position: Vec3::new(1.0, 0.0, 0.0),
            period: 1.0,
            blinks: vec![0.0, 0.5],
            blink_length: 0.1,
        }];
        let mut craft = Spacecraft::new("a", Rc::new(class), Vec3::ZERO, Quat::IDENTITY);
        assert_eq!(craft.lit_blinkers().len(), 1);
        craft.simulate(0.2, None, 0.1);
        assert!(craft.lit_blinkers().is_empty());
        craft.simulate(0.35, None, 0.1);
        assert_eq!(craft.lit_blinkers().len(), 1);
    }

    #[test]
    fn test_model_matrix_waits_for_scale() {
        let mut craft = craft("a", 100.0, 0.0);
        assert!(craft.model_matrix().is_none());
        craft.apply_model_scale(2.0);
        let m = craft.model_matrix().unwrap();
        assert!((m.transform_vector3(Vec3::X).length() - 2.0).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn prop_damage_accounting(
            hits in prop::collection::vec(0.0f32..60.0, 1..40),
            armor in 0.0f32..10.0,
        ) {
            let mut attacker = craft("attacker", 100.0, 0.0);
            let mut victim = craft("victim", 150.0, armor);
            let mut applied_sum = 0.0;
            let mut kills = 0;
            for amount in hits {
                let outcome = victim.damage(amount, Vec3::ZERO, Vec3::Y, None, 0.2);
                applied_sum += outcome.applied;
                if outcome.killed {
                    kills += 1;
                }
                attacker.credit(&outcome, true);
                prop_assert!(victim.hitpoints() >= 0.0);
                prop_assert!(victim.hitpoints() <= victim.max_hitpoints());
            }
            prop_assert!(kills <= 1);
            prop_assert_eq!(attacker.stats().kills, kills);
            prop_assert!((attacker.stats().damage_dealt - applied_sum).abs() < 1e-3);
            prop_assert!(applied_sum <= 150.0 + 1e-3);
            if kills == 1 {
                prop_assert_eq!(victim.hitpoints(), 0.0);
            }
        }
    }
}
