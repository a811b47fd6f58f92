//! Mission logic engine
//!
//! A [`Mission`] owns everything in play: the spacecraft (in a
//! generation-checked arena), teams, environment, objectives and the pools of
//! projectiles and particles. The outside world drives it through
//! [`Mission::tick`] and [`Mission::command`] and reads it back through the
//! query methods.

pub mod config;
pub mod data;
pub mod environment;
pub mod loader;
pub mod messages;
pub mod team;
pub mod tick;
pub mod triggers;

use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;

pub use config::MissionConfig;
pub use data::{ConditionsRequired, FireWhen, MissionData};
pub use environment::{DustCloud, Environment, LightSource};
pub use messages::MessageQueue;
pub use team::{Team, TeamStats};
pub use triggers::{
    Action, ActionKind, Condition, ConditionKind, EvaluationContext, Message, Quantifier,
    Relation, RosterEntry, SubjectStatus, Trigger, subject_status,
};

use crate::error::{ConfigError, ConfigResult};
use crate::sim::{
    Arena, Command, Controller, DamageOutcome, ExplosionClass, Octree, Particle, Pool, Projectile,
    ReadinessGate, Spacecraft, SpacecraftEvent, SpacecraftHandle, TargetCommand,
    explosion_particles,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissionState {
    /// No objectives
    #[default]
    None,
    InProgress,
    Completed,
    Failed,
}

pub struct Mission {
    config: MissionConfig,
    environment: Environment,
    teams: Vec<Team>,
    spacecrafts: Arena<Spacecraft>,
    roster: Vec<RosterEntry>,
    piloted: Option<SpacecraftHandle>,
    controllers: BTreeMap<SpacecraftHandle, Box<dyn Controller>>,
    triggers: Vec<Trigger>,
    actions: Vec<Action>,
    state: MissionState,
    messages: MessageQueue,
    projectiles: Pool<Projectile>,
    particles: Pool<Particle>,
    octree: Option<Octree<SpacecraftHandle>>,
    resources: ReadinessGate<Arena<Spacecraft>>,
    rng: Pcg32,
    elapsed: f32,
    ticks: u64,
}

impl std::fmt::Debug for Mission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mission")
            .field("state", &self.state)
            .field("spacecrafts", &self.spacecrafts.len())
            .field("triggers", &self.triggers.len())
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

impl Mission {
    /// An empty mission
    pub fn new(config: MissionConfig) -> Self {
        Self {
            environment: Environment::default(),
            teams: Vec::new(),
            spacecrafts: Arena::new(),
            roster: Vec::new(),
            piloted: None,
            controllers: BTreeMap::new(),
            triggers: Vec::new(),
            actions: Vec::new(),
            state: MissionState::None,
            messages: MessageQueue::default(),
            projectiles: Pool::new("projectiles", config.projectile_pool_size),
            particles: Pool::new("particles", config.particle_pool_size),
            octree: None,
            resources: ReadinessGate::new(),
            rng: Pcg32::seed_from_u64(config.seed),
            elapsed: 0.0,
            ticks: 0,
            config,
        }
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    // --- setup ------------------------------------------------------------------

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment;
    }

    pub fn add_team(&mut self, team: Team) -> ConfigResult<()> {
        if self.team(team.id()).is_some() {
            return Err(ConfigError::invalid("teams", format!("duplicate team '{}'", team.id())));
        }
        self.teams.push(team);
        Ok(())
    }

    /// Register a craft. Its model scale is applied once the model resource
    /// is ready.
    pub fn add_spacecraft(
        &mut self,
        craft: Spacecraft,
        controller: Option<Box<dyn Controller>>,
    ) -> ConfigResult<SpacecraftHandle> {
        if self.roster.iter().any(|e| e.id == craft.id()) {
            return Err(ConfigError::DuplicateId(craft.id().to_string()));
        }
        if let Some(team_id) = craft.team() {
            let team = self
                .teams
                .iter_mut()
                .find(|t| t.id() == team_id)
                .ok_or_else(|| ConfigError::UnknownReference {
                    kind: "team",
                    name: team_id.to_string(),
                    context: format!("spacecraft '{}'", craft.id()),
                })?;
            team.add_member();
        }

        let piloted = craft.is_piloted();
        let model = craft.class().model.clone();
        let scale = craft.class().model_scale;
        let entry = RosterEntry {
            id: craft.id().to_string(),
            squad: craft.squad().cloned(),
            team: craft.team().map(str::to_string),
            handle: self.spacecrafts.insert(craft),
        };
        let handle = entry.handle;
        self.roster.push(entry);

        if piloted {
            if let Some(previous) = self.piloted.and_then(|h| self.spacecrafts.get_mut(h)) {
                log::warn!("{} is no longer the piloted spacecraft", previous.id());
                previous.set_piloted(false);
            }
            self.piloted = Some(handle);
        } else if let Some(controller) = controller {
            self.controllers.insert(handle, controller);
        }
        self.resources
            .when_ready_for(&model, handle, move |craft| craft.apply_model_scale(scale));
        Ok(handle)
    }

    pub fn add_trigger(&mut self, trigger: Trigger) -> usize {
        self.triggers.push(trigger);
        self.triggers.len() - 1
    }

    pub fn add_action(&mut self, action: Action) -> ConfigResult<()> {
        if action.trigger() >= self.triggers.len() {
            return Err(ConfigError::UnknownReference {
                kind: "trigger",
                name: action.trigger().to_string(),
                context: "action".to_string(),
            });
        }
        self.actions.push(action);
        Ok(())
    }

    /// Finish setup: the mission is in progress if it has anything to win
    /// or lose
    pub fn start(&mut self) {
        let has_objectives = self.piloted.is_some()
            || self
                .actions
                .iter()
                .any(|a| matches!(a.kind(), ActionKind::Win | ActionKind::Lose));
        self.state = if has_objectives {
            MissionState::InProgress
        } else {
            MissionState::None
        };
        for trigger in &self.triggers {
            for condition in trigger.conditions() {
                let matched = self.roster.iter().any(|e| condition.matches(e));
                if !condition.subjects().is_empty() && !matched {
                    log::warn!(
                        "Trigger '{}' has a condition matching no spacecraft",
                        trigger.name()
                    );
                }
            }
        }
        log::info!(
            "Mission started: {} spacecraft, {} teams, {} triggers, {} actions",
            self.spacecrafts.len(),
            self.teams.len(),
            self.triggers.len(),
            self.actions.len()
        );
    }

    // --- queries ------------------------------------------------------------------

    pub fn spacecraft(&self, handle: SpacecraftHandle) -> Option<&Spacecraft> {
        self.spacecrafts.get(handle)
    }

    pub fn spacecraft_mut(&mut self, handle: SpacecraftHandle) -> Option<&mut Spacecraft> {
        self.spacecrafts.get_mut(handle)
    }

    pub fn spacecrafts(&self) -> impl Iterator<Item = (SpacecraftHandle, &Spacecraft)> {
        self.spacecrafts.iter()
    }

    pub fn spacecraft_count(&self) -> usize {
        self.spacecrafts.len()
    }

    /// Handle of a craft by string id, if it is still in the mission
    pub fn find(&self, id: &str) -> Option<SpacecraftHandle> {
        self.roster
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.handle)
            .filter(|h| self.spacecrafts.contains(*h))
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn piloted(&self) -> Option<SpacecraftHandle> {
        self.piloted
    }

    pub fn piloted_spacecraft(&self) -> Option<&Spacecraft> {
        self.piloted.and_then(|h| self.spacecrafts.get(h))
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id() == id)
    }

    pub fn team_stats(&self, id: &str) -> Option<TeamStats> {
        let team = self.team(id)?;
        let mut stats = TeamStats {
            initial: team.initial_count(),
            ..TeamStats::default()
        };
        for entry in self.roster.iter().filter(|e| e.team.as_deref() == Some(id)) {
            match subject_status(&self.spacecrafts, entry.handle) {
                SubjectStatus::Present => stats.present += 1,
                SubjectStatus::Away => stats.away += 1,
                SubjectStatus::Destroyed => stats.destroyed += 1,
            }
            if let Some(craft) = self.spacecrafts.get(entry.handle) {
                stats.kills += craft.stats().kills;
                stats.score += craft.stats().score;
            }
        }
        Some(stats)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn messages(&self) -> &MessageQueue {
        &self.messages
    }

    pub fn projectiles(&self) -> &Pool<Projectile> {
        &self.projectiles
    }

    pub fn particles(&self) -> &Pool<Particle> {
        &self.particles
    }

    /// Seconds since the mission started
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn has_actions(&self, kind: &ActionKind) -> bool {
        self.actions.iter().any(|a| a.kind() == kind)
    }

    /// The mission outcome. Without explicit win actions the mission is won
    /// once nothing hostile to the piloted craft is left; without explicit
    /// lose actions it is lost when the piloted craft is destroyed.
    pub fn state(&self) -> MissionState {
        if self.state != MissionState::InProgress {
            return self.state;
        }
        if !self.has_actions(&ActionKind::Lose) && self.is_piloted_destroyed() {
            return MissionState::Failed;
        }
        if !self.has_actions(&ActionKind::Win) && self.no_hostiles_left() {
            return MissionState::Completed;
        }
        MissionState::InProgress
    }

    fn is_piloted_destroyed(&self) -> bool {
        self.piloted
            .is_some_and(|h| subject_status(&self.spacecrafts, h) == SubjectStatus::Destroyed)
    }

    /// Craft waiting to jump in still count as hostiles left
    fn no_hostiles_left(&self) -> bool {
        let Some(pilot) = self.piloted_spacecraft() else {
            return false;
        };
        !self
            .spacecrafts
            .iter()
            .any(|(_, craft)| craft.is_alive() && !craft.is_piloted() && pilot.is_hostile_to(craft))
    }

    fn set_state(&mut self, state: MissionState) {
        if self.state != MissionState::InProgress {
            log::debug!("Ignoring mission state {:?}, already {:?}", state, self.state);
            return;
        }
        log::info!("Mission {:?} after {:.1}s", state, self.elapsed);
        self.state = state;
    }

    // --- resources ------------------------------------------------------------------

    /// Called by the asset layer when a resource finished loading
    pub fn resource_ready(&mut self, resource: &str) {
        self.resources.mark_ready(resource);
    }

    pub fn all_resources_ready(&mut self) {
        self.resources.mark_all_ready();
    }

    // --- commands ---------------------------------------------------------------------

    /// Apply a control command from the UI or an AI controller
    pub fn command(&mut self, handle: SpacecraftHandle, command: Command) {
        let Some(craft) = self.spacecrafts.get_mut(handle) else {
            log::debug!("Command {:?} for removed spacecraft {:?}", command, handle);
            return;
        };
        if !craft.is_alive() {
            log::debug!("{}: ignoring {:?} while destroyed", craft.id(), command);
            return;
        }
        match command {
            Command::Control(maneuver, intensity) => craft.control(maneuver, intensity),
            Command::SpeedTarget(speed) => craft.set_speed_target(speed),
            Command::FlightMode(mode) => craft.set_flight_mode(mode),
            Command::ToggleFlightMode => craft.toggle_flight_mode(),
            Command::ToggleHitbox => craft.toggle_hitbox_visibility(),
            Command::JumpOut => craft.jump_out(),
            Command::JumpIn => craft.jump_in(),
            Command::Target(target) => self.target_command(handle, target),
            Command::Fire {
                only_if_aimed_or_fixed,
            } => self.fire(handle, only_if_aimed_or_fixed),
        }
    }

    fn target_command(&mut self, handle: SpacecraftHandle, command: TargetCommand) {
        let Some(craft) = self.spacecrafts.get(handle) else {
            return;
        };
        let candidates = |hostile: bool| -> Vec<SpacecraftHandle> {
            self.spacecrafts
                .iter()
                .filter(|(h, other)| {
                    *h != handle && other.is_active() && craft.is_hostile_to(other) == hostile
                })
                .map(|(h, _)| h)
                .collect()
        };
        let target = match command {
            TargetCommand::Clear => None,
            TargetCommand::NextHostile => craft.targeting().cycle(&candidates(true), true),
            TargetCommand::PreviousHostile => craft.targeting().cycle(&candidates(true), false),
            TargetCommand::NextNonHostile => craft.targeting().cycle(&candidates(false), true),
            TargetCommand::BestHostile => {
                let position = craft.position();
                candidates(true)
                    .into_iter()
                    .filter_map(|h| {
                        let craft = self.spacecrafts.get(h)?;
                        Some((h, craft.position().distance_squared(position)))
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(h, _)| h)
            }
        };
        self.set_target(handle, target);
    }

    /// Point `handle` at `target`, keeping the targeted craft's
    /// `targeted_by` list in step
    pub fn set_target(&mut self, handle: SpacecraftHandle, target: Option<SpacecraftHandle>) {
        let target = target.filter(|t| *t != handle && self.spacecrafts.contains(*t));
        let Some(craft) = self.spacecrafts.get_mut(handle) else {
            return;
        };
        let previous = craft.set_target(target);
        if previous == target {
            return;
        }
        if let Some(old) = previous.and_then(|h| self.spacecrafts.get_mut(h)) {
            old.remove_targeter(handle);
        }
        if let Some(new) = target.and_then(|h| self.spacecrafts.get_mut(h)) {
            new.add_targeter(handle);
        }
    }

    fn fire(&mut self, handle: SpacecraftHandle, only_if_aimed_or_fixed: bool) {
        let Some(craft) = self.spacecrafts.get_mut(handle) else {
            return;
        };
        let spawns = craft.fire(only_if_aimed_or_fixed);
        if spawns.is_empty() {
            return;
        }
        let watchers = craft.targeted_by().to_vec();
        for spawn in spawns {
            if self.projectiles.acquire(Projectile::new(spawn, Some(handle))).is_none() {
                break;
            }
        }
        for watcher in watchers {
            if let Some(craft) = self.spacecrafts.get_mut(watcher) {
                craft.handle_event(&SpacecraftEvent::TargetFired { shooter: handle });
            }
        }
    }

    /// Damage a craft, spawn the resulting explosions and credit the
    /// attacker. Craft already destroyed take no hits: nothing is credited
    /// and no events go out.
    pub fn damage_spacecraft(
        &mut self,
        victim: SpacecraftHandle,
        amount: f32,
        position: Vec3,
        direction: Vec3,
        by: Option<SpacecraftHandle>,
    ) -> Option<DamageOutcome> {
        let share = self.config.final_blow_share;
        let target = self.spacecrafts.get(victim)?;
        if !target.is_alive() {
            log::debug!("{}: hit ignored, already destroyed", target.id());
            return None;
        }
        let hostile = by
            .and_then(|h| self.spacecrafts.get(h))
            .is_some_and(|attacker| attacker.is_hostile_to(target));
        let outcome = self
            .spacecrafts
            .get_mut(victim)?
            .damage(amount, position, direction, by, share);

        for explosion in &outcome.explosions {
            self.spawn_explosion(&explosion.class, explosion.position, explosion.velocity);
        }
        let attacker = by
            .filter(|h| *h != victim)
            .and_then(|h| self.spacecrafts.get_mut(h));
        if let Some(attacker) = attacker {
            attacker.credit(&outcome, hostile);
            if attacker.target() == Some(victim) {
                attacker.handle_event(&SpacecraftEvent::TargetHit {
                    target: victim,
                    damage: outcome.applied,
                });
            }
        }
        let event = SpacecraftEvent::AnySpacecraftHit { victim };
        for (handle, craft) in self.spacecrafts.iter_mut() {
            if handle != victim {
                craft.handle_event(&event);
            }
        }
        Some(outcome)
    }

    fn spawn_explosion(&mut self, class: &Rc<ExplosionClass>, position: Vec3, velocity: Vec3) {
        let particles = explosion_particles(
            class,
            position,
            velocity,
            self.config.particle_amount,
            &mut self.rng,
        );
        for particle in particles {
            if self.particles.acquire(particle).is_none() {
                break;
            }
        }
    }

    /// Drop a craft from the scene; its roster entry stays
    pub fn remove_spacecraft(&mut self, handle: SpacecraftHandle) -> Option<Spacecraft> {
        self.set_target(handle, None);
        let targeters = self.spacecrafts.get(handle)?.targeted_by().to_vec();
        for targeter in targeters {
            self.set_target(targeter, None);
        }
        self.controllers.remove(&handle);
        let craft = self.spacecrafts.remove(handle)?;
        log::debug!("{} removed from the mission", craft.id());
        Some(craft)
    }

    /// Bring back a destroyed craft that was kept for reuse
    pub fn respawn(&mut self, handle: SpacecraftHandle, position: Vec3) -> bool {
        let Some(craft) = self.spacecrafts.get_mut(handle) else {
            return false;
        };
        if craft.is_alive() {
            log::warn!("{}: cannot respawn, still alive", craft.id());
            return false;
        }
        craft.respawn();
        craft.set_position(position);
        true
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::sim::spacecraft::test_support::craft;

    /// Mission with teams "a" and "b", no spacecraft yet
    pub fn two_team_mission() -> Mission {
        let mut mission = Mission::new(MissionConfig::default());
        mission.add_team(Team::new("a")).unwrap();
        mission.add_team(Team::new("b")).unwrap();
        mission
    }

    pub fn add(mission: &mut Mission, id: &str, team: &str, position: Vec3) -> SpacecraftHandle {
        let mut ship = craft(id, 100.0, 0.0).with_team(Some(team.to_string()));
        ship.set_position(position);
        mission.add_spacecraft(ship, None).unwrap()
    }
}
