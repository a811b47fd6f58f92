//! Mission tick
//!
//! One call advances everything by `dt` in a fixed order:
//! deferred resource effects → environment → triggers and their actions →
//! AI controllers → spacecraft → removal of released wrecks → octree rebuild
//! (only while projectiles are in flight) → projectiles → particles → pool
//! recycling.

use std::rc::Rc;

use glam::Vec3;

use super::triggers::{ActionKind, EvaluationContext};
use super::{Mission, MissionState};
use crate::sim::{
    ControlContext, CraftView, ExplosionClass, Octree, OctreeItem, Poolable, Spacecraft,
    SpacecraftHandle,
};

/// A projectile contact found during the sweep, applied afterwards
struct Hit {
    victim: SpacecraftHandle,
    by: Option<SpacecraftHandle>,
    damage: f32,
    position: Vec3,
    direction: Vec3,
    explosion: Option<Rc<ExplosionClass>>,
}

fn view_of(handle: SpacecraftHandle, craft: &Spacecraft, hostile: bool) -> CraftView {
    CraftView {
        handle,
        position: craft.position(),
        velocity: craft.velocity(),
        orientation: craft.orientation(),
        body_size: craft.body().body_size,
        hull_integrity: craft.hull_integrity(),
        hostile,
    }
}

impl Mission {
    /// Advance the mission by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        self.resources.drain(&mut self.spacecrafts);
        self.elapsed += dt;
        self.ticks += 1;

        self.simulate_environment();
        self.evaluate_triggers();
        self.messages.simulate(dt);
        self.run_controllers(dt);
        self.simulate_spacecrafts(dt);
        self.remove_released_spacecrafts();
        if self.projectiles.has_locked() {
            self.rebuild_octree();
        }
        self.simulate_projectiles(dt);
        for (_, particle) in self.particles.iter_mut() {
            particle.advance(dt);
        }
        self.projectiles.recycle();
        self.particles.recycle();

        // implicit outcomes never revert once reached
        let state = self.state();
        if state != self.state {
            self.set_state(state);
        }
    }

    fn simulate_environment(&mut self) {
        let center = self
            .piloted_spacecraft()
            .map_or(Vec3::ZERO, Spacecraft::position);
        self.environment.simulate(center);
    }

    fn evaluate_triggers(&mut self) {
        let ctx = EvaluationContext {
            roster: &self.roster,
            spacecrafts: &self.spacecrafts,
            elapsed: self.elapsed,
        };
        let fired: Vec<usize> = self
            .triggers
            .iter_mut()
            .enumerate()
            .filter_map(|(i, trigger)| trigger.evaluate(&ctx).then_some(i))
            .collect();

        for index in fired {
            log::debug!("Trigger '{}' fired", self.triggers[index].name());
            let kinds: Vec<ActionKind> = self
                .actions
                .iter()
                .filter(|a| a.trigger() == index)
                .map(|a| a.kind().clone())
                .collect();
            for kind in kinds {
                match kind {
                    ActionKind::Win => self.set_state(MissionState::Completed),
                    ActionKind::Lose => self.set_state(MissionState::Failed),
                    ActionKind::Message(message) => self.messages.push(message),
                    ActionKind::ClearMessages => self.messages.clear(),
                }
            }
        }
    }

    fn run_controllers(&mut self, dt: f32) {
        let handles: Vec<SpacecraftHandle> = self.controllers.keys().copied().collect();
        for handle in handles {
            let Some(craft) = self.spacecrafts.get(handle) else {
                self.controllers.remove(&handle);
                continue;
            };
            if !craft.is_active() {
                continue;
            }
            let own = view_of(handle, craft, false);
            let others: Vec<CraftView> = self
                .spacecrafts
                .iter()
                .filter(|(h, other)| *h != handle && other.is_active())
                .map(|(h, other)| view_of(h, other, craft.is_hostile_to(other)))
                .collect();
            let target = craft
                .target()
                .and_then(|t| others.iter().find(|v| v.handle == t));
            let weapon_range = craft.weapons().first().map_or(0.0, |w| {
                w.class().projectile_velocity * w.class().projectile.duration
            });
            let ctx = ControlContext {
                own: &own,
                target,
                lead_point: craft.targeting().lead_point(),
                others: &others,
                max_speed: craft.class().max_speed,
                weapon_range,
            };
            let Some(controller) = self.controllers.get_mut(&handle) else {
                continue;
            };
            let commands = controller.control(&ctx, dt);
            for command in commands {
                self.command(handle, command);
            }
        }
    }

    fn simulate_spacecrafts(&mut self, dt: f32) {
        let aim_tolerance = self.config.aim_tolerance;
        for handle in self.spacecrafts.handles() {
            let Some(craft) = self.spacecrafts.get(handle) else {
                continue;
            };
            let target = craft.target();
            let target_info = target
                .and_then(|t| self.spacecrafts.get(t))
                .filter(|t| t.is_active())
                .map(Spacecraft::target_info);
            if target.is_some() && target_info.is_none() {
                self.set_target(handle, None);
            }
            if let Some(craft) = self.spacecrafts.get_mut(handle) {
                craft.simulate(dt, target_info.as_ref(), aim_tolerance);
            }
        }
    }

    /// Wrecks whose `Destructed` listeners all agreed leave the scene
    fn remove_released_spacecrafts(&mut self) {
        let released: Vec<SpacecraftHandle> = self
            .spacecrafts
            .iter()
            .filter(|(_, craft)| craft.is_reusable())
            .map(|(handle, _)| handle)
            .collect();
        for handle in released {
            self.remove_spacecraft(handle);
        }
    }

    fn rebuild_octree(&mut self) {
        let items = self
            .spacecrafts
            .iter()
            .filter(|(_, craft)| craft.is_active())
            .map(|(handle, craft)| OctreeItem {
                key: handle,
                center: craft.position(),
                radius: craft.body().body_size,
            })
            .collect();
        self.octree = Some(Octree::new(
            items,
            self.config.octree_max_depth,
            self.config.octree_max_objects,
        ));
    }

    fn simulate_projectiles(&mut self, dt: f32) {
        let mut hits = Vec::new();
        for (_, projectile) in self.projectiles.iter_mut() {
            if projectile.can_be_reused() {
                continue;
            }
            let (start, end) = projectile.advance(dt);
            let Some(octree) = &self.octree else {
                continue;
            };
            let size = projectile.size();
            let contact = octree
                .get_objects(&projectile.path_box(start, end))
                .into_iter()
                .filter(|h| Some(*h) != projectile.origin)
                .filter_map(|h| {
                    let craft = self.spacecrafts.get(h)?;
                    craft.hit_test(start, end, size).map(|p| (h, p))
                })
                .min_by(|a, b| {
                    a.1.distance_squared(start)
                        .total_cmp(&b.1.distance_squared(start))
                });
            if let Some((victim, position)) = contact {
                projectile.mark_hit(position);
                hits.push(Hit {
                    victim,
                    by: projectile.origin,
                    damage: projectile.damage(),
                    position,
                    direction: projectile.velocity,
                    explosion: projectile.class().and_then(|c| c.explosion.clone()),
                });
            }
        }

        for hit in hits {
            if let Some(explosion) = &hit.explosion {
                self.spawn_explosion(explosion, hit.position, Vec3::ZERO);
            }
            self.damage_spacecraft(hit.victim, hit.damage, hit.position, hit.direction, hit.by);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{
        Action, Condition, ConditionKind, ConditionsRequired, FireWhen, Message, Quantifier,
        Trigger,
    };
    use super::*;
    use crate::mission::data::SubjectsData;
    use crate::sim::{Command, EventKind, Maneuver, SpacecraftEvent};
    use std::cell::Cell;
    use std::rc::Rc;

    const DT: f32 = 1.0 / 60.0;

    fn team_subjects(team: &str) -> SubjectsData {
        SubjectsData {
            teams: vec![team.to_string()],
            ..SubjectsData::default()
        }
    }

    fn destroyed_trigger(name: &str, team: &str) -> Trigger {
        Trigger::new(
            name,
            vec![Condition::new(ConditionKind::Destroyed(Quantifier::All), team_subjects(team))],
            ConditionsRequired::All,
            FireWhen::ChangeToTrue,
            false,
        )
    }

    #[test]
    fn test_win_on_the_tick_last_enemy_is_destroyed() {
        let mut mission = two_team_mission();
        let a = add(&mut mission, "a1", "a", Vec3::ZERO);
        let b1 = add(&mut mission, "b1", "b", Vec3::new(0.0, 100.0, 0.0));
        let b2 = add(&mut mission, "b2", "b", Vec3::new(0.0, 200.0, 0.0));
        let win = mission.add_trigger(destroyed_trigger("bGone", "b"));
        mission.add_action(Action::new(ActionKind::Win, win)).unwrap();
        mission.start();

        mission.tick(DT);
        assert_eq!(mission.state(), MissionState::InProgress);

        mission.damage_spacecraft(b1, 1000.0, Vec3::ZERO, Vec3::Y, Some(a));
        mission.tick(DT);
        assert_eq!(mission.state(), MissionState::InProgress);

        mission.damage_spacecraft(b2, 1000.0, Vec3::ZERO, Vec3::Y, Some(a));
        assert_eq!(mission.state(), MissionState::InProgress);
        mission.tick(DT);
        assert_eq!(mission.state(), MissionState::Completed);

        // one-directional
        let lose = mission.add_trigger(Trigger::new(
            "always",
            Vec::new(),
            ConditionsRequired::All,
            FireWhen::True,
            false,
        ));
        mission.add_action(Action::new(ActionKind::Lose, lose)).unwrap();
        mission.tick(DT);
        assert_eq!(mission.state(), MissionState::Completed);
    }

    #[test]
    fn test_mission_starts_trigger_runs_once() {
        let mut mission = two_team_mission();
        add(&mut mission, "a1", "a", Vec3::ZERO);
        let start = mission.add_trigger(Trigger::new(
            "start",
            Vec::new(),
            ConditionsRequired::All,
            FireWhen::MissionStarts,
            false,
        ));
        let message = Message {
            text: "Good hunting".into(),
            duration: None,
            urgent: false,
            source: None,
        };
        mission
            .add_action(Action::new(ActionKind::Message(message), start))
            .unwrap();
        mission.start();
        for _ in 0..10 {
            mission.tick(DT);
        }
        assert_eq!(mission.messages().len(), 1);
        assert!(mission.triggers()[start].is_spent());
    }

    #[test]
    fn test_implicit_win_and_lose() {
        let mut mission = two_team_mission();
        let pilot = crate::sim::spacecraft::test_support::craft("hero", 100.0, 0.0)
            .with_team(Some("a".into()))
            .with_piloted(true);
        let hero = mission.add_spacecraft(pilot, None).unwrap();
        let enemy = add(&mut mission, "b1", "b", Vec3::new(0.0, 100.0, 0.0));
        mission.start();
        assert_eq!(mission.state(), MissionState::InProgress);

        mission.damage_spacecraft(enemy, 1000.0, Vec3::ZERO, Vec3::Y, Some(hero));
        // computed on query, before any tick
        assert_eq!(mission.state(), MissionState::Completed);

        let mut mission = two_team_mission();
        let pilot = crate::sim::spacecraft::test_support::craft("hero", 100.0, 0.0)
            .with_team(Some("a".into()))
            .with_piloted(true);
        let hero = mission.add_spacecraft(pilot, None).unwrap();
        add(&mut mission, "b1", "b", Vec3::new(0.0, 100.0, 0.0));
        mission.start();
        mission.damage_spacecraft(hero, 1000.0, Vec3::ZERO, Vec3::Y, None);
        assert_eq!(mission.state(), MissionState::Failed);
        mission.tick(DT);
        assert_eq!(mission.state(), MissionState::Failed);
    }

    #[test]
    fn test_away_hostiles_block_implicit_win() {
        let mut mission = two_team_mission();
        let pilot = crate::sim::spacecraft::test_support::craft("hero", 100.0, 0.0)
            .with_team(Some("a".into()))
            .with_piloted(true);
        mission.add_spacecraft(pilot, None).unwrap();
        let enemy = add(&mut mission, "b1", "b", Vec3::new(0.0, 100.0, 0.0));
        mission.spacecraft_mut(enemy).unwrap().set_away();
        mission.start();
        mission.tick(DT);
        assert_eq!(mission.state(), MissionState::InProgress);
    }

    #[test]
    fn test_projectile_hits_and_credits() {
        let mut mission = two_team_mission();
        let shooter = add(&mut mission, "a1", "a", Vec3::ZERO);
        let victim = add(&mut mission, "b1", "b", Vec3::new(0.0, 60.0, 0.0));
        let equipment = crate::sim::spacecraft::test_support::profile(30.0);
        mission.spacecraft_mut(shooter).unwrap().equip_profile(&equipment);
        mission.start();

        mission.command(shooter, Command::Fire { only_if_aimed_or_fixed: false });
        assert_eq!(mission.projectiles().locked_count(), 1);
        for _ in 0..30 {
            mission.tick(DT);
        }
        let target = mission.spacecraft(victim).unwrap();
        assert_eq!(target.hitpoints(), 70.0);
        let stats = mission.spacecraft(shooter).unwrap().stats();
        assert_eq!(stats.shots_fired, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.damage_dealt, 30.0);
        assert!(stats.score > 0.0);
        assert_eq!(mission.projectiles().locked_count(), 0);
    }

    #[test]
    fn test_second_hit_in_same_tick_skips_the_wreck() {
        use crate::sim::spacecraft::test_support::{class, profile};
        use glam::Quat;
        use std::f32::consts::FRAC_PI_2;

        let mut mission = two_team_mission();
        let victim = add(&mut mission, "b1", "b", Vec3::new(0.0, 60.0, 0.0));
        // two shooters facing each other across the victim, same distance
        let left = Spacecraft::new(
            "a1",
            class(100.0, 0.0),
            Vec3::new(-60.0, 60.0, 0.0),
            Quat::from_rotation_z(-FRAC_PI_2),
        )
        .with_team(Some("a".into()));
        let right = Spacecraft::new(
            "a2",
            class(100.0, 0.0),
            Vec3::new(60.0, 60.0, 0.0),
            Quat::from_rotation_z(FRAC_PI_2),
        )
        .with_team(Some("a".into()));
        let left = mission.add_spacecraft(left, None).unwrap();
        let right = mission.add_spacecraft(right, None).unwrap();
        let watcher = add(&mut mission, "a3", "a", Vec3::new(0.0, -500.0, 0.0));
        for shooter in [left, right] {
            mission.spacecraft_mut(shooter).unwrap().equip_profile(&profile(150.0));
        }

        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        mission.spacecraft_mut(watcher).unwrap().add_event_handler(
            EventKind::AnySpacecraftHit,
            Box::new(move |_: &SpacecraftEvent| {
                counter.set(counter.get() + 1);
                true
            }),
        );

        for shooter in [left, right] {
            mission.command(shooter, Command::Fire { only_if_aimed_or_fixed: false });
        }
        assert_eq!(mission.projectiles().locked_count(), 2);
        for _ in 0..30 {
            mission.tick(DT);
        }

        assert!(!mission.spacecraft(victim).is_some_and(Spacecraft::is_alive));
        let (hits, kills) = [left, right]
            .iter()
            .map(|&h| mission.spacecraft(h).unwrap().stats())
            .fold((0, 0), |(hits, kills), s| (hits + s.hits, kills + s.kills));
        assert_eq!(hits, 1);
        assert_eq!(kills, 1);
        assert_eq!(seen.get(), 1);
        assert_eq!(mission.projectiles().locked_count(), 0);
    }

    #[test]
    fn test_projectiles_do_not_hit_their_shooter() {
        let mut mission = two_team_mission();
        let shooter = add(&mut mission, "a1", "a", Vec3::ZERO);
        let equipment = crate::sim::spacecraft::test_support::profile(30.0);
        mission.spacecraft_mut(shooter).unwrap().equip_profile(&equipment);
        mission.command(shooter, Command::Fire { only_if_aimed_or_fixed: false });
        mission.tick(DT);
        assert_eq!(mission.spacecraft(shooter).unwrap().hitpoints(), 100.0);
    }

    #[test]
    fn test_target_fired_reaches_watchers() {
        let mut mission = two_team_mission();
        let shooter = add(&mut mission, "a1", "a", Vec3::ZERO);
        let watcher = add(&mut mission, "b1", "b", Vec3::new(0.0, 500.0, 0.0));
        let equipment = crate::sim::spacecraft::test_support::profile(10.0);
        mission.spacecraft_mut(shooter).unwrap().equip_profile(&equipment);
        mission.set_target(watcher, Some(shooter));

        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        mission.spacecraft_mut(watcher).unwrap().add_event_handler(
            EventKind::TargetFired,
            Box::new(move |event: &SpacecraftEvent| {
                if let SpacecraftEvent::TargetFired { .. } = event {
                    counter.set(counter.get() + 1);
                }
                true
            }),
        );
        mission.command(shooter, Command::Fire { only_if_aimed_or_fixed: false });
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_released_wreck_is_removed_and_kept_one_respawns() {
        let mut mission = two_team_mission();
        let gone = add(&mut mission, "b1", "b", Vec3::ZERO);
        let kept = add(&mut mission, "b2", "b", Vec3::new(0.0, 100.0, 0.0));
        mission
            .spacecraft_mut(kept)
            .unwrap()
            .add_event_handler(EventKind::Destructed, Box::new(|_: &SpacecraftEvent| false));
        mission.damage_spacecraft(gone, 1000.0, Vec3::ZERO, Vec3::Y, None);
        mission.damage_spacecraft(kept, 1000.0, Vec3::ZERO, Vec3::Y, None);

        // explosion lasts one second
        for _ in 0..70 {
            mission.tick(DT);
        }
        assert!(mission.spacecraft(gone).is_none());
        assert!(mission.spacecraft(kept).unwrap().is_dead());
        assert_eq!(mission.team_stats("b").unwrap().destroyed, 2);

        assert!(mission.respawn(kept, Vec3::new(5.0, 0.0, 0.0)));
        let craft = mission.spacecraft(kept).unwrap();
        assert!(craft.is_alive());
        assert_eq!(craft.position(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_deferred_effect_skips_removed_craft() {
        let mut mission = two_team_mission();
        let gone = add(&mut mission, "b1", "b", Vec3::ZERO);
        let stays = add(&mut mission, "b2", "b", Vec3::new(0.0, 100.0, 0.0));
        mission.remove_spacecraft(gone);
        // the freed slot is reused before the model loads
        let newcomer = add(&mut mission, "b3", "b", Vec3::new(0.0, 200.0, 0.0));
        assert_eq!(newcomer.index(), gone.index());

        mission.all_resources_ready();
        mission.tick(DT);
        assert_eq!(mission.spacecraft(stays).unwrap().model_scale(), Some(2.0));
        assert_eq!(mission.spacecraft(newcomer).unwrap().model_scale(), Some(2.0));
        assert!(mission.spacecraft(gone).is_none());
    }

    #[test]
    fn test_controller_commands_are_applied() {
        struct Turner;
        impl crate::sim::Controller for Turner {
            fn control(&mut self, _ctx: &ControlContext<'_>, _dt: f32) -> Vec<Command> {
                vec![Command::Control(Maneuver::YawLeft, None), Command::SpeedTarget(40.0)]
            }
        }
        let mut mission = two_team_mission();
        let ship = crate::sim::spacecraft::test_support::craft("ai", 100.0, 0.0)
            .with_team(Some("a".into()));
        let handle = mission.add_spacecraft(ship, Some(Box::new(Turner))).unwrap();
        let equipment = crate::sim::spacecraft::test_support::profile(10.0);
        mission.spacecraft_mut(handle).unwrap().equip_profile(&equipment);
        for _ in 0..30 {
            mission.tick(DT);
        }
        let craft = mission.spacecraft(handle).unwrap();
        assert_eq!(craft.speed_target(), 40.0);
        assert!(craft.body().angular_velocity.z > 0.0);
    }
}
