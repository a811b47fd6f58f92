//! Building a [`Mission`] from mission data and the class library

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;

use super::data::{EquipmentData, MissionData, RandomShipsData, SpacecraftData, orientation_from};
use super::environment::Environment;
use super::team::Team;
use super::triggers::{Action, Trigger};
use super::{Mission, MissionConfig};
use crate::error::{ConfigError, ConfigResult};
use crate::sim::{ClassLibrary, Spacecraft, SpacecraftClass, Squad, controller_for};

/// Profile used when mission data does not name one
pub const DEFAULT_PROFILE: &str = "default";

impl Mission {
    pub fn from_json(
        json: &str,
        classes: &ClassLibrary,
        config: MissionConfig,
    ) -> ConfigResult<Self> {
        Self::load(&MissionData::from_json(json)?, classes, config)
    }

    pub fn load(
        data: &MissionData,
        classes: &ClassLibrary,
        config: MissionConfig,
    ) -> ConfigResult<Self> {
        let mut mission = Mission::new(config);
        let environment =
            Environment::from_data(&data.environment, mission.config.dust_amount, &mut mission.rng);
        mission.set_environment(environment);

        for team in &data.teams {
            mission.add_team(Team::from_data(team))?;
        }
        for craft in &data.spacecrafts {
            mission.load_spacecraft(craft, classes)?;
        }
        if let Some(random) = &data.random_ships {
            mission.place_random_ships(random, classes)?;
        }
        for craft in data.spacecrafts.iter().filter(|c| c.initial_target.is_some()) {
            mission.apply_initial_target(craft)?;
        }

        for trigger in &data.triggers {
            if mission.triggers.iter().any(|t| t.name() == trigger.name) {
                return Err(ConfigError::invalid(
                    "triggers",
                    format!("duplicate trigger '{}'", trigger.name),
                ));
            }
            mission.add_trigger(Trigger::from_data(trigger)?);
        }
        for action in &data.actions {
            let action = Action::from_data(action, &mission.triggers)?;
            mission.add_action(action)?;
        }

        mission.start();
        Ok(mission)
    }

    fn load_spacecraft(
        &mut self,
        data: &SpacecraftData,
        classes: &ClassLibrary,
    ) -> ConfigResult<()> {
        let class = classes.spacecraft(&data.class)?;
        let squad = match &data.squad {
            Some(text) => Some(Squad::parse(text).ok_or_else(|| {
                ConfigError::invalid(
                    "spacecraft squad",
                    format!("'{}' is not \"name index\"", text),
                )
            })?),
            None => None,
        };
        let id = data
            .name
            .clone()
            .or_else(|| squad.as_ref().map(Squad::to_string))
            .unwrap_or_else(|| format!("{} {}", class.name, self.roster.len() + 1));

        let orientation = orientation_from(&data.rotations);
        let mut craft = Spacecraft::new(id, class.clone(), data.position, orientation)
            .with_team(data.team.clone())
            .with_squad(squad)
            .with_piloted(data.piloted_spacecraft);
        if data.away {
            craft.set_away();
        }
        match &data.equipment {
            Some(EquipmentData::Profile(name)) => {
                let profile = class.equipment_profile(name)?;
                craft.equip_profile(&profile);
            }
            Some(EquipmentData::Inline(value)) => {
                let profile = classes.inline_profile(value)?;
                craft.equip_profile(&profile);
            }
            None => equip_default(&mut craft, &class),
        }

        let controller = match (&data.ai, data.piloted_spacecraft) {
            (Some(ai), false) => {
                let controller = controller_for(ai);
                if controller.is_none() {
                    log::warn!("{}: unknown AI type '{}', left idle", craft.id(), ai);
                }
                controller
            }
            _ => None,
        };
        self.add_spacecraft(craft, controller)?;
        Ok(())
    }

    fn apply_initial_target(&mut self, data: &SpacecraftData) -> ConfigResult<()> {
        let (Some(target_id), Some(own_id)) = (&data.initial_target, self.roster_id(data)) else {
            return Ok(());
        };
        let unknown = |name: &str| ConfigError::UnknownReference {
            kind: "spacecraft",
            name: name.to_string(),
            context: format!("initial target of '{}'", own_id),
        };
        let handle = self.find(&own_id).ok_or_else(|| unknown(&own_id))?;
        let target = self.find(target_id).ok_or_else(|| unknown(target_id))?;
        self.set_target(handle, Some(target));
        Ok(())
    }

    /// The id `load_spacecraft` gave the craft described by `data`
    fn roster_id(&self, data: &SpacecraftData) -> Option<String> {
        data.name.clone().or_else(|| {
            data.squad
                .as_deref()
                .and_then(Squad::parse)
                .map(|s| s.to_string())
        })
    }

    /// Scatter craft through a cube with the mission's seeded RNG, so the
    /// same seed always gives the same layout
    fn place_random_ships(
        &mut self,
        data: &RandomShipsData,
        classes: &ClassLibrary,
    ) -> ConfigResult<()> {
        let half = data.map_size.max(0.0) * 0.5;
        let mut placed = 0;
        for (class_name, &count) in &data.classes {
            let class = classes.spacecraft(class_name)?;
            let profile = match &data.equipment {
                Some(name) => Some(class.equipment_profile(name)?),
                None => None,
            };
            for n in 1..=count {
                let position = if half > 0.0 {
                    Vec3::new(
                        self.rng.random_range(-half..half),
                        self.rng.random_range(-half..half),
                        self.rng.random_range(-half..half),
                    )
                } else {
                    Vec3::ZERO
                };
                let yaw = match data.heading {
                    Some(degrees) => degrees.to_radians(),
                    None => self.rng.random_range(0.0..TAU),
                };
                let id = format!("{} #{}", class.name, n);
                let orientation = Quat::from_rotation_z(yaw);
                let mut craft = Spacecraft::new(id, class.clone(), position, orientation)
                    .with_team(data.team.clone());
                match &profile {
                    Some(profile) => craft.equip_profile(profile),
                    None => equip_default(&mut craft, &class),
                }
                let controller = data.ai.as_deref().and_then(controller_for);
                self.add_spacecraft(craft, controller)?;
                placed += 1;
            }
        }
        log::info!("Placed {} random ships", placed);
        Ok(())
    }
}

fn equip_default(craft: &mut Spacecraft, class: &SpacecraftClass) {
    match class.equipment_profiles.get(DEFAULT_PROFILE) {
        Some(profile) => craft.equip_profile(profile),
        None => log::debug!("{}: no default profile, unequipped", craft.id()),
    }
}
