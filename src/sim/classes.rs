//! Class catalogue
//!
//! Spacecraft and equipment classes are loaded once from JSON. Cross
//! references by name (a weapon's projectile, a spacecraft's explosion, the
//! items of an equipment profile) are resolved at load time into shared
//! handles, so a missing class is a configuration error up front rather than
//! a lookup failure in the middle of a mission.

use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec3;
use serde::Deserialize;

use super::collision::Aabb;
use crate::error::{ConfigError, ConfigResult};

/// Explosion effect (destruction, projectile hits, damage indicators)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplosionClass {
    pub name: String,
    /// Seconds until the explosion is over
    pub duration: f32,
    #[serde(default)]
    pub particle_count: u32,
    #[serde(default = "default_particle_speed")]
    pub particle_speed: f32,
    #[serde(default = "default_particle_size")]
    pub particle_size: f32,
}

fn default_particle_speed() -> f32 {
    20.0
}

fn default_particle_size() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileClass {
    pub name: String,
    /// Radius used for hit testing
    pub size: f32,
    pub mass: f32,
    pub damage: f32,
    /// Seconds of flight before the projectile expires
    pub duration: f32,
    pub explosion: Option<Rc<ExplosionClass>>,
}

/// Turret movement limits, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponRotation {
    /// Degrees per second
    pub rate: f32,
    pub max_yaw: f32,
    pub max_pitch: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponClass {
    pub name: String,
    pub projectile: Rc<ProjectileClass>,
    /// Seconds between volleys
    pub cooldown: f32,
    pub projectile_velocity: f32,
    /// Muzzle positions relative to the weapon slot
    pub barrels: Vec<Vec3>,
    /// `None` for weapons fixed along the craft's forward axis
    pub rotation: Option<WeaponRotation>,
    pub score_value: f32,
}

impl WeaponClass {
    pub fn is_fixed(&self) -> bool {
        self.rotation.is_none()
    }

    /// Damage of one volley
    pub fn volley_damage(&self) -> f32 {
        self.projectile.damage * self.barrels.len() as f32
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropulsionClass {
    pub name: String,
    /// Newtons at full burn, per axis
    pub thrust: f32,
    /// Rotational push at full burn (divided by mass)
    pub angular_thrust: f32,
    #[serde(default)]
    pub score_value: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShieldClass {
    pub name: String,
    pub capacity: f32,
    /// Seconds after a hit before recharging starts
    pub recharge_delay: f32,
    /// Capacity restored per second
    pub recharge_rate: f32,
    #[serde(default)]
    pub score_value: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpEngineClass {
    pub name: String,
    pub prepare_duration: f32,
    pub jump_out_duration: f32,
    /// m/s² applied forward while jumping out
    pub jump_out_acceleration: f32,
    pub jump_in_duration: f32,
    /// Arrival speed, decelerating to zero over the jump-in duration
    pub jump_in_velocity: f32,
    #[serde(default)]
    pub score_value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponSlot {
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageIndicatorClass {
    /// Shown once hull integrity (percent) drops below this
    pub hull_integrity: f32,
    pub position: Vec3,
    pub explosion: Rc<ExplosionClass>,
}

/// Blinking navigation light
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkerClass {
    pub position: Vec3,
    /// Seconds for a full cycle
    pub period: f32,
    /// Offsets within the cycle at which the light flashes
    pub blinks: Vec<f32>,
    /// Seconds a flash stays lit
    #[serde(default = "default_blink_length")]
    pub blink_length: f32,
}

fn default_blink_length() -> f32 {
    0.1
}

/// A resolved loadout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquipmentProfile {
    pub name: String,
    pub weapons: Vec<Rc<WeaponClass>>,
    pub propulsion: Option<Rc<PropulsionClass>>,
    pub shield: Option<Rc<ShieldClass>>,
    pub jump_engine: Option<Rc<JumpEngineClass>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpacecraftClass {
    pub name: String,
    /// e.g. "fighter", "corvette"
    pub kind: String,
    /// Model resource the renderer loads
    pub model: String,
    pub model_scale: f32,
    pub hitpoints: f32,
    /// Flat reduction of every hit
    pub armor: f32,
    pub mass: f32,
    pub body_size: f32,
    /// Top speed in combat flight mode, m/s
    pub max_speed: f32,
    /// Degrees per second
    pub turn_rate: f32,
    /// Local frame boxes used for projectile hits
    pub hitboxes: Vec<Aabb>,
    pub weapon_slots: Vec<WeaponSlot>,
    pub explosion: Option<Rc<ExplosionClass>>,
    pub damage_indicators: Vec<DamageIndicatorClass>,
    pub blinkers: Vec<BlinkerClass>,
    pub score_value: f32,
    pub equipment_profiles: HashMap<String, Rc<EquipmentProfile>>,
}

impl SpacecraftClass {
    pub fn equipment_profile(&self, name: &str) -> ConfigResult<Rc<EquipmentProfile>> {
        self.equipment_profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownReference {
                kind: "equipment profile",
                name: name.to_string(),
                context: format!("spacecraft class '{}'", self.name),
            })
    }

    /// Seconds the destruction sequence lasts before the craft is freed
    pub fn destruction_duration(&self) -> f32 {
        self.explosion.as_ref().map_or(0.0, |e| e.duration)
    }
}

// Raw JSON shapes, before name resolution

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectileDesc {
    name: String,
    size: f32,
    #[serde(default = "default_mass")]
    mass: f32,
    damage: f32,
    duration: f32,
    #[serde(default)]
    explosion: Option<String>,
}

fn default_mass() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeaponDesc {
    name: String,
    projectile: String,
    cooldown: f32,
    projectile_velocity: f32,
    #[serde(default = "default_barrels")]
    barrels: Vec<Vec3>,
    #[serde(default)]
    rotation: Option<WeaponRotation>,
    #[serde(default)]
    score_value: f32,
}

fn default_barrels() -> Vec<Vec3> {
    vec![Vec3::ZERO]
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDesc {
    #[serde(default)]
    weapons: Vec<String>,
    #[serde(default)]
    propulsion: Option<String>,
    #[serde(default)]
    shield: Option<String>,
    #[serde(default)]
    jump_engine: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DamageIndicatorDesc {
    hull_integrity: f32,
    position: Vec3,
    explosion: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HitboxDesc {
    center: Vec3,
    size: Vec3,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpacecraftDesc {
    name: String,
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    model: String,
    #[serde(default = "default_scale")]
    model_scale: f32,
    hitpoints: f32,
    #[serde(default)]
    armor: f32,
    mass: f32,
    body_size: f32,
    max_speed: f32,
    turn_rate: f32,
    #[serde(default)]
    hitboxes: Vec<HitboxDesc>,
    #[serde(default)]
    weapon_slots: Vec<WeaponSlot>,
    #[serde(default)]
    explosion: Option<String>,
    #[serde(default)]
    damage_indicators: Vec<DamageIndicatorDesc>,
    #[serde(default)]
    blinkers: Vec<BlinkerClass>,
    #[serde(default)]
    score_value: f32,
    #[serde(default)]
    equipment_profiles: HashMap<String, ProfileDesc>,
}

fn default_kind() -> String {
    "fighter".to_string()
}

fn default_scale() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassesFile {
    #[serde(default)]
    explosions: Vec<ExplosionClass>,
    #[serde(default)]
    projectiles: Vec<ProjectileDesc>,
    #[serde(default)]
    weapons: Vec<WeaponDesc>,
    #[serde(default)]
    propulsions: Vec<PropulsionClass>,
    #[serde(default)]
    shields: Vec<ShieldClass>,
    #[serde(default)]
    jump_engines: Vec<JumpEngineClass>,
    #[serde(default)]
    spacecrafts: Vec<SpacecraftDesc>,
}

fn lookup<T>(map: &HashMap<String, Rc<T>>, kind: &'static str, name: &str) -> ConfigResult<Rc<T>> {
    map.get(name).cloned().ok_or_else(|| ConfigError::UnknownClass {
        kind,
        name: name.to_string(),
    })
}

fn index<T>(items: Vec<T>, name: impl Fn(&T) -> &str) -> HashMap<String, Rc<T>> {
    items
        .into_iter()
        .map(|item| (name(&item).to_string(), Rc::new(item)))
        .collect()
}

/// Every class the game knows, by name
#[derive(Debug, Clone, Default)]
pub struct ClassLibrary {
    explosions: HashMap<String, Rc<ExplosionClass>>,
    projectiles: HashMap<String, Rc<ProjectileClass>>,
    weapons: HashMap<String, Rc<WeaponClass>>,
    propulsions: HashMap<String, Rc<PropulsionClass>>,
    shields: HashMap<String, Rc<ShieldClass>>,
    jump_engines: HashMap<String, Rc<JumpEngineClass>>,
    spacecrafts: HashMap<String, Rc<SpacecraftClass>>,
}

impl ClassLibrary {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let file: ClassesFile =
            serde_json::from_str(json).map_err(|e| ConfigError::json("classes", e))?;

        let explosions = index(file.explosions, |e| e.name.as_str());

        let mut projectiles = HashMap::new();
        for desc in file.projectiles {
            let explosion = desc
                .explosion
                .as_deref()
                .map(|name| lookup(&explosions, "explosion", name))
                .transpose()?;
            let class = ProjectileClass {
                name: desc.name,
                size: desc.size,
                mass: desc.mass,
                damage: desc.damage,
                duration: desc.duration,
                explosion,
            };
            projectiles.insert(class.name.clone(), Rc::new(class));
        }

        let mut weapons = HashMap::new();
        for desc in file.weapons {
            if desc.cooldown <= 0.0 {
                return Err(ConfigError::invalid(
                    format!("weapon class '{}'", desc.name),
                    "cooldown must be positive",
                ));
            }
            let class = WeaponClass {
                projectile: lookup(&projectiles, "projectile", &desc.projectile)?,
                name: desc.name,
                cooldown: desc.cooldown,
                projectile_velocity: desc.projectile_velocity,
                barrels: desc.barrels,
                rotation: desc.rotation,
                score_value: desc.score_value,
            };
            weapons.insert(class.name.clone(), Rc::new(class));
        }

        let propulsions = index(file.propulsions, |p| p.name.as_str());
        let shields = index(file.shields, |s| s.name.as_str());
        let jump_engines = index(file.jump_engines, |j| j.name.as_str());

        let mut library = Self {
            explosions,
            projectiles,
            weapons,
            propulsions,
            shields,
            jump_engines,
            spacecrafts: HashMap::new(),
        };

        for desc in file.spacecrafts {
            let class = library.resolve_spacecraft(desc)?;
            library.spacecrafts.insert(class.name.clone(), Rc::new(class));
        }

        log::info!(
            "Loaded {} spacecraft classes, {} weapon classes",
            library.spacecrafts.len(),
            library.weapons.len()
        );
        Ok(library)
    }

    fn resolve_spacecraft(&self, desc: SpacecraftDesc) -> ConfigResult<SpacecraftClass> {
        let context = format!("spacecraft class '{}'", desc.name);
        if desc.hitpoints <= 0.0 || desc.mass <= 0.0 {
            return Err(ConfigError::invalid(
                context,
                "hitpoints and mass must be positive",
            ));
        }

        let explosion = desc
            .explosion
            .as_deref()
            .map(|name| self.explosion(name))
            .transpose()?;

        let damage_indicators = desc
            .damage_indicators
            .into_iter()
            .map(|d| -> ConfigResult<DamageIndicatorClass> {
                Ok(DamageIndicatorClass {
                    hull_integrity: d.hull_integrity,
                    position: d.position,
                    explosion: self.explosion(&d.explosion)?,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let mut equipment_profiles = HashMap::new();
        for (name, profile) in desc.equipment_profiles {
            if profile.weapons.len() > desc.weapon_slots.len() {
                return Err(ConfigError::invalid(
                    context,
                    format!(
                        "profile '{}' has {} weapons for {} slots",
                        name,
                        profile.weapons.len(),
                        desc.weapon_slots.len()
                    ),
                ));
            }
            let resolved = self.resolve_profile(&name, &profile)?;
            equipment_profiles.insert(name, Rc::new(resolved));
        }

        let hitboxes = desc
            .hitboxes
            .iter()
            .map(|h| Aabb::new(h.center - h.size * 0.5, h.center + h.size * 0.5))
            .collect();

        Ok(SpacecraftClass {
            name: desc.name,
            kind: desc.kind,
            model: desc.model,
            model_scale: desc.model_scale,
            hitpoints: desc.hitpoints,
            armor: desc.armor,
            mass: desc.mass,
            body_size: desc.body_size,
            max_speed: desc.max_speed,
            turn_rate: desc.turn_rate,
            hitboxes,
            weapon_slots: desc.weapon_slots,
            explosion,
            damage_indicators,
            blinkers: desc.blinkers,
            score_value: desc.score_value,
            equipment_profiles,
        })
    }

    fn resolve_profile(&self, name: &str, desc: &ProfileDesc) -> ConfigResult<EquipmentProfile> {
        Ok(EquipmentProfile {
            name: name.to_string(),
            weapons: desc
                .weapons
                .iter()
                .map(|w| self.weapon(w))
                .collect::<ConfigResult<_>>()?,
            propulsion: desc
                .propulsion
                .as_deref()
                .map(|p| lookup(&self.propulsions, "propulsion", p))
                .transpose()?,
            shield: desc
                .shield
                .as_deref()
                .map(|s| lookup(&self.shields, "shield", s))
                .transpose()?,
            jump_engine: desc
                .jump_engine
                .as_deref()
                .map(|j| lookup(&self.jump_engines, "jump engine", j))
                .transpose()?,
        })
    }

    /// Profile given inline in mission data (same shape as class profiles)
    pub fn inline_profile(&self, value: &serde_json::Value) -> ConfigResult<EquipmentProfile> {
        let desc: ProfileDesc = serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::json("equipment", e))?;
        self.resolve_profile("custom", &desc)
    }

    pub fn spacecraft(&self, name: &str) -> ConfigResult<Rc<SpacecraftClass>> {
        lookup(&self.spacecrafts, "spacecraft", name)
    }

    pub fn weapon(&self, name: &str) -> ConfigResult<Rc<WeaponClass>> {
        lookup(&self.weapons, "weapon", name)
    }

    pub fn explosion(&self, name: &str) -> ConfigResult<Rc<ExplosionClass>> {
        lookup(&self.explosions, "explosion", name)
    }

    pub fn projectile(&self, name: &str) -> ConfigResult<Rc<ProjectileClass>> {
        lookup(&self.projectiles, "projectile", name)
    }

    pub fn spacecraft_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.spacecrafts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEMO: &str = include_str!("../../demos/classes.json");

    #[test]
    fn test_demo_library_resolves() {
        let library = ClassLibrary::from_json(DEMO).unwrap();
        let fighter = library.spacecraft("falcon").unwrap();
        assert_eq!(fighter.kind, "fighter");
        let profile = fighter.equipment_profile("default").unwrap();
        assert_eq!(profile.weapons.len(), 2);
        assert!(profile.propulsion.is_some());
        assert!(fighter.destruction_duration() > 0.0);

        // profiles share class instances with the library
        let cannon = library.weapon(&profile.weapons[0].name).unwrap();
        assert!(Rc::ptr_eq(&cannon, &profile.weapons[0]));
    }

    #[test]
    fn test_unknown_reference_is_error() {
        let json = r#"{
            "projectiles": [{ "name": "bolt", "size": 0.5, "damage": 10, "duration": 2 }],
            "weapons": [{ "name": "gun", "projectile": "plasma", "cooldown": 0.5,
                          "projectileVelocity": 500 }]
        }"#;
        match ClassLibrary::from_json(json) {
            Err(ConfigError::UnknownClass { kind, name }) => {
                assert_eq!(kind, "projectile");
                assert_eq!(name, "plasma");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_too_many_weapons_for_slots() {
        let json = r#"{
            "projectiles": [{ "name": "bolt", "size": 0.5, "damage": 10, "duration": 2 }],
            "weapons": [{ "name": "gun", "projectile": "bolt", "cooldown": 0.5,
                          "projectileVelocity": 500 }],
            "spacecrafts": [{
                "name": "tiny", "model": "tiny.egm", "hitpoints": 10, "mass": 1,
                "bodySize": 1, "maxSpeed": 10, "turnRate": 90,
                "weaponSlots": [{ "position": [0, 1, 0] }],
                "equipmentProfiles": { "default": { "weapons": ["gun", "gun"] } }
            }]
        }"#;
        assert!(matches!(
            ClassLibrary::from_json(json),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_unknown_profile() {
        let library = ClassLibrary::from_json(DEMO).unwrap();
        let fighter = library.spacecraft("falcon").unwrap();
        assert!(matches!(
            fighter.equipment_profile("nonexistent"),
            Err(ConfigError::UnknownReference { .. })
        ));
    }
}
