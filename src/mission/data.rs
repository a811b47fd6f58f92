//! Mission JSON format
//!
//! Top-level keys: `environment`, `teams`, `views`, `spacecrafts`, `triggers`,
//! `actions` and `randomShips`. Camera `views` belong to the renderer and are
//! ignored here, as is any other unknown key.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionData {
    #[serde(default)]
    pub environment: EnvironmentData,
    #[serde(default)]
    pub teams: Vec<TeamData>,
    #[serde(default)]
    pub spacecrafts: Vec<SpacecraftData>,
    #[serde(default)]
    pub triggers: Vec<TriggerData>,
    #[serde(default)]
    pub actions: Vec<ActionData>,
    #[serde(default)]
    pub random_ships: Option<RandomShipsData>,
}

impl MissionData {
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::json("mission", e))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentData {
    #[serde(default)]
    pub light_sources: Vec<LightSourceData>,
    #[serde(default)]
    pub dust_clouds: Vec<DustCloudData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LightSourceData {
    /// Direction the light comes from
    pub direction: Vec3,
    #[serde(default = "white")]
    pub color: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DustCloudData {
    /// Particle count at full dust amount
    pub count: u32,
    /// Half extent of the cube the particles fill around the camera
    pub range: f32,
    #[serde(default = "white")]
    pub color: Vec3,
}

fn white() -> Vec3 {
    Vec3::ONE
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamData {
    pub id: String,
    /// Display name key, the id when missing
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<[f32; 4]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationData {
    pub axis: Axis,
    pub degrees: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }
}

/// Orientation from a chain of rotations about the local axes
pub fn orientation_from(rotations: &[RotationData]) -> Quat {
    rotations.iter().fold(Quat::IDENTITY, |q, r| {
        (q * Quat::from_axis_angle(r.axis.unit(), r.degrees.to_radians())).normalize()
    })
}

/// Equipment given either as a profile name or an inline profile
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EquipmentData {
    Profile(String),
    Inline(serde_json::Value),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacecraftData {
    pub class: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub squad: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotations: Vec<RotationData>,
    #[serde(default)]
    pub equipment: Option<EquipmentData>,
    /// AI type; the piloted craft ignores it
    #[serde(default)]
    pub ai: Option<String>,
    #[serde(default)]
    pub piloted_spacecraft: bool,
    /// Spacecraft id
    #[serde(default)]
    pub initial_target: Option<String>,
    /// Starts outside the scene, waiting to jump in
    #[serde(default)]
    pub away: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomShipsData {
    /// Class name → number of craft
    pub classes: BTreeMap<String, u32>,
    /// Edge of the cube centred on the origin the craft are placed in
    pub map_size: f32,
    /// Fixed yaw in degrees; random when missing
    #[serde(default)]
    pub heading: Option<f32>,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub ai: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FireWhen {
    /// Only on the first tick
    MissionStarts,
    True,
    False,
    Change,
    #[default]
    ChangeToTrue,
    ChangeToFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionsRequired {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerData {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<ConditionData>,
    #[serde(default)]
    pub conditions_required: ConditionsRequired,
    #[serde(default)]
    pub fire_when: FireWhen,
    #[serde(default)]
    pub one_shot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionType {
    Destroyed,
    Count,
    TimeElapsed,
    Away,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectsData {
    #[serde(default)]
    pub spacecrafts: Vec<String>,
    #[serde(default)]
    pub squads: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

impl SubjectsData {
    pub fn is_empty(&self) -> bool {
        self.spacecrafts.is_empty() && self.squads.is_empty() && self.teams.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionData {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    #[serde(default)]
    pub subjects: SubjectsData,
    /// Interpreted per condition type
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionData {
    #[serde(rename = "type")]
    pub kind: ActionType,
    /// Name of the trigger that runs this action
    pub trigger: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Win,
    Lose,
    Message,
    ClearMessages,
}
