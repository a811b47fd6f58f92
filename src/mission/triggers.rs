//! Mission objectives: conditions, triggers and actions
//!
//! Conditions look at a set of subject spacecraft (named craft, squads,
//! teams). The set is resolved against the roster the first time a condition
//! is evaluated and cached from then on; craft that leave the scene keep
//! their roster entry, so removed craft still count as destroyed.
//!
//! Triggers combine their conditions and fire according to their
//! [`FireWhen`] policy, comparing against the state of the previous
//! evaluation (false before the first one). Actions run synchronously when
//! their trigger fires.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::data::{
    ActionData, ActionType, ConditionData, ConditionType, ConditionsRequired, FireWhen,
    SubjectsData, TriggerData,
};
use crate::error::{ConfigError, ConfigResult};
use crate::sim::{Arena, Spacecraft, SpacecraftHandle, Squad};

/// A craft as it was registered in the mission. Never pruned.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub id: String,
    pub squad: Option<Squad>,
    pub team: Option<String>,
    pub handle: SpacecraftHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectStatus {
    Present,
    Away,
    /// Destroying, dead or removed
    Destroyed,
}

pub fn subject_status(spacecrafts: &Arena<Spacecraft>, handle: SpacecraftHandle) -> SubjectStatus {
    match spacecrafts.get(handle) {
        Some(craft) if craft.is_alive() && craft.is_away() => SubjectStatus::Away,
        Some(craft) if craft.is_alive() => SubjectStatus::Present,
        _ => SubjectStatus::Destroyed,
    }
}

/// What conditions are evaluated against
pub struct EvaluationContext<'a> {
    pub roster: &'a [RosterEntry],
    pub spacecrafts: &'a Arena<Spacecraft>,
    /// Seconds since the mission started
    pub elapsed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantifier {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Below,
    Above,
    Equal,
}

impl Relation {
    fn holds(self, value: usize, count: usize) -> bool {
        match self {
            Relation::Below => value < count,
            Relation::Above => value > count,
            Relation::Equal => value == count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConditionKind {
    Destroyed(Quantifier),
    /// Number of subjects present in the scene compared to `count`
    Count { relation: Relation, count: usize },
    TimeElapsed { seconds: f32 },
    Away(Quantifier),
}

#[derive(Debug, Default, Deserialize)]
struct WhichParams {
    #[serde(default)]
    which: Quantifier,
}

#[derive(Debug, Deserialize)]
struct CountParams {
    relation: Relation,
    count: usize,
}

#[derive(Debug, Deserialize)]
struct TimeParams {
    seconds: f32,
}

fn params<T: DeserializeOwned>(value: &serde_json::Value) -> ConfigResult<T> {
    let value = if value.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        value.clone()
    };
    serde_json::from_value(value).map_err(|e| ConfigError::json("condition params", e))
}

#[derive(Debug, Clone)]
pub struct Condition {
    kind: ConditionKind,
    subjects: SubjectsData,
    /// Roster indices, resolved on first evaluation
    resolved: Option<Vec<usize>>,
}

impl Condition {
    pub fn new(kind: ConditionKind, subjects: SubjectsData) -> Self {
        Self {
            kind,
            subjects,
            resolved: None,
        }
    }

    pub fn from_data(data: &ConditionData) -> ConfigResult<Self> {
        let kind = match data.kind {
            ConditionType::Destroyed => {
                ConditionKind::Destroyed(params::<WhichParams>(&data.params)?.which)
            }
            ConditionType::Away => ConditionKind::Away(params::<WhichParams>(&data.params)?.which),
            ConditionType::Count => {
                let p: CountParams = params(&data.params)?;
                ConditionKind::Count {
                    relation: p.relation,
                    count: p.count,
                }
            }
            ConditionType::TimeElapsed => ConditionKind::TimeElapsed {
                seconds: params::<TimeParams>(&data.params)?.seconds,
            },
        };
        if kind_needs_subjects(kind) && data.subjects.is_empty() {
            log::warn!("{:?} condition without subjects never holds", data.kind);
        }
        Ok(Self::new(kind, data.subjects.clone()))
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn subjects(&self) -> &SubjectsData {
        &self.subjects
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn matches(&self, entry: &RosterEntry) -> bool {
        let by_id = self.subjects.spacecrafts.iter().any(|id| *id == entry.id);
        // "alpha" matches the whole squad, "alpha 2" a single member
        let by_squad = entry.squad.as_ref().is_some_and(|squad| {
            let full = squad.to_string();
            self.subjects
                .squads
                .iter()
                .any(|s| *s == squad.name || *s == full)
        });
        let by_team = entry
            .team
            .as_ref()
            .is_some_and(|team| self.subjects.teams.contains(team));
        by_id || by_squad || by_team
    }

    fn resolve(&mut self, roster: &[RosterEntry]) -> &[usize] {
        if self.resolved.is_none() {
            let indices = roster
                .iter()
                .enumerate()
                .filter(|(_, entry)| self.matches(entry))
                .map(|(i, _)| i)
                .collect();
            self.resolved = Some(indices);
        }
        self.resolved.as_deref().unwrap_or(&[])
    }

    pub fn is_satisfied(&mut self, ctx: &EvaluationContext<'_>) -> bool {
        let kind = self.kind;
        if let ConditionKind::TimeElapsed { seconds } = kind {
            return ctx.elapsed >= seconds;
        }
        let statuses: Vec<SubjectStatus> = self
            .resolve(ctx.roster)
            .iter()
            .filter_map(|&i| ctx.roster.get(i))
            .map(|entry| subject_status(ctx.spacecrafts, entry.handle))
            .collect();
        let quantify = |which: Quantifier, status: SubjectStatus| match which {
            Quantifier::All => !statuses.is_empty() && statuses.iter().all(|s| *s == status),
            Quantifier::Any => statuses.contains(&status),
        };
        match kind {
            ConditionKind::Destroyed(which) => quantify(which, SubjectStatus::Destroyed),
            ConditionKind::Away(which) => quantify(which, SubjectStatus::Away),
            ConditionKind::Count { relation, count } => {
                let present = statuses
                    .iter()
                    .filter(|s| **s == SubjectStatus::Present)
                    .count();
                relation.holds(present, count)
            }
            ConditionKind::TimeElapsed { .. } => false,
        }
    }
}

fn kind_needs_subjects(kind: ConditionKind) -> bool {
    !matches!(kind, ConditionKind::TimeElapsed { .. })
}

#[derive(Debug, Clone)]
pub struct Trigger {
    name: String,
    conditions: Vec<Condition>,
    required: ConditionsRequired,
    fire_when: FireWhen,
    one_shot: bool,
    previous: bool,
    fired: bool,
}

impl Trigger {
    pub fn new(
        name: impl Into<String>,
        conditions: Vec<Condition>,
        required: ConditionsRequired,
        fire_when: FireWhen,
        one_shot: bool,
    ) -> Self {
        let name = name.into();
        let one_shot = if fire_when == FireWhen::MissionStarts && !one_shot {
            log::debug!("Trigger '{}' fires at mission start, made one-shot", name);
            true
        } else {
            one_shot
        };
        Self {
            name,
            conditions,
            required,
            fire_when,
            one_shot,
            previous: false,
            fired: false,
        }
    }

    pub fn from_data(data: &TriggerData) -> ConfigResult<Self> {
        let conditions = data
            .conditions
            .iter()
            .map(Condition::from_data)
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(Self::new(
            data.name.clone(),
            conditions,
            data.conditions_required,
            data.fire_when,
            data.one_shot,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn fire_when(&self) -> FireWhen {
        self.fire_when
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Spent one-shot triggers are skipped entirely
    pub fn is_spent(&self) -> bool {
        self.one_shot && self.fired
    }

    /// Combined state of the conditions (ALL of nothing holds, ANY of
    /// nothing does not)
    pub fn conditions_hold(&mut self, ctx: &EvaluationContext<'_>) -> bool {
        match self.required {
            ConditionsRequired::All => self.conditions.iter_mut().all(|c| c.is_satisfied(ctx)),
            ConditionsRequired::Any => self.conditions.iter_mut().any(|c| c.is_satisfied(ctx)),
        }
    }

    /// Evaluate once per tick; true if the trigger fires
    pub fn evaluate(&mut self, ctx: &EvaluationContext<'_>) -> bool {
        if self.is_spent() {
            return false;
        }
        let state = match self.fire_when {
            FireWhen::MissionStarts => true,
            _ => self.conditions_hold(ctx),
        };
        self.update(state)
    }

    /// Apply the fire policy to this tick's condition state
    pub fn update(&mut self, state: bool) -> bool {
        if self.is_spent() {
            return false;
        }
        let previous = std::mem::replace(&mut self.previous, state);
        let fires = match self.fire_when {
            FireWhen::MissionStarts => true,
            FireWhen::True => state,
            FireWhen::False => !state,
            FireWhen::Change => state != previous,
            FireWhen::ChangeToTrue => state && !previous,
            FireWhen::ChangeToFalse => !state && previous,
        };
        if fires {
            self.fired = true;
        }
        fires
    }
}

/// A message for the UI
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    /// Seconds on screen; stays until cleared when missing
    #[serde(default)]
    pub duration: Option<f32>,
    #[serde(default)]
    pub urgent: bool,
    /// Id of the craft the message comes from
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    Win,
    Lose,
    Message(Message),
    ClearMessages,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionKind,
    /// Index into the mission's triggers
    trigger: usize,
}

impl Action {
    pub fn new(kind: ActionKind, trigger: usize) -> Self {
        Self { kind, trigger }
    }

    pub fn from_data(data: &ActionData, triggers: &[Trigger]) -> ConfigResult<Self> {
        let trigger = triggers
            .iter()
            .position(|t| t.name() == data.trigger)
            .ok_or_else(|| ConfigError::UnknownReference {
                kind: "trigger",
                name: data.trigger.clone(),
                context: format!("{:?} action", data.kind),
            })?;
        let kind = match data.kind {
            ActionType::Win => ActionKind::Win,
            ActionType::Lose => ActionKind::Lose,
            ActionType::ClearMessages => ActionKind::ClearMessages,
            ActionType::Message => ActionKind::Message(
                serde_json::from_value(data.params.clone())
                    .map_err(|e| ConfigError::json("message action", e))?,
            ),
        };
        Ok(Self::new(kind, trigger))
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn trigger(&self) -> usize {
        self.trigger
    }
}
