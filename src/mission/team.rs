//! Teams and per-team statistics

use serde::Serialize;

use super::data::TeamData;

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    id: String,
    /// Display name key for the UI
    name: String,
    color: Option<[f32; 4]>,
    initial_count: u32,
}

impl Team {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            color: None,
            initial_count: 0,
        }
    }

    pub fn from_data(data: &TeamData) -> Self {
        Self {
            id: data.id.clone(),
            name: data.name.clone().unwrap_or_else(|| data.id.clone()),
            color: data.color,
            initial_count: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Option<[f32; 4]> {
        self.color
    }

    /// Craft the team started the mission with
    pub fn initial_count(&self) -> u32 {
        self.initial_count
    }

    pub(crate) fn add_member(&mut self) {
        self.initial_count += 1;
    }
}

/// Snapshot for the scoreboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamStats {
    pub initial: u32,
    pub present: u32,
    pub away: u32,
    pub destroyed: u32,
    pub kills: u32,
    pub score: f32,
}
