//! Ordered option sets for quality settings
//!
//! Every quality axis (texture quality, shadow distance, point light budget,
//! ...) is a list of named numeric levels sorted ascending by value. The
//! graphics engine selects among them, drops the ones the hardware cannot
//! handle, and steps them down when shader requirements overflow.

use serde::{Deserialize, Serialize};

use crate::error::{GraphicsError, GraphicsResult};

/// A single named level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub name: String,
    pub value: f32,
}

impl OptionEntry {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Named levels sorted ascending by value, with an optional current selection
#[derive(Debug, Clone)]
pub struct OptionSet {
    /// Setting name used in log and error messages
    setting: &'static str,
    entries: Vec<OptionEntry>,
    current: Option<usize>,
}

impl OptionSet {
    /// Build a set from configuration entries. Entries are sorted once by
    /// value; equal values keep their input order.
    pub fn new(setting: &'static str, mut entries: Vec<OptionEntry>) -> Self {
        entries.sort_by(|a, b| a.value.total_cmp(&b.value));
        Self {
            setting,
            entries,
            current: None,
        }
    }

    pub fn setting(&self) -> &'static str {
        self.setting
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    pub fn value_of(&self, name: &str) -> Option<f32> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&OptionEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current().map(|e| e.name.as_str())
    }

    pub fn current_value(&self) -> Option<f32> {
        self.current().map(|e| e.value)
    }

    /// Select the entry with the highest value (None if the set is empty)
    pub fn select_highest(&mut self) {
        self.current = self.entries.len().checked_sub(1);
    }

    pub fn is_at_lowest(&self) -> bool {
        self.current == Some(0)
    }

    /// Select by name.
    ///
    /// Returns `Ok(true)` when `name` was found. When it was not found and
    /// `fallback_to_highest` is set, the highest entry is selected and
    /// `Ok(false)` is returned; otherwise the selection is left unchanged and
    /// an invalid-option error is returned.
    pub fn set_current(&mut self, name: &str, fallback_to_highest: bool) -> GraphicsResult<bool> {
        if let Some(index) = self.index_of(name) {
            self.current = Some(index);
            return Ok(true);
        }
        if fallback_to_highest {
            self.select_highest();
            log::warn!(
                "'{}' is not available for {}, using '{}' instead",
                name,
                self.setting,
                self.current_name().unwrap_or("none")
            );
            return Ok(false);
        }
        Err(GraphicsError::InvalidOption {
            setting: self.setting,
            value: name.to_string(),
        })
    }

    /// Remove every entry with a value above `limit`. If the current entry
    /// goes away, the new highest entry is selected instead.
    pub fn apply_limit(&mut self, limit: f32) {
        self.retain(|entry| entry.value <= limit);
    }

    /// Keep only entries matching `keep`, reselecting the highest remaining
    /// entry if the current one is dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&OptionEntry) -> bool) {
        let previous = self.current_name().map(str::to_string);
        self.entries.retain(|e| keep(e));
        match previous {
            Some(name) => match self.index_of(&name) {
                Some(index) => self.current = Some(index),
                None => {
                    self.select_highest();
                    log::warn!(
                        "{} '{}' is not supported, changed to '{}'",
                        self.setting,
                        name,
                        self.current_name().unwrap_or("none")
                    );
                }
            },
            None => self.current = None,
        }
    }

    /// Step the selection one level down. False if already at the lowest
    /// level (or nothing is selected).
    pub fn decrease(&mut self) -> bool {
        match self.current {
            Some(index) if index > 0 => {
                self.current = Some(index - 1);
                true
            }
            _ => false,
        }
    }

    /// Step the selection one level up. False if already at the highest.
    pub fn increase(&mut self) -> bool {
        match self.current {
            Some(index) if index + 1 < self.entries.len() => {
                self.current = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    /// Names of the entries whose value passes `predicate`
    pub fn filtered_names(&self, predicate: impl Fn(f32) -> bool) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| predicate(e.value))
            .map(|e| e.name.as_str())
            .collect()
    }
}

/// Access to the underlying option set of a setting collection
pub trait QualityOptions {
    fn options(&self) -> &OptionSet;
    fn options_mut(&mut self) -> &mut OptionSet;
}

impl QualityOptions for OptionSet {
    fn options(&self) -> &OptionSet {
        self
    }

    fn options_mut(&mut self) -> &mut OptionSet {
        self
    }
}

/// Option set for asset-resolution axes (textures, cubemaps) that can
/// suggest the nearest substitute when the exact variant is missing.
#[derive(Debug, Clone)]
pub struct QualityPreferenceList {
    options: OptionSet,
}

impl QualityPreferenceList {
    pub fn new(options: OptionSet) -> Self {
        Self { options }
    }

    /// Names in order of preference: the current level, then lower levels
    /// from the closest down, then higher levels from the closest up.
    pub fn preference_order(&self) -> Vec<&str> {
        let entries = self.options.entries();
        let Some(current) = self.options.current_index() else {
            return entries.iter().rev().map(|e| e.name.as_str()).collect();
        };
        let mut order = Vec::with_capacity(entries.len());
        for index in (0..=current).rev() {
            order.push(entries[index].name.as_str());
        }
        for entry in &entries[current + 1..] {
            order.push(entry.name.as_str());
        }
        order
    }

    /// The most preferred name among `available`
    pub fn best_available<'a>(&self, available: &[&'a str]) -> Option<&'a str> {
        self.preference_order()
            .into_iter()
            .find_map(|name| available.iter().copied().find(|a| *a == name))
    }
}

impl QualityOptions for QualityPreferenceList {
    fn options(&self) -> &OptionSet {
        &self.options
    }

    fn options_mut(&mut self) -> &mut OptionSet {
        &mut self.options
    }
}
