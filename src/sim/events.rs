//! Spacecraft events and the per-craft listener registry

use std::collections::HashMap;
use std::fmt;

use glam::Vec3;

use super::spacecraft::SpacecraftHandle;

/// Something that happened to (or was done by) a spacecraft
#[derive(Debug, Clone, PartialEq)]
pub enum SpacecraftEvent {
    /// This craft took a hit
    BeingHit {
        by: Option<SpacecraftHandle>,
        /// Hitpoints actually lost
        damage: f32,
        position: Vec3,
    },
    /// This craft hit its current target
    TargetHit { target: SpacecraftHandle, damage: f32 },
    /// Some other craft in the mission was hit
    AnySpacecraftHit { victim: SpacecraftHandle },
    Fired { shots: u32 },
    /// The current target fired
    TargetFired { shooter: SpacecraftHandle },
    BeingTargeted { by: SpacecraftHandle },
    TargetSwitched { target: Option<SpacecraftHandle> },
    JumpEngaged,
    JumpCancelled,
    JumpOutStarted,
    JumpedOut,
    ArrivedIn,
    /// Hull integrity dropped below a damage indicator threshold
    DamageIndicatorShown { hull_integrity: f32 },
    /// The destruction sequence finished
    Destructed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeingHit,
    TargetHit,
    AnySpacecraftHit,
    Fired,
    TargetFired,
    BeingTargeted,
    TargetSwitched,
    JumpEngaged,
    JumpCancelled,
    JumpOutStarted,
    JumpedOut,
    ArrivedIn,
    DamageIndicatorShown,
    Destructed,
}

impl SpacecraftEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SpacecraftEvent::BeingHit { .. } => EventKind::BeingHit,
            SpacecraftEvent::TargetHit { .. } => EventKind::TargetHit,
            SpacecraftEvent::AnySpacecraftHit { .. } => EventKind::AnySpacecraftHit,
            SpacecraftEvent::Fired { .. } => EventKind::Fired,
            SpacecraftEvent::TargetFired { .. } => EventKind::TargetFired,
            SpacecraftEvent::BeingTargeted { .. } => EventKind::BeingTargeted,
            SpacecraftEvent::TargetSwitched { .. } => EventKind::TargetSwitched,
            SpacecraftEvent::JumpEngaged => EventKind::JumpEngaged,
            SpacecraftEvent::JumpCancelled => EventKind::JumpCancelled,
            SpacecraftEvent::JumpOutStarted => EventKind::JumpOutStarted,
            SpacecraftEvent::JumpedOut => EventKind::JumpedOut,
            SpacecraftEvent::ArrivedIn => EventKind::ArrivedIn,
            SpacecraftEvent::DamageIndicatorShown { .. } => EventKind::DamageIndicatorShown,
            SpacecraftEvent::Destructed => EventKind::Destructed,
        }
    }
}

/// A listener returns whether the default action may proceed
pub type EventHandler = Box<dyn FnMut(&SpacecraftEvent) -> bool>;

#[derive(Default)]
pub struct EventHandlers {
    handlers: HashMap<EventKind, Vec<EventHandler>>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<_> = self.handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort_by_key(|(k, _)| format!("{:?}", k));
        f.debug_map().entries(counts).finish()
    }
}

impl EventHandlers {
    pub fn add(&mut self, kind: EventKind, handler: EventHandler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    pub fn clear(&mut self, kind: EventKind) {
        self.handlers.remove(&kind);
    }

    pub fn clear_all(&mut self) {
        self.handlers.clear();
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Invoke every listener for the event's kind.
    ///
    /// All listeners run even after one returns `false`; the result is the
    /// AND of their answers (`true` when nobody listens). For
    /// [`SpacecraftEvent::Destructed`] a `false` keeps the craft around for
    /// respawning instead of freeing it.
    pub fn dispatch(&mut self, event: &SpacecraftEvent) -> bool {
        let Some(handlers) = self.handlers.get_mut(&event.kind()) else {
            return true;
        };
        handlers
            .iter_mut()
            .fold(true, |proceed, handler| handler(event) && proceed)
    }
}
