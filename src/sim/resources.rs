//! Resource readiness gate
//!
//! Models, textures and sounds load asynchronously outside the simulation.
//! Code that needs a resource registers a continuation; once the asset layer
//! reports the resource ready, the continuation is queued and run the next
//! time the owner drains the gate. Continuations that touch a spacecraft go
//! through [`ReadinessGate::when_ready_for`], which skips the effect if the
//! craft's handle went stale while the load was pending.

use std::collections::HashSet;

use super::arena::{Arena, Handle};

type Continuation<C> = Box<dyn FnOnce(&mut C)>;

pub struct ReadinessGate<C> {
    ready: HashSet<String>,
    pending: Vec<(String, Continuation<C>)>,
    due: Vec<Continuation<C>>,
}

impl<C> Default for ReadinessGate<C> {
    fn default() -> Self {
        Self {
            ready: HashSet::new(),
            pending: Vec::new(),
            due: Vec::new(),
        }
    }
}

impl<C> std::fmt::Debug for ReadinessGate<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("ready", &self.ready.len())
            .field("pending", &self.pending.len())
            .field("due", &self.due.len())
            .finish()
    }
}

impl<C> ReadinessGate<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self, resource: &str) -> bool {
        self.ready.contains(resource)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len() + self.due.len()
    }

    /// Run `callback` on the first drain after `resource` is ready
    pub fn execute_when_ready(&mut self, resource: &str, callback: impl FnOnce(&mut C) + 'static) {
        if self.is_ready(resource) {
            self.due.push(Box::new(callback));
        } else {
            self.pending.push((resource.to_string(), Box::new(callback)));
        }
    }

    /// Called by the asset layer when a resource finished loading
    pub fn mark_ready(&mut self, resource: &str) {
        if !self.ready.insert(resource.to_string()) {
            return;
        }
        let (now, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(name, _)| name == resource);
        self.pending = later;
        self.due.extend(now.into_iter().map(|(_, cb)| cb));
    }

    /// Mark every resource with a pending continuation ready
    pub fn mark_all_ready(&mut self) {
        let names: Vec<String> = self.pending.iter().map(|(n, _)| n.clone()).collect();
        for name in names {
            self.mark_ready(&name);
        }
    }

    /// Run every due continuation against `context`; returns how many ran
    pub fn drain(&mut self, context: &mut C) -> usize {
        let due = std::mem::take(&mut self.due);
        let count = due.len();
        for callback in due {
            callback(context);
        }
        count
    }
}

impl<T: 'static> ReadinessGate<Arena<T>> {
    /// Like [`execute_when_ready`](Self::execute_when_ready), but the effect
    /// only runs if `handle` still resolves when the resource is ready
    pub fn when_ready_for(
        &mut self,
        resource: &str,
        handle: Handle<T>,
        effect: impl FnOnce(&mut T) + 'static,
    ) {
        let resource_name = resource.to_string();
        self.execute_when_ready(resource, move |arena: &mut Arena<T>| match arena.get_mut(handle) {
            Some(entity) => effect(entity),
            None => log::debug!(
                "Skipping deferred effect of '{}' for removed entity {:?}",
                resource_name,
                handle
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_wait_for_resource() {
        let mut gate: ReadinessGate<Vec<&'static str>> = ReadinessGate::new();
        let mut log = Vec::new();
        gate.execute_when_ready("ship.egm", |l| l.push("ship"));
        gate.execute_when_ready("rock.egm", |l| l.push("rock"));
        assert_eq!(gate.drain(&mut log), 0);

        gate.mark_ready("ship.egm");
        assert_eq!(gate.pending_count(), 2);
        assert_eq!(gate.drain(&mut log), 1);
        assert_eq!(log, vec!["ship"]);

        // already ready: runs on the next drain
        gate.execute_when_ready("ship.egm", |l| l.push("again"));
        gate.drain(&mut log);
        assert_eq!(log, vec!["ship", "again"]);

        gate.mark_all_ready();
        gate.drain(&mut log);
        assert_eq!(log, vec!["ship", "again", "rock"]);
        assert_eq!(gate.pending_count(), 0);
    }

    #[test]
    fn test_stale_handle_skips_effect() {
        let mut arena = Arena::new();
        let alive = arena.insert(1.0f32);
        let removed = arena.insert(1.0f32);
        let mut gate = ReadinessGate::new();
        gate.when_ready_for("model", alive, |scale| *scale = 2.0);
        gate.when_ready_for("model", removed, |scale| *scale = 2.0);
        arena.remove(removed);
        // slot is reused by a different entity before the load finishes
        let newcomer = arena.insert(1.0f32);

        gate.mark_ready("model");
        assert_eq!(gate.drain(&mut arena), 2);
        assert_eq!(arena.get(alive), Some(&2.0));
        assert_eq!(arena.get(newcomer), Some(&1.0));
    }
}
