//! Messages queued by mission actions for the UI

use super::triggers::Message;

#[derive(Debug, Clone)]
struct Queued {
    message: Message,
    /// Seconds left on screen
    remaining: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    queued: Vec<Queued>,
}

impl MessageQueue {
    pub fn push(&mut self, message: Message) {
        log::debug!("Message: {}", message.text);
        let remaining = message.duration;
        let queued = Queued { message, remaining };
        // urgent messages jump the queue
        if queued.message.urgent {
            let at = self
                .queued
                .iter()
                .position(|q| !q.message.urgent)
                .unwrap_or(self.queued.len());
            self.queued.insert(at, queued);
        } else {
            self.queued.push(queued);
        }
    }

    pub fn clear(&mut self) {
        self.queued.clear();
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// The message on screen now
    pub fn current(&self) -> Option<&Message> {
        self.queued.first().map(|q| &q.message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.queued.iter().map(|q| &q.message)
    }

    /// Count down the message on screen; timed messages leave when done
    pub fn simulate(&mut self, dt: f32) {
        let Some(first) = self.queued.first_mut() else {
            return;
        };
        if let Some(remaining) = &mut first.remaining {
            *remaining -= dt;
            if *remaining <= 0.0 {
                self.queued.remove(0);
            }
        }
    }
}
