//! Bins: ordered event batches bound to a destination.

use serde::{Deserialize, Serialize};

use crate::Event;

/// A destination URI plus the events to deliver there, oldest first.
///
/// The destination travels with the bin so an archived or retried bin is
/// always replayed against the URI that was current when it was formed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bin {
    pub destination: String,
    pub events: Vec<Event>,
}

impl Bin {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            events: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Move every event of `other` to the back of this bin and adopt its
    /// destination.
    pub fn absorb(&mut self, other: Bin) {
        self.events.extend(other.events);
        self.destination = other.destination;
    }

    /// Split off up to `max` of the oldest events into a new bin with the
    /// same destination.
    pub fn take_front(&mut self, max: usize) -> Bin {
        let count = max.min(self.events.len());
        Bin {
            destination: self.destination.clone(),
            events: self.events.drain(..count).collect(),
        }
    }
}
