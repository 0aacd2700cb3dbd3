//! Human-readable action log.
//!
//! Every colony keeps a pending list of [`ActionEvent`]s that the transport
//! drains after each tick.

use serde::{Deserialize, Serialize};

use crate::colony::Colony;
use crate::components::ColonyId;

/// What an action event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// A structure was built.
    Build,
    /// A fleet was launched or lost.
    Fleet,
    /// The colony advanced a level.
    Level,
    /// Combat outcome.
    Combat,
    /// A coordinated attack was launched or ended.
    Attack,
    /// A base changed hands.
    Conquest,
}

/// One entry of a colony's action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    /// Engine-wide increasing id.
    pub id: u64,
    /// Milliseconds from the engine clock.
    pub timestamp: u64,
    /// Colony the event belongs to.
    pub colony_id: ColonyId,
    /// Colony name at the time of the event.
    pub colony_name: String,
    /// Message shown to players.
    pub message: String,
    /// Event category.
    pub category: EventCategory,
}

/// Issues event ids and stamps events onto colony logs.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    next_id: u64,
    timestamp: u64,
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl EventRecorder {
    /// Recorder whose ids start after `last_id`.
    #[must_use]
    pub fn new(last_id: u64, timestamp: u64) -> Self {
        Self {
            next_id: last_id + 1,
            timestamp,
        }
    }

    /// Last id handed out.
    #[must_use]
    pub fn last_id(&self) -> u64 {
        self.next_id - 1
    }

    /// Append an event to `colony`'s pending log.
    pub fn record(&mut self, colony: &mut Colony, category: EventCategory, message: String) {
        tracing::debug!(colony = colony.id, ?category, %message, "Action event");
        let event = ActionEvent {
            id: self.next_id,
            timestamp: self.timestamp,
            colony_id: colony.id,
            colony_name: colony.name.clone(),
            message,
            category,
        };
        self.next_id += 1;
        colony.pending_events.push(event);
        colony.mark_dirty();
    }
}

/// Drain and return `colony`'s pending events.
pub fn drain(colony: &mut Colony) -> Vec<ActionEvent> {
    std::mem::take(&mut colony.pending_events)
}
