//! Change tracking for transport updates.
//!
//! A colony is serialized to a JSON object and compared key by key with the
//! object last handed out. Only top-level fields are compared; a change
//! anywhere inside `planet` resends the whole planet.

use serde_json::{Map, Value};

use crate::colony::Colony;

/// Dirty flag plus the last snapshot returned to the transport.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    dirty: bool,
    previous: Option<Map<String, Value>>,
}

impl ChangeTracker {
    /// Tracker for a colony that has never been read.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dirty: true,
            previous: None,
        }
    }

    /// Flag the colony as possibly changed.
    pub fn mark(&mut self) {
        self.dirty = true;
    }

    /// Whether a change has been flagged since the last read.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Top-level fields of `colony` that differ from the last read.
///
/// Returns `None` when nothing changed. Always clears the dirty flag.
pub fn get_changes(colony: &mut Colony) -> Option<Map<String, Value>> {
    if !colony.tracker.dirty {
        return None;
    }
    colony.tracker.dirty = false;

    let current = match serde_json::to_value(&*colony) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!(colony = colony.id, error = %e, "Failed to serialize colony");
            return None;
        }
    };

    let changes: Map<String, Value> = match &colony.tracker.previous {
        None => current.clone(),
        Some(previous) => current
            .iter()
            .filter(|(key, value)| previous.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    };
    colony.tracker.previous = Some(current);

    if changes.is_empty() {
        None
    } else {
        Some(changes)
    }
}
