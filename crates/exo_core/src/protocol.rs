//! Messages handed to the transport layer.
//!
//! The engine only builds these values; sending them is the caller's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::colony::Colony;
use crate::components::ColonyId;
use crate::events::ActionEvent;

/// One broadcast message, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Changed top-level fields of one colony.
    Update {
        /// Colony the changes belong to.
        #[serde(rename = "colonyId")]
        colony_id: ColonyId,
        /// Field name to new value.
        changes: Map<String, Value>,
    },
    /// One action log entry.
    Action {
        /// The event.
        event: ActionEvent,
    },
    /// Every colony shares one owner.
    GameOver {
        /// Winning owner id.
        winner: ColonyId,
    },
    /// Full state, sent to new clients.
    Snapshot {
        /// Every colony.
        colonies: Vec<Value>,
    },
}

impl ServerMessage {
    /// Snapshot of `colonies`.
    ///
    /// A colony that fails to serialize is left out.
    #[must_use]
    pub fn snapshot<'a>(colonies: impl IntoIterator<Item = &'a Colony>) -> Self {
        let colonies = colonies
            .into_iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect();
        Self::Snapshot { colonies }
    }

    /// JSON text of the message.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventCategory;

    #[test]
    fn test_message_tags() {
        let mut changes = Map::new();
        changes.insert("hp".into(), Value::from(10.0));
        let update = ServerMessage::Update { colony_id: 3, changes };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "update");
        assert_eq!(json["colonyId"], 3);
        assert_eq!(json["changes"]["hp"], 10.0);

        let over = serde_json::to_value(ServerMessage::GameOver { winner: 1 }).unwrap();
        assert_eq!(over["type"], "game_over");
        assert_eq!(over["winner"], 1);
    }

    #[test]
    fn test_action_round_trips() {
        let message = ServerMessage::Action {
            event: ActionEvent {
                id: 1,
                timestamp: 2000,
                colony_id: 4,
                colony_name: "Colony 4".into(),
                message: "Built a Steel Factory".into(),
                category: EventCategory::Build,
            },
        };
        let text = message.to_json().unwrap();
        assert!(text.contains("\"colonyName\":\"Colony 4\""));
        let back: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_snapshot_lists_colonies() {
        let colonies = [Colony::named(1, "A"), Colony::named(2, "B")];
        let ServerMessage::Snapshot { colonies } = ServerMessage::snapshot(&colonies) else {
            panic!("expected snapshot");
        };
        assert_eq!(colonies.len(), 2);
        assert_eq!(colonies[1]["name"], "B");
    }
}
