//! Outbound Commands
//!
//! Abstract records for an external transport. The core picks the kind and
//! fills a JSON payload; the wire format belongs to whoever sends it.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::vec2::Vec2;

/// Command kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// The controlled ship moved
    PlayerMove,
    /// The session is ending
    Quit,
}

/// One outbound command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundCommand {
    /// Kind
    pub kind: CommandKind,
    /// Kind-specific payload
    pub payload: serde_json::Value,
}

impl OutboundCommand {
    /// Player moved to `position` facing `rotation`.
    pub fn player_move(position: Vec2, rotation: f32) -> Self {
        Self {
            kind: CommandKind::PlayerMove,
            payload: json!({ "x": position.x, "y": position.y, "rotation": rotation }),
        }
    }

    /// Session quit.
    pub fn quit(reason: &str) -> Self {
        Self {
            kind: CommandKind::Quit,
            payload: json!({ "reason": reason }),
        }
    }
}
