//! Events delivered from the bubble to host subscribers.

use serde::{Deserialize, Serialize};

/// Event name for taps on the bubble.
pub const CLICK_EVENT: &str = "bubble-click";

/// Event name for the bubble being dismissed through the close zone.
pub const CLOSED_EVENT: &str = "bubble-closed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Click,
    Closed,
}

/// Payload of a bubble event, serialized as `{"action":"click"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BubbleEvent {
    pub action: EventAction,
}

impl BubbleEvent {
    pub fn click() -> Self {
        Self {
            action: EventAction::Click,
        }
    }

    pub fn closed() -> Self {
        Self {
            action: EventAction::Closed,
        }
    }

    /// The name hosts subscribe to for this event.
    pub fn name(&self) -> &'static str {
        match self.action {
            EventAction::Click => CLICK_EVENT,
            EventAction::Closed => CLOSED_EVENT,
        }
    }
}
