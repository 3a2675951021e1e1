//! JSON messages exchanged with a host over the bridge.

use std::fmt;

use bubble_core::{BubbleConfig, BubbleEvent};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Requests sent from a host
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Request {
    ShowBubble {
        #[serde(default)]
        options: Option<BubbleConfig>,
    },
    HideBubble,
    IsBubbleVisible,
    RequestOverlayPermission,
    HasOverlayPermission,
    /// `state` stays a string here so unknown names can be reported
    SetBubbleState { state: String },
    /// Superseded by `setBubbleState`
    SetRecording { recording: bool },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityResponse {
    pub visible: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionResponse {
    pub granted: bool,
}

/// Failed requests answer with `{"error": "<message>"}`.
pub fn error_response(message: impl fmt::Display) -> Value {
    json!({ "error": message.to_string() })
}

/// An event pushed to a host without a request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    pub event: String,
    pub payload: BubbleEvent,
}

impl From<BubbleEvent> for EventMessage {
    fn from(payload: BubbleEvent) -> Self {
        Self {
            event: payload.name().to_string(),
            payload,
        }
    }
}
