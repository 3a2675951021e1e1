//! Bubble and overlay lifecycle state types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The visual state of the bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleState {
    /// Ready, waiting for the user to tap
    #[default]
    Idle,
    /// Actively capturing audio
    Recording,
    /// Transcribing the captured audio
    Processing,
}

impl BubbleState {
    pub const ALL: [BubbleState; 3] = [
        BubbleState::Idle,
        BubbleState::Recording,
        BubbleState::Processing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BubbleState::Idle => "idle",
            BubbleState::Recording => "recording",
            BubbleState::Processing => "processing",
        }
    }

    /// The (title, body) pair of the system notification shown in this state.
    pub fn notification(&self) -> (&'static str, &'static str) {
        match self {
            BubbleState::Idle => ("Floating Bubble", "Tap the bubble to interact"),
            BubbleState::Recording => ("Recording...", "Tap bubble to stop"),
            BubbleState::Processing => ("Processing...", "Transcribing your voice"),
        }
    }
}

impl fmt::Display for BubbleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bubble state: {0:?}")]
pub struct ParseStateError(pub String);

impl FromStr for BubbleState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "idle" => Ok(BubbleState::Idle),
            "recording" => Ok(BubbleState::Recording),
            "processing" => Ok(BubbleState::Processing),
            other => Err(ParseStateError(other.to_string())),
        }
    }
}

/// Lifecycle of the overlay instance.
///
/// The normal cycle is linear: Stopped → Starting → Running → Stopping →
/// Stopped. The only other edge is Starting → Stopped, taken when surface
/// creation fails and the start is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum LifecycleState {
    #[default]
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl LifecycleState {
    /// The next state in the normal cycle.
    pub fn next(self) -> Self {
        match self {
            LifecycleState::Stopped => LifecycleState::Starting,
            LifecycleState::Starting => LifecycleState::Running,
            LifecycleState::Running => LifecycleState::Stopping,
            LifecycleState::Stopping => LifecycleState::Stopped,
        }
    }

    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        self.next() == to || (self == LifecycleState::Starting && to == LifecycleState::Stopped)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(LifecycleState::Stopped),
            1 => Some(LifecycleState::Starting),
            2 => Some(LifecycleState::Running),
            3 => Some(LifecycleState::Stopping),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
