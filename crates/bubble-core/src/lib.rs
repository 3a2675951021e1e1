//! Core types and configuration for bubble.
//!
//! This crate provides platform-agnostic types that can be used across
//! all bubble sub-crates and by hosts talking to the overlay.

mod color;
mod config;
mod event;
mod state;

pub use color::{ColorError, Rgba};
pub use config::{
    BubbleColors, BubbleConfig, ConfigManager, ScreenConfig, Settings, StateColors, StateConfig,
};
pub use event::{BubbleEvent, CLICK_EVENT, CLOSED_EVENT, EventAction};
pub use state::{BubbleState, LifecycleState, ParseStateError};

/// Application name
pub const APP_NAME: &str = "bubble";

/// Pretty application name for display
pub const APP_NAME_PRETTY: &str = "Floating Bubble";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";
