// Re-export from sub-crates
pub use bubble_core::{
    APP_NAME, APP_NAME_PRETTY, BubbleConfig, BubbleEvent, BubbleState, ConfigManager,
    DEFAULT_LOG_LEVEL, LifecycleState, Settings,
};
pub use bubble_gesture::{PointerEvent, Screen};

pub mod bridge;
pub mod event;
pub mod headless;
pub mod hub;
pub mod icon;
pub mod lifecycle;
pub mod machine;
pub mod notify;
pub mod permission;
pub mod protocol;
pub mod surface;
pub mod ui;

pub use bridge::{BridgeError, CommandBridge, OverlayRuntime};
pub use lifecycle::OverlayOptions;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
