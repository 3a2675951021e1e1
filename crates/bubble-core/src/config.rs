//! Configuration for the bubble and the on-disk settings file.
//!
//! [`BubbleConfig`] is what a host hands to `Show`; it is also stored in the
//! settings file as the default used when `Show` carries no config.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{APP_NAME, BubbleState, Rgba};

const DEFAULT_BACKGROUND: Rgba = Rgba::rgb(0x1C, 0x1C, 0x1C);
const DEFAULT_IDLE: Rgba = Rgba::rgb(0xFF, 0xFF, 0xFF);
const DEFAULT_RECORDING: Rgba = Rgba::rgb(0xFF, 0x44, 0x44);
const DEFAULT_PROCESSING: Rgba = Rgba::rgb(0xFF, 0xD6, 0x33);

/// Color configuration for bubble states, as hex strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleColors {
    /// Background color. Applied once when the bubble is created.
    #[serde(default = "default_background_color")]
    pub background: String,

    /// Icon color for idle state
    #[serde(default = "default_idle_color")]
    pub idle: String,

    /// Icon color for recording state
    #[serde(default = "default_recording_color")]
    pub recording: String,

    /// Icon color for processing state
    #[serde(default = "default_processing_color")]
    pub processing: String,
}

fn default_background_color() -> String {
    DEFAULT_BACKGROUND.to_string()
}

fn default_idle_color() -> String {
    DEFAULT_IDLE.to_string()
}

fn default_recording_color() -> String {
    DEFAULT_RECORDING.to_string()
}

fn default_processing_color() -> String {
    DEFAULT_PROCESSING.to_string()
}

impl Default for BubbleColors {
    fn default() -> Self {
        Self {
            background: default_background_color(),
            idle: default_idle_color(),
            recording: default_recording_color(),
            processing: default_processing_color(),
        }
    }
}

impl BubbleColors {
    /// Parse every slot. Unparsable colors fall back to the slot's default
    /// and are reported once, here.
    pub fn resolve(&self) -> StateColors {
        StateColors {
            background: parse_or(&self.background, DEFAULT_BACKGROUND, "background"),
            idle: parse_or(&self.idle, DEFAULT_IDLE, "idle"),
            recording: parse_or(&self.recording, DEFAULT_RECORDING, "recording"),
            processing: parse_or(&self.processing, DEFAULT_PROCESSING, "processing"),
        }
    }
}

fn parse_or(hex: &str, fallback: Rgba, slot: &str) -> Rgba {
    match Rgba::from_hex(hex) {
        Ok(color) => color,
        Err(e) => {
            warn!(slot, error = %e, fallback = %fallback, "invalid bubble color");
            fallback
        }
    }
}

/// Parsed [`BubbleColors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateColors {
    pub background: Rgba,
    pub idle: Rgba,
    pub recording: Rgba,
    pub processing: Rgba,
}

impl Default for StateColors {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            idle: DEFAULT_IDLE,
            recording: DEFAULT_RECORDING,
            processing: DEFAULT_PROCESSING,
        }
    }
}

impl StateColors {
    /// The icon tint for a state.
    pub fn icon(&self, state: BubbleState) -> Rgba {
        match state {
            BubbleState::Idle => self.idle,
            BubbleState::Recording => self.recording,
            BubbleState::Processing => self.processing,
        }
    }
}

/// Per-state icon overrides, by icon name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing: Option<String>,
}

impl StateConfig {
    pub fn icon_for(&self, state: BubbleState) -> Option<&str> {
        match state {
            BubbleState::Idle => self.idle.as_deref(),
            BubbleState::Recording => self.recording.as_deref(),
            BubbleState::Processing => self.processing.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_none() && self.recording.is_none() && self.processing.is_none()
    }
}

/// Options for the floating bubble. Immutable once the overlay is created;
/// changing it requires a hide followed by a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BubbleConfig {
    /// Diameter of the bubble in dp.
    #[serde(default = "default_size")]
    pub size: f32,

    /// Initial X position of the bubble, in pixels.
    #[serde(default)]
    pub start_x: f32,

    /// Initial Y position of the bubble, in pixels.
    #[serde(default = "default_start_y")]
    pub start_y: f32,

    /// Icon name used when no per-state override is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_resource_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<BubbleColors>,

    #[serde(default, skip_serializing_if = "StateConfig::is_empty")]
    pub state_icons: StateConfig,
}

fn default_size() -> f32 {
    60.0
}

fn default_start_y() -> f32 {
    100.0
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            start_x: 0.0,
            start_y: default_start_y(),
            icon_resource_name: None,
            colors: None,
            state_icons: StateConfig::default(),
        }
    }
}

impl BubbleConfig {
    /// The configured colors, or the defaults when none were given.
    pub fn colors(&self) -> BubbleColors {
        self.colors.clone().unwrap_or_default()
    }
}

/// Screen metrics used by the headless backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: f32,
    #[serde(default = "default_screen_height")]
    pub height: f32,
    /// Pixels per dp
    #[serde(default = "default_density")]
    pub density: f32,
}

fn default_screen_width() -> f32 {
    1080.0
}

fn default_screen_height() -> f32 {
    1920.0
}

fn default_density() -> f32 {
    1.0
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
            density: default_density(),
        }
    }
}

/// Settings file contents.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Directory searched for named icons (`<name>.png`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_dir: Option<PathBuf>,

    /// Forward warnings and errors to desktop notifications
    #[serde(default, skip_serializing_if = "is_false")]
    pub notify_errors: bool,

    /// Mirror the bubble's status notification to the desktop
    #[serde(default, skip_serializing_if = "is_false")]
    pub system_notifications: bool,

    #[serde(default)]
    pub screen: ScreenConfig,

    /// Bubble config used when `Show` is called without one
    #[serde(default)]
    pub bubble: BubbleConfig,
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Manages loading and saving the settings file.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    pub fn with_config_dir<P: AsRef<Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the settings from the config file or returns default.
    pub fn load(&self) -> Result<Settings> {
        if !self.config_path.exists() {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if let Some(dir) = &settings.icon_dir {
            if !dir.is_dir() {
                warn!(icon_dir = ?dir, "Icon directory does not exist, named icons will fall back");
            }
        }

        Ok(settings)
    }

    /// Saves the settings to the config file.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(settings).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}
