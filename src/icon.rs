//! Bubble icons.
//!
//! An icon is picked per state through a fallback chain: the state's own
//! override, then the config's default icon, then a built-in microphone
//! glyph. A name that fails to load falls through to the next tier, so
//! resolution itself never fails.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bubble_core::{BubbleConfig, BubbleState, Rgba};
use image::imageops::FilterType;
use image::{ImageError, RgbaImage};
use thiserror::Error;
use tracing::warn;

/// Share of the bubble's diameter taken by the icon.
const ICON_SCALE: f32 = 0.6;

#[derive(Debug, Error)]
pub enum IconError {
    #[error("no icon directory configured")]
    NoIconDir,
    #[error("icon name {0:?} is not a plain file name")]
    InvalidName(String),
    #[error("icon not found at {0:?}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Decode(#[from] ImageError),
}

/// Which tier of the fallback chain an icon came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// Per-state override
    Override(String),
    /// The config's default icon
    Default(String),
    Builtin,
}

impl fmt::Display for IconSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconSource::Override(name) => write!(f, "override:{name}"),
            IconSource::Default(name) => write!(f, "default:{name}"),
            IconSource::Builtin => f.write_str("builtin"),
        }
    }
}

/// A tinted, ready to draw icon.
#[derive(Debug, Clone)]
pub struct Icon {
    source: IconSource,
    tint: Rgba,
    image: RgbaImage,
}

impl Icon {
    pub fn source(&self) -> &IconSource {
        &self.source
    }

    pub fn tint(&self) -> Rgba {
        self.tint
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Pixel size of the icon drawn inside a bubble of `bubble_size` pixels.
pub fn icon_size(bubble_size: f32) -> u32 {
    ((bubble_size * ICON_SCALE).round() as u32).max(1)
}

/// Loads named icons as `<dir>/<name>.png`, remembering both hits and misses.
pub struct IconResolver {
    dir: Option<PathBuf>,
    cache: HashMap<String, Option<RgbaImage>>,
}

impl IconResolver {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            cache: HashMap::new(),
        }
    }

    pub fn load(&self, name: &str) -> Result<RgbaImage, IconError> {
        let dir = self.dir.as_deref().ok_or(IconError::NoIconDir)?;
        if !is_plain_name(name) {
            return Err(IconError::InvalidName(name.to_string()));
        }
        let path = icon_path(dir, name);
        if !path.is_file() {
            return Err(IconError::NotFound(path));
        }
        Ok(image::open(&path)?.into_rgba8())
    }

    fn lookup(&mut self, name: &str) -> Option<RgbaImage> {
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }
        let loaded = match self.load(name) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(icon = name, error = %e, "Failed to load bubble icon, falling back");
                None
            }
        };
        self.cache.insert(name.to_string(), loaded.clone());
        loaded
    }

    /// Resolve the icon for `state`, tinted with `tint` and sized for an icon
    /// of `size` pixels.
    pub fn resolve(
        &mut self,
        state: BubbleState,
        config: &BubbleConfig,
        tint: Rgba,
        size: u32,
    ) -> Icon {
        let candidates = [
            config
                .state_icons
                .icon_for(state)
                .map(|name| IconSource::Override(name.to_string())),
            config
                .icon_resource_name
                .as_deref()
                .map(|name| IconSource::Default(name.to_string())),
        ];

        for source in candidates.into_iter().flatten() {
            let name = match &source {
                IconSource::Override(name) | IconSource::Default(name) => name.as_str(),
                IconSource::Builtin => continue,
            };
            if let Some(image) = self.lookup(name) {
                let image = image::imageops::resize(&image, size, size, FilterType::Triangle);
                return Icon {
                    source,
                    tint,
                    image: recolor(image, tint),
                };
            }
        }

        Icon {
            source: IconSource::Builtin,
            tint,
            image: recolor(builtin_glyph(size), tint),
        }
    }
}

/// Names come from hosts and must stay inside the icon directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

fn icon_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.png"))
}

/// Paint every visible pixel with `color`, keeping the shape's alpha.
fn recolor(mut image: RgbaImage, color: Rgba) -> RgbaImage {
    for pixel in image.pixels_mut() {
        if pixel[3] == 0 {
            continue;
        }
        pixel[0] = color.r;
        pixel[1] = color.g;
        pixel[2] = color.b;
        pixel[3] = ((u16::from(pixel[3]) * u16::from(color.a)) / 255) as u8;
    }
    image
}

/// A microphone: capsule body, pickup arc, stem and base.
fn builtin_glyph(size: u32) -> RgbaImage {
    let s = size as f32;
    RgbaImage::from_fn(size, size, |x, y| {
        // sample at pixel centers, normalized to 0..1
        let u = (x as f32 + 0.5) / s;
        let v = (y as f32 + 0.5) / s;

        let body = {
            let (cx, top, bottom, r) = (0.5, 0.28, 0.48, 0.14);
            let dy = if v < top {
                v - top
            } else if v > bottom {
                v - bottom
            } else {
                0.0
            };
            (u - cx).hypot(dy) <= r
        };
        let arc = {
            let d = (u - 0.5).hypot(v - 0.48);
            v >= 0.48 && (0.22..=0.28).contains(&d)
        };
        let stem = (u - 0.5).abs() <= 0.03 && (0.76..=0.88).contains(&v);
        let base = (u - 0.5).abs() <= 0.16 && (0.86..=0.9).contains(&v);

        if body || arc || stem || base {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    })
}
