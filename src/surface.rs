//! The platform seam. A [`Platform`] creates the two overlay surfaces and
//! posts the status notification; everything it hands out is owned and
//! touched by the UI loop only, so none of it needs to be `Send`.

use async_trait::async_trait;
use bubble_core::Rgba;
use bubble_gesture::{CloseZoneFeedback, CloseZoneGeometry, Point, Screen};
use thiserror::Error;

use crate::icon::Icon;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("failed to create {surface} surface: {reason}")]
    Create {
        surface: &'static str,
        reason: String,
    },
    #[error("failed to update {surface} surface: {reason}")]
    Update {
        surface: &'static str,
        reason: String,
    },
    #[error("failed to remove {surface} surface: {reason}")]
    Remove {
        surface: &'static str,
        reason: String,
    },
}

/// Everything needed to put the bubble on screen.
#[derive(Debug, Clone)]
pub struct NewBubble {
    /// Top-left corner in pixels
    pub position: Point,
    /// Diameter in pixels
    pub size: f32,
    pub background: Rgba,
    pub icon: Icon,
}

#[derive(Debug, Clone, Copy)]
pub struct NewCloseZone {
    pub geometry: CloseZoneGeometry,
}

pub trait BubbleSurface {
    /// Top-left corner in pixels.
    fn position(&self) -> Point;

    fn set_position(&mut self, position: Point) -> Result<(), SurfaceError>;

    /// Move to a screen edge after a drag. Backends that can animate should.
    fn snap_to(&mut self, target: Point) -> Result<(), SurfaceError> {
        self.set_position(target)
    }

    fn set_icon(&mut self, icon: &Icon) -> Result<(), SurfaceError>;

    fn remove(self: Box<Self>) -> Result<(), SurfaceError>;
}

pub trait CloseZoneSurface {
    /// Starts out [`CloseZoneFeedback::Hidden`].
    fn set_feedback(&mut self, feedback: CloseZoneFeedback) -> Result<(), SurfaceError>;

    fn remove(self: Box<Self>) -> Result<(), SurfaceError>;
}

#[async_trait(?Send)]
pub trait Platform {
    fn screen(&self) -> Screen;

    async fn create_close_zone(
        &self,
        desc: NewCloseZone,
    ) -> Result<Box<dyn CloseZoneSurface>, SurfaceError>;

    async fn create_bubble(&self, desc: NewBubble) -> Result<Box<dyn BubbleSurface>, SurfaceError>;

    /// Create or replace the status notification that accompanies the overlay.
    fn post_notification(&self, title: &str, body: &str);

    fn dismiss_notification(&self) {}
}
