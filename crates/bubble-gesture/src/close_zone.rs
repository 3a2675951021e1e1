//! Visual feedback state of the close target.

use crate::CloseZoneGeometry;

/// Scale applied to the close zone while the bubble hovers near it.
const NEAR_SCALE: f32 = 1.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseZoneFeedback {
    #[default]
    Hidden,
    /// Visible at rest, shown for the whole drag
    Shown,
    /// Enlarged and highlighted, the bubble is close
    Near,
}

impl CloseZoneFeedback {
    pub fn scale(&self) -> f32 {
        match self {
            CloseZoneFeedback::Near => NEAR_SCALE,
            _ => 1.0,
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, CloseZoneFeedback::Hidden)
    }
}

/// The close target: fixed geometry plus its current feedback state.
///
/// Setters report whether anything changed so callers only touch the
/// surface on edge transitions.
#[derive(Debug, Clone)]
pub struct CloseZone {
    geometry: CloseZoneGeometry,
    feedback: CloseZoneFeedback,
}

impl CloseZone {
    pub fn new(geometry: CloseZoneGeometry) -> Self {
        Self {
            geometry,
            feedback: CloseZoneFeedback::Hidden,
        }
    }

    pub fn geometry(&self) -> &CloseZoneGeometry {
        &self.geometry
    }

    pub fn feedback(&self) -> CloseZoneFeedback {
        self.feedback
    }

    pub fn reveal(&mut self) -> bool {
        self.transition(CloseZoneFeedback::Shown)
    }

    pub fn conceal(&mut self) -> bool {
        self.transition(CloseZoneFeedback::Hidden)
    }

    /// Toggle the near highlight. Ignored while hidden.
    pub fn set_near(&mut self, near: bool) -> bool {
        match (self.feedback, near) {
            (CloseZoneFeedback::Shown, true) => self.transition(CloseZoneFeedback::Near),
            (CloseZoneFeedback::Near, false) => self.transition(CloseZoneFeedback::Shown),
            _ => false,
        }
    }

    fn transition(&mut self, to: CloseZoneFeedback) -> bool {
        let changed = self.feedback != to;
        self.feedback = to;
        changed
    }
}
