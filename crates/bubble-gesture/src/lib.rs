//! Gesture handling for the bubble.
//!
//! Everything in here is pure: the controller consumes pointer events and
//! answers with [`GestureAction`]s for the overlay to apply to its surfaces.

mod close_zone;
mod controller;
mod geometry;

pub use close_zone::{CloseZone, CloseZoneFeedback};
pub use controller::{
    DRAG_THRESHOLD, GestureAction, GestureController, GestureSession, PointerEvent, snap_target,
};
pub use geometry::{
    ACTIVATION_FACTOR, CLOSE_ZONE_BOTTOM_MARGIN_DP, CLOSE_ZONE_SIZE_DP, CloseZoneGeometry,
    PREVIEW_FACTOR, Point, Proximity, Screen,
};
