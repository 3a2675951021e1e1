//! Pointer state machine for the bubble surface.
//!
//! A press starts a [`GestureSession`] and reveals the close zone. Moves drag
//! the bubble along. On release the session resolves into exactly one of a
//! click (never dragged), a close (dropped on the close zone) or an edge
//! snap (dropped anywhere else).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CloseZone, CloseZoneGeometry, Point, Proximity};

/// Movement along either axis beyond this many pixels turns a press into a
/// drag. Once latched it stays latched for the rest of the session.
pub const DRAG_THRESHOLD: f32 = 10.0;

/// Raw pointer input in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pointer", rename_all = "lowercase")]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
    /// The platform took the pointer away mid-gesture
    Cancel,
}

/// What the overlay has to do in response to a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    ShowCloseZone,
    HideCloseZone,
    /// Toggle the close zone's near highlight
    SetNear(bool),
    /// Place the bubble's top-left corner here
    MoveBubble(Point),
    /// Animate the bubble to a screen edge
    SnapTo(Point),
    Click,
    Close,
}

/// State of one press on the bubble, alive from pointer down to pointer up.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureSession {
    initial_position: Point,
    initial_pointer: Point,
    position: Point,
    dragging: bool,
    near: bool,
}

impl GestureSession {
    fn new(position: Point, pointer: Point) -> Self {
        Self {
            initial_position: position,
            initial_pointer: pointer,
            position,
            dragging: false,
            near: false,
        }
    }

    pub fn initial_position(&self) -> Point {
        self.initial_position
    }

    pub fn initial_pointer(&self) -> Point {
        self.initial_pointer
    }

    /// Where the bubble currently is.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_near(&self) -> bool {
        self.near
    }
}

#[derive(Debug, Clone)]
pub struct GestureController {
    close_zone: CloseZone,
    /// Bubble diameter in pixels
    bubble_size: f32,
    session: Option<GestureSession>,
}

impl GestureController {
    pub fn new(close_zone: CloseZoneGeometry, bubble_size: f32) -> Self {
        Self {
            close_zone: CloseZone::new(close_zone),
            bubble_size,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    pub fn close_zone(&self) -> &CloseZone {
        &self.close_zone
    }

    pub fn bubble_radius(&self) -> f32 {
        self.bubble_size / 2.0
    }

    /// Feed one pointer event. `bubble_position` is the surface's current
    /// top-left corner and is only read on pointer down.
    pub fn handle(
        &mut self,
        event: PointerEvent,
        bubble_position: Point,
        screen_width: f32,
    ) -> Vec<GestureAction> {
        match event {
            PointerEvent::Down { x, y } => self.pointer_down(Point::new(x, y), bubble_position),
            PointerEvent::Move { x, y } => self.pointer_move(Point::new(x, y)),
            PointerEvent::Up { .. } => self.pointer_up(screen_width, true),
            PointerEvent::Cancel => self.pointer_up(screen_width, false),
        }
    }

    fn pointer_down(&mut self, pointer: Point, bubble_position: Point) -> Vec<GestureAction> {
        let mut actions = Vec::new();
        // A press without a matching release replaces the stale session.
        if self.close_zone.set_near(false) {
            actions.push(GestureAction::SetNear(false));
        }
        if self.close_zone.reveal() {
            actions.push(GestureAction::ShowCloseZone);
        }
        self.session = Some(GestureSession::new(bubble_position, pointer));
        actions
    }

    fn pointer_move(&mut self, pointer: Point) -> Vec<GestureAction> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };

        let delta = pointer - session.initial_pointer;
        if !session.dragging && delta.max_axis() > DRAG_THRESHOLD {
            session.dragging = true;
        }

        session.position = session.initial_position + delta;
        let mut actions = vec![GestureAction::MoveBubble(session.position)];

        let radius = self.bubble_size / 2.0;
        let center = session.position + Point::new(radius, radius);
        let near = self.close_zone.geometry().proximity(center, radius) != Proximity::Far;
        if near != session.near {
            session.near = near;
            if self.close_zone.set_near(near) {
                actions.push(GestureAction::SetNear(near));
            }
        }

        actions
    }

    /// Ends the session. A cancelled session never clicks or closes.
    fn pointer_up(&mut self, screen_width: f32, released: bool) -> Vec<GestureAction> {
        let Some(session) = self.session.take() else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        if self.close_zone.set_near(false) {
            actions.push(GestureAction::SetNear(false));
        }
        if self.close_zone.conceal() {
            actions.push(GestureAction::HideCloseZone);
        }

        if !session.dragging {
            if released {
                debug!("gesture resolved to click");
                actions.push(GestureAction::Click);
            }
            return actions;
        }

        let radius = self.bubble_size / 2.0;
        let center = session.position + Point::new(radius, radius);
        let proximity = self.close_zone.geometry().proximity(center, radius);
        if released && proximity == Proximity::Activated {
            debug!("gesture resolved to close");
            actions.push(GestureAction::Close);
        } else {
            let target = snap_target(session.position, self.bubble_size, screen_width);
            debug!(x = target.x, y = target.y, "gesture resolved to edge snap");
            actions.push(GestureAction::SnapTo(target));
        }
        actions
    }
}

/// The edge the bubble settles on after a drag: left when its center is left
/// of the screen's midline, right otherwise. Height is kept.
pub fn snap_target(position: Point, bubble_size: f32, screen_width: f32) -> Point {
    let center_x = position.x + bubble_size / 2.0;
    let x = if center_x < screen_width / 2.0 {
        0.0
    } else {
        screen_width - bubble_size
    };
    Point::new(x, position.y)
}
