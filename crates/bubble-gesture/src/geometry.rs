use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Drop distance, relative to the sum of both radii, below which the bubble
/// is dismissed.
pub const ACTIVATION_FACTOR: f32 = 0.7;

/// Distance, relative to the sum of both radii, below which the close zone
/// shows its "near" feedback. Wider than [`ACTIVATION_FACTOR`] so the user
/// sees the warning before a drop would dismiss.
pub const PREVIEW_FACTOR: f32 = 1.2;

pub const CLOSE_ZONE_SIZE_DP: f32 = 80.0;
pub const CLOSE_ZONE_BOTTOM_MARGIN_DP: f32 = 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Chebyshev length, the largest axis component.
    pub fn max_axis(self) -> f32 {
        self.x.abs().max(self.y.abs())
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Display metrics. Sizes are in pixels; `density` is pixels per dp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Screen {
    pub width: f32,
    pub height: f32,
    pub density: f32,
}

impl Screen {
    pub fn new(width: f32, height: f32, density: f32) -> Self {
        Self {
            width,
            height,
            density,
        }
    }

    pub fn dp(&self, dp: f32) -> f32 {
        dp * self.density
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// Outside the preview radius, no feedback
    Far,
    /// Within the preview radius, the close zone highlights
    Near,
    /// Within the activation radius, a drop here dismisses
    Activated,
}

/// Where the close target sits and how close the bubble has to get.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseZoneGeometry {
    pub center: Point,
    pub radius: f32,
}

impl CloseZoneGeometry {
    pub fn new(center: Point, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Centered horizontally, resting above the bottom edge of the screen.
    pub fn for_screen(screen: &Screen) -> Self {
        let radius = screen.dp(CLOSE_ZONE_SIZE_DP) / 2.0;
        let center = Point::new(
            screen.width / 2.0,
            screen.height - screen.dp(CLOSE_ZONE_BOTTOM_MARGIN_DP) - radius,
        );
        Self { center, radius }
    }

    pub fn size(&self) -> f32 {
        self.radius * 2.0
    }

    /// Top-left corner of the square surface hosting the zone.
    pub fn origin(&self) -> Point {
        Point::new(self.center.x - self.radius, self.center.y - self.radius)
    }

    pub fn activation_distance(&self, bubble_radius: f32) -> f32 {
        ACTIVATION_FACTOR * (bubble_radius + self.radius)
    }

    pub fn preview_distance(&self, bubble_radius: f32) -> f32 {
        PREVIEW_FACTOR * (bubble_radius + self.radius)
    }

    pub fn proximity(&self, bubble_center: Point, bubble_radius: f32) -> Proximity {
        let distance = bubble_center.distance_to(self.center);
        if distance < self.activation_distance(bubble_radius) {
            Proximity::Activated
        } else if distance < self.preview_distance(bubble_radius) {
            Proximity::Near
        } else {
            Proximity::Far
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> CloseZoneGeometry {
        CloseZoneGeometry::new(Point::new(500.0, 1500.0), 40.0)
    }

    #[test]
    fn test_thresholds_scale_with_both_radii() {
        let zone = zone();
        assert!((zone.activation_distance(30.0) - 49.0).abs() < 1e-4);
        assert!((zone.preview_distance(30.0) - 84.0).abs() < 1e-4);
    }

    #[test]
    fn test_proximity_bands() {
        let zone = zone();
        let at = |d: f32| zone.proximity(Point::new(500.0 + d, 1500.0), 30.0);

        assert_eq!(at(48.0), Proximity::Activated);
        assert_eq!(at(49.0), Proximity::Near);
        assert_eq!(at(60.0), Proximity::Near);
        assert_eq!(at(83.0), Proximity::Near);
        assert_eq!(at(85.0), Proximity::Far);
        assert_eq!(at(100.0), Proximity::Far);
    }

    #[test]
    fn test_proximity_is_euclidean() {
        // 36-48 triangle, hypotenuse 60
        let zone = zone();
        let center = Point::new(500.0 + 36.0, 1500.0 - 48.0);
        assert_eq!(zone.proximity(center, 30.0), Proximity::Near);
    }

    #[test]
    fn test_for_screen_placement() {
        let screen = Screen::new(1080.0, 1920.0, 2.0);
        let zone = CloseZoneGeometry::for_screen(&screen);
        assert_eq!(zone.radius, 80.0);
        assert_eq!(zone.center, Point::new(540.0, 1920.0 - 96.0 - 80.0));
        assert_eq!(zone.origin(), Point::new(460.0, 1664.0));
        assert_eq!(zone.size(), 160.0);
    }

    #[test]
    fn test_point_ops() {
        let a = Point::new(3.0, -4.0);
        assert_eq!(a.distance_to(Point::default()), 5.0);
        assert_eq!(a.max_axis(), 4.0);
        assert_eq!(a + Point::new(1.0, 1.0), Point::new(4.0, -3.0));
        assert_eq!(a - Point::new(1.0, 1.0), Point::new(2.0, -5.0));
    }
}
