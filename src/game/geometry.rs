//! Arena geometry. Screen coordinates: x grows right, y grows down.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Open-interval overlap with a circle's horizontal extent
    pub fn overlaps_x(&self, center_x: f32, radius: f32) -> bool {
        center_x + radius > self.left() && center_x - radius < self.right()
    }

    /// Open-interval overlap with a circle's vertical extent
    pub fn overlaps_y(&self, center_y: f32, radius: f32) -> bool {
        center_y + radius > self.top() && center_y - radius < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_follow_top_left_anchor() {
        let r = Rect::new(10.0, 20.0, 30.0, 5.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.bottom(), 25.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let r = Rect::new(100.0, 100.0, 50.0, 10.0);
        // circle resting exactly on the top surface
        assert!(!r.overlaps_y(88.0, 12.0));
        assert!(r.overlaps_y(89.0, 12.0));
        // circle flush against the left side
        assert!(!r.overlaps_x(88.0, 12.0));
        assert!(r.overlaps_x(90.0, 12.0));
    }
}
