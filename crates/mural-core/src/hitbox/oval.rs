//! Oval hitbox.

use super::{GeometryError, HitboxShape, extent, finite, finite_point, rotate_point};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// An axis-aligned ellipse in its own unrotated frame, plus accumulated rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oval {
    /// Centre point before rotation.
    pub center: Point,
    /// Horizontal radius.
    pub radius_x: f64,
    /// Vertical radius.
    pub radius_y: f64,
    /// Rotation in radians about the local origin.
    #[serde(default)]
    pub rotation: f64,
}

impl Oval {
    pub fn new(center: Point, radius_x: f64, radius_y: f64) -> Result<Self, GeometryError> {
        let oval = Self {
            center,
            radius_x,
            radius_y,
            rotation: 0.0,
        };
        oval.validate()?;
        Ok(oval)
    }
}

impl HitboxShape for Oval {
    fn contains(&self, point: Point) -> bool {
        if self.radius_x <= 0.0 || self.radius_y <= 0.0 {
            return false;
        }
        let local = rotate_point(point, -self.rotation);
        let dx = (local.x - self.center.x) / self.radius_x;
        let dy = (local.y - self.center.y) / self.radius_y;
        dx * dx + dy * dy <= 1.0
    }

    fn rotate(&mut self, radians: f64) {
        self.rotation += radians;
    }

    fn scale(&mut self, factor: f64) {
        self.center = Point::new(self.center.x * factor, self.center.y * factor);
        self.radius_x *= factor;
        self.radius_y *= factor;
    }

    fn validate(&self) -> Result<(), GeometryError> {
        finite_point("oval center", self.center)?;
        finite("oval rotation", self.rotation)?;
        extent("oval radius_x", self.radius_x)?;
        extent("oval radius_y", self.radius_y)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_oval_contains() {
        let oval = Oval::new(Point::ZERO, 30.0, 10.0).unwrap();
        assert!(oval.contains(Point::ZERO));
        assert!(oval.contains(Point::new(29.0, 0.0)));
        assert!(!oval.contains(Point::new(0.0, 11.0)));
        assert!(!oval.contains(Point::new(25.0, 8.0)));
    }

    #[test]
    fn test_rotated_oval() {
        let mut oval = Oval::new(Point::ZERO, 30.0, 10.0).unwrap();
        oval.rotate(FRAC_PI_2);
        assert!(oval.contains(Point::new(0.0, 29.0)));
        assert!(!oval.contains(Point::new(29.0, 0.0)));
    }

    #[test]
    fn test_degenerate_oval_contains_nothing() {
        let oval = Oval::new(Point::ZERO, 0.0, 10.0).unwrap();
        assert!(!oval.contains(Point::ZERO));
    }
}
