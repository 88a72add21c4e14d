//! Circle hitbox.

use super::{GeometryError, HitboxShape, extent, finite_point, rotate_point};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A circle; the centre is stored in the rotated frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Centre point.
    pub center: Point,
    /// Radius.
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Result<Self, GeometryError> {
        let circle = Self { center, radius };
        circle.validate()?;
        Ok(circle)
    }
}

impl HitboxShape for Circle {
    fn contains(&self, point: Point) -> bool {
        let dx = point.x - self.center.x;
        let dy = point.y - self.center.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }

    fn rotate(&mut self, radians: f64) {
        self.center = rotate_point(self.center, radians);
    }

    fn scale(&mut self, factor: f64) {
        self.center = Point::new(self.center.x * factor, self.center.y * factor);
        self.radius *= factor;
    }

    fn validate(&self) -> Result<(), GeometryError> {
        finite_point("circle center", self.center)?;
        extent("circle radius", self.radius)?;
        Ok(())
    }
}
