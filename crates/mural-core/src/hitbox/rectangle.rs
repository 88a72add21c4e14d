//! Rectangle hitbox.

use super::{GeometryError, HitboxShape, extent, finite, rotate_point};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in its own unrotated frame, plus the rotation
/// accumulated since construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Left edge before rotation.
    pub x: f64,
    /// Top edge before rotation.
    pub y: f64,
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
    /// Rotation in radians about the local origin.
    #[serde(default)]
    pub rotation: f64,
}

impl Rectangle {
    /// Create a rectangle with its top-left corner on the local origin.
    pub fn new(width: f64, height: f64) -> Result<Self, GeometryError> {
        Self::at(0.0, 0.0, width, height)
    }

    /// Create a rectangle with its top-left corner at `(x, y)`.
    pub fn at(x: f64, y: f64, width: f64, height: f64) -> Result<Self, GeometryError> {
        let rect = Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
        };
        rect.validate()?;
        Ok(rect)
    }

    /// Get the unrotated bounds as a kurbo Rect.
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

impl HitboxShape for Rectangle {
    fn contains(&self, point: Point) -> bool {
        let local = rotate_point(point, -self.rotation);
        // Both edges are excluded.
        local.x > self.x
            && local.x < self.x + self.width
            && local.y > self.y
            && local.y < self.y + self.height
    }

    fn rotate(&mut self, radians: f64) {
        self.rotation += radians;
    }

    fn scale(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
        self.width *= factor;
        self.height *= factor;
    }

    fn validate(&self) -> Result<(), GeometryError> {
        finite("rectangle x", self.x)?;
        finite("rectangle y", self.y)?;
        finite("rectangle rotation", self.rotation)?;
        extent("rectangle width", self.width)?;
        extent("rectangle height", self.height)?;
        Ok(())
    }
}
