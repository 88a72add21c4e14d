//! Capsule-shaped hitbox around a line segment.

use super::{GeometryError, HitboxShape, finite, finite_point, point_to_segment_dist, rotate_point};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A line segment with a stroke width and round caps at both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundedLine {
    /// Start point.
    pub start: Point,
    /// End point.
    pub end: Point,
    /// Full stroke width.
    pub width: f64,
}

impl RoundedLine {
    pub fn new(start: Point, end: Point, width: f64) -> Result<Self, GeometryError> {
        let line = Self { start, end, width };
        line.validate()?;
        Ok(line)
    }

    /// Get the length of the segment.
    pub fn length(&self) -> f64 {
        (self.end - self.start).hypot()
    }
}

impl HitboxShape for RoundedLine {
    fn contains(&self, point: Point) -> bool {
        point_to_segment_dist(point, self.start, self.end) <= self.width / 2.0
    }

    fn rotate(&mut self, radians: f64) {
        self.start = rotate_point(self.start, radians);
        self.end = rotate_point(self.end, radians);
    }

    fn scale(&mut self, factor: f64) {
        self.start = Point::new(self.start.x * factor, self.start.y * factor);
        self.end = Point::new(self.end.x * factor, self.end.y * factor);
        self.width *= factor;
    }

    fn validate(&self) -> Result<(), GeometryError> {
        finite_point("line start", self.start)?;
        finite_point("line end", self.end)?;
        if finite("line width", self.width)? <= 0.0 {
            return Err(GeometryError::NonPositiveWidth);
        }
        Ok(())
    }
}
