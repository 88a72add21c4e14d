//! Hitbox shapes used for point-containment queries.
//!
//! Every hitbox lives in a frame local to its owning entity's untransformed
//! origin. Callers subtract the entity's translation before asking whether a
//! point is contained; rotation and scale are folded into the shape itself via
//! [`HitboxShape::rotate`] and [`HitboxShape::scale`].

mod circle;
mod oval;
mod polygon;
mod rectangle;
mod rounded_line;

pub use circle::Circle;
pub use oval::Oval;
pub use polygon::Polygon;
pub use rectangle::Rectangle;
pub use rounded_line::RoundedLine;

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing a hitbox.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Polygon must consist of at least 3 points, got {0}")]
    TooFewVertices(usize),
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
    #[error("{0} must not be negative")]
    Negative(&'static str),
    #[error("Line width must be positive")]
    NonPositiveWidth,
    #[error("Scale must be positive, got {0}")]
    NonPositiveScale(f64),
}

/// Reject NaN and infinities.
pub(crate) fn finite(name: &'static str, value: f64) -> Result<f64, GeometryError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GeometryError::NonFinite(name))
    }
}

/// Reject non-finite and negative values.
pub(crate) fn extent(name: &'static str, value: f64) -> Result<f64, GeometryError> {
    let value = finite(name, value)?;
    if value < 0.0 {
        return Err(GeometryError::Negative(name));
    }
    Ok(value)
}

pub(crate) fn finite_point(name: &'static str, point: Point) -> Result<Point, GeometryError> {
    finite(name, point.x)?;
    finite(name, point.y)?;
    Ok(point)
}

/// Rotate a point about the local origin.
pub(crate) fn rotate_point(point: Point, radians: f64) -> Point {
    Affine::rotate(radians) * point
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Common behaviour of all hitbox shapes.
pub trait HitboxShape {
    /// Check if a point in the owner's local frame lies inside the shape.
    fn contains(&self, point: Point) -> bool;

    /// Rotate the shape about the local origin.
    fn rotate(&mut self, radians: f64);

    /// Scale the shape about the local origin.
    fn scale(&mut self, factor: f64);

    /// Check that every stored parameter is usable.
    fn validate(&self) -> Result<(), GeometryError>;
}

/// An entity that answers point-containment queries in world coordinates.
pub trait Hittable {
    fn hitbox(&self) -> Option<&Hitbox>;

    /// World position of the hitbox's local origin.
    fn origin(&self) -> Point;

    fn contains_point(&self, point: Point) -> bool {
        let local = (point - self.origin()).to_point();
        self.hitbox().is_some_and(|hitbox| hitbox.contains(local))
    }
}

/// Enum wrapper for all hitbox variants (for serialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Hitbox {
    Rectangle(Rectangle),
    Circle(Circle),
    Oval(Oval),
    Polygon(Polygon),
    RoundedLine(RoundedLine),
}

impl Hitbox {
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Hitbox::Rectangle(s) => s.contains(point),
            Hitbox::Circle(s) => s.contains(point),
            Hitbox::Oval(s) => s.contains(point),
            Hitbox::Polygon(s) => s.contains(point),
            Hitbox::RoundedLine(s) => s.contains(point),
        }
    }

    pub fn rotate(&mut self, radians: f64) {
        match self {
            Hitbox::Rectangle(s) => s.rotate(radians),
            Hitbox::Circle(s) => s.rotate(radians),
            Hitbox::Oval(s) => s.rotate(radians),
            Hitbox::Polygon(s) => s.rotate(radians),
            Hitbox::RoundedLine(s) => s.rotate(radians),
        }
    }

    pub fn scale(&mut self, factor: f64) {
        match self {
            Hitbox::Rectangle(s) => s.scale(factor),
            Hitbox::Circle(s) => s.scale(factor),
            Hitbox::Oval(s) => s.scale(factor),
            Hitbox::Polygon(s) => s.scale(factor),
            Hitbox::RoundedLine(s) => s.scale(factor),
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Hitbox::Rectangle(s) => s.validate(),
            Hitbox::Circle(s) => s.validate(),
            Hitbox::Oval(s) => s.validate(),
            Hitbox::Polygon(s) => s.validate(),
            Hitbox::RoundedLine(s) => s.validate(),
        }
    }
}

impl From<Rectangle> for Hitbox {
    fn from(shape: Rectangle) -> Self {
        Hitbox::Rectangle(shape)
    }
}

impl From<Circle> for Hitbox {
    fn from(shape: Circle) -> Self {
        Hitbox::Circle(shape)
    }
}

impl From<Oval> for Hitbox {
    fn from(shape: Oval) -> Self {
        Hitbox::Oval(shape)
    }
}

impl From<Polygon> for Hitbox {
    fn from(shape: Polygon) -> Self {
        Hitbox::Polygon(shape)
    }
}

impl From<RoundedLine> for Hitbox {
    fn from(shape: RoundedLine) -> Self {
        Hitbox::RoundedLine(shape)
    }
}
