//! Affine entity state and the operators that compose onto it.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// How a scale operation moves an entity relative to the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    /// Offset from the pivot grows with the factor. Used by items.
    MultiplyBy,
    /// Offset from the pivot shrinks with the factor. Used by views and view
    /// groups, whose world extent is the inverse of their scale.
    DivideBy,
}

/// Position, rotation (radians, not normalized) and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

/// Check a scale factor before applying it.
pub fn is_valid_factor(factor: f64) -> bool {
    factor.is_finite() && factor > 0.0
}

impl Transform {
    /// Create an unrotated, unscaled transform at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
    }

    pub fn move_to(&mut self, x: Option<f64>, y: Option<f64>) -> &mut Self {
        if let Some(x) = x {
            self.x = x;
        }
        if let Some(y) = y {
            self.y = y;
        }
        self
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.x += dx;
        self.y += dy;
        self
    }

    /// Rotate the position about `pivot` (default: own position), then add
    /// `radians` to the accumulated rotation.
    pub fn rotate_by(&mut self, radians: f64, pivot: Option<Point>) -> &mut Self {
        let pivot = pivot.unwrap_or_else(|| self.position());
        let moved = Affine::rotate_about(radians, pivot) * self.position();
        self.x = moved.x;
        self.y = moved.y;
        self.rotation += radians;
        self
    }

    /// Scale about `pivot` (default: own position). Invalid factors are ignored.
    pub fn scale_by(&mut self, factor: f64, pivot: Option<Point>, mode: ScaleMode) -> &mut Self {
        if !is_valid_factor(factor) {
            log::warn!("Ignoring invalid scale factor {factor}");
            return self;
        }
        let pivot = pivot.unwrap_or_else(|| self.position());
        let offset = self.position() - pivot;
        let offset = match mode {
            ScaleMode::MultiplyBy => offset * factor,
            ScaleMode::DivideBy => offset / factor,
        };
        self.x = pivot.x + offset.x;
        self.y = pivot.y + offset.y;
        self.scale *= factor;
        self
    }

    /// Map a point from this entity's local frame into the world, treating
    /// the local frame as scaled by `1 / scale`. This is the view-space
    /// mapping: a view at scale 2 shows half as much of the world.
    pub fn view_to_world(&self, local: Point) -> Point {
        self.position() + self.view_delta_to_world(local.to_vec2())
    }

    /// Map a displacement in view space into a world displacement.
    pub fn view_delta_to_world(&self, delta: Vec2) -> Vec2 {
        Affine::rotate(self.rotation) * (delta / self.scale).to_point() - Point::ZERO
    }

    /// Inverse of [`Transform::view_to_world`].
    pub fn world_to_view(&self, world: Point) -> Point {
        let local = Affine::rotate(-self.rotation) * (world - self.position()).to_point();
        Point::new(local.x * self.scale, local.y * self.scale)
    }
}

/// Something that owns a [`Transform`] and can be moved, rotated and scaled.
///
/// Implementors supply access to their transform and may override
/// [`Transformable::scale_mode`] and the attached-geometry hooks; the
/// operators themselves are provided.
pub trait Transformable {
    fn transform(&self) -> &Transform;

    fn transform_mut(&mut self) -> &mut Transform;

    fn scale_mode(&self) -> ScaleMode {
        ScaleMode::MultiplyBy
    }

    /// Called after the transform was rotated.
    fn rotated(&mut self, _radians: f64) {}

    /// Called after the transform was scaled by a valid factor.
    fn scaled(&mut self, _factor: f64) {}

    fn move_to(&mut self, x: Option<f64>, y: Option<f64>) -> &mut Self
    where
        Self: Sized,
    {
        self.transform_mut().move_to(x, y);
        self
    }

    fn move_by(&mut self, dx: f64, dy: f64) -> &mut Self
    where
        Self: Sized,
    {
        self.transform_mut().move_by(dx, dy);
        self
    }

    fn rotate_by(&mut self, radians: f64, pivot: Option<Point>) -> &mut Self
    where
        Self: Sized,
    {
        if !radians.is_finite() {
            log::warn!("Ignoring non-finite rotation {radians}");
            return self;
        }
        self.transform_mut().rotate_by(radians, pivot);
        self.rotated(radians);
        self
    }

    fn scale_by(&mut self, factor: f64, pivot: Option<Point>) -> &mut Self
    where
        Self: Sized,
    {
        if !is_valid_factor(factor) {
            log::warn!("Ignoring invalid scale factor {factor}");
            return self;
        }
        let mode = self.scale_mode();
        self.transform_mut().scale_by(factor, pivot, mode);
        self.scaled(factor);
        self
    }
}
