//! Polygon hitbox.

use super::{GeometryError, HitboxShape, finite_point, rotate_point};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A closed polygon over an ordered vertex sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolygon")]
pub struct Polygon {
    vertices: Vec<Point>,
}

/// Unchecked wire form, validated on the way in.
#[derive(Deserialize)]
struct RawPolygon {
    vertices: Vec<Point>,
}

impl TryFrom<RawPolygon> for Polygon {
    type Error = GeometryError;

    fn try_from(raw: RawPolygon) -> Result<Self, Self::Error> {
        Polygon::new(raw.vertices)
    }
}

impl Polygon {
    /// Create a polygon. Fewer than three vertices is a construction failure.
    pub fn new(vertices: Vec<Point>) -> Result<Self, GeometryError> {
        let polygon = Self { vertices };
        polygon.validate()?;
        Ok(polygon)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }
}

impl HitboxShape for Polygon {
    /// Even-odd ray casting along +x.
    fn contains(&self, point: Point) -> bool {
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > point.y) != (b.y > point.y) {
                let crossing = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < crossing {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    fn rotate(&mut self, radians: f64) {
        for vertex in &mut self.vertices {
            *vertex = rotate_point(*vertex, radians);
        }
    }

    fn scale(&mut self, factor: f64) {
        for vertex in &mut self.vertices {
            *vertex = Point::new(vertex.x * factor, vertex.y * factor);
        }
    }

    fn validate(&self) -> Result<(), GeometryError> {
        if self.vertices.len() < 3 {
            return Err(GeometryError::TooFewVertices(self.vertices.len()));
        }
        for vertex in &self.vertices {
            finite_point("polygon vertex", *vertex)?;
        }
        Ok(())
    }
}
