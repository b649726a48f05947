//! Struct and functions for working with `Vertex`s from which `Polygon`s are composed.

use crate::float_types::Real;
use nalgebra::{Point2, Point3};

/// A vertex of a polygon, holding position and texture coordinates.
///
/// Positions are plain values owned by the containing polygon; nothing is
/// shared between polygons. UVs are derived per-face from the polygon's
/// [`TexInfo`](crate::polygon::TexInfo) by `Polygon::update_uvs`.
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct Vertex {
    pub pos: Point3<Real>,
    pub uv: Point2<Real>,
}

impl Vertex {
    /// Create a new [`Vertex`] with zeroed texture coordinates.
    /// Non-finite position components are sanitised to zero.
    #[inline]
    pub fn new(mut pos: Point3<Real>) -> Self {
        for c in pos.coords.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }

        Vertex {
            pos,
            uv: Point2::origin(),
        }
    }

    /// Euclidean distance between vertex positions.
    pub fn distance_to(&self, other: &Vertex) -> Real {
        (self.pos - other.pos).norm()
    }

    /// Squared distance, avoiding the square root for comparisons.
    pub fn distance_squared_to(&self, other: &Vertex) -> Real {
        (self.pos - other.pos).norm_squared()
    }

    /// Linear interpolation of position and uv.
    pub fn interpolate(&self, other: &Vertex, t: Real) -> Vertex {
        Vertex {
            pos: self.pos + (other.pos - self.pos) * t,
            uv: self.uv + (other.uv - self.uv) * t,
        }
    }
}

impl From<Point3<Real>> for Vertex {
    fn from(pos: Point3<Real>) -> Self {
        Vertex::new(pos)
    }
}
