//! Directed polygon edges and free-standing 3D segments.

use crate::float_types::{EPSILON, Real, tolerance};
use nalgebra::Point3;

/// Per-edge flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeFlags(pub u8);

impl EdgeFlags {
    /// An internal edge inserted solely to connect a hole loop to the outer
    /// boundary. Hidden from rendering but kept for topology.
    pub const BRIDGE: EdgeFlags = EdgeFlags(1);

    pub const fn contains(self, other: EdgeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn insert(self, other: EdgeFlags) -> EdgeFlags {
        EdgeFlags(self.0 | other.0)
    }
}

/// A directed pair of vertex indices within one polygon.
///
/// Edges chain head-to-tail into one or more loops; open chains have a
/// dangling endpoint and mark the polygon as open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub v0: usize,
    pub v1: usize,
    pub flags: EdgeFlags,
}

impl Edge {
    #[inline]
    pub const fn new(v0: usize, v1: usize) -> Self {
        Edge {
            v0,
            v1,
            flags: EdgeFlags(0),
        }
    }

    #[inline]
    pub const fn with_flags(v0: usize, v1: usize, flags: EdgeFlags) -> Self {
        Edge { v0, v1, flags }
    }

    pub const fn is_bridge(&self) -> bool {
        self.flags.contains(EdgeFlags::BRIDGE)
    }

    /// The same edge walked in the opposite direction.
    pub const fn reversed(&self) -> Edge {
        Edge {
            v0: self.v1,
            v1: self.v0,
            flags: self.flags,
        }
    }
}

/// A free-standing segment in 3D, used by the query APIs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge3D {
    pub v0: Point3<Real>,
    pub v1: Point3<Real>,
}

impl Edge3D {
    #[inline]
    pub const fn new(v0: Point3<Real>, v1: Point3<Real>) -> Self {
        Edge3D { v0, v1 }
    }

    pub fn length(&self) -> Real {
        (self.v1 - self.v0).norm()
    }

    pub fn center(&self) -> Point3<Real> {
        self.v0 + (self.v1 - self.v0) * 0.5
    }

    /// Swap the endpoints in place.
    pub fn invert(&mut self) {
        core::mem::swap(&mut self.v0, &mut self.v1);
    }

    /// The closest point on the segment to `point`, clamped to the endpoints.
    pub fn nearest_point(&self, point: &Point3<Real>) -> Point3<Real> {
        let dir = self.v1 - self.v0;
        let len_sq = dir.norm_squared();
        if len_sq < EPSILON * EPSILON {
            return self.v0;
        }
        let t = ((point - self.v0).dot(&dir) / len_sq).clamp(0.0, 1.0);
        self.v0 + dir * t
    }

    /// Endpoint-wise equivalence, optionally allowing reversed direction.
    pub fn is_equivalent(&self, other: &Edge3D, allow_reverse: bool) -> bool {
        let tol = tolerance();
        let same = (self.v0 - other.v0).norm() < tol && (self.v1 - other.v1).norm() < tol;
        if same {
            return true;
        }
        allow_reverse
            && (self.v0 - other.v1).norm() < tol
            && (self.v1 - other.v0).norm() < tol
    }

    /// True if `point` lies on the segment within tolerance.
    pub fn contains_point(&self, point: &Point3<Real>) -> bool {
        (self.nearest_point(point) - point).norm() < tolerance()
    }
}
