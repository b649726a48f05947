//! Validation errors

use crate::float_types::Real;
use nalgebra::Point3;

/// All the possible validation issues we might encounter.
///
/// These are diagnostics, not control flow: geometric "not found" and
/// "degenerate result" outcomes are reported through sentinel values
/// (`Option`, `bool`, [`IntersectionType::None`](crate::polygon::IntersectionType)).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Two consecutive coords of a loop are identical
    #[error("(RepeatedPoint) Two consecutive coords are identical at: {0}")]
    RepeatedPoint(Point3<Real>),
    /// A hole is *not* contained by the outer boundary
    #[error("(HoleOutsideShell) A hole is not contained by its outer boundary at: {0}")]
    HoleOutsideShell(Point3<Real>),
    /// A loop self-intersects
    #[error("(SelfIntersection) A loop self-intersects at: {0}")]
    SelfIntersection(Point3<Real>),
    /// A loop has fewer than the minimal number of points
    #[error("(TooFewPoints) A loop has fewer than 3 distinct points at: {0}")]
    TooFewPoints(Point3<Real>),
    /// The coordinate has a NaN or infinite component
    #[error("(InvalidCoordinate) The coordinate ({0}) has a NaN or infinite")]
    InvalidCoordinate(Point3<Real>),
    /// The polygon has a dangling endpoint and is not a closed ring
    #[error("(OpenLoop) The loop has a dangling endpoint at: {0}")]
    OpenLoop(Point3<Real>),
    /// A vertex does not lie on the polygon's plane
    #[error("(OffPlane) The vertex ({point}) is {distance} away from the polygon plane")]
    OffPlane { point: Point3<Real>, distance: Real },
    /// The enclosed area is below tolerance
    #[error("(ZeroArea) The polygon encloses no area")]
    ZeroArea,
    /// In general, anything else
    #[error("{0}")]
    Other(String),
}
