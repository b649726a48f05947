//! An infinite plane with equivalence tests and a deterministic 2D basis.
//!
//! All polygon boolean math in this crate is reduced to 2D by projecting
//! through [`Plane::w2p`] and lifting results back with [`Plane::p2w`].

use crate::float_types::parry3d::query::Ray;
use crate::float_types::{EPSILON, Real, tolerance};
use nalgebra::{Point2, Point3, Vector3};

/// An infinite plane in Hessian form: `normal · p + distance == 0` for
/// points `p` on the plane. `normal` is always unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    normal: Vector3<Real>,
    distance: Real,
}

impl Plane {
    /// Create a plane from a (not necessarily unit) normal and a point on it.
    /// Returns `None` when the normal is degenerate.
    pub fn from_normal_point(normal: Vector3<Real>, point: Point3<Real>) -> Option<Self> {
        if normal.norm_squared() < EPSILON * EPSILON {
            return None;
        }
        let normal = normal.normalize();
        Some(Plane {
            normal,
            distance: -normal.dot(&point.coords),
        })
    }

    /// Create a plane from three points. The normal follows the right-hand
    /// rule: `(b - a) × (c - a)`. Returns `None` when the points are
    /// collinear — callers must validate before use.
    pub fn from_points(a: Point3<Real>, b: Point3<Real>, c: Point3<Real>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        Plane::from_normal_point(normal, a)
    }

    pub const fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    pub const fn distance(&self) -> Real {
        self.distance
    }

    /// Signed distance from `point` to the plane, positive on the normal side.
    pub fn distance_to(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) + self.distance
    }

    /// A point on the plane, the projection of the origin.
    pub fn origin(&self) -> Point3<Real> {
        Point3::from(self.normal * -self.distance)
    }

    /// True when the planes have matching normals and offsets within tolerance.
    pub fn is_equivalent(&self, other: &Plane) -> bool {
        let tol = tolerance();
        self.normal.dot(&other.normal) > 1.0 - tol
            && (self.distance - other.distance).abs() < tol
    }

    /// True when `other` is the same geometric plane facing the opposite way.
    pub fn is_opposite(&self, other: &Plane) -> bool {
        let tol = tolerance();
        self.normal.dot(&other.normal) < -(1.0 - tol)
            && (self.distance + other.distance).abs() < tol
    }

    /// Flip the plane in place (reverse normal and offset).
    pub fn invert(&mut self) {
        self.normal = -self.normal;
        self.distance = -self.distance;
    }

    /// Return a flipped copy of this plane.
    pub fn inverted(&self) -> Plane {
        Plane {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// Orthonormal in-plane axes `(u, v)` with `u × v == normal`.
    ///
    /// The basis is a pure function of the normal, so every polygon on an
    /// equivalent plane projects into the same 2D frame.
    pub fn basis(&self) -> (Vector3<Real>, Vector3<Real>) {
        let n = self.normal;

        let other = if n.x.abs() < n.y.abs() && n.x.abs() < n.z.abs() {
            Vector3::x()
        } else if n.y.abs() < n.z.abs() {
            Vector3::y()
        } else {
            Vector3::z()
        };

        let v = n.cross(&other).normalize();
        let u = v.cross(&n).normalize();

        (u, v)
    }

    /// World to plane: project a 3D point into the plane's 2D frame.
    pub fn w2p(&self, point: &Point3<Real>) -> Point2<Real> {
        let (u, v) = self.basis();
        let rel = point - self.origin();
        Point2::new(rel.dot(&u), rel.dot(&v))
    }

    /// Plane to world: lift a 2D point in the plane's frame back into 3D.
    pub fn p2w(&self, point: &Point2<Real>) -> Point3<Real> {
        let (u, v) = self.basis();
        self.origin() + u * point.x + v * point.y
    }

    /// Intersect the line carrying `ray` with the plane.
    ///
    /// This is a line test: the returned parameter may be negative when the
    /// plane lies behind the ray origin. Rays parallel to the plane miss.
    pub fn hit_test(&self, ray: &Ray) -> Option<(Real, Point3<Real>)> {
        let denom = self.normal.dot(&ray.dir);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = -(self.normal.dot(&ray.origin.coords) + self.distance) / denom;
        Some((t, ray.origin + ray.dir * t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn invert_roundtrip() {
        let plane = Plane::from_normal_point(Vector3::y(), Point3::new(0.0, 2.0, 0.0))
            .expect("valid plane");
        let mut flipped = plane;
        flipped.invert();
        assert_eq!(flipped.normal(), -plane.normal());
        assert_eq!(flipped.distance(), -plane.distance());
        flipped.invert();
        assert_eq!(flipped, plane);
    }

    #[test]
    fn collinear_points_give_no_plane() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 1.0, 1.0);
        let c = Point3::new(2.0, 2.0, 2.0);
        assert!(Plane::from_points(a, b, c).is_none());
    }

    #[test]
    fn projection_roundtrip() {
        let plane = Plane::from_points(
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        )
        .expect("valid plane");

        let p = Point3::new(0.25, -0.75, 1.0);
        let q = plane.w2p(&p);
        let back = plane.p2w(&q);
        assert!((back - p).norm() < 1e-9);
    }

    #[test]
    fn basis_is_right_handed() {
        let plane = Plane::from_normal_point(
            Vector3::new(0.3, -0.5, 0.8),
            Point3::new(1.0, 2.0, 3.0),
        )
        .expect("valid plane");
        let (u, v) = plane.basis();
        assert!((u.cross(&v) - plane.normal()).norm() < 1e-9);
        assert!(u.dot(&v).abs() < 1e-9);
    }

    #[test]
    fn hit_test_signed_parameter() {
        let plane = Plane::from_normal_point(Vector3::z(), Point3::new(0.0, 0.0, 2.0))
            .expect("valid plane");
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        let (t, point) = plane.hit_test(&ray).expect("hit");
        assert!((t - 3.0).abs() < 1e-9);
        assert!((point.z - 2.0).abs() < 1e-9);

        // Plane behind the origin along the ray direction
        let ray_away = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::z());
        let (t_away, _) = plane.hit_test(&ray_away).expect("line test still hits");
        assert!(t_away < 0.0);
    }
}
