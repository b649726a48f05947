//! Nearest-edge and segment-intersection queries on a single polygon,
//! used for extrusion snapping and interactive picking.

use crate::edge::Edge3D;
use crate::float_types::parry3d::query::Ray;
use crate::float_types::{Real, tolerance};
use nalgebra::{Point3, Vector3};

use super::{Polygon, segment_intersection_params};

impl Polygon {
    /// The boundary edge closest to `point` and the closest position on it.
    /// Bridge edges are topology helpers and are never returned.
    pub fn query_nearest_edge(&self, point: &Point3<Real>) -> Option<(Edge3D, Point3<Real>)> {
        let mut best: Option<(Edge3D, Point3<Real>, Real)> = None;
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.is_bridge() {
                continue;
            }
            let edge3 = self.edge_3d(i);
            let pos = edge3.nearest_point(point);
            let dist = (pos - point).norm_squared();
            if best.as_ref().is_none_or(|(_, _, d)| dist < *d) {
                best = Some((edge3, pos, dist));
            }
        }
        best.map(|(edge3, pos, _)| (edge3, pos))
    }

    /// Intersections of `edge` with the polygon boundary as
    /// `(parameter, position)` pairs ordered along the edge, duplicates at
    /// shared boundary vertices collapsed.
    ///
    /// The edge is expected to lie on the polygon's plane; the test runs in
    /// the plane's 2D basis.
    pub fn query_intersections(&self, edge: &Edge3D) -> Vec<(Real, Point3<Real>)> {
        let a = self.plane.w2p(&edge.v0);
        let b = self.plane.w2p(&edge.v1);

        let mut hits: Vec<(Real, Point3<Real>)> = Vec::new();
        for i in 0..self.edges.len() {
            let boundary = self.edge_3d(i);
            let q0 = self.plane.w2p(&boundary.v0);
            let q1 = self.plane.w2p(&boundary.v1);
            if let Some((t, _)) = segment_intersection_params(&a, &b, &q0, &q1) {
                let position = edge.v0 + (edge.v1 - edge.v0) * t;
                if hits
                    .iter()
                    .all(|(_, p)| (p - position).norm() >= tolerance())
                {
                    hits.push((t, position));
                }
            }
        }
        hits.sort_by(|x, y| x.0.total_cmp(&y.0));
        hits
    }

    /// Smallest ray-cast distance from the vertices of `other` onto this
    /// polygon's plane along `direction`; `None` when every cast misses.
    /// Distances within tolerance of zero collapse to exactly zero so
    /// callers can detect already-snapped faces.
    pub fn nearest_distance_along(
        &self,
        other: &Polygon,
        direction: Vector3<Real>,
    ) -> Option<Real> {
        let mut nearest: Option<Real> = None;
        for vertex in other.vertices() {
            let ray = Ray::new(vertex.pos, direction);
            if let Some((t, _)) = self.plane.hit_test(&ray) {
                if nearest.is_none_or(|n| t < n) {
                    nearest = Some(t);
                }
            }
        }
        nearest.map(|d| if d.abs() < tolerance() { 0.0 } else { d })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn unit_square() -> Polygon {
        Polygon::new(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ])
        .expect("square")
    }

    #[test]
    fn nearest_edge_from_inside() {
        let square = unit_square();
        let (edge, pos) = square
            .query_nearest_edge(&Point3::new(0.5, 0.1, 0.0))
            .expect("edge");
        assert!((pos - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-9);
        assert!((edge.v0.y).abs() < 1e-9);
        assert!((edge.v1.y).abs() < 1e-9);
    }

    #[test]
    fn edge_crossing_square_hits_twice() {
        let square = unit_square();
        let edge = Edge3D::new(Point3::new(-1.0, 0.5, 0.0), Point3::new(2.0, 0.5, 0.0));
        let hits = square.query_intersections(&edge);
        assert_eq!(hits.len(), 2);
        assert!(hits[0].0 < hits[1].0);
        assert!((hits[0].1 - Point3::new(0.0, 0.5, 0.0)).norm() < 1e-9);
        assert!((hits[1].1 - Point3::new(1.0, 0.5, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn edge_along_boundary_hits_the_corners() {
        let square = unit_square();
        let edge = Edge3D::new(Point3::new(-1.0, 1.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        // collinear with the top edge, so only the side edges register
        let hits = square.query_intersections(&edge);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn nearest_distance_between_facing_squares() {
        let bottom = unit_square();
        let mut top = unit_square();
        top.translate(&nalgebra::Vector3::new(0.0, 0.0, 3.0));
        top.flip();

        let distance = top
            .nearest_distance_along(&bottom, bottom.plane().normal())
            .expect("hit");
        assert!((distance - 3.0).abs() < 1e-9);
    }
}
