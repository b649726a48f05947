//! Spatial queries against the current shelf: ray picking, edge
//! intersection sweeps, nearest-edge snapping and opposite-face lookup.
//!
//! Every query is sentinel-returning: "nothing there" is an empty list,
//! `None`, or [`PolygonRelation::None`], never an error.

use crate::edge::Edge3D;
use crate::float_types::parry3d::query::Ray;
use crate::float_types::{EPSILON, Real, tolerance};
use crate::plane::Plane;
use crate::polygon::{IntersectionType, Polygon};
use nalgebra::Point3;

use super::Model;

/// Outcome of an opposite-face lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonRelation {
    /// No facing polygon found along the axis.
    None,
    /// The nearest facing polygon is already coincident with the query face.
    ZeroDistance,
    /// A facing polygon was found at the returned distance.
    Intersection,
}

/// Which way a push/pull gesture travels when looking for the opposite face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OppositeDirection {
    /// Along the face normal.
    Push,
    /// Against the face normal.
    Pull,
}

impl Model {
    /// The polygon on the current shelf nearest along `ray`, with the hit
    /// position. Open polygons have no area and are never hit.
    pub fn query_polygon(&self, ray: &Ray) -> Option<(usize, Point3<Real>)> {
        let mut best: Option<(usize, Point3<Real>, Real)> = None;
        for (i, polygon) in self.polygons().iter().enumerate() {
            if polygon.is_open() || !polygon.is_valid() {
                continue;
            }
            let Some((t, point)) = polygon.plane().hit_test(ray) else {
                continue;
            };
            if t < 0.0 || !polygon.includes_point(&point) {
                continue;
            }
            if best.as_ref().is_none_or(|(_, _, nearest)| t < *nearest) {
                best = Some((i, point, t));
            }
        }
        best.map(|(i, point, _)| (i, point))
    }

    /// Indices of polygons whose plane is equivalent to `plane`.
    pub fn query_polygons_on_plane(&self, plane: &Plane) -> Vec<usize> {
        self.polygons()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.plane().is_equivalent(plane))
            .map(|(i, _)| i)
            .collect()
    }

    /// Every polygon the segment `edge` meets, with the meeting point,
    /// deduplicated and ordered along the edge. Polygons coplanar with the
    /// edge report boundary crossings, the rest report the plane piercing
    /// point when it falls inside them.
    pub fn query_intersection_by_edge(&self, edge: &Edge3D) -> Vec<(usize, Point3<Real>)> {
        let span = edge.v1 - edge.v0;
        let length = span.norm();
        if length < EPSILON {
            return Vec::new();
        }
        let direction = span / length;

        let mut hits: Vec<(Real, usize, Point3<Real>)> = Vec::new();
        let push = |hits: &mut Vec<(Real, usize, Point3<Real>)>,
                        t: Real,
                        index: usize,
                        point: Point3<Real>| {
            if hits
                .iter()
                .all(|(_, i, p)| *i != index || (p - point).norm() >= tolerance())
            {
                hits.push((t, index, point));
            }
        };

        for (i, polygon) in self.polygons().iter().enumerate() {
            if polygon.is_open() || !polygon.is_valid() {
                continue;
            }
            let coplanar = polygon.plane().distance_to(&edge.v0).abs() < tolerance()
                && polygon.plane().distance_to(&edge.v1).abs() < tolerance();
            if coplanar {
                for (t, point) in polygon.query_intersections(edge) {
                    push(&mut hits, t, i, point);
                }
            } else if let Some((t, point)) =
                polygon.plane().hit_test(&Ray::new(edge.v0, direction))
            {
                if (-tolerance()..=length + tolerance()).contains(&t)
                    && polygon.includes_point(&point)
                {
                    push(&mut hits, t / length, i, point);
                }
            }
        }

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, i, point)| (i, point)).collect()
    }

    /// All edges at the minimum distance from `position` among polygons on
    /// `plane`, with the closest boundary position. `None` when no polygon
    /// lies on the plane.
    pub fn query_nearest_edges(
        &self,
        plane: &Plane,
        position: &Point3<Real>,
    ) -> Option<(Point3<Real>, Vec<(usize, Edge3D)>)> {
        let mut nearest: Real = Real::MAX;
        let mut nearest_position = Point3::origin();
        let mut edges: Vec<(usize, Edge3D)> = Vec::new();

        for (i, polygon) in self.polygons().iter().enumerate() {
            if !polygon.plane().is_equivalent(plane) {
                continue;
            }
            let Some((edge, pos)) = polygon.query_nearest_edge(position) else {
                continue;
            };
            let distance = (pos - position).norm();
            if (distance - nearest).abs() < EPSILON {
                edges.push((i, edge));
            } else if distance < nearest {
                nearest = distance;
                nearest_position = pos;
                edges.clear();
                edges.push((i, edge));
            }
        }

        if edges.is_empty() {
            None
        } else {
            Some((nearest_position, edges))
        }
    }

    /// Polygons sharing a boundary edge with `polygon` whose planes are
    /// perpendicular to it: the side walls meeting a face.
    pub fn query_adjacent_perpendicular_polygons(&self, polygon: &Polygon) -> Vec<usize> {
        let mut adjacent = Vec::new();
        for (i, candidate) in self.polygons().iter().enumerate() {
            if candidate
                .plane()
                .normal()
                .dot(&polygon.plane().normal())
                .abs()
                > EPSILON
            {
                continue;
            }
            let shares_edge = (0..candidate.edge_count()).any(|a| {
                let edge = candidate.edge_3d(a);
                (0..polygon.edge_count()).any(|b| {
                    let crust = polygon.edge_3d(b);
                    crust.contains_point(&edge.v0) && crust.contains_point(&edge.v1)
                })
            });
            if shares_edge {
                adjacent.push(i);
            }
        }
        adjacent
    }

    /// True when `point` lies on a boundary edge of any polygon on `plane`,
    /// optionally ignoring the polygon at `exclude`.
    pub fn is_vertex_on_edge(
        &self,
        plane: &Plane,
        point: &Point3<Real>,
        exclude: Option<usize>,
    ) -> bool {
        for (i, polygon) in self.polygons().iter().enumerate() {
            if exclude == Some(i) || !polygon.plane().is_equivalent(plane) {
                continue;
            }
            for e in 0..polygon.edge_count() {
                if polygon.edge_3d(e).contains_point(point) {
                    return true;
                }
            }
        }
        false
    }

    /// True when any stored polygon overlaps `polygon`; with `strong` only a
    /// true area overlap counts, otherwise touching does too.
    pub fn has_intersection(&self, polygon: &Polygon, strong: bool) -> bool {
        self.polygons().iter().any(|existing| {
            let relation = Polygon::classify_intersection(existing, polygon);
            if strong {
                relation == IntersectionType::Intersection
            } else {
                relation != IntersectionType::None
            }
        })
    }

    /// True when some stored polygon touches `polygon` without overlapping.
    pub fn has_touched(&self, polygon: &Polygon) -> bool {
        self.polygons().iter().any(|existing| {
            Polygon::classify_intersection(existing, polygon) == IntersectionType::JustTouch
        })
    }

    /// The nearest polygon facing `polygon` along the push/pull axis, for
    /// snap-to-surface extrusion.
    ///
    /// Candidates are projected onto the query plane (inset by `scale` when
    /// nonzero so slanted neighbours still register), intersected with the
    /// query face, and cast back to their own plane; the smallest
    /// non-negative cast distance wins. Returns the overlap polygon lifted
    /// onto the opposite plane together with the travel distance.
    pub fn query_opposite_polygon(
        &self,
        polygon: &Polygon,
        direction: OppositeDirection,
        scale: Real,
    ) -> (PolygonRelation, Option<Polygon>, Real) {
        let plane = *polygon.plane();
        let inverted = plane.inverted();

        let mut nearest: Option<(Real, Polygon)> = None;

        for candidate in self.polygons().iter() {
            let opposite = *candidate.plane();
            if opposite.is_equivalent(&plane) || opposite.is_equivalent(&inverted) {
                continue;
            }
            if candidate.is_open() || !candidate.is_valid() {
                continue;
            }

            let probe = Ray::new(candidate.pos(0), opposite.normal());
            let Some((cast, _)) = plane.hit_test(&probe) else {
                continue;
            };

            let facing = opposite.normal().dot(&plane.normal());
            if scale.abs() < EPSILON {
                if facing > -EPSILON {
                    continue;
                }
                match direction {
                    OppositeDirection::Push if cast > 0.0 => continue,
                    OppositeDirection::Pull if cast < 0.0 => continue,
                    _ => {},
                }
            } else {
                if facing < 1.0 - EPSILON {
                    continue;
                }
                match direction {
                    OppositeDirection::Push if cast < 0.0 => continue,
                    OppositeDirection::Pull if cast > 0.0 => continue,
                    _ => {},
                }
            }

            let mut projected = candidate.clone();
            if !projected.update_plane(plane) {
                continue;
            }
            if scale.abs() > EPSILON && !projected.inset(-scale) {
                continue;
            }
            projected.intersect(polygon, true);
            if !projected.is_valid() {
                continue;
            }

            let travel = match direction {
                OppositeDirection::Push => plane.normal(),
                OppositeDirection::Pull => -plane.normal(),
            };
            if !projected.update_plane_along(opposite, travel) {
                continue;
            }
            let Some(distance) = polygon.nearest_distance_along(&projected, travel) else {
                continue;
            };

            if distance >= 0.0
                && nearest.as_ref().is_none_or(|(best, _)| distance < *best)
            {
                nearest = Some((distance, projected));
            }
        }

        let Some((distance, found)) = nearest else {
            return (PolygonRelation::None, None, 0.0);
        };

        if distance.abs() < tolerance() * 10.0 {
            return (PolygonRelation::ZeroDistance, Some(found), distance);
        }

        // back off slanted faces slightly so the snapped face does not pierce
        let mut out_distance = distance;
        if plane.normal().dot(&found.plane().normal()).abs() < 1.0 - EPSILON {
            out_distance -= 0.01;
        }
        (PolygonRelation::Intersection, Some(found), out_distance)
    }
}
