//! Boolean composition of coplanar polygons.
//!
//! Every operator projects both operands into the owning plane's 2D basis,
//! runs the 2D clip on [`MultiPolygon`] form, and lifts the result back to
//! 3D. Operands must share an equivalent plane; the [`Model`](crate::model::Model)
//! guarantees this before dispatching, and the operators return `false`
//! rather than producing garbage when handed anything else.

use crate::edge::Edge;
use crate::float_types::{EPSILON, Real, tolerance};
use crate::vertex::Vertex;
use geo::{Area, BooleanOps, Contains, Intersects};
use nalgebra::{Point2, Point3};

use super::{Polygon, segment_intersection_params, segments_cross};

/// Spatial relationship between two coplanar polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionType {
    /// Disjoint, or not on an equivalent plane.
    None,
    /// Boundary contact only; the interiors stay disjoint.
    JustTouch,
    /// True area overlap. Identical polygons count as overlapping.
    Intersection,
}

impl Polygon {
    /// Classify how `a` and `b` relate spatially. This is the predicate the
    /// model uses to decide whether two polygons combine: touching polygons
    /// never merge, overlapping ones do.
    pub fn classify_intersection(a: &Polygon, b: &Polygon) -> IntersectionType {
        if a.vertex_count() == 0 || b.vertex_count() == 0 {
            return IntersectionType::None;
        }
        if !a.plane().is_equivalent(b.plane()) {
            return IntersectionType::None;
        }

        let frame = *a.plane();
        match (a.is_open(), b.is_open()) {
            (false, false) => {
                if !a.is_valid() || !b.is_valid() {
                    return IntersectionType::None;
                }
                let ga = a.to_multi_polygon(&frame);
                let gb = b.to_multi_polygon(&frame);
                if ga.intersection(&gb).unsigned_area() >= tolerance() {
                    IntersectionType::Intersection
                } else if ga.intersects(&gb) {
                    IntersectionType::JustTouch
                } else {
                    IntersectionType::None
                }
            },
            (false, true) => a.classify_against_chains(b, &frame),
            (true, false) => b.classify_against_chains(a, &frame),
            (true, true) => {
                let sa = a.chain_segments_2d(&frame);
                let sb = b.chain_segments_2d(&frame);
                let mut touched = false;
                for (p0, p1) in &sa {
                    for (q0, q1) in &sb {
                        if segments_cross(p0, p1, q0, q1) {
                            return IntersectionType::Intersection;
                        }
                        if segment_intersection_params(p0, p1, q0, q1).is_some() {
                            touched = true;
                        }
                    }
                }
                if touched {
                    IntersectionType::JustTouch
                } else {
                    IntersectionType::None
                }
            },
        }
    }

    // Relationship between this closed polygon and an open chain polygon:
    // any chain vertex or segment midpoint strictly inside, or a transversal
    // boundary crossing, is an intersection; boundary-only contact touches.
    fn classify_against_chains(&self, chains: &Polygon, frame: &crate::plane::Plane) -> IntersectionType {
        if !self.is_valid() {
            return IntersectionType::None;
        }
        let region = self.to_multi_polygon(frame);
        let boundary: Vec<(Point2<Real>, Point2<Real>)> = self.chain_segments_2d(frame);
        let segments = chains.chain_segments_2d(frame);

        let mut touched = false;
        for (p0, p1) in &segments {
            let mid = Point2::new((p0.x + p1.x) * 0.5, (p0.y + p1.y) * 0.5);
            for sample in [p0, p1, &mid] {
                let point = geo::Point::new(sample.x, sample.y);
                if region.contains(&point) {
                    return IntersectionType::Intersection;
                }
                if region.intersects(&point) {
                    touched = true;
                }
            }
            for (q0, q1) in &boundary {
                if segments_cross(p0, p1, q0, q1) {
                    return IntersectionType::Intersection;
                }
                if segment_intersection_params(p0, p1, q0, q1).is_some() {
                    touched = true;
                }
            }
        }
        if touched {
            IntersectionType::JustTouch
        } else {
            IntersectionType::None
        }
    }

    /// Merge `other` into this polygon.
    ///
    /// Two open polygons concatenate their chains (coincident endpoints are
    /// welded); an invalid polygon becomes a copy of `other`; two closed
    /// polygons take the 2D union. The result may span several islands until
    /// separated. Returns `false` for mixed open/closed operands and for
    /// non-equivalent planes.
    pub fn union_with(&mut self, other: &Polygon) -> bool {
        if self.is_open() && other.is_open() {
            let base = self.vertices.len();
            self.vertices.extend(other.vertices.iter().copied());
            self.edges.extend(
                other
                    .edges
                    .iter()
                    .map(|e| Edge::with_flags(e.v0 + base, e.v1 + base, e.flags)),
            );
            self.weld_coincident_vertices();
            self.optimize();
            self.update_uvs();
            return true;
        }
        if self.is_open() || other.is_open() {
            return false;
        }

        if !self.is_valid() {
            self.vertices = other.vertices.clone();
            self.edges = other.edges.clone();
            self.plane = *other.plane();
            self.invalidate_bounding_box();
            self.update_uvs();
            return true;
        }
        if !other.is_valid() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }

        let frame = self.plane;
        let merged = self
            .to_multi_polygon(&frame)
            .union(&other.to_multi_polygon(&frame));
        if merged.unsigned_area() < tolerance() {
            return false;
        }
        self.rebuild_from_multi_polygon(&merged);
        self.optimize();
        self.update_uvs();
        true
    }

    /// Remove the region covered by `other` from this polygon. Holes may be
    /// introduced. A fully covered polygon ends up empty but the call still
    /// succeeds; observe it through [`Polygon::is_valid`].
    pub fn subtract(&mut self, other: &Polygon) -> bool {
        if !self.is_valid() || self.is_open() || !other.is_valid() || other.is_open() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }

        if other.includes(self) {
            self.clear_geometry();
            return true;
        }

        let frame = self.plane;
        let remainder = self
            .to_multi_polygon(&frame)
            .difference(&other.to_multi_polygon(&frame));
        self.rebuild_from_multi_polygon(&remainder);
        self.optimize();
        self.update_uvs();
        true
    }

    /// Keep only the region covered by both polygons.
    ///
    /// When the interiors never overlap the polygon is emptied and the call
    /// fails, except that with `include_coincident_same` set, boundary edges
    /// the operands share with the same direction survive as an open chain
    /// (so an identical neighbour is not silently discarded by the caller's
    /// intersection fold).
    pub fn intersect(&mut self, other: &Polygon, include_coincident_same: bool) -> bool {
        if !self.is_valid() || self.is_open() || !other.is_valid() || other.is_open() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }

        let frame = self.plane;
        let overlap = self
            .to_multi_polygon(&frame)
            .intersection(&other.to_multi_polygon(&frame));
        if overlap.unsigned_area() >= tolerance() {
            self.rebuild_from_multi_polygon(&overlap);
            self.optimize();
            self.update_uvs();
            return true;
        }

        if include_coincident_same {
            let shared = self.coincident_same_edges(other);
            if !shared.is_empty() {
                self.vertices.clear();
                self.edges.clear();
                for (a, b) in shared {
                    let base = self.vertices.len();
                    self.vertices.push(Vertex::new(a));
                    self.vertices.push(Vertex::new(b));
                    self.edges.push(Edge::new(base, base + 1));
                }
                self.weld_coincident_vertices();
                self.invalidate_bounding_box();
                return true;
            }
        }

        self.clear_geometry();
        false
    }

    /// Keep the regions covered by exactly one of the two polygons.
    /// Identical operands empty the polygon and fail.
    pub fn exclusive_or(&mut self, other: &Polygon) -> bool {
        if !self.is_valid() || self.is_open() || !other.is_valid() || other.is_open() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }

        let frame = self.plane;
        let result = self
            .to_multi_polygon(&frame)
            .xor(&other.to_multi_polygon(&frame));
        if result.unsigned_area() < tolerance() {
            self.clear_geometry();
            return false;
        }
        self.rebuild_from_multi_polygon(&result);
        self.optimize();
        self.update_uvs();
        true
    }

    /// Keep only the part of this polygon inside `other`. Open polygons are
    /// clipped chain by chain; segments running along the boundary are kept.
    pub fn clip_inside(&mut self, other: &Polygon) -> bool {
        if !other.is_valid() || other.is_open() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }
        if self.is_open() {
            return self.clip_chains(other, true);
        }
        self.intersect(other, false)
    }

    /// Keep only the part of this polygon outside `other`.
    pub fn clip_outside(&mut self, other: &Polygon) -> bool {
        if !other.is_valid() || other.is_open() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }
        if self.is_open() {
            return self.clip_chains(other, false);
        }
        self.subtract(other)
    }

    /// True when `point` lies on the polygon's plane and on or inside its
    /// boundary.
    pub fn includes_point(&self, point: &Point3<Real>) -> bool {
        if self.plane.distance_to(point).abs() > tolerance() * 10.0 {
            return false;
        }
        for i in 0..self.edges.len() {
            if self.edge_3d(i).contains_point(point) {
                return true;
            }
        }
        let p = self.plane.w2p(point);
        self.to_multi_polygon(&self.plane)
            .intersects(&geo::Point::new(p.x, p.y))
    }

    /// True when `other`'s area is entirely covered by this polygon.
    pub fn includes(&self, other: &Polygon) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }
        let frame = self.plane;
        let uncovered = other
            .to_multi_polygon(&frame)
            .difference(&self.to_multi_polygon(&frame));
        uncovered.unsigned_area() < tolerance()
    }

    /// Boundary-inclusive cover test: every edge of `other` lies on or
    /// inside this polygon.
    pub fn includes_all_edges(&self, other: &Polygon) -> bool {
        if other.edge_count() == 0 {
            return false;
        }
        for i in 0..other.edge_count() {
            let edge = other.edge_3d(i);
            if !self.includes_point(&edge.v0)
                || !self.includes_point(&edge.v1)
                || !self.includes_point(&edge.center())
            {
                return false;
            }
        }
        true
    }

    /// Offset the boundary inward by `delta` (negative expands), moving each
    /// edge along its in-plane normal and re-intersecting adjacent edge
    /// lines. Fails without mutating when the result degenerates.
    pub fn inset(&mut self, delta: Real) -> bool {
        if delta.abs() < EPSILON {
            return true;
        }
        if self.is_open() {
            return false;
        }

        let (closed, _) = self.trace_loops();
        let mut new_vertices: Vec<Vertex> = Vec::with_capacity(self.vertices.len());
        let mut new_edges: Vec<Edge> = Vec::with_capacity(self.edges.len());

        for chain in &closed {
            let ring: Vec<Point2<Real>> = chain
                .iter()
                .map(|&e| self.plane.w2p(&self.vertices[self.edges[e].v0].pos))
                .collect();
            let n = ring.len();
            if n < 3 {
                return false;
            }
            let original_area = super::ring_signed_area(&ring);

            // offset every edge toward the interior, which is the left side
            // of a directed edge for outer loops and holes alike
            let mut anchors: Vec<Point2<Real>> = Vec::with_capacity(n);
            let mut directions: Vec<Point2<Real>> = Vec::with_capacity(n);
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                let d = b - a;
                let len = d.norm();
                if len < EPSILON {
                    return false;
                }
                let left = Point2::new(-d.y / len, d.x / len);
                anchors.push(Point2::new(a.x + left.x * delta, a.y + left.y * delta));
                directions.push(Point2::new(d.x, d.y));
            }

            let mut offset_ring: Vec<Point2<Real>> = Vec::with_capacity(n);
            for i in 0..n {
                let prev = (i + n - 1) % n;
                let cross = directions[prev].x * directions[i].y
                    - directions[prev].y * directions[i].x;
                if cross.abs() < EPSILON {
                    // collinear neighbours: the offset anchor is already the
                    // displaced vertex
                    offset_ring.push(anchors[i]);
                    continue;
                }
                let a0 = anchors[prev];
                let d0 = directions[prev];
                let a1 = anchors[i];
                let t = ((a1.x - a0.x) * directions[i].y - (a1.y - a0.y) * directions[i].x)
                    / cross;
                offset_ring.push(Point2::new(a0.x + d0.x * t, a0.y + d0.y * t));
            }

            let offset_area = super::ring_signed_area(&offset_ring);
            if offset_area.abs() < tolerance()
                || (offset_area > 0.0) != (original_area > 0.0)
            {
                return false;
            }

            let base = new_vertices.len();
            new_vertices.extend(
                offset_ring
                    .iter()
                    .map(|p| Vertex::new(self.plane.p2w(p))),
            );
            new_edges.extend((0..n).map(|i| Edge::new(base + i, base + (i + 1) % n)));
        }

        let mut candidate = self.clone();
        candidate.vertices = new_vertices;
        candidate.edges = new_edges;
        candidate.invalidate_bounding_box();
        if !candidate.is_valid() {
            return false;
        }
        candidate.update_uvs();
        *self = candidate;
        true
    }

    // Every edge, closed loops and open chains alike, as a 2D segment in
    // `frame`'s basis.
    fn chain_segments_2d(&self, frame: &crate::plane::Plane) -> Vec<(Point2<Real>, Point2<Real>)> {
        self.edges
            .iter()
            .map(|edge| {
                (
                    frame.w2p(&self.vertices[edge.v0].pos),
                    frame.w2p(&self.vertices[edge.v1].pos),
                )
            })
            .collect()
    }

    // Segments of this polygon's boundary that coincide, same direction,
    // with a boundary segment of `other`.
    fn coincident_same_edges(&self, other: &Polygon) -> Vec<(Point3<Real>, Point3<Real>)> {
        let mut shared = Vec::new();
        for i in 0..self.edge_count() {
            let a = self.edge_3d(i);
            for j in 0..other.edge_count() {
                if a.is_equivalent(&other.edge_3d(j), false) {
                    shared.push((a.v0, a.v1));
                    break;
                }
            }
        }
        shared
    }

    // Split every chain segment at boundary crossings of `other` and keep
    // the halves whose midpoint falls on the requested side. Segments lying
    // on the boundary are kept for both sides.
    fn clip_chains(&mut self, other: &Polygon, keep_inside: bool) -> bool {
        let frame = self.plane;
        let region = other.to_multi_polygon(&frame);

        let boundary: Vec<(Point2<Real>, Point2<Real>)> = (0..other.edge_count())
            .map(|j| {
                let e = other.edge_3d(j);
                (frame.w2p(&e.v0), frame.w2p(&e.v1))
            })
            .collect();

        let mut vertices: Vec<Vertex> = Vec::new();
        let mut edges: Vec<Edge> = Vec::new();

        for i in 0..self.edges.len() {
            let edge = self.edges[i];
            let a3 = self.vertices[edge.v0].pos;
            let b3 = self.vertices[edge.v1].pos;
            let a = frame.w2p(&a3);
            let b = frame.w2p(&b3);

            let mut cuts: Vec<Real> = vec![0.0, 1.0];
            for (q0, q1) in &boundary {
                if let Some((t, _)) = segment_intersection_params(&a, &b, q0, q1) {
                    if t > EPSILON && t < 1.0 - EPSILON {
                        cuts.push(t);
                    }
                }
            }
            cuts.sort_by(Real::total_cmp);
            cuts.dedup_by(|x, y| (*x - *y).abs() < EPSILON);

            for pair in cuts.windows(2) {
                let mid = (pair[0] + pair[1]) * 0.5;
                let sample = Point2::new(a.x + (b.x - a.x) * mid, a.y + (b.y - a.y) * mid);
                let geo_sample = geo::Point::new(sample.x, sample.y);
                let keep = if keep_inside {
                    region.intersects(&geo_sample)
                } else {
                    !region.contains(&geo_sample)
                };
                if keep {
                    let base = vertices.len();
                    vertices.push(Vertex::new(
                        a3 + (b3 - a3) * pair[0],
                    ));
                    vertices.push(Vertex::new(
                        a3 + (b3 - a3) * pair[1],
                    ));
                    edges.push(Edge::with_flags(base, base + 1, edge.flags));
                }
            }
        }

        self.vertices = vertices;
        self.edges = edges;
        self.weld_coincident_vertices();
        self.invalidate_bounding_box();
        self.update_uvs();
        !self.edges.is_empty()
    }

    // Collapse vertices sharing a position so concatenated chains connect,
    // then drop zero-length edges.
    pub(crate) fn weld_coincident_vertices(&mut self) {
        let mut canonical: Vec<usize> = (0..self.vertices.len()).collect();
        for i in 0..self.vertices.len() {
            for j in 0..i {
                if canonical[j] == j
                    && (self.vertices[i].pos - self.vertices[j].pos).norm() < EPSILON
                {
                    canonical[i] = j;
                    break;
                }
            }
        }

        let mut remap: Vec<usize> = vec![usize::MAX; self.vertices.len()];
        let mut kept: Vec<Vertex> = Vec::with_capacity(self.vertices.len());
        for (i, &canon) in canonical.iter().enumerate() {
            if canon == i {
                remap[i] = kept.len();
                kept.push(self.vertices[i]);
            }
        }
        for edge in &mut self.edges {
            edge.v0 = remap[canonical[edge.v0]];
            edge.v1 = remap[canonical[edge.v1]];
        }
        self.edges.retain(|e| e.v0 != e.v1);
        self.vertices = kept;
        self.invalidate_bounding_box();
    }
}
