//! Planar polygons with holes: the unit of geometry every brush is made of.
//!
//! A `Polygon` owns its vertices and a soup of directed edges forming one or
//! more loops on a single [`Plane`]. Closed polygons carry one outer loop
//! (counter-clockwise in the plane basis) plus zero or more hole loops wound
//! the opposite way; open polygons are polyline chains produced by
//! interactive drawing. Boolean composition against another coplanar polygon
//! lives in [`boolean`], nearest-edge and distance queries in [`query`].

use crate::edge::{Edge, Edge3D, EdgeFlags};
use crate::errors::ValidationError;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::float_types::{EPSILON, Real, tolerance};
use crate::plane::Plane;
use crate::vertex::Vertex;
use geo::{Contains, Coord, CoordsIter, LineString, MultiPolygon, Polygon as GeoPolygon};
use hashbrown::HashMap;
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use std::sync::OnceLock;

mod boolean;
mod query;

pub use boolean::IntersectionType;

/// Per-polygon flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolygonFlags(pub u32);

impl PolygonFlags {
    /// The polygon is the mirrored counterpart of another; mirrored and
    /// non-mirrored polygons never combine in boolean folds.
    pub const MIRRORED: PolygonFlags = PolygonFlags(1);
    /// Excluded from rendering and picking by the caller.
    pub const HIDDEN: PolygonFlags = PolygonFlags(2);

    pub const fn contains(self, other: PolygonFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn with(self, other: PolygonFlags) -> PolygonFlags {
        PolygonFlags(self.0 | other.0)
    }

    pub const fn without(self, other: PolygonFlags) -> PolygonFlags {
        PolygonFlags(self.0 & !other.0)
    }
}

/// Per-face texture projection: shift, scale and rotation applied to the
/// plane-space coordinates of each vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexInfo {
    pub shift: [Real; 2],
    pub scale: [Real; 2],
    pub rotation: Real,
}

impl Default for TexInfo {
    fn default() -> Self {
        TexInfo {
            shift: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
        }
    }
}

/// Selects what [`Polygon::get_separated_polygons`] extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparateMode {
    /// One polygon per outer loop, with its holes attached.
    Islands,
    /// Outer loops only, holes dropped.
    OuterHull,
    /// Each hole loop as its own outward-wound polygon.
    Holes,
}

/// An ordered set of loops on one plane, with per-face material and
/// texture-projection metadata.
///
/// Polygons are value-like: they are deep-cloned freely and never refer back
/// to the [`Model`](crate::model::Model) that owns them. Boolean operators
/// mutate in place and report success as `bool`; degenerate outcomes are
/// observable through [`Polygon::is_valid`] / [`Polygon::is_open`] rather
/// than errors.
#[derive(Debug, Clone)]
pub struct Polygon {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    plane: Plane,
    material_id: i32,
    tex_info: TexInfo,
    flags: PolygonFlags,
    bounding_box: OnceLock<Aabb>,
}

impl Polygon {
    /// Closed polygon from one ordered loop of 3D points. The plane is
    /// fitted with Newell's method, so the loop's winding defines the facing.
    /// Returns `None` for degenerate input.
    pub fn new(points: &[Point3<Real>]) -> Option<Polygon> {
        let normal = newell_normal(points);
        if normal.norm_squared() < EPSILON * EPSILON {
            return None;
        }
        let centroid = points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / points.len() as Real;
        let plane = Plane::from_normal_point(normal, Point3::from(centroid))?;
        Polygon::from_loops(plane, points, &[], 0, TexInfo::default())
    }

    /// Primary constructor: a closed outer loop plus hole loops, all on
    /// `plane`. Vertices are snapped onto the plane and loops are rewound to
    /// the invariant orientation (outer counter-clockwise in the plane
    /// basis, holes clockwise). Returns `None` when any loop degenerates.
    pub fn from_loops(
        plane: Plane,
        outer: &[Point3<Real>],
        holes: &[Vec<Point3<Real>>],
        material_id: i32,
        tex_info: TexInfo,
    ) -> Option<Polygon> {
        let mut polygon = Polygon {
            vertices: Vec::new(),
            edges: Vec::new(),
            plane,
            material_id,
            tex_info,
            flags: PolygonFlags::default(),
            bounding_box: OnceLock::new(),
        };

        polygon.push_loop(outer, false)?;
        for hole in holes {
            polygon.push_loop(hole, true)?;
        }
        polygon.update_uvs();
        Some(polygon)
    }

    /// As [`Polygon::from_loops`] with the loops given in the plane's 2D frame.
    pub fn from_2d_loops(
        plane: Plane,
        outer: &[Point2<Real>],
        holes: &[Vec<Point2<Real>>],
        material_id: i32,
        tex_info: TexInfo,
    ) -> Option<Polygon> {
        let lift = |ring: &[Point2<Real>]| -> Vec<Point3<Real>> {
            ring.iter().map(|p| plane.p2w(p)).collect()
        };
        let outer3 = lift(outer);
        let holes3: Vec<Vec<Point3<Real>>> = holes.iter().map(|h| lift(h)).collect();
        Polygon::from_loops(plane, &outer3, &holes3, material_id, tex_info)
    }

    /// Open polyline from an ordered point chain; `is_open()` is true for the
    /// result. Returns `None` for fewer than two distinct points.
    pub fn open_from_points(points: &[Point3<Real>]) -> Option<Polygon> {
        let mut chain: Vec<Point3<Real>> = Vec::with_capacity(points.len());
        for p in points {
            if chain
                .last()
                .is_none_or(|last: &Point3<Real>| (p - last).norm() >= EPSILON)
            {
                chain.push(*p);
            }
        }
        if chain.len() < 2 {
            return None;
        }

        let plane = plane_through_chain(&chain)?;
        let mut polygon = Polygon {
            vertices: chain.iter().map(|p| Vertex::new(*p)).collect(),
            edges: (0..chain.len() - 1).map(|i| Edge::new(i, i + 1)).collect(),
            plane,
            material_id: 0,
            tex_info: TexInfo::default(),
            flags: PolygonFlags::default(),
            bounding_box: OnceLock::new(),
        };
        polygon.update_uvs();
        Some(polygon)
    }

    // Append one loop, snapped to the plane, rewound so that outer loops run
    // counter-clockwise in the plane basis and holes clockwise.
    fn push_loop(&mut self, points: &[Point3<Real>], hole: bool) -> Option<()> {
        let mut ring: Vec<Point3<Real>> = Vec::with_capacity(points.len());
        for p in points {
            let snapped = p - self.plane.normal() * self.plane.distance_to(p);
            if ring
                .last()
                .is_none_or(|last: &Point3<Real>| (snapped - last).norm() >= EPSILON)
            {
                ring.push(snapped);
            }
        }
        // drop an explicitly closed input ring's duplicate endpoint
        if ring.len() >= 2 && (ring[0] - ring[ring.len() - 1]).norm() < EPSILON {
            ring.pop();
        }
        if ring.len() < 3 {
            return None;
        }

        let projected: Vec<Point2<Real>> = ring.iter().map(|p| self.plane.w2p(p)).collect();
        let area = ring_signed_area(&projected);
        if area.abs() < tolerance() {
            return None;
        }
        if (area > 0.0) == hole {
            ring.reverse();
        }

        let base = self.vertices.len();
        let n = ring.len();
        self.vertices.extend(ring.into_iter().map(Vertex::new));
        self.edges
            .extend((0..n).map(|i| Edge::new(base + i, base + (i + 1) % n)));
        Some(())
    }

    pub const fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn set_plane(&mut self, plane: Plane) {
        self.plane = plane;
    }

    pub const fn material_id(&self) -> i32 {
        self.material_id
    }

    pub fn set_material_id(&mut self, material_id: i32) {
        self.material_id = material_id;
    }

    pub const fn tex_info(&self) -> &TexInfo {
        &self.tex_info
    }

    pub fn set_tex_info(&mut self, tex_info: TexInfo) {
        self.tex_info = tex_info;
        self.update_uvs();
    }

    pub const fn flags(&self) -> PolygonFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: PolygonFlags) {
        self.flags = flags;
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn pos(&self, index: usize) -> Point3<Real> {
        self.vertices[index].pos
    }

    /// The `index`-th edge as a 3D segment.
    pub fn edge_3d(&self, index: usize) -> Edge3D {
        let edge = self.edges[index];
        Edge3D::new(self.vertices[edge.v0].pos, self.vertices[edge.v1].pos)
    }

    pub fn has_bridge_edges(&self) -> bool {
        self.edges.iter().any(|e| e.is_bridge())
    }

    /// Remove all geometry; the polygon reports `is_valid() == false`
    /// afterwards. Used by boolean operators whose result is empty.
    pub(crate) fn clear_geometry(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.invalidate_bounding_box();
    }

    // ------------------------------------------------------------------
    // loops
    // ------------------------------------------------------------------

    /// Walk the edge soup into `(closed_loops, open_chains)`, both as lists
    /// of edge indices in traversal order.
    pub(crate) fn trace_loops(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let mut outgoing: HashMap<usize, Vec<usize>> = HashMap::new();
        for (i, edge) in self.edges.iter().enumerate() {
            outgoing.entry(edge.v0).or_default().push(i);
        }

        let mut visited = vec![false; self.edges.len()];
        let mut closed = Vec::new();
        let mut open = Vec::new();

        for start in 0..self.edges.len() {
            if visited[start] {
                continue;
            }
            let mut chain = vec![start];
            visited[start] = true;
            let mut cursor = self.edges[start].v1;

            loop {
                let next = outgoing
                    .get(&cursor)
                    .and_then(|candidates| candidates.iter().find(|&&e| !visited[e]))
                    .copied();
                match next {
                    Some(e) if self.edges[e].v1 == self.edges[start].v0 => {
                        visited[e] = true;
                        chain.push(e);
                        closed.push(chain);
                        break;
                    },
                    Some(e) => {
                        visited[e] = true;
                        chain.push(e);
                        cursor = self.edges[e].v1;
                    },
                    None => {
                        if cursor == self.edges[start].v0 {
                            closed.push(chain);
                        } else {
                            open.push(chain);
                        }
                        break;
                    },
                }
            }
        }

        (closed, open)
    }

    /// Closed loops as ordered vertex-index lists.
    pub fn loops(&self) -> Vec<Vec<usize>> {
        self.trace_loops()
            .0
            .into_iter()
            .map(|chain| chain.into_iter().map(|e| self.edges[e].v0).collect())
            .collect()
    }

    /// Open chains as ordered vertex-index lists (first to dangling end).
    pub fn open_chains(&self) -> Vec<Vec<usize>> {
        self.trace_loops()
            .1
            .into_iter()
            .map(|chain| {
                let mut vertices: Vec<usize> =
                    chain.iter().map(|&e| self.edges[e].v0).collect();
                if let Some(&last) = chain.last() {
                    vertices.push(self.edges[last].v1);
                }
                vertices
            })
            .collect()
    }

    /// True if any chain has a dangling endpoint. Open polygons are
    /// intermediate drawing results and are rejected by the boolean operators.
    pub fn is_open(&self) -> bool {
        if self.edges.is_empty() {
            return false;
        }
        !self.trace_loops().1.is_empty()
    }

    // ------------------------------------------------------------------
    // validity
    // ------------------------------------------------------------------

    /// Diagnostic validity check. [`Polygon::is_valid`] is the sentinel
    /// form most callers use.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.vertices.len() < 3 || self.edges.len() < 3 {
            let at = self
                .vertices
                .first()
                .map_or_else(Point3::origin, |v| v.pos);
            return Err(ValidationError::TooFewPoints(at));
        }

        for vertex in &self.vertices {
            if !vertex.pos.coords.iter().all(|c| c.is_finite()) {
                return Err(ValidationError::InvalidCoordinate(vertex.pos));
            }
            let distance = self.plane.distance_to(&vertex.pos);
            if distance.abs() > tolerance() * 10.0 {
                return Err(ValidationError::OffPlane {
                    point: vertex.pos,
                    distance,
                });
            }
        }

        let (closed, open) = self.trace_loops();
        if let Some(chain) = open.first() {
            let last = chain.last().copied().unwrap_or(0);
            return Err(ValidationError::OpenLoop(self.vertices[self.edges[last].v1].pos));
        }

        let mut outers: Vec<Vec<Point2<Real>>> = Vec::new();
        let mut holes: Vec<Vec<Point2<Real>>> = Vec::new();
        let mut total_area = 0.0;
        for chain in &closed {
            if chain.len() < 3 {
                return Err(ValidationError::TooFewPoints(
                    self.vertices[self.edges[chain[0]].v0].pos,
                ));
            }
            for &e in chain {
                let edge = self.edges[e];
                if (self.vertices[edge.v0].pos - self.vertices[edge.v1].pos).norm() < EPSILON
                {
                    return Err(ValidationError::RepeatedPoint(self.vertices[edge.v0].pos));
                }
            }
            let ring: Vec<Point2<Real>> = chain
                .iter()
                .map(|&e| self.plane.w2p(&self.vertices[self.edges[e].v0].pos))
                .collect();
            let area = ring_signed_area(&ring);
            total_area += area;
            if area > 0.0 {
                outers.push(ring);
            } else {
                holes.push(ring);
            }
        }

        if let Some(at) = self.find_self_intersection(&closed) {
            return Err(ValidationError::SelfIntersection(at));
        }

        for hole in &holes {
            let inside_some_outer = outers.iter().any(|outer| {
                let shell = GeoPolygon::new(ring_to_linestring(outer), Vec::new());
                hole.iter().any(|p| shell.contains(&geo::Point::new(p.x, p.y)))
            });
            if !inside_some_outer {
                let lifted = self.plane.p2w(&hole[0]);
                return Err(ValidationError::HoleOutsideShell(lifted));
            }
        }

        if total_area < tolerance() {
            return Err(ValidationError::ZeroArea);
        }

        Ok(())
    }

    /// True iff the loops are well-formed: closed, non-self-intersecting,
    /// holes inside the boundary, at least 3 distinct vertices, nonzero area.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    // Transversal crossing between any two non-adjacent edges, bridge pairs
    // excepted (they overlap by construction, never cross).
    fn find_self_intersection(&self, closed: &[Vec<usize>]) -> Option<Point3<Real>> {
        let all_edges: Vec<usize> = closed.iter().flatten().copied().collect();
        for (a_pos, &a) in all_edges.iter().enumerate() {
            for &b in all_edges.iter().skip(a_pos + 1) {
                let ea = self.edges[a];
                let eb = self.edges[b];
                if ea.is_bridge() || eb.is_bridge() {
                    continue;
                }
                if ea.v0 == eb.v0 || ea.v0 == eb.v1 || ea.v1 == eb.v0 || ea.v1 == eb.v1 {
                    continue;
                }
                let p0 = self.plane.w2p(&self.vertices[ea.v0].pos);
                let p1 = self.plane.w2p(&self.vertices[ea.v1].pos);
                let q0 = self.plane.w2p(&self.vertices[eb.v0].pos);
                let q1 = self.plane.w2p(&self.vertices[eb.v1].pos);
                // endpoint coincidence without shared indices is still a touch
                let endpoint_touch = [(p0, q0), (p0, q1), (p1, q0), (p1, q1)]
                    .iter()
                    .any(|(m, n)| (m - n).norm() < EPSILON);
                if !endpoint_touch && segments_cross(&p0, &p1, &q0, &q1) {
                    return Some(self.vertices[ea.v0].pos);
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // metrics
    // ------------------------------------------------------------------

    /// Planar area: outer loops minus holes.
    pub fn area(&self) -> Real {
        let (closed, _) = self.trace_loops();
        closed
            .iter()
            .map(|chain| {
                let ring: Vec<Point2<Real>> = chain
                    .iter()
                    .map(|&e| self.plane.w2p(&self.vertices[self.edges[e].v0].pos))
                    .collect();
                ring_signed_area(&ring)
            })
            .sum::<Real>()
            .max(0.0)
    }

    /// Average of the loop vertex positions.
    pub fn center_position(&self) -> Point3<Real> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.pos.coords);
        Point3::from(sum / self.vertices.len() as Real)
    }

    /// Lazily cached bounds spanning every vertex.
    pub fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            let mut mins = Point3::new(Real::MAX, Real::MAX, Real::MAX);
            let mut maxs = Point3::new(-Real::MAX, -Real::MAX, -Real::MAX);
            for vertex in &self.vertices {
                mins.x = mins.x.min(vertex.pos.x);
                mins.y = mins.y.min(vertex.pos.y);
                mins.z = mins.z.min(vertex.pos.z);
                maxs.x = maxs.x.max(vertex.pos.x);
                maxs.y = maxs.y.max(vertex.pos.y);
                maxs.z = maxs.z.max(vertex.pos.z);
            }
            if mins.x > maxs.x {
                return Aabb::new(Point3::origin(), Point3::origin());
            }
            Aabb::new(mins, maxs)
        })
    }

    pub fn invalidate_bounding_box(&mut self) {
        self.bounding_box = OnceLock::new();
    }

    // ------------------------------------------------------------------
    // mutation
    // ------------------------------------------------------------------

    /// Reverse winding and plane orientation in place. Involution:
    /// `flip(); flip();` reproduces the original polygon.
    pub fn flip(&mut self) {
        for edge in &mut self.edges {
            *edge = edge.reversed();
        }
        self.plane.invert();
        self.update_uvs();
    }

    /// Reproject every vertex onto `plane` along its normal. Returns false
    /// (and leaves the polygon untouched) when `plane` is already equivalent.
    pub fn update_plane(&mut self, plane: Plane) -> bool {
        if plane.is_equivalent(&self.plane) {
            return false;
        }
        let flipped = plane.normal().dot(&self.plane.normal()) < 0.0;
        for vertex in &mut self.vertices {
            vertex.pos -= plane.normal() * plane.distance_to(&vertex.pos);
        }
        if flipped {
            for edge in &mut self.edges {
                *edge = edge.reversed();
            }
        }
        self.plane = plane;
        self.invalidate_bounding_box();
        self.update_uvs();
        true
    }

    /// Reproject every vertex onto `plane` by casting along `direction`.
    /// Fails (no mutation) when any vertex misses the plane.
    pub fn update_plane_along(&mut self, plane: Plane, direction: Vector3<Real>) -> bool {
        use crate::float_types::parry3d::query::Ray;

        let mut projected = Vec::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            let ray = Ray::new(vertex.pos, direction);
            match plane.hit_test(&ray) {
                Some((_, point)) => projected.push(point),
                None => return false,
            }
        }

        for (vertex, point) in self.vertices.iter_mut().zip(projected) {
            vertex.pos = point;
        }
        if plane.normal().dot(&self.plane.normal()) < 0.0 {
            for edge in &mut self.edges {
                *edge = edge.reversed();
            }
        }
        self.plane = plane;
        self.invalidate_bounding_box();
        self.update_uvs();
        true
    }

    /// Apply an arbitrary affine transform and refit the plane.
    pub fn transform(&mut self, matrix: &Matrix4<Real>) {
        for vertex in &mut self.vertices {
            let homogeneous = matrix * vertex.pos.to_homogeneous();
            if let Some(point) = Point3::from_homogeneous(homogeneous) {
                vertex.pos = point;
            }
        }

        let positions: Vec<Point3<Real>> = self
            .loops()
            .first()
            .map(|ring| ring.iter().map(|&i| self.vertices[i].pos).collect())
            .unwrap_or_default();
        let normal = newell_normal(&positions);
        if normal.norm_squared() >= EPSILON * EPSILON {
            let centroid = positions
                .iter()
                .fold(Vector3::zeros(), |acc, p| acc + p.coords)
                / positions.len() as Real;
            if let Some(plane) = Plane::from_normal_point(normal, Point3::from(centroid)) {
                self.plane = plane;
            }
        } else if let Some(inverse) = matrix.try_inverse() {
            // open chains keep their plane via the normal transform rule
            let normal = inverse
                .transpose()
                .transform_vector(&self.plane.normal());
            if let Some(first) = self.vertices.first() {
                if let Some(plane) = Plane::from_normal_point(normal, first.pos) {
                    self.plane = plane;
                }
            }
        }

        self.invalidate_bounding_box();
        self.update_uvs();
    }

    /// Rigid translation of every vertex and the plane.
    pub fn translate(&mut self, offset: &Vector3<Real>) {
        for vertex in &mut self.vertices {
            vertex.pos += offset;
        }
        if let Some(first) = self.vertices.first() {
            if let Some(plane) = Plane::from_normal_point(self.plane.normal(), first.pos) {
                self.plane = plane;
            }
        }
        self.invalidate_bounding_box();
    }

    /// Recompute per-vertex UVs from the plane projection and [`TexInfo`].
    pub fn update_uvs(&mut self) {
        let plane = self.plane;
        let (sin, cos) = self.tex_info.rotation.sin_cos();
        let scale_u = if self.tex_info.scale[0].abs() < EPSILON {
            1.0
        } else {
            self.tex_info.scale[0]
        };
        let scale_v = if self.tex_info.scale[1].abs() < EPSILON {
            1.0
        } else {
            self.tex_info.scale[1]
        };
        for vertex in &mut self.vertices {
            let p = plane.w2p(&vertex.pos);
            let rotated = Point2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);
            vertex.uv = Point2::new(
                rotated.x / scale_u + self.tex_info.shift[0],
                rotated.y / scale_v + self.tex_info.shift[1],
            );
        }
    }

    /// Drop collinear and coincident vertices loop by loop, in place.
    /// Loops carrying bridge edges are preserved untouched.
    pub fn optimize(&mut self) {
        let (closed, open) = self.trace_loops();
        let mut new_vertices: Vec<Vertex> = Vec::with_capacity(self.vertices.len());
        let mut new_edges: Vec<Edge> = Vec::with_capacity(self.edges.len());

        for chain in &closed {
            if chain.iter().any(|&e| self.edges[e].is_bridge()) {
                copy_chain(self, chain, true, &mut new_vertices, &mut new_edges);
                continue;
            }
            let ring: Vec<usize> = chain.iter().map(|&e| self.edges[e].v0).collect();
            let cleaned = self.drop_redundant(&ring, true);
            if cleaned.len() < 3 {
                continue;
            }
            let base = new_vertices.len();
            let n = cleaned.len();
            new_vertices.extend(cleaned.iter().map(|&i| self.vertices[i]));
            new_edges.extend((0..n).map(|i| Edge::new(base + i, base + (i + 1) % n)));
        }

        for chain in &open {
            let mut path: Vec<usize> = chain.iter().map(|&e| self.edges[e].v0).collect();
            if let Some(&last) = chain.last() {
                path.push(self.edges[last].v1);
            }
            let cleaned = self.drop_redundant(&path, false);
            if cleaned.len() < 2 {
                continue;
            }
            let base = new_vertices.len();
            new_vertices.extend(cleaned.iter().map(|&i| self.vertices[i]));
            new_edges
                .extend((0..cleaned.len() - 1).map(|i| Edge::new(base + i, base + i + 1)));
        }

        self.vertices = new_vertices;
        self.edges = new_edges;
        self.invalidate_bounding_box();
    }

    // Keep a vertex only if it is distinct from its predecessor and not
    // collinear with its neighbours.
    fn drop_redundant(&self, path: &[usize], cyclic: bool) -> Vec<usize> {
        let mut kept: Vec<usize> = Vec::with_capacity(path.len());
        let n = path.len();
        for (i, &v) in path.iter().enumerate() {
            let prev = if i == 0 {
                if cyclic { Some(path[n - 1]) } else { None }
            } else {
                Some(path[i - 1])
            };
            let next = if i + 1 == n {
                if cyclic { Some(path[0]) } else { None }
            } else {
                Some(path[i + 1])
            };
            let keep = match (prev, next) {
                (Some(p), Some(q)) => {
                    let a = self.vertices[p].pos;
                    let b = self.vertices[v].pos;
                    let c = self.vertices[q].pos;
                    (b - a).norm() >= EPSILON
                        && (b - a).cross(&(c - b)).norm() >= tolerance()
                },
                (Some(p), None) => (self.vertices[v].pos - self.vertices[p].pos).norm() >= EPSILON,
                _ => true,
            };
            if keep {
                kept.push(v);
            }
        }
        kept
    }

    // ------------------------------------------------------------------
    // separation
    // ------------------------------------------------------------------

    /// Split a polygon-with-holes into independent simple polygons.
    /// See [`SeparateMode`] for what each mode extracts.
    pub fn get_separated_polygons(&self, mode: SeparateMode) -> Vec<Polygon> {
        let (closed, _) = self.trace_loops();
        let mut outers: Vec<(Vec<Point3<Real>>, Vec<Point2<Real>>)> = Vec::new();
        let mut holes: Vec<(Vec<Point3<Real>>, Vec<Point2<Real>>)> = Vec::new();

        for chain in &closed {
            let ring3: Vec<Point3<Real>> = chain
                .iter()
                .map(|&e| self.vertices[self.edges[e].v0].pos)
                .collect();
            let ring2: Vec<Point2<Real>> = ring3.iter().map(|p| self.plane.w2p(p)).collect();
            if ring_signed_area(&ring2) > 0.0 {
                outers.push((ring3, ring2));
            } else {
                holes.push((ring3, ring2));
            }
        }

        let mut separated = Vec::new();
        match mode {
            SeparateMode::Islands => {
                for (outer3, outer2) in &outers {
                    let shell = GeoPolygon::new(ring_to_linestring(outer2), Vec::new());
                    let attached: Vec<Vec<Point3<Real>>> = holes
                        .iter()
                        .filter(|(_, hole2)| {
                            hole2
                                .iter()
                                .any(|p| shell.contains(&geo::Point::new(p.x, p.y)))
                        })
                        .map(|(hole3, _)| hole3.clone())
                        .collect();
                    if let Some(mut polygon) = Polygon::from_loops(
                        self.plane,
                        outer3,
                        &attached,
                        self.material_id,
                        self.tex_info,
                    ) {
                        polygon.flags = self.flags;
                        separated.push(polygon);
                    }
                }
            },
            SeparateMode::OuterHull => {
                for (outer3, _) in &outers {
                    if let Some(mut polygon) = Polygon::from_loops(
                        self.plane,
                        outer3,
                        &[],
                        self.material_id,
                        self.tex_info,
                    ) {
                        polygon.flags = self.flags;
                        separated.push(polygon);
                    }
                }
            },
            SeparateMode::Holes => {
                for (hole3, _) in &holes {
                    if let Some(mut polygon) = Polygon::from_loops(
                        self.plane,
                        hole3,
                        &[],
                        self.material_id,
                        self.tex_info,
                    ) {
                        polygon.flags = self.flags;
                        separated.push(polygon);
                    }
                }
            },
        }
        separated
    }

    /// Drop every hole loop in place, keeping only the outer boundary.
    pub fn remove_inside(&mut self) {
        let separated = self.get_separated_polygons(SeparateMode::OuterHull);
        if let Some(outer) = separated.into_iter().next() {
            self.vertices = outer.vertices;
            self.edges = outer.edges;
            self.invalidate_bounding_box();
        }
    }

    /// Single-loop form of a polygon-with-holes: each hole is joined to the
    /// outer boundary by a pair of opposite, BRIDGE-flagged edges. Returns
    /// `None` for open polygons or multi-island polygons.
    pub fn unify_with_bridges(&self) -> Option<Polygon> {
        let (closed, open) = self.trace_loops();
        if !open.is_empty() || closed.is_empty() {
            return None;
        }

        let mut outer: Option<Vec<usize>> = None;
        let mut holes: Vec<Vec<usize>> = Vec::new();
        for chain in &closed {
            let ring: Vec<usize> = chain.iter().map(|&e| self.edges[e].v0).collect();
            let projected: Vec<Point2<Real>> =
                ring.iter().map(|&i| self.plane.w2p(&self.vertices[i].pos)).collect();
            if ring_signed_area(&projected) > 0.0 {
                if outer.is_some() {
                    return None;
                }
                outer = Some(ring);
            } else {
                holes.push(ring);
            }
        }
        let outer = outer?;
        if holes.is_empty() {
            let mut clone = self.clone();
            clone.invalidate_bounding_box();
            return Some(clone);
        }

        let project = |i: usize| self.plane.w2p(&self.vertices[i].pos);

        // rightmost holes first, the classic hole-elimination order
        holes.sort_by(|a, b| {
            let ax = a.iter().map(|&i| project(i).x).fold(-Real::MAX, Real::max);
            let bx = b.iter().map(|&i| project(i).x).fold(-Real::MAX, Real::max);
            bx.total_cmp(&ax)
        });

        // the working ring keeps original vertex indices; occurrences are
        // duplicated into fresh vertices at the end
        let mut ring: Vec<usize> = outer;

        for hole in &holes {
            let h = hole
                .iter()
                .enumerate()
                .max_by(|a, b| project(*a.1).x.total_cmp(&project(*b.1).x))
                .map(|(i, _)| i)?;
            let hole_point = project(hole[h]);

            // all current edges block visibility: ring edges plus hole edges
            let mut blockers: Vec<(Point2<Real>, Point2<Real>)> = Vec::new();
            for w in 0..ring.len() {
                blockers.push((project(ring[w]), project(ring[(w + 1) % ring.len()])));
            }
            for other in &holes {
                for w in 0..other.len() {
                    blockers.push((project(other[w]), project(other[(w + 1) % other.len()])));
                }
            }

            let mut candidates: Vec<usize> = (0..ring.len()).collect();
            candidates.sort_by(|&a, &b| {
                let da = (project(ring[a]) - hole_point).norm_squared();
                let db = (project(ring[b]) - hole_point).norm_squared();
                da.total_cmp(&db)
            });

            let visible = candidates.iter().copied().find(|&c| {
                let anchor = project(ring[c]);
                !blockers.iter().any(|(b0, b1)| {
                    let shares_endpoint = (b0 - anchor).norm() < EPSILON
                        || (b1 - anchor).norm() < EPSILON
                        || (b0 - hole_point).norm() < EPSILON
                        || (b1 - hole_point).norm() < EPSILON;
                    !shares_endpoint && segments_cross(&anchor, &hole_point, b0, b1)
                })
            });
            let anchor = visible.unwrap_or(candidates[0]);

            // splice: ... ring[anchor], hole[h..], hole[..h], hole[h], ring[anchor], ...
            let mut spliced: Vec<usize> = Vec::with_capacity(ring.len() + hole.len() + 2);
            spliced.extend_from_slice(&ring[..=anchor]);
            for k in 0..hole.len() {
                spliced.push(hole[(h + k) % hole.len()]);
            }
            spliced.push(hole[h]);
            spliced.push(ring[anchor]);
            spliced.extend_from_slice(&ring[anchor + 1..]);
            ring = spliced;
        }

        // each occurrence of a source vertex becomes its own vertex
        let mut unified = Polygon {
            vertices: ring.iter().map(|&i| self.vertices[i]).collect(),
            edges: Vec::with_capacity(ring.len()),
            plane: self.plane,
            material_id: self.material_id,
            tex_info: self.tex_info,
            flags: self.flags,
            bounding_box: OnceLock::new(),
        };
        let n = ring.len();
        for i in 0..n {
            unified.edges.push(Edge::new(i, (i + 1) % n));
        }
        // bridge joints were recorded against the evolving ring; recover them
        // by position: an edge is a bridge when its segment coincides with a
        // reversed twin elsewhere in the ring
        for i in 0..n {
            let a0 = unified.vertices[i].pos;
            let a1 = unified.vertices[(i + 1) % n].pos;
            for j in i + 1..n {
                let b0 = unified.vertices[j].pos;
                let b1 = unified.vertices[(j + 1) % n].pos;
                if (a0 - b1).norm() < EPSILON && (a1 - b0).norm() < EPSILON {
                    unified.edges[i].flags = unified.edges[i].flags.insert(EdgeFlags::BRIDGE);
                    unified.edges[j].flags = unified.edges[j].flags.insert(EdgeFlags::BRIDGE);
                }
            }
        }
        Some(unified)
    }

    /// Same plane and boundaries enclosing the same region, start vertex and
    /// winding notwithstanding.
    pub fn is_equivalent(&self, other: &Polygon) -> bool {
        if !self.plane.is_equivalent(other.plane()) {
            return false;
        }
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        let a = self.to_multi_polygon(&self.plane);
        let b = other.to_multi_polygon(&self.plane);
        use geo::BooleanOps;
        use geo::Area;
        a.xor(&b).unsigned_area() < tolerance()
    }

    // ------------------------------------------------------------------
    // geo conversions
    // ------------------------------------------------------------------

    /// Project every closed loop into `frame`'s 2D basis and assemble a
    /// `MultiPolygon` with holes assigned to their containing outer loop.
    pub(crate) fn to_multi_polygon(&self, frame: &Plane) -> MultiPolygon<Real> {
        let (closed, _) = self.trace_loops();
        let mut outers: Vec<Vec<Point2<Real>>> = Vec::new();
        let mut holes: Vec<Vec<Point2<Real>>> = Vec::new();

        for chain in &closed {
            let ring: Vec<Point2<Real>> = chain
                .iter()
                .map(|&e| frame.w2p(&self.vertices[self.edges[e].v0].pos))
                .collect();
            if ring.len() < 3 {
                continue;
            }
            if ring_signed_area(&ring) > 0.0 {
                outers.push(ring);
            } else {
                holes.push(ring);
            }
        }

        let mut polygons: Vec<GeoPolygon<Real>> = Vec::with_capacity(outers.len());
        for outer in &outers {
            let shell = GeoPolygon::new(ring_to_linestring(outer), Vec::new());
            let interiors: Vec<LineString<Real>> = holes
                .iter()
                .filter(|hole| {
                    hole.iter()
                        .any(|p| shell.contains(&geo::Point::new(p.x, p.y)))
                })
                .map(|hole| ring_to_linestring(hole))
                .collect();
            polygons.push(GeoPolygon::new(ring_to_linestring(outer), interiors));
        }
        MultiPolygon::new(polygons)
    }

    /// Replace this polygon's geometry with `multi_polygon`, lifted out of
    /// the plane's 2D basis. Islands and holes land as separate loops.
    pub(crate) fn rebuild_from_multi_polygon(&mut self, multi_polygon: &MultiPolygon<Real>) {
        self.vertices.clear();
        self.edges.clear();

        let plane = self.plane;
        let mut push_ring = |polygon: &mut Polygon, ring: &LineString<Real>, hole: bool| {
            let mut coords: Vec<Coord<Real>> = ring.coords_iter().collect();
            if coords.len() >= 2 && coords.first() == coords.last() {
                coords.pop();
            }
            let mut points: Vec<Point2<Real>> = Vec::with_capacity(coords.len());
            for c in coords {
                let p = Point2::new(c.x, c.y);
                if points
                    .last()
                    .is_none_or(|last: &Point2<Real>| (p - last).norm() >= EPSILON)
                {
                    points.push(p);
                }
            }
            if points.len() < 3 {
                return;
            }
            let area = ring_signed_area(&points);
            if area.abs() < tolerance() {
                return;
            }
            if (area > 0.0) == hole {
                points.reverse();
            }
            let base = polygon.vertices.len();
            let n = points.len();
            polygon
                .vertices
                .extend(points.iter().map(|p| Vertex::new(plane.p2w(p))));
            polygon
                .edges
                .extend((0..n).map(|i| Edge::new(base + i, base + (i + 1) % n)));
        };

        for geo_polygon in multi_polygon {
            let exterior = geo_polygon.exterior().clone();
            push_ring(self, &exterior, false);
            for interior in geo_polygon.interiors() {
                push_ring(self, interior, true);
            }
        }

        self.invalidate_bounding_box();
        self.update_uvs();
    }
}

fn copy_chain(
    source: &Polygon,
    chain: &[usize],
    cyclic: bool,
    vertices: &mut Vec<Vertex>,
    edges: &mut Vec<Edge>,
) {
    let base = vertices.len();
    let n = chain.len();
    for &e in chain {
        vertices.push(source.vertices[source.edges[e].v0]);
    }
    for (i, &e) in chain.iter().enumerate() {
        if cyclic || i + 1 < n {
            edges.push(Edge::with_flags(
                base + i,
                base + (i + 1) % n,
                source.edges[e].flags,
            ));
        }
    }
}

/// Shoelace signed area of a 2D ring (positive = counter-clockwise).
pub(crate) fn ring_signed_area(ring: &[Point2<Real>]) -> Real {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut doubled = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        doubled += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
    }
    doubled * 0.5
}

pub(crate) fn ring_to_linestring(ring: &[Point2<Real>]) -> LineString<Real> {
    let mut coords: Vec<Coord<Real>> =
        ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Transversal crossing of two 2D segments, endpoints exclusive.
pub(crate) fn segments_cross(
    p0: &Point2<Real>,
    p1: &Point2<Real>,
    q0: &Point2<Real>,
    q1: &Point2<Real>,
) -> bool {
    let orient = |a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>| -> Real {
        robust::orient2d(
            robust::Coord { x: a.x as f64, y: a.y as f64 },
            robust::Coord { x: b.x as f64, y: b.y as f64 },
            robust::Coord { x: c.x as f64, y: c.y as f64 },
        ) as Real
    };
    let d1 = orient(p0, p1, q0);
    let d2 = orient(p0, p1, q1);
    let d3 = orient(q0, q1, p0);
    let d4 = orient(q0, q1, p1);
    (d1 > 0.0) != (d2 > 0.0)
        && (d3 > 0.0) != (d4 > 0.0)
        && d1 != 0.0
        && d2 != 0.0
        && d3 != 0.0
        && d4 != 0.0
}

/// Intersection of two 2D segments as parameters along each, `None` when
/// parallel or when the intersection falls outside either segment.
pub(crate) fn segment_intersection_params(
    p0: &Point2<Real>,
    p1: &Point2<Real>,
    q0: &Point2<Real>,
    q1: &Point2<Real>,
) -> Option<(Real, Real)> {
    let d = p1 - p0;
    let e = q1 - q0;
    let denom = d.x * e.y - d.y * e.x;
    if denom.abs() < EPSILON {
        return None;
    }
    let w = q0 - p0;
    let t = (w.x * e.y - w.y * e.x) / denom;
    let u = (w.x * d.y - w.y * d.x) / denom;
    if !(-EPSILON..=1.0 + EPSILON).contains(&t) || !(-EPSILON..=1.0 + EPSILON).contains(&u) {
        return None;
    }
    Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
}

/// Newell's method: an area-weighted normal of an arbitrary planar loop.
pub(crate) fn newell_normal(points: &[Point3<Real>]) -> Vector3<Real> {
    let mut normal = Vector3::zeros();
    let n = points.len();
    for i in 0..n {
        let current = points[i];
        let next = points[(i + 1) % n];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    normal
}

// A plane carrying an open chain: fitted when the chain bends, otherwise any
// plane containing the line.
fn plane_through_chain(chain: &[Point3<Real>]) -> Option<Plane> {
    let normal = newell_normal(chain);
    if normal.norm_squared() >= EPSILON * EPSILON {
        return Plane::from_normal_point(normal, chain[0]);
    }
    let dir = (chain[chain.len() - 1] - chain[0]).normalize();
    let helper = if dir.x.abs() < dir.y.abs() {
        Vector3::x()
    } else {
        Vector3::y()
    };
    Plane::from_normal_point(dir.cross(&helper), chain[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn square(size: Real) -> Polygon {
        Polygon::new(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ])
        .expect("square")
    }

    #[test]
    fn square_is_valid_and_closed() {
        let polygon = square(1.0);
        assert!(polygon.is_valid());
        assert!(!polygon.is_open());
        assert!((polygon.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn open_polyline_reports_open() {
        let polyline = Polygon::open_from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .expect("polyline");
        assert!(polyline.is_open());
        assert!(!polyline.is_valid());
    }

    #[test]
    fn flip_is_an_involution() {
        let mut polygon = square(2.0);
        let original_plane = *polygon.plane();
        let original_loops = polygon.loops();

        polygon.flip();
        assert!(polygon.plane().is_opposite(&original_plane));
        assert!(polygon.is_valid());

        polygon.flip();
        assert!(polygon.plane().is_equivalent(&original_plane));
        assert_eq!(polygon.loops(), original_loops);
    }

    #[test]
    fn hole_winding_is_opposite() {
        let plane = *square(1.0).plane();
        let polygon = Polygon::from_loops(
            plane,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(3.0, 3.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
            ],
            &[vec![
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
            ]],
            0,
            TexInfo::default(),
        )
        .expect("ring");

        assert!(polygon.is_valid());
        assert!((polygon.area() - 8.0).abs() < 1e-9);

        let signs: Vec<bool> = polygon
            .loops()
            .iter()
            .map(|ring| {
                let projected: Vec<Point2<Real>> = ring
                    .iter()
                    .map(|&i| polygon.plane().w2p(&polygon.pos(i)))
                    .collect();
                ring_signed_area(&projected) > 0.0
            })
            .collect();
        assert_eq!(signs.iter().filter(|&&ccw| ccw).count(), 1);
        assert_eq!(signs.iter().filter(|&&ccw| !ccw).count(), 1);
    }

    #[test]
    fn separate_islands_and_holes() {
        let plane = *square(1.0).plane();
        let polygon = Polygon::from_loops(
            plane,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(3.0, 3.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
            ],
            &[vec![
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(2.0, 1.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
            ]],
            0,
            TexInfo::default(),
        )
        .expect("ring");

        let islands = polygon.get_separated_polygons(SeparateMode::Islands);
        assert_eq!(islands.len(), 1);
        assert!((islands[0].area() - 8.0).abs() < 1e-9);

        let hulls = polygon.get_separated_polygons(SeparateMode::OuterHull);
        assert_eq!(hulls.len(), 1);
        assert!((hulls[0].area() - 9.0).abs() < 1e-9);

        let holes = polygon.get_separated_polygons(SeparateMode::Holes);
        assert_eq!(holes.len(), 1);
        assert!((holes[0].area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unify_with_bridges_keeps_area() {
        let plane = *square(1.0).plane();
        let polygon = Polygon::from_loops(
            plane,
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(4.0, 4.0, 0.0),
                Point3::new(0.0, 4.0, 0.0),
            ],
            &[vec![
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(3.0, 1.0, 0.0),
                Point3::new(3.0, 3.0, 0.0),
                Point3::new(1.0, 3.0, 0.0),
            ]],
            0,
            TexInfo::default(),
        )
        .expect("ring");

        let unified = polygon.unify_with_bridges().expect("unified");
        assert!(unified.has_bridge_edges());
        assert_eq!(unified.loops().len(), 1);
        assert!((unified.area() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn optimize_removes_collinear_vertices() {
        let mut polygon = Polygon::new(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ])
        .expect("polygon");
        polygon.optimize();
        assert_eq!(polygon.vertex_count(), 4);
        assert!((polygon.area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn equivalence_ignores_start_vertex() {
        let a = square(1.0);
        let b = Polygon::new(&[
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ])
        .expect("square");
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&square(2.0)));
    }
}
