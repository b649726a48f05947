//! Decomposition of polygons-with-holes into renderable triangle meshes.
//!
//! Holes are first merged into the outer boundary along bridge edges
//! ([`Polygon::unify_with_bridges`]), the resulting simple loop is ear-cut
//! in the plane's 2D basis, and the triangles are lifted back to 3D with
//! their winding matched to the polygon's facing.

use crate::errors::ValidationError;
use crate::float_types::{Real, tolerance};
use crate::model::Model;
use crate::polygon::{Polygon, PolygonFlags, SeparateMode};
use geo::TriangulateEarcut;
use geo::{Coord, LineString, Polygon as GeoPolygon};
use nalgebra::{Point2, Point3, Vector3};

/// Flat buffers describing a triangulated polygon set, suitable for
/// rendering or export.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub positions: Vec<Point3<Real>>,
    pub normals: Vec<Vector3<Real>>,
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Summed area of every triangle.
    pub fn area(&self) -> Real {
        self.indices
            .iter()
            .map(|[a, b, c]| {
                let pa = self.positions[*a as usize];
                let pb = self.positions[*b as usize];
                let pc = self.positions[*c as usize];
                (pb - pa).cross(&(pc - pa)).norm() * 0.5
            })
            .sum()
    }

    /// Concatenate `other`, rebasing its indices.
    pub fn append(&mut self, other: TriangleMesh) {
        let base = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.indices
            .extend(other.indices.into_iter().map(|[a, b, c]| {
                [a + base, b + base, c + base]
            }));
    }
}

/// Triangulate a closed polygon, holes included.
///
/// Open and degenerate polygons are the caller's responsibility and are
/// rejected with the underlying [`ValidationError`]; the decomposer never
/// repairs its input. Every produced triangle has nonzero area and winds
/// consistently with the polygon's plane normal.
pub fn triangulate_polygon(polygon: &Polygon) -> Result<TriangleMesh, ValidationError> {
    polygon.validate()?;

    let mut mesh = TriangleMesh::default();
    for island in polygon.get_separated_polygons(SeparateMode::Islands) {
        let unified = island.unify_with_bridges().ok_or_else(|| {
            ValidationError::Other("island did not reduce to a single loop".to_string())
        })?;
        mesh.append(triangulate_simple_loop(&unified)?);
    }
    Ok(mesh)
}

/// Triangulate every visible closed polygon on the model's current shelf
/// into one mesh. Open, invalid and hidden polygons are skipped.
pub fn triangulate_model(model: &Model) -> TriangleMesh {
    let mut mesh = TriangleMesh::default();
    for polygon in model.iter() {
        if polygon.flags().contains(PolygonFlags::HIDDEN) {
            continue;
        }
        if let Ok(part) = triangulate_polygon(polygon) {
            mesh.append(part);
        }
    }
    mesh
}

// Ear-cut one simple (possibly self-touching along bridge pairs) loop.
fn triangulate_simple_loop(polygon: &Polygon) -> Result<TriangleMesh, ValidationError> {
    let plane = *polygon.plane();
    let loops = polygon.loops();
    let ring = loops.first().ok_or(ValidationError::ZeroArea)?;

    let mut coords: Vec<Coord<Real>> = ring
        .iter()
        .map(|&i| {
            let p = plane.w2p(&polygon.pos(i));
            Coord { x: p.x, y: p.y }
        })
        .collect();
    if let Some(first) = coords.first().copied() {
        coords.push(first);
    }
    let shell = GeoPolygon::new(LineString::new(coords), Vec::new());

    let triangulation = shell.earcut_triangles_raw();
    let flat = triangulation.vertices;

    let mut mesh = TriangleMesh::default();
    mesh.positions = flat
        .chunks_exact(2)
        .map(|xy| plane.p2w(&Point2::new(xy[0], xy[1])))
        .collect();
    mesh.normals = vec![plane.normal(); mesh.positions.len()];

    for tri in triangulation.triangle_indices.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let pa = Point2::new(flat[2 * a], flat[2 * a + 1]);
        let pb = Point2::new(flat[2 * b], flat[2 * b + 1]);
        let pc = Point2::new(flat[2 * c], flat[2 * c + 1]);
        let doubled = (pb.x - pa.x) * (pc.y - pa.y) - (pc.x - pa.x) * (pb.y - pa.y);
        if doubled.abs() * 0.5 < tolerance() {
            continue;
        }
        // counter-clockwise in the plane basis faces along the normal
        if doubled > 0.0 {
            mesh.indices.push([a as u32, b as u32, c as u32]);
        } else {
            mesh.indices.push([a as u32, c as u32, b as u32]);
        }
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::TexInfo;
    use nalgebra::Point3;

    fn rect(x0: Real, y0: Real, x1: Real, y1: Real) -> Polygon {
        Polygon::new(&[
            Point3::new(x0, y0, 0.0),
            Point3::new(x1, y0, 0.0),
            Point3::new(x1, y1, 0.0),
            Point3::new(x0, y1, 0.0),
        ])
        .expect("rect")
    }

    #[test]
    fn square_becomes_two_triangles() {
        let mesh = triangulate_polygon(&rect(0.0, 0.0, 2.0, 2.0)).expect("mesh");
        assert_eq!(mesh.triangle_count(), 2);
        assert!((mesh.area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn triangles_face_along_the_normal() {
        let polygon = rect(0.0, 0.0, 1.0, 1.0);
        let normal = polygon.plane().normal();
        let mesh = triangulate_polygon(&polygon).expect("mesh");
        for [a, b, c] in &mesh.indices {
            let pa = mesh.positions[*a as usize];
            let pb = mesh.positions[*b as usize];
            let pc = mesh.positions[*c as usize];
            let face = (pb - pa).cross(&(pc - pa));
            assert!(face.dot(&normal) > 0.0);
        }
    }

    #[test]
    fn square_with_hole_conserves_area() {
        let plane = *rect(0.0, 0.0, 1.0, 1.0).plane();
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

        let mesh = triangulate_polygon(&polygon).expect("mesh");
        assert!(mesh.triangle_count() >= 8);
        assert_eq!(mesh.triangle_count() % 2, 0);
        assert!((mesh.area() - 12.0).abs() < 1e-6);
    }

    #[test]
    fn open_polygon_is_rejected() {
        let chain = Polygon::open_from_points(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .expect("chain");
        assert!(triangulate_polygon(&chain).is_err());
    }

    #[test]
    fn model_mesh_skips_hidden_polygons() {
        let mut model = Model::new();
        model.insert(rect(0.0, 0.0, 1.0, 1.0));
        let mut hidden = rect(2.0, 0.0, 3.0, 1.0);
        hidden.set_flags(PolygonFlags::default().with(PolygonFlags::HIDDEN));
        model.insert(hidden);

        let mesh = triangulate_model(&model);
        assert_eq!(mesh.triangle_count(), 2);
        assert!((mesh.area() - 1.0).abs() < 1e-9);
    }
}
