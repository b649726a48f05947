//! Area conservation and winding guarantees of the polygon decomposer.

use brushcsg::decompose::{triangulate_model, triangulate_polygon};
use brushcsg::float_types::Real;
use brushcsg::model::{BooleanOpType, Model};
use brushcsg::polygon::Polygon;
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
fn square_with_square_hole() {
    // a non-zero even number of triangles whose area is outer minus hole
    let mut slab = rect(0.0, 0.0, 4.0, 4.0);
    assert!(slab.subtract(&rect(1.0, 1.0, 3.0, 3.0)));
    assert!(slab.is_valid());

    let mesh = triangulate_polygon(&slab).expect("mesh");
    assert!(mesh.triangle_count() > 0);
    assert_eq!(mesh.triangle_count() % 2, 0);
    assert!((mesh.area() - 12.0).abs() < 1e-6);
}

#[test]
fn area_is_conserved_across_shapes() {
    let mut l_shape = rect(0.0, 0.0, 3.0, 3.0);
    assert!(l_shape.subtract(&rect(1.0, 1.0, 4.0, 4.0)));

    for polygon in [rect(0.0, 0.0, 5.0, 1.0), l_shape] {
        let mesh = triangulate_polygon(&polygon).expect("mesh");
        assert!((mesh.area() - polygon.area()).abs() < 1e-6);
    }
}

#[test]
fn winding_matches_polygon_facing_after_flip() {
    let mut polygon = rect(0.0, 0.0, 2.0, 2.0);
    polygon.flip();
    let normal = polygon.plane().normal();

    let mesh = triangulate_polygon(&polygon).expect("mesh");
    assert!((mesh.area() - 4.0).abs() < 1e-9);
    for [a, b, c] in &mesh.indices {
        let pa = mesh.positions[*a as usize];
        let pb = mesh.positions[*b as usize];
        let pc = mesh.positions[*c as usize];
        assert!((pb - pa).cross(&(pc - pa)).dot(&normal) > 0.0);
    }
    for vertex_normal in &mesh.normals {
        assert!((vertex_normal - normal).norm() < 1e-9);
    }
}

#[test]
fn carved_model_mesh_matches_polygon_area() {
    let mut model = Model::new();
    assert!(model.add_polygon(rect(0.0, 0.0, 3.0, 3.0), BooleanOpType::Add));
    assert!(model.add_polygon(rect(1.0, 1.0, 2.0, 2.0), BooleanOpType::SubtractAB));
    assert!(model.add_polygon(rect(5.0, 0.0, 6.0, 1.0), BooleanOpType::Union));

    let expected: Real = model.polygons().iter().map(Polygon::area).sum();
    let mesh = triangulate_model(&model);
    assert!((mesh.area() - expected).abs() < 1e-6);
    assert!((expected - 9.0).abs() < 1e-9);
}
