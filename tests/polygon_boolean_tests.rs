//! Boolean-algebra properties of `Polygon`: closure, idempotence, flip
//! involution and the touching/overlapping tie-breaks.

use brushcsg::float_types::Real;
use brushcsg::polygon::{IntersectionType, Polygon, SeparateMode};
use nalgebra::{Point2, Point3};

fn rect(x0: Real, y0: Real, x1: Real, y1: Real) -> Polygon {
    Polygon::new(&[
        Point3::new(x0, y0, 0.0),
        Point3::new(x1, y0, 0.0),
        Point3::new(x1, y1, 0.0),
        Point3::new(x0, y1, 0.0),
    ])
    .expect("rect")
}

fn signed_loop_area(polygon: &Polygon, ring: &[usize]) -> Real {
    let projected: Vec<Point2<Real>> = ring
        .iter()
        .map(|&i| polygon.plane().w2p(&polygon.pos(i)))
        .collect();
    let mut doubled = 0.0;
    for i in 0..projected.len() {
        let j = (i + 1) % projected.len();
        doubled += projected[i].x * projected[j].y - projected[j].x * projected[i].y;
    }
    doubled * 0.5
}

#[test]
fn union_of_edge_sharing_unit_squares() {
    // two axis-aligned unit squares sharing exactly one edge: touching, not
    // overlapping, and their union is a single 1x2 rectangle
    let a = rect(0.0, 0.0, 1.0, 1.0);
    let b = rect(1.0, 0.0, 2.0, 1.0);
    assert_eq!(
        Polygon::classify_intersection(&a, &b),
        IntersectionType::JustTouch
    );

    let mut merged = a.clone();
    assert!(merged.union_with(&b));
    assert!(merged.is_valid());
    assert!(!merged.is_open());
    assert_eq!(merged.loops().len(), 1);
    assert_eq!(merged.vertex_count(), 4);
    assert!((merged.area() - 2.0).abs() < 1e-9);
}

#[test]
fn subtract_square_fully_inside() {
    // 1x1 square inside a 3x3 square: the result is a square with a square
    // hole, wound opposite to the outer loop
    let mut outer = rect(0.0, 0.0, 3.0, 3.0);
    let inner = rect(1.0, 1.0, 2.0, 2.0);
    assert!(outer.subtract(&inner));
    assert!(outer.is_valid());
    assert!((outer.area() - 8.0).abs() < 1e-9);

    let loops = outer.loops();
    assert_eq!(loops.len(), 2);
    let signs: Vec<bool> = loops
        .iter()
        .map(|ring| signed_loop_area(&outer, ring) > 0.0)
        .collect();
    assert_eq!(signs.iter().filter(|&&ccw| ccw).count(), 1);
    assert_eq!(signs.iter().filter(|&&ccw| !ccw).count(), 1);
}

#[test]
fn intersect_overlapping_squares() {
    let mut a = rect(0.0, 0.0, 2.0, 2.0);
    let b = rect(1.0, 1.0, 3.0, 3.0);
    assert!(a.intersect(&b, false));
    assert!((a.area() - 1.0).abs() < 1e-9);
}

#[test]
fn boolean_results_are_valid_or_open_never_lossy() {
    let cases = [
        (rect(0.0, 0.0, 2.0, 2.0), rect(1.0, 1.0, 3.0, 3.0)),
        (rect(0.0, 0.0, 2.0, 2.0), rect(2.0, 0.0, 4.0, 2.0)),
        (rect(0.0, 0.0, 4.0, 4.0), rect(1.0, 1.0, 3.0, 3.0)),
        (rect(0.0, 0.0, 1.0, 1.0), rect(5.0, 5.0, 6.0, 6.0)),
    ];
    for (a, b) in &cases {
        let mut merged = a.clone();
        if merged.union_with(b) {
            assert!(merged.is_valid() || merged.is_open());
            assert!(merged.area() >= a.area() - 1e-9);
        }
    }
}

#[test]
fn subtract_then_union_round_trip() {
    let a = rect(0.0, 0.0, 2.0, 2.0);
    let b = rect(1.0, 0.0, 3.0, 2.0);

    let mut worked = a.clone();
    assert!(worked.subtract(&b));
    let clipped_away = a.area() - worked.area();
    assert!((clipped_away - 2.0).abs() < 1e-9);

    assert!(worked.union_with(&b));
    assert!((worked.area() - (a.area() - clipped_away + b.area())).abs() < 1e-9);
}

#[test]
fn union_with_itself_is_identity() {
    let a = rect(0.0, 0.0, 2.0, 3.0);
    let mut doubled = a.clone();
    assert!(doubled.union_with(&a));
    assert!(doubled.is_equivalent(&a));
}

#[test]
fn flip_twice_restores_winding_and_plane() {
    let mut polygon = rect(0.0, 0.0, 2.0, 2.0);
    let plane = *polygon.plane();
    let loops = polygon.loops();

    polygon.flip();
    assert!(polygon.plane().is_opposite(&plane));

    polygon.flip();
    assert!(polygon.plane().is_equivalent(&plane));
    assert_eq!(polygon.loops(), loops);
}

#[test]
fn separated_hole_becomes_outward_polygon() {
    let mut outer = rect(0.0, 0.0, 4.0, 4.0);
    assert!(outer.subtract(&rect(1.0, 1.0, 3.0, 3.0)));

    let holes = outer.get_separated_polygons(SeparateMode::Holes);
    assert_eq!(holes.len(), 1);
    assert!(holes[0].is_valid());
    assert!((holes[0].area() - 4.0).abs() < 1e-9);

    let islands = outer.get_separated_polygons(SeparateMode::Islands);
    assert_eq!(islands.len(), 1);
    assert!((islands[0].area() - 12.0).abs() < 1e-9);
}

#[test]
fn multi_island_subtraction_separates() {
    // cutting a band through the middle splits the square in two islands
    let mut slab = rect(0.0, 0.0, 3.0, 3.0);
    let band = rect(1.0, -1.0, 2.0, 4.0);
    assert!(slab.subtract(&band));
    assert!(slab.is_valid());

    let islands = slab.get_separated_polygons(SeparateMode::Islands);
    assert_eq!(islands.len(), 2);
    let total: Real = islands.iter().map(Polygon::area).sum();
    assert!((total - 6.0).abs() < 1e-9);
}

#[test]
fn non_coplanar_operands_are_rejected() {
    let a = rect(0.0, 0.0, 2.0, 2.0);
    let mut lifted = rect(0.0, 0.0, 2.0, 2.0);
    lifted.translate(&nalgebra::Vector3::new(0.0, 0.0, 1.0));

    assert_eq!(
        Polygon::classify_intersection(&a, &lifted),
        IntersectionType::None
    );
    let mut merged = a.clone();
    assert!(!merged.union_with(&lifted));
    assert!(!merged.subtract(&lifted));
    assert!((merged.area() - 4.0).abs() < 1e-9);
}
