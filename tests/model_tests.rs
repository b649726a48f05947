//! Shelf staging, undo snapshots and composition dispatch on `Model`.

use brushcsg::float_types::Real;
use brushcsg::model::{
    BooleanOpType, Model, ModelFlags, OppositeDirection, PolygonRelation, ShelfId,
};
use brushcsg::polygon::{IntersectionType, Polygon};
use nalgebra::{Matrix4, Point3, Vector3};

fn rect(x0: Real, y0: Real, x1: Real, y1: Real) -> Polygon {
    Polygon::new(&[
        Point3::new(x0, y0, 0.0),
        Point3::new(x1, y0, 0.0),
        Point3::new(x1, y1, 0.0),
        Point3::new(x0, y1, 0.0),
    ])
    .expect("rect")
}

fn total_area(model: &Model) -> Real {
    model.polygons().iter().map(Polygon::area).sum()
}

#[test]
fn scratch_shelf_is_isolated_from_base() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 1.0, 1.0));

    {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        staged.insert(rect(5.0, 5.0, 6.0, 6.0));
        staged.insert(rect(7.0, 5.0, 8.0, 6.0));
        assert_eq!(staged.polygon_count(), 2);
    }

    // base shelf queries see none of the staged geometry
    assert_eq!(model.shelf(), ShelfId::Base);
    assert_eq!(model.polygon_count(), 1);
    assert_eq!(model.get_polygon_list().len(), 1);
    assert_eq!(model.polygons_on(ShelfId::Scratch).len(), 2);
}

#[test]
fn shelf_guard_restores_on_early_return() {
    fn stage_or_bail(model: &mut Model, bail: bool) {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        if bail {
            return;
        }
        staged.insert(rect(0.0, 0.0, 1.0, 1.0));
    }

    let mut model = Model::new();
    stage_or_bail(&mut model, true);
    assert_eq!(model.shelf(), ShelfId::Base);
    stage_or_bail(&mut model, false);
    assert_eq!(model.shelf(), ShelfId::Base);
    assert_eq!(model.polygons_on(ShelfId::Scratch).len(), 1);
}

#[test]
fn move_shelf_transplants_exactly() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 1.0, 1.0));
    {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        staged.insert(rect(2.0, 0.0, 3.0, 1.0));
        staged.insert(rect(4.0, 0.0, 5.0, 1.0));
    }

    model.move_shelf(ShelfId::Scratch, ShelfId::Base);
    assert_eq!(model.polygons_on(ShelfId::Base).len(), 3);
    assert!(model.is_empty(ShelfId::Scratch));

    // cancelling a gesture is just clearing the scratch shelf
    {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        staged.insert(rect(9.0, 0.0, 10.0, 1.0));
        staged.clear();
    }
    assert!(model.is_empty(ShelfId::Scratch));
    assert_eq!(model.polygons_on(ShelfId::Base).len(), 3);
}

#[test]
fn undo_restores_every_shelf() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 3.0, 3.0));
    {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        staged.insert(rect(5.0, 0.0, 6.0, 1.0));
    }

    model.record_undo("carve");
    assert!(model.add_polygon(rect(1.0, 1.0, 2.0, 2.0), BooleanOpType::SubtractAB));
    {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        staged.clear();
    }
    assert!((total_area(&model) - 8.0).abs() < 1e-9);
    assert!(model.is_empty(ShelfId::Scratch));

    assert_eq!(model.undo().as_deref(), Some("carve"));
    assert!((total_area(&model) - 9.0).abs() < 1e-9);
    assert_eq!(model.polygons_on(ShelfId::Scratch).len(), 1);
}

#[test]
fn insert_refuses_equivalent_duplicate() {
    let mut model = Model::new();
    assert!(model.insert(rect(0.0, 0.0, 1.0, 1.0)));
    assert!(!model.insert(rect(0.0, 0.0, 1.0, 1.0)));
    assert_eq!(model.polygon_count(), 1);
    assert_eq!(model.query_equivalent_polygon(&rect(0.0, 0.0, 1.0, 1.0)), Some(0));
}

#[test]
fn subtract_ba_leaves_existing_untouched() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 2.0, 2.0));
    assert!(model.add_polygon(rect(1.0, 0.0, 3.0, 2.0), BooleanOpType::SubtractBA));

    assert_eq!(model.polygon_count(), 2);
    assert!((model.polygons()[0].area() - 4.0).abs() < 1e-9);
    assert!((model.polygons()[1].area() - 2.0).abs() < 1e-9);
}

#[test]
fn transform_moves_every_shelf() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 1.0, 1.0));
    {
        let mut staged = model.shelf_scope(ShelfId::Scratch);
        staged.insert(rect(0.0, 0.0, 1.0, 1.0));
    }

    model.translate(&Vector3::new(0.0, 0.0, 2.0));
    let base = model.bound_box(Some(ShelfId::Base)).expect("bounds");
    assert!((base.mins.z - 2.0).abs() < 1e-9);
    let scratch = model.bound_box(Some(ShelfId::Scratch)).expect("bounds");
    assert!((scratch.mins.z - 2.0).abs() < 1e-9);

    model.transform(&Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
    let whole = model.bound_box(None).expect("bounds");
    assert!((whole.mins.x - 1.0).abs() < 1e-9);
    assert!((whole.maxs.x - 2.0).abs() < 1e-9);
}

#[test]
fn drill_with_frame_mode_keeps_a_frame() {
    let mut model = Model::new();
    model.set_flags(ModelFlags::default().with(ModelFlags::FRAME_REMAIN_AFTER_DRILL));
    model.insert(rect(0.0, 0.0, 4.0, 4.0));

    assert!(model.drill_polygon(0, true));
    assert_eq!(model.polygon_count(), 1);
    let frame = &model.polygons()[0];
    assert_eq!(frame.loops().len(), 2);
    let inner = 4.0 - 2.0 * 0.1;
    assert!((frame.area() - (16.0 - inner * inner)).abs() < 1e-6);
}

#[test]
fn drill_without_frame_mode_removes() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 4.0, 4.0));
    assert!(model.drill_polygon(0, true));
    assert_eq!(model.polygon_count(), 0);
    assert!(!model.drill_polygon(5, false));
}

#[test]
fn separate_polygons_makes_coverage_disjoint() {
    let mut model = Model::new();
    let plane = *rect(0.0, 0.0, 1.0, 1.0).plane();
    model.add_polygon(rect(0.0, 0.0, 2.0, 2.0), BooleanOpType::Add);
    model.add_polygon(rect(1.0, 0.0, 3.0, 2.0), BooleanOpType::Add);
    assert!((total_area(&model) - 8.0).abs() < 1e-9);

    model.separate_polygons(&plane);
    assert!((total_area(&model) - 6.0).abs() < 1e-9);
    for (i, a) in model.polygons().iter().enumerate() {
        for b in model.polygons().iter().skip(i + 1) {
            assert_ne!(
                Polygon::classify_intersection(a, b),
                IntersectionType::Intersection
            );
        }
    }
}

#[test]
fn shelf_queries_follow_the_current_shelf() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 1.0, 1.0));

    let candidate = rect(0.5, 0.0, 1.5, 1.0);
    assert!(model.has_intersection(&candidate, true));

    let staged = model.shelf_scope(ShelfId::Scratch);
    assert!(!staged.has_intersection(&candidate, true));
    assert!(!staged.has_touched(&rect(1.0, 0.0, 2.0, 1.0)));
}

#[test]
fn opposite_face_across_a_slab() {
    // outward faces of a slab: top at z = 2 facing up, bottom facing down
    let mut model = Model::new();
    let mut top = rect(0.0, 0.0, 1.0, 1.0);
    top.translate(&Vector3::new(0.0, 0.0, 2.0));
    let mut bottom = rect(0.0, 0.0, 1.0, 1.0);
    bottom.flip();
    model.insert(top.clone());
    model.insert(bottom);

    let (relation, found, distance) =
        model.query_opposite_polygon(&top, OppositeDirection::Push, 0.0);
    assert_eq!(relation, PolygonRelation::Intersection);
    assert!(found.is_some());
    assert!((distance - 2.0).abs() < 1e-6);
}

#[test]
fn plane_and_edge_membership_queries() {
    let mut model = Model::new();
    model.insert(rect(0.0, 0.0, 1.0, 1.0));
    model.insert(rect(2.0, 0.0, 3.0, 1.0));
    let plane = *model.polygon(0).unwrap().plane();

    assert_eq!(model.query_polygons_on_plane(&plane).len(), 2);
    assert!(model.is_vertex_on_edge(&plane, &Point3::new(0.5, 0.0, 0.0), None));
    assert!(!model.is_vertex_on_edge(&plane, &Point3::new(0.5, 0.5, 0.0), None));
    // excluding the only polygon whose edge carries the point
    assert!(!model.is_vertex_on_edge(&plane, &Point3::new(0.5, 0.0, 0.0), Some(0)));
}
