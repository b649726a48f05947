//! Primitive shape builders: the candidate polygons interactive tools feed
//! into [`Model::add_polygon`](crate::model::Model::add_polygon).

use crate::float_types::{EPSILON, Real, TAU};
use crate::plane::Plane;
use crate::polygon::{Polygon, TexInfo};
use nalgebra::Point2;

/// Axis-aligned rectangle spanning `min`..`max` in the plane's 2D basis.
/// Returns `None` for a degenerate extent.
pub fn rectangle_on_plane(
    plane: &Plane,
    min: Point2<Real>,
    max: Point2<Real>,
    material_id: i32,
) -> Option<Polygon> {
    if max.x - min.x < EPSILON || max.y - min.y < EPSILON {
        return None;
    }
    let outline = [
        min,
        Point2::new(max.x, min.y),
        max,
        Point2::new(min.x, max.y),
    ];
    Polygon::from_2d_loops(*plane, &outline, &[], material_id, TexInfo::default())
}

/// Regular n-gon disc around `center` in the plane's 2D basis. Returns
/// `None` for fewer than 3 segments or a degenerate radius.
pub fn disc_on_plane(
    plane: &Plane,
    center: Point2<Real>,
    radius: Real,
    segments: usize,
    material_id: i32,
) -> Option<Polygon> {
    if segments < 3 || radius < EPSILON {
        return None;
    }
    let outline: Vec<Point2<Real>> = (0..segments)
        .map(|i| {
            let angle = TAU * i as Real / segments as Real;
            let (sin, cos) = angle.sin_cos();
            Point2::new(center.x + cos * radius, center.y + sin * radius)
        })
        .collect();
    Polygon::from_2d_loops(*plane, &outline, &[], material_id, TexInfo::default())
}

/// Closed polygon from a freehand 2D outline in the plane's basis. The
/// outline's winding is normalized by construction; `None` for degenerate
/// input.
pub fn polygon_on_plane(
    plane: &Plane,
    outline: &[Point2<Real>],
    material_id: i32,
) -> Option<Polygon> {
    if outline.len() < 3 {
        return None;
    }
    Polygon::from_2d_loops(*plane, outline, &[], material_id, TexInfo::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_types::PI;
    use nalgebra::{Point3, Vector3};

    fn xy_plane() -> Plane {
        Plane::from_normal_point(Vector3::z(), Point3::origin()).expect("plane")
    }

    #[test]
    fn rectangle_has_expected_area() {
        let plane = xy_plane();
        let rect = rectangle_on_plane(
            &plane,
            Point2::new(-1.0, -2.0),
            Point2::new(3.0, 2.0),
            0,
        )
        .expect("rect");
        assert!(rect.is_valid());
        assert!((rect.area() - 16.0).abs() < 1e-9);

        assert!(
            rectangle_on_plane(&plane, Point2::new(1.0, 0.0), Point2::new(1.0, 2.0), 0)
                .is_none()
        );
    }

    #[test]
    fn disc_area_approaches_circle() {
        let plane = xy_plane();
        let disc = disc_on_plane(&plane, Point2::origin(), 1.0, 64, 0).expect("disc");
        assert!(disc.is_valid());
        assert!((disc.area() - PI).abs() < 0.01);

        assert!(disc_on_plane(&plane, Point2::origin(), 1.0, 2, 0).is_none());
    }

    #[test]
    fn freehand_outline_winding_is_normalized() {
        let plane = xy_plane();
        // clockwise input still builds a valid polygon
        let polygon = polygon_on_plane(
            &plane,
            &[
                Point2::new(0.0, 0.0),
                Point2::new(0.0, 2.0),
                Point2::new(2.0, 2.0),
                Point2::new(2.0, 0.0),
            ],
            0,
        )
        .expect("polygon");
        assert!(polygon.is_valid());
        assert!((polygon.area() - 4.0).abs() < 1e-9);
    }
}
