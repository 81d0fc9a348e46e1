//! Rotated-rectangle overlap using `geo` polygon clipping

use geo::{Area, BooleanOps, LineString, Polygon};
use pillarbox_core::OrientedRect;

/// Closed polygon through the rectangle's corners
pub fn rect_polygon(rect: &OrientedRect) -> Polygon<f64> {
    Polygon::new(LineString::from(rect.corners().to_vec()), vec![])
}

/// Whether every corner of the rectangle is a finite point
pub fn is_finite(rect: &OrientedRect) -> bool {
    rect.corners()
        .iter()
        .all(|(x, y)| x.is_finite() && y.is_finite())
}

/// Area shared by two rotated rectangles, zero when either is not finite.
pub fn intersection_area(a: &OrientedRect, b: &OrientedRect) -> f64 {
    if !is_finite(a) || !is_finite(b) {
        return 0.0;
    }

    rect_polygon(a)
        .intersection(&rect_polygon(b))
        .unsigned_area()
}

/// Intersection over union of two rotated rectangles.
///
/// Degenerate pairs with an empty union report no overlap, as do
/// rectangles with a non-finite corner.
pub fn rotated_iou(a: &OrientedRect, b: &OrientedRect) -> f64 {
    if !is_finite(a) || !is_finite(b) {
        return 0.0;
    }

    let area_a = a.area().abs();
    let area_b = b.area().abs();
    if area_a == 0.0 || area_b == 0.0 {
        return 0.0;
    }

    let intersection = intersection_area(a, b);
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        return 0.0;
    }

    (intersection / union).clamp(0.0, 1.0)
}
