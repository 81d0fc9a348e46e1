//! OpenCV-backed rotated NMS

use crate::traits::RotatedNms;
use opencv::core::{Point2f, RotatedRect, Size2f, Vector};
use opencv::dnn;
use pillarbox_core::{Error, OrientedRect, Result};

/// Delegates suppression to `cv::dnn::NMSBoxesRotated`.
///
/// OpenCV drops scores that do not exceed its threshold, so the floor is
/// lowered by one ulp to keep boxes sitting exactly on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvNms;

impl RotatedNms for OpenCvNms {
    fn suppress(
        &self,
        rects: &[OrientedRect],
        confidences: &[f32],
        confidence_floor: f32,
        iou_threshold: f32,
    ) -> Result<Vec<usize>> {
        let boxes = rects
            .iter()
            .map(|rect| {
                RotatedRect::new(
                    Point2f::new(rect.center.0, rect.center.1),
                    Size2f::new(rect.size.0, rect.size.1),
                    rect.angle,
                )
            })
            .collect::<opencv::Result<Vector<RotatedRect>>>()
            .map_err(geometry_error)?;
        let scores: Vector<f32> = confidences.iter().copied().collect();

        let mut indices = Vector::<i32>::new();
        dnn::nms_boxes_rotated(
            &boxes,
            &scores,
            inclusive_floor(confidence_floor),
            iou_threshold,
            &mut indices,
            1.0,
            0,
        )
        .map_err(geometry_error)?;

        Ok(indices.iter().map(|index| index as usize).collect())
    }
}

fn inclusive_floor(floor: f32) -> f32 {
    if floor > 0.0 && floor.is_finite() {
        f32::from_bits(floor.to_bits() - 1)
    } else {
        floor
    }
}

fn geometry_error(err: opencv::Error) -> Error {
    Error::Geometry(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::nms::PolygonNms;

    fn rect(x: f32, y: f32) -> OrientedRect {
        OrientedRect::new((x, y), (4.0, 2.0), 0.0)
    }

    #[test]
    fn test_inclusive_floor() {
        assert!(inclusive_floor(0.7) < 0.7);
        assert!(inclusive_floor(0.7) > 0.699_999);
        assert_eq!(inclusive_floor(0.0), 0.0);
    }

    #[test]
    fn test_agrees_with_polygon_backend() -> Result<()> {
        let rects = vec![rect(0.0, 0.0), rect(0.2, 0.0), rect(20.0, 0.0), rect(40.0, 0.0)];
        let confidences = [0.8, 0.9, 0.7, 0.69];

        let expected = PolygonNms.suppress(&rects, &confidences, 0.7, 0.5)?;
        let kept = OpenCvNms.suppress(&rects, &confidences, 0.7, 0.5)?;
        assert_eq!(kept, expected);
        assert_eq!(kept, vec![1, 2]);
        Ok(())
    }
}
