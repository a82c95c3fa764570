use crate::error::{DetectionError, Result};
use serde::Serialize;

/// A struct representing a bounding box.
///
/// A bounding box is the axis-aligned rectangle a detector outputs around an
/// object. Coordinates follow the standard image convention of the left side
/// of the image being x=0 and the top of the image being y=0, so `xmin` and
/// `ymin` name the top-left corner and `xmax` and `ymax` the bottom-right
/// corner. Which coordinate space a box lives in (model canvas, padded
/// canvas, normalized, or original image pixels) depends on where in the
/// pipeline it was produced; see `object_detection::rectify`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    xmin: f32,
    ymin: f32,
    xmax: f32,
    ymax: f32,
}

impl BoundingBox {
    /// Checks that the corners are ordered before constructing.
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Result<Self> {
        if xmin > xmax || ymin > ymax {
            return Err(DetectionError::InvalidBox {
                xmin,
                ymin,
                xmax,
                ymax,
            });
        }
        Ok(BoundingBox {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    pub fn xmin(&self) -> f32 {
        self.xmin
    }

    pub fn ymin(&self) -> f32 {
        self.ymin
    }

    pub fn xmax(&self) -> f32 {
        self.xmax
    }

    pub fn ymax(&self) -> f32 {
        self.ymax
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box.
    ///
    /// Zero-area boxes (and degenerate unions) yield 0 rather than NaN so
    /// they never suppress, or get suppressed by, anything during NMS.
    pub fn intersection_over_union(&self, other: &BoundingBox) -> f32 {
        let overlap_width = (self.xmax.min(other.xmax) - self.xmin.max(other.xmin)).max(0.0);
        let overlap_height = (self.ymax.min(other.ymax) - self.ymin.max(other.ymin)).max(0.0);
        let intersection = overlap_width * overlap_height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Clamps all coordinates into `[0, width - 1] x [0, height - 1]`.
    pub fn clamp_to(&self, width: f32, height: f32) -> BoundingBox {
        let max_x = (width - 1.0).max(0.0);
        let max_y = (height - 1.0).max(0.0);
        let xmin = self.xmin.clamp(0.0, max_x);
        let ymin = self.ymin.clamp(0.0, max_y);
        BoundingBox {
            xmin,
            ymin,
            xmax: self.xmax.clamp(xmin, max_x),
            ymax: self.ymax.clamp(ymin, max_y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_corners() {
        assert!(BoundingBox::new(5.0, 0.0, 1.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 5.0, 1.0, 1.0).is_err());
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(10.0, 10.0, 20.0, 20.0).unwrap();
        assert_eq!(a.intersection_over_union(&a), 1.0);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BoundingBox::new(5.0, 5.0, 6.0, 6.0).unwrap();
        assert_eq!(a.intersection_over_union(&b), 0.0);
    }

    #[test]
    fn iou_of_contained_box_is_area_ratio() {
        let outer = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let inner = BoundingBox::new(0.0, 0.0, 5.0, 5.0).unwrap();
        assert_eq!(outer.intersection_over_union(&inner), 25.0 / 100.0);
    }

    #[test]
    fn iou_of_zero_area_box_is_zero() {
        let degenerate = BoundingBox::new(3.0, 3.0, 3.0, 3.0).unwrap();
        let other = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        assert_eq!(degenerate.intersection_over_union(&other), 0.0);
        assert_eq!(degenerate.intersection_over_union(&degenerate), 0.0);
    }

    #[test]
    fn clamp_pulls_overshooting_corner_onto_last_pixel() {
        let b = BoundingBox::new(-4.0, 2.0, 700.0, 10.0).unwrap();
        let clamped = b.clamp_to(640.0, 480.0);
        assert_eq!(clamped.xmin(), 0.0);
        assert_eq!(clamped.xmax(), 639.0);
        assert_eq!(clamped.ymin(), 2.0);
        assert_eq!(clamped.ymax(), 10.0);
    }
}
