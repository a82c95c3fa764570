use crate::annotations::bounding_box::BoundingBox;
use crate::error::Result;

/// The coordinate space a decoder emits boxes in, and therefore the mapping
/// needed to bring them back into original-image pixels.
///
/// Every mapping ends with a clamp into `[0, dim - 1]` on both axes, so a
/// rectified box can never leave the image no matter what the model emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateSpace {
    /// The image was proportionally resized by `ratio` and padded onto a
    /// multiple-of-32 canvas; decoded coordinates divide by the ratio.
    PaddedCanvas { ratio: f32 },
    /// The image was stretched to a fixed model input size; decoded
    /// coordinates multiply by an independent per-axis ratio.
    DirectResize { ratio_w: f32, ratio_h: f32 },
    /// The model emitted normalized `[0, 1]` coordinates; they multiply by
    /// the original dimensions directly.
    Normalized,
}

impl CoordinateSpace {
    pub fn rectify(
        &self,
        bbox: &BoundingBox,
        image_width: u32,
        image_height: u32,
    ) -> Result<BoundingBox> {
        let (sx, sy) = match *self {
            CoordinateSpace::PaddedCanvas { ratio } => (1.0 / ratio, 1.0 / ratio),
            CoordinateSpace::DirectResize { ratio_w, ratio_h } => (ratio_w, ratio_h),
            CoordinateSpace::Normalized => (image_width as f32, image_height as f32),
        };
        let mapped = BoundingBox::new(
            bbox.xmin() * sx,
            bbox.ymin() * sy,
            bbox.xmax() * sx,
            bbox.ymax() * sy,
        )?;
        Ok(mapped.clamp_to(image_width as f32, image_height as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_canvas_divides_by_ratio() {
        let space = CoordinateSpace::PaddedCanvas { ratio: 2.0 };
        let decoded = BoundingBox::new(100.0, 200.0, 300.0, 400.0).unwrap();
        let rectified = space.rectify(&decoded, 1000, 1000).unwrap();
        assert_eq!(rectified.xmin(), 50.0);
        assert_eq!(rectified.ymin(), 100.0);
        assert_eq!(rectified.xmax(), 150.0);
        assert_eq!(rectified.ymax(), 200.0);
    }

    #[test]
    fn padded_canvas_round_trips_within_tolerance() {
        let ratio = 800.0 / 720.0_f32;
        let space = CoordinateSpace::PaddedCanvas { ratio };
        let decoded = BoundingBox::new(123.4, 56.7, 321.0, 654.3).unwrap();
        let rectified = space.rectify(&decoded, 1280, 720).unwrap();
        assert!((rectified.xmin() * ratio - 123.4).abs() < 1e-3);
        assert!((rectified.ymax() * ratio - 654.3).abs() < 1e-3);
    }

    #[test]
    fn direct_resize_scales_axes_independently() {
        let space = CoordinateSpace::DirectResize {
            ratio_w: 1600.0 / 800.0,
            ratio_h: 400.0 / 800.0,
        };
        let decoded = BoundingBox::new(100.0, 100.0, 200.0, 200.0).unwrap();
        let rectified = space.rectify(&decoded, 1600, 400).unwrap();
        assert_eq!(rectified.xmin(), 200.0);
        assert_eq!(rectified.ymin(), 50.0);
        assert_eq!(rectified.xmax(), 400.0);
        assert_eq!(rectified.ymax(), 100.0);
    }

    #[test]
    fn normalized_multiplies_by_image_dims() {
        let decoded = BoundingBox::new(0.25, 0.5, 0.5, 1.0).unwrap();
        let rectified = CoordinateSpace::Normalized
            .rectify(&decoded, 640, 480)
            .unwrap();
        assert_eq!(rectified.xmin(), 160.0);
        assert_eq!(rectified.ymin(), 240.0);
        assert_eq!(rectified.xmax(), 320.0);
        assert_eq!(rectified.ymax(), 479.0);
    }

    #[test]
    fn out_of_range_coordinates_are_clamped_exactly() {
        let space = CoordinateSpace::DirectResize {
            ratio_w: 1.0,
            ratio_h: 1.0,
        };
        let decoded = BoundingBox::new(-10.0, -10.0, 900.0, 700.0).unwrap();
        let rectified = space.rectify(&decoded, 640, 480).unwrap();
        assert_eq!(rectified.xmin(), 0.0);
        assert_eq!(rectified.ymin(), 0.0);
        assert_eq!(rectified.xmax(), 639.0);
        assert_eq!(rectified.ymax(), 479.0);
    }
}
