use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::error::{DetectionError, Result};
use crate::image_utils::preprocessing::rgb_image_blob;
use crate::object_detection::object_detection_utils::{argmax, check_class_names, nms, sigmoid};
use crate::object_detection::ort_inference_session::{
    InferenceEngine, OrtInferenceSession, OutputTensor,
};
use crate::object_detection::rectify::CoordinateSpace;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use tracing::debug;

/// Width/height priors for the five anchor boxes, in grid-cell units.
pub const ANCHORS: [(f32, f32); 5] = [
    (1.08, 1.19),
    (3.42, 4.41),
    (6.63, 11.38),
    (9.42, 5.11),
    (16.62, 10.52),
];

/// Attributes per anchor: tx, ty, tw, th, confidence logit, then classes.
const NUM_BOX_ATTRS: usize = 5;

/// Pixels per grid cell on the model canvas.
pub const STRIDE: f32 = 32.0;

/// A Tiny-YOLOv2-style single-scale grid detector.
///
/// The output tensor is channel-major over a 13x13 grid: for each cell, five
/// anchors each carry `5 + numClasses` raw attributes. Unlike the flat
/// per-anchor family, nothing here is in pixels yet; box centers combine the
/// cell position with a sigmoid offset, sizes combine the anchor prior with
/// an exponential, and both scale by the 32-pixel stride. The confidence is
/// a logit and must pass through a sigmoid before thresholding.
pub struct TinyYolov2<E: InferenceEngine = OrtInferenceSession> {
    engine: E,
    num_classes: usize,
    class_names: Vec<String>,
}

impl TinyYolov2<OrtInferenceSession> {
    pub fn from_model_file(
        model_path: &Path,
        num_classes: usize,
        class_names: Vec<String>,
    ) -> Result<Self> {
        TinyYolov2::new(OrtInferenceSession::new(model_path)?, num_classes, class_names)
    }
}

impl<E: InferenceEngine> TinyYolov2<E> {
    pub const INPUT_WIDTH: u32 = 416;
    pub const INPUT_HEIGHT: u32 = 416;

    pub const DEFAULT_CONF_THRESHOLD: f32 = 0.5;
    pub const DEFAULT_NMS_THRESHOLD: f32 = 0.6;

    pub fn new(engine: E, num_classes: usize, class_names: Vec<String>) -> Result<Self> {
        check_class_names(num_classes, &class_names)?;
        Ok(TinyYolov2 {
            engine,
            num_classes,
            class_names,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn detect(
        &self,
        image: &RgbImage,
        conf_threshold: f32,
        nms_threshold: f32,
    ) -> Result<Vec<Detection>> {
        let (orig_width, orig_height) = image.dimensions();
        let resized = imageops::resize(
            image,
            Self::INPUT_WIDTH,
            Self::INPUT_HEIGHT,
            FilterType::Triangle,
        );
        // The reference checkpoint takes raw 0-255 intensities.
        let blob = rgb_image_blob(&resized, &[], &[])?;
        let outputs = self.engine.run(
            &blob,
            &[1, 3, Self::INPUT_HEIGHT as usize, Self::INPUT_WIDTH as usize],
        )?;
        if outputs.is_empty() {
            return Err(DetectionError::MissingOutput {
                expected: 1,
                actual: 0,
            });
        }

        let decoded = decode_tiny_yolov2(&outputs[0], self.num_classes, conf_threshold)?;
        debug!(candidates = decoded.len(), "tiny yolov2 decode");
        if decoded.is_empty() {
            return Ok(Vec::new());
        }

        let space = CoordinateSpace::DirectResize {
            ratio_w: orig_width as f32 / Self::INPUT_WIDTH as f32,
            ratio_h: orig_height as f32 / Self::INPUT_HEIGHT as f32,
        };
        let mut rectified = Vec::with_capacity(decoded.len());
        for detection in decoded {
            rectified.push(Detection {
                bbox: space.rectify(&detection.bbox, orig_width, orig_height)?,
                ..detection
            });
        }

        let boxes: Vec<BoundingBox> = rectified.iter().map(|d| d.bbox.clone()).collect();
        let scores: Vec<f32> = rectified.iter().map(|d| d.confidence).collect();
        let keep = nms(&boxes, &scores, nms_threshold);
        debug!(surviving = keep.len(), "tiny yolov2 nms");
        Ok(keep.into_iter().map(|i| rectified[i].clone()).collect())
    }
}

/// Decodes the channel-major grid tensor into canvas-space candidates.
///
/// Expects shape `[1, anchors * (5 + numClasses), gridH, gridW]`. The
/// attribute at `(anchor, attr, row, col)` lives at
/// `((anchor * attrs + attr) * gridH + row) * gridW + col`.
pub fn decode_tiny_yolov2(
    output: &OutputTensor,
    num_classes: usize,
    conf_threshold: f32,
) -> Result<Vec<Detection>> {
    let num_attrs = NUM_BOX_ATTRS + num_classes;
    let expected_channels = ANCHORS.len() * num_attrs;
    if output.shape.len() != 4 || output.shape[1] != expected_channels {
        return Err(DetectionError::ShapeMismatch {
            name: "grid",
            expected: format!("[1, {expected_channels}, gridH, gridW]"),
            actual: output.shape.clone(),
        });
    }
    let grid_height = output.shape[2];
    let grid_width = output.shape[3];
    if output.data.len() != expected_channels * grid_height * grid_width {
        return Err(DetectionError::BufferSize {
            context: "grid tensor",
            expected: expected_channels * grid_height * grid_width,
            actual: output.data.len(),
        });
    }
    let canvas_width = grid_width as f32 * STRIDE;
    let canvas_height = grid_height as f32 * STRIDE;
    let at = |anchor: usize, attr: usize, row: usize, col: usize| {
        output.data[((anchor * num_attrs + attr) * grid_height + row) * grid_width + col]
    };

    let mut detections = Vec::new();
    for row in 0..grid_height {
        for col in 0..grid_width {
            for (anchor, &(prior_w, prior_h)) in ANCHORS.iter().enumerate() {
                let confidence = sigmoid(at(anchor, 4, row, col));
                if confidence < conf_threshold {
                    continue;
                }
                let cx = (col as f32 + sigmoid(at(anchor, 0, row, col))) * STRIDE;
                let cy = (row as f32 + sigmoid(at(anchor, 1, row, col))) * STRIDE;
                let w = at(anchor, 2, row, col).exp() * prior_w * STRIDE;
                let h = at(anchor, 3, row, col).exp() * prior_h * STRIDE;

                let class_logits: Vec<f32> = (0..num_classes)
                    .map(|c| at(anchor, NUM_BOX_ATTRS + c, row, col))
                    .collect();

                let xmin = (cx - w / 2.0).clamp(0.0, canvas_width - 1.0);
                let ymin = (cy - h / 2.0).clamp(0.0, canvas_height - 1.0);
                let xmax = (cx + w / 2.0).clamp(xmin, canvas_width - 1.0);
                let ymax = (cy + h / 2.0).clamp(ymin, canvas_height - 1.0);
                detections.push(Detection {
                    bbox: BoundingBox::new(xmin, ymin, xmax, ymax)?,
                    confidence,
                    class_index: argmax(&class_logits),
                    mask: None,
                });
            }
        }
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a grid tensor with every confidence logit strongly negative,
    /// then plants one anchor's attributes at the given cell.
    fn grid_with_one_candidate(
        num_classes: usize,
        row: usize,
        col: usize,
        anchor: usize,
        attrs: &[f32],
    ) -> OutputTensor {
        let num_attrs = NUM_BOX_ATTRS + num_classes;
        let channels = ANCHORS.len() * num_attrs;
        let mut data = vec![0.0; channels * 13 * 13];
        for a in 0..ANCHORS.len() {
            for r in 0..13 {
                for c in 0..13 {
                    data[((a * num_attrs + 4) * 13 + r) * 13 + c] = -20.0;
                }
            }
        }
        for (attr, &value) in attrs.iter().enumerate() {
            data[((anchor * num_attrs + attr) * 13 + row) * 13 + col] = value;
        }
        OutputTensor {
            data,
            shape: vec![1, channels, 13, 13],
        }
    }

    #[test]
    fn decodes_cell_offset_anchor_and_stride() {
        // tx = ty = 0 so sigmoid gives 0.5; tw = th = 0 so exp gives 1.
        let output = grid_with_one_candidate(2, 6, 4, 1, &[0.0, 0.0, 0.0, 0.0, 10.0, 0.2, 3.0]);
        let dets = decode_tiny_yolov2(&output, 2, 0.5).unwrap();
        assert_eq!(dets.len(), 1);
        let det = &dets[0];
        // Center: (4 + 0.5) * 32 = 144, (6 + 0.5) * 32 = 208.
        // Size: anchor 1 is 3.42 x 4.41 cells -> 109.44 x 141.12 px.
        assert!((det.bbox.xmin() - (144.0 - 54.72)).abs() < 1e-2);
        assert!((det.bbox.xmax() - (144.0 + 54.72)).abs() < 1e-2);
        assert!((det.bbox.ymin() - (208.0 - 70.56)).abs() < 1e-2);
        assert!((det.bbox.ymax() - (208.0 + 70.56)).abs() < 1e-2);
        assert!(det.confidence > 0.99);
        assert_eq!(det.class_index, 1);
    }

    #[test]
    fn confidence_logit_is_decoded_before_thresholding() {
        // Logit 0 -> sigmoid 0.5: kept at threshold 0.5, dropped above it.
        let output = grid_with_one_candidate(1, 0, 0, 0, &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(decode_tiny_yolov2(&output, 1, 0.5).unwrap().len(), 1);
        assert!(decode_tiny_yolov2(&output, 1, 0.6).unwrap().is_empty());
    }

    #[test]
    fn silent_grid_yields_no_detections() {
        let output = grid_with_one_candidate(1, 0, 0, 0, &[]);
        assert!(decode_tiny_yolov2(&output, 1, 0.5).unwrap().is_empty());
    }

    #[test]
    fn wrong_channel_count_is_a_config_error() {
        let output = OutputTensor {
            data: vec![0.0; 100 * 13 * 13],
            shape: vec![1, 100, 13, 13],
        };
        assert!(matches!(
            decode_tiny_yolov2(&output, 20, 0.5),
            Err(DetectionError::ShapeMismatch { .. })
        ));
    }
}
