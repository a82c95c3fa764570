use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::error::{DetectionError, Result};
use crate::image_utils::preprocessing::rgb_image_blob;
use crate::object_detection::object_detection_utils::{argmax, check_class_names, nms};
use crate::object_detection::ort_inference_session::{
    InferenceEngine, OrtInferenceSession, OutputTensor,
};
use crate::object_detection::rectify::CoordinateSpace;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use tracing::debug;

/// A YOLOv3-style detector over a flat per-anchor output tensor.
///
/// The model stretches the input image to a fixed square canvas and emits a
/// single `[1, numAnchors, 4 + 1 + numClasses]` tensor whose rows are
/// `[cx, cy, w, h, objectness, classScores...]`, all in canvas pixels.
pub struct Yolov3<E: InferenceEngine = OrtInferenceSession> {
    engine: E,
    num_classes: usize,
    class_names: Vec<String>,
}

impl Yolov3<OrtInferenceSession> {
    pub fn from_model_file(
        model_path: &Path,
        num_classes: usize,
        class_names: Vec<String>,
    ) -> Result<Self> {
        Yolov3::new(OrtInferenceSession::new(model_path)?, num_classes, class_names)
    }
}

impl<E: InferenceEngine> Yolov3<E> {
    pub const INPUT_WIDTH: u32 = 800;
    pub const INPUT_HEIGHT: u32 = 800;

    /// Documented default thresholds for this family.
    pub const DEFAULT_CONF_THRESHOLD: f32 = 0.15;
    pub const DEFAULT_NMS_THRESHOLD: f32 = 0.5;

    pub fn new(engine: E, num_classes: usize, class_names: Vec<String>) -> Result<Self> {
        check_class_names(num_classes, &class_names)?;
        Ok(Yolov3 {
            engine,
            num_classes,
            class_names,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Runs the full pipeline on one image: stretch-resize, blob, inference,
    /// decode with inline confidence filtering, rectify back to original
    /// pixels, and NMS. An empty detection list is a normal outcome.
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
        let blob = rgb_image_blob(&resized, &[0.0; 3], &[255.0; 3])?;
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

        let decoded = decode_yolov3(
            &outputs[0],
            self.num_classes,
            conf_threshold,
            Self::INPUT_WIDTH as f32,
            Self::INPUT_HEIGHT as f32,
        )?;
        debug!(candidates = decoded.len(), "yolov3 decode");
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
        debug!(surviving = keep.len(), "yolov3 nms");
        Ok(keep.into_iter().map(|i| rectified[i].clone()).collect())
    }
}

/// Decodes the per-anchor tensor into canvas-space candidates.
///
/// Rows whose objectness falls below `conf_threshold` are dropped inline;
/// surviving boxes are converted from center/size to corners and clamped to
/// the canvas. The confidence of a candidate is the objectness alone, the
/// class the argmax over the trailing class scores.
pub fn decode_yolov3(
    output: &OutputTensor,
    num_classes: usize,
    conf_threshold: f32,
    canvas_width: f32,
    canvas_height: f32,
) -> Result<Vec<Detection>> {
    if output.shape.len() != 3 {
        return Err(DetectionError::ShapeMismatch {
            name: "detections",
            expected: "[1, numAnchors, 5 + numClasses]".to_string(),
            actual: output.shape.clone(),
        });
    }
    let num_anchors = output.shape[1];
    let num_attrs = output.shape[2];
    if num_attrs != 5 + num_classes || output.data.len() != num_anchors * num_attrs {
        return Err(DetectionError::ShapeMismatch {
            name: "detections",
            expected: format!("[1, {num_anchors}, {}]", 5 + num_classes),
            actual: output.shape.clone(),
        });
    }

    let mut detections = Vec::new();
    for row in output.data.chunks_exact(num_attrs) {
        let objectness = row[4];
        if objectness < conf_threshold {
            continue;
        }
        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let xmin = (cx - w / 2.0).clamp(0.0, canvas_width - 1.0);
        let ymin = (cy - h / 2.0).clamp(0.0, canvas_height - 1.0);
        let xmax = (cx + w / 2.0).clamp(xmin, canvas_width - 1.0);
        let ymax = (cy + h / 2.0).clamp(ymin, canvas_height - 1.0);
        detections.push(Detection {
            bbox: BoundingBox::new(xmin, ymin, xmax, ymax)?,
            confidence: objectness,
            class_index: argmax(&row[5..]),
            mask: None,
        });
    }
    Ok(detections)
}
