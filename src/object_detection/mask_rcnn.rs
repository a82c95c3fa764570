use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::annotations::mask_patch::MaskPatch;
use crate::error::{DetectionError, Result};
use crate::image_utils::padding::{pad_right_bottom, padded_canvas};
use crate::image_utils::preprocessing::rgb_image_blob;
use crate::object_detection::object_detection_utils::check_class_names;
use crate::object_detection::ort_inference_session::{
    InferenceEngine, OrtInferenceSession, OutputTensor,
};
use crate::object_detection::rectify::CoordinateSpace;
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::path::Path;
use tracing::debug;

/// Per-channel mean of the reference checkpoint's training data, in raw
/// 0-255 intensities (no further scaling).
pub const PIXEL_MEAN: [f32; 3] = [102.9801, 115.9465, 122.7717];

/// A Mask R-CNN-style instance segmentation model.
///
/// The shorter image side is scaled to 800 pixels and the result padded onto
/// a multiple-of-32 canvas. The network does its own proposal filtering and
/// suppression, so post-processing is pure unpacking: four parallel output
/// tensors (boxes in canvas pixels, int64 class labels, scores, 28x28 soft
/// mask patches) aligned by detection index, followed by the confidence
/// filter and coordinate rectification. No NMS stage runs here.
pub struct MaskRcnn<E: InferenceEngine = OrtInferenceSession> {
    engine: E,
    class_names: Vec<String>,
}

impl MaskRcnn<OrtInferenceSession> {
    pub fn from_model_file(
        model_path: &Path,
        num_classes: usize,
        class_names: Vec<String>,
    ) -> Result<Self> {
        MaskRcnn::new(OrtInferenceSession::new(model_path)?, num_classes, class_names)
    }
}

impl<E: InferenceEngine> MaskRcnn<E> {
    pub const TARGET_MIN_SIDE: u32 = 800;

    pub const DEFAULT_CONF_THRESHOLD: f32 = 0.5;

    pub fn new(engine: E, num_classes: usize, class_names: Vec<String>) -> Result<Self> {
        check_class_names(num_classes, &class_names)?;
        Ok(MaskRcnn {
            engine,
            class_names,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn detect(&self, image: &RgbImage, conf_threshold: f32) -> Result<Vec<Detection>> {
        let (orig_width, orig_height) = image.dimensions();
        let canvas = padded_canvas(orig_width, orig_height, Self::TARGET_MIN_SIDE);
        debug!(
            ratio = canvas.ratio,
            padded_width = canvas.padded_width,
            padded_height = canvas.padded_height,
            "mask r-cnn canvas"
        );
        let resized = imageops::resize(
            image,
            canvas.resized_width,
            canvas.resized_height,
            FilterType::Triangle,
        );
        let padded = pad_right_bottom(&resized, canvas.padded_width, canvas.padded_height);
        let blob = rgb_image_blob(&padded, &PIXEL_MEAN, &[])?;
        // This model family takes a rank-3 input, no batch dimension.
        let outputs = self.engine.run(
            &blob,
            &[3, canvas.padded_height as usize, canvas.padded_width as usize],
        )?;

        let decoded = decode_mask_rcnn(&outputs, conf_threshold)?;
        debug!(candidates = decoded.len(), "mask r-cnn decode");
        if decoded.is_empty() {
            return Ok(Vec::new());
        }

        let space = CoordinateSpace::PaddedCanvas {
            ratio: canvas.ratio,
        };
        let mut rectified = Vec::with_capacity(decoded.len());
        for detection in decoded {
            rectified.push(Detection {
                bbox: space.rectify(&detection.bbox, orig_width, orig_height)?,
                ..detection
            });
        }
        Ok(rectified)
    }
}

/// Unpacks the four aligned output tensors into mask-carrying detections.
///
/// Expects `[boxes [n, 4], labels [n], scores [n], masks [n, 1, s, s]]`.
/// Boxes stay in padded-canvas pixels; the caller rectifies them. Entries
/// below the confidence threshold are dropped along with their masks.
pub fn decode_mask_rcnn(outputs: &[OutputTensor], conf_threshold: f32) -> Result<Vec<Detection>> {
    if outputs.len() < 4 {
        return Err(DetectionError::MissingOutput {
            expected: 4,
            actual: outputs.len(),
        });
    }
    let (boxes, labels, scores, masks) = (&outputs[0], &outputs[1], &outputs[2], &outputs[3]);
    if labels.shape.len() != 1 {
        return Err(DetectionError::ShapeMismatch {
            name: "labels",
            expected: "[n]".to_string(),
            actual: labels.shape.clone(),
        });
    }
    let count = labels.shape[0];
    if boxes.data.len() != count * 4 {
        return Err(DetectionError::ShapeMismatch {
            name: "boxes",
            expected: format!("[{count}, 4]"),
            actual: boxes.shape.clone(),
        });
    }
    if scores.data.len() != count {
        return Err(DetectionError::ShapeMismatch {
            name: "scores",
            expected: format!("[{count}]"),
            actual: scores.shape.clone(),
        });
    }
    let mask_size = masks.shape.last().copied().unwrap_or(0);
    if masks.data.len() != count * mask_size * mask_size {
        return Err(DetectionError::ShapeMismatch {
            name: "masks",
            expected: format!("[{count}, 1, s, s]"),
            actual: masks.shape.clone(),
        });
    }

    let mut detections = Vec::with_capacity(count);
    for i in 0..count {
        let score = scores.data[i];
        if score < conf_threshold {
            continue;
        }
        let corners = &boxes.data[i * 4..(i + 1) * 4];
        let patch = masks.data[i * mask_size * mask_size..(i + 1) * mask_size * mask_size].to_vec();
        detections.push(Detection {
            bbox: BoundingBox::new(corners[0], corners[1], corners[2], corners[3])?,
            confidence: score,
            class_index: labels.data[i] as usize,
            mask: Some(MaskPatch::new(mask_size, patch)?),
        });
    }
    Ok(detections)
}
