use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::detection::Detection;
use crate::error::{DetectionError, Result};
use crate::image_utils::preprocessing::rgb_image_blob;
use crate::object_detection::object_detection_utils::nms;
use crate::object_detection::ort_inference_session::{
    InferenceEngine, OrtInferenceSession, OutputTensor,
};
use crate::object_detection::rectify::CoordinateSpace;
use image::RgbImage;
use image::imageops::{self, FilterType};
use itertools::izip;
use std::path::Path;
use tracing::debug;

/// An UltraFace-style lightweight face detector.
///
/// Two parallel output tensors per call: `[1, n, 2]` per-anchor confidence
/// pairs (background, face) and `[1, n, 4]` normalized box corners in
/// `[0, 1]`. Decoding reads the face channel, keeps the normalized corners,
/// and leaves scaling to original pixels to the rectifier. Single class, so
/// suppression runs globally over every surviving face.
pub struct UltraFace<E: InferenceEngine = OrtInferenceSession> {
    engine: E,
}

impl UltraFace<OrtInferenceSession> {
    pub fn from_model_file(model_path: &Path) -> Result<Self> {
        Ok(UltraFace {
            engine: OrtInferenceSession::new(model_path)?,
        })
    }
}

impl<E: InferenceEngine> UltraFace<E> {
    pub const INPUT_WIDTH: u32 = 640;
    pub const INPUT_HEIGHT: u32 = 480;

    pub const DEFAULT_CONF_THRESHOLD: f32 = 0.7;
    pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;

    pub fn new(engine: E) -> Self {
        UltraFace { engine }
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
        let blob = rgb_image_blob(&resized, &[127.0; 3], &[128.0; 3])?;
        let outputs = self.engine.run(
            &blob,
            &[1, 3, Self::INPUT_HEIGHT as usize, Self::INPUT_WIDTH as usize],
        )?;

        let decoded = decode_ultraface(&outputs, conf_threshold)?;
        debug!(candidates = decoded.len(), "ultraface decode");
        if decoded.is_empty() {
            return Ok(Vec::new());
        }

        let mut rectified = Vec::with_capacity(decoded.len());
        for detection in decoded {
            rectified.push(Detection {
                bbox: CoordinateSpace::Normalized.rectify(
                    &detection.bbox,
                    orig_width,
                    orig_height,
                )?,
                ..detection
            });
        }

        let boxes: Vec<BoundingBox> = rectified.iter().map(|d| d.bbox.clone()).collect();
        let scores: Vec<f32> = rectified.iter().map(|d| d.confidence).collect();
        let keep = nms(&boxes, &scores, nms_threshold);
        debug!(surviving = keep.len(), "ultraface nms");
        Ok(keep.into_iter().map(|i| rectified[i].clone()).collect())
    }
}

/// Decodes the two-tensor confidence/box layout into normalized candidates.
///
/// The confidence tensor pairs (background, face) per anchor; only the face
/// channel is read. Every candidate keeps class index 0.
pub fn decode_ultraface(outputs: &[OutputTensor], conf_threshold: f32) -> Result<Vec<Detection>> {
    if outputs.len() < 2 {
        return Err(DetectionError::MissingOutput {
            expected: 2,
            actual: outputs.len(),
        });
    }
    let (confidences, boxes) = (&outputs[0], &outputs[1]);
    if confidences.shape.len() != 3 || confidences.shape[2] != 2 {
        return Err(DetectionError::ShapeMismatch {
            name: "confidences",
            expected: "[1, numAnchors, 2]".to_string(),
            actual: confidences.shape.clone(),
        });
    }
    let num_anchors = confidences.shape[1];
    if boxes.data.len() != num_anchors * 4 {
        return Err(DetectionError::ShapeMismatch {
            name: "boxes",
            expected: format!("[1, {num_anchors}, 4]"),
            actual: boxes.shape.clone(),
        });
    }

    let mut detections = Vec::new();
    for (pair, corners) in izip!(
        confidences.data.chunks_exact(2),
        boxes.data.chunks_exact(4)
    ) {
        let score = pair[1];
        if score < conf_threshold {
            continue;
        }
        detections.push(Detection {
            bbox: BoundingBox::new(corners[0], corners[1], corners[2], corners[3])?,
            confidence: score,
            class_index: 0,
            mask: None,
        });
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(anchors: &[([f32; 2], [f32; 4])]) -> Vec<OutputTensor> {
        vec![
            OutputTensor {
                data: anchors.iter().flat_map(|(c, _)| c.to_vec()).collect(),
                shape: vec![1, anchors.len(), 2],
            },
            OutputTensor {
                data: anchors.iter().flat_map(|(_, b)| b.to_vec()).collect(),
                shape: vec![1, anchors.len(), 4],
            },
        ]
    }

    #[test]
    fn reads_the_face_channel_only() {
        let outputs = fixture(&[
            ([0.95, 0.05], [0.1, 0.1, 0.2, 0.2]),
            ([0.1, 0.9], [0.5, 0.5, 0.7, 0.8]),
        ]);
        let dets = decode_ultraface(&outputs, 0.7).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[0].class_index, 0);
        assert_eq!(dets[0].bbox.xmin(), 0.5);
        assert_eq!(dets[0].bbox.ymax(), 0.8);
    }

    #[test]
    fn all_background_yields_no_detections() {
        let outputs = fixture(&[([0.99, 0.01], [0.0, 0.0, 0.1, 0.1])]);
        assert!(decode_ultraface(&outputs, 0.7).unwrap().is_empty());
    }

    #[test]
    fn single_tensor_is_a_config_error() {
        let outputs = fixture(&[([0.5, 0.5], [0.0, 0.0, 0.1, 0.1])]);
        assert!(matches!(
            decode_ultraface(&outputs[..1], 0.7),
            Err(DetectionError::MissingOutput {
                expected: 2,
                actual: 1
            })
        ));
    }

    struct StubEngine {
        outputs: Vec<OutputTensor>,
    }

    impl InferenceEngine for StubEngine {
        fn run(&self, _input: &[f32], _shape: &[usize]) -> Result<Vec<OutputTensor>> {
            Ok(self.outputs.clone())
        }
    }

    #[test]
    fn detect_scales_normalized_corners_by_original_dims() {
        let engine = StubEngine {
            outputs: fixture(&[
                ([0.1, 0.9], [0.25, 0.25, 0.5, 0.5]),
                // Nearly the same face, lower score, should be suppressed.
                ([0.1, 0.8], [0.26, 0.26, 0.5, 0.5]),
            ]),
        };
        let model = UltraFace::new(engine);
        let image = RgbImage::new(1000, 500);
        let dets = model
            .detect(&image, 0.7, UltraFace::<StubEngine>::DEFAULT_NMS_THRESHOLD)
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox.xmin(), 250.0);
        assert_eq!(dets[0].bbox.ymin(), 125.0);
        assert_eq!(dets[0].bbox.xmax(), 500.0);
        assert_eq!(dets[0].bbox.ymax(), 250.0);
    }
}
