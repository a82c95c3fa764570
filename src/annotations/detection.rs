use crate::annotations::bounding_box::BoundingBox;
use crate::annotations::mask_patch::MaskPatch;
use serde::Serialize;

/// A detection is what is produced as output from an object detection model.
///
/// A detection pairs a bounding box with a confidence score (the model's
/// belief that the detection is real) and the index of the predicted class.
/// Instance segmentation models additionally attach a soft mask patch; plain
/// detectors leave it as `None`. The mask is skipped during serialization
/// since its pixel data is only meaningful to the mask compositor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub class_index: usize,
    #[serde(skip)]
    pub mask: Option<MaskPatch>,
}
