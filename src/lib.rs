//! Post-processing for ONNX Runtime object detectors.
//!
//! This crate turns the raw output tensors of a handful of well-known
//! detector families into usable detections: it handles blob preprocessing,
//! per-family tensor decoding, confidence filtering, mapping coordinates back
//! into original-image pixels, non-maximum suppression, and instance-mask
//! compositing. Running the network itself is delegated to an
//! `InferenceEngine`, normally a thin wrapper around an `ort` session.
//!
//! Supported families: flat per-anchor YOLOv3-style tensors, Tiny-YOLOv2
//! grid cells with anchor priors, Mask R-CNN's aligned box/label/score/mask
//! tensors, and UltraFace's two-tensor confidence/box layout.

pub mod annotations;
pub mod error;
pub mod image_utils;
pub mod object_detection;

pub use annotations::bounding_box::BoundingBox;
pub use annotations::detection::Detection;
pub use annotations::mask_patch::MaskPatch;
pub use error::{DetectionError, Result};
