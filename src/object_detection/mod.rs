pub mod class_constants;
pub mod mask_rcnn;
pub mod object_detection_utils;
pub mod ort_inference_session;
pub mod rectify;
pub mod tiny_yolov2;
pub mod ultraface;
pub mod yolov3;
