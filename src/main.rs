use ort_detectors::annotations::mask_patch::composite_masks;
use ort_detectors::object_detection::class_constants::{MSCOCO_CLASSES, owned_class_names};
use ort_detectors::object_detection::mask_rcnn::MaskRcnn;
use ort_detectors::object_detection::object_detection_utils::generate_color_chart;
use std::error::Error;
use std::path::Path;

const CONFIDENCE_THRESHOLD: f32 = 0.5;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let model_path = Path::new("./data/models/mask_rcnn.onnx");
    if !model_path.exists() {
        return Err(format!("Model path does not exist, or cannot be read: {model_path:?}").into());
    }
    let model = MaskRcnn::from_model_file(
        model_path,
        MSCOCO_CLASSES.len(),
        owned_class_names(&MSCOCO_CLASSES),
    )?;

    let mut img = image::open("./data/images/test.jpg")?.into_rgb8();
    let detections = model.detect(&img, CONFIDENCE_THRESHOLD)?;
    println!("{}", serde_json::to_string_pretty(&detections)?);

    let colors = generate_color_chart(MSCOCO_CLASSES.len(), 2020);
    composite_masks(&mut img, &detections, &colors);
    img.save("result.jpg")?;
    Ok(())
}
