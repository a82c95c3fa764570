use crate::error::{DetectionError, Result};
use ndarray::{ArrayViewD, IxDyn};
use ort::inputs;
use ort::session::Session;
use ort::value::{DynValue, TensorRef};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// One raw output tensor from an inference call.
///
/// Owned per call and read-only to the decoders. Everything is carried as
/// f32; integer-typed model outputs (Mask R-CNN's int64 class labels) are
/// widened by the session wrapper so the decoders see a single element type.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
}

/// The seam between the post-processing core and whatever actually runs the
/// network. The engine receives a flat float buffer plus its shape and
/// returns every output tensor in the model's declared order. Decoders and
/// pipeline tests only ever see this trait, never an ONNX Runtime handle.
pub trait InferenceEngine {
    fn run(&self, input: &[f32], shape: &[usize]) -> Result<Vec<OutputTensor>>;
}

/// An onnxruntime inference session.
///
/// All of the detectors in this crate are wrappers around one of these; it
/// owns the underlying ONNX Runtime handle for the lifetime of the detector,
/// binds the model's first declared input, and extracts every output into
/// flat buffers. `Session::run` needs exclusive access, so the handle sits
/// behind a mutex and detector calls stay `&self`.
pub struct OrtInferenceSession {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
}

impl OrtInferenceSession {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?.commit_from_file(model_path)?;
        let input_name = session.inputs[0].name.clone();
        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();
        info!(model = %model_path.display(), input = %input_name, "onnx session created");
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_names,
        })
    }
}

impl InferenceEngine for OrtInferenceSession {
    fn run(&self, input: &[f32], shape: &[usize]) -> Result<Vec<OutputTensor>> {
        let view = ArrayViewD::from_shape(IxDyn(shape), input).map_err(|_| {
            DetectionError::BufferSize {
                context: "inference input buffer",
                expected: shape.iter().product(),
                actual: input.len(),
            }
        })?;
        let mut session = self.session.lock().map_err(|_| DetectionError::SessionLock)?;
        let outputs =
            session.run(inputs![self.input_name.as_str() => TensorRef::from_array_view(view)?])?;
        let mut collected = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            collected.push(extract_output(&outputs[name.as_str()], name)?);
        }
        Ok(collected)
    }
}

fn extract_output(value: &DynValue, name: &str) -> Result<OutputTensor> {
    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        return Ok(OutputTensor {
            data: data.to_vec(),
            shape: shape.iter().map(|&d| d as usize).collect(),
        });
    }
    if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
        return Ok(OutputTensor {
            data: data.iter().map(|&v| v as f32).collect(),
            shape: shape.iter().map(|&d| d as usize).collect(),
        });
    }
    Err(DetectionError::UnsupportedOutputType {
        name: name.to_string(),
    })
}
