use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DetectionError>;

/// A set of custom errors for more informative error handling.
///
/// Configuration errors (class-count mismatches, missing or misshapen output
/// tensors) and buffer-size violations abort the current image's pipeline and
/// carry the expected vs. actual values so the mismatch can be diagnosed.
/// They are never retried: they indicate a structural mismatch between the
/// model and the calling code, not a transient fault.
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error(
        "failed to create bounding box, ({xmin}, {ymin}) must not exceed ({xmax}, {ymax})"
    )]
    InvalidBox {
        xmin: f32,
        ymin: f32,
        xmax: f32,
        ymax: f32,
    },

    #[error("model declares {expected} classes but {actual} class names were supplied")]
    ClassCountMismatch { expected: usize, actual: usize },

    #[error("{context} holds {actual} elements, expected {expected}")]
    BufferSize {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("output tensor '{name}' has shape {actual:?}, expected {expected}")]
    ShapeMismatch {
        name: &'static str,
        expected: String,
        actual: Vec<usize>,
    },

    #[error("model produced {actual} output tensors, expected {expected}")]
    MissingOutput { expected: usize, actual: usize },

    #[error("output tensor '{name}' has an unsupported element type")]
    UnsupportedOutputType { name: String },

    #[error("inference session lock poisoned by a previous panic")]
    SessionLock,

    #[error(transparent)]
    Ort(#[from] ort::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
