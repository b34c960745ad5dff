use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ort(#[from] ort::Error),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Classifier model {0:?} does not exist")]
    ModelNotFound(PathBuf),
    #[error("Failed to load the classifier model from {path:?}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("Classifier model {0:?} declares no outputs")]
    ModelWithoutOutputs(PathBuf),
    #[error("The ONNX runtime library could not be loaded: {0}")]
    RuntimeUnavailable(String),
    #[error("Invalid image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("The classifier outputs {model_classes} classes but the class table has {table_classes} entries")]
    ClassTableMismatch {
        model_classes: usize,
        table_classes: usize,
    },
    #[error("The classifier expects input of shape {found:?}, but images are prepared as {expected:?}")]
    InputShapeMismatch {
        expected: [usize; 4],
        found: Vec<i64>,
    },
    #[error("Prepared tensor has shape {found:?}, expected {expected:?}")]
    TensorShape {
        expected: [usize; 4],
        found: Vec<usize>,
    },
    #[error("The classifier returned an empty output")]
    EmptyOutput,
    #[error("The classifier returned {0}, which is not a probability in [0, 1]")]
    InvalidConfidence(f32),
    #[error("Unsupported file type {0:?}. Expected a .jpg, .jpeg or .png file.")]
    UnsupportedFileType(String),
    #[error("Invalid upload filename {0:?}")]
    InvalidFilename(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
      S: serde::ser::Serializer,
    {
      serializer.serialize_str(self.to_string().as_ref())
    }
}

/// Wraps an error with the ID of the request that caused it,
/// so the rejection can be reported next to the upload it belongs to.
#[derive(Serialize, Debug, thiserror::Error)]
#[error("Request {request_id} ({filename}) failed: {error}")]
pub struct RequestError {
  pub request_id: String,
  pub filename: String,
  pub error: Error,
}
