use std::path::Path;

use log::info;
use ndarray::{Array2, Array4, Axis};
use ort::{self, inputs, CPUExecutionProvider, GraphOptimizationLevel, ValueType};

use crate::error::Error;

/// A pre-trained image classifier.
///
/// Takes a batch of NHWC images and returns one row of class probabilities per image.
/// Implementations must be read-only after construction: the pipeline shares a single
/// classifier between concurrent requests without locking.
pub trait Classifier: Send + Sync
{
    /// Runs inference on a (batch, height, width, 3) tensor.
    /// Returns a 2D array of shape (batch, num_classes).
    fn forward(&self, images: Array4<f32>) -> Result<Array2<f32>, Error>;

    /// The input shape the model declares, if it declares one.
    /// Dynamic dimensions are reported as -1.
    fn input_dimensions(&self) -> Option<Vec<i64>>
    {
        None
    }

    /// The number of classes the model outputs, if it is fixed in the model graph.
    fn output_width(&self) -> Option<usize>
    {
        None
    }
}

/// The skin lesion classifier, executed with the ONNX runtime.
///
/// The trained Keras model is exported to ONNX (e.g. with tf2onnx) so that it can be run from Rust.
/// The session is created once at startup and kept for the whole process.
pub struct OnnxClassifier
{
    session: ort::Session,
    output_name: String,
    input_dimensions: Option<Vec<i64>>,
    output_dimensions: Option<Vec<i64>>,
}

impl OnnxClassifier
{
    pub fn load(path: &Path, intra_threads: usize) -> Result<Self, Error>
    {
        // Checked up front so a missing artifact is reported before the runtime library is touched.
        if !path.is_file() {
            return Err(Error::ModelNotFound(path.to_path_buf()));
        }

        let session = Self::build_session(path, intra_threads)
            .map_err(|source| Error::ModelLoad { path: path.to_path_buf(), source })?;

        let input_dimensions = session.inputs.first().and_then(|input| tensor_dimensions(&input.input_type));
        let output = session.outputs.first().ok_or_else(|| Error::ModelWithoutOutputs(path.to_path_buf()))?;
        let output_name = output.name.clone();
        let output_dimensions = tensor_dimensions(&output.output_type);

        info!(
            "Loaded classifier {:?}: input {:?}, output {:?} {:?}",
            path, input_dimensions, output_name, output_dimensions
        );

        Ok(OnnxClassifier { session, output_name, input_dimensions, output_dimensions })
    }

    fn build_session(path: &Path, intra_threads: usize) -> Result<ort::Session, ort::Error>
    {
        ort::Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .commit_from_file(path)
    }
}

impl Classifier for OnnxClassifier
{
    fn forward(&self, images: Array4<f32>) -> Result<Array2<f32>, Error>
    {
        let images_len = images.len_of(Axis(0));
        let outputs = self.session.run(inputs![images]?)?;

        // First dimension is for each image in the batch; the second is the class probabilities per image.
        let output = outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
        if output.is_empty() || images_len == 0 {
            return Err(Error::EmptyOutput);
        }

        let num_classes = output.len() / images_len;
        let output: Array2<f32> = output.to_shape((images_len, num_classes))?.to_owned();

        Ok(output)
    }

    fn input_dimensions(&self) -> Option<Vec<i64>>
    {
        self.input_dimensions.clone()
    }

    fn output_width(&self) -> Option<usize>
    {
        self.output_dimensions
            .as_ref()
            .and_then(|dimensions| dimensions.last())
            .and_then(|&width| usize::try_from(width).ok())
            .filter(|&width| width > 0)
    }
}

fn tensor_dimensions(value_type: &ValueType) -> Option<Vec<i64>>
{
    match value_type
    {
        ValueType::Tensor { dimensions, .. } => Some(dimensions.clone()),
        _ => None,
    }
}
