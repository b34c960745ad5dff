use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use log::info;

use crate::classifier::{Classifier, OnnxClassifier};
use crate::config::Config;
use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::uploads::UploadStore;

/// Resources owned by the process for its whole lifetime.
/// Built once at startup and only read afterwards, so it is shared by reference without locking.
pub struct ClassifierState
{
    pub pipeline: Pipeline,
    pub uploads: UploadStore,
}

impl ClassifierState
{
    pub fn new(classifier: Box<dyn Classifier>, config: &Config) -> Result<Self, Error>
    {
        config.validate()?;
        let pipeline = Pipeline::new(classifier, config.class_table()?, config.preprocessor())?;
        let uploads = UploadStore::new(&config.uploads_dir)?;
        Ok(ClassifierState { pipeline, uploads })
    }

    /// Loads the ONNX classifier named by the config and builds the state around it.
    /// Any error here is fatal; the process can't serve requests without a working model.
    pub fn from_config(config: &Config) -> Result<Self, Error>
    {
        if !config.model_path.is_file() {
            return Err(Error::ModelNotFound(config.model_path.clone()));
        }

        let runtime_library = config.onnxruntime_path.clone()
            .or_else(|| std::env::var_os("ORT_DYLIB_PATH").map(PathBuf::from));
        if let Some(dylib) = &runtime_library {
            if !dylib.is_file() {
                return Err(Error::Config(format!("ONNX runtime library {:?} does not exist", dylib)));
            }
        }

        let now = std::time::Instant::now();
        let classifier = catch_runtime_panic(|| {
            if let Some(dylib) = &config.onnxruntime_path {
                info!("Using ONNX runtime library {:?}", dylib);
                ort::init_from(dylib.to_string_lossy())
                    .with_name("dermaclass")
                    .commit()?;
            }
            OnnxClassifier::load(&config.model_path, config.intra_threads)
        })?;
        info!("Loading the classifier took {:?}", now.elapsed());

        Self::new(Box::new(classifier), config)
    }
}

/// `ort` panics when the runtime library is missing or incompatible instead of returning an error.
/// Turns that panic into a startup error.
fn catch_runtime_panic<T>(load: impl FnOnce() -> Result<T, Error>) -> Result<T, Error>
{
    std::panic::catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|panic| {
        let reason = panic.downcast_ref::<String>().cloned()
            .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_else(|| "unknown error".to_string());
        Err(Error::RuntimeUnavailable(reason))
    })
}
