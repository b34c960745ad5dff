use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classes::{ClassInfo, ClassTable};
use crate::error::Error;
use crate::preprocessing::{Preprocessor, Resample, IMAGE_INPUT_SIZE};

pub const DEFAULT_MODEL_PATH: &str = "skin_model.onnx";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Settings read once at startup. Every field has a default, so the config file is optional
/// and may set only the fields it cares about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config
{
    /// The ONNX export of the trained classifier.
    pub model_path: PathBuf,
    pub uploads_dir: PathBuf,
    /// Side length, in pixels, of the square input the classifier was trained on.
    pub input_size: u32,
    pub resample: Resample,
    pub pixel_scale: f32,
    pub intra_threads: usize,
    /// Location of the ONNX runtime shared library. If unset, ORT_DYLIB_PATH or the
    /// platform's library search path is used.
    pub onnxruntime_path: Option<PathBuf>,
    /// Replaces the built-in lesion classes. Must be in model output order.
    pub classes: Option<Vec<ClassInfo>>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Config {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
            input_size: IMAGE_INPUT_SIZE,
            resample: Resample::default(),
            pixel_scale: 1.0,
            intra_threads: 1,
            onnxruntime_path: None,
            classes: None,
        }
    }
}

impl Config
{
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self, Error>
    {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error>
    {
        if self.input_size == 0 {
            return Err(Error::Config("input_size must be greater than 0".to_string()));
        }
        if !self.pixel_scale.is_finite() || self.pixel_scale <= 0.0 {
            return Err(Error::Config(format!("pixel_scale must be a positive number, got {}", self.pixel_scale)));
        }
        if self.intra_threads == 0 {
            return Err(Error::Config("intra_threads must be at least 1".to_string()));
        }
        self.class_table()?;
        Ok(())
    }

    pub fn class_table(&self) -> Result<ClassTable, Error>
    {
        match &self.classes
        {
            Some(classes) => ClassTable::new(classes.clone()),
            None => Ok(ClassTable::skin_lesions()),
        }
    }

    pub fn preprocessor(&self) -> Preprocessor
    {
        Preprocessor { input_size: self.input_size, resample: self.resample, pixel_scale: self.pixel_scale }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_match_the_trained_model()
    {
        let config = Config::default();
        assert_eq!(config.model_path, PathBuf::from("skin_model.onnx"));
        assert_eq!(config.uploads_dir, PathBuf::from("uploads"));
        assert_eq!(config.preprocessor(), Preprocessor::default());
        assert_eq!(config.class_table().unwrap(), ClassTable::skin_lesions());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults()
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "model_path": "models/lesions.onnx", "resample": "triangle" }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/lesions.onnx"));
        assert_eq!(config.resample, Resample::Triangle);
        assert_eq!(config.input_size, 28);
    }

    #[test]
    fn unknown_keys_are_rejected()
    {
        let result: Result<Config, _> = serde_json::from_str(r#"{ "modle_path": "typo.onnx" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_values_are_rejected()
    {
        let config = Config { input_size: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config { pixel_scale: f32::NAN, ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config { intra_threads: 0, ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = Config { classes: Some(vec![]), ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn custom_class_table()
    {
        let config: Config = serde_json::from_str(
            r#"{ "classes": [{ "code": "benign", "description": "Benign" }, { "code": "malignant", "description": "Malignant" }] }"#
        ).unwrap();
        let table = config.class_table().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).unwrap().code, "malignant");
    }
}
