use std::path::Path;
use std::time::SystemTime;

use log::{info, warn};
use uuid::Uuid;

use crate::error::{Error, RequestError};
use crate::interface::ClassificationReport;
use crate::junk_drawer;
use crate::state::ClassifierState;

/// Handles one uploaded image: saves it to the uploads directory, classifies it,
/// and returns the report for display.
///
/// Errors are scoped to this request. They are wrapped with the request ID and returned,
/// never panicked on, and the state is left untouched for the next request.
pub fn classify_upload(
        filename: &str,
        bytes: &[u8],
        state: &ClassifierState,
    ) -> Result<ClassificationReport, RequestError>
{
    let request_id = Uuid::new_v4();

    let result = classify_upload_inner(request_id, filename, bytes, state);
    if let Err(e) = &result {
        warn!("Request {} for {:?} was rejected: {}", request_id, filename, e);
    }

    result.map_err(|error| RequestError {
        request_id: request_id.to_string(),
        filename: filename.to_string(),
        error,
    })
}

fn classify_upload_inner(
        request_id: Uuid,
        filename: &str,
        bytes: &[u8],
        state: &ClassifierState,
    ) -> Result<ClassificationReport, Error>
{
    let stored_path = state.uploads.save(filename, bytes)?;

    let now = std::time::Instant::now();
    let classification = state.pipeline.classify(bytes)?;
    let elapsed = now.elapsed();
    info!(
        "Request {} classified {:?} as {} ({}) with confidence {:.4} in {:?}",
        request_id, filename, classification.class.code, classification.prediction.class_index,
        classification.prediction.confidence, elapsed
    );

    Ok(ClassificationReport::new(
        request_id.to_string(),
        filename.to_string(),
        stored_path.to_string_lossy().to_string(),
        classification,
        junk_drawer::system_time_to_string(SystemTime::now()),
    ))
}

/// Reads an image from disk and handles it as an upload named after the file.
pub fn classify_path(path: &Path, state: &ClassifierState) -> Result<ClassificationReport, RequestError>
{
    let filename = junk_drawer::display_file_name(path);
    match std::fs::read(path)
    {
        Ok(bytes) => classify_upload(&filename, &bytes, state),
        Err(e) => {
            let request_id = Uuid::new_v4().to_string();
            warn!("Request {} could not read {:?}: {}", request_id, path, e);
            Err(RequestError { request_id, filename, error: e.into() })
        }
    }
}

#[cfg(test)]
mod tests
{
    use ndarray::{Array2, Array4};

    use super::*;
    use crate::classifier::Classifier;
    use crate::config::Config;
    use crate::preprocessing::tests::solid_red_png;

    struct FixedClassifier(Vec<f32>);

    impl Classifier for FixedClassifier
    {
        fn forward(&self, _images: Array4<f32>) -> Result<Array2<f32>, Error>
        {
            Ok(Array2::from_shape_vec((1, self.0.len()), self.0.clone())?)
        }
    }

    fn state(dir: &Path) -> ClassifierState
    {
        let config = Config { uploads_dir: dir.join("uploads"), ..Config::default() };
        let classifier = FixedClassifier(vec![0.1, 0.05, 0.6, 0.05, 0.05, 0.1, 0.05]);
        ClassifierState::new(Box::new(classifier), &config).unwrap()
    }

    #[test]
    fn upload_is_saved_and_classified()
    {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let bytes = solid_red_png(10, 10);

        let report = classify_upload("red.png", &bytes, &state).unwrap();
        assert_eq!(report.class_index, 2);
        assert_eq!(report.class_code, "bkl");
        assert_eq!(report.label, "Benign Keratosis-Like Lesions");
        assert_eq!(report.confidence, 0.6);
        assert_eq!(report.image_size.width, 10);
        assert!(Uuid::parse_str(&report.request_id).is_ok());
        assert_eq!(std::fs::read(dir.path().join("uploads").join("red.png")).unwrap(), bytes);
    }

    #[test]
    fn invalid_image_is_rejected_but_kept()
    {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let bytes = solid_red_png(10, 10);

        let rejection = classify_upload("broken.png", &bytes[..20], &state).unwrap_err();
        assert!(matches!(rejection.error, Error::Decode(_)));
        assert_eq!(rejection.filename, "broken.png");
        // Uploads are stored before they are classified.
        assert!(dir.path().join("uploads").join("broken.png").is_file());

        // Later requests are unaffected.
        assert!(classify_upload("red.png", &bytes, &state).is_ok());
    }

    #[test]
    fn unsupported_upload_is_not_stored()
    {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let rejection = classify_upload("notes.txt", b"hello", &state).unwrap_err();
        assert!(matches!(rejection.error, Error::UnsupportedFileType(_)));
        assert!(!dir.path().join("uploads").join("notes.txt").exists());
    }

    #[test]
    fn classify_path_reads_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let source = dir.path().join("mole.png");
        std::fs::write(&source, solid_red_png(40, 40)).unwrap();

        let report = classify_path(&source, &state).unwrap();
        assert_eq!(report.filename, "mole.png");
        assert_eq!(report.class_index, 2);

        let missing = classify_path(&dir.path().join("missing.png"), &state).unwrap_err();
        assert!(matches!(missing.error, Error::Io(_)));
    }
}
