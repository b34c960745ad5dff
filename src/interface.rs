/// This module contains the structs that are reported for each classified upload.
/// They are printed either as JSON lines or as text for a person to read,
/// so field names are part of the output format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pipeline::Classification;

/// The size of an image, in pixels.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageSize
{
    pub width: u32,
    pub height: u32,
}

/// The result of classifying one uploaded image.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClassificationReport
{
    pub request_id: String,
    pub filename: String,
    pub stored_path: String,
    pub class_index: usize,
    pub class_code: String,
    pub label: String,
    pub confidence: f32,
    pub image_size: ImageSize,
    pub classified_at: String,
}

impl ClassificationReport
{
    pub fn new(request_id: String, filename: String, stored_path: String, classification: Classification, classified_at: String) -> Self
    {
        ClassificationReport
        {
            request_id,
            filename,
            stored_path,
            class_index: classification.prediction.class_index,
            class_code: classification.class.code,
            label: classification.class.description,
            confidence: classification.prediction.confidence,
            image_size: ImageSize { width: classification.source_width, height: classification.source_height },
            classified_at,
        }
    }
}

impl fmt::Display for ClassificationReport
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        writeln!(f, "{}", self.filename)?;
        writeln!(f, "Prediction: {}", self.label)?;
        writeln!(f, "Confidence: {:.2}", self.confidence)?;
        writeln!(f, "Class ID: {}", self.class_index)?;
        write!(f, "Class Name: {}", self.class_code)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::classes::ClassInfo;
    use crate::pipeline::Prediction;

    fn report() -> ClassificationReport
    {
        let classification = Classification {
            prediction: Prediction { class_index: 6, confidence: 0.8731 },
            class: ClassInfo::new("mel", "Melanoma"),
            source_width: 600,
            source_height: 450,
        };
        ClassificationReport::new(
            "1234".to_string(),
            "lesion.jpg".to_string(),
            "uploads/lesion.jpg".to_string(),
            classification,
            "2021-01-01 12:00:00".to_string(),
        )
    }

    #[test]
    fn report_serialization()
    {
        let report = report();
        let serialized = serde_json::to_string(&report).unwrap();
        let deserialized: ClassificationReport = serde_json::from_str(&serialized).unwrap();
        assert_eq!(report, deserialized);

        let value: serde_json::Value = serde_json::from_str(&serialized).unwrap();
        assert_eq!(value["class_code"], "mel");
        assert_eq!(value["image_size"]["width"], 600);
    }

    #[test]
    fn human_readable_output()
    {
        let text = report().to_string();
        assert!(text.contains("Prediction: Melanoma"));
        assert!(text.contains("Confidence: 0.87"));
        assert!(text.contains("Class ID: 6"));
        assert!(text.ends_with("Class Name: mel"));
    }
}
