use log::debug;
use ndarray::Axis;

use crate::classes::{ClassInfo, ClassTable};
use crate::classifier::Classifier;
use crate::error::Error;
use crate::preprocessing::{Preprocessor, CHANNELS};

/// The class with the highest probability and that probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction
{
    pub class_index: usize,
    /// The raw maximum of the probability vector; not calibrated or thresholded.
    pub confidence: f32,
}

/// A prediction together with the label it maps to.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification
{
    pub prediction: Prediction,
    pub class: ClassInfo,
    pub source_width: u32,
    pub source_height: u32,
}

/// Decodes uploaded images, prepares them for the classifier, runs it,
/// and maps the output to the class table.
///
/// The pipeline owns the classifier and the class table, both read-only after construction,
/// so `&Pipeline` can be used from several threads at once.
pub struct Pipeline
{
    classifier: Box<dyn Classifier>,
    classes: ClassTable,
    preprocessor: Preprocessor,
}

impl Pipeline
{
    /// Builds the pipeline, checking that the classifier's declared shapes agree with
    /// the class table and the preprocessing. Disagreements are configuration drift
    /// that would otherwise only show up as wrong predictions.
    pub fn new(classifier: Box<dyn Classifier>, classes: ClassTable, preprocessor: Preprocessor) -> Result<Self, Error>
    {
        if let Some(model_classes) = classifier.output_width() {
            if model_classes != classes.len() {
                return Err(Error::ClassTableMismatch { model_classes, table_classes: classes.len() });
            }
        }

        if let Some(found) = classifier.input_dimensions() {
            let expected = preprocessor.tensor_shape();
            if !input_dimensions_match(&found, &expected) {
                return Err(Error::InputShapeMismatch { expected, found });
            }
        }

        Ok(Pipeline { classifier, classes, preprocessor })
    }

    pub fn classes(&self) -> &ClassTable
    {
        &self.classes
    }

    pub fn predict(&self, image_bytes: &[u8]) -> Result<Prediction, Error>
    {
        let (prediction, _) = self.run(image_bytes)?;
        Ok(prediction)
    }

    /// Like `predict`, but also resolves the label and reports the size of the uploaded image.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<Classification, Error>
    {
        let (prediction, (source_width, source_height)) = self.run(image_bytes)?;

        // run() has already checked the row width against the table, so this only fails on a bug.
        let class = self.classes.get(prediction.class_index).cloned().ok_or(Error::ClassTableMismatch {
            model_classes: prediction.class_index + 1,
            table_classes: self.classes.len(),
        })?;

        Ok(Classification { prediction, class, source_width, source_height })
    }

    fn run(&self, image_bytes: &[u8]) -> Result<(Prediction, (u32, u32)), Error>
    {
        let (tensor, source_dimensions) = self.preprocessor.prepare(image_bytes)?;

        let output = self.classifier.forward(tensor)?;
        if output.len_of(Axis(0)) == 0 {
            return Err(Error::EmptyOutput);
        }
        let probabilities = output.index_axis(Axis(0), 0);
        debug!("Class probabilities: {:?}", probabilities);

        if probabilities.len() != self.classes.len() {
            return Err(Error::ClassTableMismatch {
                model_classes: probabilities.len(),
                table_classes: self.classes.len(),
            });
        }

        // A NaN or negative entry means the model is broken, even if some other entry looks fine.
        if let Some(&invalid) = probabilities.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(Error::InvalidConfidence(invalid));
        }

        let probabilities = probabilities.to_vec();
        let (class_index, confidence) = argmax(&probabilities).ok_or(Error::EmptyOutput)?;

        Ok((Prediction { class_index, confidence }, source_dimensions))
    }
}

/// Index and value of the largest entry. Ties go to the lowest index.
/// NaN entries must be rejected before calling this; they compare unordered.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)>
{
    values.iter().copied().enumerate().fold(None, |best, (index, value)| {
        match best
        {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((index, value)),
        }
    })
}

/// Dynamic dimensions (-1, or 0 in some exporters) match anything.
fn input_dimensions_match(found: &[i64], expected: &[usize; 4]) -> bool
{
    if found.len() != expected.len() || expected[3] != CHANNELS {
        return false;
    }
    // The batch dimension is not checked; a fixed batch of 1 is fine too.
    found.iter().zip(expected.iter()).skip(1).all(|(&found, &expected)| {
        found <= 0 || found as usize == expected
    })
}
