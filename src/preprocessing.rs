/// Preprocessing functions that turn uploaded image bytes into the input tensor
/// expected by the skin lesion classifier.
/// The exact preprocessing has to match how the model was trained; any change here
/// (filter, scale, layout) changes predictions numerically.

use image::{imageops::FilterType, DynamicImage};
use log::debug;
use ndarray::{Array, Array4};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const IMAGE_INPUT_SIZE: u32 = 28;
pub const CHANNELS: usize = 3;

/// Resampling filter used to resize images to the model input size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Resample
{
    Nearest,
    Triangle,
    /// Bicubic; what the model was trained with.
    #[default]
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Resample> for FilterType
{
    fn from(resample: Resample) -> Self
    {
        match resample
        {
            Resample::Nearest => FilterType::Nearest,
            Resample::Triangle => FilterType::Triangle,
            Resample::CatmullRom => FilterType::CatmullRom,
            Resample::Gaussian => FilterType::Gaussian,
            Resample::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Decodes image bytes, guessing the format from the content.
/// Truncated or otherwise malformed data is an error; we never return a partially decoded image.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, Error>
{
    image::load_from_memory(bytes).map_err(Error::Decode)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocessor
{
    pub input_size: u32,
    pub resample: Resample,
    /// Multiplier applied to the raw 0-255 channel values.
    /// The model was trained on unscaled pixels, so this is 1.0 unless the artifact changes.
    pub pixel_scale: f32,
}

impl Default for Preprocessor
{
    fn default() -> Self
    {
        Preprocessor { input_size: IMAGE_INPUT_SIZE, resample: Resample::default(), pixel_scale: 1.0 }
    }
}

impl Preprocessor
{
    /// The (batch, height, width, channels) shape of a prepared single image.
    pub fn tensor_shape(&self) -> [usize; 4]
    {
        let size = self.input_size as usize;
        [1, size, size, CHANNELS]
    }

    /// Resizes to exactly input_size x input_size, ignoring the aspect ratio.
    pub fn resize(&self, image: &DynamicImage) -> DynamicImage
    {
        image.resize_exact(self.input_size, self.input_size, self.resample.into())
    }

    /// Converts a resized image into a single-sample NHWC tensor.
    /// Grayscale and alpha images are converted to RGB so there are always 3 channels.
    pub fn to_tensor(&self, image: &DynamicImage) -> Array4<f32>
    {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut tensor = Array::zeros((1, height as usize, width as usize, CHANNELS));
        for (x, y, pixel) in rgb.enumerate_pixels()
        {
            let [r, g, b] = pixel.0;
            tensor[[0, y as usize, x as usize, 0]] = (r as f32) * self.pixel_scale;
            tensor[[0, y as usize, x as usize, 1]] = (g as f32) * self.pixel_scale;
            tensor[[0, y as usize, x as usize, 2]] = (b as f32) * self.pixel_scale;
        }
        tensor
    }

    /// Decodes, resizes and converts image bytes into the classifier input.
    /// Returns the tensor along with the dimensions of the source image.
    pub fn prepare(&self, bytes: &[u8]) -> Result<(Array4<f32>, (u32, u32)), Error>
    {
        let image = decode(bytes)?;
        let source_dimensions = (image.width(), image.height());
        let tensor = self.to_tensor(&self.resize(&image));

        // A wrong shape would not fail inside the classifier in every runtime; it would just
        // produce garbage, so check it here.
        let expected = self.tensor_shape();
        if tensor.shape() != &expected[..] {
            return Err(Error::TensorShape { expected, found: tensor.shape().to_vec() });
        }

        debug!("Prepared {:?} image as tensor of shape {:?}", source_dimensions, tensor.shape());
        Ok((tensor, source_dimensions))
    }
}
