use image::imageops::{self, FilterType};
use ndarray::Array4;

use super::Image;
use crate::error::PipelineError;

pub const DEFAULT_TARGET_SIZE: (u32, u32) = (150, 150);

/// NHWC batch of one, values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct PreprocessedTensor {
    data: Array4<f32>,
}

impl PreprocessedTensor {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SIZE)
    }
}

impl Preprocessor {
    pub fn new((width, height): (u32, u32)) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Nearest,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Stretches to the target size and rescales channels by 1/255.
    pub fn preprocess(&self, image: &Image) -> Result<PreprocessedTensor, PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::Inference(format!(
                "invalid target size {}x{}",
                self.width, self.height
            )));
        }
        let resized = imageops::resize(image.as_rgb(), self.width, self.height, self.filter);
        let values: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect();

        let data = Array4::from_shape_vec(
            (1, self.height as usize, self.width as usize, 3),
            values,
        )
        .map_err(|e| PipelineError::Inference(format!("tensor shape mismatch: {}", e)))?;

        Ok(PreprocessedTensor { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::checkerboard;
    use image::{DynamicImage, Rgb, RgbImage};

    #[test]
    fn output_has_batch_axis_and_target_size() {
        let image = Image::from_dynamic(checkerboard(640, 480));
        let tensor = Preprocessor::default().preprocess(&image).unwrap();
        assert_eq!(tensor.shape(), &[1, 150, 150, 3]);
    }

    #[test]
    fn values_are_scaled_to_unit_range() {
        let image = Image::from_dynamic(checkerboard(300, 200));
        let tensor = Preprocessor::default().preprocess(&image).unwrap();
        let array = tensor.as_array();
        assert!(array.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(array.iter().any(|v| *v == 1.0));
        assert!(array.iter().any(|v| *v == 0.0));
    }

    #[test]
    fn channel_order_is_preserved() {
        let solid = RgbImage::from_pixel(10, 10, Rgb([255, 0, 51]));
        let image = Image::from_dynamic(DynamicImage::ImageRgb8(solid));
        let tensor = Preprocessor::new((4, 4)).preprocess(&image).unwrap();
        let array = tensor.as_array();
        assert_eq!(array[[0, 2, 3, 0]], 1.0);
        assert_eq!(array[[0, 2, 3, 1]], 0.0);
        assert!((array[[0, 2, 3, 2]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn zero_target_size_is_an_error() {
        let image = Image::from_dynamic(checkerboard(8, 8));
        assert!(matches!(
            Preprocessor::new((0, 150)).preprocess(&image),
            Err(PipelineError::Inference(_))
        ));
    }
}
