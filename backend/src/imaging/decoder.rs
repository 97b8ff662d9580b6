use std::io::Cursor;
use std::path::PathBuf;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use image::{DynamicImage, ImageReader, RgbImage};

use crate::error::PipelineError;

/// Accepts payloads with or without trailing `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Everything the pipelines know how to turn into an [`Image`].
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bitmap(DynamicImage),
    Bytes(Vec<u8>),
    Base64(String),
}

/// Canonical decoded image: always 8-bit RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pixels: RgbImage,
}

impl Image {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.into_rgb8(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    /// Re-encodes the pixels as PNG, for engines that only accept files.
    pub fn to_png(&self) -> Result<Vec<u8>, PipelineError> {
        let mut buffer = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buffer, image::ImageFormat::Png)
            .map_err(|e| PipelineError::Decode(format!("PNG encoding failed: {}", e)))?;
        Ok(buffer.into_inner())
    }
}

pub fn decode(source: ImageSource) -> Result<Image, PipelineError> {
    match source {
        ImageSource::Path(path) => {
            let image = ImageReader::open(&path)?.with_guessed_format()?.decode()?;
            Ok(Image::from_dynamic(image))
        }
        ImageSource::Bitmap(image) => Ok(Image::from_dynamic(image)),
        ImageSource::Bytes(bytes) => decode_bytes(&bytes),
        ImageSource::Base64(payload) => decode_base64(&payload),
    }
}

/// Drops a data-URI header such as `data:image/png;base64,`. Only the
/// segment after the first comma is kept.
pub fn strip_data_uri(payload: &str) -> &str {
    payload.split(',').nth(1).unwrap_or(payload)
}

fn decode_bytes(bytes: &[u8]) -> Result<Image, PipelineError> {
    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    Ok(Image::from_dynamic(image))
}

fn decode_base64(payload: &str) -> Result<Image, PipelineError> {
    let data: String = strip_data_uri(payload)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = LENIENT_BASE64.decode(data.as_bytes()).map_err(|e| {
        PipelineError::Decode(format!("Error processing base64 image: {}", e))
    })?;

    decode_bytes(&bytes).map_err(|e| match e {
        PipelineError::Decode(msg) => {
            PipelineError::Decode(format!("Error processing base64 image: {}", msg))
        }
        other => other,
    })
}
