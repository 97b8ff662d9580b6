//! Text recognition over decoded images.
//!
//! The recognizer itself is an external engine; this module only defines the
//! contract the expiry pipeline relies on and turns fragments into one string.

pub mod handler;
pub mod tesseract;

use serde::Serialize;

use crate::error::PipelineError;
use crate::imaging::Image;

pub use handler::OcrHandler;
pub use tesseract::TesseractRecognizer;

/// `(left, top, width, height)` in pixels.
pub type BoundingBox = (u32, u32, u32, u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFragment {
    pub text: String,
    pub bbox: BoundingBox,
    /// 0.0 to 1.0
    pub confidence: f32,
}

pub trait TextRecognizer: Send + Sync {
    /// Fragments in the engine's reading order.
    fn recognize(&self, image: &Image) -> Result<Vec<TextFragment>, PipelineError>;
}
