use std::sync::Arc;

use super::TextRecognizer;
use crate::imaging::{self, ImageSource};

pub const NO_TEXT_DETECTED: &str = "No text detected in the image.";

#[derive(Clone)]
pub struct OcrHandler {
    recognizer: Arc<dyn TextRecognizer>,
}

impl OcrHandler {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Newline-joined fragment text. Failures come back as a message, never an error.
    pub fn extract_text(&self, source: ImageSource) -> String {
        let fragments = imaging::decode(source).and_then(|image| self.recognizer.recognize(&image));

        match fragments {
            Ok(fragments) if fragments.is_empty() => NO_TEXT_DETECTED.to_string(),
            Ok(fragments) => {
                log::debug!("OCR produced {} fragments", fragments.len());
                fragments
                    .iter()
                    .map(|fragment| fragment.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Err(e) => {
                log::warn!("OCR failed: {}", e);
                format!("Failed to process the image: {}", e)
            }
        }
    }
}
