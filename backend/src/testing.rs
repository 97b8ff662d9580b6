//! Fixtures shared by the unit and route tests.

use std::io::Cursor;
use std::sync::Mutex;

use actix_web::{web, App, HttpServer};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::error::PipelineError;
use crate::freshness::Classifier;
use crate::imaging::{Image, PreprocessedTensor};
use crate::ocr::{TextFragment, TextRecognizer};

/// Black and white 4px squares.
pub fn checkerboard(width: u32, height: u32) -> DynamicImage {
    let image = RgbImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    DynamicImage::ImageRgb8(image)
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

pub struct FixedClassifier(pub f32);

impl Classifier for FixedClassifier {
    fn predict(&self, _input: &PreprocessedTensor) -> Result<f32, PipelineError> {
        Ok(self.0)
    }
}

pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict(&self, _input: &PreprocessedTensor) -> Result<f32, PipelineError> {
        Err(PipelineError::Inference("simulated inference failure".into()))
    }
}

#[derive(Default)]
pub struct RecordingClassifier {
    shape: Mutex<Option<Vec<usize>>>,
}

impl RecordingClassifier {
    pub fn last_shape(&self) -> Option<Vec<usize>> {
        self.shape.lock().unwrap().clone()
    }
}

impl Classifier for RecordingClassifier {
    fn predict(&self, input: &PreprocessedTensor) -> Result<f32, PipelineError> {
        *self.shape.lock().unwrap() = Some(input.shape().to_vec());
        Ok(0.5)
    }
}

pub enum StaticRecognizer {
    Lines(Vec<String>),
    Failing(String),
}

impl StaticRecognizer {
    pub fn lines(lines: &[&str]) -> Self {
        StaticRecognizer::Lines(lines.iter().map(|l| l.to_string()).collect())
    }

    pub fn failing(reason: &str) -> Self {
        StaticRecognizer::Failing(reason.to_string())
    }
}

impl TextRecognizer for StaticRecognizer {
    fn recognize(&self, _image: &Image) -> Result<Vec<TextFragment>, PipelineError> {
        match self {
            StaticRecognizer::Lines(lines) => Ok(lines
                .iter()
                .enumerate()
                .map(|(i, text)| TextFragment {
                    text: text.clone(),
                    bbox: (0, i as u32 * 20, 100, 18),
                    confidence: 0.9,
                })
                .collect()),
            StaticRecognizer::Failing(reason) => Err(PipelineError::Inference(reason.clone())),
        }
    }
}

/// Starts a throw-away HTTP server on an ephemeral port and returns its base URL.
pub fn spawn_stub_server(configure: fn(&mut web::ServiceConfig)) -> String {
    let server = HttpServer::new(move || App::new().configure(configure))
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}
