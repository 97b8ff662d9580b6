use std::io::Write;
use std::process::{Command, Stdio};

use super::{BoundingBox, TextFragment, TextRecognizer};
use crate::config::OcrConfig;
use crate::error::PipelineError;
use crate::imaging::Image;

/// Tesseract TSV row level for individual words.
const WORD_LEVEL: &str = "5";

/// Runs the `tesseract` CLI, feeding PNG on stdin and reading a TSV report.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: String,
    language: String,
}

impl TesseractRecognizer {
    /// Probes the binary once so a missing engine fails at startup.
    pub fn load(config: &OcrConfig) -> Result<Self, PipelineError> {
        let output = Command::new(&config.tesseract_bin)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                PipelineError::Inference(format!(
                    "failed to run {}: {}",
                    config.tesseract_bin, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Inference(format!(
                "{} --version failed: {}",
                config.tesseract_bin,
                stderr.trim()
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        let version = String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        log::info!("Using {} for OCR (lang: {})", version, config.language);

        Ok(Self {
            binary: config.tesseract_bin.clone(),
            language: config.language.clone(),
        })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &Image) -> Result<Vec<TextFragment>, PipelineError> {
        let png = image.to_png()?;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language, "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::Inference(format!("failed to spawn tesseract: {}", e)))?;

        let fed = match child.stdin.take() {
            Some(mut stdin) => stdin
                .write_all(&png)
                .map_err(|e| PipelineError::Inference(format!("failed to feed tesseract: {}", e))),
            None => Err(PipelineError::Inference("failed to get tesseract stdin".into())),
        };
        if let Err(e) = fed {
            child.kill().ok();
            child.wait().ok();
            return Err(e);
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Inference(format!(
                "tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Groups word rows into one fragment per text line.
pub fn parse_tsv(report: &str) -> Vec<TextFragment> {
    let mut fragments: Vec<TextFragment> = Vec::new();
    let mut current_line: Option<[&str; 4]> = None;
    let mut confidences: Vec<f32> = Vec::new();

    for row in report.lines().skip(1) {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 || columns[0] != WORD_LEVEL {
            continue;
        }
        let text = columns[11].trim();
        if text.is_empty() {
            continue;
        }

        let parse = |i: usize| columns[i].trim().parse::<u32>().unwrap_or(0);
        let bbox = (parse(6), parse(7), parse(8), parse(9));
        let confidence = columns[10].trim().parse::<f32>().unwrap_or(0.0).max(0.0) / 100.0;
        let line_key = [columns[1], columns[2], columns[3], columns[4]];

        match fragments.last_mut() {
            Some(fragment) if current_line == Some(line_key) => {
                fragment.text.push(' ');
                fragment.text.push_str(text);
                fragment.bbox = union(fragment.bbox, bbox);
                confidences.push(confidence);
                fragment.confidence = mean(&confidences);
            }
            _ => {
                current_line = Some(line_key);
                confidences.clear();
                confidences.push(confidence);
                fragments.push(TextFragment {
                    text: text.to_string(),
                    bbox,
                    confidence,
                });
            }
        }
    }

    fragments
}

fn union(a: BoundingBox, b: BoundingBox) -> BoundingBox {
    let left = a.0.min(b.0);
    let top = a.1.min(b.1);
    let right = (a.0 + a.2).max(b.0 + b.2);
    let bottom = (a.1 + a.3).max(b.1 + b.3);
    (left, top, right - left, bottom - top)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
