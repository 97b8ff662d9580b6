use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::DateServiceConfig;
use crate::error::PipelineError;

const INSTRUCTION: &str = "Extract only the expiry date from the ocr extracted text.";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Client for the generative-language `generateContent` endpoint.
#[derive(Clone)]
pub struct DateService {
    http_client: HttpClient,
    endpoint: Url,
}

impl DateService {
    pub fn new(config: &DateServiceConfig, api_key: &str) -> Result<Self, PipelineError> {
        let mut endpoint = Url::parse(&format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        ))
        .map_err(|e| PipelineError::ServiceUnavailable(format!("invalid endpoint: {}", e)))?;
        endpoint.query_pairs_mut().append_pair("key", api_key);

        let timeout = Duration::try_from_secs_f64(config.timeout_secs).map_err(|e| {
            PipelineError::ServiceUnavailable(format!(
                "invalid timeout {}: {}",
                config.timeout_secs, e
            ))
        })?;
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::ServiceUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    /// Asks the model to isolate the expiry date. The completion is returned verbatim.
    pub async fn request_expiry_date(&self, extracted_text: &str) -> Result<String, PipelineError> {
        let prompt = format!("{}. {}", extracted_text, INSTRUCTION);
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PipelineError::ServiceUnavailable(format!(
                "date service returned {}",
                status
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(e.without_url().to_string()))?;

        match body.first_text() {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(PipelineError::ServiceUnavailable(
                "date service returned no completion".into(),
            )),
        }
    }
}
