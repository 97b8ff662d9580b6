pub mod date_service;
pub mod fallback;

use crate::config::DateServiceConfig;
use crate::error::PipelineError;

pub use date_service::DateService;
pub use fallback::{extract_date, NO_DATE_FOUND};

/// Service first, regex second. Always yields a string.
#[derive(Clone)]
pub struct DateExtractor {
    service: Option<DateService>,
}

impl DateExtractor {
    pub fn from_config(config: &DateServiceConfig) -> Result<Self, PipelineError> {
        let service = match config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(DateService::new(config, key.trim())?),
            _ => {
                log::warn!("No date service API key configured; using pattern matching only");
                None
            }
        };
        Ok(Self { service })
    }

    pub fn fallback_only() -> Self {
        Self { service: None }
    }

    pub async fn extract(&self, extracted_text: &str) -> String {
        if let Some(service) = &self.service {
            match service.request_expiry_date(extracted_text).await {
                Ok(date) => {
                    log::info!("Date service response: {}", date.trim());
                    return date;
                }
                Err(e) => log::warn!("Falling back to pattern matching: {}", e),
            }
        }
        extract_date(extracted_text)
    }
}
