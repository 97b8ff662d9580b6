use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::{Client as HttpClient, Response};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::{ModelConfig, ModelSource};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Download from {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Base URLs of the supported model hosts.
#[derive(Debug, Clone)]
pub struct ModelHosts {
    pub huggingface: String,
    pub google_drive: String,
}

impl Default for ModelHosts {
    fn default() -> Self {
        Self {
            huggingface: "https://huggingface.co".to_string(),
            google_drive: "https://drive.google.com".to_string(),
        }
    }
}

pub async fn ensure_model(config: &ModelConfig, client: &HttpClient) -> Result<(), BootstrapError> {
    ensure_model_from(config, client, &ModelHosts::default()).await
}

/// Downloads the model artifact unless it is already on disk.
pub async fn ensure_model_from(
    config: &ModelConfig,
    client: &HttpClient,
    hosts: &ModelHosts,
) -> Result<(), BootstrapError> {
    if config.path.exists() {
        log::info!("Model already exists at {}", config.path.display());
        return Ok(());
    }

    match &config.source {
        ModelSource::Local => {
            log::warn!(
                "Model file {} not found and no download source configured. \
                 Set HUGGINGFACE_REPO or GOOGLE_DRIVE_FILE_ID",
                config.path.display()
            );
            Ok(())
        }
        ModelSource::HuggingFace { repo, filename } => {
            let url = huggingface_url(&hosts.huggingface, repo, filename)?;
            log::info!("Downloading model from Hugging Face ({})", repo);
            let response = fetch(client, url).await?;
            save_response(response, &config.path, config.sha256.as_deref()).await
        }
        ModelSource::GoogleDrive { file_id } => {
            log::info!("Downloading model from Google Drive");
            let response = fetch_google_drive(client, &hosts.google_drive, file_id).await?;
            save_response(response, &config.path, config.sha256.as_deref()).await
        }
    }
}

pub fn huggingface_url(base: &str, repo: &str, filename: &str) -> Result<Url, BootstrapError> {
    Ok(Url::parse(&format!(
        "{}/{}/resolve/main/{}",
        base.trim_end_matches('/'),
        repo.trim_matches('/'),
        filename
    ))?)
}

pub fn google_drive_url(
    base: &str,
    file_id: &str,
    confirm: Option<&str>,
) -> Result<Url, BootstrapError> {
    let mut url = Url::parse(&format!("{}/uc", base.trim_end_matches('/')))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("export", "download");
        if let Some(token) = confirm {
            query.append_pair("confirm", token);
        }
        query.append_pair("id", file_id);
    }
    Ok(url)
}

async fn fetch(client: &HttpClient, url: Url) -> Result<Response, BootstrapError> {
    let response = client.get(url.clone()).send().await?;
    if !response.status().is_success() {
        return Err(BootstrapError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

/// Large Drive files answer with a warning page and a `download_warning*`
/// cookie whose value must be echoed back as `confirm`.
async fn fetch_google_drive(
    client: &HttpClient,
    base: &str,
    file_id: &str,
) -> Result<Response, BootstrapError> {
    let response = fetch(client, google_drive_url(base, file_id, None)?).await?;

    let confirm = response
        .cookies()
        .find(|cookie| cookie.name().starts_with("download_warning"))
        .map(|cookie| cookie.value().to_string());

    match confirm {
        Some(token) => {
            log::debug!("Google Drive asked for download confirmation");
            fetch(client, google_drive_url(base, file_id, Some(&token))?).await
        }
        None => Ok(response),
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

async fn save_response(
    response: Response,
    path: &Path,
    expected_sha256: Option<&str>,
) -> Result<(), BootstrapError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let total = response.content_length();
    let part = partial_path(path);
    let mut file = tokio::fs::File::create(&part).await?;
    let mut hasher = Sha256::new();
    let mut written: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    if let Some(expected) = expected_sha256 {
        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            tokio::fs::remove_file(&part).await.ok();
            return Err(BootstrapError::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    tokio::fs::rename(&part, path).await?;
    match total {
        Some(total) => log::info!(
            "Model downloaded to {} ({}/{} bytes)",
            path.display(),
            written,
            total
        ),
        None => log::info!("Model downloaded to {} ({} bytes)", path.display(), written),
    }
    Ok(())
}
