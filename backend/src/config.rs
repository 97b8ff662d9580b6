use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub ocr: OcrConfig,
    pub date_service: DateServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            static_dir: PathBuf::from("static"),
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Where the model artifact comes from when it is not on disk yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    Local,
    HuggingFace { repo: String, filename: String },
    GoogleDrive { file_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub source: ModelSource,
    /// Hex SHA-256 of the artifact, checked after download.
    pub sha256: Option<String>,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("food_expiry_model.pt"),
            source: ModelSource::Local,
            sha256: None,
            input_width: 150,
            input_height: 150,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_bin: String,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_bin: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateServiceConfig {
    pub endpoint: String,
    pub model: String,
    /// Only ever supplied through the environment or a private config file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: f64,
}

impl Default for DateServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash-latest".to_string(),
            api_key: None,
            timeout_secs: 10.0,
        }
    }
}

impl AppConfig {
    /// Defaults, then the YAML file named by `FRESHSCAN_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("FRESHSCAN_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = parse("PORT", &port)?;
        }
        if let Some(dir) = var("STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("UPLOAD_FOLDER") {
            self.server.upload_dir = PathBuf::from(dir);
        }
        if let Some(limit) = var("MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = parse("MAX_UPLOAD_BYTES", &limit)?;
        }

        if let Some(path) = var("MODEL_PATH") {
            self.model.path = PathBuf::from(path);
        }
        if let Some(digest) = var("MODEL_SHA256") {
            self.model.sha256 = Some(digest);
        }
        // Hugging Face wins when both are set.
        if let Some(repo) = var("HUGGINGFACE_REPO") {
            let filename = self
                .model
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.model.source = ModelSource::HuggingFace { repo, filename };
        } else if let Some(file_id) = var("GOOGLE_DRIVE_FILE_ID") {
            self.model.source = ModelSource::GoogleDrive { file_id };
        }

        if let Some(bin) = var("TESSERACT_BIN") {
            self.ocr.tesseract_bin = bin;
        }
        if let Some(lang) = var("OCR_LANG") {
            self.ocr.language = lang;
        }

        if let Some(key) = var("GEMINI_API_KEY") {
            self.date_service.api_key = Some(key);
        }
        if let Some(endpoint) = var("GEMINI_ENDPOINT") {
            self.date_service.endpoint = endpoint;
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.date_service.model = model;
        }
        if let Some(timeout) = var("DATE_SERVICE_TIMEOUT_SECS") {
            self.date_service.timeout_secs = parse("DATE_SERVICE_TIMEOUT_SECS", &timeout)?;
        }

        Ok(())
    }

    /// Checks values that either layer may have set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.input_width == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.input_width",
                value: self.model.input_width.to_string(),
            });
        }
        if self.model.input_height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.input_height",
                value: self.model.input_height.to_string(),
            });
        }
        if Duration::try_from_secs_f64(self.date_service.timeout_secs).is_err()
            || self.date_service.timeout_secs <= 0.0
        {
            return Err(ConfigError::InvalidValue {
                key: "date_service.timeout_secs",
                value: self.date_service.timeout_secs.to_string(),
            });
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.max_upload_bytes",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
