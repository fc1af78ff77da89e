use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-2-70b-chat-hf";
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.together.xyz/v1";

/// Main configuration structure for docqa
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub use_mock_data: bool,
    /// Unset leaves the transport default in place
    pub request_timeout_secs: Option<u64>,
    pub mock_delays: MockDelays,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            use_mock_data: true,
            request_timeout_secs: None,
            mock_delays: MockDelays::default(),
        }
    }
}

/// Artificial latency of the mock strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MockDelays {
    pub list_ms: u64,
    pub upload_ms: u64,
    pub ask_ms: u64,
}

impl Default for MockDelays {
    fn default() -> Self {
        Self {
            list_ms: 500,
            upload_ms: 1000,
            ask_ms: 2000,
        }
    }
}

impl MockDelays {
    pub fn none() -> Self {
        Self {
            list_ms: 0,
            upload_ms: 0,
            ask_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_COMPLETION_BASE_URL.to_string(),
        }
    }
}

impl CompletionConfig {
    /// A blank key counts as no key.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_bytes: u64,
    pub accepted_extensions: Vec<String>,
    pub tick_interval_ms: u64,
    pub tick_step: u8,
    pub tick_cap: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            accepted_extensions: vec!["txt".to_string()],
            tick_interval_ms: 200,
            tick_step: 10,
            tick_cap: 90,
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// Always returns a usable config.
    pub fn load() -> Self {
        for path in ["../.env", ".env"] {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                break;
            }
        }

        let config_path =
            env::var("DOCQA_CONFIG_PATH").unwrap_or_else(|_| "docqa.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => Self::from_yaml(&contents).unwrap_or_else(|e| {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }),
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_overrides(|key| env::var(key).ok());

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Backend overrides
        if let Some(url) = lookup("DOCQA_API_URL") {
            self.api.base_url = url;
        }
        // Mocking stays on unless explicitly "false"
        if let Some(flag) = lookup("DOCQA_USE_MOCK_DATA") {
            self.api.use_mock_data = flag != "false";
        }
        if let Some(timeout) = lookup("DOCQA_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.api.request_timeout_secs = Some(secs);
            }
        }

        // Completion overrides
        if let Some(key) = lookup("TOGETHER_API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Some(model) = lookup("TOGETHER_MODEL") {
            if !model.is_empty() {
                self.completion.model = model;
            }
        }
        if let Some(url) = lookup("TOGETHER_BASE_URL") {
            self.completion.base_url = url;
        }

        // Upload overrides
        if let Some(max) = lookup("DOCQA_MAX_FILE_BYTES") {
            if let Ok(bytes) = max.parse() {
                self.upload.max_file_bytes = bytes;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.api.use_mock_data && !self.api.base_url.starts_with("http") {
            return Err(format!(
                "api.base_url must be an http(s) URL, got {}",
                self.api.base_url
            )
            .into());
        }
        if self.completion.model.trim().is_empty() {
            return Err("completion.model cannot be empty".into());
        }
        if self.upload.max_file_bytes == 0 {
            return Err("upload.max_file_bytes cannot be 0".into());
        }
        if self.upload.tick_interval_ms == 0 {
            return Err("upload.tick_interval_ms cannot be 0".into());
        }
        if self.upload.tick_cap >= 100 {
            return Err("upload.tick_cap must stay below 100".into());
        }
        Ok(())
    }
}
