use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Plain environment variable consulted when no key is configured.
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .finish()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            request_timeout_secs: default_request_timeout(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_image_bytes() -> u64 {
    20 * 1024 * 1024 // inline payload limit
}

fn default_output_root() -> PathBuf {
    PathBuf::from("sorted_documents")
}

fn default_debounce_ms() -> u64 {
    2000
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("docsort").required(false));
        }

        // Environment variable overrides with DOCSORT_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("DOCSORT")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;

        Ok(config.with_fallback_api_key(std::env::var(API_KEY_ENV).ok()))
    }

    /// Fill in the API key from `fallback` when none was configured.
    pub fn with_fallback_api_key(mut self, fallback: Option<String>) -> Self {
        let configured = self
            .classifier
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !configured {
            self.classifier.api_key = fallback.filter(|k| !k.trim().is_empty());
        }
        self
    }

    /// The classifier credential, or a setup error when none is available.
    pub fn api_key(&self) -> Result<&str> {
        self.classifier
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Setup(format!(
                    "no API credential found; set classifier.api_key, DOCSORT__CLASSIFIER__API_KEY or {API_KEY_ENV}"
                ))
            })
    }
}
