//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/pixelrelay/) and project (.pixelrelay/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{api, dispatch, rate_limit, storage};
use crate::types::{RelayError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Image generation API settings
    pub api: ApiConfig,

    /// Provider dispatch settings
    pub generation: GenerationConfig,

    /// Outbound rate budget
    pub rate_limit: RateLimitConfig,

    /// File index and upload storage
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            api: ApiConfig::default(),
            generation: GenerationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `RelayError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        let endpoint = url::Url::parse(&self.api.endpoint).map_err(|e| {
            RelayError::Config(format!(
                "api.endpoint is not a valid URL ({}): {}",
                self.api.endpoint, e
            ))
        })?;
        if endpoint.host().is_none() {
            return Err(RelayError::Config(format!(
                "api.endpoint must include a host, got {}",
                self.api.endpoint
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(RelayError::Config(
                "api.timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.api.num_images == 0 {
            return Err(RelayError::Config(
                "api.num_images must be greater than 0".to_string(),
            ));
        }

        if self.generation.providers.is_empty() {
            return Err(RelayError::Config(
                "generation.providers must list at least one model".to_string(),
            ));
        }

        if let Some(blank) = self
            .generation
            .providers
            .iter()
            .position(|p| p.trim().is_empty())
        {
            return Err(RelayError::Config(format!(
                "generation.providers[{}] is blank",
                blank
            )));
        }

        if self.generation.max_retries == 0 {
            return Err(RelayError::Config(
                "generation.max_retries must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.limit == 0 || self.rate_limit.window_secs == 0 {
            return Err(RelayError::Config(
                "rate_limit.limit and rate_limit.window_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// API Configuration
// =============================================================================

/// Image generation endpoint settings
///
/// The API key is never serialized and is redacted in debug output.
/// It is converted to a `SecretString` when the HTTP client is built.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Full URL of the generation endpoint
    pub endpoint: String,

    /// Bearer token (falls back to OPENROUTER_API_KEY)
    #[serde(skip_serializing)]
    pub key: Option<String>,

    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,

    /// Requested image size
    pub image_size: String,

    /// Images requested per call
    pub num_images: u32,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("image_size", &self.image_size)
            .field("num_images", &self.num_images)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: api::DEFAULT_ENDPOINT.to_string(),
            key: None,
            timeout_secs: api::REQUEST_TIMEOUT_SECS,
            image_size: api::IMAGE_SIZE.to_string(),
            num_images: api::NUM_IMAGES,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Generation Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model identifiers, tried first to last on every request
    pub providers: Vec<String>,

    /// Attempts per provider
    pub max_retries: u8,

    /// First backoff delay in milliseconds
    pub backoff_base_ms: u64,

    /// Optional deadline for a whole request across all providers
    pub request_deadline_secs: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            providers: vec![api::DEFAULT_MODEL.to_string()],
            max_retries: dispatch::MAX_RETRIES,
            backoff_base_ms: dispatch::BACKOFF_BASE_MS,
            request_deadline_secs: None,
        }
    }
}

// =============================================================================
// Rate Limit Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Outbound calls allowed per window
    pub limit: u32,

    /// Window length in seconds
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: rate_limit::LIMIT,
            window_secs: rate_limit::WINDOW_SECS,
        }
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file index
    pub database_path: PathBuf,

    /// Directory uploaded files are written to
    pub file_dir: PathBuf,

    /// Maximum files returned by a recall
    pub recall_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(storage::DATA_DIR);
        Self {
            database_path: data_dir.join(storage::DATABASE_FILE),
            file_dir: data_dir.join(storage::FILE_DIR),
            recall_limit: crate::constants::chat::RECALL_LIMIT,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.image_size, "1024x1024");
        assert_eq!(config.generation.max_retries, 3);
        assert_eq!(config.rate_limit.limit, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_providers() {
        let mut config = Config::default();
        config.generation.providers.clear();
        assert!(matches!(config.validate(), Err(RelayError::Config(_))));

        config.generation.providers = vec!["model-a".into(), "  ".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("providers[1]"));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.api.endpoint = "not a url".into();
        assert!(config.validate().is_err());

        config.api.endpoint = "mailto:someone@example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.rate_limit.limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generation.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.api.key = Some("sk-secret".into());

        let debug = format!("{:?}", config.api);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
