//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Image generation API constants
pub mod api {
    /// Default image generation endpoint
    pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/generate";

    /// Default model tried when no provider list is configured
    pub const DEFAULT_MODEL: &str = "stabilityai/stable-diffusion-xl-base";

    /// Per-attempt request timeout (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Images requested per call
    pub const NUM_IMAGES: u32 = 1;

    /// Requested image dimensions
    pub const IMAGE_SIZE: &str = "1024x1024";

    /// Environment variable consulted when no key is configured
    pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
}

/// Provider dispatch constants
pub mod dispatch {
    /// Attempts per provider (first try included)
    pub const MAX_RETRIES: u8 = 3;

    /// First backoff delay (milliseconds), doubled after every wait
    pub const BACKOFF_BASE_MS: u64 = 1000;

    /// HTTP statuses worth retrying on the same provider
    pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
}

/// Outbound rate budget constants
pub mod rate_limit {
    /// Acquisitions allowed per window
    pub const LIMIT: u32 = 5;

    /// Window length (seconds)
    pub const WINDOW_SECS: u64 = 60;
}

/// Chat command constants
pub mod chat {
    /// Command prefix
    pub const PREFIX: &str = "!";

    /// Files returned by a recall
    pub const RECALL_LIMIT: usize = 5;
}

/// Storage constants
pub mod storage {
    /// Project data directory
    pub const DATA_DIR: &str = ".pixelrelay";

    /// File index database (relative to the data directory)
    pub const DATABASE_FILE: &str = "files.db";

    /// Uploaded file directory (relative to the data directory)
    pub const FILE_DIR: &str = "file_storage";
}
