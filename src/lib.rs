//! pixelrelay - Resilient Image Generation for Chat Bots
//!
//! Chat-bot backend that forwards prompts to an image generation API and
//! keeps a small index of user uploads for keyword recall.
//!
//! ## Core Features
//!
//! - **Prompt Normalization**: descriptor injection, abbreviation and
//!   misspelling rewrites, default style
//! - **Rate Budget**: process-wide window counter consulted before every call
//! - **Provider Fallback**: ordered model list with retry and exponential backoff
//! - **Schema-tolerant Extraction**: declarative fallback paths for the result URL
//! - **File Recall**: SQLite index with connection pooling
//!
//! ## Quick Start
//!
//! ```ignore
//! use pixelrelay::{ConfigLoader, GenerationService, RateBudget, render};
//!
//! let config = ConfigLoader::load()?;
//! let budget = Arc::new(RateBudget::from_config(&config.rate_limit));
//! let service = GenerationService::from_config(&config, budget)?;
//! let outcome = service.handle_generation_request("a cute cat").await;
//! println!("{}", render(&outcome));
//! ```
//!
//! ## Modules
//!
//! - [`generation`]: prompt normalizer, rate budget, dispatcher, extractor, reporter
//! - [`storage`]: SQLite file index and on-disk file store
//! - [`chat`]: platform-neutral command router
//! - [`config`]: layered configuration

pub mod chat;
pub mod cli;
pub mod config;
pub mod constants;
pub mod generation;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{AttemptFailure, NetworkErrorKind, RelayError, Result, ResultExt};

// Storage
pub use storage::{Database, FileIndex, FileRecord, FileStore, PoolConfig, SharedDatabase};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use generation::{
    Dispatcher, GenerationOutcome, GenerationService, HttpImageClient, ImageClient, RateBudget,
    SharedRateBudget, normalize, render,
};

pub use chat::{BotIdentity, ChatHandler, ChatMessage, Command, Reply};
