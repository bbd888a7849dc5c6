//! Image Generation Pipeline
//!
//! raw prompt → [`prompt::normalize`] → [`Dispatcher`] (rate budget consulted
//! before each attempt) → [`ImageClient`] → [`extract::extract`] on HTTP 200
//! → [`GenerationOutcome`] → [`report::render`].

pub mod client;
pub mod dispatcher;
pub mod extract;
pub mod outcome;
pub mod prompt;
pub mod rate_limit;
pub mod report;
pub mod service;

pub use client::{
    GenerationRequest, HttpImageClient, ImageClient, ProviderReply, ReplyBody, SharedImageClient,
    TransportError,
};
pub use dispatcher::{AttemptRecord, DispatchConfig, DispatchStats, Dispatcher, backoff_schedule};
pub use extract::{Extraction, JsonPath, PathSegment};
pub use outcome::GenerationOutcome;
pub use prompt::normalize;
pub use rate_limit::{Acquire, Clock, RateBudget, RateBudgetStats, SharedRateBudget, SystemClock};
pub use report::render;
pub use service::GenerationService;
