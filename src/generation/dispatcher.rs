//! Provider Dispatcher
//!
//! Walks the configured model list first to last, retrying transient failures
//! against the same model with exponential backoff before falling back to the
//! next one.
//!
//! ## Strategy
//!
//! 1. Consult the rate budget before every attempt; a denial ends the request
//! 2. Issue the request, bounded by the per-attempt timeout
//! 3. Network failure or retryable status: back off and retry the same model
//! 4. Other failures (including a 200 without a usable URL): next model
//! 5. First usable URL wins; later models are never contacted
//!
//! The cancellation token is raced against every request and every backoff
//! sleep, so a cancelled request never waits out a delay.

use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::{GenerationRequest, ReplyBody, SharedImageClient};
use super::extract::{Extraction, extract};
use super::outcome::GenerationOutcome;
use super::rate_limit::SharedRateBudget;
use crate::config::Config;
use crate::constants::{api as api_constants, dispatch as dispatch_constants};
use crate::types::{AttemptFailure, NetworkErrorKind, StatusClass, StatusClassifier};

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Model identifiers, tried in order
    pub providers: Vec<String>,
    /// Attempts per model
    pub max_retries: u8,
    /// First backoff delay; doubles after every wait
    pub backoff_base: Duration,
    /// Upper bound for a single request
    pub attempt_timeout: Duration,
    pub num_images: u32,
    pub size: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            providers: vec![api_constants::DEFAULT_MODEL.to_string()],
            max_retries: dispatch_constants::MAX_RETRIES,
            backoff_base: Duration::from_millis(dispatch_constants::BACKOFF_BASE_MS),
            attempt_timeout: Duration::from_secs(api_constants::REQUEST_TIMEOUT_SECS),
            num_images: api_constants::NUM_IMAGES,
            size: api_constants::IMAGE_SIZE.to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            providers: config.generation.providers.clone(),
            max_retries: config.generation.max_retries,
            backoff_base: Duration::from_millis(config.generation.backoff_base_ms),
            attempt_timeout: config.api.timeout(),
            num_images: config.api.num_images,
            size: config.api.image_size.clone(),
        }
    }
}

/// One attempt against one model
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub model: String,
    /// 1-based, per model
    pub attempt: u8,
    /// Backoff delay in force when the attempt was made
    pub backoff: Duration,
    pub error: Option<AttemptFailure>,
    pub duration_ms: u64,
}

/// Execution statistics for one dispatch
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub total_attempts: usize,
    pub attempts: Vec<AttemptRecord>,
    /// Backoff sleeps actually taken, in order
    pub waits: Vec<Duration>,
    pub successful_model: Option<String>,
    pub total_duration_ms: u64,
}

impl DispatchStats {
    pub fn attempts_for(&self, model: &str) -> usize {
        self.attempts.iter().filter(|a| a.model == model).count()
    }
}

/// Delays between consecutive attempts against one model: `base, 2*base, ...`
pub fn backoff_schedule(base: Duration, max_retries: u8) -> Vec<Duration> {
    (0..max_retries.saturating_sub(1))
        .map(|i| base.saturating_mul(2u32.saturating_pow(i as u32)))
        .collect()
}

/// Fallback dispatcher over an ordered model list
pub struct Dispatcher {
    client: SharedImageClient,
    budget: SharedRateBudget,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(client: SharedImageClient, budget: SharedRateBudget, config: DispatchConfig) -> Self {
        Self {
            client,
            budget,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run the request through the model list
    #[instrument(skip(self, prompt, cancel), fields(providers = self.config.providers.len(), client = self.client.name()))]
    pub async fn dispatch(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> (GenerationOutcome, DispatchStats) {
        let mut stats = DispatchStats::default();
        let start_time = Instant::now();
        let schedule = backoff_schedule(self.config.backoff_base, self.config.max_retries);

        let mut last_failure: Option<AttemptFailure> = None;

        for model in &self.config.providers {
            let request = GenerationRequest {
                model: model.clone(),
                prompt: prompt.to_string(),
                num_images: self.config.num_images,
                size: self.config.size.clone(),
            };

            for attempt in 1..=self.config.max_retries {
                if cancel.is_cancelled() {
                    return finish(stats, start_time, GenerationOutcome::Cancelled);
                }

                if !self.budget.try_acquire().is_allowed() {
                    warn!(model = %model, attempt, "Rate budget denied attempt, aborting request");
                    return finish(stats, start_time, GenerationOutcome::RateLimited);
                }

                let backoff = schedule
                    .get(usize::from(attempt) - 1)
                    .copied()
                    .unwrap_or(Duration::ZERO);

                stats.total_attempts += 1;
                let attempt_start = Instant::now();

                debug!(
                    total_attempt = stats.total_attempts,
                    model = %model,
                    attempt,
                    max_retries = self.config.max_retries,
                    "Dispatch attempt"
                );

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(model = %model, attempt, "Request cancelled during attempt");
                        return finish(stats, start_time, GenerationOutcome::Cancelled);
                    }
                    result = timeout(self.config.attempt_timeout, self.client.submit(&request)) => result,
                };

                let failure = match result {
                    Err(_) => AttemptFailure::Network {
                        kind: NetworkErrorKind::Timeout,
                        detail: format!("no response within {:?}", self.config.attempt_timeout),
                    },
                    Ok(Err(transport)) => AttemptFailure::Network {
                        kind: transport.kind,
                        detail: transport.detail,
                    },
                    Ok(Ok(reply)) => match StatusClassifier::classify(reply.status) {
                        StatusClass::Success => match &reply.body {
                            ReplyBody::Json(body) => match extract(body) {
                                Extraction::Found { url, path } => {
                                    stats.attempts.push(AttemptRecord {
                                        model: model.clone(),
                                        attempt,
                                        backoff,
                                        error: None,
                                        duration_ms: attempt_start.elapsed().as_millis() as u64,
                                    });
                                    stats.successful_model = Some(model.clone());

                                    info!(
                                        model = %model,
                                        attempts = stats.total_attempts,
                                        path,
                                        "Generation succeeded"
                                    );

                                    let outcome = GenerationOutcome::Success {
                                        url,
                                        model: model.clone(),
                                    };
                                    return finish(stats, start_time, outcome);
                                }
                                Extraction::ProviderReported(detail) => {
                                    AttemptFailure::Reported { detail }
                                }
                                Extraction::NotFound => AttemptFailure::Malformed {
                                    status: reply.status,
                                    detail: "no usable image URL in response".to_string(),
                                },
                            },
                            ReplyBody::Malformed(detail) => AttemptFailure::Malformed {
                                status: reply.status,
                                detail: detail.clone(),
                            },
                        },
                        StatusClass::Retryable | StatusClass::Fatal => AttemptFailure::Status {
                            status: reply.status,
                            detail: reply.detail(),
                        },
                    },
                };

                stats.attempts.push(AttemptRecord {
                    model: model.clone(),
                    attempt,
                    backoff,
                    error: Some(failure.clone()),
                    duration_ms: attempt_start.elapsed().as_millis() as u64,
                });

                warn!(
                    model = %model,
                    attempt,
                    status = failure.status(),
                    error = %failure,
                    "Provider attempt failed"
                );

                let retry = failure.is_retryable() && attempt < self.config.max_retries;
                last_failure = Some(failure);

                if !retry {
                    info!(model = %model, "Moving to next provider");
                    break;
                }

                debug!(delay_ms = backoff.as_millis() as u64, "Retrying after backoff");
                stats.waits.push(backoff);

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(model = %model, "Request cancelled during backoff");
                        return finish(stats, start_time, GenerationOutcome::Cancelled);
                    }
                    _ = sleep(backoff) => {}
                }
            }
        }

        // A single model had nothing to fall back to; report its own failure
        let outcome = match (self.config.providers.len(), last_failure) {
            (1, Some(failure)) => GenerationOutcome::from(failure),
            (_, last_error) => GenerationOutcome::Exhausted { last_error },
        };

        warn!(
            attempts = stats.total_attempts,
            outcome = outcome.label(),
            "All providers failed"
        );

        finish(stats, start_time, outcome)
    }
}

fn finish(
    mut stats: DispatchStats,
    start_time: Instant,
    outcome: GenerationOutcome,
) -> (GenerationOutcome, DispatchStats) {
    stats.total_duration_ms = start_time.elapsed().as_millis() as u64;
    (outcome, stats)
}
