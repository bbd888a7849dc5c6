//! Generation request entry point

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::client::{HttpImageClient, SharedImageClient};
use super::dispatcher::{DispatchConfig, Dispatcher};
use super::outcome::GenerationOutcome;
use super::prompt::normalize;
use super::rate_limit::SharedRateBudget;
use crate::config::Config;
use crate::types::{NetworkErrorKind, Result};

/// Normalizes prompts and hands them to the dispatcher
pub struct GenerationService {
    dispatcher: Dispatcher,
    deadline: Option<Duration>,
}

impl GenerationService {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            deadline: None,
        }
    }

    /// Bound a whole request, across all providers and backoff sleeps
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the HTTP-backed service. The budget is passed in so every
    /// service in the process shares one.
    pub fn from_config(config: &Config, budget: SharedRateBudget) -> Result<Self> {
        let client: SharedImageClient = Arc::new(HttpImageClient::new(&config.api)?);
        Ok(Self::with_client(config, client, budget))
    }

    pub fn with_client(config: &Config, client: SharedImageClient, budget: SharedRateBudget) -> Self {
        let dispatcher = Dispatcher::new(client, budget, DispatchConfig::from_config(config));
        let service = Self::new(dispatcher);
        match config.generation.request_deadline_secs {
            Some(secs) => service.with_deadline(Duration::from_secs(secs)),
            None => service,
        }
    }

    pub async fn handle_generation_request(&self, raw: &str) -> GenerationOutcome {
        self.handle_with_cancel(raw, &CancellationToken::new()).await
    }

    #[instrument(skip_all, fields(prompt_len = raw.len()))]
    pub async fn handle_with_cancel(&self, raw: &str, cancel: &CancellationToken) -> GenerationOutcome {
        if raw.trim().is_empty() {
            return GenerationOutcome::EmptyPrompt;
        }

        let prompt = normalize(raw);
        info!(prompt = %prompt, "Normalized prompt");

        let dispatch = self.dispatcher.dispatch(&prompt, cancel);
        let (outcome, stats) = match self.deadline {
            None => dispatch.await,
            Some(deadline) => match tokio::time::timeout(deadline, dispatch).await {
                Ok(result) => result,
                Err(_) => {
                    info!(deadline_ms = deadline.as_millis() as u64, "Request deadline exceeded");
                    return GenerationOutcome::NetworkError {
                        kind: NetworkErrorKind::Timeout,
                        detail: format!("request deadline of {:?} exceeded", deadline),
                    };
                }
            },
        };

        info!(
            outcome = outcome.label(),
            attempts = stats.total_attempts,
            duration_ms = stats.total_duration_ms,
            model = stats.successful_model.as_deref().unwrap_or("-"),
            "Generation request finished"
        );

        outcome
    }
}
