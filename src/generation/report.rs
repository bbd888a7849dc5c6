//! User-facing text for generation outcomes
//!
//! Purely presentational: every outcome maps to exactly one message and
//! nothing here feeds back into control flow.

use super::outcome::GenerationOutcome;
use crate::types::{AttemptFailure, NetworkErrorKind};

/// Render the message shown to the requester
pub fn render(outcome: &GenerationOutcome) -> String {
    match outcome {
        GenerationOutcome::Success { url, .. } => format!("🖼️ Generated Image: {}", url),
        GenerationOutcome::RateLimited => {
            "⏳ Too many image requests right now. Please wait a minute and try again.".to_string()
        }
        GenerationOutcome::ProviderError { status: 200, detail } => {
            format!("❌ API error: {}", detail)
        }
        GenerationOutcome::ProviderError { status, .. } => {
            format!("❌ API error: {} ({})", status, explain_status(*status))
        }
        GenerationOutcome::NetworkError { kind, .. } => explain_network(*kind).to_string(),
        GenerationOutcome::MalformedResponse { .. } => {
            "❌ Invalid response from image generation API. Please check logs.".to_string()
        }
        GenerationOutcome::Exhausted {
            last_error: Some(failure),
        } => format!(
            "❌ Failed to generate image with any model. Last error: {}",
            explain_failure(failure)
        ),
        GenerationOutcome::Exhausted { last_error: None } => {
            "❌ Failed to generate image. Please try again later.".to_string()
        }
        GenerationOutcome::Cancelled => "🚫 Image generation was cancelled.".to_string(),
        GenerationOutcome::EmptyPrompt => "🖼️ Provide a prompt!".to_string(),
    }
}

fn explain_status(status: u16) -> &'static str {
    match status {
        401 => "the API key was rejected",
        403 => "access to this model is forbidden",
        404 => "the model or endpoint was not found",
        429 => "the image service is rate limiting requests",
        500..=599 => "the image service is having problems",
        _ => "unexpected response from the image service",
    }
}

fn explain_network(kind: NetworkErrorKind) -> &'static str {
    match kind {
        NetworkErrorKind::Timeout => {
            "⌛ The image service took too long to respond. Please try again later."
        }
        NetworkErrorKind::Connection => {
            "❌ Could not reach the image service. Please try again later."
        }
    }
}

fn explain_failure(failure: &AttemptFailure) -> String {
    match failure {
        AttemptFailure::Status { status, .. } => {
            format!("HTTP {} ({})", status, explain_status(*status))
        }
        AttemptFailure::Network { kind, .. } => match kind {
            NetworkErrorKind::Timeout => "the request timed out".to_string(),
            NetworkErrorKind::Connection => "could not connect".to_string(),
        },
        AttemptFailure::Malformed { .. } => "the response contained no usable image".to_string(),
        AttemptFailure::Reported { detail } => format!("the provider said \"{}\"", detail),
    }
}
