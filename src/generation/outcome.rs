//! Terminal result of one generation request

use crate::types::{AttemptFailure, NetworkErrorKind};

/// Exactly one per request, consumed once by the reporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success {
        /// Image URL exactly as the provider returned it
        url: String,
        model: String,
    },
    /// Provider answered with an error status, or 200 with an error in the body
    ProviderError {
        status: u16,
        detail: String,
    },
    NetworkError {
        kind: NetworkErrorKind,
        detail: String,
    },
    /// Provider answered 200 but no usable result could be read
    MalformedResponse {
        detail: String,
    },
    /// Rate budget denied an outbound attempt
    RateLimited,
    /// Every provider failed
    Exhausted {
        last_error: Option<AttemptFailure>,
    },
    Cancelled,
    EmptyPrompt,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Success { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Short machine-friendly label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::ProviderError { .. } => "provider_error",
            Self::NetworkError { .. } => "network_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::RateLimited => "rate_limited",
            Self::Exhausted { .. } => "exhausted",
            Self::Cancelled => "cancelled",
            Self::EmptyPrompt => "empty_prompt",
        }
    }
}

impl From<AttemptFailure> for GenerationOutcome {
    fn from(failure: AttemptFailure) -> Self {
        match failure {
            AttemptFailure::Status { status, detail } => Self::ProviderError { status, detail },
            AttemptFailure::Network { kind, detail } => Self::NetworkError { kind, detail },
            AttemptFailure::Malformed { detail, .. } => Self::MalformedResponse { detail },
            AttemptFailure::Reported { detail } => Self::ProviderError {
                status: 200,
                detail,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_attempt_failure() {
        let outcome: GenerationOutcome = AttemptFailure::Status {
            status: 401,
            detail: "bad key".into(),
        }
        .into();
        assert_eq!(
            outcome,
            GenerationOutcome::ProviderError {
                status: 401,
                detail: "bad key".into()
            }
        );

        let outcome: GenerationOutcome = AttemptFailure::Network {
            kind: NetworkErrorKind::Timeout,
            detail: "elapsed".into(),
        }
        .into();
        assert_eq!(outcome.label(), "network_error");

        let outcome: GenerationOutcome = AttemptFailure::Malformed {
            status: 200,
            detail: "no url".into(),
        }
        .into();
        assert_eq!(
            outcome,
            GenerationOutcome::MalformedResponse {
                detail: "no url".into()
            }
        );

        let outcome: GenerationOutcome = AttemptFailure::Reported {
            detail: "nsfw".into(),
        }
        .into();
        assert!(matches!(
            outcome,
            GenerationOutcome::ProviderError { status: 200, .. }
        ));
    }

    #[test]
    fn test_success_accessors() {
        let outcome = GenerationOutcome::Success {
            url: "https://x/y.png".into(),
            model: "m".into(),
        };
        assert!(outcome.is_success());
        assert_eq!(outcome.url(), Some("https://x/y.png"));
        assert_eq!(GenerationOutcome::RateLimited.url(), None);
    }
}
