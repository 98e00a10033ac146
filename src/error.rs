//! Error taxonomy for upstream calls and pipeline operations.
//!
//! Every failure mode degrades to a user-visible message; nothing here is
//! fatal to the process. [`PipelineError::is_retryable`] is the predicate
//! the shared [`RetryPolicy`](crate::retry::RetryPolicy) uses to decide
//! whether an attempt should be repeated.

/// Classified failure from an upstream call or a pipeline step.
#[derive(Debug)]
pub enum PipelineError {
    /// HTTP 429 from a hosted API. Retried with a fixed delay.
    RateLimited(String),
    /// Network failure or 5xx server error. Retried.
    Transient(String),
    /// Non-retryable upstream error (4xx other than 429, malformed response).
    Upstream(String),
    /// Caller-side validation failure (e.g. mismatched batch lengths).
    Validation(String),
    /// An operation was requested before its prerequisite exists
    /// (e.g. a question asked before any document was indexed).
    MissingPrecondition(String),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited(_) | PipelineError::Transient(_)
        )
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            PipelineError::Transient(msg) => write!(f, "transient error: {}", msg),
            PipelineError::Upstream(msg) => write!(f, "upstream error: {}", msg),
            PipelineError::Validation(msg) => write!(f, "validation error: {}", msg),
            PipelineError::MissingPrecondition(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
