use thiserror::Error;

/// Failure of a single agent invocation. Absorbed by the orchestrator.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent command error: {0}")]
    Command(String),

    #[error("Agent response parse error: {0}")]
    Parse(String),

    #[error("Agent timed out after {0} ms")]
    Timeout(u64),

    #[error("Malformed agent response: {0}")]
    Malformed(String),

    #[error("Reference store error: {0}")]
    Reference(#[from] repurpose_reference::ReferenceError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level failure. Only cancellation ends a request without a report.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(#[from] repurpose_models::ConfigError),
}
