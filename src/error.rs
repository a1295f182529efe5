use thiserror::Error;

/// Failure of a single transport-level call, after the retry policy has run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out after {}", timeout_display(.timeout_ms))]
    Timeout { timeout_ms: u64 },
    #[error("rate limited by the API, gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },
    #[error("response body is not valid JSON: {0}")]
    MalformedBody(String),
}

impl TransportError {
    /// Whether the retry policy would try again after this failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::RateLimited { .. } | TransportError::NetworkError(_)
        )
    }
}

/// A structurally valid response that does not carry a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("received empty response: {detail}")]
    EmptyResponse { detail: String },
    #[error("{}", no_image_message(.text))]
    NoImageFound { text: Option<String> },
    #[error("output too long: the response was truncated at the output-token limit")]
    TruncatedResponse,
    #[error("unexpected response shape: {0}")]
    MalformedResponse(String),
}

fn timeout_display(timeout_ms: &u64) -> String {
    if *timeout_ms >= 1000 && timeout_ms % 1000 == 0 {
        format!("{}s", timeout_ms / 1000)
    } else {
        format!("{}ms", timeout_ms)
    }
}

fn no_image_message(text: &Option<String>) -> String {
    match text {
        Some(text) => format!("no image returned: {}", text),
        None => "no image returned".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("all {requested} generations failed: {message}")]
    BatchFailed { requested: usize, message: String },
}

impl GeminiError {
    /// Configuration problems need the user to act before anything can succeed.
    pub fn is_config(&self) -> bool {
        matches!(self, GeminiError::ConfigError(_))
    }
}

impl From<serde_json::Error> for GeminiError {
    fn from(e: serde_json::Error) -> Self {
        GeminiError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeminiError>;
