use crate::{
    error::{GeminiError, Result},
    transport::RetryPolicy,
};
use std::env;
use std::time::Duration;

pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(200);
pub const DEFAULT_OPTIMIZE_TIMEOUT: Duration = Duration::from_secs(100);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);
pub const DEFAULT_INSTRUCTION_PREFIX: &str = "Please generate an image: ";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub image_timeout: Duration,
    pub optimize_timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub instruction_prefix: String,
}

/// Borrowed view of a validated base URL and API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            base_url: None,
            api_key: None,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            optimize_timeout: DEFAULT_OPTIMIZE_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            instruction_prefix: DEFAULT_INSTRUCTION_PREFIX.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let base_url = env::var("GEMINI_BASE_URL").ok();
        let api_key = env::var("GEMINI_API_KEY").ok();
        let image_timeout = env::var("GEMINI_IMAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_IMAGE_TIMEOUT);
        let optimize_timeout = env::var("GEMINI_OPTIMIZE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_OPTIMIZE_TIMEOUT);
        let max_attempts = env::var("GEMINI_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        GeminiConfig {
            base_url,
            api_key,
            image_timeout,
            optimize_timeout,
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeouts(mut self, image: Duration, optimize: Duration) -> Self {
        self.image_timeout = image;
        self.optimize_timeout = optimize;
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_instruction_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.instruction_prefix = prefix.into();
        self
    }

    /// Fails with a configuration error when either value is missing or blank.
    pub fn credentials(&self) -> Result<Credentials<'_>> {
        let base_url = self
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| GeminiError::ConfigError("API base URL is not configured".into()))?;
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| GeminiError::ConfigError("API key is not configured".into()))?;

        Ok(Credentials { base_url, api_key })
    }

    pub fn image_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.image_timeout, self.max_attempts).with_backoff_base(self.backoff_base)
    }

    pub fn optimize_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.optimize_timeout, self.max_attempts)
            .with_backoff_base(self.backoff_base)
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key.chars().collect(),
            _ => return "<unset>".to_string(),
        };
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{}", tail)
    }
}
