use crate::{
    config::GeminiConfig,
    error::Result,
    gemini::{request_builder::RequestBuilder, resolver},
    models::TEXT_OPTIMIZATION_MODEL,
    transport::Transport,
};
use std::sync::Arc;

/// Rewrites short user prompts into detailed image prompts with a text model.
#[derive(Clone)]
pub struct PromptClient {
    config: Arc<GeminiConfig>,
    transport: Transport,
}

impl PromptClient {
    pub fn new(config: Arc<GeminiConfig>, transport: Transport) -> Self {
        Self { config, transport }
    }

    pub async fn optimize(&self, prompt: &str) -> Result<String> {
        let credentials = self.config.credentials()?;
        let request = RequestBuilder::new(credentials).build_prompt_optimization(prompt)?;

        log::info!("Optimizing prompt with model: {}", TEXT_OPTIMIZATION_MODEL);
        log::debug!("Prompt optimization input: {}", prompt.trim());

        let body = self
            .transport
            .send(&request, &self.config.optimize_policy())
            .await?;
        let optimized = resolver::resolve_text(&body)?;

        log::debug!("Optimized prompt: {}", optimized);
        Ok(optimized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GeminiError, ResolutionError};
    use crate::transport::testing::{ok, Scripted, ScriptedSender};
    use serde_json::json;
    use std::time::Duration;

    fn client(sender: Arc<ScriptedSender>) -> PromptClient {
        let config = GeminiConfig::new()
            .with_base_url("https://api.example.test/")
            .with_api_key("key");
        PromptClient::new(Arc::new(config), Transport::new(sender))
    }

    #[tokio::test]
    async fn test_optimize_returns_trimmed_text() {
        let sender = ScriptedSender::new(vec![ok(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "\n A lone red fox in fresh snow, golden hour, cinematic lighting \n" }
            ] } }]
        }))]);
        let optimized = client(sender.clone()).optimize("fox in snow").await.unwrap();

        assert_eq!(
            optimized,
            "A lone red fox in fresh snow, golden hour, cinematic lighting"
        );
        let sent = &sender.requests()[0];
        assert_eq!(
            sent.endpoint,
            "https://api.example.test/v1beta/models/gemini-3-pro-preview:generateContent"
        );
        assert_eq!(sent.body["contents"][0]["parts"][0]["text"], "fox in snow");
        assert!(sent.body["systemInstruction"].is_object());
    }

    #[tokio::test]
    async fn test_truncated_optimization_is_reported() {
        let sender = ScriptedSender::new(vec![ok(json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        }))]);
        assert!(matches!(
            client(sender).optimize("fox").await.unwrap_err(),
            GeminiError::Resolution(ResolutionError::TruncatedResponse)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optimization_uses_its_own_timeout() {
        let sender = ScriptedSender::new(vec![Scripted::Hang]);
        let config = GeminiConfig::new()
            .with_base_url("https://api.example.test")
            .with_api_key("key")
            .with_timeouts(Duration::from_secs(200), Duration::from_secs(7));
        let client = PromptClient::new(Arc::new(config), Transport::new(sender));

        assert_eq!(
            client.optimize("fox").await.unwrap_err().to_string(),
            "request timed out after 7s"
        );
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected_without_sending() {
        let sender = ScriptedSender::new(vec![]);
        let err = client(sender.clone()).optimize("   ").await.unwrap_err();

        assert!(matches!(err, GeminiError::InvalidIntent(_)));
        assert_eq!(sender.calls(), 0);
    }
}
