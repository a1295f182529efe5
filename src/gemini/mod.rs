pub mod batch;
pub mod image_client;
pub mod prompt_client;
pub mod request_builder;
pub mod resolver;

use crate::{
    config::GeminiConfig,
    error::Result,
    models::{BatchResult, GenerationIntent},
    transport::{HttpSender, Transport},
};
use std::sync::Arc;

pub use image_client::ImageClient;
pub use prompt_client::PromptClient;
pub use request_builder::{RequestBuilder, API_KEY_HEADER};

#[derive(Clone)]
pub struct GeminiClient {
    config: Arc<GeminiConfig>,
    image_client: ImageClient,
    prompt_client: PromptClient,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_transport(config, Transport::with_reqwest())
    }

    /// Uses `sender` for every HTTP call instead of the default reqwest client.
    pub fn with_sender(config: GeminiConfig, sender: Arc<dyn HttpSender>) -> Self {
        Self::with_transport(config, Transport::new(sender))
    }

    fn with_transport(config: GeminiConfig, transport: Transport) -> Self {
        let config = Arc::new(config);
        Self {
            image_client: ImageClient::new(config.clone(), transport.clone()),
            prompt_client: PromptClient::new(config.clone(), transport),
            config,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn prompt(&self) -> &PromptClient {
        &self.prompt_client
    }

    pub async fn generate_batch(&self, intent: &GenerationIntent) -> Result<BatchResult> {
        self.image_client.run_batch(intent).await
    }

    /// Rewrite the prompt first, then run the batch with the rewritten prompt.
    /// A failed rewrite fails the whole call.
    pub async fn optimize_and_generate(&self, intent: &GenerationIntent) -> Result<BatchResult> {
        let optimized = self.prompt_client.optimize(&intent.prompt).await?;
        let intent = GenerationIntent {
            prompt: optimized,
            ..intent.clone()
        };
        self.image_client.run_batch(&intent).await
    }
}
