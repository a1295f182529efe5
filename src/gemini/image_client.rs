use crate::{
    config::GeminiConfig,
    error::Result,
    gemini::{request_builder::RequestBuilder, resolver},
    models::{GenerationIntent, ImageReference},
    transport::{OutboundRequest, Transport},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ImageClient {
    pub(crate) config: Arc<GeminiConfig>,
    pub(crate) transport: Transport,
}

impl ImageClient {
    pub fn new(config: Arc<GeminiConfig>, transport: Transport) -> Self {
        Self { config, transport }
    }

    /// One image for one intent, ignoring `requested_count`.
    pub async fn generate(&self, intent: &GenerationIntent) -> Result<ImageReference> {
        let request = self.builder()?.build(intent)?;
        log::info!("Generating image with model: {}", intent.model);
        self.attempt(&request).await
    }

    pub(crate) fn builder(&self) -> Result<RequestBuilder<'_>> {
        let credentials = self.config.credentials()?;
        Ok(RequestBuilder::new(credentials).with_instruction_prefix(&self.config.instruction_prefix))
    }

    /// Transport then resolve. Nothing here is retried beyond the transport policy.
    pub(crate) async fn attempt(&self, request: &OutboundRequest) -> Result<ImageReference> {
        let body = self
            .transport
            .send(request, &self.config.image_policy())
            .await?;
        Ok(resolver::resolve(&body)?)
    }
}
