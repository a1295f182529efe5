use crate::{
    error::TransportError,
    transport::{
        traits::{HttpReply, HttpSender},
        OutboundRequest,
    },
};
use async_trait::async_trait;
use reqwest::Client;

#[derive(Clone, Default)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn post(&self, request: &OutboundRequest) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(&request.endpoint)
            .headers(request.headers.clone())
            .json(&request.body)
            .send()
            .await
            .map_err(|e| {
                log::debug!("POST {} failed before a response: {:?}", request.endpoint, e);
                TransportError::NetworkError(e.to_string())
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::NetworkError(format!("failed to read body: {}", e)))?;

        Ok(HttpReply { status, body })
    }
}
