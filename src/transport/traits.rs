use crate::{error::TransportError, transport::OutboundRequest};
use async_trait::async_trait;

/// Status and raw body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs exactly one POST. Connection-level failures are reported as
/// `TransportError::NetworkError`; retry and timeout policy live in `Transport`.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn post(&self, request: &OutboundRequest) -> Result<HttpReply, TransportError>;
}
