//! Gemini image generation: request building, a retrying transport, batch
//! fan-out with partial-success aggregation and response resolution.

pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod transport;

pub use config::{Credentials, GeminiConfig};
pub use error::{GeminiError, ResolutionError, Result, TransportError};
pub use gemini::{GeminiClient, ImageClient, PromptClient, RequestBuilder};
pub use models::{
    AspectRatio, BatchResult, GenerationIntent, ImageReference, ImageSize, ModelInfo, ModelTier,
    ReferenceImage, ResolvedImage,
};
pub use transport::{
    AttemptOutcome, HttpReply, HttpSender, OutboundRequest, ReqwestSender, RetryPolicy, Transport,
};
