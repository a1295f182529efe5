use crate::{
    config::{Credentials, DEFAULT_INSTRUCTION_PREFIX},
    error::{GeminiError, Result},
    models::{
        GenerateContentRequest, GenerationConfig, GenerationIntent, ImageConfig,
        InlineDataPayload, RequestContent, RequestPart, ThinkingConfig, TEXT_OPTIMIZATION_MODEL,
    },
    transport::OutboundRequest,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};

pub const API_KEY_HEADER: &str = "x-goog-api-key";

const OPTIMIZER_INSTRUCTION: &str = "You are an expert at writing prompts for AI image generation. \
Rewrite the user's input as one detailed English image prompt.

Rules:
1. Return exactly one prompt, never several options.
2. Keep the core subject; add art style, lighting and composition details.
3. Use professional terms such as cinematic lighting, high detail, 4K.
4. Output only the prompt itself: no title, numbering or explanation.
5. Stay under 150 words.";

/// Turns intents into transport-ready requests. Holds no state beyond the
/// borrowed credentials, so identical input always yields identical output.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    credentials: Credentials<'a>,
    instruction_prefix: &'a str,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(credentials: Credentials<'a>) -> Self {
        Self {
            credentials,
            instruction_prefix: DEFAULT_INSTRUCTION_PREFIX,
        }
    }

    pub fn with_instruction_prefix(mut self, prefix: &'a str) -> Self {
        self.instruction_prefix = prefix;
        self
    }

    pub fn build(&self, intent: &GenerationIntent) -> Result<OutboundRequest> {
        let tier = intent.tier()?;
        let prompt = intent.prompt.trim();
        if prompt.is_empty() {
            return Err(GeminiError::InvalidIntent("prompt is empty".into()));
        }

        // Extra references beyond the tier limit are dropped, order preserved.
        let mut parts: Vec<RequestPart> = intent
            .reference_images
            .iter()
            .take(tier.max_reference_images())
            .map(|image| RequestPart::InlineData {
                inline_data: InlineDataPayload {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            })
            .collect();
        parts.push(RequestPart::Text {
            text: format!("{}{}", self.instruction_prefix, prompt),
        });

        let image_size = if tier.supports_image_size() {
            intent.image_size.map(|size| size.to_string())
        } else {
            None
        };

        let body = GenerateContentRequest {
            contents: vec![RequestContent { parts }],
            system_instruction: None,
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                image_config: Some(ImageConfig {
                    aspect_ratio: intent.aspect_ratio.to_string(),
                    image_size,
                }),
                ..Default::default()
            },
        };

        self.outbound(tier.backend_id(), &body)
    }

    pub fn build_prompt_optimization(&self, prompt: &str) -> Result<OutboundRequest> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(GeminiError::InvalidIntent("prompt is empty".into()));
        }

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: Some(RequestContent {
                parts: vec![RequestPart::Text {
                    text: OPTIMIZER_INSTRUCTION.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(2000),
                thinking_config: Some(ThinkingConfig {
                    thinking_level: "low".to_string(),
                }),
                ..Default::default()
            },
        };

        self.outbound(TEXT_OPTIMIZATION_MODEL, &body)
    }

    fn outbound(&self, model_id: &str, body: &GenerateContentRequest) -> Result<OutboundRequest> {
        Ok(OutboundRequest {
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                self.credentials.base_url, model_id
            ),
            headers: self.headers()?,
            body: serde_json::to_value(body)?,
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut api_key = HeaderValue::from_str(self.credentials.api_key).map_err(|_| {
            GeminiError::ConfigError("API key contains characters not allowed in a header".into())
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, api_key);
        Ok(headers)
    }
}
