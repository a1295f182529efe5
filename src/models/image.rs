use crate::{
    error::{GeminiError, Result},
    models::{AspectRatio, ImageSize, ModelTier},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub mime_type: String,
    /// Base64 payload without the `data:` prefix.
    pub data: String,
}

impl ReferenceImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parses `data:<mime>;base64,<payload>`.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        if mime_type.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self::new(mime_type, data))
    }
}

/// A user's fully specified request for one or more images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationIntent {
    pub prompt: String,
    /// Logical tier identifier, e.g. `nano` or `pro`.
    pub model: String,
    pub aspect_ratio: AspectRatio,
    pub image_size: Option<ImageSize>,
    pub reference_images: Vec<ReferenceImage>,
    pub requested_count: usize,
}

impl GenerationIntent {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            aspect_ratio: AspectRatio::default(),
            image_size: None,
            reference_images: Vec::new(),
            requested_count: 1,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_image_size(mut self, image_size: ImageSize) -> Self {
        self.image_size = Some(image_size);
        self
    }

    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_images.push(image);
        self
    }

    pub fn with_count(mut self, requested_count: usize) -> Self {
        self.requested_count = requested_count;
        self
    }

    pub fn tier(&self) -> Result<ModelTier> {
        self.model.parse()
    }

    /// How many attached reference images the tier will not accept.
    pub fn excess_reference_images(&self, tier: ModelTier) -> usize {
        self.reference_images
            .len()
            .saturating_sub(tier.max_reference_images())
    }
}

/// Where a generated image can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageReference {
    Inline { mime_type: String, data: String },
    Remote { url: String },
}

impl ImageReference {
    /// A URL usable by an image viewer: `data:` for inline payloads.
    pub fn to_url(&self) -> String {
        match self {
            ImageReference::Inline { mime_type, data } => {
                format!("data:{};base64,{}", mime_type, data)
            }
            ImageReference::Remote { url } => url.clone(),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageReference::Inline { .. })
    }

    /// Decoded bytes for inline images, `None` for remote ones.
    pub fn inline_bytes(&self) -> Result<Option<Vec<u8>>> {
        match self {
            ImageReference::Inline { data, .. } => STANDARD
                .decode(data.as_bytes())
                .map(Some)
                .map_err(|e| GeminiError::SerializationError(format!("invalid base64 image: {}", e))),
            ImageReference::Remote { .. } => Ok(None),
        }
    }

    /// Inline images can be fed back as references for an edit.
    pub fn to_reference_image(&self) -> Option<ReferenceImage> {
        match self {
            ImageReference::Inline { mime_type, data } => {
                Some(ReferenceImage::new(mime_type.clone(), data.clone()))
            }
            ImageReference::Remote { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedImage {
    pub id: String,
    pub image: ImageReference,
    pub source_prompt: String,
    pub model_name: String,
    pub model_tier: ModelTier,
    /// Wall-clock time of the whole batch this image came from.
    pub elapsed: Duration,
    pub created_at: DateTime<Utc>,
}

impl ResolvedImage {
    pub fn elapsed_display(&self) -> String {
        format!("{:.2}s", self.elapsed.as_secs_f64())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub requested_count: usize,
    pub successes: Vec<ResolvedImage>,
    pub failure_count: usize,
    pub first_failure_message: Option<String>,
    pub elapsed: Duration,
    pub dropped_reference_images: usize,
}

impl BatchResult {
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn is_partial(&self) -> bool {
        self.failure_count > 0 && !self.successes.is_empty()
    }

    /// e.g. "3 succeeded, 1 failed"
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.successes.len(),
            self.failure_count
        )
    }
}
