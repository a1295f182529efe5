use crate::error::GeminiError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TEXT_OPTIMIZATION_MODEL: &str = "gemini-3-pro-preview";

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub tier: ModelTier,
    pub backend_id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub max_reference_images: usize,
    pub supports_image_size: bool,
}

/// Logical model selection exposed to users; mapped to a backend model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTier {
    Standard,
    HighQuality,
}

impl ModelTier {
    pub const ALL: [ModelTier; 2] = [ModelTier::Standard, ModelTier::HighQuality];

    pub fn info(&self) -> ModelInfo {
        match self {
            ModelTier::Standard => ModelInfo {
                tier: *self,
                backend_id: "gemini-2.5-flash-image",
                name: "Nano Banana",
                description: "Fast and efficient, standard resolution",
                max_reference_images: 4,
                supports_image_size: false,
            },
            ModelTier::HighQuality => ModelInfo {
                tier: *self,
                backend_id: "gemini-3-pro-image-preview",
                name: "Nano Banana Pro",
                description: "High detail, up to 4K output",
                max_reference_images: 8,
                supports_image_size: true,
            },
        }
    }

    pub fn backend_id(&self) -> &'static str {
        self.info().backend_id
    }

    pub fn display_name(&self) -> &'static str {
        self.info().name
    }

    pub fn max_reference_images(&self) -> usize {
        self.info().max_reference_images
    }

    pub fn supports_image_size(&self) -> bool {
        self.info().supports_image_size
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Standard => write!(f, "nano"),
            ModelTier::HighQuality => write!(f, "pro"),
        }
    }
}

impl FromStr for ModelTier {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nano" | "standard" => Ok(ModelTier::Standard),
            "pro" | "high-quality" | "high_quality" => Ok(ModelTier::HighQuality),
            other => Err(GeminiError::ConfigError(format!(
                "Unknown model tier: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "9:16")]
    Vertical9x16,
    #[serde(rename = "16:9")]
    Wide16x9,
    #[serde(rename = "21:9")]
    Cinema21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 10] = [
        AspectRatio::Square,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Vertical9x16,
        AspectRatio::Wide16x9,
        AspectRatio::Cinema21x9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Vertical9x16 => "9:16",
            AspectRatio::Wide16x9 => "16:9",
            AspectRatio::Cinema21x9 => "21:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == wanted)
            .ok_or_else(|| GeminiError::InvalidIntent(format!("Unsupported aspect ratio: {}", wanted)))
    }
}

/// Output resolution; only honored by tiers that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = GeminiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(ImageSize::OneK),
            "2K" => Ok(ImageSize::TwoK),
            "4K" => Ok(ImageSize::FourK),
            other => Err(GeminiError::InvalidIntent(format!(
                "Unsupported image size: {}",
                other
            ))),
        }
    }
}
