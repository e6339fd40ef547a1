use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LogoError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogoStyle {
    #[serde(rename = "Minimalist & Clean")]
    Minimalist,
    #[default]
    #[serde(rename = "Modern & Tech")]
    Modern,
    #[serde(rename = "Vintage & Retro")]
    Vintage,
    #[serde(rename = "Luxury & Elegant")]
    Luxury,
    #[serde(rename = "Playful & Cartoonish")]
    Playful,
    #[serde(rename = "Abstract & Geometric")]
    Abstract,
    #[serde(rename = "Hand Drawn & Artistic")]
    HandDrawn,
    #[serde(rename = "Cyberpunk & Neon")]
    Cyberpunk,
}

impl LogoStyle {
    pub const ALL: [LogoStyle; 8] = [
        Self::Minimalist,
        Self::Modern,
        Self::Vintage,
        Self::Luxury,
        Self::Playful,
        Self::Abstract,
        Self::HandDrawn,
        Self::Cyberpunk,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Minimalist => "Minimalist & Clean",
            Self::Modern => "Modern & Tech",
            Self::Vintage => "Vintage & Retro",
            Self::Luxury => "Luxury & Elegant",
            Self::Playful => "Playful & Cartoonish",
            Self::Abstract => "Abstract & Geometric",
            Self::HandDrawn => "Hand Drawn & Artistic",
            Self::Cyberpunk => "Cyberpunk & Neon",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|style| style.label() == label)
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(LogoStyle::label).collect()
    }
}

impl std::fmt::Display for LogoStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One submission of the brand form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoRequest {
    pub brand_name: String,
    #[serde(default)]
    pub slogan: String,
    #[serde(default)]
    pub style: LogoStyle,
    #[serde(default)]
    pub colors: String,
    #[serde(default)]
    pub icon_symbol: String,
}

impl LogoRequest {
    pub fn new(brand_name: impl Into<String>, style: LogoStyle) -> Self {
        Self {
            brand_name: brand_name.into(),
            style,
            ..Default::default()
        }
    }

    pub fn with_slogan(mut self, slogan: impl Into<String>) -> Self {
        self.slogan = slogan.into();
        self
    }

    pub fn with_colors(mut self, colors: impl Into<String>) -> Self {
        self.colors = colors.into();
        self
    }

    pub fn with_icon_symbol(mut self, icon_symbol: impl Into<String>) -> Self {
        self.icon_symbol = icon_symbol.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.brand_name.trim().is_empty() {
            return Err(LogoError::InvalidRequest("brand name is required".into()));
        }
        Ok(())
    }
}

/// Result of one successful generation. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedLogo {
    image_data: String,
    prompt_text: String,
    created_at: DateTime<Utc>,
}

impl GeneratedLogo {
    pub fn new(image_data: String, prompt_text: String, created_at: DateTime<Utc>) -> Self {
        Self {
            image_data,
            prompt_text,
            created_at,
        }
    }

    /// `data:<mime>;base64,<payload>` URI of the image.
    pub fn image_data(&self) -> &str {
        &self.image_data
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn mime_type(&self) -> &str {
        self.image_data
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .unwrap_or("image/png")
    }

    /// Download name derived from the creation time, e.g. `logo-1700000000000.png`.
    pub fn file_name(&self) -> String {
        let ext = match self.mime_type() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        };
        format!("logo-{}.{ext}", self.created_at.timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    AwaitingKey,
    KeyRequired,
    Idle,
    Generating,
    Ready,
    Failed,
}

impl GenerationPhase {
    pub fn is_gated(&self) -> bool {
        matches!(self, Self::AwaitingKey | Self::KeyRequired)
    }
}
