//! Gemini `generateContent` wire format and HTTP provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LogoError, Result, ENTITY_NOT_FOUND};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_IMAGE_SIZE: &str = "1K";
pub const SQUARE_ASPECT_RATIO: &str = "1:1";
pub const IMAGE_SIZES: [&str; 3] = ["1K", "2K", "4K"];

/// One exchange with an image provider.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

/// Builds a provider handle bound to one credential.
pub trait ProviderFactory: Send + Sync {
    fn connect(&self, api_key: String) -> Box<dyn ImageProvider>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiSettings {
    pub api_base_url: String,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl GeminiSettings {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Connects a fresh `GeminiProvider` per call.
#[derive(Debug, Clone, Default)]
pub struct GeminiConnector {
    settings: GeminiSettings,
}

impl GeminiConnector {
    pub fn new(settings: GeminiSettings) -> Self {
        Self { settings }
    }
}

impl ProviderFactory for GeminiConnector {
    fn connect(&self, api_key: String) -> Box<dyn ImageProvider> {
        Box::new(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            settings: self.settings.clone(),
        })
    }
}

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    settings: GeminiSettings,
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.settings.endpoint();
        tracing::debug!(model = %self.settings.model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text));
        }

        let body = response.bytes().await?;
        decode_response(&body)
    }
}

/// Parses a successful `generateContent` body.
pub fn decode_response(body: &[u8]) -> Result<GenerateContentResponse> {
    Ok(serde_json::from_slice(body)?)
}

/// Maps a provider error body onto the error taxonomy. Structured fields
/// decide first; the message match is the fallback. A 403 alone is not a key
/// rejection: disabled services and project permissions also answer 403.
pub fn classify_error(status: u16, body: &str) -> LogoError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let detail = envelope.map(|e| e.error);

    let message = detail
        .as_ref()
        .map(|d| d.message.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let text = body.trim();
            if text.is_empty() {
                format!("HTTP {status}")
            } else {
                text.to_string()
            }
        });

    let key_invalid = detail.as_ref().is_some_and(|d| {
        d.details
            .iter()
            .any(|info| info.reason.as_deref() == Some("API_KEY_INVALID"))
    });
    let unauthenticated = detail
        .as_ref()
        .is_some_and(|d| d.status.as_deref() == Some("UNAUTHENTICATED"));

    if key_invalid || unauthenticated || status == 401 {
        return LogoError::CredentialRejected(message);
    }
    if status == 404 && message.contains(ENTITY_NOT_FOUND) {
        return LogoError::CredentialRejected(message);
    }

    LogoError::Api { status, message }
}

// Request/Response types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// Single text part asking for a square image of the given size tier.
    pub fn image(prompt: impl Into<String>, image_size: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                image_config: ImageConfig {
                    aspect_ratio: SQUARE_ASPECT_RATIO.to_string(),
                    image_size: image_size.into(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub image_config: ImageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: &str, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: Some(mime_type.to_string()),
                data: data.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    #[serde(default)]
    reason: Option<String>,
}
