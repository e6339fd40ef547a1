use base64::Engine;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{LogoError, Result};
use crate::gemini::{GenerateContentRequest, GenerateContentResponse, ProviderFactory};
use crate::key_host::KeyCapability;
use crate::logo::{GeneratedLogo, LogoRequest};
use crate::renderer::render_prompt;

const DEFAULT_MIME_TYPE: &str = "image/png";

/// Turns a form submission into exactly one provider request.
pub struct GenerationClient {
    keys: Option<Arc<dyn KeyCapability>>,
    factory: Arc<dyn ProviderFactory>,
    image_size: String,
}

impl GenerationClient {
    pub fn new(
        keys: Option<Arc<dyn KeyCapability>>,
        factory: Arc<dyn ProviderFactory>,
        image_size: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            factory,
            image_size: image_size.into(),
        }
    }

    pub async fn generate(&self, request: &LogoRequest) -> Result<GeneratedLogo> {
        request.validate()?;
        let prompt = render_prompt(request);

        let api_key = match &self.keys {
            Some(keys) => keys.selected_key().await,
            None => None,
        }
        .ok_or(LogoError::KeyUnavailable)?;

        // New handle per call so a re-selected key takes effect immediately.
        let provider = self.factory.connect(api_key);
        let body = GenerateContentRequest::image(prompt.clone(), self.image_size.clone());

        let start = Instant::now();
        let response = provider.generate_content(&body).await?;
        let image_data = extract_image_data(response)?;

        tracing::info!(
            brand = %request.brand_name.trim(),
            style = %request.style,
            duration_ms = start.elapsed().as_millis() as u64,
            "logo generated"
        );

        Ok(GeneratedLogo::new(image_data, prompt, Utc::now()))
    }
}

/// First inline payload of the first candidate, as a data URI.
pub fn extract_image_data(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(LogoError::NoImageData)?;

    let inline_data = candidate
        .content
        .into_iter()
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data.filter(|inline| !inline.data.is_empty()))
        .ok_or(LogoError::NoImageData)?;

    base64::engine::general_purpose::STANDARD
        .decode(inline_data.data.as_bytes())
        .map_err(|e| LogoError::Decode(e.to_string()))?;

    let mime_type = inline_data
        .mime_type
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    Ok(format!("data:{mime_type};base64,{}", inline_data.data))
}
