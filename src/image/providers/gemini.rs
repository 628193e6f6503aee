//! Google image provider: Imagen for text-to-image, Gemini for edits.

use crate::error::{parse_retry_after, sanitize_error_message, Result, VisionaryError};
use crate::image::data_uri::DataUri;
use crate::image::provider::ImageProvider;
use crate::image::types::{AspectRatio, GenerationRequest, ImageFormat};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default endpoint of the Generative Language API.
pub(crate) const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables checked, in order, for the API key.
pub(crate) const API_KEY_ENV_VARS: [&str; 3] = ["GOOGLE_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Environment variable overriding the API base URL.
pub(crate) const API_BASE_ENV_VAR: &str = "VISIONARY_API_BASE";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const NO_GENERATED_IMAGE: &str = "No image data returned from the API.";
const NO_EDITED_IMAGE: &str = "No image data returned from the editing model.";

/// Imagen text-to-image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagenModel {
    /// Imagen 4 (balanced).
    #[default]
    Imagen4,
    /// Imagen 4 Ultra (highest quality, slowest).
    Imagen4Ultra,
    /// Imagen 4 Fast (lowest latency).
    Imagen4Fast,
}

impl ImagenModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imagen4 => "imagen-4.0-generate-001",
            Self::Imagen4Ultra => "imagen-4.0-ultra-generate-001",
            Self::Imagen4Fast => "imagen-4.0-fast-generate-001",
        }
    }
}

/// Gemini image-editing model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "gemini-3-pro-image-preview",
        }
    }
}

/// Builder for GeminiProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiProviderBuilder {
    api_key: Option<String>,
    imagen_model: ImagenModel,
    gemini_model: GeminiModel,
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl GeminiProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, `GEMINI_API_KEY`
    /// and `API_KEY`, in that order.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model used for text-to-image requests.
    pub fn imagen_model(mut self, model: ImagenModel) -> Self {
        self.imagen_model = model;
        self
    }

    /// Sets the model used for edit requests.
    pub fn gemini_model(mut self, model: GeminiModel) -> Self {
        self.gemini_model = model;
        self
    }

    /// Overrides the API base URL. Falls back to `VISIONARY_API_BASE`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the per-request timeout (default 120s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the provider, resolving the API key and base URL.
    pub fn build(self) -> Result<GeminiProvider> {
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .filter_map(|var| std::env::var(var).ok())
                    .find(|k| !k.trim().is_empty())
            })
            .ok_or_else(|| {
                VisionaryError::Auth(format!(
                    "{} not set and no API key provided",
                    API_KEY_ENV_VARS.join(", ")
                ))
            })?;

        let base_url = self
            .base_url
            .or_else(|| std::env::var(API_BASE_ENV_VAR).ok())
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(GeminiProvider {
            client,
            api_key,
            base_url,
            imagen_model: self.imagen_model,
            gemini_model: self.gemini_model,
        })
    }
}

/// Google image provider.
///
/// Text-to-image requests go to Imagen's `:predict` endpoint and always come
/// back as JPEG. Edit requests go to a Gemini image model through
/// `:generateContent`.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    imagen_model: ImagenModel,
    gemini_model: GeminiModel,
}

impl GeminiProvider {
    /// Creates a new `GeminiProviderBuilder`.
    pub fn builder() -> GeminiProviderBuilder {
        GeminiProviderBuilder::new()
    }

    /// Model used for text-to-image requests.
    pub fn imagen_model(&self) -> ImagenModel {
        self.imagen_model
    }

    /// Model used for edit requests.
    pub fn gemini_model(&self) -> GeminiModel {
        self.gemini_model
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers, &self.api_key));
        }
        Ok(response)
    }

    async fn generate_image(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<DataUri> {
        let url = format!("{}/models/{}:predict", self.base_url, self.imagen_model.as_str());
        let body = ImagenRequest::new(prompt, aspect_ratio);

        let response: ImagenResponse = self.post_json(&url, &body).await?.json().await?;
        response.into_image()
    }

    async fn edit_image(&self, prompt: &str, source: &DataUri) -> Result<DataUri> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.gemini_model.as_str()
        );
        let body = GeminiRequest::new(prompt, source);

        let response: GeminiResponse = self.post_json(&url, &body).await?.json().await?;
        response.into_image()
    }
}

fn parse_error(
    status: u16,
    text: &str,
    headers: &reqwest::header::HeaderMap,
    api_key: &str,
) -> VisionaryError {
    let text = sanitize_error_message(text, api_key);
    if status == 404 {
        return VisionaryError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(Duration::from_secs);
        return VisionaryError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return VisionaryError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety") || lower.contains("blocked") || lower.contains("prohibited") {
        return VisionaryError::ContentBlocked(text);
    }
    VisionaryError::Api {
        status,
        message: text,
    }
}

#[async_trait]
impl ImageProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<DataUri> {
        request.validate()?;
        let start = Instant::now();
        let mode = request.mode();
        tracing::debug!(%mode, prompt_len = request.prompt().len(), "sending image request");

        let result = match request {
            GenerationRequest::Generate {
                prompt,
                aspect_ratio,
            } => self.generate_image(prompt, *aspect_ratio).await,
            GenerationRequest::Edit { prompt, source } => self.edit_image(prompt, source).await,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(image) => tracing::info!(
                %mode,
                duration_ms,
                mime = image.mime_type(),
                "image request succeeded"
            ),
            Err(e) => tracing::warn!(%mode, duration_ms, "image request failed: {e}"),
        }
        result
    }

    fn name(&self) -> &str {
        "Imagen & Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.imagen_model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(VisionaryError::Auth("Invalid API key".into())),
            404 => Err(VisionaryError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(VisionaryError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Imagen request/response types
#[derive(Debug, Serialize)]
struct ImagenRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: u32,
    aspect_ratio: AspectRatio,
    output_options: ImagenOutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenOutputOptions {
    mime_type: &'static str,
}

impl ImagenRequest {
    fn new(prompt: &str, aspect_ratio: AspectRatio) -> Self {
        Self {
            instances: vec![ImagenInstance {
                prompt: prompt.to_string(),
            }],
            parameters: ImagenParameters {
                sample_count: 1,
                aspect_ratio,
                output_options: ImagenOutputOptions {
                    mime_type: ImageFormat::Jpeg.mime_type(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

impl ImagenResponse {
    fn into_image(self) -> Result<DataUri> {
        let prediction = self.predictions.into_iter().next().ok_or_else(|| {
            VisionaryError::UnexpectedResponse(NO_GENERATED_IMAGE.into())
        })?;

        match prediction.bytes_base64_encoded.filter(|b| !b.is_empty()) {
            Some(data) => DataUri::new(ImageFormat::Jpeg.mime_type(), data),
            None => match prediction.rai_filtered_reason {
                Some(reason) => Err(VisionaryError::ContentBlocked(reason)),
                None => Err(VisionaryError::UnexpectedResponse(NO_GENERATED_IMAGE.into())),
            },
        }
    }
}

// Gemini request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn new(prompt: &str, source: &DataUri) -> Self {
        // Image first, then the instruction
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: source.mime_type().to_string(),
                    data: source.data().to_string(),
                },
            },
            GeminiRequestPart::Text {
                text: prompt.to_string(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    fn into_image(self) -> Result<DataUri> {
        // Blocks arrive as HTTP 200 with prompt feedback
        if let Some(feedback) = self.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return Err(VisionaryError::ContentBlocked(msg));
            }
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| VisionaryError::UnexpectedResponse(NO_EDITED_IMAGE.into()))?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(VisionaryError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {}",
                        finish_reason
                    )));
                }
                _ => {}
            }
        }

        let inline_data = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data.filter(|d| !d.data.is_empty()))
            .ok_or_else(|| VisionaryError::UnexpectedResponse(NO_EDITED_IMAGE.into()))?;

        // The model does not promise a format; PNG unless it says otherwise
        let mime_type = if inline_data.mime_type.starts_with("image/") {
            inline_data.mime_type
        } else {
            ImageFormat::Png.mime_type().to_string()
        };
        DataUri::new(mime_type, inline_data.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn source() -> DataUri {
        DataUri::new("image/png", "iVBORw0KGgo=").unwrap()
    }

    #[test]
    fn test_model_identifiers() {
        assert_eq!(ImagenModel::default().as_str(), "imagen-4.0-generate-001");
        assert_eq!(GeminiModel::default().as_str(), "gemini-2.5-flash-image");
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiProviderBuilder::new()
            .api_key("test-key")
            .base_url("http://localhost:1234/v1beta/")
            .imagen_model(ImagenModel::Imagen4Fast)
            .build()
            .unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234/v1beta");
        assert_eq!(provider.imagen_model(), ImagenModel::Imagen4Fast);
        assert_eq!(provider.gemini_model(), GeminiModel::NanoBanana);
    }

    #[test]
    fn test_imagen_request_body() {
        let body = ImagenRequest::new("A red balloon over Paris", AspectRatio::Landscape);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "instances": [{"prompt": "A red balloon over Paris"}],
                "parameters": {
                    "sampleCount": 1,
                    "aspectRatio": "16:9",
                    "outputOptions": {"mimeType": "image/jpeg"}
                }
            })
        );
    }

    #[test]
    fn test_gemini_request_body() {
        let body = GeminiRequest::new("add sunglasses", &source());
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "contents": [{
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}},
                        {"text": "add sunglasses"}
                    ]
                }],
                "generationConfig": {"responseModalities": ["IMAGE"]}
            })
        );
    }

    #[test]
    fn test_imagen_response_wraps_jpeg() {
        let resp: ImagenResponse = serde_json::from_value(json!({
            "predictions": [{"bytesBase64Encoded": "/9j/4AAQ", "mimeType": "image/png"}]
        }))
        .unwrap();
        let image = resp.into_image().unwrap();
        assert_eq!(image.to_string(), "data:image/jpeg;base64,/9j/4AAQ");
    }

    #[test]
    fn test_imagen_response_without_predictions() {
        let resp: ImagenResponse = serde_json::from_value(json!({})).unwrap();
        let err = resp.into_image().unwrap_err();
        assert_eq!(err.to_string(), NO_GENERATED_IMAGE);
    }

    #[test]
    fn test_imagen_response_empty_bytes() {
        let resp: ImagenResponse =
            serde_json::from_value(json!({"predictions": [{"bytesBase64Encoded": ""}]})).unwrap();
        assert!(matches!(
            resp.into_image(),
            Err(VisionaryError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_imagen_response_filtered() {
        let resp: ImagenResponse = serde_json::from_value(json!({
            "predictions": [{"raiFilteredReason": "Unable to show generated images."}]
        }))
        .unwrap();
        assert!(matches!(
            resp.into_image(),
            Err(VisionaryError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_gemini_response_first_inline_image() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [
                    {"text": "Here is your edited image"},
                    {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                    {"inlineData": {"mimeType": "image/png", "data": "BBBB"}}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(resp.into_image().unwrap().data(), "AAAA");
    }

    #[test]
    fn test_gemini_response_defaults_to_png() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"inlineData": {"data": "AAAA"}}]}}]
        }))
        .unwrap();
        assert_eq!(resp.into_image().unwrap().mime_type(), "image/png");
    }

    #[test]
    fn test_gemini_response_keeps_reported_image_mime() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/jpeg", "data": "AAAA"}}
            ]}}]
        }))
        .unwrap();
        assert_eq!(resp.into_image().unwrap().mime_type(), "image/jpeg");
    }

    #[test]
    fn test_gemini_response_without_image() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "I can't do that"}]}}]
        }))
        .unwrap();
        let err = resp.into_image().unwrap_err();
        assert_eq!(err.to_string(), NO_EDITED_IMAGE);
    }

    #[test]
    fn test_gemini_response_prompt_blocked() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [],
            "promptFeedback": {
                "blockReason": "SAFETY",
                "blockReasonMessage": "Prompt was blocked due to safety"
            }
        }))
        .unwrap();
        let err = resp.into_image().unwrap_err();
        assert_eq!(err.to_string(), "content blocked: Prompt was blocked due to safety");
    }

    #[test]
    fn test_gemini_response_safety_finish_reason() {
        let resp: GeminiResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "IMAGE_SAFETY"}]}))
                .unwrap();
        assert!(matches!(
            resp.into_image(),
            Err(VisionaryError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_parse_error_mapping() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            parse_error(403, "forbidden", &headers, "test-key"),
            VisionaryError::Auth(_)
        ));
        assert!(matches!(
            parse_error(404, "", &headers, "test-key"),
            VisionaryError::InvalidRequest(_)
        ));
        assert!(matches!(
            parse_error(429, "", &headers, "test-key"),
            VisionaryError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            parse_error(
                400,
                r#"{"error":{"message":"Request blocked by safety settings"}}"#,
                &headers,
                "test-key"
            ),
            VisionaryError::ContentBlocked(_)
        ));

        let err = parse_error(
            500,
            r#"{"error":{"message":"Internal error"}}"#,
            &headers,
            "test-key",
        );
        assert_eq!(err.to_string(), "API error: 500 - Internal error");
    }
}
