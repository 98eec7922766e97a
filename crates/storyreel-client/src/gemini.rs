//! Gemini REST client for text, image and speech generation.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::provider::Generator;
use crate::types::{GeneratedPayload, GenerationRequest, Modality};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub speech_model: String,
    /// Prebuilt voice for narration
    pub voice: String,
    /// Image resolution hint
    pub image_size: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: "gemini-2.0-flash".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
            image_size: "2K".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ClientError::config_error("GEMINI_API_KEY not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("GEMINI_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Ok(model) = std::env::var("GEMINI_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Ok(model) = std::env::var("GEMINI_SPEECH_MODEL") {
            config.speech_model = model;
        }
        if let Ok(voice) = std::env::var("GEMINI_VOICE") {
            config.voice = voice;
        }
        config.timeout = Duration::from_secs(
            std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),
        );
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Gemini API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
    image_size: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter())
            .into_iter()
            .flatten()
    }

    fn text(&self) -> Option<String> {
        let text: String = self.parts().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }

    fn inline_data(&self) -> Option<&InlineData> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|d| !d.data.is_empty())
    }
}

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn build_request(&self, request: &GenerationRequest) -> (&str, GeminiRequest) {
        let (model, generation_config) = match &request.modality {
            Modality::Text => (self.config.text_model.as_str(), None),
            Modality::Image { aspect_ratio } => (
                self.config.image_model.as_str(),
                Some(GenerationConfig {
                    response_modalities: vec!["IMAGE"],
                    image_config: Some(ImageConfig {
                        aspect_ratio: aspect_ratio.to_string(),
                        image_size: self.config.image_size.clone(),
                    }),
                    speech_config: None,
                }),
            ),
            Modality::Audio { voice } => (
                self.config.speech_model.as_str(),
                Some(GenerationConfig {
                    response_modalities: vec!["AUDIO"],
                    image_config: None,
                    speech_config: Some(SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: voice
                                    .clone()
                                    .unwrap_or_else(|| self.config.voice.clone()),
                            },
                        },
                    }),
                }),
            ),
        };

        let body = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config,
        };

        (model, body)
    }

    /// Call the generateContent endpoint.
    async fn call_gemini_api(&self, model: &str, body: &GeminiRequest) -> ClientResult<GeminiResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        debug!(model = %model, "Sending Gemini request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(model = %model, status = %status, "Gemini API error");
            return Err(ClientError::request_failed(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        response.json().await.map_err(|e| {
            ClientError::invalid_response(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn submit(&self, request: &GenerationRequest) -> ClientResult<GeneratedPayload> {
        let (model, body) = self.build_request(request);
        let response = self.call_gemini_api(model, &body).await?;

        match &request.modality {
            Modality::Text => response
                .text()
                .map(GeneratedPayload::Text)
                .ok_or(ClientError::EmptyPayload("text")),
            Modality::Image { .. } => {
                let data = response
                    .inline_data()
                    .ok_or(ClientError::EmptyPayload("image"))?;
                Ok(GeneratedPayload::Image {
                    bytes: STANDARD.decode(&data.data)?,
                    mime_type: data
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "image/png".to_string()),
                })
            }
            Modality::Audio { .. } => {
                let data = response
                    .inline_data()
                    .ok_or(ClientError::EmptyPayload("audio"))?;
                Ok(GeneratedPayload::Audio(STANDARD.decode(&data.data)?))
            }
        }
    }
}
