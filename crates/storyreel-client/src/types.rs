//! Request and response types shared by provider clients.

use storyreel_models::{AspectRatio, ItemId, VideoStats};

use crate::error::{ClientError, ClientResult};

/// Output modality of a generative call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image {
        aspect_ratio: AspectRatio,
    },
    /// `voice` overrides the client's default voice.
    Audio {
        voice: Option<String>,
    },
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image { .. } => "image",
            Modality::Audio { .. } => "audio",
        }
    }
}

/// A single generative request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub modality: Modality,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            modality: Modality::Text,
        }
    }

    pub fn image(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            modality: Modality::Image { aspect_ratio },
        }
    }

    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            prompt: text.into(),
            modality: Modality::Audio { voice: None },
        }
    }
}

/// Decoded provider output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedPayload {
    Text(String),
    Image { bytes: Vec<u8>, mime_type: String },
    /// Raw PCM samples
    Audio(Vec<u8>),
}

impl GeneratedPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratedPayload::Text(_) => "text",
            GeneratedPayload::Image { .. } => "image",
            GeneratedPayload::Audio(_) => "audio",
        }
    }

    pub fn into_text(self) -> ClientResult<String> {
        match self {
            GeneratedPayload::Text(text) => Ok(text),
            other => Err(ClientError::UnexpectedModality {
                expected: "text",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_image(self) -> ClientResult<(Vec<u8>, String)> {
        match self {
            GeneratedPayload::Image { bytes, mime_type } => Ok((bytes, mime_type)),
            other => Err(ClientError::UnexpectedModality {
                expected: "image",
                actual: other.kind(),
            }),
        }
    }

    pub fn into_audio(self) -> ClientResult<Vec<u8>> {
        match self {
            GeneratedPayload::Audio(pcm) => Ok(pcm),
            other => Err(ClientError::UnexpectedModality {
                expected: "audio",
                actual: other.kind(),
            }),
        }
    }
}

/// Video search parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub region: String,
    pub language: String,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            region: "KR".to_string(),
            language: "ko".to_string(),
            max_results: 20,
        }
    }
}

/// Per-video result of a stats lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRecord {
    pub id: ItemId,
    pub stats: VideoStats,
    /// Full description, when the provider returned one
    pub description: Option<String>,
}
