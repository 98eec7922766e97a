//! Clients for external services used by the StoryReel pipeline.
//!
//! This crate provides:
//! - The `Generator` and `CandidateSource` provider seams
//! - A Gemini REST client for text, image and speech generation
//! - A YouTube Data API client for search and stats lookups
//! - Structured-output decoding for near-JSON generator text

pub mod error;
pub mod gemini;
pub mod html;
pub mod provider;
pub mod structured;
pub mod types;
pub mod youtube;

pub use error::{ClientError, ClientResult, ParseError};
pub use gemini::{GeminiClient, GeminiConfig};
pub use html::decode_html_entities;
pub use provider::{CandidateSource, Generator};
pub use structured::{extract_json_span, lenient, parse_structured, repair_json};
pub use types::{GeneratedPayload, GenerationRequest, Modality, SearchQuery, StatsRecord};
pub use youtube::{YouTubeClient, YouTubeConfig};
