//! Media packaging for generated artifacts.
//!
//! This crate provides:
//! - WAV container wrapping for raw PCM speech
//! - Image MIME detection and file extensions

pub mod error;
pub mod mime;
pub mod wav;

pub use error::{MediaError, MediaResult};
pub use mime::{extension_for_mime, resolve_image_mime, sniff_image_mime, DEFAULT_IMAGE_MIME};
pub use wav::{wrap_pcm, WavFormat, WAV_HEADER_LEN, WAV_MIME};
