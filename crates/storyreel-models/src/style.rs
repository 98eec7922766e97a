//! Illustration style and framing definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named visual style for scene illustrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    /// Hand-drawn black and white stick figures
    #[default]
    Doodle,
    /// Cinematic photorealistic render
    Realistic,
}

impl ImageStyle {
    pub const ALL: &'static [ImageStyle] = &[ImageStyle::Doodle, ImageStyle::Realistic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStyle::Doodle => "doodle",
            ImageStyle::Realistic => "realistic",
        }
    }

    /// Style instruction appended to every scene prompt.
    pub fn suffix(&self) -> &'static str {
        match self {
            ImageStyle::Doodle => {
                "Style: Minimalist black and white stick figure drawing, funny hand-drawn doodle, \
                 simple sketch, thick lines on white background. IMPORTANT: No text."
            }
            ImageStyle::Realistic => {
                "Style: Cinematic photorealistic image, high quality, 4k, detailed texture, \
                 dramatic lighting. IMPORTANT: No text."
            }
        }
    }

    /// Full image prompt for a scene description.
    pub fn apply(&self, scene_prompt: &str) -> String {
        format!("{}\n\n{}", scene_prompt, self.suffix())
    }
}

impl fmt::Display for ImageStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ImageStyle {
    type Err = ImageStyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doodle" => Ok(ImageStyle::Doodle),
            "realistic" => Ok(ImageStyle::Realistic),
            _ => Err(ImageStyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown image style: {0}")]
pub struct ImageStyleParseError(String);

/// Frame shape requested from the image model, rendered as `W:H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// 16:9, the storyboard frame
    pub const LANDSCAPE: AspectRatio = AspectRatio {
        width: 16,
        height: 9,
    };
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parse() {
        assert_eq!("doodle".parse::<ImageStyle>().unwrap(), ImageStyle::Doodle);
        assert_eq!(
            " REALISTIC ".parse::<ImageStyle>().unwrap(),
            ImageStyle::Realistic
        );
        assert!("watercolor".parse::<ImageStyle>().is_err());
    }

    #[test]
    fn test_style_suffix_is_deterministic() {
        let prompt = ImageStyle::Doodle.apply("a crowded harbor at dawn");
        assert!(prompt.starts_with("a crowded harbor at dawn\n\n"));
        assert!(prompt.ends_with(ImageStyle::Doodle.suffix()));
        assert_eq!(prompt, ImageStyle::Doodle.apply("a crowded harbor at dawn"));
        assert_ne!(ImageStyle::Doodle.suffix(), ImageStyle::Realistic.suffix());
    }

    #[test]
    fn test_landscape_renders_as_ratio() {
        assert_eq!(AspectRatio::LANDSCAPE.to_string(), "16:9");
    }
}
