//! Command-line arguments of the `storyreel` binary.

use clap::Parser;
use storyreel_models::ImageStyle;

/// StoryReel - turn trending videos into narrated, illustrated short scripts
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "storyreel")]
#[command(about = "Search videos, pick four, and script them as illustrated shorts", long_about = None)]
#[command(version)]
pub struct CliArgs {
    /// Search term; several words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub terms: Vec<String>,

    /// Generate every scene image for each scripted item
    #[arg(long)]
    pub images: bool,

    /// Generate narration for each item with a ready script
    #[arg(long)]
    pub audio: bool,

    /// Illustration style (doodle or realistic); overrides `IMAGE_STYLE`
    #[arg(long)]
    pub style: Option<ImageStyle>,
}

impl CliArgs {
    /// The search term as typed, words joined and trimmed.
    pub fn search_term(&self) -> String {
        self.terms.join(" ").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("storyreel").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_term_and_flags() {
        let parsed = parse(&["--images", "seoul", "subway", "--style", "realistic"]).unwrap();
        assert_eq!(parsed.search_term(), "seoul subway");
        assert!(parsed.images);
        assert!(!parsed.audio);
        assert_eq!(parsed.style, Some(ImageStyle::Realistic));

        let parsed = parse(&["news", "--audio", "--style=doodle"]).unwrap();
        assert!(parsed.audio);
        assert_eq!(parsed.style, Some(ImageStyle::Doodle));
        assert_eq!(parsed.search_term(), "news");
    }

    #[test]
    fn test_parse_errors() {
        use clap::error::ErrorKind;

        assert_eq!(
            parse(&["--images"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
        assert!(parse(&["news", "--style"]).is_err());
        assert_eq!(
            parse(&["news", "--style", "watercolor"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["news", "--verbose"]).unwrap_err().kind(),
            ErrorKind::UnknownArgument
        );
    }

    #[test]
    fn test_command_definition_is_valid() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}
