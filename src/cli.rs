use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Filter directive for tracing; CRITICAL has no level of its own.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "jimaku-dl")]
#[command(version)]
#[command(about = "Download Japanese subtitles for anime from Jimaku, optionally syncing and playing them")]
pub struct Cli {
    /// Video files or directories to process
    #[arg(required = true)]
    pub media_paths: Vec<PathBuf>,

    /// Directory to save subtitles to (defaults to the media's directory)
    #[arg(short = 'd', long = "dest")]
    pub dest: Option<PathBuf>,

    /// Launch the player with the downloaded subtitle
    #[arg(short = 'p', long)]
    pub play: bool,

    /// Sync subtitle timing to the video; runs in the background with --play
    #[arg(short = 's', long)]
    pub sync: bool,

    /// Jimaku API token (or set JIMAKU_API_TOKEN)
    #[arg(short = 't', long)]
    pub token: Option<String>,

    /// Logging level
    #[arg(short = 'l', long = "log-level", value_enum, default_value = "INFO", ignore_case = true)]
    pub log_level: LogLevel,

    /// AniList ID to use instead of searching by title
    #[arg(short = 'a', long = "anilist-id")]
    pub anilist_id: Option<u64>,

    /// Recursively scan directories for video files
    #[arg(short = 'r', long = "recursive")]
    pub recursive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "jimaku-dl",
            "-d",
            "/tmp/subs",
            "-p",
            "-s",
            "-a",
            "116",
            "--log-level",
            "debug",
            "/videos/Bleach - 01.mkv",
        ])
        .unwrap();

        assert_eq!(cli.media_paths, vec![PathBuf::from("/videos/Bleach - 01.mkv")]);
        assert_eq!(cli.dest, Some(PathBuf::from("/tmp/subs")));
        assert!(cli.play && cli.sync);
        assert_eq!(cli.anilist_id, Some(116));
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(!cli.recursive);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["jimaku-dl", "show"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.token, None);
        assert!(!cli.play && !cli.sync);
    }

    #[test]
    fn test_media_path_required() {
        assert!(Cli::try_parse_from(["jimaku-dl"]).is_err());
        assert!(Cli::try_parse_from(["jimaku-dl", "-l", "VERBOSE", "x"]).is_err());
    }

    #[test]
    fn test_critical_maps_to_error() {
        assert_eq!(LogLevel::Critical.directive(), "error");
        assert_eq!(LogLevel::Warning.directive(), "warn");
    }
}
