use std::path::PathBuf;
use thiserror::Error;

/// Failures of one pipeline stage for one media reference.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not resolve '{title}' to an AniList entry: {reason}")]
    Resolution { title: String, reason: String },

    #[error("no subtitles found for AniList ID {0}")]
    NoSubtitles(u64),

    #[error("selection cancelled")]
    SelectionCancelled,

    #[error("failed to download '{file_name}': {cause:#}")]
    Download {
        file_name: String,
        cause: anyhow::Error,
    },

    #[error("subtitle sync failed for {}: {reason}", .subtitle.display())]
    SyncFailure { subtitle: PathBuf, reason: String },

    #[error("player '{player}' could not be started: {source}")]
    PlayerUnavailable {
        player: String,
        #[source]
        source: std::io::Error,
    },

    #[error("subtitle host query failed: {0:#}")]
    SubtitleHost(anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
