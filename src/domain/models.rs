use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which filename convention produced a [`MediaReference`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRule {
    /// `Title - SxxEyy - Episode Name [tags]`
    Dashed,
    /// `Title.SxxEyy.tags`
    Dotted,
    /// `Title_SxxEyy_tags`
    Underscored,
    /// `.../Show Name/Season N/Show Name - EE`
    SeasonDirectory,
    /// `SxxEyy` somewhere in a name that fits none of the separated forms
    LooseSeasonEpisode,
    /// `[Group] Title - EE [tags]` with no season marker
    AbsoluteEpisode,
    /// A directory name, optionally with an enclosing `Season N` segment
    Directory,
    /// Nothing matched; the title is the cleaned basename
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub raw_path: PathBuf,
    pub title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub is_directory: bool,
    pub rule: ParseRule,
}

impl MediaReference {
    /// Text sent to the catalog search. Later seasons are usually separate
    /// catalog entries, so the season is folded into the query.
    pub fn search_title(&self) -> String {
        match self.season {
            Some(season) if season > 1 => format!("{} Season {season}", self.title),
            _ => self.title.clone(),
        }
    }

    /// Cache key for this reference: the normalized search title.
    pub fn cache_key(&self) -> String {
        normalize_title(&self.search_title())
    }
}

/// Lower-cased, whitespace-collapsed form of a title.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u64,
    pub display_title: String,
}

/// A release/uploader on the subtitle host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub entry_id: u64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCandidate {
    pub entry_id: u64,
    pub file_name: String,
    pub download_url: String,
}
