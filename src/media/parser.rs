//! Filename and directory-name parsing into (title, season, episode).
//!
//! Rules are tried in order against the basename with any leading
//! `[Group]` tags removed; the first match wins. Names that match nothing
//! still produce a reference whose title is the basename with release tags
//! stripped.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::domain::models::{MediaReference, ParseRule};

const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "webm", "m4v", "mov", "ts", "wmv"];

const DEFAULT_RELEASE_TOKENS: &[&str] = &[
    "2160p", "1080p", "720p", "576p", "480p", "360p", "4k", "uhd", "hdr", "hdr10", "x264", "x265",
    "h264", "h265", "hevc", "avc", "av1", "vp9", "aac", "ac3", "eac3", "flac", "opus", "dts",
    "truehd", "10bit", "8bit", "hi10p", "web", "web-dl", "webdl", "webrip", "bluray", "blu-ray",
    "bdrip", "brrip", "bd", "dvd", "dvdrip", "hdtv", "remux", "dual-audio", "multi-sub",
    "proper", "repack",
];

static LEADING_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\s*[\[\{][^\]\}]*[\]\}]\s*)+").unwrap());

static DASHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.+?)\s+-\s+[Ss](?P<season>\d{1,2})[Ee](?P<episode>\d{1,4})(?:v\d+)?(?:\D|$)")
        .unwrap()
});

static DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.+?)\.[Ss](?P<season>\d{1,2})[Ee](?P<episode>\d{1,4})(?:v\d+)?(?:\.|$)")
        .unwrap()
});

static UNDERSCORED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.+?)_[Ss](?P<season>\d{1,2})[Ee](?P<episode>\d{1,4})(?:v\d+)?(?:_|$)")
        .unwrap()
});

static LOOSE_SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<title>.*?)[\s._-]*\bS(?P<season>\d{1,2})E(?P<episode>\d{1,4})").unwrap()
});

static ABSOLUTE_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<title>.+?)\s+-\s+(?:E|Ep\s*|Episode\s*)?(?P<episode>\d{1,4})(?:v\d+)?(?:[\s\[\(]|$)",
    )
    .unwrap()
});

static SEASON_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:season[\s._-]*|s)(\d{1,2})$").unwrap());

static TITLE_WITH_SEASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<title>.+?)[\s._-]+(?:season[\s._-]*|s)(?P<season>\d{1,2})$").unwrap()
});

static SQUARE_GROUPS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[\{][^\]\}]*[\]\}]").unwrap());

static ROUND_GROUPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[A-Za-z0-9]*[A-Za-z][A-Za-z0-9]*$").unwrap());

/// Tried in order; first match wins.
static EPISODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // S01E05
        Regex::new(r"(?i)\bS\d{1,2}E(\d{1,4})").unwrap(),
        // Episode 02, Ep 04, EP01
        Regex::new(r"(?i)\bEp(?:isode)?[\s._-]*(\d{1,4})\b").unwrap(),
        // E03
        Regex::new(r"(?i)(?:^|[\s._\[-])E(\d{1,4})(?:v\d+)?\b").unwrap(),
        // #05
        Regex::new(r"#(\d{1,4})\b").unwrap(),
        // Show - 06v2 [tags]
        Regex::new(r"\s-\s(\d{1,4})(?:v\d+)?(?:[\s\[\(.]|$)").unwrap(),
    ]
});

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s._-])(\d{1,4})(?:v\d+)?$").unwrap());

#[derive(Debug, Clone)]
pub struct PathParser {
    release_tokens: Vec<String>,
    video_extensions: Vec<String>,
}

impl Default for PathParser {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl PathParser {
    /// Built-in token and extension lists, extended with configured ones.
    pub fn new(extra_release_tokens: &[String], extra_video_extensions: &[String]) -> Self {
        let release_tokens = DEFAULT_RELEASE_TOKENS
            .iter()
            .map(|t| t.to_string())
            .chain(extra_release_tokens.iter().map(|t| t.to_lowercase()))
            .collect();
        let video_extensions = DEFAULT_VIDEO_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .chain(
                extra_video_extensions
                    .iter()
                    .map(|e| e.trim_start_matches('.').to_lowercase()),
            )
            .collect();
        Self {
            release_tokens,
            video_extensions,
        }
    }

    pub fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.video_extensions.iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }

    /// Never fails: a name that matches no convention yields its cleaned
    /// basename as the title with no season or episode.
    pub fn parse(&self, path: &Path) -> MediaReference {
        let reference = if path.is_dir() {
            self.parse_directory(path)
        } else {
            self.parse_file(path)
        };

        if reference.rule == ParseRule::Fallback {
            tracing::warn!(
                "Could not parse season/episode from {}; using title '{}'",
                path.display(),
                reference.title
            );
        } else {
            tracing::debug!(
                "Parsed {} as '{}' S{:?}E{:?} ({:?})",
                path.display(),
                reference.title,
                reference.season,
                reference.episode,
                reference.rule
            );
        }
        reference
    }

    fn parse_file(&self, path: &Path) -> MediaReference {
        let file_name = file_name_of(path);
        let stem = if self.is_video(path) {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.clone())
        } else {
            strip_extension(&file_name).to_string()
        };
        let name = LEADING_TAGS.replace(&stem, "").into_owned();

        let separated = [
            (&*DASHED, ParseRule::Dashed),
            (&*DOTTED, ParseRule::Dotted),
            (&*UNDERSCORED, ParseRule::Underscored),
        ];
        for (pattern, rule) in separated {
            if let Some(caps) = pattern.captures(&name) {
                let title = clean_title(&caps["title"]);
                if title.is_empty() {
                    continue;
                }
                return self.reference(
                    path,
                    title,
                    caps["season"].parse().ok(),
                    caps["episode"].parse().ok(),
                    rule,
                );
            }
        }

        if let Some(reference) = self.parse_in_season_directory(path, &name) {
            return reference;
        }

        if let Some(caps) = LOOSE_SEASON_EPISODE.captures(&name) {
            let title = self.strip_release_tags(&caps["title"]);
            if !title.is_empty() {
                return self.reference(
                    path,
                    title,
                    caps["season"].parse().ok(),
                    caps["episode"].parse().ok(),
                    ParseRule::LooseSeasonEpisode,
                );
            }
        }

        if let Some(caps) = ABSOLUTE_EPISODE.captures(&name) {
            let title = clean_title(&caps["title"]);
            if !title.is_empty() {
                return self.reference(
                    path,
                    title,
                    None,
                    caps["episode"].parse().ok(),
                    ParseRule::AbsoluteEpisode,
                );
            }
        }

        let title = self.fallback_title(&stem);
        self.reference(path, title, None, None, ParseRule::Fallback)
    }

    /// `.../Show Name/Season N/Show Name - EE [...]`
    fn parse_in_season_directory(&self, path: &Path, name: &str) -> Option<MediaReference> {
        let parent = path.parent()?;
        let season = season_segment(parent)?;
        let episode = episode_number(name)?;

        let title = parent
            .parent()
            .map(file_name_of)
            .map(|show| self.strip_release_tags(&show))
            .filter(|show| !show.is_empty())
            .or_else(|| {
                ABSOLUTE_EPISODE
                    .captures(name)
                    .map(|caps| clean_title(&caps["title"]))
            })
            .filter(|title| !title.is_empty())?;

        Some(self.reference(
            path,
            title,
            Some(season),
            Some(episode),
            ParseRule::SeasonDirectory,
        ))
    }

    fn parse_directory(&self, path: &Path) -> MediaReference {
        let dir_name = file_name_of(path);

        if let Some(season) = season_segment(path) {
            let show = path
                .ancestors()
                .skip(1)
                .find(|ancestor| season_segment(ancestor).is_none())
                .map(file_name_of)
                .map(|name| self.strip_release_tags(&name))
                .filter(|name| !name.is_empty());
            if let Some(title) = show {
                return self.reference(path, title, Some(season), None, ParseRule::Directory);
            }
        }

        let title = self.strip_release_tags(&dir_name);
        if title.is_empty() {
            let title = clean_title(&dir_name);
            return self.reference(path, title, None, None, ParseRule::Fallback);
        }

        if let Some(caps) = TITLE_WITH_SEASON.captures(&title) {
            return self.reference(
                path,
                clean_title(&caps["title"]),
                caps["season"].parse().ok(),
                None,
                ParseRule::Directory,
            );
        }
        self.reference(path, title, None, None, ParseRule::Directory)
    }

    fn fallback_title(&self, stem: &str) -> String {
        let title = self.strip_release_tags(stem);
        if !title.is_empty() {
            return title;
        }
        let title = clean_title(stem);
        if title.is_empty() {
            stem.to_string()
        } else {
            title
        }
    }

    /// Removes bracketed groups, parenthesized release info and known
    /// release tokens, then normalizes separators.
    fn strip_release_tags(&self, raw: &str) -> String {
        let without_square = SQUARE_GROUPS.replace_all(raw, " ");
        let without_round = ROUND_GROUPS.replace_all(&without_square, |caps: &regex::Captures| {
            let inner = caps[1].replace(['.', '_'], " ");
            if inner.split_whitespace().any(|word| self.is_release_token(word)) {
                " ".to_string()
            } else {
                caps[0].to_string()
            }
        });
        let spaced = without_round.replace(['.', '_'], " ");
        let kept: Vec<&str> = spaced
            .split_whitespace()
            .filter(|word| !self.is_release_token(word))
            .collect();
        clean_title(&kept.join(" "))
    }

    fn is_release_token(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.release_tokens.iter().any(|token| *token == word)
    }

    fn reference(
        &self,
        path: &Path,
        title: String,
        season: Option<u32>,
        episode: Option<u32>,
        rule: ParseRule,
    ) -> MediaReference {
        MediaReference {
            raw_path: PathBuf::from(path),
            title,
            season,
            episode,
            is_directory: rule == ParseRule::Directory || path.is_dir(),
            rule,
        }
    }
}

/// Extracts an episode number from a media or subtitle file name.
pub fn episode_number(name: &str) -> Option<u32> {
    let name = strip_extension(name);

    let from_patterns = EPISODE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    });
    if from_patterns.is_some() {
        return from_patterns;
    }

    let untagged = SQUARE_GROUPS.replace_all(name, " ");
    let untagged = ROUND_GROUPS.replace_all(&untagged, " ");
    TRAILING_NUMBER
        .captures(untagged.trim())
        .and_then(|caps| caps[1].parse().ok())
}

/// Collapses whitespace, turns `.` and `_` into spaces and trims dangling dashes.
pub fn clean_title(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

fn season_segment(path: &Path) -> Option<u32> {
    let name = path.file_name()?.to_str()?;
    SEASON_SEGMENT
        .captures(name.trim())
        .and_then(|caps| caps[1].parse().ok())
}

fn strip_extension(name: &str) -> &str {
    match EXTENSION.find(name) {
        Some(m) if m.start() > 0 && m.as_str().len() <= 5 => &name[..m.start()],
        _ => name,
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
