use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::models::{CatalogEntry, SubtitleCandidate};
use crate::error::{Error, Result};
use crate::infra::SubtitleHost;
use crate::media::parser;
use crate::menu::{Menu, SelectMode};

/// Picks and downloads subtitle files for a catalog entry.
pub struct SubtitleAcquirer<'a> {
    host: &'a dyn SubtitleHost,
    menu: &'a dyn Menu,
}

impl<'a> SubtitleAcquirer<'a> {
    pub fn new(host: &'a dyn SubtitleHost, menu: &'a dyn Menu) -> Self {
        Self { host, menu }
    }

    /// `mode` is `Multi` only in directory mode. Files already written stay
    /// on disk when a later transfer fails.
    pub fn acquire(
        &self,
        entry: &CatalogEntry,
        episode: Option<u32>,
        dest_dir: &Path,
        mode: SelectMode,
    ) -> Result<Vec<PathBuf>> {
        let entries = self.host.entries(entry.id).map_err(Error::SubtitleHost)?;
        if entries.is_empty() {
            return Err(Error::NoSubtitles(entry.id));
        }

        let labels: Vec<String> = entries.iter().map(|e| e.label.clone()).collect();
        let picked = self.menu.select_one(
            &format!("Select subtitle entry for {}", entry.display_title),
            &labels,
        )?;
        let subtitle_entry = &entries[picked];
        tracing::debug!(
            "Selected entry {} ({})",
            subtitle_entry.entry_id,
            subtitle_entry.label
        );

        let files = self
            .host
            .files(subtitle_entry.entry_id)
            .map_err(Error::SubtitleHost)?;
        if files.is_empty() {
            return Err(Error::NoSubtitles(entry.id));
        }

        let files = order_by_episode(files, episode);
        let chosen: Vec<&SubtitleCandidate> = if files.len() == 1 {
            vec![&files[0]]
        } else {
            let labels: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
            self.menu
                .select("Select subtitle file(s)", &labels, mode)?
                .into_iter()
                .map(|i| &files[i])
                .collect()
        };

        fs::create_dir_all(dest_dir)?;
        let mut downloaded = Vec::with_capacity(chosen.len());
        for candidate in chosen {
            let path = self.download_one(candidate, dest_dir)?;
            println!("Downloaded {}", path.display());
            downloaded.push(path);
        }
        Ok(downloaded)
    }

    fn download_one(&self, candidate: &SubtitleCandidate, dest_dir: &Path) -> Result<PathBuf> {
        let file_name = safe_file_name(&candidate.file_name);
        let path = find_unique_filename(dest_dir, &file_name);
        tracing::info!("Downloading {} to {}", candidate.file_name, path.display());

        let download_error = |cause: anyhow::Error| Error::Download {
            file_name: candidate.file_name.clone(),
            cause,
        };
        let mut file = File::create(&path).map_err(|e| download_error(e.into()))?;
        self.host
            .download(candidate, &mut file)
            .map_err(download_error)?;
        file.flush().map_err(|e| download_error(e.into()))?;
        Ok(path)
    }
}

/// Files naming `episode` first, then the rest; the host's order is kept
/// inside each group.
pub fn order_by_episode(
    files: Vec<SubtitleCandidate>,
    episode: Option<u32>,
) -> Vec<SubtitleCandidate> {
    let Some(episode) = episode else {
        return files;
    };
    let (mut matching, rest): (Vec<_>, Vec<_>) = files
        .into_iter()
        .partition(|f| parser::episode_number(&f.file_name) == Some(episode));
    matching.extend(rest);
    matching
}

/// Never overwrites: `name.srt` becomes `name (1).srt`, `name (2).srt`, ...
pub fn find_unique_filename(directory: &Path, base_filename: &str) -> PathBuf {
    let mut path = directory.join(base_filename);
    let mut counter = 1;

    while path.exists() {
        let base = Path::new(base_filename);
        let stem = base
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("subtitle");
        let new_filename = match base.extension().and_then(|s| s.to_str()) {
            Some(extension) => format!("{stem} ({counter}).{extension}"),
            None => format!("{stem} ({counter})"),
        };
        path = directory.join(new_filename);
        counter += 1;
    }

    path
}

fn safe_file_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if name.is_empty() || name == "." || name == ".." {
        "subtitle.srt".to_string()
    } else {
        name.to_string()
    }
}
