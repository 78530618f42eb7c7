use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::models::{CatalogEntry, MediaReference};
use crate::error::{Error, Result};
use crate::infra::cache::IdentifierCache;
use crate::infra::{CatalogSearch, SubtitleHost};
use crate::media::ffsubsync::SyncTool;
use crate::media::mpv::PlaybackLauncher;
use crate::media::parser::PathParser;
use crate::menu::{Menu, SelectMode};

use super::acquirer::SubtitleAcquirer;
use super::resolver::CatalogResolver;
use super::sync::{SyncHandle, SyncMode, SyncOrchestrator, SyncPlan};

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Download directory; defaults to the directory of each input.
    pub dest: Option<PathBuf>,
    pub play: bool,
    pub sync: bool,
    /// Used as-is instead of searching the catalog.
    pub anilist_id: Option<u64>,
    pub recursive: bool,
}

/// What a run produced. Background syncs may still be running.
#[derive(Default)]
pub struct RunReport {
    pub downloaded: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, Error)>,
    pub background_syncs: Vec<SyncHandle>,
    /// A file given directly on the command line failed.
    pub fatal: bool,
}

impl RunReport {
    pub fn success(&self) -> bool {
        !self.fatal && !self.downloaded.is_empty()
    }
}

pub struct Pipeline<'a> {
    parser: PathParser,
    resolver: CatalogResolver<'a>,
    acquirer: SubtitleAcquirer<'a>,
    sync: SyncOrchestrator<'a>,
    launcher: PlaybackLauncher,
    options: PipelineOptions,
    /// Set once a player has been started; later files are not played.
    player_started: Cell<bool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        parser: PathParser,
        catalog: &'a dyn CatalogSearch,
        host: &'a dyn SubtitleHost,
        menu: &'a dyn Menu,
        sync_tool: Arc<dyn SyncTool>,
        launcher: PlaybackLauncher,
        options: PipelineOptions,
    ) -> Self {
        Self {
            parser,
            resolver: CatalogResolver::new(catalog, menu),
            acquirer: SubtitleAcquirer::new(host, menu),
            sync: SyncOrchestrator::new(sync_tool, menu),
            launcher,
            options,
            player_started: Cell::new(false),
        }
    }

    pub fn run(&self, inputs: &[PathBuf], cache: &mut IdentifierCache) -> RunReport {
        let mut report = RunReport::default();

        for input_path in inputs {
            if input_path.is_dir() {
                self.process_directory(input_path, cache, &mut report);
            } else if input_path.is_file() {
                match self.process_file(input_path, cache, &mut report) {
                    Ok(()) => {}
                    Err(e) => {
                        tracing::error!("Error processing {}: {e}", input_path.display());
                        report.failures.push((input_path.clone(), e));
                        report.fatal = true;
                    }
                }
            } else {
                tracing::error!("Input path does not exist: {}", input_path.display());
                report.failures.push((
                    input_path.clone(),
                    Error::Io(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("{} does not exist", input_path.display()),
                    )),
                ));
                report.fatal = true;
            }
        }

        report
    }

    /// Downloads a subtitle for one video, then syncs and/or plays it.
    pub fn process_file(
        &self,
        video: &Path,
        cache: &mut IdentifierCache,
        report: &mut RunReport,
    ) -> Result<()> {
        println!("Processing: {}", video.display());
        let reference = self.parser.parse(video);
        tracing::debug!("Parsed {:?}", reference);

        let entry = self.resolve(&reference, cache)?;
        let dest = self.destination_for(video.parent());
        let downloaded =
            self.acquirer
                .acquire(&entry, reference.episode, &dest, SelectMode::Single)?;
        report.downloaded.extend(downloaded.iter().cloned());

        if let Some(subtitle) = downloaded.first() {
            self.sync_and_play(video, subtitle, report);
        }
        Ok(())
    }

    /// Each video is its own pipeline; a failure is recorded and the batch
    /// moves on. A directory without videos is treated as a whole series.
    fn process_directory(&self, dir: &Path, cache: &mut IdentifierCache, report: &mut RunReport) {
        let videos = match self.collect_video_files(dir) {
            Ok(videos) => videos,
            Err(e) => {
                tracing::error!("Error scanning {}: {e}", dir.display());
                report.failures.push((dir.to_path_buf(), e));
                return;
            }
        };

        if videos.is_empty() {
            if let Err(e) = self.process_series_directory(dir, cache, report) {
                tracing::error!("Error processing {}: {e}", dir.display());
                report.failures.push((dir.to_path_buf(), e));
            }
            return;
        }

        println!("Found {} video file(s) to process", videos.len());
        for video in videos {
            if let Err(e) = self.process_file(&video, cache, report) {
                tracing::error!("Error processing {}: {e}", video.display());
                report.failures.push((video, e));
            }
            println!();
        }
    }

    fn process_series_directory(
        &self,
        dir: &Path,
        cache: &mut IdentifierCache,
        report: &mut RunReport,
    ) -> Result<()> {
        let reference = self.parser.parse(dir);
        let entry = self.resolve(&reference, cache)?;
        let dest = self.destination_for(Some(dir));
        let downloaded = self
            .acquirer
            .acquire(&entry, None, &dest, SelectMode::Multi)?;
        report.downloaded.extend(downloaded);
        Ok(())
    }

    fn resolve(&self, reference: &MediaReference, cache: &mut IdentifierCache) -> Result<CatalogEntry> {
        match self.options.anilist_id {
            Some(id) => Ok(CatalogEntry {
                id,
                display_title: reference.title.clone(),
            }),
            None => self.resolver.resolve(reference, cache),
        }
    }

    fn destination_for(&self, fallback: Option<&Path>) -> PathBuf {
        match (&self.options.dest, fallback) {
            (Some(dest), _) => dest.clone(),
            (None, Some(dir)) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Sync and playback problems are reported but never undo the download.
    fn sync_and_play(&self, video: &Path, subtitle: &Path, report: &mut RunReport) {
        let play = self.options.play && self.claim_player(video);
        match (self.options.sync, play) {
            (false, false) => {}
            (false, true) => self.play(video, subtitle),
            (true, false) => match self.sync.prepare(video, subtitle, SyncMode::Foreground) {
                SyncPlan::Run(job) => match self.sync.run_foreground(job) {
                    Ok(synced) => println!("Synced subtitle saved to {}", synced.display()),
                    Err(e) => tracing::warn!("{e}; keeping the original subtitle"),
                },
                SyncPlan::Reuse(_) | SyncPlan::Cancelled => {}
            },
            (true, true) => match self.sync.prepare(video, subtitle, SyncMode::Background) {
                SyncPlan::Run(job) => {
                    let session = match self.launcher.launch(video, subtitle) {
                        Ok(session) => Some(session),
                        Err(e) => {
                            tracing::error!("{e}");
                            None
                        }
                    };
                    println!("Syncing subtitle in the background...");
                    report
                        .background_syncs
                        .push(self.sync.spawn_background(job, session));
                }
                SyncPlan::Reuse(synced) => self.play(video, &synced),
                SyncPlan::Cancelled => self.play(video, subtitle),
            },
        }
    }

    /// At most one player per run; a batch plays only its first file.
    fn claim_player(&self, video: &Path) -> bool {
        if self.player_started.replace(true) {
            tracing::warn!(
                "A player was already started; not playing {}",
                video.display()
            );
            return false;
        }
        true
    }

    fn play(&self, video: &Path, subtitle: &Path) {
        if let Err(e) = self.launcher.launch(video, subtitle) {
            tracing::error!("{e}");
        }
    }

    pub fn collect_video_files(&self, dir_path: &Path) -> Result<Vec<PathBuf>> {
        let mut videos = Vec::new();
        self.collect_video_files_helper(dir_path, &mut videos)?;
        videos.sort();
        Ok(videos)
    }

    fn collect_video_files_helper(&self, dir_path: &Path, videos: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(dir_path)? {
            let path = entry?.path();

            if path.is_file() {
                if self.parser.is_video(&path) {
                    videos.push(path);
                }
            } else if path.is_dir() && self.options.recursive {
                self.collect_video_files_helper(&path, videos)?;
            }
        }

        Ok(())
    }
}
