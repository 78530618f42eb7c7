use anyhow::{bail, Context};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tempfile::Builder;

use crate::error::{Error, Result};
use crate::media::ffsubsync::{synced_output_path, SyncTool};
use crate::media::mpv::PlaybackSession;
use crate::menu::Menu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Foreground,
    Background,
}

/// One timing sync of a subtitle against its video.
#[derive(Debug)]
pub struct SyncJob {
    pub video_path: PathBuf,
    pub input_subtitle_path: PathBuf,
    pub output_subtitle_path: PathBuf,
    pub mode: SyncMode,
    state: SyncState,
}

impl SyncJob {
    pub fn new(video: &Path, subtitle: &Path, mode: SyncMode) -> Self {
        Self {
            video_path: video.to_path_buf(),
            input_subtitle_path: subtitle.to_path_buf(),
            output_subtitle_path: synced_output_path(subtitle),
            mode,
            state: SyncState::Pending,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    fn run(&mut self, tool: &dyn SyncTool) -> Result<PathBuf> {
        self.state = SyncState::Running;
        tracing::info!(
            "Syncing {} against {} ({:?})",
            self.input_subtitle_path.display(),
            self.video_path.display(),
            self.mode
        );
        match self.execute(tool) {
            Ok(()) => {
                self.state = SyncState::Succeeded;
                Ok(self.output_subtitle_path.clone())
            }
            Err(e) => {
                self.state = SyncState::Failed;
                Err(Error::SyncFailure {
                    subtitle: self.input_subtitle_path.clone(),
                    reason: format!("{e:#}"),
                })
            }
        }
    }

    /// The tool writes a sibling temp file which is renamed over the output
    /// only once it is complete, so the output path never holds a partial
    /// file.
    fn execute(&self, tool: &dyn SyncTool) -> anyhow::Result<()> {
        let dir = match self.output_subtitle_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let suffix = self
            .output_subtitle_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staged = Builder::new()
            .prefix(".jimaku-sync-")
            .suffix(&suffix)
            .tempfile_in(dir)
            .context("Failed to create temporary sync output")?;

        tool.synchronize(
            &self.video_path,
            &self.input_subtitle_path,
            staged.path(),
        )?;

        let written = fs::metadata(staged.path()).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            bail!("sync tool produced no output");
        }

        // Temp files are owner-only; the result should be as readable as
        // the subtitle it came from.
        match fs::metadata(&self.input_subtitle_path) {
            Ok(input) => fs::set_permissions(staged.path(), input.permissions())
                .context("Failed to set permissions on synced subtitle")?,
            Err(e) => tracing::debug!("Keeping temp file permissions: {e}"),
        }

        staged
            .persist(&self.output_subtitle_path)
            .with_context(|| {
                format!(
                    "Failed to move synced subtitle to {}",
                    self.output_subtitle_path.display()
                )
            })?;
        Ok(())
    }
}

/// What to do about a sync request once an existing output is considered.
#[derive(Debug)]
pub enum SyncPlan {
    Run(SyncJob),
    Reuse(PathBuf),
    Cancelled,
}

pub struct SyncOrchestrator<'a> {
    tool: Arc<dyn SyncTool>,
    menu: &'a dyn Menu,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(tool: Arc<dyn SyncTool>, menu: &'a dyn Menu) -> Self {
        Self { tool, menu }
    }

    /// Asks whether to reuse, overwrite or skip when a synced file for
    /// `subtitle` already exists. Backing out only skips the sync.
    pub fn prepare(&self, video: &Path, subtitle: &Path, mode: SyncMode) -> SyncPlan {
        let job = SyncJob::new(video, subtitle, mode);
        if !job.output_subtitle_path.exists() {
            return SyncPlan::Run(job);
        }

        let existing = job.output_subtitle_path.display().to_string();
        let choices = vec![
            format!("Reuse existing synced subtitle ({existing})"),
            "Overwrite with a new sync".to_string(),
            "Cancel sync".to_string(),
        ];
        match self.menu.select_one("Synced subtitle already exists", &choices) {
            Ok(0) => {
                tracing::info!("Reusing {existing}");
                SyncPlan::Reuse(job.output_subtitle_path)
            }
            Ok(1) => SyncPlan::Run(job),
            _ => {
                println!("Sync cancelled, keeping the original subtitle.");
                SyncPlan::Cancelled
            }
        }
    }

    /// Blocks until the job finishes and returns the synced path.
    pub fn run_foreground(&self, mut job: SyncJob) -> Result<PathBuf> {
        job.run(self.tool.as_ref())
    }

    /// Runs the job on its own thread. On success the synced file is handed
    /// to `session`; on failure the session keeps its subtitle.
    pub fn spawn_background(
        &self,
        mut job: SyncJob,
        session: Option<PlaybackSession>,
    ) -> SyncHandle {
        let tool = Arc::clone(&self.tool);
        let output_subtitle_path = job.output_subtitle_path.clone();

        let worker = thread::spawn(move || {
            match job.run(tool.as_ref()) {
                Ok(path) => {
                    println!("Synced subtitle saved to {}", path.display());
                    if let Some(session) = session {
                        session.hand_off(&path);
                    }
                }
                Err(e) => tracing::warn!("{e}; keeping the original subtitle"),
            }
            job
        });

        SyncHandle {
            output_subtitle_path,
            worker,
        }
    }
}

pub struct SyncHandle {
    output_subtitle_path: PathBuf,
    worker: JoinHandle<SyncJob>,
}

impl SyncHandle {
    pub fn output_path(&self) -> &Path {
        &self.output_subtitle_path
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    pub fn wait(self) -> SyncState {
        match self.worker.join() {
            Ok(job) => job.state(),
            Err(_) => {
                tracing::error!(
                    "Sync worker for {} panicked",
                    self.output_subtitle_path.display()
                );
                SyncState::Failed
            }
        }
    }
}
