use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// External subtitle timing tool. Implementations must be shareable with a
/// background worker thread.
pub trait SyncTool: Send + Sync {
    /// Writes `input` retimed against `video` to `output`. `Ok` only when the
    /// tool exited zero.
    fn synchronize(&self, video: &Path, input: &Path, output: &Path) -> Result<()>;
}

pub struct FfsubsyncTool {
    command: String,
}

impl FfsubsyncTool {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SyncTool for FfsubsyncTool {
    fn synchronize(&self, video: &Path, input: &Path, output: &Path) -> Result<()> {
        tracing::debug!(
            "Running {} {} -i {} -o {}",
            self.command,
            video.display(),
            input.display(),
            output.display()
        );
        let sync_output = Command::new(&self.command)
            .arg(video)
            .arg("-i")
            .arg(input)
            .arg("-o")
            .arg(output)
            .output();

        let sync_output = match sync_output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                bail!(
                    "{} not found. Please install it and ensure it's in your PATH.",
                    self.command
                );
            }
            Err(e) => {
                bail!("Failed to execute {}: {e}", self.command);
            }
        };

        if !sync_output.status.success() {
            let stderr = String::from_utf8_lossy(&sync_output.stderr);
            bail!("{} exited with {}: {}", self.command, sync_output.status, stderr.trim());
        }

        Ok(())
    }
}

/// `episode.ja.srt` syncs to `episode.ja.synced.srt` beside it.
pub fn synced_output_path(subtitle: &Path) -> PathBuf {
    let stem = subtitle
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subtitle".to_string());
    let file_name = match subtitle.extension() {
        Some(ext) => format!("{stem}.synced.{}", ext.to_string_lossy()),
        None => format!("{stem}.synced"),
    };
    subtitle.with_file_name(file_name)
}
