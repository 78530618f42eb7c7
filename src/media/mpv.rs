use anyhow::{bail, Context};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock, RwLock};
use std::time::Duration;

use crate::error::{Error, Result};

static SUB_TRACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--sid=(\d+).*\[([^\]]+)\]\s*$").unwrap());
static AUDIO_TRACK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"--aid=(\d+)").unwrap());

const SOCKET_WAIT: Duration = Duration::from_secs(3);

/// Starts the external player without waiting for it.
pub struct PlaybackLauncher {
    player: String,
    launches: AtomicUsize,
}

impl PlaybackLauncher {
    pub fn new(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            launches: AtomicUsize::new(0),
        }
    }

    /// Number of launch attempts so far.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn launch(&self, video: &Path, subtitle: &Path) -> Result<PlaybackSession> {
        let (sid, aid) = self.probe_tracks(video, subtitle);

        let mut command = Command::new(&self.player);
        command
            .arg(video)
            .arg(prefixed("--sub-file=", subtitle))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(sid) = sid {
            command.arg(format!("--sid={sid}"));
        }
        if let Some(aid) = aid {
            command.arg(format!("--aid={aid}"));
        }

        // One socket per player, so a hand-off only reaches its own session.
        let launch = self.launches.fetch_add(1, Ordering::SeqCst);
        let ipc_socket = cfg!(unix).then(|| {
            std::env::temp_dir().join(format!(
                "jimaku-dl-mpv-{}-{launch}.sock",
                std::process::id()
            ))
        });
        if let Some(socket) = &ipc_socket {
            let _ = std::fs::remove_file(socket);
            command.arg(prefixed("--input-ipc-server=", socket));
        }

        let mut child = command.spawn().map_err(|source| Error::PlayerUnavailable {
            player: self.player.clone(),
            source,
        })?;
        tracing::info!("Started {} (pid {})", self.player, child.id());

        // Reap the player when it exits; its status is not reported.
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        Ok(PlaybackSession::new(video, subtitle, ipc_socket))
    }

    /// Asks the player which track IDs the subtitle and Japanese audio get.
    /// Any failure just means no explicit track selection.
    fn probe_tracks(&self, video: &Path, subtitle: &Path) -> (Option<u32>, Option<u32>) {
        let output = Command::new(&self.player)
            .arg("--frames=0")
            .arg(prefixed("--sub-file=", subtitle))
            .arg(video)
            .stdin(Stdio::null())
            .output();
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!("Track probe failed: {e}");
                return (None, None);
            }
        };

        let listing = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let subtitle_name = subtitle
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tracks = parse_track_listing(&listing, &subtitle_name);
        tracing::debug!("Probed tracks: sid={:?} aid={:?}", tracks.0, tracks.1);
        tracks
    }
}

/// Picks `(sid, aid)` out of the player's track listing: the subtitle track
/// named `subtitle_name`, and the Japanese audio track or else the first one.
pub fn parse_track_listing(listing: &str, subtitle_name: &str) -> (Option<u32>, Option<u32>) {
    let mut sid = None;
    let mut japanese_aid = None;
    let mut first_aid = None;

    for line in listing.lines() {
        if let Some(caps) = SUB_TRACK_RE.captures(line) {
            if sid.is_none() && caps[2].trim() == subtitle_name {
                sid = caps[1].parse().ok();
            }
            continue;
        }
        if let Some(caps) = AUDIO_TRACK_RE.captures(line) {
            let id: Option<u32> = caps[1].parse().ok();
            if first_aid.is_none() {
                first_aid = id;
            }
            let lower = line.to_lowercase();
            if japanese_aid.is_none() && (lower.contains("japanese") || lower.contains("jpn")) {
                japanese_aid = id;
            }
        }
    }

    (sid, japanese_aid.or(first_aid))
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path);
    arg
}

/// A running player and the subtitle it shows. Clones share state, so the
/// background sync worker and the pipeline see the same session.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    video_path: PathBuf,
    current_subtitle: RwLock<PathBuf>,
    swapped: AtomicBool,
    ipc_socket: Option<PathBuf>,
}

impl PlaybackSession {
    pub fn new(video: &Path, subtitle: &Path, ipc_socket: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(SessionState {
                video_path: video.to_path_buf(),
                current_subtitle: RwLock::new(subtitle.to_path_buf()),
                swapped: AtomicBool::new(false),
                ipc_socket,
            }),
        }
    }

    pub fn video_path(&self) -> &Path {
        &self.inner.video_path
    }

    pub fn ipc_socket(&self) -> Option<&Path> {
        self.inner.ipc_socket.as_deref()
    }

    pub fn current_subtitle(&self) -> PathBuf {
        match self.inner.current_subtitle.read() {
            Ok(path) => path.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Points the session at `synced`, which must already be complete at its
    /// final path, and asks the player to load it. Only the first call takes
    /// effect.
    pub fn hand_off(&self, synced: &Path) -> bool {
        if self.inner.swapped.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                "Subtitle for {} was already swapped, ignoring {}",
                self.video_path().display(),
                synced.display()
            );
            return false;
        }

        match self.inner.current_subtitle.write() {
            Ok(mut path) => *path = synced.to_path_buf(),
            Err(poisoned) => *poisoned.into_inner() = synced.to_path_buf(),
        }

        if let Some(socket) = self.ipc_socket() {
            match send_sub_add(socket, synced) {
                Ok(()) => println!("Loaded synced subtitle into player: {}", synced.display()),
                Err(e) => tracing::warn!(
                    "Could not reload subtitle in player ({e:#}); load {} manually",
                    synced.display()
                ),
            }
        }
        true
    }
}

#[cfg(unix)]
fn send_sub_add(socket: &Path, subtitle: &Path) -> anyhow::Result<()> {
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::time::Instant;

    let deadline = Instant::now() + SOCKET_WAIT;
    while !socket.exists() {
        if Instant::now() >= deadline {
            bail!("IPC socket {} did not appear", socket.display());
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    let mut stream = UnixStream::connect(socket)
        .with_context(|| format!("Failed to connect to {}", socket.display()))?;
    stream.set_write_timeout(Some(SOCKET_WAIT))?;
    let command = serde_json::json!({
        "command": ["sub-add", subtitle.to_string_lossy(), "select"]
    });
    writeln!(stream, "{command}").context("Failed to send sub-add")?;
    Ok(())
}

#[cfg(not(unix))]
fn send_sub_add(socket: &Path, _subtitle: &Path) -> anyhow::Result<()> {
    bail!("runtime reload over {} is not supported here", socket.display())
}
