//! External player process tracking
//!
//! At most one player process runs at a time. Starting playback stops the
//! previous process first; stopping is terminate, short grace period, kill.

use std::process::Stdio;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::{Error, Result};

/// How long a terminated player gets to exit before it is killed
const STOP_GRACE: Duration = Duration::from_secs(2);

pub const STOPPED_MESSAGE: &str = "Music stopped.";
pub const NOTHING_PLAYING_MESSAGE: &str = "No music is playing.";

/// Whether a player process is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaStatus {
    Stopped,
    Playing,
}

/// Command line of one player backend; the stream URL is appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    #[must_use]
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Player backends in preference order
#[must_use]
pub fn default_players() -> Vec<PlayerCommand> {
    vec![
        PlayerCommand::new("mpv", &["--no-video", "--really-quiet"]),
        PlayerCommand::new("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
        PlayerCommand::new("cvlc", &["--play-and-exit", "--quiet"]),
    ]
}

struct Playback {
    child: Child,
    title: String,
}

/// Tracks the single active player process
pub struct MediaSession {
    players: Vec<PlayerCommand>,
    current: Mutex<Option<Playback>>,
    /// Serializes play/stop so two players never overlap
    ops: tokio::sync::Mutex<()>,
}

impl MediaSession {
    #[must_use]
    pub fn new() -> Self {
        Self::with_players(default_players())
    }

    #[must_use]
    pub fn with_players(players: Vec<PlayerCommand>) -> Self {
        Self {
            players,
            current: Mutex::new(None),
            ops: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Playback>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start playing `url`, stopping any earlier playback first
    ///
    /// # Errors
    ///
    /// Returns error if no player backend could be launched
    pub async fn play(&self, url: &str, title: &str) -> Result<()> {
        let _guard = self.ops.lock().await;

        let previous = self.lock().take();
        if let Some(previous) = previous {
            tracing::debug!(title = %previous.title, "stopping previous playback");
            terminate(previous.child).await;
        }

        for player in &self.players {
            let spawned = Command::new(&player.program)
                .args(&player.args)
                .arg(url)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn();

            match spawned {
                Ok(child) => {
                    tracing::info!(
                        player = %player.program,
                        pid = child.id().unwrap_or_default(),
                        title,
                        "playback started"
                    );
                    *self.lock() = Some(Playback {
                        child,
                        title: title.to_string(),
                    });
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(player = %player.program, error = %e, "player unavailable");
                }
            }
        }

        tracing::warn!("no media player found (install mpv, ffplay or vlc)");
        Err(Error::Media("no media player found".to_string()))
    }

    /// Stop playback; safe to call when nothing is playing
    ///
    /// Returns whether a live process was stopped and a user-facing message.
    pub async fn stop(&self) -> (bool, String) {
        let _guard = self.ops.lock().await;

        let Some(mut playback) = self.lock().take() else {
            return (false, NOTHING_PLAYING_MESSAGE.to_string());
        };

        if matches!(playback.child.try_wait(), Ok(Some(_))) {
            tracing::debug!(title = %playback.title, "player had already exited");
            return (false, NOTHING_PLAYING_MESSAGE.to_string());
        }

        terminate(playback.child).await;
        tracing::info!(title = %playback.title, "music stopped");
        (true, STOPPED_MESSAGE.to_string())
    }

    /// True while the tracked player process is still alive
    ///
    /// A process that exited on its own is reaped here.
    pub fn is_playing(&self) -> bool {
        let mut current = self.lock();
        let alive = current
            .as_mut()
            .is_some_and(|p| matches!(p.child.try_wait(), Ok(None)));
        if !alive {
            *current = None;
        }
        alive
    }

    pub fn status(&self) -> MediaStatus {
        if self.is_playing() {
            MediaStatus::Playing
        } else {
            MediaStatus::Stopped
        }
    }

    /// Title of the track being played, if any
    pub fn now_playing(&self) -> Option<String> {
        if !self.is_playing() {
            return None;
        }
        self.lock().as_ref().map(|p| p.title.clone())
    }
}

impl Default for MediaSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Ask the process to exit, then kill it if it ignores the request
async fn terminate(mut child: Child) {
    if request_exit(&child) {
        if let Ok(Ok(status)) = tokio::time::timeout(STOP_GRACE, child.wait()).await {
            tracing::debug!(%status, "player terminated");
            return;
        }
        tracing::debug!("player ignored SIGTERM, killing");
    }

    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "failed to kill player");
    }
}

/// Send SIGTERM; false if the signal could not be delivered
#[cfg(unix)]
#[allow(unsafe_code)]
fn request_exit(child: &Child) -> bool {
    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return false;
    };
    // SAFETY: `pid` belongs to a child we spawned and have not reaped
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
const fn request_exit(_child: &Child) -> bool {
    false
}
