//! Music playback
//!
//! Search (`yt-dlp`) and playback (an external player process) sit behind
//! the [`MediaBackend`] trait so the router can be exercised with fakes.

mod search;
mod session;

use async_trait::async_trait;

pub use search::{MediaSearch, Track, YtDlpSearch, parse_search_output};
pub use session::{
    MediaSession, MediaStatus, NOTHING_PLAYING_MESSAGE, PlayerCommand, STOPPED_MESSAGE,
    default_players,
};

/// Media boundary used by the router and the web status endpoint
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Search for `query` and start playing the best match
    ///
    /// Never fails; returns whether playback started and a message.
    async fn search_and_play(&self, query: &str) -> (bool, String);

    /// Stop playback; idempotent
    async fn stop(&self) -> (bool, String);

    /// Whether a player is currently running
    fn is_playing(&self) -> bool;
}

/// YouTube search plus a local player process
pub struct MusicPlayer {
    search: Box<dyn MediaSearch>,
    session: MediaSession,
}

impl MusicPlayer {
    #[must_use]
    pub fn new(search: Box<dyn MediaSearch>, session: MediaSession) -> Self {
        Self { search, session }
    }

    #[must_use]
    pub const fn session(&self) -> &MediaSession {
        &self.session
    }
}

impl Default for MusicPlayer {
    fn default() -> Self {
        Self::new(Box::new(YtDlpSearch::new()), MediaSession::new())
    }
}

#[async_trait]
impl MediaBackend for MusicPlayer {
    async fn search_and_play(&self, query: &str) -> (bool, String) {
        let track = match self.search.search(query).await {
            Ok(Some(track)) => track,
            Ok(None) => return (false, "Could not find the song on YouTube".to_string()),
            Err(e) => {
                tracing::warn!(query, error = %e, "music search failed");
                return (false, format!("Error: {e}"));
            }
        };

        match self.session.play(&track.url, &track.title).await {
            Ok(()) => (true, format!("Playing {}", track.title)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to start playback");
                (false, "Failed to start playback".to_string())
            }
        }
    }

    async fn stop(&self) -> (bool, String) {
        self.session.stop().await
    }

    fn is_playing(&self) -> bool {
        self.session.is_playing()
    }
}
