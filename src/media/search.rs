//! Song search via `yt-dlp`

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Upper bound on a single search
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A playable search hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub url: String,
}

/// Finds a streamable audio URL for a free-text query
#[async_trait]
pub trait MediaSearch: Send + Sync {
    /// Best match for `query`, or `None` when nothing was found
    ///
    /// # Errors
    ///
    /// Returns error if the search backend fails or times out
    async fn search(&self, query: &str) -> Result<Option<Track>>;
}

/// [`MediaSearch`] backed by the `yt-dlp` command line tool
#[derive(Debug, Clone)]
pub struct YtDlpSearch {
    program: String,
    timeout: Duration,
}

impl YtDlpSearch {
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            timeout: SEARCH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for YtDlpSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaSearch for YtDlpSearch {
    async fn search(&self, query: &str) -> Result<Option<Track>> {
        tracing::info!(query, "searching YouTube");

        let child = Command::new(&self.program)
            .args([
                "-f",
                "bestaudio",
                "--no-playlist",
                "--no-warnings",
                "--print",
                "title",
                "--print",
                "urls",
            ])
            .arg(format!("ytsearch1:{query}"))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Media(format!("failed to run {}: {e}", self.program)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Media(format!("search timed out after {:?}", self.timeout)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(status = %output.status, stderr = %stderr.trim(), "yt-dlp failed");
            return Err(Error::Media(format!("yt-dlp exited with {}", output.status)));
        }

        let track = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        match &track {
            Some(t) => tracing::info!(title = %t.title, "found track"),
            None => tracing::info!(query, "no search results"),
        }
        Ok(track)
    }
}

/// Parse `--print title --print urls` output: a title line, then the URL
#[must_use]
pub fn parse_search_output(stdout: &str) -> Option<Track> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let title = lines.next()?;
    let url = lines.find(|l| l.starts_with("http"))?;

    Some(Track {
        title: title.to_string(),
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_and_url() {
        let out = "Ed Sheeran - Shape of You\nhttps://rr1.example/videoplayback?id=1\n";
        let track = parse_search_output(out).unwrap();
        assert_eq!(track.title, "Ed Sheeran - Shape of You");
        assert_eq!(track.url, "https://rr1.example/videoplayback?id=1");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_search_output("").is_none());
        assert!(parse_search_output("Only a title\n").is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let search = YtDlpSearch::new().with_program("kitty-no-such-yt-dlp");
        assert!(search.search("anything").await.is_err());
    }
}
