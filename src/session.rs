//! Session / activation state machine
//!
//! `Idle → Awaiting → Processing → Idle`, with `ShuttingDown` as the terminal
//! state. Every utterance heard while idle first goes through the emergency
//! lane (stop loud music without the wake phrase), then wake detection.
//! Exactly one reply is produced per activation.

use serde::Serialize;
use tokio::sync::watch;

use crate::router::{Reply, Router};
use crate::translator::Translator;

/// Phrases that end the assistant
pub const EXIT_PHRASES: &[&str] = &["goodbye", "bye", "exit", "quit", "shutdown"];

/// Phrases that always mean "stop the music", never "stop the assistant"
pub const EXIT_SUPPRESSING_PHRASES: &[&str] = &["stop music", "stop the music"];

/// Spoken after a bare wake phrase
pub const ACKNOWLEDGEMENT: &str = "Yes? How can I help you?";

/// Spoken when the activation ends with no usable command
pub const NOT_HEARD: &str = "I didn't catch that. Please say the wake word again.";

/// Spoken on an exit phrase
pub const FAREWELL: &str = "Goodbye! Have a wonderful day!";

/// Activation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Idle,
    /// Wake phrase heard, waiting for the command
    Awaiting,
    /// Command being handled
    Processing,
    ShuttingDown,
}

/// Result of an utterance heard outside an activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// No wake phrase; nothing to do
    Ignored,
    /// Already active or shutting down; the utterance was dropped
    Busy,
    /// Music was stopped through the emergency lane; speak this
    Stopped(String),
    /// Wake phrase heard, now `Awaiting`
    Woke {
        /// Words following the wake phrase, if any
        command: Option<String>,
    },
}

/// Reply that ends an activation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    /// The session has entered `ShuttingDown`
    pub shutdown: bool,
}

/// True if the utterance is about stopping music
///
/// Explicit stop-music phrases always count; a bare "stop" counts only
/// while music is playing.
#[must_use]
pub fn is_music_stop(text: &str, media_playing: bool) -> bool {
    let lower = text.to_lowercase();
    EXIT_SUPPRESSING_PHRASES.iter().any(|p| lower.contains(p))
        || (media_playing && lower.contains("stop"))
}

/// True if the utterance should end the assistant
///
/// Music-stop phrasing suppresses exit matching entirely.
#[must_use]
pub fn is_exit_command(text: &str, media_playing: bool) -> bool {
    if is_music_stop(text, media_playing) {
        return false;
    }
    let lower = text.to_lowercase();
    EXIT_PHRASES.iter().any(|p| lower.contains(p))
}

/// Text following the first configured wake phrase in `transcript`
///
/// Returns `None` when no wake phrase is present and `Some("")` for a bare
/// wake phrase.
#[must_use]
pub fn extract_command(transcript: &str, wake_words: &[String]) -> Option<String> {
    let lower = transcript.to_lowercase();
    let (pos, wake) = wake_words
        .iter()
        .filter_map(|w| lower.find(w.as_str()).map(|pos| (pos, w)))
        .min_by_key(|(pos, _)| *pos)?;

    // Lowercasing can shift byte offsets for non-ASCII text
    let rest = transcript
        .get(pos + wake.len()..)
        .unwrap_or_else(|| &lower[pos + wake.len()..]);

    Some(
        rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '!' | '?'))
            .trim_end()
            .to_string(),
    )
}

/// The single assistant session
pub struct Session {
    router: Router,
    translator: Translator,
    wake_words: Vec<String>,
    state: watch::Sender<Activation>,
}

impl Session {
    /// `wake_words` must already be lowercased and trimmed
    #[must_use]
    pub fn new(router: Router, wake_words: Vec<String>) -> Self {
        let (state, _) = watch::channel(Activation::Idle);
        Self {
            router,
            translator: Translator::new(),
            wake_words,
            state,
        }
    }

    #[must_use]
    pub fn activation(&self) -> Activation {
        *self.state.borrow()
    }

    /// Watch activation changes (used by the status endpoint)
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Activation> {
        self.state.subscribe()
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    fn transition(&self, to: Activation) {
        let from = self.state.send_replace(to);
        if from != to {
            tracing::debug!(?from, ?to, "activation changed");
        }
    }

    /// Handle an utterance captured while waiting for the wake phrase
    pub async fn hear(&self, utterance: &str) -> Heard {
        if self.router.media_playing() && utterance.to_lowercase().contains("stop") {
            tracing::info!(utterance, "emergency stop");
            let (_, message) = self.router.services().media.stop().await;
            return Heard::Stopped(message);
        }

        let Some(command) = extract_command(utterance, &self.wake_words) else {
            return Heard::Ignored;
        };

        if self.activation() != Activation::Idle {
            tracing::debug!(state = ?self.activation(), "wake phrase ignored while active");
            return Heard::Busy;
        }

        tracing::info!(utterance, "wake phrase detected");
        self.transition(Activation::Awaiting);
        Heard::Woke {
            command: (!command.is_empty()).then_some(command),
        }
    }

    /// Finish the current activation with the command that followed the
    /// wake phrase (`None` on timeout or unintelligible speech)
    pub async fn process(&self, command: Option<&str>) -> Response {
        self.transition(Activation::Processing);

        let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
            self.transition(Activation::Idle);
            return Response {
                text: NOT_HEARD.to_string(),
                shutdown: false,
            };
        };

        let (text, urdu) = self.translator.prepare(command);

        if is_exit_command(&text, self.router.media_playing()) {
            tracing::info!(command, "exit phrase heard");
            self.transition(Activation::ShuttingDown);
            return Response {
                text: FAREWELL.to_string(),
                shutdown: true,
            };
        }

        let reply = self.router.respond(&text, urdu).await;
        tracing::debug!(source = ?reply.source, "activation complete");
        self.transition(Activation::Idle);
        Response {
            text: reply.text,
            shutdown: false,
        }
    }

    /// Activate and process typed text in one step (text REPL)
    ///
    /// Returns `None` if the session is not idle.
    pub async fn converse(&self, text: &str) -> Option<Response> {
        if self.activation() != Activation::Idle {
            return None;
        }
        self.transition(Activation::Awaiting);
        Some(self.process(Some(text)).await)
    }

    /// Reply to a web request: translation and routing, no state changes
    /// and no exit handling
    pub async fn reply(&self, text: &str) -> Reply {
        let (text, urdu) = self.translator.prepare(text);
        self.router.respond(&text, urdu).await
    }

    /// Enter `ShuttingDown` (Ctrl-C)
    pub fn shutdown(&self) {
        self.transition(Activation::ShuttingDown);
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.activation() == Activation::ShuttingDown
    }
}
