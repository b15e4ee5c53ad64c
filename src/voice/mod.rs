//! Voice processing module
//!
//! Microphone capture, utterance segmentation, Whisper transcription, TTS
//! synthesis and speaker playback. The rest of the crate only sees the
//! [`Listener`] and [`Speaker`] traits.

mod capture;
mod listener;
mod playback;
mod segmenter;
mod speaker;
mod stt;
mod tts;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use listener::MicListener;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE};
pub use segmenter::{SegmenterState, UtteranceSegmenter, calculate_energy};
pub use speaker::VoiceSpeaker;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;

/// Speaking rate used by "speak slower" (words per minute)
pub const SLOW_RATE: u32 = 120;

/// Default speaking rate (words per minute)
pub const NORMAL_RATE: u32 = 150;

/// Speaking rate used by "speak faster" (words per minute)
pub const FAST_RATE: u32 = 180;

/// Transcription boundary: capture one utterance and return its text
#[async_trait(?Send)]
pub trait Listener {
    /// Listen for a single phrase
    ///
    /// `timeout` bounds the wait for speech to start (`None` waits forever);
    /// `phrase_limit` bounds the phrase itself. Returns `None` on timeout,
    /// unintelligible speech or a recognition failure.
    async fn listen(&mut self, timeout: Option<Duration>, phrase_limit: Duration) -> Option<String>;
}

/// Speech-output boundary: speak text, returning once audio has finished
#[async_trait(?Send)]
pub trait Speaker {
    async fn speak(&mut self, text: &str);
}

/// Shared, adjustable speaking rate
///
/// The router changes it on "speak slower/faster"; the TTS reads it per
/// utterance.
#[derive(Debug, Clone)]
pub struct VoiceRate(Arc<AtomicU32>);

impl VoiceRate {
    #[must_use]
    pub fn new(words_per_minute: u32) -> Self {
        Self(Arc::new(AtomicU32::new(words_per_minute)))
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, words_per_minute: u32) {
        tracing::debug!(words_per_minute, "voice rate changed");
        self.0.store(words_per_minute, Ordering::Relaxed);
    }

    /// TTS speed multiplier relative to the normal rate (0.25 to 4.0)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn speed(&self) -> f32 {
        (self.get() as f32 / NORMAL_RATE as f32).clamp(0.25, 4.0)
    }
}

impl Default for VoiceRate {
    fn default() -> Self {
        Self::new(NORMAL_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_rate_shared_between_clones() {
        let rate = VoiceRate::default();
        let handle = rate.clone();
        handle.set(SLOW_RATE);
        assert_eq!(rate.get(), SLOW_RATE);
        assert!((rate.speed() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_voice_rate_speed_is_clamped() {
        let rate = VoiceRate::new(10_000);
        assert!((rate.speed() - 4.0).abs() < f32::EPSILON);
    }
}
