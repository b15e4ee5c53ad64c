//! Spoken output: synthesize with TTS and play on the speakers

use async_trait::async_trait;

use super::{AudioPlayback, Speaker, TextToSpeech};
use crate::Result;

/// [`Speaker`] backed by `OpenAI` TTS and the default output device
pub struct VoiceSpeaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
    volume: f32,
}

impl VoiceSpeaker {
    /// # Errors
    ///
    /// Returns error if the output device cannot be opened
    pub fn new(tts: TextToSpeech, volume: f32) -> Result<Self> {
        Ok(Self {
            tts,
            playback: AudioPlayback::new()?,
            volume,
        })
    }
}

#[async_trait(?Send)]
impl Speaker for VoiceSpeaker {
    async fn speak(&mut self, text: &str) {
        tracing::info!(text, "speaking");

        let audio = match self.tts.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "speech synthesis failed");
                return;
            }
        };

        if let Err(e) = self.playback.play_mp3(audio, self.volume).await {
            tracing::warn!(error = %e, "speech playback failed");
        }
    }
}
