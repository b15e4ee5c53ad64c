//! Microphone listener: capture → segment → transcribe

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{
    AudioCapture, Listener, SAMPLE_RATE, SegmenterState, SpeechToText, UtteranceSegmenter,
    samples_to_wav,
};
use crate::Result;

/// How often captured audio is drained into the segmenter
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`Listener`] backed by the default microphone and Whisper
pub struct MicListener {
    capture: AudioCapture,
    stt: SpeechToText,
}

impl MicListener {
    /// Open the microphone and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if the input device cannot be opened
    pub fn new(stt: SpeechToText) -> Result<Self> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;
        Ok(Self { capture, stt })
    }

    async fn record(&mut self, timeout: Option<Duration>, phrase_limit: Duration) -> Option<Vec<f32>> {
        if let Err(e) = self.capture.start() {
            tracing::warn!(error = %e, "failed to restart audio capture");
            return None;
        }
        // Drop anything picked up while we were speaking
        self.capture.clear_buffer();

        let mut segmenter = UtteranceSegmenter::new();
        let started = Instant::now();

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let chunk = self.capture.take_buffer();
            if let Some(utterance) = segmenter.push(&chunk) {
                return Some(utterance);
            }

            match segmenter.state() {
                SegmenterState::Idle => {
                    if timeout.is_some_and(|t| started.elapsed() >= t) {
                        tracing::debug!("no speech before timeout");
                        return None;
                    }
                }
                SegmenterState::Speaking => {
                    if segmenter.speech_duration() >= phrase_limit {
                        tracing::debug!("phrase time limit reached");
                        return Some(segmenter.take());
                    }
                }
            }
        }
    }
}

#[async_trait(?Send)]
impl Listener for MicListener {
    async fn listen(&mut self, timeout: Option<Duration>, phrase_limit: Duration) -> Option<String> {
        let samples = self.record(timeout, phrase_limit).await?;

        let wav = match samples_to_wav(&samples, SAMPLE_RATE) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode utterance");
                return None;
            }
        };

        match self.stt.transcribe(wav).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => {
                tracing::debug!("could not understand audio");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "speech recognition failed");
                None
            }
        }
    }
}
