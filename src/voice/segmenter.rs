//! Energy-based utterance segmentation
//!
//! Splits the microphone stream into single utterances: speech starts when
//! the RMS energy of a chunk crosses a threshold and ends after a run of
//! trailing silence. Wake-phrase matching happens later, on the transcript.

use std::time::Duration;

use super::SAMPLE_RATE;

/// Minimum audio energy to consider a chunk speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum utterance length (0.3 s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.5 s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Waiting for speech
    Idle,
    /// Speech detected, accumulating
    Speaking,
}

/// Accumulates audio chunks into complete utterances
#[derive(Debug)]
pub struct UtteranceSegmenter {
    state: SegmenterState,
    buffer: Vec<f32>,
    silence: usize,
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SegmenterState::Idle,
            buffer: Vec::new(),
            silence: 0,
        }
    }

    /// Feed a chunk; returns the utterance once it is complete
    pub fn push(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        if samples.is_empty() {
            return None;
        }

        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        match self.state {
            SegmenterState::Idle => {
                if is_speech {
                    tracing::trace!(energy, "speech started");
                    self.state = SegmenterState::Speaking;
                    self.buffer.clear();
                    self.buffer.extend_from_slice(samples);
                    self.silence = 0;
                }
                None
            }
            SegmenterState::Speaking => {
                self.buffer.extend_from_slice(samples);
                if is_speech {
                    self.silence = 0;
                } else {
                    self.silence += samples.len();
                }

                if self.silence > SILENCE_SAMPLES && self.buffer.len() > MIN_SPEECH_SAMPLES {
                    tracing::debug!(samples = self.buffer.len(), "utterance complete");
                    return Some(self.take());
                }

                // Too much silence for a blip to count as an utterance
                if self.silence > SILENCE_SAMPLES * 2 {
                    tracing::trace!("discarding short noise burst");
                    self.reset();
                }
                None
            }
        }
    }

    /// Take whatever has been accumulated, returning to idle
    pub fn take(&mut self) -> Vec<f32> {
        self.state = SegmenterState::Idle;
        self.silence = 0;
        std::mem::take(&mut self.buffer)
    }

    pub fn reset(&mut self) {
        self.state = SegmenterState::Idle;
        self.buffer.clear();
        self.silence = 0;
    }

    #[must_use]
    pub const fn state(&self) -> SegmenterState {
        self.state
    }

    /// Length of the utterance accumulated so far
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn speech_duration(&self) -> Duration {
        Duration::from_secs_f64(self.buffer.len() as f64 / f64::from(SAMPLE_RATE))
    }
}

impl Default for UtteranceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// RMS energy of audio samples
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
