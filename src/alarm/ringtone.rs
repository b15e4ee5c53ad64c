//! Alarm ringtone synthesis
//!
//! Classic alarm-clock pattern: beep-beep, short pause, beep-beep, long pause.

use std::f32::consts::PI;
use std::time::Duration;

use crate::voice::{AudioPlayback, PLAYBACK_SAMPLE_RATE};

/// How long a fired alarm rings
pub const RINGTONE_DURATION: Duration = Duration::from_secs(10);

const BEEP_HZ: f32 = 800.0;
const BEEP_SECS: f32 = 0.3;
const FADE_SECS: f32 = 0.05;

/// Offsets (seconds) of each beep within one cycle, and the cycle length
const BEEP_OFFSETS: [f32; 4] = [0.0, 0.4, 1.1, 1.5];
const CYCLE_SECS: f32 = 2.7;

/// One enveloped beep
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn beep(sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let len = (rate * BEEP_SECS) as usize;
    let fade = (rate * FADE_SECS) as usize;

    (0..len)
        .map(|i| {
            let envelope = if i < fade {
                i as f32 / fade as f32
            } else if i >= len - fade {
                (len - i) as f32 / fade as f32
            } else {
                1.0
            };
            (2.0 * PI * BEEP_HZ * i as f32 / rate).sin() * envelope
        })
        .collect()
}

/// Ringtone samples (mono f32) lasting `duration`
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ringtone_samples(duration: Duration, sample_rate: u32, volume: f32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let total = (duration.as_secs_f32() * rate) as usize;
    let cycle = (CYCLE_SECS * rate) as usize;
    let tone = beep(sample_rate);

    let mut pattern = vec![0.0_f32; cycle];
    for offset in BEEP_OFFSETS {
        let start = (offset * rate) as usize;
        for (slot, sample) in pattern[start..].iter_mut().zip(&tone) {
            *slot = sample * volume;
        }
    }

    pattern.iter().copied().cycle().take(total).collect()
}

/// Ring on the default output device without blocking the caller
///
/// Playback runs on a blocking thread; failures are logged.
pub fn play_ringtone(duration: Duration, volume: f32) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        tracing::info!(secs = duration.as_secs(), "playing alarm ringtone");
        let samples = ringtone_samples(duration, PLAYBACK_SAMPLE_RATE, volume);
        match AudioPlayback::new() {
            Ok(playback) => {
                if let Err(e) = playback.play_blocking(samples) {
                    tracing::warn!(error = %e, "alarm ringtone failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "no audio device for alarm ringtone"),
        }
    })
}
