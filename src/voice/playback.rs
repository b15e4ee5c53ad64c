//! Audio playback to speakers

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches `OpenAI` TTS output)
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Grace period after the last sample before the stream is dropped
const DRAIN_DELAY: Duration = Duration::from_millis(100);

/// Plays mono f32 audio on the default output device
pub struct AudioPlayback {
    config: StreamConfig,
}

impl AudioPlayback {
    /// Open the default output device at [`PLAYBACK_SAMPLE_RATE`]
    ///
    /// # Errors
    ///
    /// Returns error if no output device or no suitable config is available
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let rate = SampleRate(PLAYBACK_SAMPLE_RATE);
        let supported = (1..=2)
            .find_map(|channels| {
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == channels
                        && c.min_sample_rate() <= rate
                        && c.max_sample_rate() >= rate
                })
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported.with_sample_rate(rate).config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self { config })
    }

    /// Decode MP3 bytes, scale by `volume` and play them to completion
    ///
    /// Runs the blocking playback on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_mp3(&self, mp3_data: Vec<u8>, volume: f32) -> Result<()> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let mut samples = decode_mp3(&mp3_data)?;
            for s in &mut samples {
                *s *= volume;
            }
            play_on(&config, samples)
        })
        .await
        .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }

    /// Play samples, blocking the current thread until they finish
    ///
    /// # Errors
    ///
    /// Returns error if the output stream cannot be built or started
    pub fn play_blocking(&self, samples: Vec<f32>) -> Result<()> {
        play_on(&self.config, samples)
    }
}

fn play_on(config: &StreamConfig, samples: Vec<f32>) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device".to_string()))?;

    let channels = usize::from(config.channels.max(1));
    let sample_count = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let pos = position.load(Ordering::Relaxed);
                        let sample = samples.get(pos).copied().unwrap_or_else(|| {
                            finished.store(true, Ordering::Relaxed);
                            0.0
                        });
                        frame.fill(sample);
                        if pos < samples.len() {
                            position.store(pos + 1, Ordering::Relaxed);
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let expected = Duration::from_millis(
        (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE),
    );
    let deadline = Instant::now() + expected + Duration::from_millis(500);

    while !finished.load(Ordering::Relaxed) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    std::thread::sleep(DRAIN_DELAY);

    drop(stream);
    tracing::debug!(samples = sample_count, "playback complete");
    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns error on a malformed frame
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let channels = frame.channels.max(1);
                #[allow(clippy::cast_precision_loss)]
                samples.extend(frame.data.chunks(channels).map(|chunk| {
                    chunk.iter().map(|&s| f32::from(s) / 32768.0).sum::<f32>()
                        / chunk.len() as f32
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}
