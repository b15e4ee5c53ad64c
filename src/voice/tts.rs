//! Text-to-speech via the `OpenAI` speech API

use super::VoiceRate;
use crate::{Error, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Synthesizes speech from text as MP3
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    model: String,
    rate: VoiceRate,
}

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    speed: f32,
}

impl TextToSpeech {
    /// Create a synthesizer whose speed follows the shared `rate`
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, voice: String, model: String, rate: VoiceRate) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            model,
            rate,
        })
    }

    /// Synthesize `text` at the current speaking rate
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.rate.speed(),
        };

        let response = self
            .client
            .post(SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), speed = request.speed, "speech synthesized");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_carries_rate_speed() {
        let rate = VoiceRate::new(super::super::FAST_RATE);
        let req = SpeechRequest {
            model: "tts-1",
            input: "hi",
            voice: "nova",
            speed: rate.speed(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["voice"], "nova");
        assert!((json["speed"].as_f64().unwrap() - 1.2).abs() < 1e-6);
    }
}
