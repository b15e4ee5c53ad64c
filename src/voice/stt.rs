//! Speech-to-text via the `OpenAI` Whisper transcription API

use crate::{Error, Result};

const WHISPER_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes WAV audio to text
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl SpeechToText {
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for Whisper".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            endpoint: WHISPER_URL.to_string(),
        })
    }

    /// Override the transcription endpoint (local Whisper-compatible servers)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Transcribe WAV bytes, returning the trimmed transcript
    ///
    /// An empty transcript means nothing intelligible was said.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        tracing::debug!(audio_bytes = wav.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        let transcript = result.text.trim().to_string();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(SpeechToText::new("  ".to_string(), "whisper-1".to_string()).is_err());
        assert!(SpeechToText::new("sk".to_string(), "whisper-1".to_string()).is_ok());
    }
}
