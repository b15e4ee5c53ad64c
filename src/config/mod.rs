//! Configuration management for the Kitty assistant
//!
//! Every setting resolves as env var > TOML file > default. A `.env` file in
//! the working directory is loaded into the environment first.

pub mod file;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::{Error, Result};

/// Default wake phrases
pub const DEFAULT_WAKE_WORDS: &[&str] = &["hello kitty", "hey kitty"];

/// Default web API port
pub const DEFAULT_PORT: u16 = 5000;

/// Kitty assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Spoken/display name of the assistant
    pub assistant_name: String,

    /// Normalized (lowercase, trimmed) wake phrases
    pub wake_words: Vec<String>,

    /// Chat completion backend
    pub llm: LlmConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// City used for weather lookups
    pub city: String,

    /// Timezone used for time/date answers
    pub timezone: Tz,

    /// JSON file holding persisted alarms
    pub alarm_file: PathBuf,

    /// Web API port
    pub port: u16,

    /// Data directory (alarms, caches)
    pub data_dir: PathBuf,
}

/// Supported chat completion providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl LlmProvider {
    /// Provider name as used in config and status output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Default model for the provider
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-3.5-turbo",
            Self::Gemini => "gemini-2.5-flash",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            other => Err(Error::Config(format!(
                "unknown AI provider: {other} (use 'openai' or 'gemini')"
            ))),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat backend configuration
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

/// Voice processing configuration
#[derive(Clone)]
pub struct VoiceConfig {
    /// Enable microphone listening and spoken output
    pub enabled: bool,

    /// `OpenAI` key used for Whisper STT and TTS
    pub openai_api_key: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// Speaking rate in words per minute
    pub rate: u32,

    /// Output volume (0.0 to 1.0)
    pub volume: f32,

    /// How long to wait for a command after the wake phrase
    pub speech_timeout: Duration,

    /// Maximum length of a command phrase
    pub phrase_time_limit: Duration,
}

impl fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("enabled", &self.enabled)
            .field("stt_model", &self.stt_model)
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .field("speech_timeout", &self.speech_timeout)
            .field("phrase_time_limit", &self.phrase_time_limit)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from the environment and config file
    ///
    /// # Errors
    ///
    /// Returns error on missing credentials, unknown provider or timezone
    pub fn load() -> Result<Self> {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    ///
    /// # Errors
    ///
    /// Returns error on missing credentials, unknown provider or timezone
    pub fn load_with_options(disable_voice: bool) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }

        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc, disable_voice)
    }

    /// Resolve configuration from an env lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns error on missing credentials, unknown provider or timezone
    pub fn from_sources(
        env: impl Fn(&str) -> Option<String>,
        fc: file::KittyConfigFile,
        disable_voice: bool,
    ) -> Result<Self> {
        let provider: LlmProvider = env("AI_PROVIDER")
            .or(fc.llm.provider)
            .unwrap_or_else(|| "openai".to_string())
            .parse()?;

        let openai_key = env("OPENAI_API_KEY")
            .or(fc.llm.openai_api_key)
            .filter(|k| !k.trim().is_empty());
        let gemini_key = env("GEMINI_API_KEY")
            .or(fc.llm.gemini_api_key)
            .filter(|k| !k.trim().is_empty());

        let api_key = match provider {
            LlmProvider::OpenAi => openai_key.clone().ok_or_else(|| {
                Error::Config("OPENAI_API_KEY is required when using OpenAI".to_string())
            })?,
            LlmProvider::Gemini => gemini_key.ok_or_else(|| {
                Error::Config("GEMINI_API_KEY is required when using Gemini".to_string())
            })?,
        };

        let llm = LlmConfig {
            provider,
            api_key,
            model: env("KITTY_LLM_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| provider.default_model().to_string()),
        };

        let wake_words = normalize_wake_words(
            env("WAKE_WORD")
                .map(|s| s.split(',').map(ToString::to_string).collect())
                .or(fc.assistant.wake_words)
                .unwrap_or_else(|| DEFAULT_WAKE_WORDS.iter().map(ToString::to_string).collect()),
        );
        if wake_words.is_empty() {
            return Err(Error::Config("at least one wake word is required".to_string()));
        }

        let voice_enabled = !disable_voice && fc.voice.enabled.unwrap_or(true);
        if voice_enabled && openai_key.is_none() {
            return Err(Error::Config(
                "OPENAI_API_KEY is required for speech recognition and synthesis \
                 (or pass --disable-voice)"
                    .to_string(),
            ));
        }

        let voice = VoiceConfig {
            enabled: voice_enabled,
            openai_api_key: openai_key,
            stt_model: env("KITTY_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_model: env("KITTY_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| "tts-1".to_string()),
            tts_voice: env("KITTY_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| "nova".to_string()),
            rate: env("VOICE_RATE")
                .and_then(|s| s.parse().ok())
                .or(fc.voice.rate)
                .unwrap_or(crate::voice::NORMAL_RATE),
            volume: env("VOICE_VOLUME")
                .and_then(|s| s.parse().ok())
                .or(fc.voice.volume)
                .unwrap_or(1.0_f32)
                .clamp(0.0, 1.0),
            speech_timeout: Duration::from_secs(
                env("SPEECH_TIMEOUT")
                    .and_then(|s| s.parse().ok())
                    .or(fc.voice.speech_timeout_secs)
                    .unwrap_or(10),
            ),
            phrase_time_limit: Duration::from_secs(
                env("PHRASE_TIME_LIMIT")
                    .and_then(|s| s.parse().ok())
                    .or(fc.voice.phrase_time_limit_secs)
                    .unwrap_or(20),
            ),
        };

        let timezone_name = env("TIMEZONE")
            .or(fc.location.timezone)
            .unwrap_or_else(|| "Asia/Karachi".to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| Error::Config(format!("unknown timezone: {timezone_name}")))?;

        let data_dir = default_data_dir();
        let alarm_file = alarm_file_from(&env, fc.alarms.file, &data_dir);

        Ok(Self {
            assistant_name: env("ASSISTANT_NAME")
                .or(fc.assistant.name)
                .unwrap_or_else(|| "Hello Kitty".to_string()),
            wake_words,
            llm,
            voice,
            city: env("CITY")
                .or(fc.location.city)
                .unwrap_or_else(|| "Karachi".to_string()),
            timezone,
            alarm_file,
            port: env("KITTY_PORT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            data_dir,
        })
    }
}

/// Alarm file location, resolved without validating credentials
#[must_use]
pub fn resolve_alarm_file() -> PathBuf {
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }
    let fc = file::load_config_file();
    alarm_file_from(&|key: &str| std::env::var(key).ok(), fc.alarms.file, &default_data_dir())
}

/// Data directory (~/.local/share/kitty on Linux)
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map_or_else(|| PathBuf::from("."), |d| d.data_dir().join("kitty"))
}

fn alarm_file_from(
    env: &impl Fn(&str) -> Option<String>,
    from_file: Option<String>,
    data_dir: &Path,
) -> PathBuf {
    env("KITTY_ALARM_FILE")
        .or(from_file)
        .map_or_else(|| data_dir.join("alarms.json"), PathBuf::from)
}

/// Lowercase, trim and drop empty wake phrases
fn normalize_wake_words(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
