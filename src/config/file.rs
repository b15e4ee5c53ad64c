//! TOML configuration file loading
//!
//! Supports `~/.config/kitty/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct KittyConfigFile {
    /// Assistant identity and wake phrases
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Weather and clock configuration
    #[serde(default)]
    pub location: LocationFileConfig,

    /// Alarm configuration
    #[serde(default)]
    pub alarms: AlarmFileConfig,

    /// Web server configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Assistant identity
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Display/spoken name (e.g. "Hello Kitty")
    pub name: Option<String>,

    /// Wake phrases (e.g. `["hello kitty", "hey kitty"]`)
    pub wake_words: Option<Vec<String>>,
}

/// LLM-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Provider ("openai" or "gemini")
    pub provider: Option<String>,

    /// Model identifier
    pub model: Option<String>,

    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable voice input/output
    pub enabled: Option<bool>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "nova")
    pub tts_voice: Option<String>,

    /// Speaking rate in words per minute
    pub rate: Option<u32>,

    /// Output volume (0.0 to 1.0)
    pub volume: Option<f32>,

    /// Seconds to wait for a command after the wake phrase
    pub speech_timeout_secs: Option<u64>,

    /// Maximum seconds for a single command phrase
    pub phrase_time_limit_secs: Option<u64>,
}

/// Weather/clock location
#[derive(Debug, Default, Deserialize)]
pub struct LocationFileConfig {
    pub city: Option<String>,

    /// IANA timezone name (e.g. "Asia/Karachi")
    pub timezone: Option<String>,
}

/// Alarm persistence
#[derive(Debug, Default, Deserialize)]
pub struct AlarmFileConfig {
    /// Path of the JSON alarm file
    pub file: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Web API port
    pub port: Option<u16>,
}

/// Load the TOML config file from the standard path
///
/// Returns `KittyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> KittyConfigFile {
    let Some(path) = config_file_path() else {
        return KittyConfigFile::default();
    };

    if !path.exists() {
        return KittyConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                KittyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            KittyConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed
pub fn parse_config(content: &str) -> crate::Result<KittyConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/kitty/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("kitty").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config = parse_config(
            r#"
            [assistant]
            wake_words = ["hey kitty"]

            [location]
            city = "Lahore"
            "#,
        )
        .unwrap();

        assert_eq!(config.assistant.wake_words.unwrap(), vec!["hey kitty"]);
        assert_eq!(config.location.city.as_deref(), Some("Lahore"));
        assert!(config.llm.provider.is_none());
        assert!(config.server.port.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(parse_config("[server]\nport = \"nope\"").is_err());
    }
}
