//! Assistant - wires the services together and runs the foreground loop
//!
//! One listening loop drives the [`Session`]: it waits for a wake phrase
//! (or an emergency stop), captures the command, speaks the single reply and
//! goes back to idle. Alarm events from the background checker are spoken by
//! the same loop so only one component owns the speech output.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::alarm::{AlarmEvent, AlarmStore, RINGTONE_DURATION, play_ringtone, spawn_checker};
use crate::api::{self, ApiState};
use crate::brain::{Brain, provider_for};
use crate::config::VoiceConfig;
use crate::media::MusicPlayer;
use crate::router::{Router, Services};
use crate::session::{ACKNOWLEDGEMENT, Activation, Heard, Session};
use crate::voice::{
    Listener, MicListener, Speaker, SpeechToText, TextToSpeech, VoiceRate, VoiceSpeaker,
};
use crate::weather::{Clock, WttrWeather};
use crate::{Config, Error, Result};

/// Capacity of the alarm event channel
const ALARM_EVENT_BUFFER: usize = 16;

/// Listening-loop tuning
#[derive(Debug, Clone, Copy)]
pub struct ListenSettings {
    /// Wait for the command after a bare wake phrase
    pub speech_timeout: Duration,
    /// Maximum command length
    pub phrase_time_limit: Duration,
    /// Play the ringtone when an alarm fires
    pub ring_alarms: bool,
    pub volume: f32,
}

impl From<&VoiceConfig> for ListenSettings {
    fn from(voice: &VoiceConfig) -> Self {
        Self {
            speech_timeout: voice.speech_timeout,
            phrase_time_limit: voice.phrase_time_limit,
            ring_alarms: true,
            volume: voice.volume,
        }
    }
}

/// Build the router services from configuration
///
/// # Errors
///
/// Returns error if an HTTP client cannot be built
pub fn build_services(config: &Config) -> Result<Services> {
    let brain = Brain::new(provider_for(&config.llm)?, &config.assistant_name, config.timezone);

    Ok(Services {
        media: Arc::new(MusicPlayer::default()),
        weather: Arc::new(WttrWeather::new()?),
        brain: Arc::new(brain),
        alarms: AlarmStore::open(&config.alarm_file),
        voice_rate: VoiceRate::new(config.voice.rate),
        clock: Clock::new(config.timezone),
        city: config.city.clone(),
    })
}

/// The assistant context object
pub struct Assistant {
    session: Arc<Session>,
    alarms: AlarmStore,
    settings: ListenSettings,
}

impl Assistant {
    #[must_use]
    pub fn new(services: Services, wake_words: Vec<String>, settings: ListenSettings) -> Self {
        let alarms = services.alarms.clone();
        Self {
            session: Arc::new(Session::new(Router::new(services), wake_words)),
            alarms,
            settings,
        }
    }

    /// # Errors
    ///
    /// Returns error if a service cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            build_services(config)?,
            config.wake_words.clone(),
            ListenSettings::from(&config.voice),
        ))
    }

    #[must_use]
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Start the periodic alarm checker and return its event stream
    #[must_use]
    pub fn spawn_alarm_checker(&self) -> mpsc::Receiver<AlarmEvent> {
        let (tx, rx) = mpsc::channel(ALARM_EVENT_BUFFER);
        spawn_checker(self.alarms.clone(), tx);
        rx
    }

    /// Run until Ctrl-C or an exit phrase
    ///
    /// Starts the web API and the alarm checker; the voice loop runs on the
    /// current task because audio streams are not `Send`.
    ///
    /// # Errors
    ///
    /// Returns error if the audio devices or speech clients cannot be opened
    #[allow(clippy::future_not_send)]
    pub async fn run(self, config: &Config) -> Result<()> {
        let mut alarm_events = self.spawn_alarm_checker();
        let _api = api::spawn(ApiState::new(self.session()), config.port);

        let session = self.session();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
                session.shutdown();
            }
        });

        if config.voice.enabled {
            let voice_rate = self.session.router().services().voice_rate.clone();
            let (mut listener, mut speaker) = open_voice(&config.voice, voice_rate)?;
            tracing::info!(
                name = %config.assistant_name,
                wake_words = ?config.wake_words,
                "listening for wake phrase"
            );
            self.run_voice_loop(&mut listener, &mut speaker, &mut alarm_events)
                .await;
        } else {
            tracing::info!("voice disabled, serving the web API only");
            self.run_headless(&mut alarm_events).await;
        }

        let (stopped, _) = self.session.router().services().media.stop().await;
        if stopped {
            tracing::debug!("stopped music on shutdown");
        }
        tracing::info!("assistant stopped");
        Ok(())
    }

    /// Foreground loop: wake detection, command capture, spoken replies
    ///
    /// Alarm events are announced while a capture is in flight; the capture
    /// itself is kept, so an utterance is never lost to an alarm. Returns
    /// when the session enters `ShuttingDown`.
    #[allow(clippy::future_not_send)]
    pub async fn run_voice_loop(
        &self,
        listener: &mut dyn Listener,
        speaker: &mut dyn Speaker,
        alarms: &mut mpsc::Receiver<AlarmEvent>,
    ) {
        let mut state = self.session.subscribe();

        loop {
            let heard = {
                let listen = listener.listen(None, self.settings.phrase_time_limit);
                tokio::pin!(listen);

                loop {
                    tokio::select! {
                        biased;
                        _ = state.wait_for(|a| *a == Activation::ShuttingDown) => return,
                        Some(event) = alarms.recv() => self.announce_alarm(event, speaker).await,
                        heard = &mut listen => break heard,
                    }
                }
            };

            let Some(utterance) = heard else { continue };
            if !self.handle_utterance(&utterance, listener, speaker).await {
                break;
            }
        }
    }

    /// Returns `false` once the session is shutting down
    #[allow(clippy::future_not_send)]
    async fn handle_utterance(
        &self,
        utterance: &str,
        listener: &mut dyn Listener,
        speaker: &mut dyn Speaker,
    ) -> bool {
        match self.session.hear(utterance).await {
            Heard::Ignored | Heard::Busy => true,
            Heard::Stopped(message) => {
                speaker.speak(&message).await;
                true
            }
            Heard::Woke { command } => {
                let command = match command {
                    Some(command) => Some(command),
                    None => {
                        speaker.speak(ACKNOWLEDGEMENT).await;
                        listener
                            .listen(
                                Some(self.settings.speech_timeout),
                                self.settings.phrase_time_limit,
                            )
                            .await
                    }
                };

                let response = self.session.process(command.as_deref()).await;
                speaker.speak(&response.text).await;
                !response.shutdown
            }
        }
    }

    #[allow(clippy::future_not_send)]
    async fn announce_alarm(&self, event: AlarmEvent, speaker: &mut dyn Speaker) {
        let AlarmEvent::Fired { label, fire_at } = event;
        tracing::info!(label = %label, %fire_at, "announcing alarm");

        if self.settings.ring_alarms {
            // Detached; the ringtone runs alongside the announcement
            drop(play_ringtone(RINGTONE_DURATION, self.settings.volume));
        }
        speaker.speak(&format!("Alarm! {label}")).await;
    }

    /// Without voice, alarms can only ring
    ///
    /// Returns when the session enters `ShuttingDown`, even after the alarm
    /// checker has gone away.
    pub async fn run_headless(&self, alarms: &mut mpsc::Receiver<AlarmEvent>) {
        let mut state = self.session.subscribe();
        let mut checker_alive = true;

        loop {
            tokio::select! {
                _ = state.wait_for(|a| *a == Activation::ShuttingDown) => break,
                event = alarms.recv(), if checker_alive => match event {
                    Some(AlarmEvent::Fired { label, .. }) => {
                        tracing::info!(label = %label, "alarm fired");
                        if self.settings.ring_alarms {
                            drop(play_ringtone(RINGTONE_DURATION, self.settings.volume));
                        }
                    }
                    None => {
                        tracing::debug!("alarm checker stopped");
                        checker_alive = false;
                    }
                },
            }
        }
    }

    /// Text REPL over the same dispatch path as the voice loop
    ///
    /// Each non-empty line is one activation. Ends on EOF or an exit phrase.
    ///
    /// # Errors
    ///
    /// Returns error if reading input or writing output fails
    pub async fn run_text_loop<R, W>(&self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(response) = self.session.converse(line).await else {
                break;
            };
            output.write_all(format!("{}\n", response.text).as_bytes()).await?;
            output.flush().await?;

            if response.shutdown {
                break;
            }
        }

        Ok(())
    }
}

/// Open the microphone and speakers with the `OpenAI` speech clients
///
/// # Errors
///
/// Returns error if no `OpenAI` key is configured or a device cannot be opened
pub fn open_voice(voice: &VoiceConfig, rate: VoiceRate) -> Result<(MicListener, VoiceSpeaker)> {
    let api_key = voice
        .openai_api_key
        .clone()
        .ok_or_else(|| Error::Config("OPENAI_API_KEY is required for voice".to_string()))?;

    let stt = SpeechToText::new(api_key.clone(), voice.stt_model.clone())?;
    let tts = TextToSpeech::new(api_key, voice.tts_voice.clone(), voice.tts_model.clone(), rate)?;

    Ok((MicListener::new(stt)?, VoiceSpeaker::new(tts, voice.volume)?))
}
