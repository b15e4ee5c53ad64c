//! Shared test utilities: in-memory fakes for every external boundary
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;

use kitty_assistant::alarm::AlarmStore;
use kitty_assistant::brain::{Brain, ChatProvider, Turn};
use kitty_assistant::media::{MediaBackend, NOTHING_PLAYING_MESSAGE, STOPPED_MESSAGE};
use kitty_assistant::voice::{Listener, NORMAL_RATE, Speaker, VoiceRate};
use kitty_assistant::weather::{Clock, WeatherService};
use kitty_assistant::{ListenSettings, Result, Router, Services, Session};

pub const WAKE_WORDS: &[&str] = &["hello kitty", "hey kitty"];

/// Media backend that records requests instead of spawning players
///
/// Queries containing "unknown" are not found.
#[derive(Default)]
pub struct FakeMedia {
    playing: AtomicBool,
    played: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn search_and_play(&self, query: &str) -> (bool, String) {
        if query.contains("unknown") {
            return (false, "Could not find the song on YouTube".to_string());
        }
        self.played.lock().unwrap().push(query.to_string());
        self.playing.store(true, Ordering::SeqCst);
        (true, format!("Playing {query}"))
    }

    async fn stop(&self) -> (bool, String) {
        if self.playing.swap(false, Ordering::SeqCst) {
            (true, STOPPED_MESSAGE.to_string())
        } else {
            (false, NOTHING_PLAYING_MESSAGE.to_string())
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

pub struct FakeWeather;

#[async_trait]
impl WeatherService for FakeWeather {
    async fn get_weather(&self, city: &str) -> String {
        format!("In {city}, it's Sunny with +30°C")
    }
}

/// Chat provider that echoes its input
pub struct EchoProvider;

#[async_trait]
impl ChatProvider for EchoProvider {
    async fn complete(&self, _system: &str, _history: &[Turn], input: &str) -> Result<String> {
        Ok(format!("echo: {input}"))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Listener that replays a fixed script, then waits forever
#[derive(Default)]
pub struct ScriptedListener {
    script: VecDeque<Option<String>>,
    /// Simulated capture and transcription time per utterance
    latency: Duration,
    /// Timeout passed to each `listen` call
    pub timeouts: Vec<Option<Duration>>,
}

impl ScriptedListener {
    pub fn new(script: &[Option<&str>]) -> Self {
        Self {
            script: script.iter().map(|s| s.map(ToString::to_string)).collect(),
            latency: Duration::ZERO,
            timeouts: Vec::new(),
        }
    }

    /// Make every capture take `latency` before it yields
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait(?Send)]
impl Listener for ScriptedListener {
    async fn listen(&mut self, timeout: Option<Duration>, _phrase_limit: Duration) -> Option<String> {
        self.timeouts.push(timeout);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.script.pop_front() {
            Some(utterance) => utterance,
            None => std::future::pending().await,
        }
    }
}

/// Speaker that records everything it is asked to say
#[derive(Default)]
pub struct RecordingSpeaker {
    pub spoken: Vec<String>,
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn speak(&mut self, text: &str) {
        self.spoken.push(text.to_string());
    }
}

/// Services backed by fakes, with alarms persisted under `dir`
pub fn services(dir: &Path) -> (Services, Arc<FakeMedia>) {
    let media = Arc::new(FakeMedia::default());
    let backend: Arc<dyn MediaBackend> = media.clone();

    let services = Services {
        media: backend,
        weather: Arc::new(FakeWeather),
        brain: Arc::new(Brain::new(Box::new(EchoProvider), "Hello Kitty", Tz::Asia__Karachi)),
        alarms: AlarmStore::open(dir.join("alarms.json")),
        voice_rate: VoiceRate::new(NORMAL_RATE),
        clock: Clock::new(Tz::Asia__Karachi),
        city: "Karachi".to_string(),
    };
    (services, media)
}

pub fn wake_words() -> Vec<String> {
    WAKE_WORDS.iter().map(ToString::to_string).collect()
}

pub fn router(dir: &Path) -> (Router, Arc<FakeMedia>) {
    let (services, media) = services(dir);
    (Router::new(services), media)
}

pub fn session(dir: &Path) -> (Session, Arc<FakeMedia>) {
    let (router, media) = router(dir);
    (Session::new(router, wake_words()), media)
}

/// Loop settings that never touch audio hardware
pub fn quiet_settings() -> ListenSettings {
    ListenSettings {
        speech_timeout: Duration::from_secs(10),
        phrase_time_limit: Duration::from_secs(20),
        ring_alarms: false,
        volume: 1.0,
    }
}
