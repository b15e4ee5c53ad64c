//! Command router
//!
//! Each utterance is matched against a fixed, ordered table of predicates.
//! The first match wins and produces exactly one reply; nothing matching
//! means the utterance goes to the conversational backend.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::alarm::{AlarmStore, DEFAULT_LABEL, parse_spoken_time};
use crate::brain::Brain;
use crate::media::{MediaBackend, NOTHING_PLAYING_MESSAGE, STOPPED_MESSAGE};
use crate::translator::urdu_response;
use crate::voice::{FAST_RATE, NORMAL_RATE, SLOW_RATE, VoiceRate};
use crate::weather::{Clock, WeatherService};

/// Phrases that stop music even when no playback is known
pub const STOP_MUSIC_PHRASES: &[&str] = &["stop music", "stop the music", "pause music"];

/// Trigger word and filler removed from a play request
static SONG_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:play|the song|on youtube|for me|please|music)\b")
        .expect("valid filler regex")
});

/// Optional alarm label ("... remind me to water the plants")
static REMIND_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bremind me to\s+(.+)$").expect("valid label regex"));

/// Built-in commands, in dispatch priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PlayMusic,
    StopMusic,
    Weather,
    Time,
    Date,
    DayOfWeek,
    SetAlarm,
    CancelAlarms,
    ListAlarms,
    ResetConversation,
    VoiceRate,
}

/// What a predicate sees
struct Probe<'a> {
    text: &'a str,
    media_playing: bool,
}

impl Probe<'_> {
    fn has(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }

    fn any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.text.contains(n))
    }
}

type Predicate = fn(&Probe<'_>) -> bool;

/// Priority table: earlier entries shadow later ones
const RULES: &[(Command, Predicate)] = &[
    (Command::PlayMusic, |p| p.has("play")),
    (Command::StopMusic, |p| {
        (p.media_playing && p.any(&["stop", "pause"])) || p.any(STOP_MUSIC_PHRASES)
    }),
    (Command::Weather, |p| p.any(&["weather", "mausam"])),
    (Command::Time, |p| (p.has("time") && p.has("what")) || p.has("waqt")),
    (Command::Date, |p| {
        (p.has("date") && p.any(&["what", "today"])) || p.has("tareekh")
    }),
    (Command::DayOfWeek, |p| p.any(&["what day", "which day", "aaj kya din"])),
    (Command::SetAlarm, |p| p.has("set") && p.has("alarm")),
    (Command::CancelAlarms, |p| {
        p.any(&["cancel alarm", "delete alarm", "cancel all alarms", "delete all alarms"])
    }),
    (Command::ListAlarms, |p| p.has("alarm") && p.any(&["show", "list", "my"])),
    (Command::ResetConversation, |p| p.any(&["reset conversation", "clear history"])),
    (Command::VoiceRate, |p| p.any(&["speak slower", "speak faster", "normal speed"])),
];

/// First command whose predicate matches `text`, if any
#[must_use]
pub fn classify(text: &str, media_playing: bool) -> Option<Command> {
    let lower = text.to_lowercase();
    let probe = Probe {
        text: &lower,
        media_playing,
    };
    RULES
        .iter()
        .find(|(_, matches)| matches(&probe))
        .map(|(command, _)| *command)
}

/// Song query left after removing the trigger word and filler
///
/// Removal is whole-word and case-insensitive; the remaining words keep
/// their original casing.
#[must_use]
pub fn extract_song_query(text: &str) -> String {
    SONG_FILLER
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Alarm label from "remind me to ...", or the default label
#[must_use]
pub fn extract_alarm_label(text: &str) -> String {
    REMIND_LABEL
        .captures(text)
        .map(|c| c[1].trim().trim_end_matches(['.', '!', '?']).trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_LABEL.to_string())
}

/// Router result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A built-in command produced this reply
    Handled(String),
    NotHandled,
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Command,
    Chat,
}

/// A reply ready to be spoken or returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    /// True if the reply came from the conversational backend
    #[must_use]
    pub fn is_chat(&self) -> bool {
        self.source == ReplySource::Chat
    }
}

/// Everything the router's handlers act on
#[derive(Clone)]
pub struct Services {
    pub media: Arc<dyn MediaBackend>,
    pub weather: Arc<dyn WeatherService>,
    pub brain: Arc<Brain>,
    pub alarms: AlarmStore,
    pub voice_rate: VoiceRate,
    pub clock: Clock,
    pub city: String,
}

/// Dispatches utterances to built-in handlers
#[derive(Clone)]
pub struct Router {
    services: Services,
}

impl Router {
    #[must_use]
    pub const fn new(services: Services) -> Self {
        Self { services }
    }

    #[must_use]
    pub const fn services(&self) -> &Services {
        &self.services
    }

    #[must_use]
    pub fn media_playing(&self) -> bool {
        self.services.media.is_playing()
    }

    /// Run the first matching built-in command
    pub async fn dispatch(&self, text: &str) -> Outcome {
        let Some(command) = classify(text, self.media_playing()) else {
            return Outcome::NotHandled;
        };

        tracing::info!(?command, "handling command");
        Outcome::Handled(self.run(command, text).await)
    }

    /// Built-in command reply, or the conversational backend's reply
    ///
    /// `urdu` marks input that was translated before dispatch.
    pub async fn respond(&self, text: &str, urdu: bool) -> Reply {
        match self.dispatch(text).await {
            Outcome::Handled(reply) => {
                let text = match urdu.then(|| urdu_response(&reply)).flatten() {
                    Some(urdu) => format!("{reply} {urdu}"),
                    None => reply,
                };
                Reply {
                    text,
                    source: ReplySource::Command,
                }
            }
            Outcome::NotHandled => Reply {
                text: self.services.brain.respond(text, urdu).await,
                source: ReplySource::Chat,
            },
        }
    }

    async fn run(&self, command: Command, text: &str) -> String {
        let s = &self.services;
        match command {
            Command::PlayMusic => self.play(text).await,
            Command::StopMusic => {
                let (stopped, message) = s.media.stop().await;
                tracing::debug!(stopped, message = %message, "stop requested");
                if stopped {
                    STOPPED_MESSAGE.to_string()
                } else {
                    NOTHING_PLAYING_MESSAGE.to_string()
                }
            }
            Command::Weather => s.weather.get_weather(&s.city).await,
            Command::Time => format!("The current time is {}", s.clock.current_time()),
            Command::Date => format!("Today is {}", s.clock.current_date()),
            Command::DayOfWeek => format!("Today is {}", s.clock.day_of_week()),
            Command::SetAlarm => match parse_spoken_time(text) {
                Some(spec) => s.alarms.set(&spec, &extract_alarm_label(text)),
                None => "What time should I set the alarm for? Try saying, set alarm for 7:30 am."
                    .to_string(),
            },
            Command::CancelAlarms => s.alarms.cancel_all(),
            Command::ListAlarms => s.alarms.list(),
            Command::ResetConversation => {
                s.brain.reset();
                "I've cleared our conversation history.".to_string()
            }
            Command::VoiceRate => self.adjust_rate(text),
        }
    }

    async fn play(&self, text: &str) -> String {
        let query = extract_song_query(text);
        if query.chars().count() <= 1 {
            return "What song would you like to hear?".to_string();
        }

        tracing::info!(query = %query, "searching for music");
        let (ok, message) = self.services.media.search_and_play(&query).await;
        tracing::debug!(ok, message = %message, "music request finished");

        if ok {
            "Playing now! Say stop music to stop.".to_string()
        } else {
            format!("Sorry, couldn't find {query}. Try again?")
        }
    }

    fn adjust_rate(&self, text: &str) -> String {
        let lower = text.to_lowercase();
        let (rate, reply) = if lower.contains("speak slower") {
            (SLOW_RATE, "Okay, I'll speak slower.")
        } else if lower.contains("speak faster") {
            (FAST_RATE, "Okay, I'll speak faster.")
        } else {
            (NORMAL_RATE, "Back to normal speed.")
        };
        self.services.voice_rate.set(rate);
        reply.to_string()
    }
}
