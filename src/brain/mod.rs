//! Conversational backend
//!
//! Wraps a [`ChatProvider`] with a rolling transcript, an instant-reply
//! cache for common phrases and a local fallback table. [`Brain::get_response`]
//! never fails: provider errors turn into a canned sentence.

mod provider;

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;

pub use provider::{ChatProvider, GeminiChat, OpenAiChat, Turn, provider_for};

use crate::translator::URDU_PROMPT_NOTE;

/// Number of past turns sent with each request
pub const HISTORY_WINDOW: usize = 10;

const JOKES: [&str; 3] = [
    "Why did the programmer quit? They didn't get arrays!",
    "What's a computer's favorite snack? Microchips!",
    "Why do programmers prefer dark mode? Because light attracts bugs!",
];

/// Chat backend with history, cache and fallback
pub struct Brain {
    provider: Box<dyn ChatProvider>,
    assistant_name: String,
    system_prompt: String,
    timezone: Tz,
    history: Mutex<Vec<Turn>>,
}

impl Brain {
    #[must_use]
    pub fn new(provider: Box<dyn ChatProvider>, assistant_name: &str, timezone: Tz) -> Self {
        Self {
            provider,
            assistant_name: assistant_name.to_string(),
            system_prompt: system_prompt(assistant_name),
            timezone,
            history: Mutex::new(Vec::new()),
        }
    }

    fn history(&self) -> MutexGuard<'_, Vec<Turn>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reply to `input`
    pub async fn get_response(&self, input: &str) -> String {
        self.respond(input, false).await
    }

    /// Reply to `input`, telling the model the user may speak Roman Urdu
    pub async fn respond(&self, input: &str, urdu: bool) -> String {
        if let Some(reply) = cached_reply(input, &self.assistant_name) {
            tracing::debug!("instant reply from cache");
            return reply;
        }

        let recent: Vec<Turn> = {
            let history = self.history();
            let skip = history.len().saturating_sub(HISTORY_WINDOW);
            history[skip..].to_vec()
        };

        let system = if urdu {
            format!("{}\n\n{URDU_PROMPT_NOTE}", self.system_prompt)
        } else {
            self.system_prompt.clone()
        };

        match self.provider.complete(&system, &recent, input).await {
            Ok(reply) => {
                self.history().push(Turn {
                    user: input.to_string(),
                    assistant: reply.clone(),
                });
                reply
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "chat completion failed");
                fallback_reply(input, &self.assistant_name, Utc::now().with_timezone(&self.timezone))
            }
        }
    }

    /// Clear the conversation transcript
    pub fn reset(&self) {
        self.history().clear();
        tracing::info!("conversation history cleared");
    }

    /// Number of stored exchanges
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.history().len()
    }

    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

fn system_prompt(name: &str) -> String {
    format!(
        "You are {name}, a friendly and helpful voice assistant.\n\
         Rules for responses:\n\
         - Keep responses SHORT (1-2 sentences maximum)\n\
         - Be cheerful, warm and friendly\n\
         - Speak naturally as if talking to a friend\n\
         - Avoid long explanations unless specifically asked\n\
         - Your responses will be spoken aloud, so keep them conversational and brief"
    )
}

/// Canned reply for very common phrases, checked before any network call
///
/// Keys are matched as raw substrings of the lowercased input, in order.
#[must_use]
pub fn cached_reply(input: &str, name: &str) -> Option<String> {
    let text = input.trim().to_lowercase();
    let reply = if text.contains("hello") {
        "Hello! It's so nice to hear from you!".to_string()
    } else if text.contains("hi") {
        "Hi there! How can I help you today?".to_string()
    } else if text.contains("how are you") {
        "I'm doing wonderfully! Thanks for asking!".to_string()
    } else if text.contains("what is your name") {
        format!("I'm {name}, your friendly assistant!")
    } else if text.contains("who are you") {
        format!("I'm {name}, here to help you!")
    } else if text.contains("thank you") {
        "You're very welcome! Happy to help!".to_string()
    } else if text.contains("thanks") {
        "My pleasure! Anytime!".to_string()
    } else {
        return None;
    };
    Some(reply)
}

/// Local reply used when the provider is unavailable
#[must_use]
pub fn fallback_reply(input: &str, name: &str, now: DateTime<Tz>) -> String {
    let text = input.to_lowercase();
    let has = |w: &str| text.contains(w);

    if has("hello") || has("hi") || has("hey") {
        "Hello! How can I help you today?".to_string()
    } else if has("how are you") {
        "I'm doing great! Thanks for asking! How about you?".to_string()
    } else if has("your name") || has("who are you") {
        format!("I'm {name}, your friendly AI assistant!")
    } else if has("time") && has("what") {
        format!("The current time is {}", now.format("%I:%M %p"))
    } else if has("date") || has("day") {
        format!("Today is {}", now.format("%A, %B %d, %Y"))
    } else if has("thank") {
        "You're very welcome!".to_string()
    } else if has("joke") || has("funny") {
        JOKES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(JOKES[0])
            .to_string()
    } else if has("help") {
        "I'm here to help! Just ask me anything, or say commands like 'play music' or 'tell me a joke'."
            .to_string()
    } else {
        "I'm sorry, I'm having trouble right now. Can you please try asking that again?"
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;
    use crate::{Error, Result};

    /// Echoes the input and records the history length it was given
    struct EchoProvider {
        seen_history: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChatProvider for EchoProvider {
        async fn complete(&self, _system: &str, history: &[Turn], input: &str) -> Result<String> {
            self.seen_history.store(history.len(), Ordering::SeqCst);
            Ok(format!("echo: {input}"))
        }

        fn name(&self) -> &'static str {
            "echo"
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl ChatProvider for FailingProvider {
        async fn complete(&self, _: &str, _: &[Turn], _: &str) -> Result<String> {
            Err(Error::Llm("offline".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn echo_brain() -> (Brain, Arc<AtomicUsize>) {
        let seen = Arc::new(AtomicUsize::new(0));
        let provider = EchoProvider {
            seen_history: Arc::clone(&seen),
        };
        (Brain::new(Box::new(provider), "Hello Kitty", Tz::UTC), seen)
    }

    #[tokio::test]
    async fn test_cache_bypasses_provider_and_history() {
        let (brain, _) = echo_brain();
        let reply = brain.get_response("Hello there").await;
        assert_eq!(reply, "Hello! It's so nice to hear from you!");
        assert_eq!(brain.turn_count(), 0);
    }

    #[tokio::test]
    async fn test_history_window_is_bounded() {
        let (brain, seen) = echo_brain();
        for n in 0..12 {
            brain.get_response(&format!("tell me about {n}")).await;
        }
        assert_eq!(brain.turn_count(), 12);
        assert_eq!(seen.load(Ordering::SeqCst), HISTORY_WINDOW);

        brain.reset();
        assert_eq!(brain.turn_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let brain = Brain::new(Box::new(FailingProvider), "Hello Kitty", Tz::UTC);
        let reply = brain.get_response("tell me a joke").await;
        assert!(JOKES.contains(&reply.as_str()));
        assert_eq!(brain.turn_count(), 0);
    }

    #[test]
    fn test_cache_order() {
        assert_eq!(
            cached_reply("What is your name", "Kitty").as_deref(),
            Some("I'm Kitty, your friendly assistant!")
        );
        assert!(cached_reply("tell me a story", "Kitty").is_none());
    }

    #[test]
    fn test_fallback_time_uses_timezone() {
        let now = Tz::Asia__Karachi
            .with_ymd_and_hms(2025, 3, 14, 21, 5, 0)
            .unwrap();
        assert_eq!(
            fallback_reply("what time is it", "Kitty", now),
            "The current time is 09:05 PM"
        );
        assert_eq!(
            fallback_reply("today's date please", "Kitty", now),
            "Today is Friday, March 14, 2025"
        );
        assert!(fallback_reply("xyz", "Kitty", now).starts_with("I'm sorry"));
    }
}
