//! Kitty - a wake-word voice assistant
//!
//! Listens for a wake phrase, captures one spoken command, routes it to a
//! built-in handler (music, alarms, weather, time) or to an AI chat backend
//! and speaks the reply.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Voice loop (mic → STT)    │    Web API        │
//! └────────────────────┬─────────────────────────────────┘
//!                      │ utterances
//! ┌────────────────────▼─────────────────────────────────┐
//! │  Session: wake phrase │ emergency stop │ exit phrase  │
//! │  Translator (Roman Urdu → English)                    │
//! │  Router: play │ stop │ weather │ time │ alarm │ ...   │
//! └───────┬──────────┬───────────┬───────────┬───────────┘
//!         │          │           │           │
//!      Media      Weather     Alarms       Brain
//!   (yt-dlp+mpv)  (wttr.in)   (JSON)   (OpenAI/Gemini)
//! ```

pub mod alarm;
pub mod api;
pub mod assistant;
pub mod brain;
pub mod config;
pub mod error;
pub mod media;
pub mod router;
pub mod session;
pub mod translator;
pub mod voice;
pub mod weather;

pub use assistant::{Assistant, ListenSettings};
pub use config::Config;
pub use error::{Error, Result};
pub use router::{Router, Services};
pub use session::{Activation, Session};
