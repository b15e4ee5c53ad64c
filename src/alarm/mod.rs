//! Alarm store and background checker
//!
//! Alarms are resolved to an absolute local timestamp when created, persisted
//! as a JSON array (rewritten on every mutation) and fired by a periodic
//! checker that emits [`AlarmEvent`]s instead of calling back into the owner.

mod ringtone;

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

pub use ringtone::{RINGTONE_DURATION, play_ringtone, ringtone_samples};

use crate::{Error, Result};

/// How often the checker scans for due alarms
pub const CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// An alarm is due when its fire time is at most this far ahead of now
pub const DUE_WINDOW_SECS: i64 = 30;

/// Label used when the user gives none
pub const DEFAULT_LABEL: &str = "Alarm";

/// `H:MM` with optional am/pm suffix
static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})(?:\s*([ap])\.?\s?m\b\.?)?").expect("valid clock regex")
});

/// `H am` / `H pm` (minutes default to zero)
static HOUR_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})\s*([ap])\.?\s?m\b").expect("valid period regex"));

/// A scheduled alarm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Process-local identifier (not persisted)
    #[serde(skip, default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Absolute local fire time
    #[serde(rename = "time")]
    pub fire_at: NaiveDateTime,

    pub label: String,

    pub active: bool,
}

/// Event emitted by the background checker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmEvent {
    /// An alarm reached its fire window
    Fired { label: String, fire_at: NaiveDateTime },
}

/// Thread-safe alarm collection backed by a JSON file
///
/// Cloning shares the same underlying collection.
#[derive(Debug, Clone)]
pub struct AlarmStore {
    alarms: Arc<Mutex<Vec<Alarm>>>,
    path: PathBuf,
}

impl AlarmStore {
    /// Open the store, loading any alarms persisted at `path`
    ///
    /// A missing or unreadable file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let alarms = match load_alarms(&path) {
            Ok(alarms) => {
                if !alarms.is_empty() {
                    tracing::info!(count = alarms.len(), path = %path.display(), "loaded saved alarms");
                }
                alarms
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to load alarms");
                Vec::new()
            }
        };

        Self {
            alarms: Arc::new(Mutex::new(alarms)),
            path,
        }
    }

    /// Path of the backing JSON file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add an alarm for `HH[:MM]`, resolved against the current local time
    ///
    /// # Errors
    ///
    /// Returns error if the time spec is malformed or out of range
    pub fn add(&self, time_spec: &str, label: &str) -> Result<Alarm> {
        self.add_at(time_spec, label, Local::now().naive_local())
    }

    /// Add an alarm for `HH[:MM]`, resolved against `now`
    ///
    /// # Errors
    ///
    /// Returns error if the time spec is malformed or out of range
    pub fn add_at(&self, time_spec: &str, label: &str, now: NaiveDateTime) -> Result<Alarm> {
        let time = parse_time_spec(time_spec)?;
        let alarm = Alarm {
            id: Uuid::new_v4(),
            fire_at: next_occurrence(time, now),
            label: if label.trim().is_empty() {
                DEFAULT_LABEL.to_string()
            } else {
                label.trim().to_string()
            },
            active: true,
        };

        let mut alarms = self.lock();
        alarms.push(alarm.clone());
        self.persist(&alarms);
        drop(alarms);

        tracing::info!(label = %alarm.label, fire_at = %alarm.fire_at, "alarm set");
        Ok(alarm)
    }

    /// Add an alarm and return the sentence to speak
    #[must_use]
    pub fn set(&self, time_spec: &str, label: &str) -> String {
        match self.add(time_spec, label) {
            Ok(alarm) => format!("Alarm set for {}", format_clock(alarm.fire_at)),
            Err(e) => {
                tracing::warn!(error = %e, time_spec, "failed to set alarm");
                "Sorry, couldn't set the alarm".to_string()
            }
        }
    }

    /// Human-readable list of active alarms
    #[must_use]
    pub fn list(&self) -> String {
        let alarms = self.lock();
        let entries: Vec<String> = alarms
            .iter()
            .filter(|a| a.active)
            .map(|a| {
                format!(
                    "{} at {} on {}",
                    a.label,
                    format_clock(a.fire_at),
                    a.fire_at.format("%A")
                )
            })
            .collect();

        if entries.is_empty() {
            "You have no active alarms".to_string()
        } else {
            format!("Your alarms: {}", entries.join(", "))
        }
    }

    /// Remove every alarm
    #[must_use]
    pub fn cancel_all(&self) -> String {
        let mut alarms = self.lock();
        let count = alarms.len();
        alarms.clear();
        self.persist(&alarms);
        drop(alarms);

        tracing::info!(count, "all alarms cancelled");
        "All alarms cancelled".to_string()
    }

    /// Snapshot of all stored alarms
    #[must_use]
    pub fn alarms(&self) -> Vec<Alarm> {
        self.lock().clone()
    }

    /// Remove and return every alarm due at `now`
    ///
    /// Due means active with a fire time between `now` and
    /// `now + DUE_WINDOW_SECS`. Alarms whose window has already passed are
    /// left untouched and never fire.
    pub fn take_due(&self, now: NaiveDateTime) -> Vec<Alarm> {
        let mut alarms = self.lock();
        let (due, pending): (Vec<Alarm>, Vec<Alarm>) =
            alarms.drain(..).partition(|a| is_due(a, now));
        *alarms = pending;

        if !due.is_empty() {
            self.persist(&alarms);
        }
        drop(alarms);

        due.into_iter()
            .map(|mut a| {
                a.active = false;
                a
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Alarm>> {
        self.alarms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rewrite the whole file; failures are logged, never raised
    fn persist(&self, alarms: &[Alarm]) {
        if let Err(e) = save_alarms(&self.path, alarms) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to save alarms");
        }
    }
}

fn is_due(alarm: &Alarm, now: NaiveDateTime) -> bool {
    if !alarm.active {
        return false;
    }
    let ahead = (alarm.fire_at - now).num_seconds();
    (0..=DUE_WINDOW_SECS).contains(&ahead)
}

/// Spawn the periodic alarm checker
///
/// Exits when the event receiver is dropped.
pub fn spawn_checker(store: AlarmStore, events: mpsc::Sender<AlarmEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECK_INTERVAL);
        tracing::debug!(interval_secs = CHECK_INTERVAL.as_secs(), "alarm checker started");

        loop {
            interval.tick().await;

            for alarm in store.take_due(Local::now().naive_local()) {
                tracing::info!(label = %alarm.label, fire_at = %alarm.fire_at, "alarm fired");
                let event = AlarmEvent::Fired {
                    label: alarm.label,
                    fire_at: alarm.fire_at,
                };
                if events.send(event).await.is_err() {
                    tracing::debug!("alarm event receiver dropped, stopping checker");
                    return;
                }
            }
        }
    })
}

/// Parse `HH[:MM]` into a wall-clock time
///
/// # Errors
///
/// Returns error if the spec is not numeric or out of range
pub fn parse_time_spec(spec: &str) -> Result<NaiveTime> {
    let mut parts = spec.trim().splitn(2, ':');
    let hour: u32 = parts
        .next()
        .and_then(|h| h.trim().parse().ok())
        .ok_or_else(|| Error::Alarm(format!("invalid hour in '{spec}'")))?;
    let minute: u32 = match parts.next() {
        Some(m) => m
            .trim()
            .parse()
            .map_err(|_| Error::Alarm(format!("invalid minute in '{spec}'")))?,
        None => 0,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| Error::Alarm(format!("time out of range: '{spec}'")))
}

/// Next occurrence of `time`: today if still ahead of `now`, else tomorrow
#[must_use]
pub fn next_occurrence(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today <= now {
        today + TimeDelta::days(1)
    } else {
        today
    }
}

/// Extract an alarm time from a spoken sentence
///
/// Accepts `H:MM` (optionally followed by am/pm) or `H am|pm`. Returns a
/// 24-hour `H:MM` spec, or `None` if no valid time is present.
#[must_use]
pub fn parse_spoken_time(text: &str) -> Option<String> {
    let lower = text.to_lowercase();

    let (hour, minute, period) = if let Some(caps) = CLOCK_TIME.captures(&lower) {
        (
            caps[1].parse::<u32>().ok()?,
            caps[2].parse::<u32>().ok()?,
            caps.get(3).map(|m| m.as_str().to_string()),
        )
    } else if let Some(caps) = HOUR_PERIOD.captures(&lower) {
        (caps[1].parse::<u32>().ok()?, 0, Some(caps[2].to_string()))
    } else {
        return None;
    };

    let hour = match period.as_deref() {
        Some("p") if hour < 12 => hour + 12,
        Some("a") if hour == 12 => 0,
        _ => hour,
    };

    (hour < 24 && minute < 60).then(|| format!("{hour}:{minute:02}"))
}

/// Format a fire time as a 12-hour clock string (e.g. "7:30 AM")
#[must_use]
pub fn format_clock(at: NaiveDateTime) -> String {
    at.format("%-I:%M %p").to_string()
}

fn load_alarms(path: &Path) -> Result<Vec<Alarm>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

fn save_alarms(path: &Path, alarms: &[Alarm]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(alarms)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn temp_store() -> (tempfile::TempDir, AlarmStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AlarmStore::open(dir.path().join("alarms.json"));
        (dir, store)
    }

    #[test]
    fn test_rolls_forward_when_passed() {
        let (_dir, store) = temp_store();
        let alarm = store.add_at("7:30", "Wake up", at(8, 0)).unwrap();
        assert_eq!(alarm.fire_at, at(7, 30) + TimeDelta::days(1));
    }

    #[test]
    fn test_same_day_when_ahead() {
        let (_dir, store) = temp_store();
        let alarm = store.add_at("7:30", "Wake up", at(7, 0)).unwrap();
        assert_eq!(alarm.fire_at, at(7, 30));
    }

    #[test]
    fn test_exact_now_rolls_forward() {
        assert_eq!(next_occurrence(at(7, 0).time(), at(7, 0)), at(7, 0) + TimeDelta::days(1));
    }

    #[test]
    fn test_parse_time_spec() {
        assert_eq!(parse_time_spec("7").unwrap(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(parse_time_spec("21:05").unwrap(), NaiveTime::from_hms_opt(21, 5, 0).unwrap());
        assert!(parse_time_spec("25:00").is_err());
        assert!(parse_time_spec("seven").is_err());
    }

    #[test]
    fn test_parse_spoken_time() {
        assert_eq!(parse_spoken_time("set alarm for 7:30").as_deref(), Some("7:30"));
        assert_eq!(parse_spoken_time("set alarm for 9 pm").as_deref(), Some("21:00"));
        assert_eq!(parse_spoken_time("set an alarm at 6 AM").as_deref(), Some("6:00"));
        assert_eq!(parse_spoken_time("alarm 7:15 p.m. please").as_deref(), Some("19:15"));
        assert_eq!(parse_spoken_time("12 am").as_deref(), Some("0:00"));
        assert_eq!(parse_spoken_time("12 pm").as_deref(), Some("12:00"));
        assert_eq!(parse_spoken_time("set an alarm"), None);
        assert_eq!(parse_spoken_time("at 31:00"), None);
    }

    #[test]
    fn test_take_due_window() {
        let (_dir, store) = temp_store();
        store.add_at("7:00", "soon", at(6, 0)).unwrap();
        store.add_at("9:00", "later", at(6, 0)).unwrap();

        // 20 seconds before 7:00
        let now = at(6, 59) + TimeDelta::seconds(40);
        let due = store.take_due(now);

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].label, "soon");
        assert!(!due[0].active);
        assert_eq!(store.alarms().len(), 1);
    }

    #[test]
    fn test_missed_window_never_fires() {
        let (_dir, store) = temp_store();
        store.add_at("7:00", "missed", at(6, 0)).unwrap();

        let due = store.take_due(at(7, 5));
        assert!(due.is_empty());
        assert_eq!(store.alarms().len(), 1);
    }

    #[test]
    fn test_cancel_all_persists() {
        let (dir, store) = temp_store();
        store.add_at("7:00", "a", at(6, 0)).unwrap();
        let _ = store.cancel_all();

        let reopened = AlarmStore::open(dir.path().join("alarms.json"));
        assert!(reopened.alarms().is_empty());
        assert_eq!(reopened.list(), "You have no active alarms");
    }

    #[test]
    fn test_persisted_format() {
        let (dir, store) = temp_store();
        store.add_at("7:00", "Gym", at(6, 0)).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("alarms.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["time"], "2025-03-10T07:00:00");
        assert_eq!(json[0]["label"], "Gym");
        assert_eq!(json[0]["active"], true);
        assert!(json[0].get("id").is_none());
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(at(7, 0)), "7:00 AM");
        assert_eq!(format_clock(at(21, 30)), "9:30 PM");
    }
}
