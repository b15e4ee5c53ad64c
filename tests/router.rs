//! Command router integration tests

use kitty_assistant::router::{Outcome, ReplySource};
use kitty_assistant::voice::{FAST_RATE, SLOW_RATE};

mod common;

#[tokio::test]
async fn test_play_extracts_query() {
    let dir = tempfile::tempdir().unwrap();
    let (router, media) = common::router(dir.path());

    let reply = router.respond("play shape of you please", false).await;

    assert_eq!(reply.text, "Playing now! Say stop music to stop.");
    assert_eq!(reply.source, ReplySource::Command);
    assert_eq!(media.played(), vec!["shape of you"]);
    assert!(router.media_playing());
}

#[tokio::test]
async fn test_music_wins_over_weather() {
    let dir = tempfile::tempdir().unwrap();
    let (router, media) = common::router(dir.path());

    let reply = router.respond("play the weather song", false).await;

    assert_eq!(reply.text, "Playing now! Say stop music to stop.");
    assert_eq!(media.played(), vec!["the weather song"]);
}

#[tokio::test]
async fn test_empty_song_query_asks_again() {
    let dir = tempfile::tempdir().unwrap();
    let (router, media) = common::router(dir.path());

    let outcome = router.dispatch("play music please").await;

    assert_eq!(
        outcome,
        Outcome::Handled("What song would you like to hear?".to_string())
    );
    assert!(media.played().is_empty());
}

#[tokio::test]
async fn test_failed_search_is_still_handled() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    let reply = router.respond("play unknown tune", false).await;

    assert_eq!(reply.text, "Sorry, couldn't find unknown tune. Try again?");
    assert_eq!(reply.source, ReplySource::Command);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (router, media) = common::router(dir.path());
    media.set_playing(true);

    assert_eq!(router.respond("stop", false).await.text, "Music stopped.");
    assert!(!router.media_playing());

    // Nothing playing: explicit phrase still handled, twice in a row
    assert_eq!(router.respond("stop the music", false).await.text, "No music is playing.");
    assert_eq!(router.respond("stop the music", false).await.text, "No music is playing.");
}

#[tokio::test]
async fn test_bare_stop_without_music_goes_to_chat() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    assert_eq!(router.dispatch("stop").await, Outcome::NotHandled);
}

#[tokio::test]
async fn test_weather_uses_configured_city() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    let reply = router.respond("What's the weather like?", false).await;
    assert_eq!(reply.text, "In Karachi, it's Sunny with +30°C");
}

#[tokio::test]
async fn test_clock_answers() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    assert!(router.respond("what time is it", false).await.text.starts_with("The current time is "));
    assert!(router.respond("what's the date today", false).await.text.starts_with("Today is "));
    assert!(router.respond("which day is it", false).await.text.starts_with("Today is "));
}

#[tokio::test]
async fn test_alarm_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    let reply = router
        .respond("set an alarm for 9 pm remind me to call mom", false)
        .await;
    assert_eq!(reply.text, "Alarm set for 9:00 PM");

    let listed = router.respond("show my alarms", false).await.text;
    assert!(listed.contains("call mom at 9:00 PM"), "{listed}");

    assert_eq!(router.respond("cancel alarm", false).await.text, "All alarms cancelled");
    assert_eq!(
        router.respond("list alarms", false).await.text,
        "You have no active alarms"
    );
}

#[tokio::test]
async fn test_alarm_without_time_asks_again() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    let reply = router.respond("set an alarm", false).await;
    assert!(reply.text.starts_with("What time should I set the alarm for?"));
    assert!(router.services().alarms.alarms().is_empty());
}

#[tokio::test]
async fn test_unmatched_goes_to_chat_and_reset_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());

    let reply = router.respond("tell me a story", false).await;
    assert_eq!(reply.text, "echo: tell me a story");
    assert_eq!(reply.source, ReplySource::Chat);
    assert_eq!(router.services().brain.turn_count(), 1);

    let reply = router.respond("please reset conversation", false).await;
    assert_eq!(reply.text, "I've cleared our conversation history.");
    assert_eq!(router.services().brain.turn_count(), 0);
}

#[tokio::test]
async fn test_voice_rate_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (router, _) = common::router(dir.path());
    let rate = router.services().voice_rate.clone();

    assert_eq!(router.respond("speak slower", false).await.text, "Okay, I'll speak slower.");
    assert_eq!(rate.get(), SLOW_RATE);

    router.respond("speak faster", false).await;
    assert_eq!(rate.get(), FAST_RATE);
}

#[tokio::test]
async fn test_urdu_reply_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let (router, media) = common::router(dir.path());
    media.set_playing(true);

    let reply = router.respond("stop music", true).await;
    assert_eq!(reply.text, "Music stopped. بند کر دیا");
}
