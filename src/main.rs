use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kitty_assistant::alarm::AlarmStore;
use kitty_assistant::voice::{
    AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, TextToSpeech, VoiceRate, calculate_energy,
};
use kitty_assistant::{Assistant, Config};

/// Kitty - wake-word voice assistant
#[derive(Parser)]
#[command(name = "kitty", version, about)]
struct Cli {
    /// Web API port (overrides KITTY_PORT and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable microphone and speech output (web API and text chat only)
    #[arg(long, env = "KITTY_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Chat over stdin/stdout through the same command router
    Chat,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Print the persisted alarms
    Alarms,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,kitty_assistant=info",
        1 => "info,kitty_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Chat => chat().await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text).await,
            Command::Alarms => {
                list_alarms();
                Ok(())
            }
        };
    }

    let mut config = Config::load_with_options(cli.disable_voice)?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    tracing::info!(
        name = %config.assistant_name,
        provider = %config.llm.provider,
        port = config.port,
        voice = config.voice.enabled,
        "starting assistant"
    );

    let assistant = Assistant::from_config(&config)?;
    assistant.run(&config).await?;

    Ok(())
}

/// Text REPL
async fn chat() -> anyhow::Result<()> {
    let config = Config::load_with_options(true)?;
    let assistant = Assistant::from_config(&config)?;

    println!("Chatting with {}. Say 'goodbye' to quit.\n", config.assistant_name);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    assistant.run_text_loop(stdin, tokio::io::stdout()).await?;

    let (stopped, _) = assistant.session().router().services().media.stop().await;
    if stopped {
        tracing::debug!("stopped music on exit");
    }
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    let num_samples = PLAYBACK_SAMPLE_RATE as usize * 2;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...", samples.len());

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_blocking(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let api_key = config
        .voice
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is required for TTS"))?;

    let tts = TextToSpeech::new(
        api_key,
        config.voice.tts_voice.clone(),
        config.voice.tts_model.clone(),
        VoiceRate::new(config.voice.rate),
    )?;

    println!("Synthesizing speech...");
    let mp3_data = tts.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    println!("Playing audio...");
    AudioPlayback::new()?
        .play_mp3(mp3_data, config.voice.volume)
        .await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Print the persisted alarm list
fn list_alarms() {
    let store = AlarmStore::open(kitty_assistant::config::resolve_alarm_file());
    println!("Alarm file: {}", store.path().display());
    println!("{}", store.list());
}
