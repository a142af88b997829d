use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use parley::config::config_file_path;
use parley::voice::{
    AudioCapture, AudioPlayback, MicrophoneTranscriber, PLAYBACK_SAMPLE_RATE, SpeechToText,
    TextToSpeech, VoiceSpeaker, calculate_energy,
};
use parley::{AssistantResponder, Config, Session, TurnOutcome, WelcomeOutcome, console};

/// Parley - a push-to-talk voice assistant
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Skip the spoken welcome at startup
    #[arg(long, env = "PARLEY_NO_WELCOME")]
    no_welcome: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
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
        /// Language tag for the voice (defaults to the primary language)
        #[arg(short, long)]
        lang: Option<String>,
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Print the config file location
    ConfigPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
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
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { lang, text } => test_tts(lang, &text).await,
            Command::ConfigPath => {
                match config_file_path() {
                    Some(path) => println!("{}", path.display()),
                    None => anyhow::bail!("could not determine config directory"),
                }
                Ok(())
            }
        };
    }

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let stt = SpeechToText::from_config(&config.voice, &config.api_keys)?;
    let transcriber = MicrophoneTranscriber::new(stt, config.listen)
        .with_language(config.messages.primary_lang.clone());
    let responder = AssistantResponder::from_config(&config.llm, &config.api_keys)?;
    let speaker = VoiceSpeaker::new(TextToSpeech::from_config(&config.voice, &config.api_keys)?);

    let session = Session::new(transcriber, responder, speaker, config.messages);
    let console = tokio::spawn(console::run(session.subscribe()));
    tracing::info!(
        session = %session.id(),
        lang = %session.messages().primary_lang,
        "session started"
    );

    println!("Press Enter to talk, q then Enter to quit.");

    if !cli.no_welcome && session.play_welcome_once().await != WelcomeOutcome::Played {
        tracing::debug!("welcome skipped");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => break,
        };

        match line.as_deref().map(str::trim) {
            None | Some("q" | "quit" | "exit") => break,
            Some(_) => {}
        }

        tokio::select! {
            outcome = session.process_voice_turn() => report(&outcome),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let conversation = session.end();
    if let Err(e) = console.await {
        tracing::debug!(error = %e, "console task ended abnormally");
    }
    tracing::info!(turns = conversation.len(), "goodbye");

    Ok(())
}

fn report(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Busy => println!("Still working on the last question..."),
        TurnOutcome::NoSpeech => println!("I didn't catch that. Press Enter to try again."),
        TurnOutcome::PlaybackFailed { reply, .. } => {
            println!("(could not play the reply) {reply}");
        }
        TurnOutcome::Completed { .. } => {}
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        // Clear buffer each second
        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Raise [listen] min_energy if the room is noisy");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (PLAYBACK_SAMPLE_RATE as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!(
        "Playing {} samples at {} Hz...",
        samples.len(),
        PLAYBACK_SAMPLE_RATE
    );

    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play(samples)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}

/// Test TTS output with the configured provider
async fn test_tts(lang: Option<String>, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let lang = lang.unwrap_or_else(|| config.messages.primary_lang.clone());
    let tts = TextToSpeech::from_config(&config.voice, &config.api_keys)?;

    println!("Synthesizing speech ({:?}, {lang})...", tts.provider());
    let mp3_data = tts.synthesize(text, &lang).await?;
    println!("Received {} bytes of audio", mp3_data.len());

    println!("Playing audio...");
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_mp3(&mp3_data)).await??;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
