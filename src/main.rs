use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use teddy_companion::daemon::build_voice;
use teddy_companion::face::{Display, FaceFrame, FaceRenderer, PngDisplay, draw_face};
use teddy_companion::motion::{Choreographer, Gesture};
use teddy_companion::voice::{SYNTHESIS_TIMEOUT, SynthesisClient};
use teddy_companion::{Config, Daemon, FaceState, Hardware, Mood, classify};

/// Teddy - a talking, moving plush companion
#[derive(Parser)]
#[command(name = "teddy", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run without display, servo, touch sensor or speaker
    /// (TEDDY_HEADLESS=1 in the environment does the same)
    #[arg(long)]
    headless: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Speak a line as if it came in as a message
    Say {
        /// Text to speak
        text: String,
        /// Mood to show instead of the detected one
        #[arg(short, long)]
        mood: Option<Mood>,
    },
    /// Render one face frame to a PNG file
    Face {
        #[arg(short, long, default_value = "neutral")]
        mood: Mood,
        /// Mouth openness in [0, 1]
        #[arg(long, default_value = "0")]
        mouth: f32,
        /// Output file
        #[arg(short, long, default_value = "face.png")]
        out: PathBuf,
    },
    /// Play a head gesture
    Gesture {
        #[arg(value_enum)]
        kind: GestureKind,
    },
    /// Check the synthesis server
    Health,
}

#[derive(Clone, Copy, ValueEnum)]
enum GestureKind {
    Shake,
    Poke,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,teddy_companion=info",
        1 => "info,teddy_companion=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    config.hardware.headless |= cli.headless;
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Say { text, mood } => say(&config, &text, mood).await,
            Command::Face { mood, mouth, out } => render_face(mood, mouth, out),
            Command::Gesture { kind } => gesture(&config, kind),
            Command::Health => health(&config).await,
        };
    }

    let hardware = Hardware::open(&config.hardware);
    let daemon = Daemon::new(config, hardware)?;

    // Run until interrupted
    daemon.run().await?;

    Ok(())
}

/// Speak one line with the face running
async fn say(config: &Config, text: &str, mood: Option<Mood>) -> anyhow::Result<()> {
    let hardware = Hardware::open(&config.hardware);
    let face = FaceState::new();
    let choreographer = Choreographer::new(Arc::clone(&hardware.actuator));
    let voice = build_voice(config, face.clone(), choreographer, hardware.player)?;

    let stop = Arc::new(AtomicBool::new(false));
    let renderer = FaceRenderer::new(face, hardware.display).spawn(Arc::clone(&stop))?;

    let classification = classify(text);
    let result = voice
        .try_speak(
            text,
            Some(mood.unwrap_or(classification.mood)),
            classification.head_shake,
        )
        .await;

    stop.store(true, Ordering::Relaxed);
    let _ = tokio::task::spawn_blocking(move || renderer.join()).await;

    result?;
    println!(
        "Spoke in {} with mood {}",
        voice.language_for(text),
        mood.unwrap_or(classification.mood)
    );
    Ok(())
}

/// Write a single frame to disk
fn render_face(mood: Mood, mouth: f32, out: PathBuf) -> anyhow::Result<()> {
    let frame = FaceFrame {
        mouth_open: mouth.clamp(0.0, 1.0),
        ..FaceFrame::resting(mood)
    };

    let mut png = PngDisplay::new(out.clone());
    png.show(&draw_face(&frame))?;

    println!("Wrote {mood} face to {}", out.display());
    Ok(())
}

/// Play a gesture on the configured servo
fn gesture(config: &Config, kind: GestureKind) -> anyhow::Result<()> {
    let hardware = Hardware::open(&config.hardware);
    let choreographer = Choreographer::new(hardware.actuator);

    let gesture = match kind {
        GestureKind::Shake => Gesture::head_shake(),
        GestureKind::Poke => Gesture::poke(),
    };

    choreographer.perform(&gesture)?;
    println!("Played {}", gesture.name());
    Ok(())
}

/// Probe the synthesis server
async fn health(config: &Config) -> anyhow::Result<()> {
    let client = SynthesisClient::new(&config.voice.endpoint, SYNTHESIS_TIMEOUT)?;
    let health = client.health().await?;
    println!("Synthesis server: {}", client.endpoint());
    println!("  status:         {}", health.status);
    println!("  voice cloning:  {}", health.voice_cloning);
    println!("  english voice:  {}", health.english_voice);
    println!("  japanese voice: {}", health.japanese_voice);
    Ok(())
}
