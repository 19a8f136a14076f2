//! saykit: speak or export text through the OS text-to-speech engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use saykit::{Completion, Config, Engine, Speaker};

#[derive(Parser, Debug)]
#[command(name = "saykit", about = "Text-to-speech through the OS voice engine")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Engine: say, festival, espeak-ng or sapi (default: from config, else the OS engine)
    #[arg(short, long)]
    engine: Option<String>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak text aloud
    Speak {
        text: String,
        #[arg(long)]
        voice: Option<String>,
        /// Speed multiplier (1.0 = normal)
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Write speech to an audio file
    Export {
        text: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long)]
        speed: Option<f64>,
    },
    /// List installed voices
    Voices,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config.as_deref());
    if let Some(engine) = args.engine {
        config.engine = engine;
    }
    let engine: Engine = config.engine()?;
    info!("Using engine {engine}");

    let speaker = Speaker::new(config.platform()?);

    match args.command {
        Command::Speak { text, voice, speed } => {
            let voice = voice.or(config.voice);
            let speed = speed.or(config.speed);
            let done = speaker.speak(&text, voice.as_deref(), speed);
            wait_or_interrupt(&speaker, done).await?;
        }
        Command::Export {
            text,
            output,
            voice,
            speed,
        } => {
            let voice = voice.or(config.voice);
            let speed = speed.or(config.speed);
            let done = speaker.export(&text, voice.as_deref(), speed, &output);
            wait_or_interrupt(&speaker, done).await?;
            info!("Wrote {}", output.display());
        }
        Command::Voices => {
            for voice in speaker.installed_voices().await? {
                println!("{voice}");
            }
        }
    }

    Ok(())
}

/// Wait for the request to finish; Ctrl-C stops the engine instead.
async fn wait_or_interrupt(speaker: &Speaker, done: Completion) -> saykit::Result<()> {
    tokio::select! {
        result = done => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping speech");
            speaker.stop().await
        }
    }
}
