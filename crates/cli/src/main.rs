mod config_commands;

use std::path::PathBuf;

use {
    anyhow::{Context, bail},
    clap::{Parser, Subcommand},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
    voxrelay_agents::{AgentResponder, LlamaStackClient, canned_reply},
    voxrelay_config::VoxrelayConfig,
    voxrelay_media::{DurationProbe, Ffprobe, RunWorkspace, audio_mime_type, probe_or_estimate},
    voxrelay_voice::{PiperTts, TtsProvider, select_provider},
};

#[derive(Parser)]
#[command(name = "voxrelay", about = "voxrelay: voice notes in, spoken agent replies out")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message through the agent and print the reply.
    Ask {
        text: String,
    },
    /// Transcribe an audio file with the configured speech engine.
    Transcribe {
        file: PathBuf,
    },
    /// Synthesize text into a voice-note ready Opus file.
    Speak {
        text: String,
        /// Where to write the audio.
        #[arg(short, long, default_value = "reply.ogg")]
        out: PathBuf,
    },
    /// Report the MIME type and duration that a voice note would carry.
    Probe {
        file: PathBuf,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn ask(config: &VoxrelayConfig, text: &str) -> anyhow::Result<()> {
    let client = LlamaStackClient::new(config.agent.clone())?;
    let reply = match client.respond(text).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, kind = ?e.kind(), "agent failed, using canned reply");
            canned_reply(text)
        },
    };
    println!("{reply}");
    Ok(())
}

async fn transcribe(config: &VoxrelayConfig, file: PathBuf) -> anyhow::Result<()> {
    let stt = select_provider(&config.voice.stt);
    if !stt.is_configured() {
        bail!("speech engine '{}' is not configured", stt.id());
    }
    let text = stt
        .transcribe(&file)
        .await
        .with_context(|| format!("transcribe {}", file.display()))?;
    println!("{text}");
    Ok(())
}

async fn speak(config: &VoxrelayConfig, text: &str, out: PathBuf) -> anyhow::Result<()> {
    let tts = PiperTts::new(&config.voice.tts.piper, config.voice.tts.ffmpeg_path.clone());
    if !tts.is_configured() {
        bail!("speech synthesizer '{}' is not configured", tts.id());
    }
    let workspace = RunWorkspace::create(&config.pipeline.work_root(), "speak")?;
    let audio = tts.synthesize(text, workspace.path()).await?;
    tokio::fs::copy(&audio, &out)
        .await
        .with_context(|| format!("write {}", out.display()))?;
    println!("{}", out.display());
    Ok(())
}

async fn probe(config: &VoxrelayConfig, file: PathBuf) -> anyhow::Result<()> {
    if !file.is_file() {
        bail!("{} is not a file", file.display());
    }
    let ffprobe = match Ffprobe::discover(config.delivery.ffprobe_path.as_deref()) {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "ffprobe not available, estimating from file size");
            None
        },
    };
    let seconds =
        probe_or_estimate(ffprobe.as_ref().map(|p| p as &dyn DurationProbe), &file).await;
    println!("{}\t{seconds}s", audio_mime_type(&file));
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "voxrelay starting");

    match cli.command {
        Commands::Config { action } => config_commands::handle_config(action).await,
        command => {
            let config = voxrelay_config::discover_and_load();
            match command {
                Commands::Ask { text } => ask(&config, &text).await,
                Commands::Transcribe { file } => transcribe(&config, file).await,
                Commands::Speak { text, out } => speak(&config, &text, out).await,
                Commands::Probe { file } => probe(&config, file).await,
                Commands::Config { .. } => Ok(()),
            }
        },
    }
}
