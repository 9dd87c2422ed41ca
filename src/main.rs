use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use karaoke_session::{
    create_router, spawn_session, AppState, Config, ErrorKind, HeadlessEngine, SessionController,
    SessionError, StaticPermissions, WavCaptureDevice,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "karaoke-session",
    version,
    about = "Record takes over a backing track and play them back pitch-shifted"
)]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/karaoke-session")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control API
    Serve,
    /// Record one take, then play it back pitch-shifted
    Rehearse {
        /// Length of the take
        #[arg(long, default_value_t = 3)]
        seconds: u64,
        /// Pitch shift applied to the playback, in semitones
        #[arg(long, default_value_t = 2.0, allow_hyphen_values = true)]
        pitch: f32,
    },
}

fn build_controller(cfg: &Config) -> Result<SessionController> {
    let session_config = cfg.session_config()?;
    info!("Recordings directory: {}", session_config.recordings_dir.display());

    Ok(SessionController::new(
        session_config,
        Arc::new(WavCaptureDevice::new(cfg.audio_source())),
        Arc::new(HeadlessEngine::new()),
        Arc::new(StaticPermissions(cfg.session.microphone_permission)),
    ))
}

/// A missing backing track is not fatal: takes are recorded without one
fn tolerate_missing_background(result: Result<(), SessionError>) -> Result<()> {
    match result {
        Err(e) if e.kind() == ErrorKind::ResourceUnavailable => {
            warn!("Continuing without background track: {}", e);
            Ok(())
        }
        other => Ok(other?),
    }
}

async fn serve(cfg: &Config) -> Result<()> {
    let session = spawn_session(build_controller(cfg)?);
    tolerate_missing_background(session.begin_session().await)?;

    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!("Session event: {}", json),
                    Err(e) => warn!("Failed to serialize session event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event log skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    let router = create_router(AppState::new(session.clone()));
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    session.shutdown().await?;
    Ok(())
}

async fn rehearse(cfg: &Config, seconds: u64, pitch: f32) -> Result<()> {
    let mut controller = build_controller(cfg)?;
    tolerate_missing_background(controller.begin_session().await)?;

    controller.start_recording().await?;
    info!("Recording for {}s...", seconds);
    tokio::time::sleep(Duration::from_secs(seconds)).await;

    let take_id = controller
        .stop_recording()
        .await?
        .context("Recording produced no take")?;

    let semitones = controller.adjust_pitch(take_id, pitch).await?;
    controller.play_take_with(take_id, false).await?;
    info!("Playing back at {:+} semitones", semitones);

    let wait = Duration::from_secs(seconds + 5);
    while controller.active_take_id().is_some() {
        let notice = tokio::time::timeout(wait, controller.next_completion())
            .await
            .context("Playback did not finish in time")?
            .context("Completion channel closed")?;
        controller.handle_completion(notice).await;
    }

    let snapshot = controller.snapshot();
    for take in &snapshot.takes {
        info!("{} [{}]", take.display_name, take.play_button.label());
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    controller.end_session().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Karaoke Session v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(&cfg).await,
        Command::Rehearse { seconds, pitch } => rehearse(&cfg, seconds, pitch).await,
    }
}
