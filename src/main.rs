use announcer::application::{AnnouncementCoordinator, CoordinatorSettings};
use announcer::config::Config;
use announcer::domain::audio::ClipLibrary;
use announcer::domain::session::OutputSessionManager;
use announcer::infrastructure::{
    telemetry, CommandSynthesizer, LocalAudioSession, TimedOutputEngine, WavClipPlayer,
};
use announcer::interface::Console;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.telemetry.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting announcer");
    info!("Configuration loaded: {:?}", config);

    if let Some(listen) = config.telemetry.metrics_listen {
        telemetry::init_metrics(listen)?;
        info!("Prometheus metrics on http://{}/metrics", listen);
    }

    // Clip output
    let library = Arc::new(ClipLibrary::new(&config.audio.clip_dir, &config.audio.extension));
    if config.audio.preload {
        match library.preload() {
            Ok(count) => info!("Preloaded {} clips from {}", count, library.base_dir().display()),
            Err(e) => warn!("Clip preload failed: {}", e),
        }
    }
    let engine = Arc::new(TimedOutputEngine::new());
    let player = Arc::new(WavClipPlayer::new(library, engine.clone()));

    // Speech
    let synthesizer = Arc::new(CommandSynthesizer::new(config.speech.program.clone()));
    info!(
        "Speech via {} (voice {})",
        synthesizer.program(),
        config.speech.voice
    );

    // Output session
    let session = OutputSessionManager::new(
        Arc::new(LocalAudioSession::new()),
        engine,
        config.session_configuration(),
        config.recovery_policy(),
    );

    let settings = CoordinatorSettings {
        voice: config.voice(),
        settle_delay: config.settle_delay(),
        ..CoordinatorSettings::default()
    };
    let (coordinator, handle) = AnnouncementCoordinator::new(session, synthesizer, player, settings);
    let coordinator_task = coordinator.spawn();

    // Event log
    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "announcer::events", "{}", json),
                    Err(e) => warn!("Failed to encode event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    info!("Announcer ready, type `help` for commands");

    let mut console = Console::new(handle.clone(), config.to_toml()?, std::io::stdout());
    tokio::select! {
        result = console.run(BufReader::new(tokio::io::stdin())) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    if handle.shutdown().is_err() {
        warn!("Coordinator already stopped");
    }
    coordinator_task.await?;

    info!("Announcer stopped");
    Ok(())
}
