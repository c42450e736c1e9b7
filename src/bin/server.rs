//! SMV e-rickshaw assistant HTTP server binary.
//!
//! # Environment Variables
//!
//! - `PORT` - HTTP port (default: 9090)
//! - `GOOGLE_API_KEY` - Gemini key for replies and voice transcription
//! - `TOMTOM_API_KEY` - enables place search and routing
//! - `STATIC_DIR` - frontend assets and audio cache root (default: `static`)
//! - `RUST_LOG` - Tracing filter (default: "info,smv_assistant=debug")
//!
//! See [`AssistantConfig`] for the full list.
//!
//! # Usage
//!
//! ```bash
//! GOOGLE_API_KEY=... cargo run --bin server
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use smv_assistant::chat::{DashboardSnapshot, Orchestrator, Persona};
use smv_assistant::config::AssistantConfig;
use smv_assistant::llms::GeminiClient;
use smv_assistant::maps::MapsService;
use smv_assistant::server::{app_router, AppState};
use smv_assistant::speech::{FfmpegTempo, GoogleTranslateTts, SpeechCache, VoiceInput};
use tokio::signal;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,smv_assistant=debug".into()),
        )
        .init();

    let config = AssistantConfig::from_env().context("invalid configuration")?;
    if config.google_api_key.is_none() {
        tracing::warn!("GOOGLE_API_KEY not set; chat replies will use the fallback text");
    }

    let audio_dir = config.audio_cache_dir();
    tokio::fs::create_dir_all(&audio_dir)
        .await
        .with_context(|| format!("creating audio cache dir {}", audio_dir.display()))?;

    let gemini = Arc::new(GeminiClient::from_config(&config)?);
    let speech = SpeechCache::new(
        &audio_dir,
        config.audio_public_prefix.clone(),
        Arc::new(GoogleTranslateTts::new()?),
    )
    .with_post_processor(Arc::new(FfmpegTempo::default()))
    .with_max_chars(config.tts_max_chars);

    let orchestrator = Orchestrator::new(
        Persona::new(config.support_number.clone()),
        DashboardSnapshot::demo(),
        gemini.clone(),
        speech,
    )
    .with_generation_timeout(config.generation_timeout);

    let voice = VoiceInput::new(gemini);
    if !voice.ffmpeg_available().await {
        tracing::warn!("Voice input disabled until ffmpeg is installed");
    }

    let maps = MapsService::from_config(&config)?;
    let state = AppState::new(orchestrator, voice, maps, &config.static_dir);

    let sweeper = state
        .orchestrator
        .sessions()
        .clone()
        .spawn_sweeper(config.session_idle_ttl, SWEEP_INTERVAL);

    let app = app_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);

    tracing::info!("SMV assistant starting on {}", bind_addr);
    tracing::info!("  model: {}, static dir: {}", config.gemini_model, config.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
