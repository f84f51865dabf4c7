use anyhow::{Context, Result};
use clap::Parser;
use livenote::notes::{
    FixedWindowLimiter, FsMediaStore, HttpSummarizer, InMemoryNoteStore, InMemoryRateLimitStore,
    LimitRule,
};
use livenote::transcribe::HttpTranscriber;
use livenote::{create_router, AppState, Config, SessionServices};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "livenote", about = "Live audio transcription note service")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/livenote")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v0.1.0", cfg.service.name);
    info!(
        "HTTP server will bind to {}:{}",
        cfg.service.http.bind, cfg.service.http.port
    );

    let limiter = Arc::new(FixedWindowLimiter::new(
        Arc::new(InMemoryRateLimitStore::new()),
        LimitRule {
            max_count: cfg.limits.create_note_max,
            window_secs: cfg.limits.create_note_window_secs,
        },
        LimitRule {
            max_count: cfg.limits.transcribe_chunk_max,
            window_secs: cfg.limits.transcribe_chunk_window_secs,
        },
    ));

    let services = SessionServices {
        stt: Arc::new(HttpTranscriber::new(
            cfg.transcription.endpoint.clone(),
            Duration::from_secs(cfg.transcription.timeout_secs),
        )?),
        summarizer: Arc::new(HttpSummarizer::new(
            cfg.summarization.endpoint.clone(),
            Duration::from_secs(cfg.summarization.timeout_secs),
        )?),
        notes: Arc::new(InMemoryNoteStore::new()),
        media: Arc::new(FsMediaStore::new(cfg.audio.recordings_path.clone())),
        limiter,
    };

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(Arc::new(cfg), services);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
