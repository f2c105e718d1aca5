//! Soundpost server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use soundpost_core::config::AppConfig;
use soundpost_server::{AppState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Soundpost - media ingestion and storage backend
#[derive(Parser, Debug)]
#[command(name = "soundpostd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "SOUNDPOST_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Soundpost v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override
    // everything).
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("SOUNDPOST_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    soundpost_server::metrics::register_metrics();

    // Cloud storage is optional at deploy time: absent, every cloud path
    // degrades to storage_unavailable and tracks are stored inline.
    let cloud = match &config.storage {
        Some(storage_config) => {
            let backend = soundpost_storage::from_config(storage_config)
                .await
                .context("failed to initialize cloud storage")?;
            // Catch configuration errors before accepting requests.
            backend
                .health_check()
                .await
                .context("cloud storage health check failed")?;
            tracing::info!(backend = backend.backend_name(), "Cloud storage initialized");
            Some(backend)
        }
        None => {
            tracing::warn!("No cloud storage configured; tracks will be stored inline");
            None
        }
    };

    let metadata = soundpost_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    let stt = soundpost_transcribe::from_config(config.transcription.as_ref())
        .context("failed to initialize speech-to-text client")?;
    if stt.is_none() {
        tracing::warn!("No speech-to-text capability configured; transcription disabled");
    }

    let state = AppState::new(config.clone(), metadata, cloud, stt);

    // Periodic TTL sweep for chunked upload sessions; independent of
    // request traffic.
    let _sweeper_handle = state
        .sessions
        .clone()
        .spawn_sweeper(config.server.session_sweep_interval());
    tracing::info!(
        interval_secs = config.server.session_sweep_interval().as_secs(),
        ttl_secs = config.server.session_ttl_secs,
        "Upload session sweeper spawned"
    );

    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(bind = %config.server.bind, "Listening");

    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
