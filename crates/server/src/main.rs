use anyhow::Result;
use axum::serve;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::Parser;
use rustls::crypto::{ring::default_provider, CryptoProvider};
use server::{app::create_app, router::AppState};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use txmirror_core::{
    config::AppConfig, dispatch::TracingSink, engine::SubmitEngine, metrics::MetricsCollector,
};

/// Mirrors submitted Cardano transactions to every configured submit API.
#[derive(Debug, Parser)]
#[command(name = "txmirror", version, about)]
struct Cli {
    /// Path to a TOML or YAML config file.
    #[arg(long, env = "TXMIRROR_CONFIG")]
    config: Option<PathBuf>,
}

/// Grace period for in-flight requests after a shutdown signal on the TLS listener.
const GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!(
            "warn,txmirror_core={level},server={level},txmirror={level},tower_http={level}"
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false);
        registry.with(fmt_layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    CryptoProvider::install_default(default_provider())
        .map_err(|e| anyhow::anyhow!("Failed to install crypto provider: {e:?}"))?;

    let config = AppConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    init_logging(&config);
    debug!(
        backends_count = config.backends.len(),
        relay_enabled = config.relay.enabled(),
        client_timeout_ms = config.api.client_timeout_ms,
        "Configuration loaded"
    );
    if config.backends.is_empty() {
        error!("no backends configured, submissions will be rejected");
    }

    let metrics = Arc::new(MetricsCollector::new());
    let sink = Arc::new(TracingSink::new(Arc::clone(&metrics)));
    let engine = SubmitEngine::from_config(&config, sink, metrics)
        .map_err(|e| anyhow::anyhow!("Failed to initialize submit engine: {e}"))?;

    let app = create_app(AppState::new(engine, config.api.max_body_bytes));
    let addr = config.socket_addr()?;

    if let Some((cert, key)) = config.tls.paths() {
        info!("starting API TLS listener on {addr}");

        let tls = RustlsConfig::from_pem_file(cert, key)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load TLS certificate or key: {e}"))?;

        let handle = Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle
                .graceful_shutdown(Some(Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT_SECS)));
        });

        axum_server::bind_rustls(addr, tls).handle(handle).serve(app.into_make_service()).await?;
    } else {
        info!("starting API listener on {addr}");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
