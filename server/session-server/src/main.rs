use anyhow::Context;
use auth_gateway::Environment;
use clap::Parser;
use session_server::{bootstrap, create_app, spawn_purge_task, ServerConfig};
use std::path::PathBuf;
use tracing::info;

/// Session server: refresh-token lifecycle and auth gate over HTTP
#[derive(Parser, Debug)]
#[command(name = "session-server")]
#[command(about = "Session and refresh-token lifecycle HTTP server")]
struct Args {
    /// Server bind address
    #[arg(long, env = "SESSION_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "SESSION_PORT")]
    port: Option<u16>,

    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deployment environment: development, test, staging or production
    #[arg(short, long, env = "SESSION_ENV")]
    environment: Option<Environment>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(environment) = self.environment {
            config.environment = environment;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = ServerConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("refusing to start")?;

    let logging = config.logging.clone().resolved(config.environment.is_development());
    logger_redacted::init_tracing(&logging)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        backend = ?config.auth.session.backend,
        "Starting session server"
    );

    let state = bootstrap(&config).await?;

    if let Some(every) = config.auth.session.purge_interval() {
        spawn_purge_task(state.engine.clone(), every);
    }

    let app = create_app(&state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!("Session server listening on http://{addr}");
    info!("Auth endpoints available at http://{addr}/api/auth");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
