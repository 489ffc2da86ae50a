// src/main.rs

use axum::serve;
use healthd::{
    cli::{Cli, Commands},
    config::{save_config, AppConfig},
    run, setup_configuration, AppError, AppState,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "Failed to install Ctrl+C handler");
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
                error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!(signal = "Ctrl+C", "Received signal. Initiating graceful shutdown...") },
        () = terminate => { info!(signal = "Terminate", "Received signal. Initiating graceful shutdown...") },
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(true))
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, AppError> {
    let cli = Cli::parse_args();
    init_tracing(&cli);

    match cli.command() {
        Commands::Serve { port } => serve_probes(cli.config, port).await,
        Commands::Check => check_once(cli.config).await,
        Commands::Validate => validate(cli.config),
        Commands::GenerateConfig { output } => {
            save_config(&AppConfig::template(), &output).await?;
            println!("Example configuration written to {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve_probes(config: Option<PathBuf>, port: Option<u16>) -> Result<ExitCode, AppError> {
    #[cfg(feature = "metrics")]
    healthd::metrics::install_recorder()?;

    let (app, state) = run(config).await.map_err(|e| {
        eprintln!("Application setup error: {e:?}");
        e
    })?;

    let host = state.config.server.host.clone();
    let port = port.unwrap_or(state.config.server.port);
    let listener = TcpListener::bind((host.as_str(), port)).await.map_err(|e| {
        error!(server.host = %host, server.port = port, error = ?e, "Failed to bind to address. Exiting.");
        AppError::from(e)
    })?;
    info!(server.host = %host, server.port = port, "Server listening");

    let served = serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    shutdown(&state).await;

    served.map_err(|e| {
        error!(error = ?e, "Server run loop encountered an error. Exiting.");
        AppError::from(e)
    })?;

    info!("Server shut down gracefully.");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown(state: &AppState) {
    state.shutdown.cancel();
    if let Err(e) = state.manager.stop().await {
        warn!(error = %e, "Background health checks were not running at shutdown");
    }
}

async fn check_once(config: Option<PathBuf>) -> Result<ExitCode, AppError> {
    let app_config = setup_configuration(config)?;
    let state = AppState::new(&app_config)?;

    let report = state.manager.run_checks().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.status.is_serving() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn validate(config: Option<PathBuf>) -> Result<ExitCode, AppError> {
    let app_config = setup_configuration(config)?;
    println!(
        "Configuration is valid: {} check(s), port {}",
        app_config.checks.len(),
        app_config.server.port
    );
    Ok(ExitCode::SUCCESS)
}
