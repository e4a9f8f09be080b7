use std::net::SocketAddr;

use crate::error::{AppError, AppResult};
use nota_api::ApiServer;
use nota_config::AppSettings;
use nota_data::NotaStore;
use nota_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::info;

/// Dependencies required to bootstrap the Nota backend.
pub(crate) struct BootstrapDependencies {
    settings: AppSettings,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let settings =
            AppSettings::from_env().map_err(|err| AppError::config("settings.from_env", err))?;
        Ok(Self { settings })
    }
}

/// Entry point for the Nota backend boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    Box::pin(run_app_with(dependencies)).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies { settings } = dependencies;

    let logging = LoggingConfig {
        level: &settings.log_level,
        format: resolve_log_format(&settings),
        ..LoggingConfig::default()
    };
    nota_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("bootstrap");

    info!("Nota backend bootstrap starting");

    validate_settings(&settings)?;

    let telemetry = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let store = NotaStore::connect(&settings.database_url)
        .await
        .map_err(|err| AppError::data("store.connect", err))?;
    info!("Database migrations applied");

    let addr: SocketAddr = settings.socket_addr();
    let api = ApiServer::new(store, &settings, telemetry);

    info!(addr = %addr, "Launching API listener");
    api.serve(addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

fn resolve_log_format(settings: &AppSettings) -> LogFormat {
    settings
        .log_format
        .as_deref()
        .map_or_else(LogFormat::infer, LogFormat::from_name)
}

fn validate_settings(settings: &AppSettings) -> AppResult<()> {
    if settings.http_port == 0 {
        return Err(AppError::InvalidConfig {
            field: "http_port",
            reason: "zero",
            value: Some(settings.http_port.to_string()),
        });
    }
    if settings.session_ttl_secs == 0 {
        return Err(AppError::InvalidConfig {
            field: "session_ttl_secs",
            reason: "zero",
            value: Some(settings.session_ttl_secs.to_string()),
        });
    }
    if settings.body_limit_bytes == 0 {
        return Err(AppError::InvalidConfig {
            field: "body_limit_bytes",
            reason: "zero",
            value: Some(settings.body_limit_bytes.to_string()),
        });
    }
    Ok(())
}
