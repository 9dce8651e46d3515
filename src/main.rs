use std::path::Path;
use std::process::ExitCode;

use shop_admin::config::AppConfig;
use shop_admin::database::{connection::init_db, seed::run_seed};
use shop_admin::logger::init_tracing;
use shop_admin::{serve, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    let mut config = AppConfig::load_from_file(Path::new(".env")).unwrap_or_else(AppConfig::load);

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = config.validate() {
        tracing::error!(target: "CONFIG", "Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        target: "APP",
        version = %config.version,
        environment = config.environment.as_str(),
        "Application starting"
    );

    let pool = match init_db(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(target: "DATABASE", error = %e, "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::new(pool, config);

    if let Err(e) = run_seed(&state.db, &state.credentials, &state.config.seed).await {
        tracing::error!(target: "SEED", error = %e, "Seeding failed");
        return ExitCode::FAILURE;
    }

    if let Err(e) = serve(state).await {
        tracing::error!(target: "APP", error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
