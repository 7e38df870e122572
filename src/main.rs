use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use klinik_deutsch::{
    api::ApiClient,
    cli::{ensure_session, execute_command, Commands},
    config::{Config, LogFormat},
    storage::SqliteStorage,
};

/// KlinikDeutsch command-line client
#[derive(Parser, Debug)]
#[command(name = "klinik", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "klinik starting");

    // Initialize storage
    let storage = match SqliteStorage::new(&config.database).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            s
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    // Initialize backend client
    let client = match ApiClient::new(&config.api, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.api.base_url, "Backend client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize backend client");
            return Err(e.into());
        }
    };

    if cli.command.needs_session() {
        if let Err(e) = ensure_session(&client, &config).await {
            error!(error = %e, "Login failed");
            return Err(e.into());
        }
    }

    let result = execute_command(cli.command, &client, &storage, &config).await;
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
