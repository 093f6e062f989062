use std::sync::Arc;
use tracing::{error, info};
use webhook_dispatch::logging::{FileLogger, setup_logging};
use webhook_dispatch::runner::ProcessRunner;
use webhook_dispatch::{AppState, Configuration, app};

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let file_logger = std::env::var("DISPATCH_LOG_DIR").ok().map(FileLogger::new);
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let config_path =
        std::env::var("DISPATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match Configuration::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    config.warn_about_suspicious_settings();

    let bind_address = config.bind_address();
    let route = config.webhook_route();
    let state = Arc::new(AppState::new(config, Arc::new(ProcessRunner)));
    let router = app(state);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {} (webhook at {})", bind_address, route);
    info!("Using config at {:?}", config_path);
    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
