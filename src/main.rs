use std::sync::Arc;

use bench_hook::config::{HookConfig, WebhookSecret};
use bench_hook::dispatch::Dispatcher;
use bench_hook::logging::{FileLogger, setup_logging};
use bench_hook::runner::ProcessRunner;
use bench_hook::{AppState, router};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config = match HookConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let file_logger = config.logging.directory.clone().map(FileLogger::new);
    // Held until shutdown so buffered file logs get flushed.
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup error: {}", e);
            std::process::exit(1);
        }
    };

    let secret = match WebhookSecret::from_env() {
        Ok(secret) => secret,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let runner = Arc::new(ProcessRunner::from_config(&config.runner));
    let dispatcher = Dispatcher::new(runner, config.dispatch.mode(), config.jobs.history)
        .exclusive(config.runner.exclusive);
    let state = Arc::new(AppState::new(secret, Arc::new(dispatcher)));
    let app = router(state, config.server.max_body_bytes);

    match HookConfig::path_from_env() {
        Some(path) => info!("Using config at {:?}", path),
        None => info!("No config file found, using built-in defaults"),
    }
    info!(
        "Benchmark command: {:?} {:?} <commit>",
        config.runner.program, config.runner.args
    );
    info!("Dispatch mode: {:?}", config.dispatch.mode());

    let bind_address = &config.server.bind_address;
    let listener = match tokio::net::TcpListener::bind(bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", bind_address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
