#![cfg(not(tarpaulin_include))]

use salesboard::app;
use salesboard::config::ServerConfig;

/// Main entry point for the dashboard web server
///
/// Logging follows `RUST_LOG` (default `info`). The bind address comes from
/// `SALESBOARD_ADDR` or the first command line argument.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    log::info!("starting salesboard on {}", config.addr);
    app::run(config).await
}
