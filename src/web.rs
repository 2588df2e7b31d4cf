#![cfg(not(tarpaulin_include))]

use clap::Parser;
use sheetbridge::app;
use sheetbridge::config::ServerConfig;

/// Main entry point for the web application
///
/// Parses the server configuration from the command line and environment,
/// installs logging and runs the server until it is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sheetbridge::init_tracing();

    let config = ServerConfig::parse();
    app::run(config).await
}
