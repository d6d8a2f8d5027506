// Main

use std::sync::Arc;

use rtmp_core::log::{LogConfig, Logger};
use rtmp_core::server::{run_server, AppResolver, LiveApp, RtmpServerConfiguration};
use rtmp_core::store::StreamStore;
use rtmp_core::utils::get_env_bool;

/// Main function
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Initialize logger

    let logger = Arc::new(Logger::new(LogConfig {
        prefix: "".to_string(),
        error_enabled: get_env_bool("LOG_ERROR", true),
        warning_enabled: get_env_bool("LOG_WARNING", true),
        info_enabled: get_env_bool("LOG_INFO", true),
        debug_enabled: get_env_bool("LOG_DEBUG", false),
        trace_enabled: get_env_bool("LOG_TRACE", get_env_bool("LOG_DEBUG", false)),
    }));

    // Print version

    const VERSION: &str = env!("CARGO_PKG_VERSION");

    logger.log_info(&format!("RTMP Core Server ({VERSION})"));

    // Load configuration

    let server_config = match RtmpServerConfiguration::load_from_env(&logger) {
        Ok(c) => Arc::new(c),
        Err(_) => {
            std::process::exit(1);
        }
    };

    // In-memory stream store

    let store = Arc::new(StreamStore::new());

    // Every app path gets the live publish/play app

    let mut resolver = AppResolver::new();
    resolver.register_default(Box::new(|| Box::new(LiveApp::new())));

    // Run server

    run_server(logger, server_config, store, Arc::new(resolver)).await;

    // End of main

    Ok(())
}
