/// colmeta server entry point
///
/// Loads configuration from the environment and serves the metadata API:
/// - Workflow and task definitions at /api/metadata/*
/// - Event handlers at /api/event/*
/// - Health check at /healthz

use colmeta::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Defaults to 0.0.0.0:8080 and a SQLite backend under data/
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
