//! TrackIt hub server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p trackit-hub
//! ```
//!
//! Configuration is loaded from environment variables (and `.env`).

use tracing::{error, info};
use trackit_common::{try_init_tracing_with_config, AppConfig, TracingConfig};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        app = %config.app.name,
        env = ?config.app.env,
        addr = %config.server.address(),
        "Starting TrackIt hub"
    );

    if let Err(e) = trackit_hub::run(config).await {
        error!(error = %e, "Hub server failed");
        std::process::exit(1);
    }
}
