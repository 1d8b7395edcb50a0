//! Bot client entry point
//!
//! Run with:
//! ```bash
//! cargo run -p bot-client
//! ```
//!
//! Configuration is loaded from environment variables.

use bot_common::{try_init_tracing, BotConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the bot
    if let Err(e) = run().await {
        error!(error = %e, "Bot failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting bot client...");

    // Load configuration
    let config = BotConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        instance = config.app.instance,
        shards = config.gateway.shard_count,
        debug = config.app.debug,
        "Configuration loaded"
    );

    // Assemble and run the bot
    let bot = bot_client::Bot::new(config)?;
    bot.run().await?;

    Ok(())
}
