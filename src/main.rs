use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::discord::{Bot, SessionRegistry};
use crate::state::Config;

mod audio;
mod discord;
mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(config) = Config::load() else {
        error!("no config.ron found and DISCORD_BOT_TOKEN is not set");
        std::process::exit(1);
    };

    let registry = SessionRegistry::new();

    let mut bot = match Bot::new(config, registry).await {
        Ok(bot) => bot,
        Err(err) => {
            error!(%err, "could not create the discord client");
            std::process::exit(1);
        }
    };

    info!("starting");

    if let Err(err) = bot.start().await {
        error!(%err, "client error");
    }
}
