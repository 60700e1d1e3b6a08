//! Saba - Personal Desktop Assistant
//!
//! Console assistant and browser backend over a local chat model.

use saba::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before anything reads the environment
    dotenv::dotenv().ok();

    // WARN by default, DEBUG when the debug flag is set, RUST_LOG always wins
    let level = if saba::config::debug_from_env() {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy()
        )
        .init();

    cli::run().await
}
