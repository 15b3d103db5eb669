use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use longbox::app::AppContext;
use longbox::cli::{commands, Cli, Commands};
use longbox::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Refresh => {
            commands::refresh(&ctx).await?;
        }
        Commands::List {
            publisher,
            pulled,
            watched,
        } => {
            commands::list(&ctx, publisher.as_deref(), pulled, watched)?;
        }
        Commands::Publishers => {
            commands::publishers(&ctx)?;
        }
        Commands::Pull { title, off } => {
            commands::pull(&ctx, &title, !off)?;
        }
        Commands::Watch { title, off } => {
            commands::watch(&ctx, &title, !off)?;
        }
        Commands::Dates => {
            commands::dates(&ctx)?;
        }
    }

    Ok(())
}
