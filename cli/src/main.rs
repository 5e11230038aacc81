use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "herald-cli", about = "Operate a Herald broker")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the broker and block until interrupted
    Run(cli::cli::commands::run::Run),
    /// Publish a message through a named publication
    Publish(cli::cli::commands::publish::Publish),
    /// Consume messages from a named subscription
    Subscribe(cli::cli::commands::subscribe::Subscribe),
    /// Report broker status
    Status(cli::cli::commands::status::Status),
    /// Purge all queues
    Purge(cli::cli::commands::purge::Purge),
    /// Tear down every vhost connection
    Nuke(cli::cli::commands::nuke::Nuke),
    /// Inspect the resolved topology configuration
    Config(cli::cli::commands::config::Config),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .try_init()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run) => run.run().await?,
        Commands::Publish(publish) => publish.run().await?,
        Commands::Subscribe(subscribe) => subscribe.run().await?,
        Commands::Status(status) => status.run().await?,
        Commands::Purge(purge) => purge.run().await?,
        Commands::Nuke(nuke) => nuke.run().await?,
        Commands::Config(config) => config.run().await?,
    }

    Ok(())
}
