use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "herald", about = "A config-driven AMQP topology and lifecycle engine", version)]
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

use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Sentry initialization ---
    let sentry_dsn = env::var("SENTRY_DSN").ok();
    let _sentry_guard = if let Some(dsn) = sentry_dsn {
        let env = env::var("SENTRY_ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let release = env!("CARGO_PKG_VERSION");
        let guard = sentry::init(sentry::ClientOptions {
            dsn: Some(dsn.parse().expect("Invalid SENTRY_DSN")),
            environment: Some(env.into()),
            release: Some(release.into()),
            attach_stacktrace: true,
            ..Default::default()
        });
        // Integrate sentry-log for breadcrumbs
        let logger =
            sentry_log::SentryLogger::with_dest(env_logger::Builder::from_default_env().build());
        log::set_boxed_logger(Box::new(logger)).expect("Failed to set logger");
        log::set_max_level(log::LevelFilter::Info);
        Some(guard)
    } else {
        None
    };

    env_logger::Builder::from_default_env()
        .format_timestamp(None)
        .format_level(true)
        .format_module_path(false)
        .format_indent(Some(4))
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
