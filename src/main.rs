//! dbconverge CLI entry point.

use anyhow::Result;
use clap::Parser;

use dbconverge::cli::{commands, handle_error, Cli, Commands};
use dbconverge::domain::models::Config;
use dbconverge::infrastructure::config::ConfigLoader;
use dbconverge::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config: Config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&LogConfig::try_from(&config.logging)?)?;

    match cli.command {
        Commands::Simulate(args) => commands::simulate::execute(args, &config, cli.json).await,
        Commands::Policy => commands::policy::execute(&config, cli.json),
        Commands::Show(args) => commands::show::execute(args, &config, cli.json).await,
    }
}
