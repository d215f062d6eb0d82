//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::show::ShowArgs;
use super::commands::simulate::SimulateArgs;

#[derive(Parser, Debug)]
#[command(name = "dbconverge")]
#[command(about = "dbconverge - database instance lifecycle with convergence waits", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .dbconverge/config.yaml + local.yaml)
    #[arg(short, long, global = true, env = "DBCONVERGE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run bring-up, tag reconciliation, and tear-down against the simulated provider
    Simulate(SimulateArgs),

    /// Show the effective create and delete poll policies
    Policy,

    /// Show locally recorded instances
    Show(ShowArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate_with_tags() {
        let cli = Cli::try_parse_from([
            "dbconverge",
            "--json",
            "simulate",
            "orders-db",
            "--tag",
            "env=prod",
            "--tag",
            "team=data",
            "--final-snapshot",
            "orders-final",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.identifier, "orders-db");
                assert_eq!(args.tags.len(), 2);
                assert_eq!(args.tags[0], ("env".to_string(), "prod".to_string()));
                assert_eq!(args.final_snapshot.as_deref(), Some("orders-final"));
            }
            other => panic!("Expected simulate, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_tag() {
        let err = Cli::try_parse_from(["dbconverge", "simulate", "orders-db", "--tag", "env"]);
        assert!(err.is_err());
    }
}
