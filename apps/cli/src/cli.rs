//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use vend_db::UpsertStrategy;
use vend_sync::{ResourceClass, SyncError};

#[derive(Debug, Parser)]
#[command(
    name = "vend-sync",
    version,
    about = "Import a Vend store into a local relational database"
)]
pub struct Cli {
    /// Config file (default: <config dir>/vend-sync/vend-sync.toml).
    #[arg(long, global = true, env = "VEND_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database file, overriding [database].path.
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Store name or API base URL, overriding [vend].address.
    #[arg(long, global = true)]
    pub address: Option<String>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only errors; no progress output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import resource classes (default if no subcommand given).
    Import {
        /// Classes to import, e.g. `Outlet register_sales` (default: [import].classes).
        #[arg(value_parser = parse_class)]
        classes: Vec<ResourceClass>,

        /// Write primitive: native or check_then_write.
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<UpsertStrategy>,

        /// Print the import summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the most recent sync runs.
    Runs {
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Print the effective configuration (token redacted).
    Config {
        /// Also write it to the config file.
        #[arg(long)]
        save: bool,
    },

    /// List the resource classes that can be imported.
    Classes,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Import {
            classes: Vec::new(),
            strategy: None,
            json: false,
        }
    }
}

fn parse_class(s: &str) -> Result<ResourceClass, SyncError> {
    s.parse()
}

fn parse_strategy(s: &str) -> Result<UpsertStrategy, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_arguments() {
        let cli = Cli::try_parse_from([
            "vend-sync",
            "--database",
            "store.db",
            "-vv",
            "import",
            "Outlet",
            "register_sales",
            "--strategy",
            "check-then-write",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("store.db")));
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Import {
                classes, strategy, ..
            }) => {
                assert_eq!(classes, vec![ResourceClass::Outlet, ResourceClass::RegisterSale]);
                assert_eq!(strategy, Some(UpsertStrategy::CheckThenWrite));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        assert!(Cli::try_parse_from(["vend-sync", "import", "Widget"]).is_err());
    }

    #[test]
    fn test_no_subcommand_means_import() {
        let cli = Cli::try_parse_from(["vend-sync", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.command.is_none());
        assert!(matches!(Commands::default(), Commands::Import { ref classes, .. } if classes.is_empty()));
    }
}
