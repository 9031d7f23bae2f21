use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "resync", version)]
#[command(about = "Inspect and maintain resumable sync caches")]
#[command(after_long_help = r#"CONFIGURATION
    Settings are merged from, in increasing priority:
      1. Built-in defaults
      2. ~/.config/resync/config.toml (or the platform equivalent)
      3. The file given with --config (.toml, .yaml, .yml or .json)
      4. RESYNC_* environment variables, e.g. RESYNC_CACHE__PATH=/srv/cache

    RUST_LOG overrides the configured log level.
"#)]
pub struct Cli {
    /// Additional configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect or repair the configured cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Print the resolved configuration as JSON
    Config,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum CacheCommand {
    /// List cached keys in the order they were first written
    Keys,
    /// Print the value cached under a key
    Get { key: String },
    /// Remove a key, so the next sync fetches it again
    Delete { key: String },
    /// Reconcile the index with the data on disk and report what changed
    Reconcile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["resync", "cache", "get", "CSE", "-vv", "--config", "/etc/resync.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/resync.toml")));
        let Command::Cache { action } = cli.command else { panic!("expected the cache command") };
        assert_eq!(action, CacheCommand::Get { key: "CSE".to_string() });
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["resync"]).is_err());
        assert!(Cli::try_parse_from(["resync", "cache", "delete"]).is_err());
    }
}
